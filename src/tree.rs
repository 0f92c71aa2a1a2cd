//! Task tree data model.
//!
//! A [`TaskTree`] is an arena of [`TaskNode`]s addressed by stable
//! [`NodeId`]s. Entry 0 is a synthetic root that is never serialized or
//! compared; its children are the top-level tasks. Parent/child links
//! live in the arena rather than in the node data, so the merge engine
//! can hold node handles across mutation without aliasing trouble.

use crate::error::{Error, Result};
use crate::timestamp::OrgStamp;

/// Stable handle to a node in a [`TaskTree`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct NodeId(usize);

/// One task (or plain headline) worth of data.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TaskNode {
    /// Headline text; empty only for the synthetic root.
    pub title: String,
    /// Remote identifier, present when the node came from the task
    /// service. Carries no merge semantics.
    pub task_id: Option<String>,
    /// Free-form note lines, including annotation lines.
    pub notes: Vec<String>,
    /// Whether the node is task-like (`TODO`/`DONE`) vs a plain headline.
    pub todo: bool,
    pub completed: bool,
    pub scheduled_start: Option<OrgStamp>,
    /// End of a scheduled time range; meaningful only with a start.
    pub scheduled_end: Option<OrgStamp>,
    /// Completion time; meaningful only when `completed`.
    pub closed: Option<OrgStamp>,
}

impl TaskNode {
    /// A task-like node with a title, no notes.
    pub fn titled(title: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            ..Self::default()
        }
    }
}

#[derive(Debug, Clone)]
struct Entry {
    node: TaskNode,
    parent: Option<NodeId>,
    children: Vec<NodeId>,
}

/// Ordered n-ary tree of tasks behind a synthetic root.
#[derive(Debug, Clone)]
pub struct TaskTree {
    entries: Vec<Entry>,
}

impl Default for TaskTree {
    fn default() -> Self {
        Self::new()
    }
}

impl TaskTree {
    pub fn new() -> Self {
        Self {
            entries: vec![Entry {
                node: TaskNode::default(),
                parent: None,
                children: Vec::new(),
            }],
        }
    }

    pub fn root(&self) -> NodeId {
        NodeId(0)
    }

    /// True when the tree holds nothing but the synthetic root.
    pub fn is_empty(&self) -> bool {
        self.entries.len() == 1
    }

    /// Number of task nodes, excluding the synthetic root.
    pub fn len(&self) -> usize {
        self.entries.len() - 1
    }

    pub fn get(&self, id: NodeId) -> &TaskNode {
        &self.entries[id.0].node
    }

    pub fn get_mut(&mut self, id: NodeId) -> &mut TaskNode {
        &mut self.entries[id.0].node
    }

    pub fn parent(&self, id: NodeId) -> Option<NodeId> {
        self.entries[id.0].parent
    }

    pub fn children(&self, id: NodeId) -> &[NodeId] {
        &self.entries[id.0].children
    }

    /// Append `node` as the last child of `parent`.
    pub fn add_child(&mut self, parent: NodeId, node: TaskNode) -> NodeId {
        let id = NodeId(self.entries.len());
        self.entries.push(Entry {
            node,
            parent: Some(parent),
            children: Vec::new(),
        });
        self.entries[parent.0].children.push(id);
        id
    }

    /// Depth-first search for a node carrying the given remote id.
    pub fn find_by_task_id(&self, task_id: &str) -> Option<NodeId> {
        self.dfs()
            .find(|&id| self.get(id).task_id.as_deref() == Some(task_id))
    }

    /// Attach a node under the node with remote id `parent_task_id`, or
    /// under the root when no parent id is given. Fails when the parent
    /// id is not (yet) in the tree.
    pub fn add_subtask(&mut self, node: TaskNode, parent_task_id: Option<&str>) -> Result<NodeId> {
        let parent = match parent_task_id {
            None => self.root(),
            Some(task_id) => self
                .find_by_task_id(task_id)
                .ok_or_else(|| Error::TaskNotFound(task_id.to_string()))?,
        };
        Ok(self.add_child(parent, node))
    }

    /// Pre-order depth-first walk, starting at (and including) the
    /// synthetic root.
    pub fn dfs(&self) -> Dfs<'_> {
        Dfs {
            tree: self,
            stack: vec![self.root()],
        }
    }

    /// Logical equality: same node data and same child order, root
    /// data ignored. Arena layout is irrelevant.
    pub fn same_as(&self, other: &TaskTree) -> bool {
        fn eq(a: &TaskTree, an: NodeId, b: &TaskTree, bn: NodeId, compare_data: bool) -> bool {
            if compare_data && a.get(an) != b.get(bn) {
                return false;
            }
            let (ac, bc) = (a.children(an), b.children(bn));
            ac.len() == bc.len()
                && ac
                    .iter()
                    .zip(bc.iter())
                    .all(|(&x, &y)| eq(a, x, b, y, true))
        }
        eq(self, self.root(), other, other.root(), false)
    }
}

/// Iterator for [`TaskTree::dfs`].
pub struct Dfs<'a> {
    tree: &'a TaskTree,
    stack: Vec<NodeId>,
}

impl Iterator for Dfs<'_> {
    type Item = NodeId;

    fn next(&mut self) -> Option<NodeId> {
        let id = self.stack.pop()?;
        self.stack
            .extend(self.tree.children(id).iter().rev().copied());
        Some(id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> TaskTree {
        let mut tree = TaskTree::new();
        let a = tree.add_child(tree.root(), TaskNode::titled("A"));
        tree.add_child(a, TaskNode::titled("A.1"));
        tree.add_child(tree.root(), TaskNode::titled("B"));
        tree
    }

    #[test]
    fn dfs_is_preorder() {
        let tree = sample();
        let titles: Vec<&str> = tree
            .dfs()
            .map(|id| tree.get(id).title.as_str())
            .collect();
        assert_eq!(titles, vec!["", "A", "A.1", "B"]);
    }

    #[test]
    fn parent_links_track_insertion() {
        let mut tree = TaskTree::new();
        let a = tree.add_child(tree.root(), TaskNode::titled("A"));
        let a1 = tree.add_child(a, TaskNode::titled("A.1"));
        assert_eq!(tree.parent(a1), Some(a));
        assert_eq!(tree.parent(a), Some(tree.root()));
        assert_eq!(tree.parent(tree.root()), None);
    }

    #[test]
    fn add_subtask_resolves_remote_parent() {
        let mut tree = TaskTree::new();
        let mut top = TaskNode::titled("top");
        top.task_id = Some("t1".to_string());
        tree.add_subtask(top, None).expect("insert top");

        let child = TaskNode::titled("child");
        let id = tree.add_subtask(child, Some("t1")).expect("insert child");
        assert_eq!(tree.parent(id), Some(tree.find_by_task_id("t1").unwrap()));

        let orphan = TaskNode::titled("orphan");
        assert!(matches!(
            tree.add_subtask(orphan, Some("missing")),
            Err(Error::TaskNotFound(_))
        ));
    }

    #[test]
    fn same_as_ignores_arena_order() {
        let left = sample();

        // Build the same logical tree in a different insertion order.
        let mut right = TaskTree::new();
        let a = right.add_child(right.root(), TaskNode::titled("A"));
        right.add_child(right.root(), TaskNode::titled("B"));
        right.add_child(a, TaskNode::titled("A.1"));

        assert!(left.same_as(&right));

        let mut diverged = sample();
        diverged.get_mut(diverged.find_by_title("A.1")).completed = true;
        assert!(!left.same_as(&diverged));
    }

    impl TaskTree {
        fn find_by_title(&self, title: &str) -> NodeId {
            self.dfs()
                .find(|&id| self.get(id).title == title)
                .expect("title present")
        }
    }
}
