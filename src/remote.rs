//! Remote task-service contract and conversions.
//!
//! Transport and authentication stay outside this crate: anything that
//! can list, insert and delete tasks plugs in through [`TaskService`].
//! This module converts between service listings and [`TaskTree`]s and
//! pushes a tree back out.

use std::collections::VecDeque;

use serde::{Deserialize, Serialize};

use crate::conflict::MergeStrategy;
use crate::error::{Error, Result};
use crate::tree::{NodeId, TaskNode, TaskTree};

/// Completion state on the wire.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum RemoteStatus {
    #[default]
    NeedsAction,
    Completed,
}

/// One task as the service reports it.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RemoteTask {
    pub id: String,
    pub title: String,
    /// Parent task id; absent means top-level.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub parent: Option<String>,
    /// Note text, newline-separated.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,
    #[serde(default)]
    pub status: RemoteStatus,
}

/// Payload for [`TaskService::insert`].
#[derive(Debug, Clone)]
pub struct InsertRequest {
    pub parent: Option<String>,
    pub title: String,
    pub notes: Option<String>,
    pub status: RemoteStatus,
}

/// The remote side of a sync.
///
/// `list` may return tasks in any order, children before parents
/// included. `insert` appends: a subsequent `list` reports tasks in
/// insertion order.
pub trait TaskService {
    fn list(&mut self) -> Result<Vec<RemoteTask>>;
    fn insert(&mut self, request: InsertRequest) -> Result<String>;
    fn delete(&mut self, id: &str) -> Result<()>;
}

/// Convert a listing into a tree, tolerating out-of-order parents.
///
/// Items whose parent has not been inserted yet go back on a deferred
/// queue; a full pass over the queue that inserts nothing means the
/// remaining parents can never resolve, which is fatal. Each pass
/// inserts at least one item, so the loop is bounded by the input size.
pub fn listing_to_tree(listing: Vec<RemoteTask>) -> Result<TaskTree> {
    let mut tree = TaskTree::new();
    let mut pending: VecDeque<RemoteTask> = listing.into();

    while !pending.is_empty() {
        let mut progressed = false;
        for _ in 0..pending.len() {
            let Some(item) = pending.pop_front() else {
                break;
            };
            match tree.add_subtask(node_from_remote(&item), item.parent.as_deref()) {
                Ok(_) => progressed = true,
                Err(Error::TaskNotFound(_)) => pending.push_back(item),
                Err(err) => return Err(err),
            }
        }
        if !progressed {
            return Err(Error::StalledListing {
                remaining: pending.len(),
            });
        }
    }

    Ok(tree)
}

fn node_from_remote(task: &RemoteTask) -> TaskNode {
    TaskNode {
        title: task.title.clone(),
        task_id: Some(task.id.clone()),
        notes: task
            .notes
            .as_deref()
            .map(|text| text.lines().map(str::to_string).collect())
            .unwrap_or_default(),
        todo: true,
        completed: task.status == RemoteStatus::Completed,
        ..TaskNode::default()
    }
}

/// Push a tree to the service, parents first, skipping subtrees the
/// strategy rules out. Assigned ids are recorded back into the tree.
/// Returns the number of inserted tasks.
pub fn push_tree(
    service: &mut dyn TaskService,
    tree: &mut TaskTree,
    strategy: &mut dyn MergeStrategy,
) -> Result<usize> {
    push_children(service, tree, tree.root(), None, strategy)
}

fn push_children(
    service: &mut dyn TaskService,
    tree: &mut TaskTree,
    id: NodeId,
    parent_remote_id: Option<&str>,
    strategy: &mut dyn MergeStrategy,
) -> Result<usize> {
    let mut pushed = 0;
    let children: Vec<NodeId> = tree.children(id).to_vec();
    for child in children {
        if !strategy.is_needed(tree.get(child)) {
            continue;
        }
        let node = tree.get(child);
        let request = InsertRequest {
            parent: parent_remote_id.map(str::to_string),
            title: node.title.clone(),
            notes: if node.notes.is_empty() {
                None
            } else {
                Some(node.notes.join("\n"))
            },
            status: if node.completed {
                RemoteStatus::Completed
            } else {
                RemoteStatus::NeedsAction
            },
        };
        let remote_id = service.insert(request)?;
        tree.get_mut(child).task_id = Some(remote_id.clone());
        pushed += 1 + push_children(service, tree, child, Some(&remote_id), strategy)?;
    }
    Ok(pushed)
}

/// Delete every task the service lists. Returns the number deleted.
pub fn erase_all(service: &mut dyn TaskService) -> Result<usize> {
    let tasks = service.list()?;
    let count = tasks.len();
    for task in tasks {
        service.delete(&task.id)?;
    }
    Ok(count)
}
