//! Tree reconciliation: patch matched pairs, graft the rest.
//!
//! `merge_trees` flattens both trees, matches the units, then mutates
//! the local tree in place. Matched pairs pull the remote edits in;
//! unmatched remote units become new local nodes under their resolved
//! parents. Remote data is never dropped: an unresolvable parent grafts
//! the node at the root with a visible `MERGE_INFO` note instead.
//!
//! Re-running a merge against the same remote state is a no-op: the
//! annotation lines written by a previous run are recognized during
//! flattening and the diff step, so nothing is re-applied.

use std::collections::HashMap;

use serde::Serialize;

use crate::config::MergeConfig;
use crate::conflict::MergeStrategy;
use crate::fingerprint::{
    flatten, parse_annotation, Annotation, Unit, MERGE_INFO_PREFIX, PREV_TITLE_PREFIX,
    REMOTE_APPEND_PREFIX,
};
use crate::matcher::match_units;
use crate::timestamp::OrgStamp;
use crate::tree::TaskTree;

/// What a merge did, for reporting.
#[derive(Debug, Clone, Copy, Default, Serialize)]
pub struct MergeReport {
    pub exact: usize,
    pub fuzzy: usize,
    pub grafted: usize,
    pub orphaned: usize,
    pub discarded: usize,
}

/// Merge `remote` into `local`, in place.
pub fn merge_trees(
    local: &mut TaskTree,
    remote: &TaskTree,
    config: &MergeConfig,
    strategy: &mut dyn MergeStrategy,
) -> MergeReport {
    let remote_units = flatten(remote);
    let local_units = flatten(local);
    let matched = match_units(&remote_units, &local_units, config, strategy);

    for pair in &matched.pairs {
        patch_pair(
            local,
            remote,
            &remote_units[pair.remote],
            &local_units[pair.local],
            strategy,
        );
    }

    // Where each remote unit landed locally; extended as grafts happen
    // so a grafted child finds its grafted parent.
    let mut landed: HashMap<usize, _> = matched
        .pairs
        .iter()
        .map(|pair| (pair.remote, local_units[pair.local].node))
        .collect();

    let mut grafted = 0;
    let mut orphaned = 0;
    for &index in &matched.remote_unmatched {
        let unit = &remote_units[index];
        let source = remote.get(unit.node);
        let mut node = source.clone();

        let parent = match unit.parent.and_then(|p| landed.get(&p).copied()) {
            Some(id) => id,
            None => {
                node.notes
                    .push(format!("{MERGE_INFO_PREFIX}parent is not exist"));
                orphaned += 1;
                local.root()
            }
        };
        let id = local.add_child(parent, node);
        landed.insert(index, id);
        grafted += 1;
    }

    let report = MergeReport {
        exact: matched.pairs.iter().filter(|p| p.exact).count(),
        fuzzy: matched.pairs.iter().filter(|p| !p.exact).count(),
        grafted,
        orphaned,
        discarded: matched.discarded.len(),
    };
    tracing::debug!(?report, "merge finished");
    report
}

/// Decisions for one matched pair, computed on shared borrows before
/// any mutation. The outer `Option` means "no conflict, leave as is".
#[derive(Debug, Default)]
struct PatchPlan {
    todo: bool,
    completed: bool,
    title: Option<String>,
    notes: Option<Vec<String>>,
    scheduled_start: Option<Option<OrgStamp>>,
    scheduled_end: Option<Option<OrgStamp>>,
    closed: Option<Option<OrgStamp>>,
}

fn patch_pair(
    local_tree: &mut TaskTree,
    remote_tree: &TaskTree,
    remote_unit: &Unit,
    local_unit: &Unit,
    strategy: &mut dyn MergeStrategy,
) {
    let remote = remote_tree.get(remote_unit.node);
    let plan = {
        let local = local_tree.get(local_unit.node);
        let mut plan = PatchPlan {
            // A remote task promotes a plain headline, never the reverse.
            todo: local.todo || remote.todo,
            completed: strategy.merge_completed(remote, local),
            ..PatchPlan::default()
        };

        let mut appends: Vec<String> = Vec::new();

        // A remote title that is already a recorded alias was applied by
        // an earlier merge and then renamed away locally; leave it be.
        if remote.title != local.title && !local_unit.titles.contains(&remote.title) {
            let chosen = strategy.merge_title(remote, local);
            if chosen != local.title {
                appends.push(format!("{PREV_TITLE_PREFIX}{}", local.title));
                plan.title = Some(chosen);
            }
        }

        if remote.notes != local.notes {
            for line in &remote.notes {
                let bare = match parse_annotation(line) {
                    Some(Annotation::PrevTitle(_)) => continue,
                    Some(Annotation::RemoteAppend(text)) => text,
                    _ => line.as_str(),
                };
                // Compare against local lines with their own wrappers
                // unwrapped, or an already-applied append would be
                // re-appended on every run.
                let already = local.notes.iter().any(|note| {
                    note.as_str() == bare
                        || matches!(
                            parse_annotation(note),
                            Some(Annotation::RemoteAppend(text)) if text == bare
                        )
                });
                if !already {
                    appends.push(format!("{REMOTE_APPEND_PREFIX}{bare}"));
                }
            }
        }

        if !appends.is_empty() || remote.notes != local.notes {
            plan.notes = Some(strategy.merge_notes(remote, local, &appends));
        }

        if remote.scheduled_start != local.scheduled_start {
            plan.scheduled_start = Some(strategy.merge_scheduled_start(remote, local));
        }
        if remote.scheduled_end != local.scheduled_end {
            plan.scheduled_end = Some(strategy.merge_scheduled_end(remote, local));
        }
        if plan.completed && (local.closed.is_none() || remote.closed.is_some_and(|r| Some(r) != local.closed))
        {
            plan.closed = Some(strategy.merge_closed(remote, local));
        }

        plan
    };

    let local = local_tree.get_mut(local_unit.node);
    local.todo = plan.todo;
    local.completed = plan.completed;
    if let Some(title) = plan.title {
        local.title = title;
    }
    if let Some(notes) = plan.notes {
        local.notes = notes;
    }
    if let Some(value) = plan.scheduled_start {
        local.scheduled_start = value;
    }
    if let Some(value) = plan.scheduled_end {
        local.scheduled_end = value;
    }
    if let Some(value) = plan.closed {
        local.closed = value;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::conflict::{AutoMerge, Counterpart};
    use crate::org;

    fn merge(local: &str, remote: &str) -> (TaskTree, MergeReport) {
        let mut local = org::parse(local).expect("local parses");
        let remote = org::parse(remote).expect("remote parses");
        let report = merge_trees(&mut local, &remote, &MergeConfig::default(), &mut AutoMerge);
        (local, report)
    }

    const SCENARIO_LOCAL: &str = "\
* A1
* A2
** A2.1
* B1
** B1.1
   Remote append B1.1 body text.
* B2
";

    const SCENARIO_REMOTE: &str = "\
* A1
** A1.1
* B1
** B1.1
   Remote append B1.1 body text.
* A2
** A2.1
* B2 modified
  New B2 body text.
";

    const SCENARIO_MERGED: &str = "\
* A1
** A1.1
* A2
** A2.1
* B1
** B1.1
    Remote append B1.1 body text.
* B2 modified
   PREV_ORG_TITLE: B2
   REMOTE_APPEND_NOTE: New B2 body text.
";

    #[test]
    fn end_to_end_scenario() {
        let (merged, report) = merge(SCENARIO_LOCAL, SCENARIO_REMOTE);
        assert_eq!(org::serialize(&merged), SCENARIO_MERGED);

        // Six exact pairs (incl. the roots), the renamed B2, one graft.
        assert_eq!(report.exact, 6);
        assert_eq!(report.fuzzy, 1);
        assert_eq!(report.grafted, 1);
        assert_eq!(report.orphaned, 0);
    }

    #[test]
    fn merge_is_idempotent() {
        let (merged, _) = merge(SCENARIO_LOCAL, SCENARIO_REMOTE);
        let after_first = org::serialize(&merged);

        let (merged_again, report) = merge(&after_first, SCENARIO_REMOTE);
        assert_eq!(org::serialize(&merged_again), after_first);
        assert_eq!(report.grafted, 0);
    }

    #[test]
    fn merging_a_tree_with_itself_changes_nothing() {
        let (merged, report) = merge(SCENARIO_MERGED, SCENARIO_MERGED);
        assert_eq!(org::serialize(&merged), SCENARIO_MERGED);
        assert_eq!(report.grafted, 0);
        assert_eq!(report.fuzzy, 0);
    }

    #[test]
    fn title_conflict_records_history() {
        let (merged, _) = merge("* B2\n", "* B2 modified\n  New text\n");
        let node = merged.get(merged.children(merged.root())[0]);
        assert_eq!(node.title, "B2 modified");
        assert_eq!(
            node.notes,
            vec![
                "PREV_ORG_TITLE: B2".to_string(),
                "REMOTE_APPEND_NOTE: New text".to_string(),
            ]
        );
    }

    #[test]
    fn remote_title_matching_an_alias_is_left_alone() {
        // The local task was renamed by an earlier merge; the remote
        // side still carries the old title. Nothing may change, or the
        // titles would oscillate between runs.
        let local = "* B2 modified\n   PREV_ORG_TITLE: B2\n";
        let (merged, _) = merge(local, "* B2\n");
        assert_eq!(org::serialize(&merged), local);
    }

    #[test]
    fn status_only_escalates() {
        let (merged, _) = merge("* TODO Task\n", "* DONE Task\n");
        let node = merged.get(merged.children(merged.root())[0]);
        assert!(node.todo && node.completed);

        // A remote regression does not undo local completion.
        let (merged, _) = merge("* DONE Task\n", "* TODO Task\n");
        let node = merged.get(merged.children(merged.root())[0]);
        assert!(node.todo && node.completed);

        // A plain remote headline does not demote a local task.
        let (merged, _) = merge("* TODO Task\n", "* Task\n");
        let node = merged.get(merged.children(merged.root())[0]);
        assert!(node.todo && !node.completed);
    }

    #[test]
    fn completion_without_recorded_time_gets_now() {
        let (merged, _) = merge("* TODO Task\n", "* DONE Task\n");
        let node = merged.get(merged.children(merged.root())[0]);
        let closed = node.closed.expect("closed stamp");
        assert!(closed.has_time);
        let age = OrgStamp::now().when - closed.when;
        assert!(age.num_seconds().abs() < 5);

        let rendered = org::serialize(&merged);
        assert!(rendered.contains("CLOSED: ["));
    }

    #[test]
    fn earlier_closed_time_wins() {
        let (merged, _) = merge(
            "* DONE Task\n  CLOSED: [2015-12-10 Thu 09:00]\n",
            "* DONE Task\n  CLOSED: [2015-12-09 Wed 21:00]\n",
        );
        let node = merged.get(merged.children(merged.root())[0]);
        let closed = node.closed.expect("closed stamp");
        assert_eq!(
            org::serialize(&merged),
            "* DONE Task\n   CLOSED: [2015-12-09 Wed 21:00]\n"
        );
        assert!(closed.has_time);
    }

    #[test]
    fn schedule_conflict_defaults_to_remote_value() {
        let (merged, _) = merge(
            "* Task\n  SCHEDULED: <2015-12-09 Wed>\n",
            "* Task\n  SCHEDULED: <2015-12-11 Fri>\n",
        );
        assert_eq!(
            org::serialize(&merged),
            "* Task\n   SCHEDULED: <2015-12-11 Fri>\n"
        );

        // Remote silence keeps the local stamp.
        let (merged, _) = merge("* Task\n  SCHEDULED: <2015-12-09 Wed>\n", "* Task\n");
        assert_eq!(
            org::serialize(&merged),
            "* Task\n   SCHEDULED: <2015-12-09 Wed>\n"
        );
    }

    #[test]
    fn grafted_chain_preserves_hierarchy() {
        let (merged, report) = merge("", "* P\n** C\n*** D\n");
        assert_eq!(org::serialize(&merged), "* P\n** C\n*** D\n");
        assert_eq!(report.grafted, 3);
        assert_eq!(report.orphaned, 0);
    }

    #[test]
    fn discarded_parent_orphans_the_child_visibly() {
        struct DiscardP;
        impl MergeStrategy for DiscardP {
            fn select_counterpart(
                &mut self,
                remote: &Unit,
                _candidates: &[&Unit],
                best: Option<usize>,
            ) -> Counterpart {
                if remote.titles.first().map(String::as_str) == Some("P") {
                    Counterpart::Discard
                } else {
                    match best {
                        Some(index) => Counterpart::Existing(index),
                        None => Counterpart::Graft,
                    }
                }
            }
        }

        let mut local = org::parse("").expect("empty");
        let remote = org::parse("* P\n** C\n").expect("remote");
        let report = merge_trees(&mut local, &remote, &MergeConfig::default(), &mut DiscardP);

        assert_eq!(report.discarded, 1);
        assert_eq!(report.orphaned, 1);
        assert_eq!(
            org::serialize(&local),
            "* C\n   MERGE_INFO: parent is not exist\n"
        );
    }

    #[test]
    fn local_only_tasks_are_untouched() {
        let (merged, _) = merge("* Local only\n  keep me\n* Shared\n", "* Shared\n");
        assert_eq!(
            org::serialize(&merged),
            "* Local only\n   keep me\n* Shared\n"
        );
    }
}
