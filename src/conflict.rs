//! Conflict resolution seams for the merge engine.
//!
//! Every decision the patcher makes at a conflict point goes through
//! [`MergeStrategy`], one method per decision kind. The trait's default
//! bodies are the non-interactive policies; the engine always calls
//! through the trait, so a substituted strategy sees every decision.
//! [`AutoMerge`] is the all-defaults strategy, [`InteractiveMerge`]
//! prompts the user and can hand note conflicts to an external editor.

use std::io::{BufRead, Write};

use crate::fingerprint::Unit;
use crate::timestamp::{EnglishWeekdays, OrgStamp};
use crate::tree::TaskNode;

/// Answer to the "which local unit corresponds to this remote unit?"
/// question of the fuzzy pass.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Counterpart {
    /// Pair with the local unit at this position of the candidate list.
    Existing(usize),
    /// No counterpart; graft the remote unit as a new task.
    Graft,
    /// Drop the remote unit entirely.
    Discard,
}

/// One overridable decision per conflict kind.
///
/// Implementations must always return a valid choice; the engine does
/// not second-guess them.
pub trait MergeStrategy {
    /// Whether a local task takes part in a push. Default: all do.
    fn is_needed(&mut self, local: &TaskNode) -> bool {
        let _ = local;
        true
    }

    /// Resolve an ambiguous correspondence. `best` is the engine's
    /// candidate: the first strictly-best local unit above the
    /// similarity threshold, if any.
    fn select_counterpart(
        &mut self,
        remote: &Unit,
        candidates: &[&Unit],
        best: Option<usize>,
    ) -> Counterpart {
        let _ = (remote, candidates);
        match best {
            Some(index) => Counterpart::Existing(index),
            None => Counterpart::Graft,
        }
    }

    /// Pick the title of a matched pair with diverging titles.
    /// Default: the remote edit wins.
    fn merge_title(&mut self, remote: &TaskNode, local: &TaskNode) -> String {
        let _ = local;
        remote.title.clone()
    }

    /// Merge completion status. Default: done stays done.
    fn merge_completed(&mut self, remote: &TaskNode, local: &TaskNode) -> bool {
        remote.completed || local.completed
    }

    /// Pick the closed time of a completed pair. Invoked only for nodes
    /// that are completed after the status merge. Default: the earlier
    /// recorded time, either recorded time, or now.
    fn merge_closed(&mut self, remote: &TaskNode, local: &TaskNode) -> Option<OrgStamp> {
        match (remote.closed, local.closed) {
            (Some(a), Some(b)) => Some(a.min(b)),
            (Some(a), None) => Some(a),
            (None, Some(b)) => Some(b),
            (None, None) => Some(OrgStamp::now()),
        }
    }

    /// Resolve a diverging scheduled start. Default: remote when it has
    /// one, otherwise keep local.
    fn merge_scheduled_start(&mut self, remote: &TaskNode, local: &TaskNode) -> Option<OrgStamp> {
        remote.scheduled_start.or(local.scheduled_start)
    }

    /// Resolve a diverging scheduled end. Default: remote when it has
    /// one, otherwise keep local.
    fn merge_scheduled_end(&mut self, remote: &TaskNode, local: &TaskNode) -> Option<OrgStamp> {
        remote.scheduled_end.or(local.scheduled_end)
    }

    /// Assemble the final note lines of a matched pair. `appends` are
    /// the annotation and diff lines the patcher wants to add. Default:
    /// keep the local notes and append.
    fn merge_notes(
        &mut self,
        remote: &TaskNode,
        local: &TaskNode,
        appends: &[String],
    ) -> Vec<String> {
        let _ = remote;
        local
            .notes
            .iter()
            .cloned()
            .chain(appends.iter().cloned())
            .collect()
    }
}

/// Non-interactive strategy: every decision takes its default.
#[derive(Debug, Default, Clone, Copy)]
pub struct AutoMerge;

impl MergeStrategy for AutoMerge {}

/// Strategy that asks the user on stderr/stdin and can open `$EDITOR`
/// on conflicting note blocks.
#[derive(Debug, Default)]
pub struct InteractiveMerge {
    names: EnglishWeekdays,
}

impl InteractiveMerge {
    pub fn new() -> Self {
        Self::default()
    }

    fn read_line(&self) -> String {
        let mut buf = String::new();
        if std::io::stdin().lock().read_line(&mut buf).is_err() {
            return String::new();
        }
        buf.trim().to_string()
    }

    fn select_index(&self, limit: usize) -> Option<usize> {
        match self.read_line().parse::<usize>() {
            Ok(value) if value < limit => Some(value),
            _ => None,
        }
    }

    fn stamp_label(&self, stamp: Option<&OrgStamp>) -> String {
        match stamp {
            Some(stamp) => stamp.body(&self.names),
            None => "(none)".to_string(),
        }
    }

    fn edit_notes(&self, remote: &[String], local: &[String]) -> Option<Vec<String>> {
        let mut file = tempfile::NamedTempFile::new().ok()?;
        for line in remote.iter().chain(local.iter()) {
            writeln!(file, "{line}").ok()?;
        }
        file.flush().ok()?;

        let editor = std::env::var("EDITOR").unwrap_or_else(|_| "vi".to_string());
        let status = std::process::Command::new(editor)
            .arg(file.path())
            .status()
            .ok()?;
        if !status.success() {
            return None;
        }

        let edited = std::fs::read_to_string(file.path()).ok()?;
        Some(edited.lines().map(|line| line.trim().to_string()).collect())
    }
}

impl MergeStrategy for InteractiveMerge {
    fn select_counterpart(
        &mut self,
        remote: &Unit,
        candidates: &[&Unit],
        best: Option<usize>,
    ) -> Counterpart {
        let title = remote.titles.first().map(String::as_str).unwrap_or("");
        eprintln!("\"{title}\" has no exact counterpart in the org tree.");
        for (index, unit) in candidates.iter().enumerate() {
            let candidate = unit.titles.first().map(String::as_str).unwrap_or("");
            let marker = if best == Some(index) { " (closest)" } else { "" };
            eprintln!("[{index}] {candidate}{marker}");
        }
        eprintln!("[n] create new   [d] discard");

        loop {
            match self.read_line().as_str() {
                "n" => return Counterpart::Graft,
                "d" => return Counterpart::Discard,
                text => {
                    if let Ok(index) = text.parse::<usize>() {
                        if index < candidates.len() {
                            return Counterpart::Existing(index);
                        }
                    }
                    eprintln!("Incorrect input!");
                }
            }
        }
    }

    fn merge_title(&mut self, remote: &TaskNode, local: &TaskNode) -> String {
        eprintln!("Tasks have different titles:");
        eprintln!("[0] {}", remote.title);
        eprintln!("[1] {}", local.title);
        loop {
            match self.select_index(2) {
                Some(0) => return remote.title.clone(),
                Some(_) => return local.title.clone(),
                None => eprintln!("Incorrect input!"),
            }
        }
    }

    fn merge_scheduled_start(&mut self, remote: &TaskNode, local: &TaskNode) -> Option<OrgStamp> {
        eprintln!(
            "Task \"{}\" has different scheduled start times:",
            remote.title
        );
        eprintln!("[0] {}", self.stamp_label(remote.scheduled_start.as_ref()));
        eprintln!("[1] {}", self.stamp_label(local.scheduled_start.as_ref()));
        loop {
            match self.select_index(2) {
                Some(0) => return remote.scheduled_start,
                Some(_) => return local.scheduled_start,
                None => eprintln!("Incorrect input!"),
            }
        }
    }

    fn merge_scheduled_end(&mut self, remote: &TaskNode, local: &TaskNode) -> Option<OrgStamp> {
        eprintln!(
            "Task \"{}\" has different scheduled end times:",
            remote.title
        );
        eprintln!("[0] {}", self.stamp_label(remote.scheduled_end.as_ref()));
        eprintln!("[1] {}", self.stamp_label(local.scheduled_end.as_ref()));
        loop {
            match self.select_index(2) {
                Some(0) => return remote.scheduled_end,
                Some(_) => return local.scheduled_end,
                None => eprintln!("Incorrect input!"),
            }
        }
    }

    fn merge_notes(
        &mut self,
        remote: &TaskNode,
        local: &TaskNode,
        appends: &[String],
    ) -> Vec<String> {
        eprintln!("Task \"{}\" has conflicting notes:", remote.title);
        eprintln!("[0] Remote block:");
        for line in &remote.notes {
            eprintln!("    {line}");
        }
        eprintln!("[1] Local block (plus merge appends):");
        for line in local.notes.iter().chain(appends.iter()) {
            eprintln!("    {line}");
        }
        eprintln!("[e] Edit in external editor");

        loop {
            match self.read_line().as_str() {
                "0" => return remote.notes.clone(),
                "1" => {
                    return local
                        .notes
                        .iter()
                        .cloned()
                        .chain(appends.iter().cloned())
                        .collect()
                }
                "e" => {
                    if let Some(edited) = self.edit_notes(&remote.notes, &local.notes) {
                        return edited;
                    }
                    eprintln!("Editor failed; choose a block instead.");
                }
                _ => eprintln!("Incorrect input!"),
            }
        }
    }
}
