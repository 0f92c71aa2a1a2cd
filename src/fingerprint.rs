//! Tree flattening and comparison units.
//!
//! Each node flattens into a [`Unit`]: its title plus every
//! `PREV_ORG_TITLE` alias recorded in its notes, the remaining note text
//! normalized for comparison, and a cheap character-sum hash. Units are
//! what the matcher compares; they keep a handle back to the node and to
//! the parent unit so unmatched remote units can be re-attached.

use std::collections::HashMap;

use crate::config::MergeConfig;
use crate::tree::{NodeId, TaskTree};

/// Machine-readable note line kinds carrying merge provenance.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Annotation<'a> {
    /// A title that a previous merge overwrote; acts as an alias.
    PrevTitle(&'a str),
    /// A note line appended from the remote side by a previous merge.
    RemoteAppend(&'a str),
    /// Informational marker left on orphan grafts.
    MergeInfo(&'a str),
}

pub const PREV_TITLE_PREFIX: &str = "PREV_ORG_TITLE: ";
pub const REMOTE_APPEND_PREFIX: &str = "REMOTE_APPEND_NOTE: ";
pub const MERGE_INFO_PREFIX: &str = "MERGE_INFO: ";

/// Recognize an annotation line. Matching is prefix-exact; a line like
/// `Remember: call back` is ordinary note text.
pub fn parse_annotation(line: &str) -> Option<Annotation<'_>> {
    if let Some(rest) = line.strip_prefix(PREV_TITLE_PREFIX) {
        Some(Annotation::PrevTitle(rest))
    } else if let Some(rest) = line.strip_prefix(REMOTE_APPEND_PREFIX) {
        Some(Annotation::RemoteAppend(rest))
    } else if let Some(rest) = line.strip_prefix(MERGE_INFO_PREFIX) {
        Some(Annotation::MergeInfo(rest))
    } else {
        None
    }
}

/// Flattened, comparable view of one tree node.
#[derive(Debug, Clone)]
pub struct Unit {
    /// The node this unit was built from.
    pub node: NodeId,
    /// Index of the parent's unit in the flattened list; `None` for the
    /// synthetic root's unit.
    pub parent: Option<usize>,
    /// Own title first (when non-empty), then `PREV_ORG_TITLE` aliases
    /// in note order, duplicates skipped.
    pub titles: Vec<String>,
    /// Remaining note lines, `REMOTE_APPEND_NOTE` unwrapped, joined by
    /// single spaces.
    pub notes_text: String,
    /// Sum of character code points over all titles and `notes_text`.
    /// A coarse pre-filter for the exact pass, never an identity.
    pub hash: u64,
}

impl Unit {
    fn build(tree: &TaskTree, node: NodeId, parent: Option<usize>) -> Self {
        let data = tree.get(node);

        let mut titles: Vec<String> = Vec::new();
        if !data.title.is_empty() {
            titles.push(data.title.clone());
        }

        let mut notes: Vec<&str> = Vec::new();
        for line in &data.notes {
            match parse_annotation(line) {
                Some(Annotation::PrevTitle(alias)) => {
                    if !titles.iter().any(|t| t == alias) {
                        titles.push(alias.to_string());
                    }
                }
                Some(Annotation::RemoteAppend(bare)) => notes.push(bare),
                // MERGE_INFO is informational; it stays comparable text.
                _ => notes.push(line),
            }
        }
        let notes_text = notes.join(" ");

        let hash = titles
            .iter()
            .flat_map(|t| t.chars())
            .chain(notes_text.chars())
            .map(|c| u64::from(u32::from(c)))
            .sum();

        Self {
            node,
            parent,
            titles,
            notes_text,
            hash,
        }
    }

    /// Exact equality: both title sets empty (the two synthetic roots),
    /// or a shared alias plus equal note text.
    pub fn matches(&self, other: &Unit) -> bool {
        if self.titles.is_empty() && other.titles.is_empty() {
            return true;
        }
        self.titles.iter().any(|t| other.titles.contains(t)) && self.notes_text == other.notes_text
    }

    /// Weighted similarity against a remote unit. Title similarity is
    /// the best score over all alias pairs.
    pub fn similarity(&self, remote: &Unit, config: &MergeConfig) -> f64 {
        let title_best = self
            .titles
            .iter()
            .flat_map(|a| remote.titles.iter().map(move |b| string_similarity(a, b)))
            .fold(0.0_f64, f64::max);
        config.title_weight * title_best
            + config.notes_weight * string_similarity(&self.notes_text, &remote.notes_text)
    }
}

/// Flatten a tree depth-first, synthetic root included. The root unit
/// has an empty title set, so the two sides' roots always pair up in
/// the exact pass and anchor top-level grafts.
pub fn flatten(tree: &TaskTree) -> Vec<Unit> {
    let mut units: Vec<Unit> = Vec::new();
    let mut unit_index: HashMap<NodeId, usize> = HashMap::new();

    for node in tree.dfs() {
        // Pre-order guarantees the parent was flattened already.
        let parent = tree.parent(node).and_then(|p| unit_index.get(&p).copied());
        let index = units.len();
        units.push(Unit::build(tree, node, parent));
        unit_index.insert(node, index);
    }

    units
}

/// Similarity of two strings in `[0, 1]`.
///
/// Cost is the minimum number of characters of `a` that must be deleted
/// or substituted to reach `b` under an optimal alignment; insertions
/// are free, so `b` being a superset of `a` costs nothing. Two empty
/// strings are identical.
pub fn string_similarity(a: &str, b: &str) -> f64 {
    if a.is_empty() && b.is_empty() {
        return 1.0;
    }
    let a: Vec<char> = a.chars().collect();
    let b: Vec<char> = b.chars().collect();

    // One-row DP: prev[j] is the cost of aligning a[..i-1] with b[..j].
    let mut prev: Vec<usize> = vec![0; b.len() + 1];
    for (i, &ach) in a.iter().enumerate() {
        let mut row: Vec<usize> = Vec::with_capacity(b.len() + 1);
        row.push(i + 1); // delete the whole prefix of a
        for (j, &bch) in b.iter().enumerate() {
            let substitute = prev[j] + usize::from(ach != bch);
            let delete = prev[j + 1] + 1;
            let insert = row[j]; // free
            row.push(substitute.min(delete).min(insert));
        }
        prev = row;
    }

    1.0 - prev[b.len()] as f64 / a.len().max(b.len()) as f64
}
