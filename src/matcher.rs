//! Two-pass unit matching.
//!
//! The exact pass pairs units that are equal outright; the fuzzy pass
//! pairs the leftovers by weighted similarity, routed through the
//! correspondence seam. Both passes scan in flatten (depth-first)
//! order and the leftover lists keep that order, which the graft step
//! depends on: a parent unit is always handled before its children.

use crate::config::MergeConfig;
use crate::conflict::{Counterpart, MergeStrategy};
use crate::fingerprint::Unit;

/// One matched (remote, local) pair; indices into the flattened lists.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MatchPair {
    pub remote: usize,
    pub local: usize,
    pub exact: bool,
}

/// Outcome of the matching passes.
#[derive(Debug, Default)]
pub struct MatchSet {
    pub pairs: Vec<MatchPair>,
    /// Remote units with no counterpart, in flatten order.
    pub remote_unmatched: Vec<usize>,
    /// Local units with no counterpart; these stay untouched.
    pub local_unmatched: Vec<usize>,
    /// Remote units a strategy chose to drop.
    pub discarded: Vec<usize>,
}

/// Match remote units against local units.
pub fn match_units(
    remote: &[Unit],
    local: &[Unit],
    config: &MergeConfig,
    strategy: &mut dyn MergeStrategy,
) -> MatchSet {
    let mut rest_remote: Vec<usize> = (0..remote.len()).collect();
    let mut rest_local: Vec<usize> = (0..local.len()).collect();
    let mut pairs: Vec<MatchPair> = Vec::new();
    let mut discarded: Vec<usize> = Vec::new();

    // Exact pass: first equal local unit in list order wins. The hash
    // comparison is only a cheap pre-filter; units that are equal by
    // alias overlap but hash-unequal (alias drift after a rename) still
    // pair in the fuzzy pass at similarity 1.0.
    let mut index = 0;
    while index < rest_remote.len() {
        let r = &remote[rest_remote[index]];
        let found = rest_local
            .iter()
            .position(|&l| r.hash == local[l].hash && r.matches(&local[l]));
        match found {
            Some(position) => pairs.push(MatchPair {
                remote: rest_remote.remove(index),
                local: rest_local.remove(position),
                exact: true,
            }),
            None => index += 1,
        }
    }

    // Fuzzy pass: the first local unit with the strictly greatest
    // similarity above the threshold is the engine's candidate; the
    // strategy has the final word.
    let mut index = 0;
    while index < rest_remote.len() {
        let r = &remote[rest_remote[index]];
        let mut best: Option<usize> = None;
        let mut best_score = config.ratio_threshold;
        for (position, &l) in rest_local.iter().enumerate() {
            let score = local[l].similarity(r, config);
            if score > best_score {
                best_score = score;
                best = Some(position);
            }
        }

        let candidates: Vec<&Unit> = rest_local.iter().map(|&l| &local[l]).collect();
        match strategy.select_counterpart(r, &candidates, best) {
            Counterpart::Existing(position) if position < rest_local.len() => {
                pairs.push(MatchPair {
                    remote: rest_remote.remove(index),
                    local: rest_local.remove(position),
                    exact: false,
                });
            }
            Counterpart::Discard => discarded.push(rest_remote.remove(index)),
            _ => index += 1,
        }
    }

    tracing::debug!(
        exact = pairs.iter().filter(|p| p.exact).count(),
        fuzzy = pairs.iter().filter(|p| !p.exact).count(),
        remote_left = rest_remote.len(),
        local_left = rest_local.len(),
        "matching finished"
    );

    MatchSet {
        pairs,
        remote_unmatched: rest_remote,
        local_unmatched: rest_local,
        discarded,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::conflict::AutoMerge;
    use crate::fingerprint::flatten;
    use crate::tree::{TaskNode, TaskTree};

    fn tree_of(entries: &[(&str, &[&str])]) -> TaskTree {
        let mut tree = TaskTree::new();
        for (title, notes) in entries {
            let mut node = TaskNode::titled(*title);
            node.notes = notes.iter().map(|s| s.to_string()).collect();
            tree.add_child(tree.root(), node);
        }
        tree
    }

    fn titles<'a>(units: &'a [Unit], indices: &[usize]) -> Vec<&'a str> {
        indices
            .iter()
            .map(|&i| units[i].titles.first().map(String::as_str).unwrap_or(""))
            .collect()
    }

    #[test]
    fn exact_match_beats_any_similarity() {
        let remote_tree = tree_of(&[("Task", &["body"])]);
        // The near-identical unit comes first, the identical one second;
        // the exact pass must still pick the identical one.
        let local_tree = tree_of(&[("Task!", &["body"]), ("Task", &["body"])]);

        let remote = flatten(&remote_tree);
        let local = flatten(&local_tree);
        let outcome = match_units(&remote, &local, &MergeConfig::default(), &mut AutoMerge);

        let pair = outcome
            .pairs
            .iter()
            .find(|p| !remote[p.remote].titles.is_empty())
            .expect("task pair");
        assert!(pair.exact);
        assert_eq!(local[pair.local].titles[0], "Task");
        assert_eq!(titles(&local, &outcome.local_unmatched), vec!["Task!"]);
    }

    #[test]
    fn fuzzy_match_requires_strictly_above_threshold() {
        // Titles share 6 of 10 characters: title similarity 0.6, notes
        // empty and equal: 1.0. Score = 0.7 * 0.6 + 0.3 = 0.72 < 0.85.
        let remote_tree = tree_of(&[("aaaaaaXXXX", &[])]);
        let local_tree = tree_of(&[("aaaaaaYYYY", &[])]);

        let remote = flatten(&remote_tree);
        let local = flatten(&local_tree);
        let outcome = match_units(&remote, &local, &MergeConfig::default(), &mut AutoMerge);

        assert_eq!(titles(&remote, &outcome.remote_unmatched), vec!["aaaaaaXXXX"]);
        assert_eq!(titles(&local, &outcome.local_unmatched), vec!["aaaaaaYYYY"]);
    }

    #[test]
    fn fuzzy_match_links_close_titles() {
        // 9 of 11 title characters survive: 0.7 * (9/11) + 0.3 ≈ 0.87.
        let remote_tree = tree_of(&[("B2 modified", &["body"])]);
        let local_tree = tree_of(&[("B2 modifXX", &["body"])]);

        let remote = flatten(&remote_tree);
        let local = flatten(&local_tree);
        let outcome = match_units(&remote, &local, &MergeConfig::default(), &mut AutoMerge);

        let pair = outcome
            .pairs
            .iter()
            .find(|p| !remote[p.remote].titles.is_empty())
            .expect("task pair");
        assert!(!pair.exact);
        assert!(outcome.remote_unmatched.is_empty());
    }

    #[test]
    fn ties_break_to_the_first_local_unit() {
        // Remote notes grew a character, so neither local is an exact
        // match, but both score identically in the fuzzy pass.
        let remote_tree = tree_of(&[("Duplicate", &["extra!"])]);
        let local_tree = tree_of(&[("Duplicate", &["extra"]), ("Duplicate", &["extra"])]);

        let remote = flatten(&remote_tree);
        let local = flatten(&local_tree);
        let outcome = match_units(&remote, &local, &MergeConfig::default(), &mut AutoMerge);

        // Notes differ, so the pair is fuzzy; both candidates score the
        // same and the first one wins.
        let pair = outcome
            .pairs
            .iter()
            .find(|p| !p.exact)
            .expect("fuzzy pair");
        assert_eq!(pair.local, 1);
        assert_eq!(outcome.local_unmatched, vec![2]);
    }

    #[test]
    fn score_equal_to_threshold_never_matches() {
        // Same title, remote notes a superset of local notes: the score
        // is exactly 1.0. The threshold comparison is strict, so a
        // threshold of 1.0 rejects even a perfect score.
        let remote_tree = tree_of(&[("Task", &["note plus more"])]);
        let local_tree = tree_of(&[("Task", &["note"])]);
        let remote = flatten(&remote_tree);
        let local = flatten(&local_tree);

        let mut config = MergeConfig::default();
        config.ratio_threshold = 1.0;
        let outcome = match_units(&remote, &local, &config, &mut AutoMerge);
        assert_eq!(titles(&remote, &outcome.remote_unmatched), vec!["Task"]);

        config.ratio_threshold = 0.99;
        let outcome = match_units(&remote, &local, &config, &mut AutoMerge);
        assert!(outcome.remote_unmatched.is_empty());
        assert!(outcome.pairs.iter().any(|p| !p.exact));
    }

    #[test]
    fn leftovers_keep_flatten_order() {
        let remote_tree = tree_of(&[("only remote 1", &[]), ("only remote 2", &[])]);
        let local_tree = tree_of(&[("only local", &[])]);

        let remote = flatten(&remote_tree);
        let local = flatten(&local_tree);
        let outcome = match_units(&remote, &local, &MergeConfig::default(), &mut AutoMerge);

        assert_eq!(
            titles(&remote, &outcome.remote_unmatched),
            vec!["only remote 1", "only remote 2"]
        );
    }

    #[test]
    fn discard_drops_the_remote_unit() {
        struct DiscardAll;
        impl MergeStrategy for DiscardAll {
            fn select_counterpart(
                &mut self,
                _remote: &Unit,
                _candidates: &[&Unit],
                _best: Option<usize>,
            ) -> Counterpart {
                Counterpart::Discard
            }
        }

        let remote_tree = tree_of(&[("unwanted", &[])]);
        let local_tree = TaskTree::new();

        let remote = flatten(&remote_tree);
        let local = flatten(&local_tree);
        let outcome = match_units(&remote, &local, &MergeConfig::default(), &mut DiscardAll);

        assert!(outcome.remote_unmatched.is_empty());
        assert_eq!(titles(&remote, &outcome.discarded), vec!["unwanted"]);
    }
}
