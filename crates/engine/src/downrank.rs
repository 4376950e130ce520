//! Author diversity down-ranker
//!
//! Reduces the ranks of authors who appear multiple times in a scored
//! batch. The list is sorted ascending by rank before the pass, so the
//! lowest-scoring occurrence of a repeated author is penalized first and
//! the strongest occurrence keeps the mildest cumulative penalty. The
//! ascending order is intentional, long-observed behavior; do not flip it
//! without the owning team's sign-off.

use fedirank_common::models::RankedCandidate;
use std::collections::HashMap;

/// Multiplier applied to each repeat occurrence of an author; compounds
/// per occurrence (0.75, 0.5625, ...)
const AUTHOR_PENALTY: f32 = 0.75;

/// Apply the diversity penalty. The first-seen occurrence of an author
/// key is untouched; each subsequent occurrence is multiplied by a decay
/// that strengthens with every repeat. Returns the list in ascending
/// order of the pre-penalty ranks.
pub fn downrank_by_author(mut ranked: Vec<RankedCandidate>) -> Vec<RankedCandidate> {
    ranked.sort_by(|a, b| a.rank.partial_cmp(&b.rank).unwrap_or(std::cmp::Ordering::Equal));

    let mut penalties: HashMap<String, f32> = HashMap::new();
    for candidate in ranked.iter_mut() {
        let author_key = candidate.candidate.author_key();
        match penalties.get_mut(&author_key) {
            None => {
                penalties.insert(author_key, AUTHOR_PENALTY);
            }
            Some(multiplier) => {
                candidate.rank *= *multiplier;
                *multiplier *= AUTHOR_PENALTY;
            }
        }
    }

    ranked
}

#[cfg(test)]
mod tests {
    use super::*;
    use fedirank_common::models::Candidate;

    fn ranked(status_id: &str, author: &str, rank: f32) -> RankedCandidate {
        RankedCandidate {
            candidate: Candidate {
                status_id: status_id.into(),
                status_external_id: status_id.into(),
                status_domain: "s.net".into(),
                account_id: "100".into(),
                account_url: "https://local/users/viewer".into(),
                author_username: author.into(),
                author_domain: "a.net".into(),
            },
            rank,
        }
    }

    #[test]
    fn test_repeated_author_decays_progressively() {
        // Three statuses by the same author, pre-scored 10, 20, 30.
        // Ascending pass: 10 is first-seen (unpenalized), 20 takes 0.75,
        // 30 takes 0.5625.
        let input = vec![
            ranked("1", "alice", 30.0),
            ranked("2", "alice", 10.0),
            ranked("3", "alice", 20.0),
        ];
        let output = downrank_by_author(input);
        let ranks: Vec<f32> = output.iter().map(|c| c.rank).collect();
        assert_eq!(ranks, vec![10.0, 15.0, 16.875]);
    }

    #[test]
    fn test_unique_authors_unchanged() {
        let input = vec![
            ranked("1", "alice", 5.0),
            ranked("2", "bob", 3.0),
            ranked("3", "carol", 4.0),
        ];
        let output = downrank_by_author(input);
        let ranks: Vec<f32> = output.iter().map(|c| c.rank).collect();
        // Reordered ascending, no penalties
        assert_eq!(ranks, vec![3.0, 4.0, 5.0]);
    }

    #[test]
    fn test_length_and_candidates_preserved() {
        let input = vec![
            ranked("1", "alice", 2.0),
            ranked("2", "alice", 1.0),
            ranked("3", "bob", 3.0),
        ];
        let mut input_ids: Vec<String> =
            input.iter().map(|c| c.candidate.status_id.clone()).collect();
        let output = downrank_by_author(input);
        assert_eq!(output.len(), 3);
        let mut output_ids: Vec<String> =
            output.iter().map(|c| c.candidate.status_id.clone()).collect();
        input_ids.sort();
        output_ids.sort();
        assert_eq!(input_ids, output_ids);
    }

    #[test]
    fn test_empty_input() {
        assert!(downrank_by_author(Vec::new()).is_empty());
    }
}
