//! Property tests for vote ranking.

use std::collections::HashMap;

use proptest::prelude::*;

use crate::domain::tally::rank_votes;

fn arb_votes() -> impl Strategy<Value = HashMap<String, u32>> {
    proptest::collection::hash_map("[a-h][1-8]", 1u32..50, 0..12)
}

proptest! {
    /// Ranking preserves every entry and its count.
    #[test]
    fn ranking_is_a_permutation(votes in arb_votes()) {
        let ranked = rank_votes(&votes);
        prop_assert_eq!(ranked.len(), votes.len());
        for entry in &ranked {
            prop_assert_eq!(votes.get(&entry.san), Some(&entry.votes));
        }
    }

    /// The total of ranked counts equals the number of cast votes.
    #[test]
    fn ranked_counts_sum_to_cast_votes(votes in arb_votes()) {
        let cast: u32 = votes.values().sum();
        let ranked_sum: u32 = rank_votes(&votes).iter().map(|r| r.votes).sum();
        prop_assert_eq!(ranked_sum, cast);
    }

    /// Counts are non-increasing and ties are ordered by move text, so the
    /// winner is unique and reproducible.
    #[test]
    fn ranking_is_deterministic_total_order(votes in arb_votes()) {
        let ranked = rank_votes(&votes);
        for pair in ranked.windows(2) {
            let higher = &pair[0];
            let lower = &pair[1];
            prop_assert!(higher.votes > lower.votes
                || (higher.votes == lower.votes && higher.san < lower.san));
        }
        let again = rank_votes(&votes);
        prop_assert_eq!(ranked, again);
    }
}
