//! Vote ranking for a finished round.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

/// How many ranked moves are broadcast back to the voting team.
pub const RESULT_BROADCAST_LIMIT: usize = 10;

/// One entry of a round's ranked result.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RankedMove {
    pub san: String,
    pub votes: u32,
}

/// Rank a round's votes: descending by count, ties broken by the
/// lexicographically smaller move text.
///
/// The tie-break is a deliberate policy choice: equal-count moves must
/// resolve to exactly one deterministic winner so a round has a single
/// reproducible outcome.
pub fn rank_votes(votes: &HashMap<String, u32>) -> Vec<RankedMove> {
    let mut ranked: Vec<RankedMove> = votes
        .iter()
        .map(|(san, count)| RankedMove {
            san: san.clone(),
            votes: *count,
        })
        .collect();
    ranked.sort_by(|a, b| b.votes.cmp(&a.votes).then_with(|| a.san.cmp(&b.san)));
    ranked
}
