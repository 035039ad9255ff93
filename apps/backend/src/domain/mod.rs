//! Pure match domain: teams, colors, lifecycle statuses, vote ranking.
//!
//! Everything in here is synchronous, side-effect free, and independent of
//! the transport and the store, so the tally and mapping rules can be
//! exercised directly in unit and property tests.

pub mod game;
pub mod tally;
pub mod team;

pub use game::{GameStatus, WaitingReason};
pub use tally::{rank_votes, RankedMove, RESULT_BROADCAST_LIMIT};
pub use team::{color_of, team_of, Team, TeamColor};

#[cfg(test)]
mod tests_props_tally;
