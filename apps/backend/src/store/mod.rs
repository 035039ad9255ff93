//! Durable history and leaderboard gateway.
//!
//! The match flow treats the store as a best-effort observer: writes are
//! issued fire-and-forget, and a [`StoreError`] is logged and dropped —
//! it never blocks or reverts an in-memory transition. Reads (team
//! preference, leaderboards, win totals) happen outside the match lock.

pub mod memory;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::domain::Team;

pub use memory::MemoryStore;

#[derive(Debug, Clone, Error)]
pub enum StoreError {
    #[error("store unavailable: {0}")]
    Unavailable(String),
}

/// One leaderboard row: votes that were both accepted (matched the applied
/// move) and cast in games the contributor's team went on to win.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LeaderboardEntry {
    pub name: String,
    pub winning_votes: u64,
}

/// Per-identity voting totals.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlayerVoteStats {
    /// Votes cast across all games.
    pub votes: u64,
    /// Votes that matched the move applied for their round.
    pub accepted: u64,
    /// Accepted votes cast in games the player's team won.
    pub winning: u64,
}

#[async_trait]
pub trait GameStore: Send + Sync {
    /// Remember an identity's display name and team. First write wins;
    /// re-registering an existing identity is a no-op.
    async fn register_player(&self, identity: &str, name: &str, team: Team)
        -> Result<(), StoreError>;

    /// Team this identity played for previously, if known.
    async fn team_for(&self, identity: &str) -> Result<Option<Team>, StoreError>;

    /// Open a new game and return its id.
    async fn new_game(&self, white_team: Team) -> Result<i64, StoreError>;

    async fn complete_game(&self, game_id: i64, winner: Team, timeout: bool)
        -> Result<(), StoreError>;

    /// Record a cast vote. Returns `false` for a duplicate
    /// (game, round, identity) combination.
    async fn register_vote(
        &self,
        game_id: i64,
        round: u32,
        identity: &str,
        san: &str,
    ) -> Result<bool, StoreError>;

    /// Record a round's applied move and mark matching votes accepted.
    async fn register_voting_results(
        &self,
        game_id: i64,
        round: u32,
        san: &str,
        votes_for: u32,
        total_votes: u32,
    ) -> Result<(), StoreError>;

    /// Completed-game totals per team.
    async fn win_stats(&self) -> Result<[u64; 2], StoreError>;

    /// Contributors ranked by winning votes, descending.
    async fn leaderboard(&self) -> Result<Vec<LeaderboardEntry>, StoreError>;

    async fn player_stats(&self, identity: &str, team: Team)
        -> Result<PlayerVoteStats, StoreError>;
}
