use serde::{Deserialize, Serialize};

/// Overall match lifecycle status.
///
/// A match is `Playing` exactly while a voting round is active; every
/// other moment it is `Waiting` with a [`WaitingReason`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GameStatus {
    Waiting,
    Playing,
}

/// Why the match is currently waiting.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WaitingReason {
    /// A team dropped below the configured minimum.
    NoPlayers,
    /// The side to move cast no votes before the deadline (forfeit).
    NoVotes,
    /// The board reached checkmate or a draw.
    GameCompleted,
}
