//! Domain-level error type used across the match flow.
//!
//! Every variant is a client-triggered rejection: it is surfaced to the
//! originating session only and causes no state mutation. Store failures
//! are deliberately not represented here — they are logged and dropped at
//! the call site and never reach a client.

use thiserror::Error;

/// Central domain error type for inbound client actions.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum GameError {
    /// A vote arrived while no game is in play.
    #[error("The game is not in play")]
    GameNotInPlay,

    /// The connection has no registered session (or identity
    /// verification failed at join time).
    #[error("You are not authenticated")]
    Unauthenticated,

    /// The session's team is not the side to move this round.
    #[error("Not your turn")]
    WrongTurn,

    /// The session (or its identity) already cast a vote this round.
    #[error("You have already voted")]
    AlreadyVoted,

    /// The proposed move was rejected against the current position.
    #[error("Invalid move")]
    IllegalMove,

    /// The identity already holds a live session and is neither
    /// allowlisted nor covered by the role-override setting.
    #[error("You have already joined, or there is another user with the same name")]
    AlreadyJoined,
}
