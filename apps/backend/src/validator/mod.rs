//! Move validation port.
//!
//! The match flow never reasons about chess itself: legality, turn order
//! and terminal states are delegated to a [`MoveValidator`]. The default
//! implementation wraps the `chess` crate ([`chess_rules::ChessRules`]);
//! tests construct positions directly from FEN.

pub mod chess_rules;

use crate::domain::TeamColor;

pub use chess_rules::ChessRules;

pub trait MoveValidator: Send {
    /// Color to move on the current position.
    fn side_to_move(&self) -> TeamColor;

    /// Apply `san` if it is legal on the current position. Returns the
    /// applied move text, or `None` for an illegal or unparseable move.
    fn try_move(&mut self, san: &str) -> Option<String>;

    /// Revert the most recently applied move. A no-op on the start
    /// position.
    fn undo_last(&mut self);

    fn is_checkmate(&self) -> bool;

    /// Stalemate or a claimable draw (repetition / fifty-move rule).
    fn is_draw(&self) -> bool;

    /// FEN snapshot of the current position.
    fn position_fen(&self) -> String;

    /// Return to the initial position, clearing applied history.
    fn reset(&mut self);
}
