use std::str::FromStr;

use chess::{Board, BoardStatus, ChessMove, Color, Game};

use super::MoveValidator;
use crate::domain::TeamColor;

/// [`MoveValidator`] over the `chess` crate.
///
/// Keeps the applied-move list alongside the live game; undo rebuilds from
/// the start position, which is cheap at chess game lengths and keeps the
/// crate's draw bookkeeping (repetition, fifty-move) consistent.
pub struct ChessRules {
    start: Board,
    moves: Vec<ChessMove>,
    game: Game,
}

impl ChessRules {
    /// Standard start position.
    pub fn new() -> Self {
        Self::with_start(Board::default())
    }

    /// Arbitrary start position, mainly for tests.
    pub fn from_fen(fen: &str) -> Result<Self, chess::Error> {
        Ok(Self::with_start(Board::from_str(fen)?))
    }

    fn with_start(start: Board) -> Self {
        Self {
            start,
            moves: Vec::new(),
            game: Game::new_with_board(start),
        }
    }

    fn rebuild(&mut self) {
        let mut game = Game::new_with_board(self.start);
        for mv in &self.moves {
            game.make_move(*mv);
        }
        self.game = game;
    }
}

impl Default for ChessRules {
    fn default() -> Self {
        Self::new()
    }
}

impl MoveValidator for ChessRules {
    fn side_to_move(&self) -> TeamColor {
        match self.game.side_to_move() {
            Color::White => TeamColor::White,
            Color::Black => TeamColor::Black,
        }
    }

    fn try_move(&mut self, san: &str) -> Option<String> {
        let san = san.trim();
        let mv = ChessMove::from_san(&self.game.current_position(), san).ok()?;
        if self.game.make_move(mv) {
            self.moves.push(mv);
            Some(san.to_string())
        } else {
            None
        }
    }

    fn undo_last(&mut self) {
        if self.moves.pop().is_some() {
            self.rebuild();
        }
    }

    fn is_checkmate(&self) -> bool {
        self.game.current_position().status() == BoardStatus::Checkmate
    }

    fn is_draw(&self) -> bool {
        self.game.current_position().status() == BoardStatus::Stalemate
            || self.game.can_declare_draw()
    }

    fn position_fen(&self) -> String {
        self.game.current_position().to_string()
    }

    fn reset(&mut self) {
        self.moves.clear();
        self.game = Game::new_with_board(self.start);
    }
}
