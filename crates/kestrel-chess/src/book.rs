//! Opening books consulted before searching.

use std::collections::HashMap;

use chess::ChessMove;
use kestrel_search::Position;
use tracing::debug;

use crate::error::ChessError;
use crate::position::ChessPosition;

/// A source of prepared moves keyed by position.
pub trait OpeningBook: Send + Sync {
    /// A book move for `position`, if one is known.
    fn try_get_move(&self, position: &ChessPosition) -> Option<ChessMove>;
}

/// Built-in opening lines in coordinate notation.
const STANDARD_LINES: &[&str] = &[
    // Italian
    "e2e4 e7e5 g1f3 b8c6 f1c4 f8c5 c2c3 g8f6 d2d3",
    // Ruy Lopez
    "e2e4 e7e5 g1f3 b8c6 f1b5 a7a6 b5a4 g8f6 e1g1 f8e7",
    // Sicilian, open
    "e2e4 c7c5 g1f3 d7d6 d2d4 c5d4 f3d4 g8f6 b1c3",
    // French
    "e2e4 e7e6 d2d4 d7d5 b1c3 g8f6 c1g5",
    // Caro-Kann
    "e2e4 c7c6 d2d4 d7d5 b1c3 d5e4 c3e4 c8f5",
    // Queen's Gambit Declined
    "d2d4 d7d5 c2c4 e7e6 b1c3 g8f6 c1g5 f8e7",
    // Slav
    "d2d4 d7d5 c2c4 c7c6 g1f3 g8f6 b1c3",
    // King's Indian
    "d2d4 g8f6 c2c4 g7g6 b1c3 f8g7 e2e4 d7d6 g1f3 e8g8",
    // English
    "c2c4 e7e5 b1c3 g8f6 g1f3 b8c6 g2g3",
    // Reti
    "g1f3 d7d5 g2g3 g8f6 f1g2 e7e6 e1g1",
];

/// A book built from move sequences played out from the starting position.
///
/// When two lines reach the same position with different continuations, the
/// earlier line wins.
#[derive(Debug, Clone, Default)]
pub struct LineBook {
    moves: HashMap<u64, ChessMove>,
}

impl LineBook {
    /// An empty book.
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a book from whitespace-separated coordinate-notation lines.
    ///
    /// Blank lines are skipped. Any malformed or illegal move rejects the
    /// whole book.
    pub fn from_lines<'a, I>(lines: I) -> Result<Self, ChessError>
    where
        I: IntoIterator<Item = &'a str>,
    {
        let mut book = Self::new();
        for (index, line) in lines.into_iter().enumerate() {
            book.add_line(index, line)?;
        }
        debug!(positions = book.len(), "opening book loaded");
        Ok(book)
    }

    /// The built-in repertoire.
    pub fn standard() -> Result<Self, ChessError> {
        Self::from_lines(STANDARD_LINES.iter().copied())
    }

    /// Number of positions with a book move.
    pub fn len(&self) -> usize {
        self.moves.len()
    }

    /// Whether the book holds no positions.
    pub fn is_empty(&self) -> bool {
        self.moves.is_empty()
    }

    fn add_line(&mut self, index: usize, line: &str) -> Result<(), ChessError> {
        let mut position = ChessPosition::startpos();
        for text in line.split_whitespace() {
            let invalid = || ChessError::InvalidBookMove {
                line: index,
                mv: text.to_string(),
            };
            let mv = position.parse_move(text).ok_or_else(invalid)?;
            self.moves.entry(position.hash()).or_insert(mv);
            position = position.apply(mv).map_err(|_| invalid())?;
        }
        Ok(())
    }
}

impl OpeningBook for LineBook {
    fn try_get_move(&self, position: &ChessPosition) -> Option<ChessMove> {
        let mv = *self.moves.get(&position.hash())?;
        // Guard against hash collisions with positions off the book's lines.
        position.board().legal(mv).then_some(mv)
    }
}
