//! Standard chess on top of `kestrel-search`.
//!
//! Supplies the [`ChessPosition`] oracle, a tapered piece-square evaluator,
//! opening books and a [`Player`] that consults the book before searching.

pub mod book;
pub mod error;
pub mod eval;
pub mod player;
pub mod position;

pub use book::{LineBook, OpeningBook};
pub use error::ChessError;
pub use eval::PieceSquareEvaluator;
pub use player::{Decision, DecisionSource, Player};
pub use position::ChessPosition;

pub use chess::ChessMove;
