//! Game-agnostic move search for kestrel.
//!
//! Iterative-deepening negamax with quiescence, a lockless transposition
//! table, PV/TT/capture/killer/history move ordering, a time and node budget
//! and a parallel root split. The game itself is supplied through the
//! [`Position`] and [`Evaluator`] traits.

pub mod config;
pub mod error;
pub mod position;
pub mod search;
pub mod time;

#[cfg(test)]
mod testing;

pub use config::{MAX_DEPTH, SearchConfig};
pub use error::{ConfigError, OracleError, SearchError};
pub use position::{Evaluator, MoveClass, MoveList, NO_MOVE, PieceKind, Position, TerminalStatus};
pub use search::control::{SearchControl, StopHandle};
pub use search::heuristics::KillerPolicy;
pub use search::negamax::{MATE_SCORE, MATE_THRESHOLD, is_mate_score};
pub use search::tt::ReplacementPolicy;
pub use search::{Engine, SearchResult, find_best_move};
pub use time::TimeBudget;
