//! Error types for configuration, the position oracle and the search itself.

use crate::position::TerminalStatus;

/// Invalid [`SearchConfig`](crate::SearchConfig) values, reported before any
/// search starts.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ConfigError {
    /// `max_depth` is zero.
    #[error("maximum search depth must be at least 1")]
    ZeroDepth,

    /// `max_depth` leaves no room for quiescence below the ply ceiling.
    #[error("maximum search depth {depth} exceeds the limit of {limit}")]
    DepthTooLarge {
        /// Requested depth.
        depth: u8,
        /// Largest accepted depth.
        limit: u8,
    },

    /// A time budget of zero was requested.
    #[error("time per move must be positive")]
    ZeroTime,

    /// The transposition table is enabled with a zero-megabyte budget.
    #[error("transposition table size must be at least 1 MB when enabled")]
    ZeroTableSize,

    /// An explicit worker count of zero was requested.
    #[error("worker thread count must be at least 1")]
    ZeroThreads,

    /// A node limit of zero was requested.
    #[error("node limit must be positive")]
    ZeroNodes,
}

/// Faults raised by a [`Position`](crate::Position) implementation.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum OracleError {
    /// The oracle refused to apply a move.
    #[error("illegal move {mv} in position {position}")]
    IllegalMove {
        /// The rejected move, as displayed by the oracle.
        mv: String,
        /// The position it was applied to, as displayed by the oracle.
        position: String,
    },

    /// The oracle found its own state inconsistent.
    #[error("inconsistent position: {detail}")]
    Inconsistent {
        /// What went wrong.
        detail: String,
    },
}

/// Errors returned by a search invocation.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum SearchError {
    /// The configuration was rejected.
    #[error("invalid configuration: {source}")]
    Config {
        /// The underlying validation error.
        #[from]
        source: ConfigError,
    },

    /// The root position has no legal move; the caller should have checked
    /// its terminal status.
    #[error("no legal moves in root position ({status:?}, score {score})")]
    NoLegalMoves {
        /// Checkmate or stalemate.
        status: TerminalStatus,
        /// The score of the terminal position for the side to move.
        score: i32,
    },

    /// The budget ran out before the depth-1 iteration completed.
    #[error("no move could be found within budget ({nodes} nodes searched)")]
    BudgetExhausted {
        /// Nodes visited before the budget expired.
        nodes: u64,
    },

    /// The position oracle failed during the search.
    #[error("position oracle failed: {source}")]
    Oracle {
        /// The oracle's error.
        #[from]
        source: OracleError,
    },
}
