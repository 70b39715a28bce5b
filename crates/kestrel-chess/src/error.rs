//! Errors raised by the chess adapter.

use kestrel_search::SearchError;

/// Errors from positions, opening books and the player.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ChessError {
    /// A FEN string could not be parsed.
    #[error("invalid FEN '{fen}': {reason}")]
    InvalidFen {
        /// The FEN string that failed to parse.
        fen: String,
        /// What was wrong with it.
        reason: String,
    },

    /// A book line contains a move that is malformed or illegal where it is played.
    #[error("invalid move '{mv}' in book line {line}")]
    InvalidBookMove {
        /// Zero-based index of the offending line.
        line: usize,
        /// The move text.
        mv: String,
    },

    /// The search failed.
    #[error("search failed: {source}")]
    Search {
        /// The underlying search error.
        #[from]
        source: SearchError,
    },
}
