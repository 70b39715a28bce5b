//! Move selection for a chess game: book first, then search.

use chess::ChessMove;
use kestrel_search::{Engine, Evaluator, Position, SearchConfig, SearchError, SearchResult, StopHandle};
use tracing::{debug, info, warn};

use crate::book::OpeningBook;
use crate::error::ChessError;
use crate::eval::PieceSquareEvaluator;
use crate::position::ChessPosition;

/// Where a chosen move came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DecisionSource {
    /// The opening book.
    Book,
    /// A completed search.
    Search,
    /// The budget ran out before depth 1; the first legal move was played.
    Fallback,
}

/// A chosen move and how it was found.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Decision {
    /// The move to play.
    pub mv: ChessMove,
    /// Where it came from.
    pub source: DecisionSource,
    /// Search details when the move came from a search.
    pub search: Option<SearchResult<ChessMove>>,
}

/// Plays chess moves with an optional opening book in front of the engine.
pub struct Player<E = PieceSquareEvaluator> {
    engine: Engine<E>,
    book: Option<Box<dyn OpeningBook>>,
}

impl<E: Evaluator<ChessPosition>> Player<E> {
    /// Create a player without a book.
    pub fn new(config: SearchConfig, evaluator: E) -> Result<Self, ChessError> {
        let engine = Engine::new(config, evaluator).map_err(SearchError::from)?;
        Ok(Self { engine, book: None })
    }

    /// Consult `book` before searching.
    pub fn with_book(mut self, book: impl OpeningBook + 'static) -> Self {
        self.book = Some(Box::new(book));
        self
    }

    /// The underlying engine.
    pub fn engine(&self) -> &Engine<E> {
        &self.engine
    }

    /// Reset state carried between moves of a game.
    pub fn new_game(&mut self) {
        self.engine.new_game();
    }

    /// Handle that stops the search in progress.
    pub fn stop_handle(&self) -> StopHandle {
        self.engine.stop_handle()
    }

    /// Choose a move for `position`.
    ///
    /// `history` holds the hashes of earlier game positions, oldest first,
    /// for repetition detection. A position without legal moves fails with
    /// [`SearchError::NoLegalMoves`].
    pub fn choose_move(&mut self, position: &ChessPosition, history: &[u64]) -> Result<Decision, ChessError> {
        if let Some(mv) = self.book.as_ref().and_then(|book| book.try_get_move(position)) {
            info!(%mv, "book move");
            return Ok(Decision {
                mv,
                source: DecisionSource::Book,
                search: None,
            });
        }

        let outcome = self.engine.search(position, history, |depth, score, nodes, pv| {
            let line = pv.iter().map(ToString::to_string).collect::<Vec<_>>().join(" ");
            debug!(depth, score, nodes, pv = %line, "iteration");
        });

        match outcome {
            Ok(result) => Ok(Decision {
                mv: result.best_move,
                source: DecisionSource::Search,
                search: Some(result),
            }),
            Err(SearchError::BudgetExhausted { nodes }) => {
                let mv = position
                    .legal_moves()
                    .first()
                    .copied()
                    .ok_or(SearchError::BudgetExhausted { nodes })?;
                warn!(nodes, %mv, "budget exhausted before depth 1, playing first legal move");
                Ok(Decision {
                    mv,
                    source: DecisionSource::Fallback,
                    search: None,
                })
            }
            Err(e) => Err(e.into()),
        }
    }
}

impl<E> std::fmt::Debug for Player<E> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Player")
            .field("config", self.engine.config())
            .field("book", &self.book.is_some())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use crate::book::LineBook;

    fn config() -> SearchConfig {
        SearchConfig::default().with_depth(3).with_table_mb(1)
    }

    #[test]
    fn book_move_is_preferred() {
        let book = LineBook::from_lines(["d2d4 d7d5"]).unwrap();
        let mut player = Player::new(config(), PieceSquareEvaluator).unwrap().with_book(book);
        let decision = player.choose_move(&ChessPosition::startpos(), &[]).unwrap();
        assert_eq!(decision.source, DecisionSource::Book);
        assert_eq!(decision.mv.to_string(), "d2d4");
        assert!(decision.search.is_none());
    }

    #[test]
    fn searches_off_book() {
        let book = LineBook::from_lines(["d2d4 d7d5"]).unwrap();
        let mut player = Player::new(config(), PieceSquareEvaluator).unwrap().with_book(book);
        let p = ChessPosition::from_fen("6k1/5ppp/8/8/8/8/8/R5K1 w - - 0 1").unwrap();
        let decision = player.choose_move(&p, &[]).unwrap();
        assert_eq!(decision.source, DecisionSource::Search);
        assert_eq!(decision.mv.to_string(), "a1a8");
        assert_eq!(decision.search.and_then(|s| s.mate_in()), Some(1));
    }

    #[test]
    fn invalid_config_is_reported() {
        let err = Player::new(config().with_depth(0), PieceSquareEvaluator).unwrap_err();
        assert!(matches!(
            err,
            ChessError::Search {
                source: SearchError::Config { .. }
            }
        ));
    }

    #[test]
    fn no_legal_moves_propagates() {
        let mut player = Player::new(config(), PieceSquareEvaluator).unwrap();
        let mated = ChessPosition::from_fen("7k/6Q1/5K2/8/8/8/8/8 b - - 0 1").unwrap();
        let err = player.choose_move(&mated, &[]).unwrap_err();
        assert!(matches!(
            err,
            ChessError::Search {
                source: SearchError::NoLegalMoves { .. }
            }
        ));
    }
}
