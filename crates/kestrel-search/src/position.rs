//! Traits through which the search consumes a game: the position oracle and
//! the evaluator.
//!
//! The search never builds moves or inspects a board directly. Everything it
//! knows about the game arrives through [`Position`] and [`Evaluator`].

use std::fmt;

use smallvec::SmallVec;

use crate::error::OracleError;

/// Move list returned by [`Position::legal_moves`].
///
/// Sixty-four inline slots cover nearly every chess position without touching
/// the heap.
pub type MoveList<M> = SmallVec<[M; 64]>;

/// Move code reserved for "no move".
pub const NO_MOVE: u16 = 0;

/// The kind of a piece, without color information.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[repr(u8)]
pub enum PieceKind {
    Pawn = 0,
    Knight = 1,
    Bishop = 2,
    Rook = 3,
    Queen = 4,
    King = 5,
}

/// Ordering values indexed by [`PieceKind::index()`].
const PIECE_VALUE: [i32; 6] = [100, 320, 330, 500, 900, 20_000];

impl PieceKind {
    /// All piece kinds in index order (ascending value).
    pub const ALL: [PieceKind; 6] = [
        PieceKind::Pawn,
        PieceKind::Knight,
        PieceKind::Bishop,
        PieceKind::Rook,
        PieceKind::Queen,
        PieceKind::King,
    ];

    /// Return the index (0..5).
    #[inline]
    pub const fn index(self) -> usize {
        self as usize
    }

    /// Static material value used for move ordering.
    #[inline]
    pub const fn value(self) -> i32 {
        PIECE_VALUE[self as usize]
    }
}

/// Static properties of a move, as reported by the oracle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MoveClass {
    /// The piece being moved.
    pub moving: PieceKind,
    /// The piece captured by the move, if any (including en passant).
    pub captured: Option<PieceKind>,
    /// The piece a pawn promotes to, if any.
    pub promotion: Option<PieceKind>,
}

impl MoveClass {
    /// A quiet move of the given piece.
    pub const fn quiet(moving: PieceKind) -> Self {
        Self {
            moving,
            captured: None,
            promotion: None,
        }
    }

    /// Whether the move captures something.
    #[inline]
    pub const fn is_capture(&self) -> bool {
        self.captured.is_some()
    }

    /// Captures and promotions: the moves quiescence search looks at.
    #[inline]
    pub const fn is_noisy(&self) -> bool {
        self.captured.is_some() || self.promotion.is_some()
    }

    /// Static material gain: the captured value plus what a promotion adds
    /// over the pawn it replaces.
    pub fn gain(&self) -> i32 {
        let victim = self.captured.map_or(0, PieceKind::value);
        let promo = self
            .promotion
            .map_or(0, |p| p.value() - PieceKind::Pawn.value());
        victim + promo
    }
}

/// Game-theoretic status of a position.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TerminalStatus {
    /// Play continues.
    None,
    /// The side to move is checkmated.
    Checkmate,
    /// The side to move has no legal move and is not in check.
    Stalemate,
    /// A rule draw (fifty-move rule, insufficient material, ...).
    Draw,
}

/// The position oracle: legality, move generation and game rules.
///
/// Implementations are immutable values; [`apply`](Position::apply) returns
/// the successor and the caller drops whichever one it no longer needs.
pub trait Position: Clone + Send + Sync {
    /// Opaque move type produced by the oracle.
    type Move: Copy + Eq + fmt::Debug + fmt::Display + Send + Sync + 'static;

    /// All legal moves in a deterministic order.
    fn legal_moves(&self) -> MoveList<Self::Move>;

    /// The position after `mv`. The oracle rejects moves that are not legal here.
    fn apply(&self, mv: Self::Move) -> Result<Self, OracleError>;

    /// Whether the side to move is in check.
    fn is_in_check(&self) -> bool;

    /// Whether a rule (not the move list) declares this position drawn.
    fn is_rule_draw(&self) -> bool {
        false
    }

    /// Terminal status of the position.
    fn terminal_status(&self) -> TerminalStatus {
        if self.legal_moves().is_empty() {
            if self.is_in_check() {
                TerminalStatus::Checkmate
            } else {
                TerminalStatus::Stalemate
            }
        } else if self.is_rule_draw() {
            TerminalStatus::Draw
        } else {
            TerminalStatus::None
        }
    }

    /// Strong 64-bit key of the position (side to move included).
    fn hash(&self) -> u64;

    /// Static classification of a legal move.
    fn classify(&self, mv: Self::Move) -> MoveClass;

    /// A non-zero 16-bit code for `mv`, distinct from every other legal move
    /// of the same position.
    fn move_code(mv: Self::Move) -> u16;
}

/// Static evaluation from the side to move's perspective.
///
/// Must be pure and deterministic.
pub trait Evaluator<P: Position>: Send + Sync {
    /// Score `position` in centipawns for the side to move.
    fn evaluate(&self, position: &P) -> i32;
}

impl<P, F> Evaluator<P> for F
where
    P: Position,
    F: Fn(&P) -> i32 + Send + Sync,
{
    fn evaluate(&self, position: &P) -> i32 {
        self(position)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn piece_values_ascend_with_index() {
        for pair in PieceKind::ALL.windows(2) {
            assert!(pair[0].value() <= pair[1].value());
        }
    }

    #[test]
    fn capture_gain_counts_victim() {
        let class = MoveClass {
            moving: PieceKind::Knight,
            captured: Some(PieceKind::Rook),
            promotion: None,
        };
        assert!(class.is_capture());
        assert_eq!(class.gain(), 500);
    }

    #[test]
    fn promotion_gain_is_net_of_pawn() {
        let class = MoveClass {
            moving: PieceKind::Pawn,
            captured: None,
            promotion: Some(PieceKind::Queen),
        };
        assert!(class.is_noisy());
        assert!(!class.is_capture());
        assert_eq!(class.gain(), 800);
    }

    #[test]
    fn quiet_class_is_not_noisy() {
        let class = MoveClass::quiet(PieceKind::Bishop);
        assert!(!class.is_noisy());
        assert_eq!(class.gain(), 0);
    }
}
