//! Tapered material and piece-square evaluation.
//!
//! Every term carries a middlegame and an endgame value. The two are blended
//! by the game phase, computed from the remaining non-pawn material.
//! Tables are from White's point of view in LERF order (index 0 = A1,
//! index 63 = H8); Black squares are mirrored with `sq ^ 56`.

use std::ops::{Add, AddAssign, Mul, Neg, Sub, SubAssign};

use chess::{ALL_COLORS, Color, Piece};
use kestrel_search::Evaluator;

use crate::position::ChessPosition;

/// Middlegame/endgame pair.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Score {
    /// Middlegame component.
    pub mg: i32,
    /// Endgame component.
    pub eg: i32,
}

/// Shorthand constructor for a [`Score`].
#[allow(non_snake_case)]
#[inline]
pub const fn S(mg: i32, eg: i32) -> Score {
    Score { mg, eg }
}

impl Score {
    /// Zero in both phases.
    pub const ZERO: Score = S(0, 0);

    /// Blend by `phase` (`MAX_PHASE` = pure middlegame, 0 = pure endgame).
    pub fn taper(self, phase: i32) -> i32 {
        (self.mg * phase + self.eg * (MAX_PHASE - phase)) / MAX_PHASE
    }
}

impl Add for Score {
    type Output = Score;

    fn add(self, rhs: Score) -> Score {
        S(self.mg + rhs.mg, self.eg + rhs.eg)
    }
}

impl AddAssign for Score {
    fn add_assign(&mut self, rhs: Score) {
        *self = *self + rhs;
    }
}

impl Sub for Score {
    type Output = Score;

    fn sub(self, rhs: Score) -> Score {
        S(self.mg - rhs.mg, self.eg - rhs.eg)
    }
}

impl SubAssign for Score {
    fn sub_assign(&mut self, rhs: Score) {
        *self = *self - rhs;
    }
}

impl Neg for Score {
    type Output = Score;

    fn neg(self) -> Score {
        S(-self.mg, -self.eg)
    }
}

impl Mul<i32> for Score {
    type Output = Score;

    fn mul(self, rhs: i32) -> Score {
        S(self.mg * rhs, self.eg * rhs)
    }
}

/// Phase of a full set of non-pawn material.
///
/// Knight and bishop count 1, rook 2, queen 4.
pub const MAX_PHASE: i32 = 24;

const PHASE_WEIGHT: [i32; 6] = [0, 1, 1, 2, 4, 0];

/// Material values indexed by `Piece::to_index()`.
pub const MATERIAL_VALUE: [Score; 6] = [
    S(100, 125), // Pawn
    S(320, 300), // Knight
    S(330, 315), // Bishop
    S(500, 530), // Rook
    S(910, 960), // Queen
    S(0, 0),     // King
];

const BISHOP_PAIR: Score = S(40, 55);

#[rustfmt::skip]
const PAWN_MG: [i16; 64] = [
      0,   0,   0,   0,   0,   0,   0,   0,
      5,  10,  10, -20, -20,  10,  10,   5,
      5,  -5, -10,   0,   0, -10,  -5,   5,
      0,   0,   0,  20,  20,   0,   0,   0,
      5,   5,  10,  25,  25,  10,   5,   5,
     10,  10,  20,  30,  30,  20,  10,  10,
     50,  50,  50,  50,  50,  50,  50,  50,
      0,   0,   0,   0,   0,   0,   0,   0,
];

/// Endgame pawn bonus by rank; passed-pawn pressure grows as pawns advance.
const PAWN_EG_RANK: [i16; 8] = [0, 0, 5, 12, 25, 45, 80, 0];

#[rustfmt::skip]
const KNIGHT: [i16; 64] = [
    -50, -40, -30, -30, -30, -30, -40, -50,
    -40, -20,   0,   5,   5,   0, -20, -40,
    -30,   5,  10,  15,  15,  10,   5, -30,
    -30,   0,  15,  20,  20,  15,   0, -30,
    -30,   5,  15,  20,  20,  15,   5, -30,
    -30,   0,  10,  15,  15,  10,   0, -30,
    -40, -20,   0,   0,   0,   0, -20, -40,
    -50, -40, -30, -30, -30, -30, -40, -50,
];

#[rustfmt::skip]
const BISHOP: [i16; 64] = [
    -20, -10, -10, -10, -10, -10, -10, -20,
    -10,   5,   0,   0,   0,   0,   5, -10,
    -10,  10,  10,  10,  10,  10,  10, -10,
    -10,   0,  10,  10,  10,  10,   0, -10,
    -10,   5,   5,  10,  10,   5,   5, -10,
    -10,   0,   5,  10,  10,   5,   0, -10,
    -10,   0,   0,   0,   0,   0,   0, -10,
    -20, -10, -10, -10, -10, -10, -10, -20,
];

#[rustfmt::skip]
const ROOK: [i16; 64] = [
      0,   0,   0,   5,   5,   0,   0,   0,
     -5,   0,   0,   0,   0,   0,   0,  -5,
     -5,   0,   0,   0,   0,   0,   0,  -5,
     -5,   0,   0,   0,   0,   0,   0,  -5,
     -5,   0,   0,   0,   0,   0,   0,  -5,
     -5,   0,   0,   0,   0,   0,   0,  -5,
      5,  10,  10,  10,  10,  10,  10,   5,
      0,   0,   0,   0,   0,   0,   0,   0,
];

#[rustfmt::skip]
const QUEEN: [i16; 64] = [
    -20, -10, -10,  -5,  -5, -10, -10, -20,
    -10,   0,   5,   0,   0,   0,   0, -10,
    -10,   5,   5,   5,   5,   5,   0, -10,
      0,   0,   5,   5,   5,   5,   0,  -5,
     -5,   0,   5,   5,   5,   5,   0,  -5,
    -10,   0,   5,   5,   5,   5,   0, -10,
    -10,   0,   0,   0,   0,   0,   0, -10,
    -20, -10, -10,  -5,  -5, -10, -10, -20,
];

#[rustfmt::skip]
const KING_MG: [i16; 64] = [
     20,  30,  10,   0,   0,  10,  30,  20,
     20,  20,   0,   0,   0,   0,  20,  20,
    -10, -20, -20, -20, -20, -20, -20, -10,
    -20, -30, -30, -40, -40, -30, -30, -20,
    -30, -40, -40, -50, -50, -40, -40, -30,
    -30, -40, -40, -50, -50, -40, -40, -30,
    -30, -40, -40, -50, -50, -40, -40, -30,
    -30, -40, -40, -50, -50, -40, -40, -30,
];

#[rustfmt::skip]
const KING_EG: [i16; 64] = [
    -50, -30, -30, -30, -30, -30, -30, -50,
    -30, -30,   0,   0,   0,   0, -30, -30,
    -30, -10,  20,  30,  30,  20, -10, -30,
    -30, -10,  30,  40,  40,  30, -10, -30,
    -30, -10,  30,  40,  40,  30, -10, -30,
    -30, -10,  20,  30,  30,  20, -10, -30,
    -30, -20, -10,   0,   0, -10, -20, -30,
    -50, -40, -30, -20, -20, -30, -40, -50,
];

/// Piece-square bonus for `piece` on LERF index `idx` (White's point of view).
fn pst(piece: Piece, idx: usize) -> Score {
    let flat = |table: &[i16; 64]| S(table[idx] as i32, table[idx] as i32);
    match piece {
        Piece::Pawn => S(PAWN_MG[idx] as i32, PAWN_EG_RANK[idx / 8] as i32),
        Piece::Knight => flat(&KNIGHT),
        Piece::Bishop => flat(&BISHOP),
        Piece::Rook => flat(&ROOK),
        Piece::Queen => flat(&QUEEN),
        Piece::King => S(KING_MG[idx] as i32, KING_EG[idx] as i32),
    }
}

/// Game phase in `0..=MAX_PHASE` from the non-pawn material on the board.
pub fn game_phase(position: &ChessPosition) -> i32 {
    let board = position.board();
    let phase: i32 = chess::ALL_PIECES
        .iter()
        .map(|&piece| board.pieces(piece).popcnt() as i32 * PHASE_WEIGHT[piece.to_index()])
        .sum();
    phase.min(MAX_PHASE)
}

/// Material, piece-square and bishop-pair terms from White's point of view.
pub fn white_score(position: &ChessPosition) -> Score {
    let board = position.board();
    let mut score = Score::ZERO;

    for color in ALL_COLORS {
        let mut side = Score::ZERO;
        let ours = *board.color_combined(color);
        for piece in chess::ALL_PIECES {
            let pieces = *board.pieces(piece) & ours;
            side += MATERIAL_VALUE[piece.to_index()] * pieces.popcnt() as i32;
            for sq in pieces {
                let idx = match color {
                    Color::White => sq.to_index(),
                    Color::Black => sq.to_index() ^ 56,
                };
                side += pst(piece, idx);
            }
        }
        if (*board.pieces(Piece::Bishop) & ours).popcnt() >= 2 {
            side += BISHOP_PAIR;
        }

        match color {
            Color::White => score += side,
            Color::Black => score -= side,
        }
    }

    score
}

/// Tapered material and piece-square evaluator for the side to move.
#[derive(Debug, Clone, Copy, Default)]
pub struct PieceSquareEvaluator;

impl PieceSquareEvaluator {
    /// Centipawn score of `position` for the side to move.
    pub fn evaluate(&self, position: &ChessPosition) -> i32 {
        let white = white_score(position).taper(game_phase(position));
        match position.side_to_move() {
            Color::White => white,
            Color::Black => -white,
        }
    }
}

impl Evaluator<ChessPosition> for PieceSquareEvaluator {
    fn evaluate(&self, position: &ChessPosition) -> i32 {
        PieceSquareEvaluator::evaluate(self, position)
    }
}
