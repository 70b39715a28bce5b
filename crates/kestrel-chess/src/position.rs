//! Standard chess as a search [`Position`], backed by the `chess` crate.

use std::fmt;
use std::str::FromStr;

use chess::{Board, BoardStatus, ChessMove, Color, MoveGen, Piece, Square};
use kestrel_search::{MoveClass, MoveList, OracleError, PieceKind, Position};

use crate::error::ChessError;

/// Halfmove clock value at which the fifty-move rule draws.
const FIFTY_MOVE_PLIES: u32 = 100;

/// Map a `chess` piece onto the search's piece kinds.
pub fn piece_kind(piece: Piece) -> PieceKind {
    match piece {
        Piece::Pawn => PieceKind::Pawn,
        Piece::Knight => PieceKind::Knight,
        Piece::Bishop => PieceKind::Bishop,
        Piece::Rook => PieceKind::Rook,
        Piece::Queen => PieceKind::Queen,
        Piece::King => PieceKind::King,
    }
}

fn promotion_bits(piece: Option<Piece>) -> u16 {
    match piece {
        Some(Piece::Knight) => 1,
        Some(Piece::Bishop) => 2,
        Some(Piece::Rook) => 3,
        Some(Piece::Queen) => 4,
        _ => 0,
    }
}

/// A chess position: the board plus the fifty-move halfmove clock.
#[derive(Clone, Copy)]
pub struct ChessPosition {
    board: Board,
    halfmove_clock: u32,
}

impl ChessPosition {
    /// The standard starting position.
    pub fn startpos() -> Self {
        Self {
            board: Board::default(),
            halfmove_clock: 0,
        }
    }

    /// Parse a FEN string. The halfmove clock field is optional and defaults to 0.
    pub fn from_fen(fen: &str) -> Result<Self, ChessError> {
        let invalid = |reason: String| ChessError::InvalidFen {
            fen: fen.to_string(),
            reason,
        };

        let board = Board::from_str(fen).map_err(|e| invalid(format!("{e:?}")))?;
        let halfmove_clock = match fen.split_whitespace().nth(4) {
            Some(field) => field
                .parse()
                .map_err(|_| invalid(format!("bad halfmove clock '{field}'")))?,
            None => 0,
        };

        Ok(Self { board, halfmove_clock })
    }

    /// The underlying board.
    pub fn board(&self) -> &Board {
        &self.board
    }

    /// Plies since the last capture or pawn move.
    pub fn halfmove_clock(&self) -> u32 {
        self.halfmove_clock
    }

    /// Side to move.
    pub fn side_to_move(&self) -> Color {
        self.board.side_to_move()
    }

    /// Parse a move in coordinate notation (`e2e4`, `e7e8q`) and check it is
    /// legal here.
    pub fn parse_move(&self, text: &str) -> Option<ChessMove> {
        if !(4..=5).contains(&text.len()) || !text.is_ascii() {
            return None;
        }
        let source = Square::from_str(&text[0..2]).ok()?;
        let dest = Square::from_str(&text[2..4]).ok()?;
        let promotion = match text.as_bytes().get(4) {
            None => None,
            Some(b'n') => Some(Piece::Knight),
            Some(b'b') => Some(Piece::Bishop),
            Some(b'r') => Some(Piece::Rook),
            Some(b'q') => Some(Piece::Queen),
            Some(_) => return None,
        };
        let mv = ChessMove::new(source, dest, promotion);
        self.board.legal(mv).then_some(mv)
    }

    /// Whether neither side can possibly deliver mate: bare kings, or a
    /// single minor piece against a bare king.
    pub fn is_insufficient_material(&self) -> bool {
        let heavy = *self.board.pieces(Piece::Pawn) | *self.board.pieces(Piece::Rook) | *self.board.pieces(Piece::Queen);
        if heavy.popcnt() > 0 {
            return false;
        }
        let minors = *self.board.pieces(Piece::Knight) | *self.board.pieces(Piece::Bishop);
        minors.popcnt() <= 1
    }

    fn resets_clock(&self, mv: ChessMove) -> bool {
        self.board.piece_on(mv.get_source()) == Some(Piece::Pawn) || self.board.piece_on(mv.get_dest()).is_some()
    }
}

impl Default for ChessPosition {
    fn default() -> Self {
        Self::startpos()
    }
}

impl PartialEq for ChessPosition {
    fn eq(&self, other: &Self) -> bool {
        self.board.get_hash() == other.board.get_hash() && self.halfmove_clock == other.halfmove_clock
    }
}

impl Eq for ChessPosition {}

impl FromStr for ChessPosition {
    type Err = ChessError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::from_fen(s)
    }
}

impl fmt::Display for ChessPosition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.board)
    }
}

impl fmt::Debug for ChessPosition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ChessPosition")
            .field("fen", &self.board.to_string())
            .field("halfmove_clock", &self.halfmove_clock)
            .finish()
    }
}

impl Position for ChessPosition {
    type Move = ChessMove;

    fn legal_moves(&self) -> MoveList<ChessMove> {
        MoveGen::new_legal(&self.board).collect()
    }

    fn apply(&self, mv: ChessMove) -> Result<Self, OracleError> {
        if !self.board.legal(mv) {
            return Err(OracleError::IllegalMove {
                mv: mv.to_string(),
                position: self.board.to_string(),
            });
        }
        let halfmove_clock = if self.resets_clock(mv) {
            0
        } else {
            self.halfmove_clock + 1
        };
        Ok(Self {
            board: self.board.make_move_new(mv),
            halfmove_clock,
        })
    }

    fn is_in_check(&self) -> bool {
        self.board.checkers().popcnt() > 0
    }

    fn is_rule_draw(&self) -> bool {
        if self.is_insufficient_material() {
            return true;
        }
        // Mate delivered on the hundredth ply still counts as mate.
        self.halfmove_clock >= FIFTY_MOVE_PLIES && self.board.status() != BoardStatus::Checkmate
    }

    fn hash(&self) -> u64 {
        self.board.get_hash()
    }

    fn classify(&self, mv: ChessMove) -> MoveClass {
        let source = mv.get_source();
        let dest = mv.get_dest();
        let moving = self.board.piece_on(source).unwrap_or(Piece::Pawn);

        let captured = match self.board.piece_on(dest) {
            Some(piece) => Some(piece_kind(piece)),
            // A pawn changing file onto an empty square captures en passant.
            None if moving == Piece::Pawn && source.get_file() != dest.get_file() => Some(PieceKind::Pawn),
            None => None,
        };

        MoveClass {
            moving: piece_kind(moving),
            captured,
            promotion: mv.get_promotion().map(piece_kind),
        }
    }

    fn move_code(mv: ChessMove) -> u16 {
        let source = mv.get_source().to_index() as u16;
        let dest = mv.get_dest().to_index() as u16;
        source | dest << 6 | promotion_bits(mv.get_promotion()) << 12
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use kestrel_search::TerminalStatus;

    fn pos(fen: &str) -> ChessPosition {
        ChessPosition::from_fen(fen).unwrap()
    }

    #[test]
    fn startpos_has_twenty_moves() {
        let start = ChessPosition::startpos();
        assert_eq!(start.legal_moves().len(), 20);
        assert!(!start.is_in_check());
        assert_eq!(start.terminal_status(), TerminalStatus::None);
    }

    #[test]
    fn invalid_fen_rejected() {
        let err = ChessPosition::from_fen("not a fen").unwrap_err();
        assert!(matches!(err, ChessError::InvalidFen { .. }));

        let err = ChessPosition::from_fen("8/8/8/4k3/8/8/8/4K3 w - - x 1").unwrap_err();
        assert!(matches!(err, ChessError::InvalidFen { .. }));
    }

    #[test]
    fn parse_move_checks_legality() {
        let start = ChessPosition::startpos();
        assert!(start.parse_move("e2e4").is_some());
        assert!(start.parse_move("e2e5").is_none());
        assert!(start.parse_move("e2").is_none());
        assert!(start.parse_move("e7e8x").is_none());
    }

    #[test]
    fn apply_rejects_illegal_move() {
        let start = ChessPosition::startpos();
        let illegal = ChessMove::new(Square::E2, Square::E5, None);
        let err = start.apply(illegal).unwrap_err();
        assert!(matches!(err, OracleError::IllegalMove { .. }));
    }

    #[test]
    fn halfmove_clock_tracks_pawn_moves_and_captures() {
        let start = ChessPosition::startpos();
        let after_knight = start.apply(start.parse_move("g1f3").unwrap()).unwrap();
        assert_eq!(after_knight.halfmove_clock(), 1);
        let after_pawn = after_knight.apply(after_knight.parse_move("e7e5").unwrap()).unwrap();
        assert_eq!(after_pawn.halfmove_clock(), 0);
        let after_capture = after_pawn.apply(after_pawn.parse_move("f3e5").unwrap()).unwrap();
        assert_eq!(after_capture.halfmove_clock(), 0);
    }

    #[test]
    fn fifty_move_rule_draws() {
        let quiet = pos("8/8/4k3/8/8/3QK3/8/8 w - - 99 80");
        assert!(!quiet.is_rule_draw());
        let next = quiet.apply(quiet.parse_move("d3d4").unwrap()).unwrap();
        assert!(next.is_rule_draw());
        assert_eq!(next.terminal_status(), TerminalStatus::Draw);
    }

    #[test]
    fn insufficient_material_draws() {
        assert!(pos("8/8/4k3/8/8/4K3/8/8 w - - 0 1").is_rule_draw());
        assert!(pos("8/8/4k3/8/8/4KN2/8/8 w - - 0 1").is_rule_draw());
        assert!(!pos("8/8/4k3/8/8/4KR2/8/8 w - - 0 1").is_rule_draw());
        assert!(!pos("8/8/4k3/8/8/3BKB2/8/8 w - - 0 1").is_rule_draw());
    }

    #[test]
    fn classify_reports_captures_and_promotions() {
        let p = pos("r3k3/1P6/8/3pP3/8/8/8/4K3 w - d6 0 1");

        let en_passant = p.parse_move("e5d6").unwrap();
        assert_eq!(p.classify(en_passant).captured, Some(PieceKind::Pawn));

        let capture_promo = p.parse_move("b7a8q").unwrap();
        let class = p.classify(capture_promo);
        assert_eq!(class.moving, PieceKind::Pawn);
        assert_eq!(class.captured, Some(PieceKind::Rook));
        assert_eq!(class.promotion, Some(PieceKind::Queen));

        let quiet = p.parse_move("e1d2").unwrap();
        assert_eq!(p.classify(quiet), MoveClass::quiet(PieceKind::King));
    }

    #[test]
    fn move_codes_are_distinct_and_non_zero() {
        let p = pos("r3k3/1P6/8/3pP3/8/8/8/4K3 w - d6 0 1");
        let codes: Vec<u16> = p.legal_moves().iter().map(|&m| ChessPosition::move_code(m)).collect();
        assert!(codes.iter().all(|&c| c != 0));
        let mut unique = codes.clone();
        unique.sort_unstable();
        unique.dedup();
        assert_eq!(unique.len(), codes.len());
    }

    #[test]
    fn checkmate_and_stalemate_status() {
        assert_eq!(pos("7k/6Q1/5K2/8/8/8/8/8 b - - 0 1").terminal_status(), TerminalStatus::Checkmate);
        assert_eq!(pos("k7/2K5/1Q6/8/8/8/8/8 b - - 0 1").terminal_status(), TerminalStatus::Stalemate);
    }
}
