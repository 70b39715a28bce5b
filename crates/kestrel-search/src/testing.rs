//! Deterministic synthetic game tree for exercising the search without chess.
//!
//! Every node is identified by a 64-bit key derived from its parent's key and
//! the move index, so distinct paths never transpose. Nodes at height zero
//! have no moves; whether they are mate or stalemate depends on the key.

use std::fmt;

use crate::error::OracleError;
use crate::position::{MoveClass, MoveList, PieceKind, Position};
use crate::search::negamax::{MATE_THRESHOLD, mated_in};

fn mix(mut x: u64) -> u64 {
    x = x.wrapping_add(0x9E37_79B9_7F4A_7C15);
    x = (x ^ (x >> 30)).wrapping_mul(0xBF58_476D_1CE4_E5B9);
    x = (x ^ (x >> 27)).wrapping_mul(0x94D0_49BB_1331_11EB);
    x ^ (x >> 31)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct TreeMove(pub u8);

impl fmt::Display for TreeMove {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "m{}", self.0)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct TreePosition {
    key: u64,
    height: u8,
    fault_at: Option<u8>,
}

impl TreePosition {
    /// Root of a tree `height` plies deep.
    pub(crate) fn new(seed: u64, height: u8) -> Self {
        Self {
            key: mix(seed) | 0x100,
            height,
            fault_at: None,
        }
    }

    /// A node without moves: checkmate when `in_check`, otherwise stalemate.
    pub(crate) fn terminal(seed: u64, in_check: bool) -> Self {
        let key = if in_check {
            (mix(seed) & !7) | 8
        } else {
            mix(seed) | 1
        };
        Self {
            key,
            height: 0,
            fault_at: None,
        }
    }

    /// Make `apply` fail at every node of the given height.
    pub(crate) fn with_fault_at(mut self, height: u8) -> Self {
        self.fault_at = Some(height);
        self
    }

    fn branching(&self) -> u8 {
        if self.height == 0 {
            0
        } else {
            2 + ((self.key >> 61) % 3) as u8
        }
    }

    fn child_key(&self, index: u8) -> u64 {
        mix(self.key ^ (index as u64 + 1).wrapping_mul(0xA24B_AED4_963E_E407))
    }
}

impl Position for TreePosition {
    type Move = TreeMove;

    fn legal_moves(&self) -> MoveList<TreeMove> {
        (0..self.branching()).map(TreeMove).collect()
    }

    fn apply(&self, mv: TreeMove) -> Result<Self, OracleError> {
        if mv.0 >= self.branching() {
            return Err(OracleError::IllegalMove {
                mv: mv.to_string(),
                position: format!("{:#x}", self.key),
            });
        }
        if self.fault_at == Some(self.height) {
            return Err(OracleError::Inconsistent {
                detail: format!("fault injected at height {}", self.height),
            });
        }
        Ok(Self {
            key: self.child_key(mv.0),
            height: self.height - 1,
            fault_at: self.fault_at,
        })
    }

    fn is_in_check(&self) -> bool {
        self.key & 7 == 0
    }

    fn hash(&self) -> u64 {
        self.key
    }

    fn classify(&self, mv: TreeMove) -> MoveClass {
        let c = self.child_key(mv.0);
        if c & 3 == 0 {
            MoveClass {
                moving: PieceKind::ALL[((c >> 2) % 5) as usize],
                captured: Some(PieceKind::ALL[((c >> 5) % 5) as usize]),
                promotion: None,
            }
        } else {
            MoveClass::quiet(PieceKind::ALL[((c >> 2) % 6) as usize])
        }
    }

    fn move_code(mv: TreeMove) -> u16 {
        mv.0 as u16 + 1
    }
}

/// Pseudo-random evaluation in `-200..=200`.
pub(crate) fn tree_eval(position: &TreePosition) -> i32 {
    ((position.key >> 16) % 401) as i32 - 200
}

/// Pruning-free negamax over the tree, with static evaluation at the horizon.
///
/// Matches the search run with a quiescence cap of zero and no table.
pub(crate) fn reference_minimax(position: &TreePosition, depth: u8, ply: usize) -> i32 {
    if depth == 0 {
        return tree_eval(position).clamp(-(MATE_THRESHOLD - 1), MATE_THRESHOLD - 1);
    }
    let moves = position.legal_moves();
    if moves.is_empty() {
        return if position.is_in_check() { mated_in(ply) } else { 0 };
    }
    moves
        .iter()
        .map(|&mv| {
            let child = position.apply(mv).expect("tree moves are always legal");
            -reference_minimax(&child, depth - 1, ply + 1)
        })
        .max()
        .unwrap_or(0)
}

#[test]
fn tree_is_deterministic_and_bounded() {
    let a = TreePosition::new(42, 3);
    let b = TreePosition::new(42, 3);
    assert_eq!(a, b);
    let moves = a.legal_moves();
    assert!((2..=4).contains(&moves.len()));
    assert!(a.apply(TreeMove(7)).is_err());

    let leaf = a
        .apply(moves[0])
        .and_then(|p| p.apply(TreeMove(0)))
        .and_then(|p| p.apply(TreeMove(0)))
        .unwrap();
    assert!(leaf.legal_moves().is_empty());
    assert!(TreePosition::terminal(1, true).is_in_check());
    assert!(!TreePosition::terminal(1, false).is_in_check());
}
