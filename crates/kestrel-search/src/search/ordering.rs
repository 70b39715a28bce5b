//! Move ordering: PV move, TT move, captures, killers, then history.

use smallvec::SmallVec;

use crate::position::{MoveClass, MoveList, NO_MOVE, Position};
use crate::search::heuristics::{HistoryTable, KillerSlot};

/// Score bands, highest searched first.
///
/// - PV move: 4,000,000
/// - TT move: 3,000,000
/// - Captures/promotions: 2,000,000 + gain * 64 + victim rank * 8 + (7 - attacker),
///   with the gain capped so the band stays below the TT move
/// - Primary killer: 1,000,000
/// - Secondary killer: 900,000
/// - Quiet: history score (-16384..16384), or 0 without history
const PV_MOVE: i32 = 4_000_000;
const TT_MOVE: i32 = 3_000_000;
const NOISY_BASE: i32 = 2_000_000;
const PRIMARY_KILLER: i32 = 1_000_000;
const SECONDARY_KILLER: i32 = 900_000;

/// Largest gain that keeps a noisy key under [`TT_MOVE`].
const MAX_NOISY_GAIN: i32 = (TT_MOVE - NOISY_BASE) / 64 - 1;

/// A move with the static data the orderer ranked it by.
#[derive(Debug, Clone, Copy)]
pub struct OrderedMove<M> {
    /// The oracle's move.
    pub mv: M,
    /// Its 16-bit code.
    pub code: u16,
    /// Moving/captured/promotion pieces.
    pub class: MoveClass,
    /// Whether this is the previous iteration's PV move for the node.
    pub is_pv: bool,
    key: i32,
}

/// Hints feeding the main-search ordering of one node.
#[derive(Debug, Clone, Copy, Default)]
pub struct OrderingHints {
    /// Code of the previous iteration's PV move here, or `0`.
    pub pv_move: u16,
    /// Code of the TT's best move here, or `0`.
    pub tt_move: u16,
    /// Killer slots for the node's ply.
    pub killers: KillerSlot,
}

/// Ordering key for a capture or promotion.
///
/// Higher gain first; ties by more valuable victim, then by less valuable attacker.
fn noisy_key(class: &MoveClass) -> i32 {
    let victim_rank = class.captured.map_or(0, |v| v.index() as i32 + 1);
    let attacker_rank = 7 - class.moving.index() as i32;
    NOISY_BASE + class.gain().min(MAX_NOISY_GAIN) * 64 + victim_rank * 8 + attacker_rank
}

fn main_key(code: u16, class: &MoveClass, hints: &OrderingHints, history: Option<&HistoryTable>) -> i32 {
    if code == hints.pv_move {
        PV_MOVE
    } else if code == hints.tt_move {
        TT_MOVE
    } else if class.is_noisy() {
        noisy_key(class)
    } else if code == hints.killers.primary {
        PRIMARY_KILLER
    } else if code == hints.killers.secondary {
        SECONDARY_KILLER
    } else {
        history.map_or(0, |h| h.score(code))
    }
}

/// Incremental move picker using selection sort.
///
/// Yields moves in descending key order; equal keys keep the oracle's order.
pub struct MovePicker<M> {
    entries: SmallVec<[OrderedMove<M>; 64]>,
    cursor: usize,
}

impl<M: Copy> MovePicker<M> {
    /// Picker over every legal move for the main search.
    ///
    /// Hint codes that match no legal move are ignored. A zero hint never
    /// matches because legal moves have non-zero codes.
    pub fn new<P>(position: &P, moves: &MoveList<M>, hints: OrderingHints, history: Option<&HistoryTable>) -> Self
    where
        P: Position<Move = M>,
    {
        let entries = moves
            .iter()
            .map(|&mv| {
                let code = P::move_code(mv);
                let class = position.classify(mv);
                OrderedMove {
                    mv,
                    code,
                    class,
                    is_pv: code != NO_MOVE && code == hints.pv_move,
                    key: main_key(code, &class, &hints, history),
                }
            })
            .collect();
        Self { entries, cursor: 0 }
    }

    /// Picker for quiescence search.
    ///
    /// Captures and promotions only, unless the side to move is in check,
    /// in which case every evasion is kept (quiet ones last).
    pub fn quiescence<P>(position: &P, moves: &MoveList<M>, in_check: bool) -> Self
    where
        P: Position<Move = M>,
    {
        let entries = moves
            .iter()
            .filter_map(|&mv| {
                let class = position.classify(mv);
                if !in_check && !class.is_noisy() {
                    return None;
                }
                let key = if class.is_noisy() { noisy_key(&class) } else { 0 };
                Some(OrderedMove {
                    mv,
                    code: P::move_code(mv),
                    class,
                    is_pv: false,
                    key,
                })
            })
            .collect();
        Self { entries, cursor: 0 }
    }

    /// Number of moves the picker will yield in total.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether the picker has no moves at all.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Yield the next highest-keyed move.
    pub fn pick_next(&mut self) -> Option<OrderedMove<M>> {
        if self.cursor >= self.entries.len() {
            return None;
        }

        let mut best_idx = self.cursor;
        let mut best_key = self.entries[self.cursor].key;
        for i in (self.cursor + 1)..self.entries.len() {
            if self.entries[i].key > best_key {
                best_key = self.entries[i].key;
                best_idx = i;
            }
        }

        // Shift rather than swap so that ties keep their original order.
        let picked = self.entries.remove(best_idx);
        self.entries.insert(self.cursor, picked);
        self.cursor += 1;
        Some(picked)
    }

    /// Drain the picker into a fully ordered list.
    pub fn into_ordered(mut self) -> Vec<OrderedMove<M>> {
        let mut ordered = Vec::with_capacity(self.entries.len());
        while let Some(om) = self.pick_next() {
            ordered.push(om);
        }
        ordered
    }
}
