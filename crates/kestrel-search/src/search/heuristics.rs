//! Killer move table and history heuristic for quiet move ordering.

use crate::position::NO_MOVE;
use crate::search::negamax::MAX_PLY;

/// Whether killer moves survive from one iterative-deepening pass to the next.
///
/// Killers are always cleared when a new search starts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum KillerPolicy {
    /// Keep killers found by shallower passes.
    #[default]
    PersistAcrossIterations,
    /// Clear killers before every pass.
    ResetEachIteration,
}

/// The two killer slots of one ply, as move codes (`0` = empty).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct KillerSlot {
    /// First non-capture to cause a cutoff at this ply.
    pub primary: u16,
    /// Most recent other non-capture to cause a cutoff at this ply.
    pub secondary: u16,
}

/// Two killer moves per ply, owned by a single search worker.
pub struct KillerTable {
    slots: [KillerSlot; MAX_PLY],
}

impl KillerTable {
    /// Create an empty killer table.
    pub fn new() -> Self {
        Self {
            slots: [KillerSlot::default(); MAX_PLY],
        }
    }

    /// Record a non-capture that caused a beta cutoff at `ply`.
    ///
    /// Fills Primary first. A move equal to Primary changes nothing; any
    /// other move replaces Secondary.
    pub fn record(&mut self, ply: usize, code: u16) {
        if ply >= MAX_PLY || code == NO_MOVE {
            return;
        }
        let slot = &mut self.slots[ply];
        if slot.primary == NO_MOVE {
            slot.primary = code;
        } else if slot.primary != code {
            slot.secondary = code;
        }
    }

    /// Killer slots at `ply` (empty beyond the ply ceiling).
    pub fn slot(&self, ply: usize) -> KillerSlot {
        self.slots.get(ply).copied().unwrap_or_default()
    }

    /// Forget every killer.
    pub fn clear(&mut self) {
        self.slots = [KillerSlot::default(); MAX_PLY];
    }
}

impl Default for KillerTable {
    fn default() -> Self {
        Self::new()
    }
}

/// Maximum absolute value for history scores.
pub(crate) const HISTORY_MAX: i32 = 16_384;

/// History buckets; move codes are folded into this range.
const HISTORY_SIZE: usize = 4096;

/// History heuristic table indexed by move code.
///
/// Rewards quiet moves that cause beta cutoffs, penalises quiet moves that
/// were searched before a cutoff elsewhere in the same node.
pub struct HistoryTable {
    table: Box<[i32; HISTORY_SIZE]>,
}

impl HistoryTable {
    /// Create a zeroed history table.
    pub fn new() -> Self {
        Self {
            table: Box::new([0; HISTORY_SIZE]),
        }
    }

    #[inline]
    fn bucket(code: u16) -> usize {
        code as usize % HISTORY_SIZE
    }

    /// Reward a quiet move that caused a beta cutoff.
    pub fn update_good(&mut self, code: u16, depth: u8) {
        let bonus = (depth as i32) * (depth as i32);
        let entry = &mut self.table[Self::bucket(code)];
        *entry = (*entry + bonus).min(HISTORY_MAX);
    }

    /// Penalise a quiet move that was searched but did not cause a cutoff.
    pub fn update_bad(&mut self, code: u16, depth: u8) {
        let penalty = (depth as i32) * (depth as i32);
        let entry = &mut self.table[Self::bucket(code)];
        *entry = (*entry - penalty).max(-HISTORY_MAX);
    }

    /// History score of a quiet move.
    pub fn score(&self, code: u16) -> i32 {
        self.table[Self::bucket(code)]
    }
}

impl Default for HistoryTable {
    fn default() -> Self {
        Self::new()
    }
}
