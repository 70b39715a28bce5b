//! Shared transposition table.
//!
//! Each slot is two relaxed `AtomicU64` words, 16 bytes in total:
//!
//! ```text
//! meta:  [63..32] hash high half  [31..27] age  [25..24] bound  [23..16] depth  [15..0] move code
//! data:  [63..32] meta high ^ meta low            [31..16] score (i16)
//! ```
//!
//! A reader recomputes the check half of `data` from `meta`. Two writers
//! racing on one slot leave halves that disagree, and the read is then a
//! miss instead of a mix of both entries.

use std::sync::atomic::{AtomicU8, AtomicU64, Ordering};

use crate::search::negamax::MATE_THRESHOLD;

/// Size of one slot in bytes.
const SLOT_BYTES: usize = std::mem::size_of::<Slot>();

/// Generations wrap at this value.
const GENERATION_MASK: u8 = 0x1F;

/// Bound type stored in a TT entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum Bound {
    /// No bound information (empty slot).
    None = 0,
    /// The stored score is exact.
    Exact = 1,
    /// The stored score is a lower bound (failed high).
    LowerBound = 2,
    /// The stored score is an upper bound (failed low).
    UpperBound = 3,
}

impl Bound {
    const fn from_bits(bits: u8) -> Self {
        match bits & 0x03 {
            1 => Bound::Exact,
            2 => Bound::LowerBound,
            3 => Bound::UpperBound,
            _ => Bound::None,
        }
    }

    /// Classify a fail-soft score against the window it was searched with.
    pub fn from_window(score: i32, original_alpha: i32, beta: i32) -> Self {
        if score <= original_alpha {
            Bound::UpperBound
        } else if score >= beta {
            Bound::LowerBound
        } else {
            Bound::Exact
        }
    }
}

/// Which existing slots an incoming entry may overwrite.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ReplacementPolicy {
    /// Keep deeper entries from the current generation; replace empty,
    /// stale or shallower-or-equal slots.
    #[default]
    DepthPreferred,
    /// Every store overwrites the slot.
    AlwaysReplace,
}

/// Result of a successful TT probe.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TtProbe {
    /// Code of the best move stored for the position (`0` if none).
    pub move_code: u16,
    /// Search depth of the stored entry.
    pub depth: u8,
    /// Bound type.
    pub bound: Bound,
    /// Score, adjusted back to be relative to the probing ply.
    pub score: i32,
}

impl TtProbe {
    /// The stored score if it settles a node searched to `depth` with
    /// window `(alpha, beta)`.
    pub fn cutoff(&self, depth: u8, alpha: i32, beta: i32) -> Option<i32> {
        if self.depth < depth {
            return None;
        }
        let usable = match self.bound {
            Bound::Exact => true,
            Bound::LowerBound => self.score >= beta,
            Bound::UpperBound => self.score <= alpha,
            Bound::None => false,
        };
        usable.then_some(self.score)
    }
}

/// Convert a search score to TT-storable form.
///
/// Mate scores depend on the distance from the root; they are stored as the
/// distance from the node so that any path reaching the node can reuse them.
pub fn score_to_tt(score: i32, ply: usize) -> i16 {
    let ply = ply as i32;
    let adjusted = if score > MATE_THRESHOLD {
        score + ply
    } else if score < -MATE_THRESHOLD {
        score - ply
    } else {
        score
    };
    adjusted as i16
}

/// Convert a TT-stored score back to search-usable form.
///
/// Reverses the adjustment applied by [`score_to_tt`].
pub fn score_from_tt(score: i16, ply: usize) -> i32 {
    let score = score as i32;
    let ply = ply as i32;
    if score > MATE_THRESHOLD {
        score - ply
    } else if score < -MATE_THRESHOLD {
        score + ply
    } else {
        score
    }
}

/// Unpacked view of a slot's `meta` word.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct SlotMeta {
    key: u32,
    age: u8,
    bound: Bound,
    depth: u8,
    move_code: u16,
}

impl SlotMeta {
    fn pack(self) -> u64 {
        u64::from(self.key) << 32
            | u64::from(self.age & GENERATION_MASK) << 27
            | u64::from(self.bound as u8) << 24
            | u64::from(self.depth) << 16
            | u64::from(self.move_code)
    }

    fn unpack(meta: u64) -> Self {
        Self {
            key: (meta >> 32) as u32,
            age: (meta >> 27) as u8 & GENERATION_MASK,
            bound: Bound::from_bits((meta >> 24) as u8),
            depth: (meta >> 16) as u8,
            move_code: meta as u16,
        }
    }
}

/// Check half stored alongside the score: both halves of `meta` folded together.
fn fold(meta: u64) -> u32 {
    (meta >> 32) as u32 ^ meta as u32
}

#[derive(Default)]
struct Slot {
    meta: AtomicU64,
    data: AtomicU64,
}

impl Slot {
    /// Read the slot, rejecting torn writes and foreign keys.
    fn read(&self, hash: u64) -> Option<(SlotMeta, i16)> {
        let meta = self.meta.load(Ordering::Relaxed);
        let data = self.data.load(Ordering::Relaxed);
        if fold(meta) != (data >> 32) as u32 || (meta >> 32) as u32 != (hash >> 32) as u32 {
            return None;
        }
        Some((SlotMeta::unpack(meta), (data >> 16) as u16 as i16))
    }

    fn write(&self, meta: SlotMeta, score: i16) {
        let meta = meta.pack();
        let data = u64::from(fold(meta)) << 32 | u64::from(score as u16) << 16;
        self.meta.store(meta, Ordering::Relaxed);
        self.data.store(data, Ordering::Relaxed);
    }

    fn current(&self) -> SlotMeta {
        SlotMeta::unpack(self.meta.load(Ordering::Relaxed))
    }

    fn reset(&self) {
        self.meta.store(0, Ordering::Relaxed);
        self.data.store(0, Ordering::Relaxed);
    }
}

/// Lockless transposition table shared by every search worker.
pub struct TranspositionTable {
    slots: Box<[Slot]>,
    /// Slot count minus one.
    mask: u64,
    age: AtomicU8,
    policy: ReplacementPolicy,
}

impl TranspositionTable {
    /// Create a table using at most `mb` megabytes.
    ///
    /// The slot count is the largest power of two that fits, minimum one.
    pub fn new(mb: usize, policy: ReplacementPolicy) -> Self {
        let count = slot_count(mb);
        Self {
            slots: (0..count).map(|_| Slot::default()).collect(),
            mask: count as u64 - 1,
            age: AtomicU8::new(0),
            policy,
        }
    }

    /// Number of slots.
    pub fn capacity(&self) -> usize {
        self.slots.len()
    }

    /// Empty every slot and restart the age counter.
    pub fn clear(&self) {
        self.slots.iter().for_each(Slot::reset);
        self.age.store(0, Ordering::Relaxed);
    }

    /// Start a new search: entries written before now become stale.
    pub fn new_generation(&self) {
        let next = self.age.load(Ordering::Relaxed).wrapping_add(1) & GENERATION_MASK;
        self.age.store(next, Ordering::Relaxed);
    }

    fn slot(&self, hash: u64) -> &Slot {
        &self.slots[(hash & self.mask) as usize]
    }

    /// Look up `hash`, returning mate scores relative to `ply`.
    ///
    /// Empty slots, other keys and torn writes are all misses.
    pub fn probe(&self, hash: u64, ply: usize) -> Option<TtProbe> {
        let (meta, score) = self.slot(hash).read(hash)?;
        (meta.bound != Bound::None).then(|| TtProbe {
            move_code: meta.move_code,
            depth: meta.depth,
            bound: meta.bound,
            score: score_from_tt(score, ply),
        })
    }

    /// Record a search result for `hash`, subject to the replacement policy.
    pub fn store(&self, hash: u64, depth: u8, score: i32, move_code: u16, bound: Bound, ply: usize) {
        let slot = self.slot(hash);
        let age = self.age.load(Ordering::Relaxed);

        if self.policy == ReplacementPolicy::DepthPreferred {
            let held = slot.current();
            if held.bound != Bound::None && held.age == age && depth < held.depth {
                return;
            }
        }

        let meta = SlotMeta {
            key: (hash >> 32) as u32,
            age,
            bound,
            depth,
            move_code,
        };
        slot.write(meta, score_to_tt(score, ply));
    }
}

/// Largest power-of-two slot count fitting in `mb` megabytes.
fn slot_count(mb: usize) -> usize {
    let slots = (mb * 1024 * 1024 / SLOT_BYTES).max(1);
    1 << (usize::BITS - 1 - slots.leading_zeros())
}

impl std::fmt::Debug for TranspositionTable {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TranspositionTable")
            .field("slots", &self.slots.len())
            .field("age", &self.age.load(Ordering::Relaxed))
            .field("policy", &self.policy)
            .finish()
    }
}
