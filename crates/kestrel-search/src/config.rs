//! Search configuration and its validation.

use std::time::Duration;

use crate::error::ConfigError;
use crate::search::heuristics::KillerPolicy;
use crate::search::tt::ReplacementPolicy;

/// Largest accepted `max_depth`. Leaves room below the ply ceiling for
/// quiescence.
pub const MAX_DEPTH: u8 = 100;

/// Everything a caller can tune for one [`Engine`](crate::Engine).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SearchConfig {
    /// Deepest iteration the driver may start.
    pub max_depth: u8,
    /// Wall-clock budget per move; `None` searches until `max_depth`.
    pub max_time_per_move: Option<Duration>,
    /// Node budget per move.
    pub max_nodes: Option<u64>,
    /// Whether a transposition table is allocated and consulted.
    pub use_transposition_table: bool,
    /// Transposition table size in megabytes.
    pub transposition_table_mb: usize,
    /// Whether root moves are split across worker threads.
    pub use_multiple_processors: bool,
    /// Worker count when multi-processor search is on (defaults to the
    /// logical CPU count).
    pub threads: Option<usize>,
    /// Extra plies quiescence search may add beyond the horizon.
    pub quiescence_depth: u8,
    /// Killer memory between iterative-deepening passes.
    pub killer_policy: KillerPolicy,
    /// Transposition table slot replacement.
    pub replacement_policy: ReplacementPolicy,
    /// Order quiet moves by the history heuristic.
    pub use_history: bool,
    /// Stop starting new iterations past the soft time limit.
    pub soft_cutoff: bool,
}

impl Default for SearchConfig {
    fn default() -> Self {
        Self {
            max_depth: 64,
            max_time_per_move: None,
            max_nodes: None,
            use_transposition_table: true,
            transposition_table_mb: 16,
            use_multiple_processors: false,
            threads: None,
            quiescence_depth: 8,
            killer_policy: KillerPolicy::PersistAcrossIterations,
            replacement_policy: ReplacementPolicy::DepthPreferred,
            use_history: true,
            soft_cutoff: true,
        }
    }
}

impl SearchConfig {
    /// Set the maximum iteration depth.
    pub fn with_depth(mut self, depth: u8) -> Self {
        self.max_depth = depth;
        self
    }

    /// Set the wall-clock budget per move.
    pub fn with_time(mut self, time: Duration) -> Self {
        self.max_time_per_move = Some(time);
        self
    }

    /// Set the node budget per move.
    pub fn with_nodes(mut self, nodes: u64) -> Self {
        self.max_nodes = Some(nodes);
        self
    }

    /// Enable the transposition table with `mb` megabytes.
    pub fn with_table_mb(mut self, mb: usize) -> Self {
        self.use_transposition_table = true;
        self.transposition_table_mb = mb;
        self
    }

    /// Disable the transposition table.
    pub fn without_table(mut self) -> Self {
        self.use_transposition_table = false;
        self
    }

    /// Search with `threads` workers (`1` keeps the search sequential).
    pub fn with_threads(mut self, threads: usize) -> Self {
        self.use_multiple_processors = threads != 1;
        self.threads = Some(threads);
        self
    }

    /// Set the quiescence ply cap.
    pub fn with_quiescence_depth(mut self, plies: u8) -> Self {
        self.quiescence_depth = plies;
        self
    }

    /// Select the killer persistence policy.
    pub fn with_killer_policy(mut self, policy: KillerPolicy) -> Self {
        self.killer_policy = policy;
        self
    }

    /// Select the transposition table replacement policy.
    pub fn with_replacement_policy(mut self, policy: ReplacementPolicy) -> Self {
        self.replacement_policy = policy;
        self
    }

    /// Check every field, failing on the first invalid one.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.max_depth == 0 {
            return Err(ConfigError::ZeroDepth);
        }
        if self.max_depth > MAX_DEPTH {
            return Err(ConfigError::DepthTooLarge {
                depth: self.max_depth,
                limit: MAX_DEPTH,
            });
        }
        if self.max_time_per_move == Some(Duration::ZERO) {
            return Err(ConfigError::ZeroTime);
        }
        if self.max_nodes == Some(0) {
            return Err(ConfigError::ZeroNodes);
        }
        if self.use_transposition_table && self.transposition_table_mb == 0 {
            return Err(ConfigError::ZeroTableSize);
        }
        if self.threads == Some(0) {
            return Err(ConfigError::ZeroThreads);
        }
        Ok(())
    }

    /// Number of search workers this configuration asks for.
    pub fn worker_count(&self) -> usize {
        if !self.use_multiple_processors {
            return 1;
        }
        self.threads.unwrap_or_else(num_cpus::get).max(1)
    }
}
