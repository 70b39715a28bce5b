//! Search control: stop flag, node budget and time limits.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicU32, AtomicU64, Ordering};
use std::time::{Duration, Instant};

use crate::time::TimeBudget;

/// Nodes a worker visits between clock checks and node-count flushes.
pub const CLOCK_POLL_INTERVAL: u64 = 512;

/// Controls when a search should stop.
///
/// Shared by every worker of one search. The stop flag and node limit are
/// checked at every node; the clock only every [`CLOCK_POLL_INTERVAL`] nodes.
pub struct SearchControl {
    stopped: Arc<AtomicBool>,
    start: Instant,
    soft_limit: Option<Duration>,
    hard_limit: Option<Duration>,
    /// Percentage applied to the soft limit, driven by best-move stability.
    soft_scale: AtomicU32,
    node_limit: Option<u64>,
    nodes: AtomicU64,
}

impl SearchControl {
    /// Create control without time or node limits; only the stop flag ends
    /// the search early.
    pub fn new_infinite(stopped: Arc<AtomicBool>) -> Self {
        Self::new(stopped, None, None)
    }

    /// Create control with an optional time budget and node limit. The clock
    /// starts immediately.
    pub fn new(stopped: Arc<AtomicBool>, budget: Option<TimeBudget>, node_limit: Option<u64>) -> Self {
        Self {
            stopped,
            start: Instant::now(),
            soft_limit: budget.map(|b| b.soft),
            hard_limit: budget.map(|b| b.hard),
            soft_scale: AtomicU32::new(100),
            node_limit,
            nodes: AtomicU64::new(0),
        }
    }

    /// Raise the stop flag. Idempotent.
    pub fn stop(&self) {
        self.stopped.store(true, Ordering::Release);
    }

    /// Whether the stop flag is raised.
    #[inline]
    pub fn is_stopped(&self) -> bool {
        self.stopped.load(Ordering::Relaxed)
    }

    /// Add nodes flushed by a worker to the shared count.
    pub fn add_nodes(&self, nodes: u64) {
        self.nodes.fetch_add(nodes, Ordering::Relaxed);
    }

    /// Nodes flushed so far by every worker.
    pub fn nodes(&self) -> u64 {
        self.nodes.load(Ordering::Relaxed)
    }

    /// Check whether the search should abort immediately.
    ///
    /// `pending` is the calling worker's count of nodes not yet flushed.
    /// The hard time limit is only consulted when `check_clock` is set.
    /// Exceeding a limit raises the stop flag so every worker sees it.
    pub fn should_stop(&self, pending: u64, check_clock: bool) -> bool {
        if self.is_stopped() {
            return true;
        }

        if let Some(limit) = self.node_limit
            && self.nodes() + pending > limit
        {
            self.stop();
            return true;
        }

        if check_clock
            && let Some(hard) = self.hard_limit
            && self.elapsed() >= hard
        {
            self.stop();
            return true;
        }

        false
    }

    /// Check whether iterative deepening should start a new iteration.
    ///
    /// True once the stop flag is raised or the scaled soft limit has passed.
    pub fn should_stop_iterating(&self) -> bool {
        if self.is_stopped() {
            return true;
        }
        match self.soft_limit() {
            Some(soft) => self.elapsed() >= soft,
            None => false,
        }
    }

    /// Rescale the soft limit, in percent of its base value.
    pub fn update_soft_scale(&self, percent: u32) {
        self.soft_scale.store(percent, Ordering::Relaxed);
    }

    /// The soft limit after stability scaling, never above the hard limit.
    pub fn soft_limit(&self) -> Option<Duration> {
        let base = self.soft_limit?;
        let scaled = base * self.soft_scale.load(Ordering::Relaxed) / 100;
        Some(match self.hard_limit {
            Some(hard) => scaled.min(hard),
            None => scaled,
        })
    }

    /// The hard limit, if the search is timed.
    pub fn hard_limit(&self) -> Option<Duration> {
        self.hard_limit
    }

    /// Time since the search started.
    pub fn elapsed(&self) -> Duration {
        self.start.elapsed()
    }
}

/// Handle through which another thread cancels a running search.
///
/// Cloning shares the same flag.
#[derive(Debug, Clone)]
pub struct StopHandle {
    stopped: Arc<AtomicBool>,
}

impl StopHandle {
    pub(crate) fn new(stopped: Arc<AtomicBool>) -> Self {
        Self { stopped }
    }

    /// Ask the running search to stop. Calling it again has no further effect.
    pub fn stop(&self) {
        self.stopped.store(true, Ordering::Release);
    }

    /// Whether a stop has been requested.
    pub fn is_stopped(&self) -> bool {
        self.stopped.load(Ordering::Relaxed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn flag() -> Arc<AtomicBool> {
        Arc::new(AtomicBool::new(false))
    }

    #[test]
    fn infinite_control_only_stops_on_flag() {
        let stopped = flag();
        let control = SearchControl::new_infinite(stopped.clone());
        assert!(!control.should_stop(1_000_000, true));
        assert!(!control.should_stop_iterating());

        stopped.store(true, Ordering::Relaxed);
        assert!(control.should_stop(0, false));
        assert!(control.should_stop_iterating());
    }

    #[test]
    fn node_limit_raises_flag() {
        let control = SearchControl::new(flag(), None, Some(1000));
        control.add_nodes(900);
        assert!(!control.should_stop(100, false));
        assert!(control.should_stop(101, false));
        assert!(control.is_stopped(), "limit must be visible to other workers");
    }

    #[test]
    fn hard_limit_checked_only_on_clock_polls() {
        let budget = TimeBudget {
            soft: Duration::ZERO,
            hard: Duration::ZERO,
        };
        let control = SearchControl::new(flag(), Some(budget), None);
        assert!(!control.should_stop(0, false));
        assert!(control.should_stop(0, true));
        assert!(control.is_stopped());
    }

    #[test]
    fn soft_scale_is_capped_by_hard_limit() {
        let budget = TimeBudget {
            soft: Duration::from_millis(100),
            hard: Duration::from_millis(210),
        };
        let control = SearchControl::new(flag(), Some(budget), None);
        assert_eq!(control.hard_limit(), Some(Duration::from_millis(210)));
        assert_eq!(control.soft_limit(), Some(Duration::from_millis(100)));

        control.update_soft_scale(60);
        assert_eq!(control.soft_limit(), Some(Duration::from_millis(60)));

        control.update_soft_scale(250);
        assert_eq!(control.soft_limit(), Some(Duration::from_millis(210)));
    }

    #[test]
    fn stop_handle_is_idempotent_and_shared() {
        let stopped = flag();
        let handle = StopHandle::new(stopped.clone());
        let other = handle.clone();
        assert!(!other.is_stopped());

        handle.stop();
        handle.stop();
        assert!(other.is_stopped());
        assert!(stopped.load(Ordering::Relaxed));
    }
}
