//! Time budget for a fixed time per move.

use std::time::Duration;

/// Largest grace period added on top of the requested time.
const MAX_GRACE: Duration = Duration::from_millis(10);

/// Soft and hard limits derived from a per-move time.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TimeBudget {
    /// Don't start a new iteration past this (before stability scaling).
    pub soft: Duration,
    /// Abort the running iteration past this.
    pub hard: Duration,
}

impl TimeBudget {
    /// Limits for a fixed `time` per move.
    ///
    /// The hard limit is `time` plus `min(time / 16, 10 ms)`. The soft limit is
    /// half the requested time, or the hard limit when `soft_cutoff` is off.
    pub fn per_move(time: Duration, soft_cutoff: bool) -> Self {
        let hard = time + (time / 16).min(MAX_GRACE);
        let soft = if soft_cutoff { time / 2 } else { hard };
        Self { soft, hard }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn short_budget_gets_proportional_grace() {
        let budget = TimeBudget::per_move(Duration::from_millis(80), true);
        assert_eq!(budget.hard, Duration::from_millis(85));
        assert_eq!(budget.soft, Duration::from_millis(40));
    }

    #[test]
    fn long_budget_grace_is_capped() {
        let budget = TimeBudget::per_move(Duration::from_secs(5), true);
        assert_eq!(budget.hard, Duration::from_millis(5010));
        assert_eq!(budget.soft, Duration::from_millis(2500));
    }

    #[test]
    fn without_soft_cutoff_soft_equals_hard() {
        let budget = TimeBudget::per_move(Duration::from_millis(160), false);
        assert_eq!(budget.soft, budget.hard);
        assert_eq!(budget.hard, Duration::from_millis(170));
    }

    #[test]
    fn one_millisecond_budget() {
        let budget = TimeBudget::per_move(Duration::from_millis(1), true);
        assert_eq!(budget.hard, Duration::from_micros(1062) + Duration::from_nanos(500));
        assert!(budget.soft < budget.hard);
    }
}
