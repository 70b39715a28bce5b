//! Search algorithms, move ordering and the iterative-deepening driver.

pub mod control;
pub mod heuristics;
pub mod negamax;
pub mod ordering;
pub mod pool;
pub mod root;
pub mod tt;

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use tracing::{debug, info, warn};

use crate::config::SearchConfig;
use crate::error::{ConfigError, SearchError};
use crate::position::{Evaluator, MoveList, NO_MOVE, Position, TerminalStatus};
use crate::time::TimeBudget;

use control::{SearchControl, StopHandle};
use heuristics::KillerPolicy;
use negamax::{MATE_SCORE, SearchContext, is_mate_score, mated_in};
use ordering::{MovePicker, OrderedMove, OrderingHints};
use root::RootOutcome;
use tt::{Bound, TranspositionTable};

/// Result of a completed search.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SearchResult<M> {
    /// Best move found at the deepest completed iteration.
    pub best_move: M,
    /// Second move of the PV: the expected reply.
    pub ponder_move: Option<M>,
    /// Full principal variation, starting with `best_move`.
    pub pv: Vec<M>,
    /// Score in centipawns from the side to move's perspective.
    pub score: i32,
    /// Nodes visited by every worker.
    pub nodes: u64,
    /// Depth of the deepest completed iteration.
    pub depth: u8,
    /// Wall-clock time spent.
    pub elapsed: Duration,
}

impl<M> SearchResult<M> {
    /// Moves until mate, if the score announces one.
    ///
    /// Positive when the side to move mates, negative when it is mated.
    pub fn mate_in(&self) -> Option<i32> {
        if !is_mate_score(self.score) {
            return None;
        }
        let plies = MATE_SCORE - self.score.abs();
        if self.score > 0 {
            Some((plies + 1) / 2)
        } else {
            Some(-(plies / 2))
        }
    }
}

/// Tracks best-move stability across iterations for time management.
///
/// When the best move changes or the score drops, the soft limit grows;
/// when the best move holds, it shrinks.
struct StabilityTracker {
    last_move: u16,
    last_score: i32,
    stable_streak: u32,
}

impl StabilityTracker {
    fn new() -> Self {
        Self {
            last_move: NO_MOVE,
            last_score: 0,
            stable_streak: 0,
        }
    }

    /// Update with the latest iteration and return the soft-limit scale in percent.
    ///
    /// - Score drop > 100: 250
    /// - Score drop > 50: 180
    /// - Same best move for 3+ iterations: 60
    /// - Otherwise: 100
    fn update(&mut self, best_move: u16, score: i32) -> u32 {
        let scale = if self.last_move == NO_MOVE {
            100
        } else {
            let score_drop = self.last_score - score;
            if score_drop > 100 {
                self.stable_streak = 0;
                250
            } else if score_drop > 50 {
                self.stable_streak = 0;
                180
            } else if best_move == self.last_move {
                self.stable_streak += 1;
                if self.stable_streak >= 3 { 60 } else { 100 }
            } else {
                self.stable_streak = 0;
                100
            }
        };

        self.last_move = best_move;
        self.last_score = score;
        scale
    }
}

/// Iterative-deepening search engine.
///
/// Owns the configuration, the evaluator and the transposition table, which
/// persists across moves of one game.
pub struct Engine<E> {
    config: SearchConfig,
    evaluator: E,
    tt: Option<TranspositionTable>,
    stopped: Arc<AtomicBool>,
}

impl<E> Engine<E> {
    /// Validate `config` and allocate the transposition table.
    pub fn new(config: SearchConfig, evaluator: E) -> Result<Self, ConfigError> {
        config.validate()?;
        let tt = config
            .use_transposition_table
            .then(|| TranspositionTable::new(config.transposition_table_mb, config.replacement_policy));
        if let Some(tt) = &tt {
            debug!(slots = tt.capacity(), "transposition table allocated");
        }
        Ok(Self {
            config,
            evaluator,
            tt,
            stopped: Arc::new(AtomicBool::new(false)),
        })
    }

    /// The active configuration.
    pub fn config(&self) -> &SearchConfig {
        &self.config
    }

    /// Forget everything learned about the previous game.
    pub fn new_game(&mut self) {
        if let Some(tt) = &self.tt {
            tt.clear();
        }
    }

    /// Handle that stops the search in progress from another thread.
    ///
    /// The flag is cleared when a search starts, so a stop only affects the
    /// search running at the time.
    pub fn stop_handle(&self) -> StopHandle {
        StopHandle::new(Arc::clone(&self.stopped))
    }

    /// Choose a move for `position` within the configured budget.
    pub fn find_best_move<P>(&mut self, position: &P) -> Result<SearchResult<P::Move>, SearchError>
    where
        P: Position,
        E: Evaluator<P>,
    {
        self.search(position, &[], |_, _, _, _| {})
    }

    /// Iterative-deepening search of `position`.
    ///
    /// `history` holds the keys of earlier game positions, oldest first,
    /// excluding `position` itself; they count for repetition draws.
    /// Calls `on_iter(depth, score, nodes, pv)` after each completed
    /// iteration.
    pub fn search<P, F>(
        &mut self,
        position: &P,
        history: &[u64],
        mut on_iter: F,
    ) -> Result<SearchResult<P::Move>, SearchError>
    where
        P: Position,
        E: Evaluator<P>,
        F: FnMut(u8, i32, u64, &[P::Move]),
    {
        let root_moves = position.legal_moves();
        if root_moves.is_empty() {
            let status = position.terminal_status();
            let score = if status == TerminalStatus::Checkmate { mated_in(0) } else { 0 };
            return Err(SearchError::NoLegalMoves { status, score });
        }

        self.stopped.store(false, Ordering::Release);
        if let Some(tt) = &self.tt {
            tt.new_generation();
        }

        let budget = self
            .config
            .max_time_per_move
            .map(|time| TimeBudget::per_move(time, self.config.soft_cutoff));
        let control = SearchControl::new(Arc::clone(&self.stopped), budget, self.config.max_nodes);
        let workers = self.config.worker_count().min(root_moves.len());

        let root_hash = position.hash();
        let mut keys = Vec::with_capacity(history.len() + 1 + 2 * self.config.max_depth as usize);
        keys.extend_from_slice(history);
        keys.push(root_hash);

        let tt = self.tt.as_ref();
        let mut contexts: Vec<SearchContext<'_, P, E>> = (0..workers)
            .map(|_| SearchContext::new(tt, &control, &self.evaluator, &self.config, keys.clone()))
            .collect();

        debug!(
            workers,
            root_moves = root_moves.len(),
            max_depth = self.config.max_depth,
            hard_limit = ?control.hard_limit(),
            "search started"
        );

        let mut completed: Option<RootOutcome<P::Move>> = None;
        let mut completed_depth: u8 = 0;
        let mut stability = StabilityTracker::new();

        for depth in 1..=self.config.max_depth {
            if depth > 1 && control.should_stop_iterating() {
                break;
            }

            if depth > 1 && self.config.killer_policy == KillerPolicy::ResetEachIteration {
                for ctx in &mut contexts {
                    ctx.killers.clear();
                }
            }

            let ordered = order_root_moves(position, &root_moves, completed.as_ref(), &contexts[0], tt);
            let prev_pv: Vec<u16> = completed
                .as_ref()
                .map(|c| c.pv.iter().map(|&mv| P::move_code(mv)).collect())
                .unwrap_or_default();
            for ctx in &mut contexts {
                ctx.prev_pv.clone_from(&prev_pv);
            }

            let outcome = if contexts.len() > 1 {
                pool::search_root_parallel(position, &ordered, depth, &mut contexts)
            } else {
                root::search_root(position, &ordered, depth, &mut contexts[0])
            };
            for ctx in &mut contexts {
                ctx.flush();
            }

            let Some(outcome) = outcome? else {
                debug!(depth, "iteration aborted");
                break;
            };

            if let Some(tt) = tt {
                tt.store(root_hash, depth, outcome.score, outcome.best_code, Bound::Exact, 0);
            }

            let nodes = control.nodes();
            debug!(
                depth,
                score = outcome.score,
                nodes,
                best = %outcome.best_move,
                elapsed_ms = control.elapsed().as_millis() as u64,
                "iteration complete"
            );
            on_iter(depth, outcome.score, nodes, &outcome.pv);

            let scale = stability.update(outcome.best_code, outcome.score);
            control.update_soft_scale(scale);

            let proven_mate = is_mate_score(outcome.score)
                && MATE_SCORE - outcome.score.abs() <= depth as i32;
            completed_depth = depth;
            completed = Some(outcome);
            if proven_mate {
                break;
            }
        }

        let nodes = control.nodes();
        let elapsed = control.elapsed();
        let Some(best) = completed else {
            warn!(nodes, "budget exhausted before the first iteration completed");
            return Err(SearchError::BudgetExhausted { nodes });
        };

        info!(
            depth = completed_depth,
            score = best.score,
            nodes,
            best = %best.best_move,
            elapsed_ms = elapsed.as_millis() as u64,
            "search finished"
        );

        Ok(SearchResult {
            best_move: best.best_move,
            ponder_move: best.pv.get(1).copied(),
            pv: best.pv,
            score: best.score,
            nodes,
            depth: completed_depth,
            elapsed,
        })
    }
}

impl<E> std::fmt::Debug for Engine<E> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Engine")
            .field("config", &self.config)
            .field("tt", &self.tt)
            .finish()
    }
}

/// Order the root moves for the next iteration.
///
/// The previous best move leads, then the TT move, then the usual bands
/// using the main worker's killers and history.
fn order_root_moves<P, E>(
    position: &P,
    root_moves: &MoveList<P::Move>,
    completed: Option<&RootOutcome<P::Move>>,
    main: &SearchContext<'_, P, E>,
    tt: Option<&TranspositionTable>,
) -> Vec<OrderedMove<P::Move>>
where
    P: Position,
    E: Evaluator<P>,
{
    let hints = OrderingHints {
        pv_move: completed.map_or(NO_MOVE, |c| c.best_code),
        tt_move: tt
            .and_then(|tt| tt.probe(position.hash(), 0))
            .map_or(NO_MOVE, |probe| probe.move_code),
        killers: main.killers.slot(0),
    };
    let history = main.use_history().then_some(&main.history);
    MovePicker::new(position, root_moves, hints, history).into_ordered()
}

/// Search `position` once with a fresh engine.
pub fn find_best_move<P, E>(
    position: &P,
    evaluator: E,
    config: SearchConfig,
) -> Result<SearchResult<P::Move>, SearchError>
where
    P: Position,
    E: Evaluator<P>,
{
    Engine::new(config, evaluator)?.find_best_move(position)
}

#[cfg(test)]
mod tests {
    use super::*;

    use crate::testing::{TreePosition, reference_minimax, tree_eval};

    fn tree_config(depth: u8) -> SearchConfig {
        SearchConfig::default()
            .with_depth(depth)
            .with_quiescence_depth(0)
    }

    #[test]
    fn callback_sees_every_depth() {
        let root = TreePosition::new(1, 6);
        let mut engine = Engine::new(tree_config(4), tree_eval).unwrap();
        let mut depths = Vec::new();
        engine
            .search(&root, &[], |depth, _, _, pv| {
                assert!(!pv.is_empty());
                depths.push(depth);
            })
            .unwrap();
        assert_eq!(depths, vec![1, 2, 3, 4]);
    }

    #[test]
    fn root_score_matches_minimax() {
        for seed in 0..16u64 {
            let root = TreePosition::new(seed, 7);
            let config = tree_config(4).without_table();
            let result = find_best_move(&root, tree_eval, config).unwrap();
            assert_eq!(result.score, reference_minimax(&root, 4, 0), "seed {seed}");
            assert_eq!(result.depth, 4);
            assert_eq!(result.pv.first(), Some(&result.best_move));
        }
    }

    #[test]
    fn best_move_achieves_root_score() {
        for seed in 0..16u64 {
            let root = TreePosition::new(seed, 7);
            let result = find_best_move(&root, tree_eval, tree_config(4).without_table()).unwrap();
            let child = root.apply(result.best_move).unwrap();
            assert_eq!(-reference_minimax(&child, 3, 1), result.score, "seed {seed}");
        }
    }

    #[test]
    fn table_keeps_root_score() {
        for seed in 0..16u64 {
            let root = TreePosition::new(seed, 7);
            let result = find_best_move(&root, tree_eval, tree_config(4)).unwrap();
            assert_eq!(result.score, reference_minimax(&root, 4, 0), "seed {seed}");
        }
    }

    #[test]
    fn parallel_matches_sequential_score() {
        for seed in 0..8u64 {
            let root = TreePosition::new(seed, 7);
            let sequential = find_best_move(&root, tree_eval, tree_config(4).without_table()).unwrap();
            let parallel =
                find_best_move(&root, tree_eval, tree_config(4).without_table().with_threads(3)).unwrap();
            assert_eq!(parallel.score, sequential.score, "seed {seed}");
        }
    }

    #[test]
    fn search_is_deterministic() {
        let root = TreePosition::new(77, 7);
        let first = find_best_move(&root, tree_eval, tree_config(5)).unwrap();
        for _ in 0..3 {
            let again = find_best_move(&root, tree_eval, tree_config(5)).unwrap();
            assert_eq!(again.best_move, first.best_move);
            assert_eq!(again.score, first.score);
            assert_eq!(again.pv, first.pv);
            assert_eq!(again.nodes, first.nodes);
        }
    }

    #[test]
    fn terminal_root_reports_no_moves() {
        let mated = TreePosition::terminal(4, true);
        let err = find_best_move(&mated, tree_eval, tree_config(3)).unwrap_err();
        assert_eq!(
            err,
            SearchError::NoLegalMoves {
                status: TerminalStatus::Checkmate,
                score: -MATE_SCORE
            }
        );

        let stalemate = TreePosition::terminal(4, false);
        let err = find_best_move(&stalemate, tree_eval, tree_config(3)).unwrap_err();
        assert_eq!(
            err,
            SearchError::NoLegalMoves {
                status: TerminalStatus::Stalemate,
                score: 0
            }
        );
    }

    #[test]
    fn tiny_node_budget_exhausts() {
        let root = TreePosition::new(2, 8);
        let config = tree_config(6).with_nodes(1);
        let err = find_best_move(&root, tree_eval, config).unwrap_err();
        assert!(matches!(err, SearchError::BudgetExhausted { .. }));
    }

    #[test]
    fn node_budget_keeps_completed_iterations() {
        let root = TreePosition::new(2, 12);
        let config = tree_config(12).with_nodes(400).without_table();
        let result = find_best_move(&root, tree_eval, config).unwrap();
        assert!(result.depth >= 1 && result.depth < 12);
        assert_eq!(
            result.score,
            reference_minimax(&root, result.depth, 0),
            "answer must come from the last completed depth"
        );
    }

    #[test]
    fn oracle_error_surfaces() {
        let root = TreePosition::new(6, 7).with_fault_at(5);
        let err = find_best_move(&root, tree_eval, tree_config(4)).unwrap_err();
        assert!(matches!(err, SearchError::Oracle { .. }));

        let root = TreePosition::new(6, 7).with_fault_at(5);
        let err = find_best_move(&root, tree_eval, tree_config(4).with_threads(4)).unwrap_err();
        assert!(matches!(err, SearchError::Oracle { .. }));
    }

    #[test]
    fn invalid_config_rejected_before_search() {
        let err = Engine::new(SearchConfig::default().with_depth(0), tree_eval).unwrap_err();
        assert_eq!(err, ConfigError::ZeroDepth);

        let root = TreePosition::new(1, 3);
        let err = find_best_move(&root, tree_eval, SearchConfig::default().with_threads(0)).unwrap_err();
        assert_eq!(err, SearchError::Config { source: ConfigError::ZeroThreads });
    }

    #[test]
    fn stop_before_search_is_cleared() {
        let root = TreePosition::new(3, 6);
        let mut engine = Engine::new(tree_config(3), tree_eval).unwrap();
        engine.stop_handle().stop();
        let result = engine.find_best_move(&root).unwrap();
        assert_eq!(result.depth, 3);
    }

    #[test]
    fn killer_policies_agree_on_score() {
        for seed in 0..8u64 {
            let root = TreePosition::new(seed, 7);
            let persist = find_best_move(&root, tree_eval, tree_config(4).without_table()).unwrap();
            let reset = find_best_move(
                &root,
                tree_eval,
                tree_config(4)
                    .without_table()
                    .with_killer_policy(KillerPolicy::ResetEachIteration),
            )
            .unwrap();
            assert_eq!(persist.score, reset.score, "seed {seed}");
        }
    }

    #[test]
    fn stability_tracker_scales() {
        let mut tracker = StabilityTracker::new();
        assert_eq!(tracker.update(5, 10), 100);
        assert_eq!(tracker.update(5, 10), 100);
        assert_eq!(tracker.update(5, 10), 100);
        assert_eq!(tracker.update(5, 10), 60);
        assert_eq!(tracker.update(6, -50), 180);
        assert_eq!(tracker.update(6, -200), 250);
        assert_eq!(tracker.update(7, -200), 100);
    }

    #[test]
    fn mate_in_counts_moves() {
        let mut result = SearchResult {
            best_move: 0u16,
            ponder_move: None,
            pv: vec![0],
            score: MATE_SCORE - 1,
            nodes: 0,
            depth: 1,
            elapsed: Duration::ZERO,
        };
        assert_eq!(result.mate_in(), Some(1));
        result.score = MATE_SCORE - 3;
        assert_eq!(result.mate_in(), Some(2));
        result.score = -(MATE_SCORE - 2);
        assert_eq!(result.mate_in(), Some(-1));
        result.score = 250;
        assert_eq!(result.mate_in(), None);
    }
}
