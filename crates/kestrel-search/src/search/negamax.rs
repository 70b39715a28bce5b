//! Negamax alpha-beta search with quiescence.

use smallvec::SmallVec;

use crate::SearchConfig;
use crate::error::SearchError;
use crate::position::{Evaluator, NO_MOVE, Position};
use crate::search::control::{CLOCK_POLL_INTERVAL, SearchControl};
use crate::search::heuristics::{HistoryTable, KillerTable};
use crate::search::ordering::{MovePicker, OrderingHints};
use crate::search::tt::{Bound, TranspositionTable};

/// Score bound larger than any reachable score.
pub const INF: i32 = 30_000;

/// Score of the side to move being checkmated at the root.
pub const MATE_SCORE: i32 = 29_000;

/// Scores beyond this magnitude are mate scores.
pub const MATE_THRESHOLD: i32 = 28_000;

/// Ply ceiling for the search stack.
pub const MAX_PLY: usize = 128;

/// Score for the side to move being checkmated at `ply`.
#[inline]
pub const fn mated_in(ply: usize) -> i32 {
    -(MATE_SCORE - ply as i32)
}

/// Whether `score` announces a forced mate (for either side).
#[inline]
pub const fn is_mate_score(score: i32) -> bool {
    score.abs() > MATE_THRESHOLD
}

/// Triangular principal variation table.
///
/// Line `ply` holds the best continuation found from that ply.
pub struct PvTable<M> {
    lines: Vec<Vec<M>>,
}

impl<M: Copy> PvTable<M> {
    /// Create an empty table covering [`MAX_PLY`] plies.
    pub fn new() -> Self {
        Self {
            lines: (0..=MAX_PLY).map(|_| Vec::new()).collect(),
        }
    }

    /// Forget the line at `ply`.
    #[inline]
    pub fn clear_ply(&mut self, ply: usize) {
        if let Some(line) = self.lines.get_mut(ply) {
            line.clear();
        }
    }

    /// Set line `ply` to `mv` followed by line `ply + 1`.
    pub fn update(&mut self, ply: usize, mv: M) {
        if ply + 1 >= self.lines.len() {
            return;
        }
        let (head, tail) = self.lines.split_at_mut(ply + 1);
        let line = &mut head[ply];
        line.clear();
        line.push(mv);
        line.extend_from_slice(&tail[0]);
    }

    /// The line stored at `ply`.
    pub fn line(&self, ply: usize) -> &[M] {
        self.lines.get(ply).map_or(&[], Vec::as_slice)
    }
}

impl<M: Copy> Default for PvTable<M> {
    fn default() -> Self {
        Self::new()
    }
}

/// Per-worker search state.
///
/// Killers, history and the PV table belong to one worker. The TT, the
/// control and the evaluator are shared.
pub struct SearchContext<'a, P: Position, E> {
    pub(crate) tt: Option<&'a TranspositionTable>,
    pub(crate) control: &'a SearchControl,
    pub(crate) evaluator: &'a E,
    pub(crate) killers: KillerTable,
    pub(crate) history: HistoryTable,
    pub(crate) pv: PvTable<P::Move>,
    /// Game history, the root, then every position on the current path.
    pub(crate) keys: Vec<u64>,
    /// Previous iteration's PV, as move codes.
    pub(crate) prev_pv: Vec<u16>,
    /// Whether the current path is still the previous iteration's PV.
    pub(crate) follow_pv: bool,
    pending: u64,
    quiescence_depth: u8,
    use_history: bool,
}

impl<'a, P, E> SearchContext<'a, P, E>
where
    P: Position,
    E: Evaluator<P>,
{
    /// Fresh worker state. `keys` are the repetition keys up to and including the root.
    pub fn new(
        tt: Option<&'a TranspositionTable>,
        control: &'a SearchControl,
        evaluator: &'a E,
        config: &SearchConfig,
        keys: Vec<u64>,
    ) -> Self {
        Self {
            tt,
            control,
            evaluator,
            killers: KillerTable::new(),
            history: HistoryTable::new(),
            pv: PvTable::new(),
            keys,
            prev_pv: Vec::new(),
            follow_pv: false,
            pending: 0,
            quiescence_depth: config.quiescence_depth,
            use_history: config.use_history,
        }
    }

    /// Count a node and report whether the search must abort.
    #[inline]
    fn visit(&mut self) -> bool {
        self.pending += 1;
        let check_clock = self.pending >= CLOCK_POLL_INTERVAL;
        if check_clock {
            self.flush();
        }
        self.control.should_stop(self.pending, check_clock)
    }

    /// Whether quiet moves are ordered by the history table.
    pub(crate) fn use_history(&self) -> bool {
        self.use_history
    }

    /// Hand unflushed node counts to the shared control.
    pub fn flush(&mut self) {
        if self.pending > 0 {
            self.control.add_nodes(self.pending);
            self.pending = 0;
        }
    }

    /// Static evaluation, kept clear of the mate range.
    #[inline]
    fn static_eval(&self, position: &P) -> i32 {
        self.evaluator
            .evaluate(position)
            .clamp(-(MATE_THRESHOLD - 1), MATE_THRESHOLD - 1)
    }

    /// Whether `hash` repeats an earlier position with the same side to move.
    fn is_repetition(&self, hash: u64) -> bool {
        // keys[len - 1] is the parent; same-side positions sit two apart.
        self.keys.iter().rev().skip(1).step_by(2).any(|&k| k == hash)
    }

    /// PV hint for `ply` if the path still follows the previous PV.
    fn pv_hint(&self, ply: usize) -> u16 {
        if self.follow_pv {
            self.prev_pv.get(ply).copied().unwrap_or(NO_MOVE)
        } else {
            NO_MOVE
        }
    }
}

/// Fail-soft negamax alpha-beta search.
///
/// Returns the score of `position` from the side to move's perspective. When
/// the control has been stopped the returned value is meaningless and the
/// caller must discard it.
pub fn negamax<P, E>(
    position: &P,
    depth: u8,
    ply: usize,
    mut alpha: i32,
    beta: i32,
    ctx: &mut SearchContext<'_, P, E>,
) -> Result<i32, SearchError>
where
    P: Position,
    E: Evaluator<P>,
{
    ctx.pv.clear_ply(ply);

    if depth == 0 {
        return qsearch(position, ply, 0, alpha, beta, ctx);
    }

    if ctx.visit() {
        return Ok(0);
    }

    let hash = position.hash();
    if ply > 0 && (ctx.is_repetition(hash) || position.is_rule_draw()) {
        return Ok(0);
    }

    if ply >= MAX_PLY - 1 {
        return Ok(ctx.static_eval(position));
    }

    let original_alpha = alpha;
    let mut tt_move = NO_MOVE;
    if let Some(tt) = ctx.tt
        && let Some(probe) = tt.probe(hash, ply)
    {
        tt_move = probe.move_code;
        if ply > 0
            && let Some(score) = probe.cutoff(depth, alpha, beta)
        {
            return Ok(score);
        }
    }

    let moves = position.legal_moves();
    if moves.is_empty() {
        return Ok(if position.is_in_check() { mated_in(ply) } else { 0 });
    }

    let hints = OrderingHints {
        pv_move: ctx.pv_hint(ply),
        tt_move,
        killers: ctx.killers.slot(ply),
    };
    let following = ctx.follow_pv;
    let history = ctx.use_history.then_some(&ctx.history);
    let mut picker = MovePicker::new(position, &moves, hints, history);

    let mut best_score = -INF;
    let mut best_code = NO_MOVE;
    let mut quiets_tried: SmallVec<[u16; 32]> = SmallVec::new();

    ctx.keys.push(hash);
    let outcome = loop {
        let Some(om) = picker.pick_next() else {
            break Ok(());
        };

        let child = match position.apply(om.mv) {
            Ok(child) => child,
            Err(e) => break Err(SearchError::from(e)),
        };

        ctx.follow_pv = following && om.is_pv;
        let result = negamax(&child, depth - 1, ply + 1, -beta, -alpha, ctx);
        ctx.follow_pv = false;
        let score = match result {
            Ok(score) => -score,
            Err(e) => break Err(e),
        };

        if ctx.control.is_stopped() {
            break Ok(());
        }

        if score > best_score {
            best_score = score;
            best_code = om.code;

            if score > alpha {
                alpha = score;
                ctx.pv.update(ply, om.mv);

                if score >= beta {
                    if !om.class.is_capture() {
                        ctx.killers.record(ply, om.code);
                    }
                    if ctx.use_history && !om.class.is_noisy() {
                        ctx.history.update_good(om.code, depth);
                        for &code in &quiets_tried {
                            ctx.history.update_bad(code, depth);
                        }
                    }
                    break Ok(());
                }
            }
        }

        if !om.class.is_noisy() {
            quiets_tried.push(om.code);
        }
    };
    ctx.keys.pop();
    outcome?;

    if ctx.control.is_stopped() {
        return Ok(0);
    }

    if let Some(tt) = ctx.tt {
        let bound = Bound::from_window(best_score, original_alpha, beta);
        tt.store(hash, depth, best_score, best_code, bound, ply);
    }

    Ok(best_score)
}

/// Quiescence search: resolve captures and promotions past the horizon.
///
/// Stands pat on the static evaluation unless in check. `qply` counts plies
/// below the horizon; at the configured cap the static evaluation is returned.
pub fn qsearch<P, E>(
    position: &P,
    ply: usize,
    qply: u8,
    mut alpha: i32,
    beta: i32,
    ctx: &mut SearchContext<'_, P, E>,
) -> Result<i32, SearchError>
where
    P: Position,
    E: Evaluator<P>,
{
    ctx.pv.clear_ply(ply);

    if ctx.visit() {
        return Ok(0);
    }

    if position.is_rule_draw() {
        return Ok(0);
    }

    if qply >= ctx.quiescence_depth || ply >= MAX_PLY - 1 {
        return Ok(ctx.static_eval(position));
    }

    let moves = position.legal_moves();
    let in_check = position.is_in_check();
    if moves.is_empty() {
        return Ok(if in_check { mated_in(ply) } else { 0 });
    }

    let mut best_score = -INF;
    if !in_check {
        let stand_pat = ctx.static_eval(position);
        if stand_pat >= beta {
            return Ok(stand_pat);
        }
        alpha = alpha.max(stand_pat);
        best_score = stand_pat;
    }

    let mut picker = MovePicker::quiescence(position, &moves, in_check);
    while let Some(om) = picker.pick_next() {
        let child = position.apply(om.mv)?;
        let score = -qsearch(&child, ply + 1, qply + 1, -beta, -alpha, ctx)?;

        if ctx.control.is_stopped() {
            return Ok(0);
        }

        if score > best_score {
            best_score = score;
            if score > alpha {
                alpha = score;
                if score >= beta {
                    break;
                }
            }
        }
    }

    Ok(best_score)
}
