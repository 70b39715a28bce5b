//! Sequential root move loop for one iteration.

use tracing::trace;

use crate::error::SearchError;
use crate::position::{Evaluator, Position};
use crate::search::negamax::{INF, SearchContext, negamax};
use crate::search::ordering::OrderedMove;

/// Best root move of one completed iteration.
#[derive(Debug, Clone)]
pub struct RootOutcome<M> {
    /// The move to play.
    pub best_move: M,
    /// Its move code.
    pub best_code: u16,
    /// Its score, from the root side to move's perspective.
    pub score: i32,
    /// Principal variation, starting with `best_move`.
    pub pv: Vec<M>,
}

/// Search one root move with the window `(alpha, +INF)`.
///
/// Returns the score from the root's perspective and the PV starting with the
/// move. Exact when the score is above `alpha`, an upper bound otherwise.
pub(crate) fn search_root_move<P, E>(
    position: &P,
    om: &OrderedMove<P::Move>,
    depth: u8,
    alpha: i32,
    ctx: &mut SearchContext<'_, P, E>,
) -> Result<(i32, Vec<P::Move>), SearchError>
where
    P: Position,
    E: Evaluator<P>,
{
    let child = position.apply(om.mv)?;

    ctx.follow_pv = om.is_pv;
    let result = negamax(&child, depth - 1, 1, -INF, -alpha, ctx);
    ctx.follow_pv = false;
    let score = -result?;

    let child_line = ctx.pv.line(1);
    let mut pv = Vec::with_capacity(child_line.len() + 1);
    pv.push(om.mv);
    pv.extend_from_slice(child_line);
    Ok((score, pv))
}

/// Search every root move in order on the calling thread.
///
/// Returns `None` when the search was stopped before the iteration finished.
pub(crate) fn search_root<P, E>(
    position: &P,
    root_moves: &[OrderedMove<P::Move>],
    depth: u8,
    ctx: &mut SearchContext<'_, P, E>,
) -> Result<Option<RootOutcome<P::Move>>, SearchError>
where
    P: Position,
    E: Evaluator<P>,
{
    let mut alpha = -INF;
    let mut best: Option<RootOutcome<P::Move>> = None;

    for om in root_moves {
        let (score, pv) = search_root_move(position, om, depth, alpha, ctx)?;
        if ctx.control.is_stopped() {
            return Ok(None);
        }
        trace!(depth, mv = %om.mv, score, "root move searched");

        if best.as_ref().is_none_or(|b| score > b.score) {
            alpha = alpha.max(score);
            best = Some(RootOutcome {
                best_move: om.mv,
                best_code: om.code,
                score,
                pv,
            });
        }
    }

    Ok(best)
}
