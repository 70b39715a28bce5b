//! Parallel root split.
//!
//! The first ordered root move is searched on the calling thread with a full
//! window. Its score becomes alpha for the remaining moves, which scoped
//! workers claim one at a time from a shared index. Every worker owns its
//! own [`SearchContext`]; the transposition table and the control are shared.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::mpsc;
use std::thread;

use tracing::trace;

use crate::error::SearchError;
use crate::position::{Evaluator, Position};
use crate::search::negamax::{INF, SearchContext};
use crate::search::ordering::OrderedMove;
use crate::search::root::{RootOutcome, search_root_move};

/// What a worker reports for one claimed root move.
type Report<M> = Result<(usize, i32, Vec<M>), SearchError>;

/// Search the root moves of one iteration across `contexts.len()` workers.
///
/// Results are folded in completion order and a later result only replaces
/// the best one with a strictly greater score. Returns `None` when the search
/// was stopped before the iteration finished. An oracle error in any worker
/// stops the others and is returned.
pub(crate) fn search_root_parallel<P, E>(
    position: &P,
    root_moves: &[OrderedMove<P::Move>],
    depth: u8,
    contexts: &mut [SearchContext<'_, P, E>],
) -> Result<Option<RootOutcome<P::Move>>, SearchError>
where
    P: Position,
    E: Evaluator<P>,
{
    let Some((main, _)) = contexts.split_first_mut() else {
        return Ok(None);
    };
    let Some((first, rest)) = root_moves.split_first() else {
        return Ok(None);
    };
    let control = main.control;

    let (score, pv) = search_root_move(position, first, depth, -INF, main)?;
    if control.is_stopped() {
        return Ok(None);
    }
    trace!(depth, mv = %first.mv, score, "first root move searched");

    let mut best = RootOutcome {
        best_move: first.mv,
        best_code: first.code,
        score,
        pv,
    };
    let alpha = score;
    let next = AtomicUsize::new(0);
    let mut failure: Option<SearchError> = None;

    thread::scope(|s| {
        let (tx, rx) = mpsc::channel::<Report<P::Move>>();

        for (worker, ctx) in contexts.iter_mut().enumerate() {
            let tx = tx.clone();
            let next = &next;
            s.spawn(move || {
                loop {
                    let index = next.fetch_add(1, Ordering::Relaxed);
                    let Some(om) = rest.get(index) else {
                        break;
                    };
                    if ctx.control.is_stopped() {
                        break;
                    }

                    match search_root_move(position, om, depth, alpha, ctx) {
                        Ok((score, pv)) => {
                            // A worker that saw the stop has nothing trustworthy to report.
                            if ctx.control.is_stopped() {
                                break;
                            }
                            trace!(worker, depth, mv = %om.mv, score, "root move searched");
                            if tx.send(Ok((index, score, pv))).is_err() {
                                break;
                            }
                        }
                        Err(e) => {
                            ctx.control.stop();
                            let _ = tx.send(Err(e));
                            break;
                        }
                    }
                }
                ctx.flush();
            });
        }
        drop(tx);

        for report in rx {
            match report {
                Ok((index, score, pv)) => {
                    if score > best.score {
                        best = RootOutcome {
                            best_move: rest[index].mv,
                            best_code: rest[index].code,
                            score,
                            pv,
                        };
                    }
                }
                Err(e) => {
                    failure.get_or_insert(e);
                }
            }
        }
    });

    if let Some(e) = failure {
        return Err(e);
    }
    if control.is_stopped() {
        return Ok(None);
    }
    Ok(Some(best))
}
