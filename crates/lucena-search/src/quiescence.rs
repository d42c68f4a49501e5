//! Quiescence search: resolve captures, promotions, and one ply of checks
//! before trusting the static evaluation.
//!
//! Fail-hard like the main search. The stand-pat is staged: the cheap
//! material count alone settles positions far outside the window, and only
//! the remainder pays for the positional term.

use lucena_core::values::{piece_value, INFTY, MATE_SCORE, MAX_POS_SCORE, QUEEN_VALUE};
use lucena_core::{Color, Position, ScoreList};

use crate::ordering::MovePicker;
use crate::pvs::{clamp_window, SearchContext};

/// Quiescence search over captures, promotions, and (at the first ply)
/// quiet checks. Dispatches to [`check_quiescence`] when in check.
pub(crate) fn quiescence<P: Position>(
    ctx: &mut SearchContext,
    board: &P,
    color: Color,
    plies: i32,
    mut alpha: i32,
    beta: i32,
) -> i32 {
    if board.in_check(color) {
        return check_quiescence(ctx, board, color, plies, alpha, beta);
    }

    // Material alone settles positions far outside the window
    let mut stand_pat = color.sign() * board.evaluate_material();
    if stand_pat >= beta + MAX_POS_SCORE {
        return beta;
    }
    if stand_pat < alpha - 2 * MAX_POS_SCORE - QUEEN_VALUE {
        return alpha;
    }

    stand_pat += color.sign() * board.evaluate_positional();

    if alpha < stand_pat {
        alpha = stand_pat;
    }
    if stand_pat >= beta {
        return beta;
    }
    if stand_pat < alpha - MAX_POS_SCORE - QUEEN_VALUE {
        return alpha;
    }

    let mut captures = board.pseudo_legal_captures();
    let mut scores = ScoreList::new();
    for i in 0..captures.len() {
        scores.push(board.mvv_lva_score(captures[i]));
    }

    let mut searched: u32 = 0;
    let mut picker = MovePicker::new(&mut captures, &mut scores);
    while let Some(m) = picker.pick_next() {
        // Delta pruning: even winning the victim outright cannot lift alpha
        let victim_value = board
            .piece_on(!color, m.dest())
            .map_or(0, piece_value);
        if stand_pat + victim_value < alpha - MAX_POS_SCORE {
            continue;
        }
        // A capture that loses the exchange badly is not worth resolving
        if board.exchange_score(color, m) < 0 && board.see(color, m.dest()) < -MAX_POS_SCORE {
            continue;
        }

        let mut copy = board.clone();
        if !copy.make_move(m) {
            continue;
        }
        ctx.stats.nodes += 1;
        ctx.stats.qs_nodes += 1;
        let score = -quiescence(ctx, &copy, !color, plies + 1, -beta, -alpha);

        if score >= beta {
            ctx.stats.qs_fail_highs += 1;
            if searched == 0 {
                ctx.stats.qs_first_fail_highs += 1;
            }
            return beta;
        }
        if score > alpha {
            alpha = score;
        }
        searched += 1;
    }

    let promotions = board.pseudo_legal_promotions();
    for i in 0..promotions.len() {
        let m = promotions[i];

        // Promoting onto a defended square just feeds the new piece
        if board.see(color, m.dest()) < 0 {
            continue;
        }

        let mut copy = board.clone();
        if !copy.make_move(m) {
            continue;
        }
        ctx.stats.nodes += 1;
        ctx.stats.qs_nodes += 1;
        let score = -quiescence(ctx, &copy, !color, plies + 1, -beta, -alpha);

        if score >= beta {
            ctx.stats.qs_fail_highs += 1;
            if searched == 0 {
                ctx.stats.qs_first_fail_highs += 1;
            }
            return beta;
        }
        if score > alpha {
            alpha = score;
        }
        searched += 1;
    }

    // One ply of quiet checks plugs the worst horizon holes cheaply
    if plies <= 0 {
        let checks = board.pseudo_legal_quiet_checks();
        for i in 0..checks.len() {
            let m = checks[i];

            let mut copy = board.clone();
            if !copy.make_move(m) {
                continue;
            }
            ctx.stats.nodes += 1;
            ctx.stats.qs_nodes += 1;
            let score = -check_quiescence(ctx, &copy, !color, plies + 1, -beta, -alpha);

            if score >= beta {
                ctx.stats.qs_fail_highs += 1;
                if searched == 0 {
                    ctx.stats.qs_first_fail_highs += 1;
                }
                return beta;
            }
            if score > alpha {
                alpha = score;
            }
            searched += 1;
        }
    }

    alpha
}

/// Quiescence while in check: no stand-pat, no pruning — every escape is
/// searched, and having none is checkmate.
pub(crate) fn check_quiescence<P: Position>(
    ctx: &mut SearchContext,
    board: &P,
    color: Color,
    plies: i32,
    mut alpha: i32,
    beta: i32,
) -> i32 {
    let escapes = board.pseudo_legal_check_escapes();

    let mut score = -INFTY;
    let mut searched: u32 = 0;

    for i in 0..escapes.len() {
        let m = escapes[i];

        let mut copy = board.clone();
        if !copy.make_move(m) {
            continue;
        }
        ctx.stats.nodes += 1;
        ctx.stats.qs_nodes += 1;
        score = -quiescence(ctx, &copy, !color, plies + 1, -beta, -alpha);

        if score >= beta {
            ctx.stats.qs_fail_highs += 1;
            if searched == 0 {
                ctx.stats.qs_first_fail_highs += 1;
            }
            return beta;
        }
        if score > alpha {
            alpha = score;
        }
        searched += 1;
    }

    // No legal escape from check is checkmate; deeper mates score closer
    // to zero
    if score == -INFTY {
        let mate = -MATE_SCORE + ctx.params.ply as i32 + plies;
        return clamp_window(mate, alpha, beta);
    }

    alpha
}
