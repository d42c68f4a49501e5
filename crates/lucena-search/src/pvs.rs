//! Principal variation search.
//!
//! Fail-hard negamax with a null-window re-search for non-first moves. A
//! returned score always satisfies `alpha <= score <= beta`; cutoffs return
//! the bound itself. The one exception is the `-INFTY` sentinel produced
//! when a stop request lands mid-node, which every caller discards.

use lucena_core::values::{
    INFTY, KNIGHT_VALUE, MATE_SCORE, MAX_DEPTH, MAX_POS_SCORE, PAWN_VALUE, QUEEN_VALUE,
};
use lucena_core::{Color, Move, MoveList, PieceKind, Position};

use tracing::warn;

use crate::control::SearchControl;
use crate::ordering::{score_moves, MovePicker};
use crate::params::{SearchParameters, SearchStatistics};
use crate::pv::SearchPv;
use crate::quiescence::quiescence;
use crate::tt::{NodeType, TranspositionTable};

/// Futility margins indexed by remaining depth.
const FUTILITY_MARGIN: [i32; 4] = [
    0,
    MAX_POS_SCORE,
    MAX_POS_SCORE + KNIGHT_VALUE,
    MAX_POS_SCORE + QUEEN_VALUE,
];

/// Reverse futility margins indexed by remaining depth.
const REVERSE_FUTILITY_MARGIN: [i32; 3] = [0, MAX_POS_SCORE, MAX_POS_SCORE + 2 * PAWN_VALUE];

/// Reduced depths for internal iterative deepening, indexed by remaining
/// depth. Grows by one ply for every three, capped at 30.
#[rustfmt::skip]
const IID_DEPTHS: [i32; MAX_DEPTH + 1] = [0,
     0,  0,  0,  0,  1,  1,  1,  2,  2,  2,
     3,  3,  3,  4,  4,  4,  5,  5,  5,  6,
     6,  6,  7,  7,  7,  8,  8,  8,  9,  9,
     9, 10, 10, 10, 11, 11, 11, 12, 12, 12,
    13, 13, 13, 14, 14, 14, 15, 15, 15, 16,
    16, 16, 17, 17, 17, 18, 18, 18, 19, 19,
    19, 20, 20, 20, 21, 21, 21, 22, 22, 22,
    23, 23, 23, 24, 24, 24, 25, 25, 25, 26,
    26, 26, 27, 27, 27, 28, 28, 28, 29, 29,
    29, 30, 30, 30, 30, 30, 30, 30, 30, 30,
    30, 30, 30, 30, 30, 30, 30, 30, 30, 30,
    30, 30, 30, 30, 30, 30, 30, 30, 30, 30,
    30, 30, 30, 30, 30, 30, 30,
];

/// Everything a search node needs besides the position itself.
pub(crate) struct SearchContext<'a> {
    pub tt: &'a mut TranspositionTable,
    pub params: &'a mut SearchParameters,
    pub stats: &'a mut SearchStatistics,
    pub control: &'a SearchControl,
}

/// Clamp a raw score into the fail-hard window.
pub(crate) fn clamp_window(score: i32, alpha: i32, beta: i32) -> i32 {
    if score >= beta {
        beta
    } else if score > alpha {
        score
    } else {
        alpha
    }
}

/// Score a node with no legal moves: mated if in check, else stalemate.
pub(crate) fn score_mate(ctx: &SearchContext, in_check: bool, alpha: i32, beta: i32) -> i32 {
    let score = if in_check {
        // Counting plies from the root makes nearer mates score higher
        -MATE_SCORE + ctx.params.ply as i32
    } else {
        0
    };
    clamp_window(score, alpha, beta)
}

/// Principal variation search. Returns a fail-hard score in `[alpha, beta]`,
/// or `-INFTY` when a stop request interrupted the node.
pub(crate) fn pvs<P: Position>(
    ctx: &mut SearchContext,
    board: &P,
    color: Color,
    depth: i32,
    mut alpha: i32,
    beta: i32,
    pv_line: &mut SearchPv,
) -> i32 {
    // The horizon: resolve tactics instead of evaluating here
    if depth <= 0 {
        pv_line.clear();
        return quiescence(ctx, board, color, 0, alpha, beta);
    }

    if board.is_draw() {
        return clamp_window(0, alpha, beta);
    }

    let prev_alpha = alpha;
    // A null window means some ancestor is proving a bound, not building a
    // variation; most pruning is unsafe on PV nodes and in check
    let is_pv_node = beta - alpha > 1;
    let is_in_check = board.in_check(color);

    let mut hashed = Move::NULL;
    ctx.stats.hash_probes += 1;
    if let Some(cutoff) = probe_tt(ctx, board, color, depth, &mut alpha, beta, &mut hashed, pv_line)
    {
        return cutoff;
    }

    let mut line = SearchPv::new();
    let static_eval = color.sign() * board.evaluate();

    // Null move pruning: hand the opponent a free move; if the reduced
    // search still clears beta, the real position surely would. Unsound in
    // zugzwang, hence the non-pawn-material gate and the cap of two
    // consecutive null moves per path.
    if depth >= 3
        && !is_pv_node
        && ctx.params.null_move_count < 2
        && static_eval >= beta
        && !is_in_check
        && board.has_non_pawn_material(color)
    {
        let mut reduction = if depth >= 11 {
            4
        } else if depth >= 6 {
            3
        } else {
            2
        };
        // Reduce more when well ahead of beta, but never straight into
        // quiescence
        reduction = (depth - 2).min(reduction + (static_eval - beta) / PAWN_VALUE);

        let mut null_board = board.clone();
        null_board.make_null_move();
        ctx.params.null_move_count += 1;
        ctx.params.ply += 1;
        let null_score = -pvs(
            ctx,
            &null_board,
            !color,
            depth - 1 - reduction,
            -beta,
            -beta + 1,
            &mut line,
        );
        ctx.params.ply -= 1;
        ctx.params.null_move_count -= 1;

        if null_score >= beta && !ctx.control.is_stopped() {
            return beta;
        }
    }

    // Reverse futility: if the static eval clears beta by a full margin at
    // low depth, the opponent would not have allowed this position
    if !is_pv_node
        && !is_in_check
        && depth <= 2
        && static_eval - REVERSE_FUTILITY_MARGIN[depth as usize] >= beta
        && board.has_non_pawn_material(color)
    {
        return beta;
    }

    let mut moves = if is_in_check {
        board.pseudo_legal_check_escapes()
    } else {
        board.pseudo_legal_moves()
    };

    if moves.is_empty() {
        return score_mate(ctx, is_in_check, alpha, beta);
    }

    // The probe already searched the hash move
    if !hashed.is_null() {
        if let Some(index) = moves.position(hashed) {
            moves.remove(index);
        }
    }

    let mut scores = score_moves(board, &moves, depth, is_pv_node, ctx.params);

    // Internal iterative deepening: without a hash move, spend a reduced
    // search to pick a promising first move
    if depth >= 5 && hashed.is_null() {
        match best_move_for_sort(ctx, board, &moves, IID_DEPTHS[depth as usize]) {
            Some(best_index) => scores.set(best_index, INFTY),
            None => return score_mate(ctx, is_in_check, alpha, beta),
        }
    }

    let mut to_hash = Move::NULL;
    let mut moves_searched: u32 = if hashed.is_null() { 0 } else { 1 };
    let mut score = -INFTY;
    let killers = ctx.params.killers.probe(ctx.params.ply);

    let mut picker = MovePicker::new(&mut moves, &mut scores);
    while let Some(m) = picker.pick_next() {
        ctx.control.check_hard_limit();
        if ctx.control.is_stopped() {
            return -INFTY;
        }

        // Futility: deep in a lost cause, a quiet move will not rescue
        // alpha, so skip straight past it. Mate scores are exempt.
        if !is_pv_node
            && depth <= 3
            && static_eval <= alpha - FUTILITY_MARGIN[depth as usize]
            && !is_in_check
            && !m.is_capture()
            && alpha.abs() < QUEEN_VALUE
            && !m.is_promotion()
            && !board.gives_check(m)
        {
            score = alpha;
            continue;
        }

        let mut copy = board.clone();
        if !copy.make_move(m) {
            continue;
        }
        ctx.stats.nodes += 1;

        // Late move reduction: at a likely all-node, late quiet moves get a
        // shallower search; the re-search below restores full depth when
        // one surprises.
        let mut reduction = 0;
        if !is_pv_node
            && !is_in_check
            && !m.is_capture()
            && depth >= 3
            && moves_searched > 2
            && alpha <= prev_alpha
            && m != killers[0]
            && m != killers[1]
            && !m.is_promotion()
            && !copy.in_check(!color)
        {
            reduction = (depth - 2)
                .min(((depth as f64 - 3.0) / 4.0 + moves_searched as f64 / 9.5) as i32);
        }

        if moves_searched != 0 {
            ctx.params.ply += 1;
            score = -pvs(ctx, &copy, !color, depth - 1 - reduction, -alpha - 1, -alpha, &mut line);
            ctx.params.ply -= 1;
            // The re-search always runs at full depth
            if alpha < score && score < beta {
                ctx.params.ply += 1;
                score = -pvs(ctx, &copy, !color, depth - 1, -beta, -alpha, &mut line);
                ctx.params.ply -= 1;
            }
        } else {
            ctx.params.ply += 1;
            score = -pvs(ctx, &copy, !color, depth - 1, -beta, -alpha, &mut line);
            ctx.params.ply -= 1;
        }

        if ctx.control.is_stopped() {
            return -INFTY;
        }

        if score >= beta {
            ctx.stats.fail_highs += 1;
            if moves_searched == 0 {
                ctx.stats.first_fail_highs += 1;
            }
            ctx.tt.store(
                board.fingerprint(),
                depth as i8,
                m,
                beta as i16,
                NodeType::Cut,
                ctx.params.root_move_number,
            );
            if !m.is_capture() {
                ctx.params.killers.store(ctx.params.ply, m);
                let piece = board.piece_on(color, m.source()).unwrap_or(PieceKind::Pawn);
                ctx.params
                    .history
                    .credit(color, piece, m.dest().index(), depth);
            }
            return beta;
        }
        if score > alpha {
            alpha = score;
            to_hash = m;
            pv_line.splice(m, &line);
        }
        moves_searched += 1;
    }

    // Every pseudo-legal move left the king in check
    if score == -INFTY {
        return score_mate(ctx, is_in_check, alpha, beta);
    }

    if !to_hash.is_null() && prev_alpha < alpha && alpha < beta {
        // Exact score: always worth hashing
        ctx.tt.store(
            board.fingerprint(),
            depth as i8,
            to_hash,
            alpha as i16,
            NodeType::Pv,
            ctx.params.root_move_number,
        );
        if !to_hash.is_capture() {
            let piece = board
                .piece_on(color, to_hash.source())
                .unwrap_or(PieceKind::Pawn);
            ctx.params
                .history
                .credit(color, piece, to_hash.dest().index(), depth);
        }
    } else if alpha <= prev_alpha {
        // Fail-low: the upper bound is still worth remembering, but
        // fail-hard search produces no best move to go with it
        ctx.tt.store(
            board.fingerprint(),
            depth as i8,
            Move::NULL,
            alpha as i16,
            NodeType::All,
            ctx.params.root_move_number,
        );
    }

    alpha
}

/// Probe the transposition table.
///
/// Returns `Some(score)` on a usable bound cutoff. Otherwise `hashed`
/// receives the stored move, which is searched here with a full window —
/// possibly raising `alpha` and the PV in place — before `None` hands
/// control back to the main move loop. At PV entries the stored exact score
/// is deliberately not returned; re-searching the move instead keeps grafted
/// scores out of the variation.
#[allow(clippy::too_many_arguments)]
fn probe_tt<P: Position>(
    ctx: &mut SearchContext,
    board: &P,
    color: Color,
    depth: i32,
    alpha: &mut i32,
    beta: i32,
    hashed: &mut Move,
    pv_line: &mut SearchPv,
) -> Option<i32> {
    let entry = ctx.tt.probe(board.fingerprint())?;
    ctx.stats.hash_hits += 1;
    let hash_score = entry.score as i32;

    if entry.node_type == NodeType::All {
        // An upper bound at sufficient depth proves a fail-low
        if entry.depth as i32 >= depth && hash_score <= *alpha {
            ctx.stats.hash_score_cuts += 1;
            return Some(*alpha);
        }
        return None;
    }

    *hashed = entry.best_move;
    if entry.node_type == NodeType::Cut && entry.depth as i32 >= depth && hash_score >= beta {
        ctx.stats.hash_score_cuts += 1;
        ctx.stats.fail_highs += 1;
        ctx.stats.first_fail_highs += 1;
        return Some(beta);
    }

    let mut copy = board.clone();
    if copy.make_hash_move(*hashed) {
        let mut line = SearchPv::new();
        ctx.stats.hash_move_attempts += 1;
        ctx.stats.nodes += 1;
        ctx.params.ply += 1;
        let score = -pvs(ctx, &copy, !color, depth - 1, -beta, -*alpha, &mut line);
        ctx.params.ply -= 1;

        if ctx.control.is_stopped() {
            return Some(-INFTY);
        }
        if score >= beta {
            ctx.stats.hash_move_cuts += 1;
            return Some(beta);
        }
        if score > *alpha {
            *alpha = score;
            pv_line.splice(*hashed, &line);
        }
    } else {
        // Type-1 collision: the fingerprint matched a different position
        warn!(hash_move = %*hashed, "dropping illegal transposition move");
        *hashed = Move::NULL;
    }
    None
}

/// Reduced-depth search over the move list to pick a first move when no
/// hash move exists. Returns `None` when no move is legal.
fn best_move_for_sort<P: Position>(
    ctx: &mut SearchContext,
    board: &P,
    moves: &MoveList,
    depth: i32,
) -> Option<usize> {
    let color = board.side_to_move();
    let mut line = SearchPv::new();
    let mut best_index = None;
    let mut alpha = -MATE_SCORE;
    let beta = MATE_SCORE;

    for i in 0..moves.len() {
        let mut copy = board.clone();
        if !copy.make_move(moves[i]) {
            continue;
        }

        let mut score;
        if i != 0 {
            ctx.params.ply += 1;
            score = -pvs(ctx, &copy, !color, depth - 1, -alpha - 1, -alpha, &mut line);
            ctx.params.ply -= 1;
            if alpha < score && score < beta {
                ctx.params.ply += 1;
                score = -pvs(ctx, &copy, !color, depth - 1, -beta, -alpha, &mut line);
                ctx.params.ply -= 1;
            }
        } else {
            ctx.params.ply += 1;
            score = -pvs(ctx, &copy, !color, depth - 1, -beta, -alpha, &mut line);
            ctx.params.ply -= 1;
        }

        if score > alpha {
            alpha = score;
            best_index = Some(i);
        }
    }

    best_index
}
