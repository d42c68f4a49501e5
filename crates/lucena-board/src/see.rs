//! Static exchange evaluation.
//!
//! Classic swap algorithm: both sides capture on one square with their least
//! valuable attacker until no profitable capture remains, then the gain array
//! is minimaxed backward. Removing an attacker from the occupancy mask
//! reveals x-ray attackers behind it automatically, because attackers are
//! rediscovered against the reduced occupancy on every iteration.

use lucena_core::values::piece_value;
use lucena_core::{Color, PieceKind, Square};

use crate::attacks::{BISHOP_DIRS, KING_STEPS, KNIGHT_STEPS, ROOK_DIRS};
use crate::board::Board;

/// Exchange value of `side` initiating a capture sequence on `target`.
///
/// Returns 0 when `side` has no attacker on the square. An empty target
/// square is worth nothing to capture, so the result is then the (usually
/// negative) value of feeding pieces to a defended square.
pub(crate) fn see(board: &Board, side: Color, target: Square) -> i32 {
    let mut occ = occupancy(board);

    let Some((first_sq, first_kind)) = least_valuable_attacker(board, target, side, occ) else {
        return 0;
    };

    let mut gain = [0i32; 32];
    let mut depth = 0usize;
    gain[0] = board
        .piece_at(target)
        .map_or(0, |piece| piece_value(piece.kind));

    // The first attacker now sits on the target and becomes the next victim.
    let mut next_victim = piece_value(first_kind);
    occ &= !(1u64 << first_sq.index());

    let mut side_to_move = !side;
    loop {
        let Some((sq, kind)) = least_valuable_attacker(board, target, side_to_move, occ) else {
            break;
        };

        depth += 1;
        if depth >= 32 {
            break;
        }

        gain[depth] = next_victim - gain[depth - 1];
        next_victim = piece_value(kind);
        occ &= !(1u64 << sq.index());
        side_to_move = !side_to_move;
    }

    // Each side may stop capturing when the continuation is unfavourable.
    while depth > 0 {
        depth -= 1;
        gain[depth] = -((-gain[depth]).max(gain[depth + 1]));
    }

    gain[0]
}

fn occupancy(board: &Board) -> u64 {
    let mut occ = 0u64;
    for sq in Square::all() {
        if board.piece_at(sq).is_some() {
            occ |= 1u64 << sq.index();
        }
    }
    occ
}

/// Least valuable piece of `side` attacking `target`, honouring the reduced
/// occupancy `occ` so that captured pieces no longer attack or block.
fn least_valuable_attacker(
    board: &Board,
    target: Square,
    side: Color,
    occ: u64,
) -> Option<(Square, PieceKind)> {
    for kind in PieceKind::ALL {
        if let Some(sq) = attacker_of_kind(board, target, side, kind, occ) {
            return Some((sq, kind));
        }
    }
    None
}

fn attacker_of_kind(
    board: &Board,
    target: Square,
    side: Color,
    kind: PieceKind,
    occ: u64,
) -> Option<Square> {
    let present = |sq: Square| {
        occ & (1u64 << sq.index()) != 0
            && board.piece_at(sq).map(|p| (p.color, p.kind)) == Some((side, kind))
    };

    match kind {
        PieceKind::Pawn => {
            // An attacking pawn sits one rank behind the target from its
            // side's point of view.
            let dr: i8 = match side {
                Color::White => -1,
                Color::Black => 1,
            };
            for df in [-1, 1] {
                if let Some(sq) = target.offset(dr, df) {
                    if present(sq) {
                        return Some(sq);
                    }
                }
            }
            None
        }
        PieceKind::Knight => KNIGHT_STEPS
            .iter()
            .filter_map(|&(dr, df)| target.offset(dr, df))
            .find(|&sq| present(sq)),
        PieceKind::King => KING_STEPS
            .iter()
            .filter_map(|&(dr, df)| target.offset(dr, df))
            .find(|&sq| present(sq)),
        PieceKind::Bishop => ray_attacker(board, target, side, kind, occ, &BISHOP_DIRS),
        PieceKind::Rook => ray_attacker(board, target, side, kind, occ, &ROOK_DIRS),
        PieceKind::Queen => ray_attacker(board, target, side, kind, occ, &ROOK_DIRS)
            .or_else(|| ray_attacker(board, target, side, kind, occ, &BISHOP_DIRS)),
    }
}

/// Walk each ray from `target`; the first occupied square either holds the
/// wanted attacker or blocks the ray.
fn ray_attacker(
    board: &Board,
    target: Square,
    side: Color,
    kind: PieceKind,
    occ: u64,
    dirs: &[(i8, i8)],
) -> Option<Square> {
    for &(dr, df) in dirs {
        let mut cur = target;
        while let Some(next) = cur.offset(dr, df) {
            if occ & (1u64 << next.index()) != 0 {
                if board.piece_at(next).map(|p| (p.color, p.kind)) == Some((side, kind)) {
                    return Some(next);
                }
                break;
            }
            cur = next;
        }
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;
    use lucena_core::values::{KNIGHT_VALUE, PAWN_VALUE};

    fn sq(s: &str) -> Square {
        Square::from_algebraic(s).unwrap()
    }

    #[test]
    fn pawn_takes_undefended_knight() {
        let board: Board = "4k3/8/8/3n4/4P3/8/8/4K3 w - - 0 1".parse().unwrap();
        assert_eq!(see(&board, Color::White, sq("d5")), KNIGHT_VALUE);
    }

    #[test]
    fn pawn_takes_defended_knight() {
        // PxN, then pxP: 320 - 100 = 220
        let board: Board = "4k3/8/4p3/3n4/4P3/8/8/4K3 w - - 0 1".parse().unwrap();
        assert_eq!(see(&board, Color::White, sq("d5")), KNIGHT_VALUE - PAWN_VALUE);
    }

    #[test]
    fn queen_takes_defended_pawn_loses() {
        // QxP then pxQ nets far below zero
        let board: Board = "6k1/8/3p4/2p5/8/4Q3/8/4K3 w - - 0 1".parse().unwrap();
        assert!(see(&board, Color::White, sq("c5")) < 0);
    }

    #[test]
    fn no_attacker_scores_zero() {
        let board: Board = "4k3/8/8/3n4/8/8/8/4K3 w - - 0 1".parse().unwrap();
        assert_eq!(see(&board, Color::White, sq("d5")), 0);
    }

    #[test]
    fn least_valuable_attacker_chosen_first() {
        // Both pawn and queen attack d5; capturing with the pawn first means
        // the recapture only wins a pawn.
        let board: Board = "4k3/8/4p3/3n4/4P3/8/8/3QK3 w - - 0 1".parse().unwrap();
        // PxN, pxP, Qxp: 320 - 100 + 100 = 320 with optimal stopping
        let score = see(&board, Color::White, sq("d5"));
        assert!(score >= KNIGHT_VALUE - PAWN_VALUE, "score = {score}");
    }

    #[test]
    fn xray_attacker_discovered() {
        // White rooks doubled on the d-file; black defends d5 once.
        // RxP, rxR, Rxr: wins material despite the single defender.
        let board: Board = "3rk3/8/8/3p4/8/8/3R4/3RK3 w - - 0 1".parse().unwrap();
        let score = see(&board, Color::White, sq("d5"));
        assert!(score > 0, "doubled rooks should win the pawn, score = {score}");
    }

    #[test]
    fn empty_defended_square_is_negative() {
        // Rook d1 eyes the empty d5, which a black pawn defends: landing
        // there just donates the rook.
        let board: Board = "4k3/8/4p3/8/8/8/8/3RK3 w - - 0 1".parse().unwrap();
        assert!(see(&board, Color::White, sq("d5")) < 0);
    }
}
