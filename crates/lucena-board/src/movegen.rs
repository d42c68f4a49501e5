//! Pseudo-legal move generation.
//!
//! Generators fill two lists, captures and quiets, and every public entry
//! point is a view over them. `generate_pseudo_legal` concatenates captures
//! before quiets; the search's move ordering depends on that partition.

use lucena_core::{Color, Move, MoveList, PieceKind, Position, Square};

use crate::attacks::{self, BISHOP_DIRS, KING_STEPS, KNIGHT_STEPS, ROOK_DIRS};
use crate::board::{Board, Piece, CASTLE_BK, CASTLE_BQ, CASTLE_WK, CASTLE_WQ};

/// Promotion pieces in generation order.
const PROMOTION_KINDS: [PieceKind; 4] = [
    PieceKind::Queen,
    PieceKind::Rook,
    PieceKind::Bishop,
    PieceKind::Knight,
];

/// All pseudo-legal moves for the side to move, captures first.
pub(crate) fn generate_pseudo_legal(board: &Board) -> MoveList {
    let (mut captures, quiets) = generate_partitioned(board);
    captures.extend(&quiets);
    captures
}

/// Pseudo-legal captures excluding promotions (quiescence capture pass).
pub(crate) fn generate_captures(board: &Board) -> MoveList {
    let (captures, _) = generate_partitioned(board);
    let mut out = MoveList::new();
    for &mv in captures.as_slice() {
        if !mv.is_promotion() {
            out.push(mv);
        }
    }
    out
}

/// All pseudo-legal promotions, capturing ones first.
pub(crate) fn generate_promotions(board: &Board) -> MoveList {
    let (captures, quiets) = generate_partitioned(board);
    let mut out = MoveList::new();
    for &mv in captures.as_slice() {
        if mv.is_promotion() {
            out.push(mv);
        }
    }
    for &mv in quiets.as_slice() {
        if mv.is_promotion() {
            out.push(mv);
        }
    }
    out
}

/// Pseudo-legal quiet non-promotion moves that give check.
pub(crate) fn generate_quiet_checks(board: &Board) -> MoveList {
    let (_, quiets) = generate_partitioned(board);
    let mut out = MoveList::new();
    for &mv in quiets.as_slice() {
        if !mv.is_promotion() && board.gives_check(mv) {
            out.push(mv);
        }
    }
    out
}

/// Strictly legal moves, captures first.
pub(crate) fn generate_legal(board: &Board) -> MoveList {
    let pseudo = generate_pseudo_legal(board);
    let mut out = MoveList::new();
    for &mv in pseudo.as_slice() {
        let mut copy = *board;
        if copy.apply_move(mv) {
            out.push(mv);
        }
    }
    out
}

/// Count leaf nodes of the legal move tree to the given depth.
pub fn perft(board: &Board, depth: u32) -> u64 {
    if depth == 0 {
        return 1;
    }
    let mut nodes = 0;
    for &mv in generate_pseudo_legal(board).as_slice() {
        let mut copy = *board;
        if !copy.apply_move(mv) {
            continue;
        }
        nodes += if depth == 1 { 1 } else { perft(&copy, depth - 1) };
    }
    nodes
}

fn generate_partitioned(board: &Board) -> (MoveList, MoveList) {
    let side = board.side_to_move_raw();
    let mut captures = MoveList::new();
    let mut quiets = MoveList::new();

    for from in Square::all() {
        let Some(piece) = board.piece_at(from) else {
            continue;
        };
        if piece.color != side {
            continue;
        }
        match piece.kind {
            PieceKind::Pawn => pawn_moves(board, from, side, &mut captures, &mut quiets),
            PieceKind::Knight => {
                step_moves(board, from, side, &KNIGHT_STEPS, &mut captures, &mut quiets)
            }
            PieceKind::King => {
                step_moves(board, from, side, &KING_STEPS, &mut captures, &mut quiets)
            }
            PieceKind::Bishop => {
                slider_moves(board, from, side, &BISHOP_DIRS, &mut captures, &mut quiets)
            }
            PieceKind::Rook => {
                slider_moves(board, from, side, &ROOK_DIRS, &mut captures, &mut quiets)
            }
            PieceKind::Queen => {
                slider_moves(board, from, side, &BISHOP_DIRS, &mut captures, &mut quiets);
                slider_moves(board, from, side, &ROOK_DIRS, &mut captures, &mut quiets);
            }
        }
    }

    castle_moves(board, side, &mut quiets);

    (captures, quiets)
}

fn pawn_moves(
    board: &Board,
    from: Square,
    side: Color,
    captures: &mut MoveList,
    quiets: &mut MoveList,
) {
    let (forward, start_rank, promo_rank): (i8, u8, u8) = match side {
        Color::White => (1, 1, 7),
        Color::Black => (-1, 6, 0),
    };

    // Pushes
    if let Some(to) = from.offset(forward, 0) {
        if board.piece_at(to).is_none() {
            if to.rank() == promo_rank {
                for kind in PROMOTION_KINDS {
                    quiets.push(Move::new_promotion(from, to, kind, false));
                }
            } else {
                quiets.push(Move::new_quiet(from, to));
                if from.rank() == start_rank {
                    if let Some(two) = from.offset(2 * forward, 0) {
                        if board.piece_at(two).is_none() {
                            quiets.push(Move::new_double_push(from, two));
                        }
                    }
                }
            }
        }
    }

    // Captures, including en passant
    for df in [-1, 1] {
        let Some(to) = from.offset(forward, df) else {
            continue;
        };
        match board.piece_at(to) {
            Some(victim) if victim.color != side => {
                if to.rank() == promo_rank {
                    for kind in PROMOTION_KINDS {
                        captures.push(Move::new_promotion(from, to, kind, true));
                    }
                } else {
                    captures.push(Move::new_capture(from, to));
                }
            }
            None if board.en_passant() == Some(to) => {
                captures.push(Move::new_en_passant(from, to));
            }
            _ => {}
        }
    }
}

fn step_moves(
    board: &Board,
    from: Square,
    side: Color,
    steps: &[(i8, i8)],
    captures: &mut MoveList,
    quiets: &mut MoveList,
) {
    for &(dr, df) in steps {
        let Some(to) = from.offset(dr, df) else {
            continue;
        };
        match board.piece_at(to) {
            None => quiets.push(Move::new_quiet(from, to)),
            Some(piece) if piece.color != side => captures.push(Move::new_capture(from, to)),
            Some(_) => {}
        }
    }
}

fn slider_moves(
    board: &Board,
    from: Square,
    side: Color,
    dirs: &[(i8, i8)],
    captures: &mut MoveList,
    quiets: &mut MoveList,
) {
    for &(dr, df) in dirs {
        let mut cur = from;
        while let Some(to) = cur.offset(dr, df) {
            match board.piece_at(to) {
                None => {
                    quiets.push(Move::new_quiet(from, to));
                    cur = to;
                }
                Some(piece) => {
                    if piece.color != side {
                        captures.push(Move::new_capture(from, to));
                    }
                    break;
                }
            }
        }
    }
}

fn castle_moves(board: &Board, side: Color, quiets: &mut MoveList) {
    let (king_right, queen_right, rank) = match side {
        Color::White => (CASTLE_WK, CASTLE_WQ, 0u8),
        Color::Black => (CASTLE_BK, CASTLE_BQ, 7u8),
    };
    let king_sq = Square::new(rank, 4);
    let king = Piece {
        color: side,
        kind: PieceKind::King,
    };
    let rook = Piece {
        color: side,
        kind: PieceKind::Rook,
    };
    if board.piece_at(king_sq) != Some(king) {
        return;
    }
    let enemy = !side;

    // Castling may not pass through or leave check, and the path must be
    // empty, so the generated move is always legal.
    if board.castling_bits() & king_right != 0
        && board.piece_at(Square::new(rank, 7)) == Some(rook)
        && board.piece_at(Square::new(rank, 5)).is_none()
        && board.piece_at(Square::new(rank, 6)).is_none()
        && !attacks::square_attacked(board, king_sq, enemy)
        && !attacks::square_attacked(board, Square::new(rank, 5), enemy)
        && !attacks::square_attacked(board, Square::new(rank, 6), enemy)
    {
        quiets.push(Move::new_castle(king_sq, Square::new(rank, 6)));
    }

    if board.castling_bits() & queen_right != 0
        && board.piece_at(Square::new(rank, 0)) == Some(rook)
        && board.piece_at(Square::new(rank, 1)).is_none()
        && board.piece_at(Square::new(rank, 2)).is_none()
        && board.piece_at(Square::new(rank, 3)).is_none()
        && !attacks::square_attacked(board, king_sq, enemy)
        && !attacks::square_attacked(board, Square::new(rank, 3), enemy)
        && !attacks::square_attacked(board, Square::new(rank, 2), enemy)
    {
        quiets.push(Move::new_castle(king_sq, Square::new(rank, 2)));
    }
}
