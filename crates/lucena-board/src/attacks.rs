//! Square attack detection.

use lucena_core::{Color, PieceKind, Square};

use crate::board::{Board, Piece};

/// Knight move deltas as (rank, file) steps.
pub(crate) const KNIGHT_STEPS: [(i8, i8); 8] = [
    (-2, -1),
    (-2, 1),
    (-1, -2),
    (-1, 2),
    (1, -2),
    (1, 2),
    (2, -1),
    (2, 1),
];

/// King move deltas as (rank, file) steps.
pub(crate) const KING_STEPS: [(i8, i8); 8] = [
    (-1, -1),
    (-1, 0),
    (-1, 1),
    (0, -1),
    (0, 1),
    (1, -1),
    (1, 0),
    (1, 1),
];

/// Rook ray directions.
pub(crate) const ROOK_DIRS: [(i8, i8); 4] = [(-1, 0), (1, 0), (0, -1), (0, 1)];

/// Bishop ray directions.
pub(crate) const BISHOP_DIRS: [(i8, i8); 4] = [(-1, -1), (-1, 1), (1, -1), (1, 1)];

/// Whether `sq` is attacked by any piece of color `by`.
pub(crate) fn square_attacked(board: &Board, sq: Square, by: Color) -> bool {
    // Pawns attack diagonally toward higher ranks for White, lower for Black,
    // so the attacking pawn sits one rank on the other side of `sq`.
    let pawn_rank_delta: i8 = match by {
        Color::White => -1,
        Color::Black => 1,
    };
    for df in [-1, 1] {
        if let Some(from) = sq.offset(pawn_rank_delta, df) {
            if board.piece_at(from)
                == Some(Piece {
                    color: by,
                    kind: PieceKind::Pawn,
                })
            {
                return true;
            }
        }
    }

    for (dr, df) in KNIGHT_STEPS {
        if let Some(from) = sq.offset(dr, df) {
            if board.piece_at(from)
                == Some(Piece {
                    color: by,
                    kind: PieceKind::Knight,
                })
            {
                return true;
            }
        }
    }

    for (dr, df) in KING_STEPS {
        if let Some(from) = sq.offset(dr, df) {
            if board.piece_at(from)
                == Some(Piece {
                    color: by,
                    kind: PieceKind::King,
                })
            {
                return true;
            }
        }
    }

    for (dr, df) in ROOK_DIRS {
        if let Some(piece) = first_piece_on_ray(board, sq, dr, df) {
            if piece.color == by
                && (piece.kind == PieceKind::Rook || piece.kind == PieceKind::Queen)
            {
                return true;
            }
        }
    }

    for (dr, df) in BISHOP_DIRS {
        if let Some(piece) = first_piece_on_ray(board, sq, dr, df) {
            if piece.color == by
                && (piece.kind == PieceKind::Bishop || piece.kind == PieceKind::Queen)
            {
                return true;
            }
        }
    }

    false
}

/// First piece encountered walking from `sq` along a direction.
fn first_piece_on_ray(board: &Board, sq: Square, dr: i8, df: i8) -> Option<Piece> {
    let mut cur = sq;
    while let Some(next) = cur.offset(dr, df) {
        if let Some(piece) = board.piece_at(next) {
            return Some(piece);
        }
        cur = next;
    }
    None
}
