//! Static evaluation: material and piece-square terms, white-positive.
//!
//! Exposed as two separate sums so the quiescence search can stage its
//! stand-pat: the cheap material count first, the positional refinement only
//! when the material score lands near the window.

use lucena_core::values::piece_value;
use lucena_core::{Color, PieceKind, Square};

use crate::board::Board;

/// Material balance, white-positive. Kings are not counted.
pub(crate) fn material(board: &Board) -> i32 {
    let mut score = 0;
    for sq in Square::all() {
        let Some(piece) = board.piece_at(sq) else {
            continue;
        };
        if piece.kind == PieceKind::King {
            continue;
        }
        score += piece.color.sign() * piece_value(piece.kind);
    }
    score
}

/// Piece-square balance, white-positive.
///
/// Tables are written from White's point of view with rank 1 first; Black
/// uses the vertically mirrored square.
pub(crate) fn positional(board: &Board) -> i32 {
    let mut score = 0;
    for sq in Square::all() {
        let Some(piece) = board.piece_at(sq) else {
            continue;
        };
        let table = &PIECE_SQUARE_TABLES[piece.kind.index()];
        let idx = match piece.color {
            Color::White => sq.index(),
            Color::Black => sq.flip_rank().index(),
        };
        score += piece.color.sign() * table[idx];
    }
    score
}

/// Piece-square tables indexed by `PieceKind::index()`, rank 1 first.
#[rustfmt::skip]
static PIECE_SQUARE_TABLES: [[i32; 64]; 6] = [
    // Pawn
    [
          0,   0,   0,   0,   0,   0,   0,   0,
          5,  10,  10, -20, -20,  10,  10,   5,
          5,  -5, -10,   0,   0, -10,  -5,   5,
          0,   0,   0,  20,  20,   0,   0,   0,
          5,   5,  10,  25,  25,  10,   5,   5,
         10,  10,  20,  30,  30,  20,  10,  10,
         50,  50,  50,  50,  50,  50,  50,  50,
          0,   0,   0,   0,   0,   0,   0,   0,
    ],
    // Knight
    [
        -50, -40, -30, -30, -30, -30, -40, -50,
        -40, -20,   0,   5,   5,   0, -20, -40,
        -30,   5,  10,  15,  15,  10,   5, -30,
        -30,   0,  15,  20,  20,  15,   0, -30,
        -30,   5,  15,  20,  20,  15,   5, -30,
        -30,   0,  10,  15,  15,  10,   0, -30,
        -40, -20,   0,   0,   0,   0, -20, -40,
        -50, -40, -30, -30, -30, -30, -40, -50,
    ],
    // Bishop
    [
        -20, -10, -10, -10, -10, -10, -10, -20,
        -10,   5,   0,   0,   0,   0,   5, -10,
        -10,  10,  10,  10,  10,  10,  10, -10,
        -10,   0,  10,  10,  10,  10,   0, -10,
        -10,   5,   5,  10,  10,   5,   5, -10,
        -10,   0,   5,  10,  10,   5,   0, -10,
        -10,   0,   0,   0,   0,   0,   0, -10,
        -20, -10, -10, -10, -10, -10, -10, -20,
    ],
    // Rook
    [
          0,   0,   0,   5,   5,   0,   0,   0,
         -5,   0,   0,   0,   0,   0,   0,  -5,
         -5,   0,   0,   0,   0,   0,   0,  -5,
         -5,   0,   0,   0,   0,   0,   0,  -5,
         -5,   0,   0,   0,   0,   0,   0,  -5,
         -5,   0,   0,   0,   0,   0,   0,  -5,
          5,  10,  10,  10,  10,  10,  10,   5,
          0,   0,   0,   0,   0,   0,   0,   0,
    ],
    // Queen
    [
        -20, -10, -10,  -5,  -5, -10, -10, -20,
        -10,   0,   5,   0,   0,   0,   0, -10,
        -10,   5,   5,   5,   5,   5,   0, -10,
          0,   0,   5,   5,   5,   5,   0,  -5,
         -5,   0,   5,   5,   5,   5,   0,  -5,
        -10,   0,   5,   5,   5,   5,   0, -10,
        -10,   0,   0,   0,   0,   0,   0, -10,
        -20, -10, -10,  -5,  -5, -10, -10, -20,
    ],
    // King
    [
         20,  30,  10,   0,   0,  10,  30,  20,
         20,  20,   0,   0,   0,   0,  20,  20,
        -10, -20, -20, -20, -20, -20, -20, -10,
        -20, -30, -30, -40, -40, -30, -30, -20,
        -30, -40, -40, -50, -50, -40, -40, -30,
        -30, -40, -40, -50, -50, -40, -40, -30,
        -30, -40, -40, -50, -50, -40, -40, -30,
        -30, -40, -40, -50, -50, -40, -40, -30,
    ],
];
