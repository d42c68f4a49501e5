//! Reference board for the lucena search core.
//!
//! A mailbox implementation of the [`lucena_core::Position`] contract:
//! 64-cell piece array, offset-based move generation, Zobrist fingerprints,
//! and a material + piece-square evaluation. Built for correctness and
//! clarity; the search neither knows nor cares how the board works.

mod attacks;
mod board;
mod error;
mod eval;
mod fen;
mod movegen;
mod see;
mod zobrist;

pub use board::{Board, Piece};
pub use error::FenError;
pub use fen::STARTING_FEN;
pub use movegen::perft;
