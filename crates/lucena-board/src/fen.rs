//! FEN parsing.

use lucena_core::{Color, PieceKind, Square};

use crate::board::{Board, Piece, CASTLE_BK, CASTLE_BQ, CASTLE_WK, CASTLE_WQ};
use crate::error::FenError;

/// FEN of the standard starting position.
pub const STARTING_FEN: &str = "rnbqkbnr/pppppppp/8/8/8/8/PPPPPPPP/RNBQKBNR w KQkq - 0 1";

/// Parse a FEN string.
///
/// The piece placement and side-to-move fields are required; castling,
/// en passant, and the clocks default to `-`, `-`, `0`, `1` when absent,
/// which keeps abbreviated test positions convenient.
pub(crate) fn parse(s: &str) -> Result<Board, FenError> {
    let fields: Vec<&str> = s.split_whitespace().collect();
    if fields.len() < 2 {
        return Err(FenError::TooFewFields);
    }

    let mut board = Board::empty();
    parse_placement(fields[0], &mut board)?;

    board.stm = match fields[1] {
        "w" => Color::White,
        "b" => Color::Black,
        other => {
            return Err(FenError::BadSideToMove {
                field: other.to_string(),
            })
        }
    };

    if let Some(&castling) = fields.get(2) {
        board.castling = parse_castling(castling)?;
    }

    if let Some(&ep) = fields.get(3) {
        board.ep = match ep {
            "-" => None,
            square => Some(Square::from_algebraic(square).ok_or_else(|| {
                FenError::BadEnPassant {
                    field: square.to_string(),
                }
            })?),
        };
    }

    if let Some(&halfmove) = fields.get(4) {
        board.halfmove = halfmove.parse().map_err(|_| FenError::BadClock {
            field: halfmove.to_string(),
        })?;
    }

    if let Some(&fullmove) = fields.get(5) {
        board.fullmove = fullmove.parse().map_err(|_| FenError::BadClock {
            field: fullmove.to_string(),
        })?;
    }

    board.seed_repetition();
    Ok(board)
}

fn parse_placement(placement: &str, board: &mut Board) -> Result<(), FenError> {
    let bad = || FenError::BadPlacement {
        placement: placement.to_string(),
    };

    let ranks: Vec<&str> = placement.split('/').collect();
    if ranks.len() != 8 {
        return Err(bad());
    }

    // FEN lists ranks from 8 down to 1
    for (i, rank_str) in ranks.iter().enumerate() {
        let rank = 7 - i as u8;
        let mut file = 0u8;
        for c in rank_str.chars() {
            if let Some(skip) = c.to_digit(10) {
                file += skip as u8;
                if file > 8 {
                    return Err(bad());
                }
            } else {
                let kind = PieceKind::from_fen_char(c).ok_or_else(bad)?;
                if file >= 8 {
                    return Err(bad());
                }
                let color = if c.is_ascii_uppercase() {
                    Color::White
                } else {
                    Color::Black
                };
                board.squares[Square::new(rank, file).index()] = Some(Piece { color, kind });
                file += 1;
            }
        }
        if file != 8 {
            return Err(bad());
        }
    }
    Ok(())
}

fn parse_castling(field: &str) -> Result<u8, FenError> {
    if field == "-" {
        return Ok(0);
    }
    let mut rights = 0u8;
    for c in field.chars() {
        rights |= match c {
            'K' => CASTLE_WK,
            'Q' => CASTLE_WQ,
            'k' => CASTLE_BK,
            'q' => CASTLE_BQ,
            _ => {
                return Err(FenError::BadCastling {
                    field: field.to_string(),
                })
            }
        };
    }
    Ok(rights)
}

#[cfg(test)]
mod tests {
    use super::*;
    use lucena_core::Position;

    #[test]
    fn starting_fen_parses() {
        let board: Board = STARTING_FEN.parse().unwrap();
        assert_eq!(board.side_to_move(), Color::White);
        assert_eq!(board.castling_bits(), 0b1111);
        assert_eq!(board.en_passant(), None);
        assert_eq!(board.move_number(), 1);
    }

    #[test]
    fn abbreviated_fen_defaults() {
        let board: Board = "6k1/5ppp/8/8/8/8/5PPP/R5K1 w".parse().unwrap();
        assert_eq!(board.side_to_move(), Color::White);
        assert_eq!(board.castling_bits(), 0);
        assert_eq!(board.en_passant(), None);
    }

    #[test]
    fn en_passant_field() {
        let board: Board = "rnbqkbnr/pp1ppppp/8/2p5/4P3/8/PPPP1PPP/RNBQKBNR w KQkq c6 0 2"
            .parse()
            .unwrap();
        assert_eq!(board.en_passant(), Square::from_algebraic("c6"));
    }

    #[test]
    fn clock_fields() {
        let board: Board = "4k3/8/8/8/8/8/8/4K3 w - - 42 99".parse().unwrap();
        assert_eq!(board.halfmove, 42);
        assert_eq!(board.move_number(), 99);
    }

    #[test]
    fn rejects_malformed_placement() {
        assert!("8/8/8/8/8/8/8 w".parse::<Board>().is_err());
        assert!("9/8/8/8/8/8/8/8 w".parse::<Board>().is_err());
        assert!("xxxxxxxx/8/8/8/8/8/8/8 w".parse::<Board>().is_err());
    }

    #[test]
    fn rejects_bad_fields() {
        assert!("8/8/8/8/8/8/8/8 x".parse::<Board>().is_err());
        assert!("8/8/8/8/8/8/8/8 w XQ".parse::<Board>().is_err());
        assert!("8/8/8/8/8/8/8/8 w - z9".parse::<Board>().is_err());
        assert!("8/8/8/8/8/8/8/8 w - - abc".parse::<Board>().is_err());
        assert!("".parse::<Board>().is_err());
    }

    #[test]
    fn piece_placement_positions() {
        let board: Board = "r1b2k1r/ppp1qppp/2n5/3p4/1b1P4/2N1PN2/PP3PPP/R1BQK2R w KQ"
            .parse()
            .unwrap();
        assert_eq!(
            board.piece_on(Color::Black, Square::from_algebraic("b4").unwrap()),
            Some(PieceKind::Bishop)
        );
        assert_eq!(
            board.piece_on(Color::White, Square::from_algebraic("d4").unwrap()),
            Some(PieceKind::Pawn)
        );
        assert_eq!(board.castling_bits(), CASTLE_WK | CASTLE_WQ);
    }
}
