//! Mailbox board state and move application.

use std::fmt;
use std::str::FromStr;

use lucena_core::values::{piece_value, PAWN_VALUE};
use lucena_core::{Color, Move, MoveList, PieceKind, Position, Square};

use crate::attacks;
use crate::error::FenError;
use crate::eval;
use crate::fen;
use crate::movegen;
use crate::see;
use crate::zobrist;

/// A colored piece.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Piece {
    pub color: Color,
    pub kind: PieceKind,
}

/// Castling rights bits.
pub(crate) const CASTLE_WK: u8 = 1;
pub(crate) const CASTLE_WQ: u8 = 2;
pub(crate) const CASTLE_BK: u8 = 4;
pub(crate) const CASTLE_BQ: u8 = 8;

/// Positions retained for repetition detection. The fifty-move rule caps the
/// reversible suffix, so this never overflows before a draw is declared.
const REP_CAPACITY: usize = 102;

/// A chess position.
///
/// Plain 64-cell mailbox plus game state. Boards are value types: the search
/// clones one before every descent and throws the clone away, so there is no
/// unmake machinery anywhere.
#[derive(Clone, Copy)]
pub struct Board {
    pub(crate) squares: [Option<Piece>; 64],
    pub(crate) stm: Color,
    pub(crate) castling: u8,
    pub(crate) ep: Option<Square>,
    pub(crate) halfmove: u16,
    pub(crate) fullmove: u16,
    pub(crate) hash: u64,
    rep_keys: [u64; REP_CAPACITY],
    rep_len: u8,
}

impl Board {
    /// Construct an empty board. Only useful to the FEN parser.
    pub(crate) fn empty() -> Board {
        Board {
            squares: [None; 64],
            stm: Color::White,
            castling: 0,
            ep: None,
            halfmove: 0,
            fullmove: 1,
            hash: 0,
            rep_keys: [0; REP_CAPACITY],
            rep_len: 0,
        }
    }

    /// The standard starting position.
    pub fn starting_position() -> Board {
        fen::parse(fen::STARTING_FEN).expect("starting FEN is valid")
    }

    /// The piece on a square, if any.
    #[inline]
    pub fn piece_at(&self, sq: Square) -> Option<Piece> {
        self.squares[sq.index()]
    }

    /// The side to move.
    #[inline]
    pub(crate) fn side_to_move_raw(&self) -> Color {
        self.stm
    }

    /// The raw castling rights bits.
    #[inline]
    pub(crate) fn castling_bits(&self) -> u8 {
        self.castling
    }

    /// The en passant target square, if any.
    #[inline]
    pub fn en_passant(&self) -> Option<Square> {
        self.ep
    }

    /// Locate a side's king.
    pub(crate) fn king_square(&self, side: Color) -> Option<Square> {
        Square::all().find(|&sq| {
            self.squares[sq.index()]
                == Some(Piece {
                    color: side,
                    kind: PieceKind::King,
                })
        })
    }

    /// Recompute the fingerprint and record the position for repetition
    /// detection. Called at the end of every state change.
    fn refresh_hash(&mut self, irreversible: bool) {
        self.hash = zobrist::hash_of(self);
        if irreversible {
            self.rep_len = 0;
        }
        if (self.rep_len as usize) < REP_CAPACITY {
            self.rep_keys[self.rep_len as usize] = self.hash;
            self.rep_len += 1;
        }
    }

    /// Seed the repetition stack after constructing a board from FEN.
    pub(crate) fn seed_repetition(&mut self) {
        self.hash = zobrist::hash_of(self);
        self.rep_len = 0;
        self.rep_keys[0] = self.hash;
        self.rep_len = 1;
    }

    /// Number of times the current position has occurred since the last
    /// irreversible move, counting the current occurrence.
    fn repetition_count(&self) -> u32 {
        self.rep_keys[..self.rep_len as usize]
            .iter()
            .filter(|&&k| k == self.hash)
            .count() as u32
    }

    fn insufficient_material(&self) -> bool {
        let mut minors = [0u32; 2];
        let mut bishop_square_color = [None; 2];
        for sq in Square::all() {
            let Some(piece) = self.squares[sq.index()] else {
                continue;
            };
            match piece.kind {
                PieceKind::King => {}
                PieceKind::Knight => minors[piece.color.index()] += 1,
                PieceKind::Bishop => {
                    minors[piece.color.index()] += 1;
                    bishop_square_color[piece.color.index()] =
                        Some((sq.rank() + sq.file()) % 2);
                }
                // Any pawn, rook, or queen is mating material
                _ => return false,
            }
        }
        match (minors[0], minors[1]) {
            (0, 0) | (1, 0) | (0, 1) => true,
            // Same-colored single bishops cannot force mate
            (1, 1) => match (bishop_square_color[0], bishop_square_color[1]) {
                (Some(w), Some(b)) => w == b,
                _ => false,
            },
            _ => false,
        }
    }

    /// Castling rights removed when a piece moves from or onto `sq`.
    fn castling_clear_mask(sq: Square) -> u8 {
        match sq {
            Square::A1 => CASTLE_WQ,
            Square::E1 => CASTLE_WK | CASTLE_WQ,
            Square::H1 => CASTLE_WK,
            Square::A8 => CASTLE_BQ,
            Square::E8 => CASTLE_BK | CASTLE_BQ,
            Square::H8 => CASTLE_BK,
            _ => 0,
        }
    }

    /// Apply `mv` for the side to move. Returns `false` if the move leaves
    /// the mover's king in check; the board is then unspecified and must be
    /// discarded.
    pub fn apply_move(&mut self, mv: Move) -> bool {
        let side = self.stm;
        let from = mv.source();
        let to = mv.dest();
        let Some(piece) = self.squares[from.index()] else {
            return false;
        };
        if piece.color != side {
            return false;
        }

        self.squares[from.index()] = None;
        if mv.is_en_passant() {
            let back = if side == Color::White { -1 } else { 1 };
            if let Some(cap_sq) = to.offset(back, 0) {
                self.squares[cap_sq.index()] = None;
            }
            self.squares[to.index()] = Some(piece);
        } else if mv.is_castle() {
            self.squares[to.index()] = Some(piece);
            let rank = from.rank();
            let (rook_from, rook_to) = if to.file() == 6 {
                (Square::new(rank, 7), Square::new(rank, 5))
            } else {
                (Square::new(rank, 0), Square::new(rank, 3))
            };
            self.squares[rook_to.index()] = self.squares[rook_from.index()];
            self.squares[rook_from.index()] = None;
        } else if mv.is_promotion() {
            self.squares[to.index()] = Some(Piece {
                color: side,
                kind: mv.promotion_piece(),
            });
        } else {
            self.squares[to.index()] = Some(piece);
        }

        self.castling &= !(Self::castling_clear_mask(from) | Self::castling_clear_mask(to));

        self.ep = if mv.is_double_push() {
            let toward = if side == Color::White { 1 } else { -1 };
            from.offset(toward, 0)
        } else {
            None
        };

        let irreversible = piece.kind == PieceKind::Pawn || mv.is_capture();
        if irreversible {
            self.halfmove = 0;
        } else {
            self.halfmove += 1;
        }
        if side == Color::Black {
            self.fullmove += 1;
        }
        self.stm = !side;

        self.refresh_hash(irreversible);

        !self.in_check(side)
    }

    /// Find the legal move matching a UCI string ("e2e4", "e7e8q").
    ///
    /// Matching against the generated legal moves recovers the flag bits
    /// (capture, castle, en passant) that UCI notation does not encode.
    pub fn parse_uci_move(&self, s: &str) -> Option<Move> {
        if s.len() < 4 || s.len() > 5 {
            return None;
        }
        let src = Square::from_algebraic(&s[0..2])?;
        let dst = Square::from_algebraic(&s[2..4])?;
        let promo = if s.len() == 5 {
            Some(PieceKind::from_fen_char(s.as_bytes()[4] as char)?)
        } else {
            None
        };

        let legal = movegen::generate_legal(self);
        legal.as_slice().iter().copied().find(|m| {
            m.source() == src
                && m.dest() == dst
                && match promo {
                    Some(kind) => m.is_promotion() && m.promotion_piece() == kind,
                    None => !m.is_promotion(),
                }
        })
    }
}

impl Position for Board {
    fn side_to_move(&self) -> Color {
        self.stm
    }

    fn fingerprint(&self) -> u64 {
        self.hash
    }

    fn move_number(&self) -> u16 {
        self.fullmove
    }

    fn evaluate(&self) -> i32 {
        eval::material(self) + eval::positional(self)
    }

    fn evaluate_material(&self) -> i32 {
        eval::material(self)
    }

    fn evaluate_positional(&self) -> i32 {
        eval::positional(self)
    }

    fn has_non_pawn_material(&self, side: Color) -> bool {
        Square::all().any(|sq| match self.squares[sq.index()] {
            Some(piece) => {
                piece.color == side
                    && piece.kind != PieceKind::Pawn
                    && piece.kind != PieceKind::King
            }
            None => false,
        })
    }

    fn in_check(&self, side: Color) -> bool {
        match self.king_square(side) {
            Some(king) => attacks::square_attacked(self, king, !side),
            None => false,
        }
    }

    fn is_draw(&self) -> bool {
        self.halfmove >= 100 || self.repetition_count() >= 3 || self.insufficient_material()
    }

    fn legal_moves(&self) -> MoveList {
        movegen::generate_legal(self)
    }

    fn pseudo_legal_moves(&self) -> MoveList {
        movegen::generate_pseudo_legal(self)
    }

    fn pseudo_legal_check_escapes(&self) -> MoveList {
        // Legality filtering on apply does the actual escaping; every
        // pseudo-legal move is a candidate.
        movegen::generate_pseudo_legal(self)
    }

    fn pseudo_legal_captures(&self) -> MoveList {
        movegen::generate_captures(self)
    }

    fn pseudo_legal_promotions(&self) -> MoveList {
        movegen::generate_promotions(self)
    }

    fn pseudo_legal_quiet_checks(&self) -> MoveList {
        movegen::generate_quiet_checks(self)
    }

    fn make_move(&mut self, mv: Move) -> bool {
        self.apply_move(mv)
    }

    fn make_hash_move(&mut self, mv: Move) -> bool {
        // A fingerprint collision can hand us a move from an unrelated
        // position; refuse anything the generator would not produce here.
        if movegen::generate_pseudo_legal(self).position(mv).is_none() {
            return false;
        }
        self.apply_move(mv)
    }

    fn make_null_move(&mut self) {
        self.stm = !self.stm;
        self.ep = None;
        self.hash = zobrist::hash_of(self);
    }

    fn see(&self, side: Color, target: Square) -> i32 {
        see::see(self, side, target)
    }

    fn exchange_score(&self, _side: Color, mv: Move) -> i32 {
        let victim = if mv.is_en_passant() {
            PAWN_VALUE
        } else {
            self.squares[mv.dest().index()]
                .map_or(0, |piece| piece_value(piece.kind))
        };
        let attacker = self.squares[mv.source().index()]
            .map_or(0, |piece| piece_value(piece.kind));
        victim - attacker
    }

    fn mvv_lva_score(&self, mv: Move) -> i32 {
        let victim = if mv.is_en_passant() {
            PieceKind::Pawn
        } else {
            match self.squares[mv.dest().index()] {
                Some(piece) => piece.kind,
                None => return 0,
            }
        };
        let attacker = match self.squares[mv.source().index()] {
            Some(piece) => piece.kind,
            None => return 0,
        };
        8 * victim.index() as i32 - attacker.index() as i32
    }

    fn gives_check(&self, mv: Move) -> bool {
        let mut copy = *self;
        copy.apply_move(mv) && copy.in_check(copy.stm)
    }

    fn piece_on(&self, side: Color, sq: Square) -> Option<PieceKind> {
        match self.squares[sq.index()] {
            Some(piece) if piece.color == side => Some(piece.kind),
            _ => None,
        }
    }
}

impl FromStr for Board {
    type Err = FenError;

    fn from_str(s: &str) -> Result<Board, FenError> {
        fen::parse(s)
    }
}

impl fmt::Debug for Board {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Board {{")?;
        for rank in (0..8).rev() {
            write!(f, "  ")?;
            for file in 0..8 {
                let sq = Square::new(rank, file);
                let c = match self.squares[sq.index()] {
                    Some(p) if p.color == Color::White => {
                        p.kind.fen_char().to_ascii_uppercase()
                    }
                    Some(p) => p.kind.fen_char(),
                    None => '.',
                };
                write!(f, "{c} ")?;
            }
            writeln!(f)?;
        }
        writeln!(f, "  stm: {} castling: {:04b}", self.stm, self.castling)?;
        write!(f, "}}")
    }
}
