//! Board construction errors.

/// Errors from parsing a FEN string.
#[derive(Debug, thiserror::Error)]
pub enum FenError {
    /// The piece placement field does not describe 8 ranks of 8 files.
    #[error("malformed piece placement: {placement}")]
    BadPlacement {
        /// The offending placement field.
        placement: String,
    },

    /// The side-to-move field is not `w` or `b`.
    #[error("invalid side to move: {field}")]
    BadSideToMove {
        /// The offending field.
        field: String,
    },

    /// The castling field contains characters outside `KQkq-`.
    #[error("invalid castling rights: {field}")]
    BadCastling {
        /// The offending field.
        field: String,
    },

    /// The en passant field is neither `-` nor a square.
    #[error("invalid en passant square: {field}")]
    BadEnPassant {
        /// The offending field.
        field: String,
    },

    /// A clock field is not a number.
    #[error("invalid clock field: {field}")]
    BadClock {
        /// The offending field.
        field: String,
    },

    /// The FEN has fewer than the two required fields.
    #[error("FEN must have at least piece placement and side to move")]
    TooFewFields,
}
