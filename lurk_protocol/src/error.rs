// Error type for frame encoding, decoding and stream I/O.
//
// Decoding never panics on attacker-controlled input: every length and
// offset is checked against the bytes actually available, and an
// inconsistency surfaces as a `FrameError`.

use thiserror::Error;

/// Failure to encode, decode or transport a frame.
#[derive(Debug, Error)]
pub enum FrameError {
    /// A name does not fit the fixed 32-byte field.
    #[error("name is {len} bytes, at most {max} fit")]
    NameTooLong { len: usize, max: usize },

    /// A variable text field exceeds its 16-bit length prefix.
    #[error("text is {len} bytes, at most {max} fit")]
    TextTooLong { len: usize, max: usize },

    /// The leading byte is not a frame kind this side understands.
    #[error("unknown opcode {0}")]
    UnknownOpcode(u8),

    /// A frame ended before one of its fields.
    #[error("frame truncated: need {needed} bytes, have {available}")]
    Truncated { needed: usize, available: usize },

    /// Transport failure.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, FrameError>;
