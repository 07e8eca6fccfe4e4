/// Errors that can occur during frame encoding/decoding.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum FrameError {
    /// The opcode byte is not one this client understands.
    ///
    /// Non-fatal: newer servers may add opcodes, so callers log and skip.
    #[error("unknown opcode {0}")]
    UnknownOpcode(u8),

    /// The buffer ended before the frame's last field.
    #[error("truncated frame (opcode {opcode:?}, needed {needed} more bytes)")]
    Truncated { opcode: Option<u8>, needed: usize },

    /// A string field is longer than its 1-byte length prefix can express.
    #[error("field `{field}` too long ({len} bytes, max 255)")]
    FieldTooLong { field: &'static str, len: usize },

    /// A repeated section has more entries than its 1-byte count can express.
    #[error("too many entries ({count}, max 255)")]
    TooManyEntries { count: usize },
}

pub type Result<T> = std::result::Result<T, FrameError>;
