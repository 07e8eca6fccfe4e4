//! Opcode-tagged binary framing for the wirechat protocol.
//!
//! Every frame is a single transport message laid out as:
//! - A 1-byte opcode selecting the frame variant
//! - The variant's fields in fixed order
//!
//! Strings are a 1-byte UTF-8 byte length followed by the raw bytes, and
//! numeric fields are single unsigned bytes. No length prefix is wider than
//! one byte, so decoding never allocates more than a few kilobytes.

pub mod codec;
pub mod error;
pub mod error_code;
pub mod opcode;
pub mod status;

pub use codec::{
    decode_frame, encode_frame, Frame, HistoryEntry, UserEntry, MAX_ENTRIES, MAX_FIELD_LEN,
};
pub use error::{FrameError, Result};
pub use error_code::ErrorCode;
pub use opcode::opcode_name;
pub use status::Status;
