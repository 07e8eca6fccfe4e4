//! Client for the wirechat binary chat protocol.
//!
//! wirechat speaks a compact opcode-tagged binary protocol over WebSocket:
//! presence lists, status changes, direct and broadcast messages, and
//! per-conversation history.
//!
//! # Crate Structure
//!
//! - [`transport`]: message transport abstraction (WebSocket, in-memory)
//! - [`frame`]: frame codec, opcodes, statuses and server error codes
//! - [`session`]: session controller, message routing and the async client

/// Re-export transport types.
pub mod transport {
    pub use wirechat_transport::*;
}

/// Re-export frame types.
pub mod frame {
    pub use wirechat_frame::*;
}

/// Re-export session types.
pub mod session {
    pub use wirechat_session::*;
}
