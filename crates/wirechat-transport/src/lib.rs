//! Message transport abstraction for wirechat.
//!
//! The session layer talks to the network only through the traits here:
//! - [`Connector`] opens a connection for a given generation
//! - [`Transport`] sends complete binary messages and closes
//! - [`TransportEvent`] reports open/message/close/error back, tagged with
//!   the generation it belongs to
//!
//! Two implementations ship with the crate: a WebSocket connector built on
//! `tokio-tungstenite` (feature `ws`) and an in-memory connector that records
//! traffic, for tests and embedding.

pub mod endpoint;
pub mod error;
pub mod memory;
pub mod traits;

#[cfg(feature = "ws")]
pub mod ws;

pub use endpoint::{chat_url, with_username, NAME_PARAM};
pub use error::{Result, TransportError};
pub use memory::{MemoryConnector, MemoryHandle};
pub use traits::{Connector, Generation, Transport, TransportEvent};

#[cfg(feature = "ws")]
pub use ws::{WsConnector, WsHandle};
