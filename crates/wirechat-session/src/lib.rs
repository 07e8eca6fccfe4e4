//! Session management for the wirechat protocol.
//!
//! This is the layer applications talk to. A [`Session`] owns one transport
//! connection at a time, turns API calls into frames, turns inbound frames
//! into [`Event`]s, and routes chat messages against the conversation that is
//! currently on screen. [`ChatClient`] (feature `async`) runs a session on a
//! tokio task and hands events out over a bounded channel.

#[cfg(feature = "async")]
pub mod client;
pub mod config;
pub mod dedup;
pub mod error;
pub mod event;
pub mod router;
pub mod session;
pub mod state;

#[cfg(feature = "async")]
pub use client::ChatClient;
pub use config::SessionConfig;
pub use dedup::StatusDedup;
pub use error::{Result, SessionError};
pub use event::{
    ChatMessage, DisconnectReason, Event, EventSink, MessageKind, Origin, RenderedMessage, User,
};
pub use router::{Routed, Router};
pub use session::Session;
pub use state::{ConnectionState, SessionState, BROADCAST};
