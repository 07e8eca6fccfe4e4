use bytes::Bytes;
use url::Url;

use crate::error::Result;

/// Connection generation counter.
///
/// Each call to [`Connector::open`] gets the session's current generation;
/// every event for that connection carries it back so that stale events from
/// a superseded connection can be recognised and dropped.
pub type Generation = u64;

/// Notifications delivered by a transport connection.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TransportEvent {
    /// The connection is open and can carry messages.
    Opened,
    /// One complete binary message.
    Message(Bytes),
    /// The connection ended (remote close, local close, or after an error).
    Closed,
    /// A transport-level failure. Always followed by `Closed`.
    Error(String),
}

/// An open (or opening) duplex message channel.
///
/// `send` and `close` must not block: implementations queue the work and
/// report failures later through [`TransportEvent`].
pub trait Transport: Send {
    /// Queue one binary message.
    fn send(&mut self, payload: Bytes) -> Result<()>;

    /// Queue a close. Messages queued before it are still sent.
    fn close(&mut self) -> Result<()>;
}

/// Opens transport connections.
pub trait Connector {
    type Handle: Transport;

    /// Start opening a connection to `url`.
    ///
    /// Returns immediately; `Opened` (or `Error` + `Closed`) follows as an
    /// event tagged with `generation`.
    fn open(&mut self, url: &Url, generation: Generation) -> Result<Self::Handle>;
}
