/// Errors that can occur in session operations.
#[derive(Debug, thiserror::Error)]
pub enum SessionError {
    /// Transport-level error.
    #[error("transport error: {0}")]
    Transport(#[from] wirechat_transport::TransportError),

    /// Frame-level error (a field too long to encode).
    #[error("frame error: {0}")]
    Frame(#[from] wirechat_frame::FrameError),

    /// A caller-supplied value was rejected before anything hit the wire.
    #[error("invalid argument: {0}")]
    InvalidArgument(&'static str),

    /// `connect` was called while a connection is open or opening.
    #[error("already connected")]
    AlreadyConnected,

    /// The operation needs an open connection.
    #[error("not connected")]
    NotConnected,

    /// The background client task is gone.
    #[error("client task stopped")]
    ClientStopped,
}

pub type Result<T> = std::result::Result<T, SessionError>;
