/// Errors that can occur in transport operations.
#[derive(Debug, thiserror::Error)]
pub enum TransportError {
    /// The chat URL could not be parsed.
    #[error("invalid chat url `{url}`: {source}")]
    InvalidUrl {
        url: String,
        source: url::ParseError,
    },

    /// The URL is not a WebSocket URL.
    #[error("unsupported url scheme `{0}` (expected ws or wss)")]
    UnsupportedScheme(String),

    /// Failed to open a connection.
    #[error("failed to connect to {url}: {message}")]
    Connect { url: String, message: String },

    /// The connection is closed; nothing more can be sent on it.
    #[error("transport closed")]
    Closed,

    /// No async runtime is available to drive the connection.
    #[error("no tokio runtime available to drive the connection")]
    NoRuntime,
}

pub type Result<T> = std::result::Result<T, TransportError>;
