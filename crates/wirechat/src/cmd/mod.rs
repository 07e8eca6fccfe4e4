use std::time::Duration;

use clap::{Args, Subcommand};
use tokio::sync::mpsc;
use wirechat_session::{ChatClient, DisconnectReason, Event, SessionConfig};
use wirechat_transport::chat_url;

use crate::exit::{
    session_error, transport_error, CliError, CliResult, FAILURE, REJECTED, TIMEOUT,
    TRANSPORT_ERROR, USAGE,
};
use crate::output::OutputFormat;

pub mod chat;
pub mod decode;
pub mod history;
pub mod send;
pub mod users;
pub mod version;

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Join the chat interactively (stdin lines are sent).
    Chat(ChatArgs),
    /// Send a single message.
    Send(SendArgs),
    /// Print who is online.
    Users(UsersArgs),
    /// Print the history of a conversation.
    History(HistoryArgs),
    /// Decode a hex-encoded frame.
    Decode(DecodeArgs),
    /// Show version information.
    Version(VersionArgs),
}

pub async fn run(command: Command, format: OutputFormat) -> CliResult<i32> {
    match command {
        Command::Chat(args) => chat::run(args, format).await,
        Command::Send(args) => send::run(args, format).await,
        Command::Users(args) => users::run(args, format).await,
        Command::History(args) => history::run(args, format).await,
        Command::Decode(args) => decode::run(args, format),
        Command::Version(args) => version::run(args),
    }
}

#[derive(Args, Debug, Clone)]
pub struct ServerArgs {
    /// Server host name or address.
    #[arg(env = "WIRECHAT_HOST")]
    pub host: String,
    /// Server port.
    #[arg(env = "WIRECHAT_PORT")]
    pub port: u16,
    /// Username to connect as.
    #[arg(long, short = 'n', env = "WIRECHAT_NAME")]
    pub name: String,
    /// Time allowed for the connection and any reply (e.g. 5s, 500ms).
    #[arg(long, default_value = "5s")]
    pub timeout: String,
}

#[derive(Args, Debug)]
pub struct ChatArgs {
    #[command(flatten)]
    pub server: ServerArgs,
    /// Switch to inactive after this long without typing (e.g. 5m). Off when unset.
    #[arg(long, value_name = "DURATION")]
    pub idle: Option<String>,
}

#[derive(Args, Debug)]
pub struct SendArgs {
    #[command(flatten)]
    pub server: ServerArgs,
    /// Recipient username, or `~` for everyone.
    #[arg(long, default_value = "~")]
    pub to: String,
    /// Message text.
    pub body: String,
}

#[derive(Args, Debug)]
pub struct UsersArgs {
    #[command(flatten)]
    pub server: ServerArgs,
}

#[derive(Args, Debug)]
pub struct HistoryArgs {
    #[command(flatten)]
    pub server: ServerArgs,
    /// Conversation to load: a username, or `~` for the broadcast channel.
    pub chat: String,
}

#[derive(Args, Debug)]
pub struct DecodeArgs {
    /// Frame bytes as hex (whitespace and a leading 0x are ignored).
    pub hex: String,
}

#[derive(Args, Debug)]
pub struct VersionArgs {
    /// Show extended build provenance.
    #[arg(long)]
    pub extended: bool,
}

/// A connected client plus its event stream.
pub struct Connection {
    pub client: ChatClient,
    pub events: mpsc::Receiver<Event>,
    /// Events received while connecting, in order.
    pub early: Vec<Event>,
}

/// Connect and wait until the server has answered the handshake.
///
/// A rejected username usually arrives right after the socket opens, so the
/// connection only counts as established once a user list or self-status
/// reply has come back.
pub async fn connect(server: &ServerArgs, config: SessionConfig) -> CliResult<Connection> {
    let timeout = parse_duration(&server.timeout)?;
    let url = chat_url(&server.host, server.port, &server.name)
        .map_err(|err| transport_error("invalid server address", err))?;

    let (client, mut events) =
        ChatClient::spawn(config).map_err(|err| session_error("client failed", err))?;
    client
        .connect(url.as_str(), server.name.as_str())
        .await
        .map_err(|err| session_error("connect failed", err))?;

    let mut early = Vec::new();
    let deadline = tokio::time::Instant::now() + timeout;
    loop {
        let event = match tokio::time::timeout_at(deadline, events.recv()).await {
            Ok(Some(event)) => event,
            Ok(None) => return Err(CliError::new(FAILURE, "client stopped unexpectedly")),
            Err(_) => {
                client.shutdown().await;
                return Err(CliError::new(
                    TIMEOUT,
                    format!("no answer from {url} within {}", server.timeout),
                ));
            }
        };
        match event {
            Event::Disconnected { reason } => {
                client.shutdown().await;
                return Err(disconnect_error(&reason));
            }
            Event::UserListUpdated { .. } | Event::SelfStatusUpdated { .. } => {
                early.push(event);
                tracing::debug!(%url, "handshake answered");
                return Ok(Connection {
                    client,
                    events,
                    early,
                });
            }
            other => early.push(other),
        }
    }
}

/// Exit status for a session that ended before the command finished.
pub fn disconnect_error(reason: &DisconnectReason) -> CliError {
    match reason {
        DisconnectReason::Rejected => CliError::new(REJECTED, "username already taken"),
        DisconnectReason::TransportError(message) => {
            CliError::new(TRANSPORT_ERROR, format!("connection failed: {message}"))
        }
        DisconnectReason::Closed => CliError::new(FAILURE, "connection closed by server"),
        DisconnectReason::Local => CliError::new(FAILURE, "disconnected"),
    }
}

/// Parse `150ms`, `5s`, `5m`, or a bare number of seconds.
pub fn parse_duration(input: &str) -> CliResult<Duration> {
    let input = input.trim();
    if input.is_empty() {
        return Err(CliError::new(USAGE, "duration must not be empty"));
    }

    let (number, unit) = if let Some(num) = input.strip_suffix("ms") {
        (num, "ms")
    } else if let Some(num) = input.strip_suffix('s') {
        (num, "s")
    } else if let Some(num) = input.strip_suffix('m') {
        (num, "m")
    } else {
        (input, "s")
    };

    let value: u64 = number
        .parse()
        .map_err(|_| CliError::new(USAGE, format!("invalid duration value: {input}")))?;

    if value == 0 {
        return Err(CliError::new(USAGE, "duration must be greater than zero"));
    }

    match unit {
        "ms" => Ok(Duration::from_millis(value)),
        "s" => Ok(Duration::from_secs(value)),
        "m" => Ok(Duration::from_secs(value.saturating_mul(60))),
        _ => Err(CliError::new(
            USAGE,
            format!("unsupported duration unit: {unit}"),
        )),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_duration_units() {
        assert_eq!(parse_duration("2s").unwrap(), Duration::from_secs(2));
        assert_eq!(parse_duration("150ms").unwrap(), Duration::from_millis(150));
        assert_eq!(parse_duration("5m").unwrap(), Duration::from_secs(300));
        assert_eq!(parse_duration("3").unwrap(), Duration::from_secs(3));
    }

    #[test]
    fn parse_duration_rejects_invalid_values() {
        assert!(parse_duration("0s").is_err());
        assert!(parse_duration("bad").is_err());
        assert!(parse_duration("").is_err());
    }

    #[test]
    fn rejected_disconnect_maps_to_rejected_code() {
        assert_eq!(disconnect_error(&DisconnectReason::Rejected).code, REJECTED);
        assert_eq!(
            disconnect_error(&DisconnectReason::TransportError("refused".into())).code,
            TRANSPORT_ERROR
        );
    }
}
