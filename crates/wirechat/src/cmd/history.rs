use wirechat_session::{Event, Origin, SessionConfig};

use crate::cmd::{connect, disconnect_error, parse_duration, Connection, HistoryArgs};
use crate::exit::{session_error, CliError, CliResult, FAILURE, SUCCESS, TIMEOUT};
use crate::output::{print_history, OutputFormat};

pub async fn run(args: HistoryArgs, format: OutputFormat) -> CliResult<i32> {
    let timeout = parse_duration(&args.server.timeout)?;
    let Connection {
        client,
        mut events,
        ..
    } = connect(&args.server, SessionConfig::default()).await?;

    if let Err(err) = client.request_history(args.chat.as_str()).await {
        client.shutdown().await;
        return Err(session_error("history request failed", err));
    }

    let mut messages = Vec::new();
    let deadline = tokio::time::Instant::now() + timeout;
    let outcome = loop {
        match tokio::time::timeout_at(deadline, events.recv()).await {
            Ok(Some(Event::ChatMessage(message))) if message.origin == Origin::History => {
                messages.push(message);
            }
            Ok(Some(Event::HistoryLoaded { chat, shown })) if chat == args.chat => {
                tracing::debug!(%chat, shown, "history loaded");
                break Ok(());
            }
            Ok(Some(Event::ApplicationError { code })) => {
                break Err(CliError::new(
                    FAILURE,
                    format!("server error: {}", code.description()),
                ));
            }
            Ok(Some(Event::Disconnected { reason })) => break Err(disconnect_error(&reason)),
            Ok(Some(_)) => {}
            Ok(None) | Err(_) => {
                break Err(CliError::new(
                    TIMEOUT,
                    format!("no history for {} received", args.chat),
                ));
            }
        }
    };

    if let Err(err) = client.disconnect().await {
        tracing::debug!(error = %err, "disconnect after history");
    }
    client.shutdown().await;

    outcome?;
    print_history(&args.chat, &messages, format);
    Ok(SUCCESS)
}
