use wirechat_session::{Event, MessageKind, SessionConfig};

use crate::cmd::{connect, disconnect_error, parse_duration, Connection, SendArgs};
use crate::exit::{session_error, CliResult, SUCCESS};
use crate::output::{print_event, OutputFormat};

pub async fn run(args: SendArgs, format: OutputFormat) -> CliResult<i32> {
    let timeout = parse_duration(&args.server.timeout)?;
    let Connection {
        client,
        mut events,
        ..
    } = connect(&args.server, SessionConfig::default()).await?;

    if let Err(err) = client.send_message(args.to.as_str(), args.body.as_str()).await {
        client.shutdown().await;
        return Err(session_error("send failed", err));
    }

    // The local echo confirms the frame was queued on the socket.
    let deadline = tokio::time::Instant::now() + timeout;
    while let Ok(Some(event)) = tokio::time::timeout_at(deadline, events.recv()).await {
        match event {
            _ if is_local_echo(&event) => {
                print_event(&event, format);
                break;
            }
            Event::Disconnected { reason } => {
                client.shutdown().await;
                return Err(disconnect_error(&reason));
            }
            other => tracing::debug!(?other, "ignoring event"),
        }
    }

    if let Err(err) = client.disconnect().await {
        tracing::debug!(error = %err, "disconnect after send");
    }
    client.shutdown().await;
    Ok(SUCCESS)
}

/// Broadcasts from other users can arrive before our own line comes back.
fn is_local_echo(event: &Event) -> bool {
    matches!(event, Event::ChatMessage(message) if message.kind == MessageKind::Sent)
}

#[cfg(test)]
mod tests {
    use wirechat_session::{Origin, RenderedMessage};

    use super::*;

    fn line(sender: &str, kind: MessageKind) -> Event {
        Event::ChatMessage(RenderedMessage {
            sender: sender.into(),
            body: "hi".into(),
            origin: Origin::Live,
            kind,
            label: sender.into(),
        })
    }

    #[test]
    fn only_own_line_counts_as_echo() {
        assert!(!is_local_echo(&line("bob", MessageKind::Received)));
        assert!(is_local_echo(&line("alice", MessageKind::Sent)));
        assert!(!is_local_echo(&Event::ClearDisplay));
    }
}
