use std::time::Duration;

use tokio::io::{AsyncBufReadExt, BufReader};
use wirechat_frame::Status;
use wirechat_session::{ChatClient, DisconnectReason, Event, SessionConfig, BROADCAST};

use crate::cmd::{connect, disconnect_error, parse_duration, ChatArgs, Connection};
use crate::exit::{CliError, CliResult, FAILURE, SUCCESS};
use crate::output::{print_event, OutputFormat};

const DRAIN_TIMEOUT: Duration = Duration::from_millis(200);

/// One line typed at the prompt.
#[derive(Debug, PartialEq, Eq)]
enum Input<'a> {
    Message(&'a str),
    Switch(&'a str),
    Status(Status),
    Users,
    Quit,
    Empty,
    Invalid(String),
}

fn parse_input(line: &str) -> Input<'_> {
    let line = line.trim();
    if line.is_empty() {
        return Input::Empty;
    }
    let Some(command) = line.strip_prefix('/') else {
        return Input::Message(line);
    };

    let (name, rest) = match command.split_once(char::is_whitespace) {
        Some((name, rest)) => (name, rest.trim()),
        None => (command, ""),
    };
    match (name, rest) {
        ("to", "") => Input::Invalid("usage: /to <user|~>".to_string()),
        ("to", target) => Input::Switch(target),
        ("all", _) => Input::Switch(BROADCAST),
        ("status", value) => match value.parse::<Status>() {
            Ok(status) => Input::Status(status),
            Err(err) => Input::Invalid(err),
        },
        ("users", _) => Input::Users,
        ("quit", _) => Input::Quit,
        (other, _) => Input::Invalid(format!(
            "unknown command /{other} (try /to, /all, /status, /users, /quit)"
        )),
    }
}

pub async fn run(args: ChatArgs, format: OutputFormat) -> CliResult<i32> {
    let idle_timeout = args.idle.as_deref().map(parse_duration).transpose()?;
    let config = SessionConfig {
        idle_timeout,
        ..SessionConfig::default()
    };
    let Connection {
        client,
        mut events,
        early,
    } = connect(&args.server, config).await?;
    for event in &early {
        print_event(event, format);
    }

    let mut target = BROADCAST.to_string();
    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    let ctrl_c = tokio::signal::ctrl_c();
    tokio::pin!(ctrl_c);

    let outcome = loop {
        tokio::select! {
            _ = &mut ctrl_c => {
                tracing::info!("interrupted");
                break Ok(SUCCESS);
            }
            event = events.recv() => match event {
                Some(event) => {
                    print_event(&event, format);
                    if let Event::Disconnected { reason } = event {
                        break match reason {
                            DisconnectReason::Local => Ok(SUCCESS),
                            other => Err(disconnect_error(&other)),
                        };
                    }
                }
                None => break Err(CliError::new(FAILURE, "client stopped unexpectedly")),
            },
            line = lines.next_line() => match line {
                Ok(Some(line)) => {
                    if !handle_line(&client, &mut target, &line).await {
                        break Ok(SUCCESS);
                    }
                }
                Ok(None) => break Ok(SUCCESS),
                Err(err) => break Err(CliError::new(FAILURE, format!("failed reading stdin: {err}"))),
            },
        }
    };

    if client.disconnect().await.is_ok() {
        while let Ok(Some(event)) = tokio::time::timeout(DRAIN_TIMEOUT, events.recv()).await {
            print_event(&event, format);
            if matches!(event, Event::Disconnected { .. }) {
                break;
            }
        }
    }
    client.shutdown().await;
    outcome
}

/// Act on one input line. Returns `false` when the user asked to quit.
async fn handle_line(client: &ChatClient, target: &mut String, line: &str) -> bool {
    let result = match parse_input(line) {
        Input::Empty => Ok(()),
        Input::Quit => return false,
        Input::Invalid(message) => {
            eprintln!("{message}");
            Ok(())
        }
        Input::Message(body) => client.send_message(target.as_str(), body).await,
        Input::Switch(chat) => {
            let result = client.request_history(chat).await;
            if result.is_ok() {
                *target = chat.to_string();
            }
            result
        }
        Input::Status(status) => client.change_status(status).await,
        Input::Users => client.refresh_users().await,
    };
    if let Err(err) = result {
        eprintln!("error: {err}");
    }
    true
}
