use std::io::IsTerminal;

use clap::ValueEnum;
use comfy_table::{presets::UTF8_FULL, ContentArrangement, Table};
use serde::Serialize;
use wirechat_frame::Frame;
use wirechat_session::{DisconnectReason, Event, Origin, RenderedMessage, User};

#[derive(Clone, Debug, Copy, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    Json,
    Table,
    Pretty,
}

impl OutputFormat {
    pub fn default_for_stdout() -> Self {
        if std::io::stdout().is_terminal() {
            Self::Table
        } else {
            Self::Json
        }
    }
}

fn print_json<T: Serialize>(value: &T) {
    println!(
        "{}",
        serde_json::to_string(value).unwrap_or_else(|_| "{}".to_string())
    );
}

/// Print one session event as it arrives during `chat`.
pub fn print_event(event: &Event, format: OutputFormat) {
    match format {
        OutputFormat::Json => print_json(event),
        OutputFormat::Table | OutputFormat::Pretty => {
            if let Some(line) = event_line(event) {
                println!("{line}");
            }
        }
    }
}

/// Human-readable line for an event; `None` for events with nothing to show.
pub fn event_line(event: &Event) -> Option<String> {
    let line = match event {
        Event::Connected { username } => format!("* connected as {username}"),
        Event::Disconnected { reason } => match reason {
            DisconnectReason::Local => "* disconnected".to_string(),
            DisconnectReason::Rejected => "* disconnected: rejected by server".to_string(),
            DisconnectReason::Closed => "* disconnected: connection closed".to_string(),
            DisconnectReason::TransportError(message) => format!("* disconnected: {message}"),
        },
        Event::UserListUpdated { users } if users.is_empty() => "* nobody else online".to_string(),
        Event::UserListUpdated { users } => {
            let users: Vec<String> = users
                .iter()
                .map(|user| format!("{} ({})", user.username, user.status))
                .collect();
            format!("* online: {}", users.join(", "))
        }
        Event::SelfStatusUpdated { status } => format!("* your status: {status}"),
        // The matching notice has already been printed.
        Event::UserStatusUpdated { .. } => return None,
        Event::SystemNotice { text } => format!("* {text}"),
        Event::ChatMessage(message) => message_line(message),
        Event::ClearDisplay => "----".to_string(),
        Event::HistoryLoaded { chat, shown } => format!("* {shown} earlier messages in {chat}"),
        Event::ConnectionRejected => "! username already taken".to_string(),
        Event::ApplicationError { code } => format!("! server error: {}", code.description()),
    };
    Some(line)
}

fn message_line(message: &RenderedMessage) -> String {
    match message.origin {
        Origin::History => format!("  {}: {}", message.label, message.body),
        Origin::Live => format!("{}: {}", message.label, message.body),
    }
}

#[derive(Serialize)]
struct UsersOutput<'a> {
    count: usize,
    users: &'a [User],
}

pub fn print_users(users: &[User], format: OutputFormat) {
    match format {
        OutputFormat::Json => print_json(&UsersOutput {
            count: users.len(),
            users,
        }),
        OutputFormat::Table => {
            let mut table = Table::new();
            table
                .load_preset(UTF8_FULL)
                .set_content_arrangement(ContentArrangement::Dynamic)
                .set_header(vec!["USER", "STATUS"]);
            for user in users {
                table.add_row(vec![user.username.clone(), user.status.to_string()]);
            }
            println!("{table}");
        }
        OutputFormat::Pretty => {
            for user in users {
                println!("{} {}", user.username, user.status);
            }
        }
    }
}

#[derive(Serialize)]
struct HistoryOutput<'a> {
    chat: &'a str,
    count: usize,
    messages: &'a [RenderedMessage],
}

pub fn print_history(chat: &str, messages: &[RenderedMessage], format: OutputFormat) {
    match format {
        OutputFormat::Json => print_json(&HistoryOutput {
            chat,
            count: messages.len(),
            messages,
        }),
        OutputFormat::Table => {
            let mut table = Table::new();
            table
                .load_preset(UTF8_FULL)
                .set_content_arrangement(ContentArrangement::Dynamic)
                .set_header(vec!["FROM", "MESSAGE"]);
            for message in messages {
                table.add_row(vec![message.label.clone(), message.body.clone()]);
            }
            println!("{table}");
        }
        OutputFormat::Pretty => {
            for message in messages {
                println!("{}: {}", message.label, message.body);
            }
        }
    }
}

#[derive(Serialize)]
struct DecodedOutput<'a> {
    opcode: u8,
    name: &'a str,
    size: usize,
    frame: &'a Frame,
}

pub fn print_frame(frame: &Frame, size: usize, format: OutputFormat) {
    let out = DecodedOutput {
        opcode: frame.opcode(),
        name: frame.name(),
        size,
        frame,
    };
    match format {
        OutputFormat::Json => print_json(&out),
        OutputFormat::Pretty => println!(
            "{}",
            serde_json::to_string_pretty(&out).unwrap_or_else(|_| "{}".to_string())
        ),
        OutputFormat::Table => {
            let mut table = Table::new();
            table
                .load_preset(UTF8_FULL)
                .set_content_arrangement(ContentArrangement::Dynamic)
                .set_header(vec!["FIELD", "VALUE"])
                .add_row(vec!["opcode".to_string(), format!("{} (0x{:02x})", out.opcode, out.opcode)])
                .add_row(vec!["name".to_string(), out.name.to_string()])
                .add_row(vec!["size".to_string(), size.to_string()]);
            if let Ok(serde_json::Value::Object(fields)) = serde_json::to_value(frame) {
                for (field, value) in fields.iter().filter(|(field, _)| *field != "type") {
                    let value = match value {
                        serde_json::Value::String(text) => text.clone(),
                        other => other.to_string(),
                    };
                    table.add_row(vec![field.clone(), value]);
                }
            }
            println!("{table}");
        }
    }
}
