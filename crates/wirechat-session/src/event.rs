use std::collections::VecDeque;

use serde::Serialize;
use wirechat_frame::{ErrorCode, Status};

/// Whether a chat message was pushed live or replayed from history.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Origin {
    Live,
    History,
}

/// How a rendered message should be presented.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum MessageKind {
    /// Written by the local user.
    Sent,
    /// Pushed live by someone else.
    Received,
    /// Replayed from a history response.
    History,
}

/// A chat message before routing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChatMessage {
    pub sender: String,
    pub body: String,
    pub origin: Origin,
    /// For history entries: the conversation the history was requested for.
    pub requested_target: Option<String>,
}

impl ChatMessage {
    pub fn live(sender: impl Into<String>, body: impl Into<String>) -> Self {
        Self {
            sender: sender.into(),
            body: body.into(),
            origin: Origin::Live,
            requested_target: None,
        }
    }

    pub fn history(
        sender: impl Into<String>,
        body: impl Into<String>,
        requested_target: Option<String>,
    ) -> Self {
        Self {
            sender: sender.into(),
            body: body.into(),
            origin: Origin::History,
            requested_target,
        }
    }
}

/// A chat message that belongs on screen.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RenderedMessage {
    pub sender: String,
    pub body: String,
    pub origin: Origin,
    pub kind: MessageKind,
    /// `"You"` for the local user, otherwise the sender's name.
    pub label: String,
}

/// A user in a presence list.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct User {
    pub username: String,
    pub status: Status,
}

/// Why a session ended.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "reason", content = "detail", rename_all = "snake_case")]
pub enum DisconnectReason {
    /// `disconnect()` was called.
    Local,
    /// The server refused the username.
    Rejected,
    /// The transport closed.
    Closed,
    /// The transport failed.
    TransportError(String),
}

/// Notifications for the application, in the order they happened.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum Event {
    Connected { username: String },
    Disconnected { reason: DisconnectReason },
    UserListUpdated { users: Vec<User> },
    SelfStatusUpdated { status: Status },
    UserStatusUpdated { username: String, status: Status },
    SystemNotice { text: String },
    ChatMessage(RenderedMessage),
    /// The message area should be emptied.
    ClearDisplay,
    /// History for the active conversation has been delivered; `shown`
    /// messages from it were rendered.
    HistoryLoaded { chat: String, shown: usize },
    /// The username is taken; the session has been torn down.
    ConnectionRejected,
    /// A recoverable server error.
    ApplicationError { code: ErrorCode },
}

/// Receives session events.
pub trait EventSink {
    fn notify(&mut self, event: Event);
}

impl EventSink for Vec<Event> {
    fn notify(&mut self, event: Event) {
        self.push(event);
    }
}

impl EventSink for VecDeque<Event> {
    fn notify(&mut self, event: Event) {
        self.push_back(event);
    }
}
