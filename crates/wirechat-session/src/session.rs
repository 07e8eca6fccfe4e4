use std::time::Instant;

use bytes::Bytes;
use wirechat_frame::{decode_frame, ErrorCode, Frame, FrameError, HistoryEntry, Status, UserEntry};
use wirechat_transport::{with_username, Connector, Generation, Transport, TransportEvent};

use crate::config::SessionConfig;
use crate::dedup::StatusDedup;
use crate::error::{Result, SessionError};
use crate::event::{ChatMessage, DisconnectReason, Event, EventSink, User};
use crate::router::{Routed, Router};
use crate::state::{ConnectionState, SessionState, BROADCAST};

/// Protocol session controller.
///
/// Owns at most one transport connection. API calls and transport events must
/// be fed in from a single consumer, in arrival order; the session keeps no
/// locks. Every connection is opened with the current generation, and the
/// generation is bumped whenever a connection ends, so events still in flight
/// from an old connection are discarded on arrival.
pub struct Session<C: Connector, S: EventSink> {
    connector: C,
    sink: S,
    config: SessionConfig,
    connection: ConnectionState,
    generation: Generation,
    handle: Option<C::Handle>,
    state: Option<SessionState>,
    last_transport_error: Option<String>,
}

impl<C: Connector, S: EventSink> Session<C, S> {
    pub fn new(connector: C, sink: S, config: SessionConfig) -> Self {
        Self {
            connector,
            sink,
            config,
            connection: ConnectionState::Disconnected,
            generation: 0,
            handle: None,
            state: None,
            last_transport_error: None,
        }
    }

    pub fn state(&self) -> ConnectionState {
        self.connection
    }

    pub fn is_connected(&self) -> bool {
        self.connection == ConnectionState::Connected
    }

    pub fn generation(&self) -> Generation {
        self.generation
    }

    /// Per-connection state; `None` while disconnected.
    pub fn session_state(&self) -> Option<&SessionState> {
        self.state.as_ref()
    }

    pub fn local_username(&self) -> Option<&str> {
        self.state.as_ref().map(SessionState::local_username)
    }

    pub fn active_target(&self) -> Option<&str> {
        self.state.as_ref().map(SessionState::active_target)
    }

    pub fn pending_history_target(&self) -> Option<&str> {
        self.state
            .as_ref()
            .and_then(SessionState::pending_history_target)
    }

    pub fn self_status(&self) -> Option<Status> {
        self.state.as_ref().and_then(SessionState::self_status)
    }

    pub fn config(&self) -> &SessionConfig {
        &self.config
    }

    pub fn connector(&self) -> &C {
        &self.connector
    }

    pub fn sink(&self) -> &S {
        &self.sink
    }

    pub fn sink_mut(&mut self) -> &mut S {
        &mut self.sink
    }

    /// Start connecting to `base_url` as `username`.
    ///
    /// `base_url` is a `ws://` or `wss://` URL; the username is added as the
    /// `name` query parameter. Returns once the transport is opening; the
    /// handshake requests go out when it reports `Opened`.
    pub fn connect(&mut self, base_url: &str, username: &str) -> Result<()> {
        if self.connection != ConnectionState::Disconnected {
            return Err(SessionError::AlreadyConnected);
        }
        validate_name("username", username)?;
        if username == BROADCAST {
            return Err(SessionError::InvalidArgument(
                "username `~` is reserved for the broadcast channel",
            ));
        }

        let url = with_username(base_url, username)?;
        let handle = self.connector.open(&url, self.generation)?;

        tracing::info!(%url, generation = self.generation, "connecting");
        self.handle = Some(handle);
        self.state = Some(SessionState::new(
            username.to_string(),
            StatusDedup::new(self.config.dedup_window),
        ));
        self.last_transport_error = None;
        self.connection = ConnectionState::Connecting;
        Ok(())
    }

    /// Send a chat message to `target` (a username or [`BROADCAST`]).
    ///
    /// The server does not echo our own messages, so the message is rendered
    /// locally as soon as it is queued.
    pub fn send_message(&mut self, target: &str, body: &str) -> Result<()> {
        if target.is_empty() {
            return Err(SessionError::InvalidArgument("target must not be empty"));
        }
        if body.is_empty() {
            return Err(SessionError::InvalidArgument("message must not be empty"));
        }
        let local = self.require_connected()?.local_username().to_string();

        self.send_frame(&Frame::SendMessage {
            recipient: target.to_string(),
            body: body.to_string(),
        })?;

        let echo = Router::new(&local, target).render(ChatMessage::live(local.clone(), body));
        self.sink.notify(Event::ChatMessage(echo));
        Ok(())
    }

    /// Ask the server to change our status.
    ///
    /// Nothing changes locally until the server reports the new status back.
    pub fn change_status(&mut self, status: Status) -> Result<()> {
        if !status.is_online() {
            return Err(SessionError::InvalidArgument(
                "status must be active, busy or inactive",
            ));
        }
        let username = self.require_connected()?.local_username().to_string();
        self.send_frame(&Frame::ChangeStatus {
            username,
            status: status.as_byte(),
        })
    }

    /// Switch the active conversation to `chat` and request its history.
    pub fn request_history(&mut self, chat: &str) -> Result<()> {
        validate_name("chat", chat)?;
        self.require_connected()?;

        let limit = self.config.max_pending_history;
        if let Some(state) = self.state.as_mut() {
            state.push_history_request(chat, limit);
            state.active_target = chat.to_string();
        }
        self.sink.notify(Event::ClearDisplay);
        self.send_frame(&Frame::RequestHistory {
            chat: chat.to_string(),
        })
    }

    /// Ask for a fresh user list.
    pub fn refresh_users(&mut self) -> Result<()> {
        self.require_connected()?;
        self.send_frame(&Frame::RequestUserList)
    }

    /// Switch to Inactive after a period without local activity.
    ///
    /// Returns `true` if a status change was sent. Nothing is sent when the
    /// server has not reported our status yet or already reports Inactive.
    /// The server does not acknowledge the request; the new status shows up
    /// only if it broadcasts a status change for us.
    pub fn mark_idle(&mut self) -> Result<bool> {
        let status = self.require_connected()?.self_status();
        match status {
            Some(status) if status != Status::Inactive => {
                tracing::info!(from = %status, "idle, switching to inactive");
                self.change_status(Status::Inactive)?;
                Ok(true)
            }
            _ => Ok(false),
        }
    }

    /// End the session.
    ///
    /// A `Disconnect` frame is sent best-effort, the transport is closed and
    /// the generation bumped. Does nothing when already disconnected.
    pub fn disconnect(&mut self) {
        if self.connection == ConnectionState::Disconnected {
            return;
        }
        self.close_transport();
        self.teardown(DisconnectReason::Local);
    }

    /// Feed one transport event, stamped with the current time.
    pub fn handle_event(&mut self, generation: Generation, event: TransportEvent) {
        self.handle_event_at(generation, event, Instant::now());
    }

    /// Feed one transport event observed at `now`.
    pub fn handle_event_at(&mut self, generation: Generation, event: TransportEvent, now: Instant) {
        if generation != self.generation || self.connection == ConnectionState::Disconnected {
            tracing::trace!(
                generation,
                current = self.generation,
                "discarding event from stale connection"
            );
            return;
        }

        match event {
            TransportEvent::Opened => self.on_opened(),
            TransportEvent::Message(payload) => self.on_message(&payload, now),
            TransportEvent::Error(message) => {
                tracing::warn!(generation, error = %message, "transport error");
                self.last_transport_error = Some(message);
            }
            TransportEvent::Closed => {
                let reason = match self.last_transport_error.take() {
                    Some(message) => DisconnectReason::TransportError(message),
                    None => DisconnectReason::Closed,
                };
                self.handle = None;
                self.teardown(reason);
            }
        }
    }

    fn on_opened(&mut self) {
        if self.connection != ConnectionState::Connecting {
            return;
        }
        let Some(username) = self.local_username().map(str::to_string) else {
            return;
        };
        self.connection = ConnectionState::Connected;
        tracing::info!(%username, generation = self.generation, "connected");
        self.sink.notify(Event::Connected {
            username: username.clone(),
        });

        self.send_best_effort(&Frame::RequestUserList);
        self.send_best_effort(&Frame::RequestUserInfo { username });
    }

    fn on_message(&mut self, payload: &Bytes, now: Instant) {
        if self.connection != ConnectionState::Connected {
            tracing::debug!(len = payload.len(), "message before open, dropped");
            return;
        }
        match decode_frame(payload) {
            Ok(frame) => {
                tracing::debug!(opcode = frame.name(), len = payload.len(), "frame received");
                self.dispatch(frame, now);
            }
            Err(FrameError::UnknownOpcode(op)) => {
                tracing::debug!(opcode = op, len = payload.len(), "ignoring unknown opcode");
            }
            Err(err) => {
                tracing::warn!(error = %err, len = payload.len(), "dropping undecodable frame");
            }
        }
    }

    fn dispatch(&mut self, frame: Frame, now: Instant) {
        match frame {
            Frame::UserList { users } => self.on_user_list(users),
            Frame::UserInfo { username, status } => self.on_user_info(&username, status),
            Frame::UserConnected { username } => {
                self.sink.notify(Event::SystemNotice {
                    text: format!("{username} connected"),
                });
                self.send_best_effort(&Frame::RequestUserList);
            }
            Frame::UserStatusChanged { username, status } => {
                self.on_status_changed(username, status, now)
            }
            Frame::Message { sender, body } => {
                self.route(ChatMessage::live(sender, body));
            }
            Frame::History { entries } => self.on_history(entries),
            Frame::UserDisconnected { username } => {
                self.sink.notify(Event::SystemNotice {
                    text: format!("{username} disconnected"),
                });
                self.send_best_effort(&Frame::RequestUserList);
            }
            Frame::Error { code } => self.on_server_error(ErrorCode::from_byte(code)),
            other => {
                tracing::debug!(opcode = other.name(), "ignoring client-bound opcode from server");
            }
        }
    }

    fn on_user_list(&mut self, users: Vec<UserEntry>) {
        let Some(local) = self.local_username() else {
            return;
        };
        let users: Vec<User> = users
            .into_iter()
            .filter(|entry| entry.username != local)
            .filter_map(|entry| {
                let status = Status::from_byte(entry.status).filter(|s| s.is_online())?;
                Some(User {
                    username: entry.username,
                    status,
                })
            })
            .collect();
        self.sink.notify(Event::UserListUpdated { users });
    }

    fn on_user_info(&mut self, username: &str, status: u8) {
        let Some(state) = self.state.as_mut() else {
            return;
        };
        if username != state.local_username() {
            tracing::trace!(%username, "ignoring info for another user");
            return;
        }
        let Some(status) = Status::from_byte(status) else {
            tracing::warn!(status, "ignoring unknown self status");
            return;
        };
        state.self_status = Some(status);
        self.sink.notify(Event::SelfStatusUpdated { status });
    }

    fn on_status_changed(&mut self, username: String, status: u8, now: Instant) {
        let Some(status) = Status::from_byte(status) else {
            tracing::warn!(%username, status, "ignoring unknown status value");
            return;
        };
        let Some(state) = self.state.as_mut() else {
            return;
        };
        if !state.dedup.observe(&username, status, now) {
            tracing::trace!(%username, %status, "duplicate status change dropped");
            return;
        }

        let text = match status {
            Status::Offline => format!("{username} disconnected"),
            online => format!("{username} is now {online}"),
        };
        let is_self = username == state.local_username();
        if is_self {
            state.self_status = Some(status);
        }

        self.sink.notify(Event::SystemNotice { text });
        if is_self {
            self.sink.notify(Event::SelfStatusUpdated { status });
        } else {
            self.sink
                .notify(Event::UserStatusUpdated { username, status });
        }
        self.send_best_effort(&Frame::RequestUserList);
    }

    fn on_history(&mut self, entries: Vec<HistoryEntry>) {
        let Some(state) = self.state.as_mut() else {
            return;
        };
        let requested = state.take_history_request();
        if requested.is_none() {
            tracing::warn!(entries = entries.len(), "history received without a request");
        }
        let current = requested.as_deref() == Some(state.active_target());
        if current {
            self.sink.notify(Event::ClearDisplay);
        } else {
            tracing::debug!(
                requested = requested.as_deref().unwrap_or("<none>"),
                "history for a conversation no longer on screen"
            );
        }

        let mut shown = 0;
        for entry in entries {
            if self.route(ChatMessage::history(
                entry.sender,
                entry.body,
                requested.clone(),
            )) {
                shown += 1;
            }
        }
        if let (true, Some(chat)) = (current, requested.clone()) {
            self.sink.notify(Event::HistoryLoaded { chat, shown });
        }

        if let Some(state) = self.state.as_mut() {
            if state.pending_history_target.is_some()
                && state.pending_history_target == requested
            {
                state.pending_history_target = None;
            }
        }
    }

    fn on_server_error(&mut self, code: ErrorCode) {
        if code.is_fatal() {
            tracing::warn!(%code, "connection rejected by server");
            self.sink.notify(Event::ConnectionRejected);
            self.close_transport();
            self.teardown(DisconnectReason::Rejected);
        } else {
            tracing::warn!(%code, "server error");
            if code == ErrorCode::RecipientOffline {
                let failed = self
                    .state
                    .as_mut()
                    .and_then(SessionState::fail_history_request);
                if let Some(failed) = failed {
                    tracing::debug!(target_chat = %failed, "history request refused");
                }
            }
            self.sink.notify(Event::ApplicationError { code });
        }
    }

    /// Route one message; returns `true` if it was rendered as a chat line.
    fn route(&mut self, message: ChatMessage) -> bool {
        let Some(state) = self.state.as_ref() else {
            return false;
        };
        let routed =
            Router::new(state.local_username(), state.active_target()).route(message);
        match routed {
            Routed::Shown(message) => {
                self.sink.notify(Event::ChatMessage(message));
                true
            }
            Routed::Notice(text) => {
                self.sink.notify(Event::SystemNotice { text });
                false
            }
            Routed::Hidden => {
                tracing::trace!("message not for the active conversation");
                false
            }
        }
    }

    fn require_connected(&self) -> Result<&SessionState> {
        match (&self.connection, &self.state) {
            (ConnectionState::Connected, Some(state)) => Ok(state),
            _ => Err(SessionError::NotConnected),
        }
    }

    fn send_frame(&mut self, frame: &Frame) -> Result<()> {
        let payload = frame.encode()?;
        let handle = self.handle.as_mut().ok_or(SessionError::NotConnected)?;
        tracing::debug!(opcode = frame.name(), len = payload.len(), "frame sent");
        handle.send(payload)?;
        Ok(())
    }

    fn send_best_effort(&mut self, frame: &Frame) {
        if let Err(err) = self.send_frame(frame) {
            tracing::warn!(opcode = frame.name(), error = %err, "send failed");
        }
    }

    fn close_transport(&mut self) {
        if self.connection == ConnectionState::Connected {
            self.send_best_effort(&Frame::Disconnect);
        }
        if let Some(mut handle) = self.handle.take() {
            if let Err(err) = handle.close() {
                tracing::debug!(error = %err, "transport already closed");
            }
        }
    }

    fn teardown(&mut self, reason: DisconnectReason) {
        tracing::info!(generation = self.generation, ?reason, "disconnected");
        self.handle = None;
        self.state = None;
        self.last_transport_error = None;
        self.generation += 1;
        self.connection = ConnectionState::Disconnected;
        self.sink.notify(Event::Disconnected { reason });
    }
}

fn validate_name(field: &'static str, value: &str) -> Result<()> {
    if value.is_empty() {
        return Err(SessionError::InvalidArgument(match field {
            "username" => "username must not be empty",
            _ => "chat name must not be empty",
        }));
    }
    if value.len() > wirechat_frame::MAX_FIELD_LEN {
        return Err(FrameError::FieldTooLong {
            field,
            len: value.len(),
        }
        .into());
    }
    Ok(())
}
