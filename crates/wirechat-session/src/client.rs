use std::collections::VecDeque;
use std::time::Duration;

use tokio::sync::mpsc::error::TrySendError;
use tokio::sync::{mpsc, oneshot};
use tokio::task::JoinHandle;
use tokio::time::{sleep_until, Instant};
use tokio_util::sync::CancellationToken;
use wirechat_frame::Status;
use wirechat_transport::{Generation, TransportError, TransportEvent, WsConnector};

use crate::config::SessionConfig;
use crate::error::{Result, SessionError};
use crate::event::Event;
use crate::session::Session;

const COMMAND_BUFFER: usize = 32;

/// Handle to a session running on a tokio task.
///
/// Events arrive on the receiver returned by [`ChatClient::spawn`] in the
/// order the session produced them. Dropping the client cancels the task.
pub struct ChatClient {
    commands: mpsc::Sender<Command>,
    cancel: CancellationToken,
    task: Option<JoinHandle<()>>,
}

enum Command {
    Connect {
        base_url: String,
        username: String,
        reply: oneshot::Sender<Result<()>>,
    },
    SendMessage {
        target: String,
        body: String,
        reply: oneshot::Sender<Result<()>>,
    },
    ChangeStatus {
        status: Status,
        reply: oneshot::Sender<Result<()>>,
    },
    RequestHistory {
        chat: String,
        reply: oneshot::Sender<Result<()>>,
    },
    RefreshUsers {
        reply: oneshot::Sender<Result<()>>,
    },
    Disconnect {
        reply: oneshot::Sender<Result<()>>,
    },
}

impl Command {
    /// Whether the command counts as local activity for the idle watchdog.
    fn is_activity(&self) -> bool {
        !matches!(self, Command::RefreshUsers { .. } | Command::Disconnect { .. })
    }
}

impl ChatClient {
    /// Start a session task on the current runtime.
    pub fn spawn(config: SessionConfig) -> Result<(Self, mpsc::Receiver<Event>)> {
        let runtime = tokio::runtime::Handle::try_current()
            .map_err(|_| SessionError::Transport(TransportError::NoRuntime))?;

        let buffer = config.event_buffer.max(1);
        let (transport_tx, transport_rx) = mpsc::channel(buffer);
        let (events_tx, events_rx) = mpsc::channel(buffer);
        let (commands_tx, commands_rx) = mpsc::channel(COMMAND_BUFFER);
        let cancel = CancellationToken::new();

        let driver = Driver {
            idle_timeout: config.idle_timeout,
            session: Session::new(WsConnector::new(transport_tx), VecDeque::new(), config),
            commands: commands_rx,
            transport: transport_rx,
            events: events_tx,
            events_open: true,
            backlog_limit: buffer,
            cancel: cancel.clone(),
            last_activity: Instant::now(),
            idle_sent: false,
        };
        let task = runtime.spawn(driver.run());

        Ok((
            Self {
                commands: commands_tx,
                cancel,
                task: Some(task),
            },
            events_rx,
        ))
    }

    /// Connect to `base_url` as `username`.
    ///
    /// Resolves once the connection attempt has started; watch for
    /// [`Event::Connected`] or [`Event::Disconnected`] to learn the outcome.
    pub async fn connect(
        &self,
        base_url: impl Into<String>,
        username: impl Into<String>,
    ) -> Result<()> {
        let base_url = base_url.into();
        let username = username.into();
        self.request(|reply| Command::Connect {
            base_url,
            username,
            reply,
        })
        .await
    }

    pub async fn send_message(
        &self,
        target: impl Into<String>,
        body: impl Into<String>,
    ) -> Result<()> {
        let target = target.into();
        let body = body.into();
        self.request(|reply| Command::SendMessage {
            target,
            body,
            reply,
        })
        .await
    }

    pub async fn change_status(&self, status: Status) -> Result<()> {
        self.request(|reply| Command::ChangeStatus { status, reply })
            .await
    }

    pub async fn request_history(&self, chat: impl Into<String>) -> Result<()> {
        let chat = chat.into();
        self.request(|reply| Command::RequestHistory { chat, reply })
            .await
    }

    pub async fn refresh_users(&self) -> Result<()> {
        self.request(|reply| Command::RefreshUsers { reply }).await
    }

    pub async fn disconnect(&self) -> Result<()> {
        self.request(|reply| Command::Disconnect { reply }).await
    }

    /// Disconnect, stop the task, and wait for it to finish.
    pub async fn shutdown(mut self) {
        self.cancel.cancel();
        if let Some(task) = self.task.take() {
            if let Err(err) = task.await {
                tracing::warn!(error = %err, "session task ended abnormally");
            }
        }
    }

    async fn request(
        &self,
        build: impl FnOnce(oneshot::Sender<Result<()>>) -> Command,
    ) -> Result<()> {
        let (reply_tx, reply_rx) = oneshot::channel();
        self.commands
            .send(build(reply_tx))
            .await
            .map_err(|_| SessionError::ClientStopped)?;
        reply_rx.await.map_err(|_| SessionError::ClientStopped)?
    }
}

impl Drop for ChatClient {
    fn drop(&mut self) {
        self.cancel.cancel();
    }
}

struct Driver {
    session: Session<WsConnector, VecDeque<Event>>,
    commands: mpsc::Receiver<Command>,
    transport: mpsc::Receiver<(Generation, TransportEvent)>,
    events: mpsc::Sender<Event>,
    events_open: bool,
    /// Transport reads pause once this many events are queued undelivered.
    backlog_limit: usize,
    cancel: CancellationToken,
    idle_timeout: Option<Duration>,
    last_activity: Instant,
    idle_sent: bool,
}

impl Driver {
    /// Events are queued in the session sink and handed out as the channel
    /// has room. Commands keep being served while the consumer lags behind.
    async fn run(mut self) {
        tracing::debug!("session task started");
        loop {
            self.deliver_ready();
            let idle_deadline = self.idle_deadline();
            let pending = self.events_open && !self.session.sink().is_empty();
            let accepting = self.session.sink().len() < self.backlog_limit;
            let events = self.events.clone();
            tokio::select! {
                biased;
                _ = self.cancel.cancelled() => break,
                command = self.commands.recv() => match command {
                    Some(command) => self.apply(command),
                    None => break,
                },
                permit = events.reserve(), if pending => match permit {
                    Ok(permit) => {
                        if let Some(event) = self.session.sink_mut().pop_front() {
                            permit.send(event);
                        }
                    }
                    Err(_) => self.close_events(),
                },
                Some((generation, event)) = self.transport.recv(), if accepting => {
                    self.session.handle_event(generation, event);
                }
                _ = sleep_until(idle_deadline.unwrap_or_else(Instant::now)), if idle_deadline.is_some() => {
                    match self.session.mark_idle() {
                        // Status not reported yet; look again after another period.
                        Ok(false) if self.session.self_status().is_none() => {
                            self.last_activity = Instant::now();
                        }
                        Ok(_) => self.idle_sent = true,
                        Err(err) => {
                            tracing::debug!(error = %err, "idle status change skipped");
                            self.idle_sent = true;
                        }
                    }
                }
            }
        }

        self.session.disconnect();
        self.deliver_ready();
        tracing::debug!("session task stopped");
    }

    fn apply(&mut self, command: Command) {
        if command.is_activity() {
            self.last_activity = Instant::now();
            self.idle_sent = false;
        }
        match command {
            Command::Connect {
                base_url,
                username,
                reply,
            } => {
                let result = self.session.connect(&base_url, &username);
                let _ = reply.send(result);
            }
            Command::SendMessage {
                target,
                body,
                reply,
            } => {
                let result = self.session.send_message(&target, &body);
                let _ = reply.send(result);
            }
            Command::ChangeStatus { status, reply } => {
                let result = self.session.change_status(status);
                let _ = reply.send(result);
            }
            Command::RequestHistory { chat, reply } => {
                let result = self.session.request_history(&chat);
                let _ = reply.send(result);
            }
            Command::RefreshUsers { reply } => {
                let result = self.session.refresh_users();
                let _ = reply.send(result);
            }
            Command::Disconnect { reply } => {
                self.session.disconnect();
                let _ = reply.send(Ok(()));
            }
        }
    }

    /// When the idle watchdog fires next, if armed.
    fn idle_deadline(&self) -> Option<Instant> {
        let timeout = self.idle_timeout?;
        if self.idle_sent || !self.session.is_connected() {
            return None;
        }
        Some(self.last_activity + timeout)
    }

    /// Hand over queued events while the channel has room, without waiting.
    fn deliver_ready(&mut self) {
        while self.events_open && !self.session.sink().is_empty() {
            let events = self.events.clone();
            match events.try_reserve() {
                Ok(permit) => {
                    if let Some(event) = self.session.sink_mut().pop_front() {
                        permit.send(event);
                    }
                }
                Err(TrySendError::Full(())) => return,
                Err(TrySendError::Closed(())) => self.close_events(),
            };
        }
        if !self.events_open {
            self.session.sink_mut().clear();
        }
    }

    fn close_events(&mut self) {
        if self.events_open {
            tracing::debug!("event receiver dropped, discarding further events");
            self.events_open = false;
        }
        self.session.sink_mut().clear();
    }
}
