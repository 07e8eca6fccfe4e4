use std::collections::VecDeque;

use serde::Serialize;
use wirechat_frame::Status;

use crate::dedup::StatusDedup;

/// Chat target naming the shared broadcast channel.
pub const BROADCAST: &str = "~";

/// Connection lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ConnectionState {
    Disconnected,
    Connecting,
    Connected,
}

/// Per-connection state. Created by `connect`, dropped on disconnect.
#[derive(Debug)]
pub struct SessionState {
    local_username: String,
    /// Conversation on screen; [`BROADCAST`] by default, never empty.
    pub(crate) active_target: String,
    /// Latest history request not yet answered.
    pub(crate) pending_history_target: Option<String>,
    /// Targets of every history request still awaiting a response, oldest
    /// first. Each request is assumed to get exactly one `History` or one
    /// `RecipientOffline` error back; responses are attributed in order.
    pub(crate) history_requests: VecDeque<String>,
    pub(crate) dedup: StatusDedup,
    /// Last self-status the server reported.
    pub(crate) self_status: Option<Status>,
}

impl SessionState {
    pub(crate) fn new(local_username: String, dedup: StatusDedup) -> Self {
        Self {
            local_username,
            active_target: BROADCAST.to_string(),
            pending_history_target: None,
            history_requests: VecDeque::new(),
            dedup,
            self_status: None,
        }
    }

    pub fn local_username(&self) -> &str {
        &self.local_username
    }

    pub fn active_target(&self) -> &str {
        &self.active_target
    }

    pub fn pending_history_target(&self) -> Option<&str> {
        self.pending_history_target.as_deref()
    }

    pub fn self_status(&self) -> Option<Status> {
        self.self_status
    }

    /// Remember an outgoing history request, keeping at most `limit`.
    pub(crate) fn push_history_request(&mut self, target: &str, limit: usize) {
        while self.history_requests.len() >= limit.max(1) {
            if let Some(dropped) = self.history_requests.pop_front() {
                tracing::debug!(target_chat = %dropped, "forgetting unanswered history request");
            }
        }
        self.history_requests.push_back(target.to_string());
        self.pending_history_target = Some(target.to_string());
    }

    /// Take the request the next `History` frame answers.
    pub(crate) fn take_history_request(&mut self) -> Option<String> {
        self.history_requests.pop_front()
    }

    /// Drop the oldest request after the server refused it.
    pub(crate) fn fail_history_request(&mut self) -> Option<String> {
        let failed = self.history_requests.pop_front()?;
        if self.history_requests.is_empty()
            && self.pending_history_target.as_deref() == Some(failed.as_str())
        {
            self.pending_history_target = None;
        }
        Some(failed)
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use super::*;

    fn state() -> SessionState {
        SessionState::new("alice".into(), StatusDedup::new(Duration::from_secs(1)))
    }

    #[test]
    fn starts_on_broadcast() {
        let state = state();
        assert_eq!(state.active_target(), BROADCAST);
        assert_eq!(state.pending_history_target(), None);
        assert_eq!(state.local_username(), "alice");
    }

    #[test]
    fn history_requests_are_fifo_and_bounded() {
        let mut state = state();
        state.push_history_request("bob", 2);
        state.push_history_request("carol", 2);
        state.push_history_request("~", 2);

        assert_eq!(state.pending_history_target(), Some("~"));
        assert_eq!(state.take_history_request().as_deref(), Some("carol"));
        assert_eq!(state.take_history_request().as_deref(), Some("~"));
        assert_eq!(state.take_history_request(), None);
    }

    #[test]
    fn refused_request_clears_pending_only_when_last() {
        let mut state = state();
        state.push_history_request("bob", 4);
        state.push_history_request("carol", 4);

        assert_eq!(state.fail_history_request().as_deref(), Some("bob"));
        assert_eq!(state.pending_history_target(), Some("carol"));
        assert_eq!(state.fail_history_request().as_deref(), Some("carol"));
        assert_eq!(state.pending_history_target(), None);
        assert_eq!(state.fail_history_request(), None);
    }
}
