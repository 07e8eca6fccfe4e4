use std::collections::HashMap;
use std::time::{Duration, Instant};

use wirechat_frame::Status;

/// Drops repeated status notifications.
///
/// A `(user, status)` observation is a duplicate when the last accepted one
/// for that user carried the same status less than `window` ago. Duplicates
/// do not refresh the timestamp.
#[derive(Debug, Clone)]
pub struct StatusDedup {
    window: Duration,
    seen: HashMap<String, (Status, Instant)>,
}

impl StatusDedup {
    pub fn new(window: Duration) -> Self {
        Self {
            window,
            seen: HashMap::new(),
        }
    }

    /// Record an observation. Returns `false` if it is a duplicate.
    pub fn observe(&mut self, username: &str, status: Status, now: Instant) -> bool {
        if let Some((last, at)) = self.seen.get(username) {
            if *last == status && now.saturating_duration_since(*at) < self.window {
                return false;
            }
        }
        self.seen.insert(username.to_string(), (status, now));
        true
    }

    pub fn len(&self) -> usize {
        self.seen.len()
    }

    pub fn is_empty(&self) -> bool {
        self.seen.is_empty()
    }

    pub fn clear(&mut self) {
        self.seen.clear();
    }
}
