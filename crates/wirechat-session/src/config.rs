use std::time::Duration;

/// Default window within which a repeated status notification is dropped.
pub const DEFAULT_DEDUP_WINDOW: Duration = Duration::from_millis(1000);

/// Configuration for a [`crate::Session`] and its async driver.
#[derive(Debug, Clone)]
pub struct SessionConfig {
    /// Identical `UserStatusChanged` frames for the same user inside this
    /// window are dropped. Default: 1 s.
    pub dedup_window: Duration,
    /// History requests remembered while awaiting their response. The oldest
    /// is forgotten once the limit is hit. Default: 32.
    pub max_pending_history: usize,
    /// Capacity of the async client's event channel. Default: 256.
    pub event_buffer: usize,
    /// Switch to Inactive after this long without local activity.
    /// Default: disabled.
    pub idle_timeout: Option<Duration>,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            dedup_window: DEFAULT_DEDUP_WINDOW,
            max_pending_history: 32,
            event_buffer: 256,
            idle_timeout: None,
        }
    }
}
