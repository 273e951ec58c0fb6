//! Configuration for the data manager.

use std::time::Duration;

/// Default interval between autosave passes.
pub const DEFAULT_AUTOSAVE_INTERVAL: Duration = Duration::from_secs(120);

/// Default grace period before the shutdown drain starts checking the
/// pending set, so a final save triggered by the same shutdown event has
/// time to register.
pub const DEFAULT_DRAIN_GRACE: Duration = Duration::from_secs(5);

/// Default interval between drain re-checks of the pending set.
pub const DEFAULT_DRAIN_POLL_INTERVAL: Duration = Duration::from_secs(1);

/// Default cap on the total drain wait, grace period included.
pub const DEFAULT_DRAIN_MAX_WAIT: Duration = Duration::from_secs(30);

/// Default interval between load-waiter re-checks of the session registry.
pub const DEFAULT_WAITER_POLL_INTERVAL: Duration = Duration::from_secs(1);

/// Default number of store write attempts per save.
pub const DEFAULT_MAX_SAVE_ATTEMPTS: u32 = 3;

/// Default initial backoff between save attempts. Doubles each retry.
pub const DEFAULT_SAVE_RETRY_BACKOFF: Duration = Duration::from_millis(500);

/// Configuration for the data manager.
#[derive(Debug, Clone)]
pub struct ManagerConfig {
    /// Interval between autosave passes over active sessions.
    pub autosave_interval: Duration,

    /// Grace period before the shutdown drain starts checking the
    /// pending set.
    pub drain_grace: Duration,

    /// How often the drain re-checks the pending set while waiting.
    pub drain_poll_interval: Duration,

    /// Cap on the total drain wait, grace period included. Exceeding it
    /// fails the drain instead of hanging shutdown.
    pub drain_max_wait: Duration,

    /// How often a load waiter re-checks the session registry.
    pub waiter_poll_interval: Duration,

    /// Store write attempts per save before the error is surfaced.
    /// Values below 1 are treated as 1.
    pub max_save_attempts: u32,

    /// Initial backoff between save attempts. Doubles each retry.
    pub save_retry_backoff: Duration,
}

impl Default for ManagerConfig {
    fn default() -> Self {
        Self {
            autosave_interval: DEFAULT_AUTOSAVE_INTERVAL,
            drain_grace: DEFAULT_DRAIN_GRACE,
            drain_poll_interval: DEFAULT_DRAIN_POLL_INTERVAL,
            drain_max_wait: DEFAULT_DRAIN_MAX_WAIT,
            waiter_poll_interval: DEFAULT_WAITER_POLL_INTERVAL,
            max_save_attempts: DEFAULT_MAX_SAVE_ATTEMPTS,
            save_retry_backoff: DEFAULT_SAVE_RETRY_BACKOFF,
        }
    }
}

impl ManagerConfig {
    /// Create a new configuration with default values.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the autosave interval.
    pub fn with_autosave_interval(mut self, interval: Duration) -> Self {
        self.autosave_interval = interval;
        self
    }

    /// Set the drain grace period.
    pub fn with_drain_grace(mut self, grace: Duration) -> Self {
        self.drain_grace = grace;
        self
    }

    /// Set the drain poll interval.
    pub fn with_drain_poll_interval(mut self, interval: Duration) -> Self {
        self.drain_poll_interval = interval;
        self
    }

    /// Set the cap on the total drain wait.
    pub fn with_drain_max_wait(mut self, max_wait: Duration) -> Self {
        self.drain_max_wait = max_wait;
        self
    }

    /// Set the load-waiter poll interval.
    pub fn with_waiter_poll_interval(mut self, interval: Duration) -> Self {
        self.waiter_poll_interval = interval;
        self
    }

    /// Set the number of store write attempts per save.
    pub fn with_max_save_attempts(mut self, attempts: u32) -> Self {
        self.max_save_attempts = attempts;
        self
    }

    /// Set the initial backoff between save attempts.
    pub fn with_save_retry_backoff(mut self, backoff: Duration) -> Self {
        self.save_retry_backoff = backoff;
        self
    }
}
