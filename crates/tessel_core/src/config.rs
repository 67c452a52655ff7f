//! Database configuration.

use std::time::Duration;

/// Configuration for a [`crate::Database`].
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Config {
    /// Reject contradictory comparison combinations instead of resolving
    /// them by precedence.
    pub strict_conditions: bool,

    /// Upper bound on how long a query or chain may wait for its
    /// transaction to complete. `None` waits indefinitely.
    pub timeout: Option<Duration>,
}

impl Config {
    /// Creates a new configuration with default values.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets whether contradictory conditions are rejected.
    #[must_use]
    pub const fn strict_conditions(mut self, value: bool) -> Self {
        self.strict_conditions = value;
        self
    }

    /// Sets the completion timeout.
    #[must_use]
    pub const fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }
}
