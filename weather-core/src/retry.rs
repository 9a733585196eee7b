use std::time::Duration;

/// Fixed-delay retry budget for upstream calls.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Extra attempts after the first one.
    pub max_retries: u32,
    pub delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self { max_retries: 3, delay: Duration::from_millis(1000) }
    }
}

impl RetryPolicy {
    pub const fn max_attempts(&self) -> u32 {
        self.max_retries.saturating_add(1)
    }

    /// Whether another attempt is allowed after `attempts_made` have failed.
    pub const fn should_retry(&self, attempts_made: u32) -> bool {
        attempts_made < self.max_attempts()
    }

    /// Upper bound on the time a caller can spend in one fetch.
    pub fn worst_case(&self, per_attempt_timeout: Duration) -> Duration {
        per_attempt_timeout * self.max_attempts() + self.delay * self.max_retries
    }
}
