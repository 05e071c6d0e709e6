//! Execution policy
//!
//! Scheduling and retry parameters, fixed when the engine is built.

use std::time::Duration;

/// Concurrency, timeout, and retry settings for one run
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ExecutionPolicy {
    /// Maximum test cases in flight at once
    pub max_concurrency: usize,
    /// Duration budget of a single attempt
    pub attempt_timeout: Duration,
    /// Total attempts per test case, never below one
    pub max_attempts: u32,
    /// Delay before the first retry, doubled for each later one
    pub backoff_base: Duration,
}

impl Default for ExecutionPolicy {
    fn default() -> Self {
        Self {
            max_concurrency: 4,
            attempt_timeout: Duration::from_secs(30),
            max_attempts: 3,
            backoff_base: Duration::from_millis(50),
        }
    }
}

impl ExecutionPolicy {
    pub fn with_max_concurrency(mut self, max_concurrency: usize) -> Self {
        self.max_concurrency = max_concurrency.max(1);
        self
    }

    pub fn with_attempt_timeout(mut self, timeout: Duration) -> Self {
        self.attempt_timeout = timeout;
        self
    }

    pub fn with_max_attempts(mut self, max_attempts: u32) -> Self {
        self.max_attempts = max_attempts.max(1);
        self
    }

    pub fn with_backoff_base(mut self, base: Duration) -> Self {
        self.backoff_base = base;
        self
    }

    /// Sleep before the retry that follows failed attempt `attempt_index` (zero-based)
    pub fn backoff_delay(&self, attempt_index: u32) -> Duration {
        let factor = 2u32.checked_pow(attempt_index).unwrap_or(u32::MAX);
        self.backoff_base.saturating_mul(factor)
    }
}
