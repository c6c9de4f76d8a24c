//! Retry policy for idempotent network calls.
//!
//! Only GET-style requests go through this policy. Order placement is never
//! retried: a request that timed out may still have reached the venue, and a
//! blind resubmit would double the position.

use std::time::Duration;

use tokio::time::sleep;
use tracing::warn;

use crate::config::Config;

/// Fixed-backoff retry schedule for transient transport failures.
#[derive(Debug, Clone, Copy)]
pub struct RetryPolicy {
    /// Total attempts, including the first.
    pub max_attempts: u32,
    /// Pause between attempts.
    pub backoff: Duration,
}

impl RetryPolicy {
    /// Create a policy with the given attempt count and backoff.
    pub fn new(max_attempts: u32, backoff: Duration) -> Self {
        Self {
            max_attempts: max_attempts.max(1),
            backoff,
        }
    }

    /// Build the policy from configuration.
    pub fn from_config(config: &Config) -> Self {
        Self::new(
            config.retry_max_attempts,
            Duration::from_millis(config.retry_backoff_ms),
        )
    }

    /// Whether a transport error is worth another attempt.
    pub fn should_retry(err: &reqwest::Error) -> bool {
        err.is_timeout() || err.is_connect()
    }

    /// Whether `attempt` (1-based) has a follow-up attempt left.
    pub fn has_attempts_left(&self, attempt: u32) -> bool {
        attempt < self.max_attempts
    }

    /// Log the failure and sleep out the backoff before the next attempt.
    pub async fn pause(&self, attempt: u32, err: &reqwest::Error) {
        warn!(
            attempt,
            max_attempts = self.max_attempts,
            error = %err,
            "request failed, retrying"
        );
        if !self.backoff.is_zero() {
            sleep(self.backoff).await;
        }
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::new(3, Duration::from_millis(250))
    }
}
