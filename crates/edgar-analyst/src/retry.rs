//! Exponential backoff for SEC requests and cloud completions
//!
//! A failed attempt always waits its backoff before the next attempt or
//! before the failure is reported, so three attempts with a one second base
//! wait 1s, 2s and 4s.

use std::time::Duration;
use tokio::time::sleep;
use tracing::{debug, warn};

#[derive(Debug, Clone)]
pub struct RetryPolicy {
    /// Total attempts, including the first
    pub max_attempts: u32,
    /// Wait after the first failure
    pub initial_backoff: Duration,
    pub backoff_multiplier: f64,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            initial_backoff: Duration::from_secs(1),
            backoff_multiplier: 2.0,
        }
    }
}

impl RetryPolicy {
    /// `max_attempts` is clamped to at least one
    pub fn new(max_attempts: u32, initial_backoff: Duration, backoff_multiplier: f64) -> Self {
        Self {
            max_attempts: max_attempts.max(1),
            initial_backoff,
            backoff_multiplier,
        }
    }

    /// Backoff after the given failed attempt (1-based)
    pub fn backoff_duration(&self, attempt: u32) -> Duration {
        if attempt == 0 {
            return Duration::ZERO;
        }
        self.initial_backoff
            .mul_f64(self.backoff_multiplier.powi((attempt - 1) as i32))
    }

    /// Run `operation` until it succeeds, fails permanently or runs out of
    /// attempts
    ///
    /// Failures that `is_retryable` rejects are returned at once. Otherwise
    /// every failure sleeps its backoff, and the last one is returned when
    /// attempts are exhausted.
    pub async fn execute<F, Fut, T, E, R>(
        &self,
        label: &str,
        is_retryable: R,
        mut operation: F,
    ) -> Result<T, E>
    where
        F: FnMut() -> Fut,
        Fut: std::future::Future<Output = Result<T, E>>,
        R: Fn(&E) -> bool,
        E: std::fmt::Display,
    {
        let mut attempt = 1;
        loop {
            let err = match operation().await {
                Ok(value) => {
                    if attempt > 1 {
                        debug!(label, attempt, "Succeeded after retry");
                    }
                    return Ok(value);
                }
                Err(err) => err,
            };
            if !is_retryable(&err) {
                debug!(label, attempt, error = %err, "Permanent failure");
                return Err(err);
            }

            let backoff = self.backoff_duration(attempt);
            warn!(label, attempt, max = self.max_attempts, error = %err, ?backoff, "Attempt failed");
            sleep(backoff).await;
            if attempt >= self.max_attempts {
                return Err(err);
            }
            attempt += 1;
        }
    }
}
