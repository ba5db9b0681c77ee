// Bounded retry with a fixed delay

use serde::Deserialize;
use std::fmt::Display;
use std::future::Future;
use std::time::Duration;
use tracing::{debug, error, warn};

/// Retry policy: how many attempts, and how long to wait after a transient failure
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct RetryPolicy {
    /// Maximum number of attempts (the first call counts)
    pub max_attempts: u32,
    /// Fixed delay after each transient failure, in seconds
    pub delay_secs: u64,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            delay_secs: 600,
        }
    }
}

impl RetryPolicy {
    pub fn delay(&self) -> Duration {
        Duration::from_secs(self.delay_secs)
    }
}

/// Run `operation` until it succeeds, fails with a non-transient error, or
/// `policy.max_attempts` transient failures have been seen.
///
/// Every transient failure is followed by a sleep of `policy.delay()`, the
/// last one included. Non-transient failures return immediately without
/// sleeping. The attempt counter is local to this call.
pub async fn retry_when<T, E, F, Fut, P>(
    policy: RetryPolicy,
    is_transient: P,
    mut operation: F,
) -> Result<T, E>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, E>>,
    P: Fn(&E) -> bool,
    E: Display,
{
    let max_attempts = policy.max_attempts.max(1);
    let mut attempts = 0u32;

    loop {
        debug!(attempt = attempts + 1, max_attempts = max_attempts, "attempting");

        let err = match operation().await {
            Ok(value) => {
                if attempts > 0 {
                    debug!(retries = attempts, "succeeded after retrying");
                }
                return Ok(value);
            }
            Err(e) => e,
        };

        if !is_transient(&err) {
            return Err(err);
        }

        warn!(
            attempt = attempts + 1,
            max_attempts = max_attempts,
            delay_secs = policy.delay_secs,
            error = %err,
            "transient failure, waiting before next attempt"
        );
        tokio::time::sleep(policy.delay()).await;
        attempts += 1;

        if attempts >= max_attempts {
            error!(attempts = attempts, error = %err, "retries exhausted");
            return Err(err);
        }
    }
}
