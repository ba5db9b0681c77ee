// Bounded polling until a terminal state

use serde::Deserialize;
use std::future::Future;
use std::time::Duration;
use thiserror::Error;
use tracing::{debug, warn};

/// Polling cadence and ceiling
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct PollPolicy {
    /// Delay between queries, in seconds
    pub interval_secs: u64,
    /// Maximum number of queries before giving up
    pub max_polls: u32,
}

impl Default for PollPolicy {
    fn default() -> Self {
        Self {
            interval_secs: 1,
            max_polls: 90,
        }
    }
}

impl PollPolicy {
    pub fn interval(&self) -> Duration {
        Duration::from_secs(self.interval_secs)
    }
}

#[derive(Debug, Error)]
pub enum PollError<E> {
    #[error(transparent)]
    Query(E),

    #[error("No terminal state after {polls} polls")]
    Timeout { polls: u32 },
}

/// Query repeatedly until `is_terminal` accepts a response.
///
/// Returns the terminal response. Query errors stop polling at once. After
/// `policy.max_polls` non-terminal responses the result is `PollError::Timeout`.
pub async fn poll_until<T, E, F, Fut, P>(
    policy: PollPolicy,
    mut query: F,
    is_terminal: P,
) -> Result<T, PollError<E>>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, E>>,
    P: Fn(&T) -> bool,
{
    let max_polls = policy.max_polls.max(1);

    for poll in 1..=max_polls {
        let response = query().await.map_err(PollError::Query)?;

        if is_terminal(&response) {
            debug!(polls = poll, "reached terminal state");
            return Ok(response);
        }

        if poll < max_polls {
            tokio::time::sleep(policy.interval()).await;
        }
    }

    warn!(polls = max_polls, "poll ceiling reached without terminal state");
    Err(PollError::Timeout { polls: max_polls })
}
