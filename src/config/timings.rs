// Retry and poll timings, optionally loaded from a TOML file

use crate::config::ConfigError;
use crate::control::{PollPolicy, RetryPolicy};
use serde::Deserialize;
use std::path::Path;
use tracing::debug;

/// Retry and poll cadence
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Timings {
    pub retry: RetryPolicy,
    pub poll: PollPolicy,
}

impl Timings {
    /// Load timings from a TOML file. A missing file means defaults.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        if !path.exists() {
            debug!(path = %path.display(), "settings file not found, using default timings");
            return Ok(Self::default());
        }

        let content = std::fs::read_to_string(path)?;
        let timings = Self::parse(&content)?;

        debug!(
            path = %path.display(),
            max_attempts = timings.retry.max_attempts,
            delay_secs = timings.retry.delay_secs,
            interval_secs = timings.poll.interval_secs,
            max_polls = timings.poll.max_polls,
            "loaded timings from settings file"
        );
        Ok(timings)
    }

    pub fn parse(content: &str) -> Result<Self, ConfigError> {
        Ok(toml::from_str(content)?)
    }
}
