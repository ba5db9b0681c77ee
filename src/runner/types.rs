// Data types for Runner module
#![allow(dead_code)]

use crate::runner::Result;
use async_trait::async_trait;

/// Output from a successful command execution
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommandOutput {
    /// Combined stdout and stderr, in the order the process wrote them
    pub combined: String,
    /// Exit code (always 0 for values handed back by a runner)
    pub exit_code: i32,
}

impl CommandOutput {
    pub fn success(combined: impl Into<String>) -> Self {
        Self {
            combined: combined.into(),
            exit_code: 0,
        }
    }
}

/// Something that can run a command line and capture its output.
///
/// Implementations never retry; retry policy belongs to the caller.
#[async_trait]
pub trait CommandRunner: Send + Sync {
    /// Run `command` and return its combined output on zero exit, or
    /// `RunnerError::CommandFailed` otherwise.
    async fn run(&self, command: &str) -> Result<CommandOutput>;
}
