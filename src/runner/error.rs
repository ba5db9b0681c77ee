// Error types for Runner module
#![allow(dead_code)]

use thiserror::Error;

/// Runner error types
#[derive(Debug, Error)]
pub enum RunnerError {
    #[error("Failed to spawn '{command}': {reason}")]
    SpawnFailed { command: String, reason: String },

    /// Non-zero exit. `output` is the combined stdout+stderr, untouched.
    #[error("Command '{command}' exited with {}:\n{output}", describe_exit(.exit_code))]
    CommandFailed {
        command: String,
        output: String,
        exit_code: Option<i32>,
    },
}

fn describe_exit(code: &Option<i32>) -> String {
    match code {
        Some(code) => format!("exit code {code}"),
        None => "no exit code (terminated by signal)".to_string(),
    }
}

impl RunnerError {
    /// Captured output, when the process got far enough to produce any
    pub fn output(&self) -> Option<&str> {
        match self {
            RunnerError::CommandFailed { output, .. } => Some(output),
            RunnerError::SpawnFailed { .. } => None,
        }
    }
}

pub type Result<T> = std::result::Result<T, RunnerError>;
