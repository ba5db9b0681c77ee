// Shell runner implementation

use crate::runner::{CommandOutput, CommandRunner, Result, RunnerError};
use async_trait::async_trait;
use std::time::Instant;
use tokio::process::Command;
use tracing::{debug, info};

/// Runs command lines through `<shell> -c`
#[derive(Debug, Clone)]
pub struct ShellRunner {
    shell: String,
}

impl ShellRunner {
    pub fn new(shell: impl Into<String>) -> Self {
        Self {
            shell: shell.into(),
        }
    }

    pub fn shell(&self) -> &str {
        &self.shell
    }
}

impl Default for ShellRunner {
    fn default() -> Self {
        Self::new("/bin/sh")
    }
}

#[async_trait]
impl CommandRunner for ShellRunner {
    async fn run(&self, command: &str) -> Result<CommandOutput> {
        let start = Instant::now();

        info!(command = %command, "running command");

        // Merge stderr into stdout inside the shell so ordering is preserved
        let script = format!("exec 2>&1\n{command}");

        let output = Command::new(&self.shell)
            .arg("-c")
            .arg(&script)
            .output()
            .await
            .map_err(|e| RunnerError::SpawnFailed {
                command: command.to_string(),
                reason: e.to_string(),
            })?;

        let mut combined = String::from_utf8_lossy(&output.stdout).into_owned();
        // Anything the shell itself wrote before the redirect took effect
        if !output.stderr.is_empty() {
            combined.push_str(&String::from_utf8_lossy(&output.stderr));
        }

        let duration_ms = start.elapsed().as_millis() as u64;
        let exit_code = output.status.code();

        debug!(
            command = %command.chars().take(100).collect::<String>(),
            duration_ms = duration_ms,
            exit_code = exit_code.unwrap_or(-1),
            output_bytes = combined.len(),
            "command finished"
        );

        if output.status.success() {
            Ok(CommandOutput {
                combined,
                exit_code: 0,
            })
        } else {
            Err(RunnerError::CommandFailed {
                command: command.to_string(),
                output: combined,
                exit_code,
            })
        }
    }
}
