// Shared test helpers: a scripted command runner and tracing setup

use crate::runner::{CommandOutput, CommandRunner, Result, RunnerError};
use async_trait::async_trait;
use std::collections::VecDeque;
use std::sync::Mutex;

pub fn init_tracing() {
    use std::sync::Once;
    static INIT: Once = Once::new();
    INIT.call_once(|| {
        tracing_subscriber::fmt()
            .with_max_level(tracing::Level::DEBUG)
            .with_target(true)
            .with_test_writer()
            .init();
    });
}

/// Canned reply for one command
pub enum Reply {
    Ok(String),
    Fail { code: i32, output: String },
}

pub fn ok(output: &str) -> Reply {
    Reply::Ok(output.to_string())
}

pub fn fail(output: &str) -> Reply {
    Reply::Fail {
        code: 1,
        output: output.to_string(),
    }
}

/// Precondition-failed output as gcloud prints it
pub fn conflict() -> Reply {
    fail("ERROR: (gcloud.deployment-manager.deployments.update) ResponseError: code=412, message=Precondition Failed")
}

/// Replays scripted replies in order and records every command it is given
#[derive(Default)]
pub struct ScriptedRunner {
    replies: Mutex<VecDeque<Reply>>,
    commands: Mutex<Vec<String>>,
}

impl ScriptedRunner {
    pub fn new(replies: impl IntoIterator<Item = Reply>) -> Self {
        Self {
            replies: Mutex::new(replies.into_iter().collect()),
            commands: Mutex::new(Vec::new()),
        }
    }

    pub fn commands(&self) -> Vec<String> {
        self.commands.lock().unwrap().clone()
    }

    pub fn remaining(&self) -> usize {
        self.replies.lock().unwrap().len()
    }
}

#[async_trait]
impl CommandRunner for ScriptedRunner {
    async fn run(&self, command: &str) -> Result<CommandOutput> {
        self.commands.lock().unwrap().push(command.to_string());

        let reply = self.replies.lock().unwrap().pop_front();
        match reply {
            Some(Reply::Ok(output)) => Ok(CommandOutput::success(output)),
            Some(Reply::Fail { code, output }) => Err(RunnerError::CommandFailed {
                command: command.to_string(),
                output,
                exit_code: Some(code),
            }),
            None => Err(RunnerError::CommandFailed {
                command: command.to_string(),
                output: "no scripted reply left".to_string(),
                exit_code: Some(127),
            }),
        }
    }
}
