// Error types for Deployment module

use crate::runner::RunnerError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum DeploymentError {
    /// Transport failure: the command could not run or exited non-zero
    #[error(transparent)]
    Command(#[from] RunnerError),

    #[error("Failed to decode {context}: {source}")]
    Decode {
        context: String,
        #[source]
        source: serde_json::Error,
    },

    #[error("Failed to parse properties of resource '{resource}': {source}")]
    Properties {
        resource: String,
        #[source]
        source: serde_yaml::Error,
    },

    #[error("Unexpected response for {context}: {detail}")]
    MalformedResponse { context: String, detail: String },

    /// Semantic failure: the command succeeded but the response carries an error
    #[error("An ERROR was found in {subject}.\n{detail}")]
    Operation {
        subject: String,
        payload: serde_json::Value,
        detail: String,
    },

    #[error("Operation handle has no name")]
    MissingOperationName,

    #[error("Operation '{operation}' was not DONE after {polls} polls")]
    Timeout { operation: String, polls: u32 },
}

impl DeploymentError {
    /// Precondition-failed signal from Deployment Manager: the deployment
    /// changed underneath us. Only the captured output of a failed command
    /// is inspected, never the command line itself.
    pub fn is_conflict(&self) -> bool {
        match self {
            DeploymentError::Command(RunnerError::CommandFailed { output, .. }) => {
                output.contains("412")
            }
            _ => false,
        }
    }

    pub(crate) fn decode(context: impl Into<String>, source: serde_json::Error) -> Self {
        DeploymentError::Decode {
            context: context.into(),
            source,
        }
    }
}

pub type Result<T> = std::result::Result<T, DeploymentError>;
