// Error types for Suite module

use crate::deployment::DeploymentError;
use std::path::PathBuf;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum SuiteError {
    #[error("Failed to read manifest {path}: {source}")]
    ManifestIo {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to parse manifest: {0}")]
    ManifestParse(#[from] serde_yaml::Error),

    #[error("Invalid manifest: {0}")]
    InvalidManifest(String),

    #[error("Unknown test case: {0}")]
    UnknownCase(String),

    #[error("Failed to substitute placeholder in {file}: {source}")]
    Placeholder {
        file: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error(transparent)]
    Deployment(#[from] DeploymentError),
}

pub type Result<T> = std::result::Result<T, SuiteError>;
