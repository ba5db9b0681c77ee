// Deployment module - gcloud deployment-manager commands and their checks

pub mod client;
pub mod error;
pub mod guard;
pub mod types;

pub use client::DeploymentClient;
pub use error::{DeploymentError, Result};
pub use guard::with_deployment;
pub use types::{Instance, Operation, OperationStatus};
