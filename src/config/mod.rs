// Config module - validated settings shared by every deployment call

pub mod error;
pub mod timings;

pub use error::ConfigError;
pub use timings::Timings;

use std::path::PathBuf;

/// Settings for running the suite inside a freshly created project.
///
/// Every field is required once project creation is requested.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProjectCreation {
    /// Name of the deployment that creates the project
    pub deployment_name: String,
    pub project_to_create: String,
    pub organization_id: String,
    pub billing_account: String,
    pub service_account_to_create: String,
    pub service_account_owner_a: String,
    pub service_account_owner_b: String,
}

/// Raw, possibly incomplete project creation settings as supplied on the
/// command line or in the environment
#[derive(Debug, Clone, Default)]
pub struct ProjectCreationInput {
    pub deployment_name: Option<String>,
    pub project_to_create: Option<String>,
    pub organization_id: Option<String>,
    pub billing_account: Option<String>,
    pub service_account_to_create: Option<String>,
    pub service_account_owner_a: Option<String>,
    pub service_account_owner_b: Option<String>,
}

fn required(value: Option<String>, field: &'static str) -> Result<String, ConfigError> {
    match value {
        Some(v) if !v.trim().is_empty() => Ok(v),
        _ => Err(ConfigError::Missing(field)),
    }
}

impl ProjectCreationInput {
    pub fn validate(self) -> Result<ProjectCreation, ConfigError> {
        Ok(ProjectCreation {
            deployment_name: required(self.deployment_name, "project deployment name")?,
            project_to_create: required(self.project_to_create, "project to create")?,
            organization_id: required(self.organization_id, "organization id")?,
            billing_account: required(self.billing_account, "billing account")?,
            service_account_to_create: required(
                self.service_account_to_create,
                "service account to create",
            )?,
            service_account_owner_a: required(
                self.service_account_owner_a,
                "service account owner A",
            )?,
            service_account_owner_b: required(
                self.service_account_owner_b,
                "service account owner B",
            )?,
        })
    }
}

/// Suite configuration, built once at startup and passed explicitly
#[derive(Debug, Clone)]
pub struct SuiteConfig {
    /// Project that hosts the test deployments (or the project creation deployment)
    pub host_project: String,
    /// Zone substituted into samples that ask for one
    pub default_zone: String,
    /// Local port reserved for SSH tunnels to sample instances
    pub ssh_tunnel_port: u16,
    /// Present when tests run inside a newly created project
    pub project_creation: Option<ProjectCreation>,
    /// gcloud executable
    pub gcloud: String,
    /// Directory the manifest's config paths are relative to
    pub samples_root: PathBuf,
    /// Retry and poll cadence
    pub timings: Timings,
}

impl SuiteConfig {
    pub const DEFAULT_ZONE: &'static str = "us-west1-b";
    pub const DEFAULT_SSH_TUNNEL_PORT: u16 = 8890;

    /// Minimal configuration for a host project with all defaults
    #[allow(dead_code)]
    pub fn new(host_project: impl Into<String>) -> Self {
        Self {
            host_project: host_project.into(),
            default_zone: Self::DEFAULT_ZONE.to_string(),
            ssh_tunnel_port: Self::DEFAULT_SSH_TUNNEL_PORT,
            project_creation: None,
            gcloud: "gcloud".to_string(),
            samples_root: PathBuf::from("examples/v2"),
            timings: Timings::default(),
        }
    }

    /// Check the invariants the rest of the crate relies on
    pub fn validate(self) -> Result<Self, ConfigError> {
        if self.host_project.trim().is_empty() {
            return Err(ConfigError::Missing("host project"));
        }
        if self.default_zone.trim().is_empty() {
            return Err(ConfigError::Invalid("default zone is empty".into()));
        }
        if self.gcloud.trim().is_empty() {
            return Err(ConfigError::Invalid("gcloud executable is empty".into()));
        }
        if self.timings.retry.max_attempts == 0 {
            return Err(ConfigError::Invalid(
                "retry.max_attempts must be at least 1".into(),
            ));
        }
        if self.timings.poll.max_polls == 0 {
            return Err(ConfigError::Invalid(
                "poll.max_polls must be at least 1".into(),
            ));
        }
        Ok(self)
    }

    /// Project that deployment commands run against
    pub fn project(&self) -> &str {
        match &self.project_creation {
            Some(pc) => &pc.project_to_create,
            None => &self.host_project,
        }
    }
}
