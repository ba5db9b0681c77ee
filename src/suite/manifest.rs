// Test manifest (simple_tests.yaml)

use crate::suite::{Result, SuiteError};
use serde::Deserialize;
use std::collections::HashSet;
use std::path::Path;
use tracing::debug;

/// Top-level manifest document
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Manifest {
    pub tests: Vec<TestCase>,
}

/// One sample deployment to exercise
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields, rename_all = "kebab-case")]
pub struct TestCase {
    /// Deployment name, also the case name
    pub name: String,
    /// Config path relative to the samples root
    pub config: String,
    #[serde(default)]
    pub replacements: Vec<Replacement>,
    /// Inspect the deployment's instances after it is up
    #[serde(default)]
    pub http_server: bool,
    /// Value for `--properties`; `{zone}` and `{project}` are expanded
    #[serde(default)]
    pub properties: Option<String>,
    /// Submit the create with `--async` and poll the operation
    #[serde(default, rename = "async")]
    pub async_create: bool,
    /// Configs applied in order through update-and-check
    #[serde(default)]
    pub updates: Vec<String>,
}

/// Literal search/replace applied to a sample file before deploying
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Replacement {
    /// File relative to the samples root
    pub file: String,
    pub search: String,
    pub replace: String,
}

impl Manifest {
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path).map_err(|source| SuiteError::ManifestIo {
            path: path.to_path_buf(),
            source,
        })?;
        let manifest = Self::parse(&content)?;
        debug!(path = %path.display(), test_count = manifest.tests.len(), "loaded manifest");
        Ok(manifest)
    }

    pub fn parse(content: &str) -> Result<Self> {
        let manifest: Manifest = serde_yaml::from_str(content)?;
        manifest.validate()?;
        Ok(manifest)
    }

    fn validate(&self) -> Result<()> {
        let mut seen = HashSet::new();
        for case in &self.tests {
            if case.name.trim().is_empty() {
                return Err(SuiteError::InvalidManifest("test with empty name".into()));
            }
            if case.config.trim().is_empty() {
                return Err(SuiteError::InvalidManifest(format!(
                    "test '{}' has no config",
                    case.name
                )));
            }
            if !seen.insert(case.name.as_str()) {
                return Err(SuiteError::InvalidManifest(format!(
                    "duplicate test name '{}'",
                    case.name
                )));
            }
            if case.replacements.iter().any(|r| r.search.is_empty()) {
                return Err(SuiteError::InvalidManifest(format!(
                    "test '{}' has a replacement with an empty search string",
                    case.name
                )));
            }
        }
        Ok(())
    }
}
