// Suite module - manifest-driven sample deployment tests

pub mod case;
pub mod error;
pub mod manifest;
pub mod placeholder;

pub use case::run_case;
pub use error::{Result, SuiteError};
pub use manifest::{Manifest, Replacement, TestCase};

use crate::deployment::DeploymentClient;
use std::time::{Duration, Instant};
use tracing::{error, info, warn};

/// Result of one test case
#[derive(Debug)]
pub struct CaseOutcome {
    pub name: String,
    pub error: Option<SuiteError>,
    pub duration: Duration,
}

impl CaseOutcome {
    pub fn passed(&self) -> bool {
        self.error.is_none()
    }
}

/// Results of a whole suite run
#[derive(Debug, Default)]
pub struct SuiteReport {
    pub outcomes: Vec<CaseOutcome>,
}

impl SuiteReport {
    pub fn failed(&self) -> usize {
        self.outcomes.iter().filter(|o| !o.passed()).count()
    }

    pub fn all_passed(&self) -> bool {
        self.failed() == 0
    }

    /// Log one line per case and a total
    pub fn log_summary(&self) {
        for outcome in &self.outcomes {
            match &outcome.error {
                None => info!(
                    case = %outcome.name,
                    duration_secs = outcome.duration.as_secs(),
                    "PASS"
                ),
                Some(e) => error!(
                    case = %outcome.name,
                    duration_secs = outcome.duration.as_secs(),
                    error = %e,
                    "FAIL"
                ),
            }
        }
        info!(
            total = self.outcomes.len(),
            failed = self.failed(),
            "suite finished"
        );
    }
}

/// Runs the selected cases of a manifest, one at a time
pub struct Suite {
    client: DeploymentClient,
    manifest: Manifest,
}

impl Suite {
    pub fn new(client: DeploymentClient, manifest: Manifest) -> Self {
        Self { client, manifest }
    }

    /// Cases to run: all of them when `only` is empty, otherwise the named ones
    /// in manifest order
    pub fn select(&self, only: &[String]) -> Result<Vec<&TestCase>> {
        if let Some(unknown) = only
            .iter()
            .find(|name| !self.manifest.tests.iter().any(|t| &t.name == *name))
        {
            return Err(SuiteError::UnknownCase(unknown.clone()));
        }

        Ok(self
            .manifest
            .tests
            .iter()
            .filter(|t| only.is_empty() || only.contains(&t.name))
            .collect())
    }

    /// Provision the test project if configured, run the cases, then tear the
    /// project down again.
    ///
    /// Case failures are recorded in the report; only setup and selection
    /// failures are returned as errors.
    pub async fn run(&self, only: &[String]) -> Result<SuiteReport> {
        let cases = self.select(only)?;

        self.client.create_project_deployment().await?;

        let mut report = SuiteReport::default();
        for case in cases {
            info!(case = %case.name, "starting test case");
            let start = Instant::now();
            let error = run_case(&self.client, case).await.err();
            report.outcomes.push(CaseOutcome {
                name: case.name.clone(),
                error,
                duration: start.elapsed(),
            });
        }

        if let Err(e) = self.client.delete_project_deployment().await {
            warn!(error = %e, "failed to delete test project deployment");
        }

        Ok(report)
    }
}
