mod config;
mod control;
mod deployment;
mod runner;
mod suite;

use clap::Parser;
use clap::builder::BoolishValueParser;
use config::{ConfigError, ProjectCreationInput, SuiteConfig, Timings};
use deployment::DeploymentClient;
use runner::ShellRunner;
use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;
use suite::{Manifest, Suite};
use tracing::{error, info};
use tracing_subscriber::fmt;

/// CLI arguments
#[derive(Debug, Parser)]
#[command(name = "dmcheck")]
#[command(about = "Deploys Deployment Manager samples and checks they come up clean")]
struct Args {
    /// Project that hosts the test deployments
    #[arg(long, env = "DM_TEST_HOST_PROJECT")]
    host_project: String,

    /// Zone substituted into samples that need one
    #[arg(long, env = "DM_TEST_DEFAULT_ZONE", default_value = SuiteConfig::DEFAULT_ZONE)]
    default_zone: String,

    /// Local port reserved for SSH tunnels to sample instances
    #[arg(long, default_value_t = SuiteConfig::DEFAULT_SSH_TUNNEL_PORT)]
    ssh_tunnel_port: u16,

    /// Test manifest
    #[arg(long, default_value = "simple_tests.yaml")]
    manifest: PathBuf,

    /// Directory the manifest's config paths are relative to
    #[arg(long, default_value = "examples/v2")]
    samples_root: PathBuf,

    /// gcloud executable
    #[arg(long, default_value = "gcloud")]
    gcloud: String,

    /// Shell used to run commands
    #[arg(long, default_value = "/bin/sh")]
    shell: String,

    /// Retry and poll timings (TOML); defaults apply when the file is absent
    #[arg(long, default_value = "dmcheck.toml")]
    settings: PathBuf,

    /// Run only the named test cases (repeatable)
    #[arg(long)]
    only: Vec<String>,

    /// Log level
    #[arg(long, env = "DM_TEST_LOG", default_value = "info")]
    log_level: tracing::Level,

    /// Run the tests inside a newly created project
    #[arg(long, env = "DM_TEST_CREATE_NEW_PROJECT", value_parser = BoolishValueParser::new())]
    create_new_project: bool,

    #[arg(long, env = "DM_TEST_PROJECT_TO_CREATE")]
    project_to_create: Option<String>,

    #[arg(long, env = "DM_TEST_ORGANIZATION_ID")]
    organization_id: Option<String>,

    #[arg(long, env = "DM_TEST_BILLING_ACCOUNT")]
    billing_account: Option<String>,

    #[arg(long, env = "DM_TEST_SERVICE_ACCOUNT_TO_CREATE")]
    service_account_to_create: Option<String>,

    #[arg(long, env = "DM_TEST_SERVICE_ACCOUNT_OWNER_A")]
    service_account_owner_a: Option<String>,

    #[arg(long, env = "DM_TEST_SERVICE_ACCOUNT_OWNER_B")]
    service_account_owner_b: Option<String>,

    /// Name of the deployment that creates the project
    #[arg(long, env = "DM_TEST_DEPLOYMENT_NAME")]
    project_deployment_name: Option<String>,
}

impl Args {
    fn into_config(self) -> Result<SuiteConfig, ConfigError> {
        let project_creation = if self.create_new_project {
            let input = ProjectCreationInput {
                deployment_name: self.project_deployment_name,
                project_to_create: self.project_to_create,
                organization_id: self.organization_id,
                billing_account: self.billing_account,
                service_account_to_create: self.service_account_to_create,
                service_account_owner_a: self.service_account_owner_a,
                service_account_owner_b: self.service_account_owner_b,
            };
            Some(input.validate()?)
        } else {
            None
        };

        SuiteConfig {
            host_project: self.host_project,
            default_zone: self.default_zone,
            ssh_tunnel_port: self.ssh_tunnel_port,
            project_creation,
            gcloud: self.gcloud,
            samples_root: self.samples_root,
            timings: Timings::load(&self.settings)?,
        }
        .validate()
    }
}

#[tokio::main]
async fn main() -> ExitCode {
    dotenvy::dotenv().ok();
    let args = Args::parse();

    // Logs go to stderr; stdout stays clean
    fmt()
        .with_max_level(args.log_level)
        .with_target(true)
        .with_writer(std::io::stderr)
        .init();

    let manifest_path = args.manifest.clone();
    let shell = args.shell.clone();
    let only = args.only.clone();

    let config = match args.into_config() {
        Ok(config) => config,
        Err(e) => {
            error!(error = %e, "invalid configuration");
            return ExitCode::from(2);
        }
    };

    info!(
        project = %config.project(),
        host_project = %config.host_project,
        zone = %config.default_zone,
        ssh_tunnel_port = config.ssh_tunnel_port,
        create_new_project = config.project_creation.is_some(),
        max_attempts = config.timings.retry.max_attempts,
        retry_delay_secs = config.timings.retry.delay_secs,
        "configuration loaded"
    );

    let manifest = match Manifest::load(&manifest_path) {
        Ok(manifest) => manifest,
        Err(e) => {
            error!(error = %e, "failed to load manifest");
            return ExitCode::from(2);
        }
    };

    let client = DeploymentClient::new(Arc::new(ShellRunner::new(shell)), config);
    let suite = Suite::new(client, manifest);

    match suite.run(&only).await {
        Ok(report) => {
            report.log_summary();
            if report.all_passed() {
                ExitCode::SUCCESS
            } else {
                ExitCode::FAILURE
            }
        }
        Err(e) => {
            error!(error = %e, "suite aborted");
            ExitCode::FAILURE
        }
    }
}
