// Deployment client - builds gcloud command lines and checks their responses

use crate::config::SuiteConfig;
use crate::control::{PollError, poll_until, retry_when};
use crate::deployment::error::{DeploymentError, Result};
use crate::deployment::types::{Instance, Operation, OperationHandle, Resource, is_truthy};
use crate::runner::CommandRunner;
use serde_json::Value;
use std::sync::Arc;
use tracing::{debug, info, warn};

const INSTANCE_TYPE: &str = "compute.v1.instance";
const PROJECT_TEMPLATE: &str = "project_creation/config-template.jinja";

/// Issues Deployment Manager commands for one suite configuration
#[derive(Clone)]
pub struct DeploymentClient {
    runner: Arc<dyn CommandRunner>,
    config: SuiteConfig,
}

impl DeploymentClient {
    pub fn new(runner: Arc<dyn CommandRunner>, config: SuiteConfig) -> Self {
        Self { runner, config }
    }

    pub fn config(&self) -> &SuiteConfig {
        &self.config
    }

    async fn call(&self, command: String) -> Result<String> {
        let output = self.runner.run(&command).await?;
        Ok(output.combined)
    }

    fn deployments(&self, verb: &str, name: &str) -> String {
        format!(
            "{} deployment-manager deployments {verb} {name}",
            self.config.gcloud
        )
    }

    fn config_arg(&self, config_path: &str) -> String {
        self.config.samples_root.join(config_path).display().to_string()
    }

    pub fn create_command(
        &self,
        name: &str,
        config_path: &str,
        properties: Option<&str>,
    ) -> String {
        let mut command = format!(
            "{} --config {} --project={}",
            self.deployments("create", name),
            self.config_arg(config_path),
            self.config.project()
        );
        if let Some(props) = properties {
            command.push_str(" --properties ");
            command.push_str(&double_quote(props));
        }
        command
    }

    /// Create a deployment and wait for gcloud to report completion
    pub async fn create(
        &self,
        name: &str,
        config_path: &str,
        properties: Option<&str>,
    ) -> Result<()> {
        info!(deployment = %name, config = %config_path, "creating deployment");
        self.call(self.create_command(name, config_path, properties)).await?;
        info!(deployment = %name, "deployment created");
        Ok(())
    }

    /// Submit a create with `--async`, then poll the returned operation
    pub async fn create_async(
        &self,
        name: &str,
        config_path: &str,
        properties: Option<&str>,
    ) -> Result<Value> {
        info!(deployment = %name, config = %config_path, "submitting asynchronous create");
        let command = format!(
            "{} --async --format=json",
            self.create_command(name, config_path, properties)
        );
        let submission = self.call(command).await?;
        let response = self.wait_for_operation(&submission).await?;
        info!(deployment = %name, "deployment created");
        Ok(response)
    }

    /// Poll the operation named in `submission` until it is DONE.
    ///
    /// Returns the final poll response. A terminal response carrying an
    /// error payload fails with `DeploymentError::Operation`.
    pub async fn wait_for_operation(&self, submission: &str) -> Result<Value> {
        let handle: OperationHandle = serde_json::from_str(submission)
            .map_err(|e| DeploymentError::decode("operation handle", e))?;
        let name = handle
            .into_operation()
            .map(|op| op.name)
            .filter(|name| !name.is_empty())
            .ok_or(DeploymentError::MissingOperationName)?;

        debug!(operation = %name, "polling operation");

        let describe = format!(
            "{} deployment-manager operations describe {name} --format=json --project={}",
            self.config.gcloud,
            self.config.project()
        );

        let polled = poll_until(
            self.config.timings.poll,
            || self.describe_operation(&describe),
            |(op, _): &(Operation, Value)| op.is_done(),
        )
        .await;

        let (operation, raw) = match polled {
            Ok(done) => done,
            Err(PollError::Query(e)) => return Err(e),
            Err(PollError::Timeout { polls }) => {
                return Err(DeploymentError::Timeout {
                    operation: name,
                    polls,
                });
            }
        };

        if let Some(payload) = operation.failure() {
            return Err(DeploymentError::Operation {
                subject: format!("operation '{name}'"),
                payload: payload.clone(),
                detail: serde_json::to_string_pretty(payload).unwrap_or_default(),
            });
        }

        info!(operation = %name, "operation done");
        Ok(raw)
    }

    async fn describe_operation(&self, command: &str) -> Result<(Operation, Value)> {
        let raw = self.call(command.to_string()).await?;
        let value: Value = serde_json::from_str(&raw)
            .map_err(|e| DeploymentError::decode("operation status", e))?;
        let operation: Operation = serde_json::from_value(value.clone())
            .map_err(|e| DeploymentError::decode("operation status", e))?;
        debug!(status = %operation.status, "operation status");
        Ok((operation, value))
    }

    pub async fn update(&self, name: &str, config_path: &str) -> Result<()> {
        let command = format!(
            "{} --config {} --project={}",
            self.deployments("update", name),
            self.config_arg(config_path),
            self.config.project()
        );
        self.call(command).await?;
        Ok(())
    }

    /// Update a deployment, then check it, retrying each step on 412 conflicts.
    ///
    /// The two steps have independent attempt counters.
    pub async fn update_and_check(&self, name: &str, config_path: &str) -> Result<()> {
        let policy = self.config.timings.retry;
        info!(deployment = %name, config = %config_path, "updating deployment");

        retry_when(policy, DeploymentError::is_conflict, || {
            self.update(name, config_path)
        })
        .await?;
        retry_when(policy, DeploymentError::is_conflict, || self.check(name)).await?;

        info!(deployment = %name, "deployment updated");
        Ok(())
    }

    /// Describe a deployment, returning the raw text and its decoded form
    pub async fn describe(&self, name: &str) -> Result<(String, Value)> {
        let command = format!(
            "{} --format=json --project={}",
            self.deployments("describe", name),
            self.config.project()
        );
        let raw = self.call(command).await?;
        let value = serde_json::from_str(&raw)
            .map_err(|e| DeploymentError::decode(format!("description of '{name}'"), e))?;
        Ok((raw, value))
    }

    /// Describe a deployment and fail if its last operation carries an error
    pub async fn check(&self, name: &str) -> Result<Value> {
        let (raw, value) = self.describe(name).await?;

        let operation = value
            .get("deployment")
            .and_then(|d| d.get("operation"))
            .ok_or_else(|| DeploymentError::MalformedResponse {
                context: format!("description of '{name}'"),
                detail: "missing deployment.operation".to_string(),
            })?;

        if let Some(error) = operation.get("error").filter(|e| is_truthy(e)) {
            warn!(deployment = %name, "deployment description carries an error");
            return Err(DeploymentError::Operation {
                subject: "the deployment's description".to_string(),
                payload: error.clone(),
                detail: format!("---BEGIN DESCRIPTION---\n{raw}---END DESCRIPTION---"),
            });
        }

        debug!(deployment = %name, "deployment description is clean");
        Ok(value)
    }

    pub async fn delete(&self, name: &str) -> Result<()> {
        info!(deployment = %name, "deleting deployment");
        let command = format!(
            "{} -q --project={}",
            self.deployments("delete", name),
            self.config.project()
        );
        self.call(command).await?;
        info!(deployment = %name, "deployment deleted");
        Ok(())
    }

    /// Compute instances belonging to a deployment, with their zones and internal IPs
    pub async fn list_instances(&self, name: &str) -> Result<Vec<Instance>> {
        let command = format!(
            "{} deployment-manager resources list --deployment {name} --format=json --project={}",
            self.config.gcloud,
            self.config.project()
        );
        let raw = self.call(command).await?;
        let resources: Vec<Resource> = serde_json::from_str(&raw)
            .map_err(|e| DeploymentError::decode(format!("resources of '{name}'"), e))?;

        let mut instances = Vec::new();
        for resource in resources.into_iter().filter(|r| r.kind == INSTANCE_TYPE) {
            let zone = instance_zone(&resource)?;
            let network_ip = self.instance_ip(&resource.name, &zone).await?;
            instances.push(Instance {
                name: resource.name,
                zone,
                network_ip,
            });
        }

        debug!(deployment = %name, instance_count = instances.len(), "listed instances");
        Ok(instances)
    }

    async fn instance_ip(&self, instance: &str, zone: &str) -> Result<Option<String>> {
        let command = format!(
            "{} compute instances describe {instance} --zone={zone} --format=json --project={}",
            self.config.gcloud,
            self.config.project()
        );
        let raw = self.call(command).await?;
        let value: Value = serde_json::from_str(&raw)
            .map_err(|e| DeploymentError::decode(format!("instance '{instance}'"), e))?;
        Ok(value
            .pointer("/networkInterfaces/0/networkIP")
            .and_then(Value::as_str)
            .map(str::to_string))
    }

    pub async fn reset_instance(&self, instance: &Instance) -> Result<()> {
        let command = format!(
            "{} compute instances reset {} --project={} --zone={}",
            self.config.gcloud,
            instance.name,
            self.config.project(),
            instance.zone
        );
        self.call(command).await?;
        Ok(())
    }

    /// Create the deployment that provisions the test project.
    ///
    /// A no-op unless project creation is configured.
    pub async fn create_project_deployment(&self) -> Result<()> {
        let Some(pc) = &self.config.project_creation else {
            return Ok(());
        };

        info!(
            deployment = %pc.deployment_name,
            project = %pc.project_to_create,
            "creating test project"
        );

        let properties = format!(
            "PROJECT_NAME:'{}',ORGANIZATION_ID:'{}',BILLING_ACCOUNT:'{}',SERVICE_ACCOUNT_TO_CREATE:'{}',SERVICE_ACCOUNT_OWNER_A:'{}',SERVICE_ACCOUNT_OWNER_B:'{}'",
            pc.project_to_create,
            pc.organization_id,
            pc.billing_account,
            pc.service_account_to_create,
            pc.service_account_owner_a,
            pc.service_account_owner_b
        );
        let command = format!(
            "{} --config {} --project={} --properties {}",
            self.deployments("create", &pc.deployment_name),
            self.config_arg(PROJECT_TEMPLATE),
            self.config.host_project,
            double_quote(&properties)
        );
        self.call(command).await?;
        Ok(())
    }

    /// Delete the project creation deployment. A no-op unless configured.
    pub async fn delete_project_deployment(&self) -> Result<()> {
        let Some(pc) = &self.config.project_creation else {
            return Ok(());
        };

        info!(deployment = %pc.deployment_name, "deleting test project");
        let command = format!(
            "{} -q --project={}",
            self.deployments("delete", &pc.deployment_name),
            self.config.host_project
        );
        self.call(command).await?;
        Ok(())
    }
}

fn instance_zone(resource: &Resource) -> Result<String> {
    let missing_zone = || DeploymentError::MalformedResponse {
        context: format!("resource '{}'", resource.name),
        detail: "properties have no zone".to_string(),
    };

    let Some(raw) = resource.properties.as_deref() else {
        return Err(missing_zone());
    };
    let properties: serde_yaml::Value =
        serde_yaml::from_str(raw).map_err(|source| DeploymentError::Properties {
            resource: resource.name.clone(),
            source,
        })?;

    properties
        .get("zone")
        .and_then(serde_yaml::Value::as_str)
        .map(str::to_string)
        .ok_or_else(missing_zone)
}

/// Wrap a value in double quotes for `sh -c`, escaping what the shell would expand
fn double_quote(s: &str) -> String {
    let mut quoted = String::with_capacity(s.len() + 2);
    quoted.push('"');
    for c in s.chars() {
        if matches!(c, '"' | '\\' | '$' | '`') {
            quoted.push('\\');
        }
        quoted.push(c);
    }
    quoted.push('"');
    quoted
}
