// Running a single test case

use crate::deployment::{DeploymentClient, DeploymentError, Instance, with_deployment};
use crate::suite::placeholder;
use crate::suite::{Result, TestCase};
use tracing::info;

/// Deploy one sample, verify it, and always delete it afterwards
pub async fn run_case(client: &DeploymentClient, case: &TestCase) -> Result<()> {
    let config = client.config();

    for replacement in &case.replacements {
        placeholder::apply(&config.samples_root, replacement, config)?;
    }

    let properties = case
        .properties
        .as_deref()
        .map(|p| placeholder::expand(p, config));
    let properties = properties.as_deref();

    with_deployment(client, &case.name, || async move {
        if case.async_create {
            client
                .create_async(&case.name, &case.config, properties)
                .await?;
        } else {
            client
                .create(&case.name, &case.config, properties)
                .await?;
        }
        client.check(&case.name).await?;

        if case.http_server {
            log_instances(&case.name, &client.list_instances(&case.name).await?);
        }

        for update in &case.updates {
            client.update_and_check(&case.name, update).await?;

            if case.http_server {
                // Updated startup scripts only take effect after a reset
                for instance in client.list_instances(&case.name).await? {
                    client.reset_instance(&instance).await?;
                }
            }
        }

        Ok::<(), DeploymentError>(())
    })
    .await?;

    Ok(())
}

fn log_instances(deployment: &str, instances: &[Instance]) {
    for instance in instances {
        info!(
            deployment = %deployment,
            instance = %instance.name,
            zone = %instance.zone,
            network_ip = instance.network_ip.as_deref().unwrap_or("unknown"),
            "instance is up"
        );
    }
}
