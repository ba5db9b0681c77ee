// Integration tests for deployment commands, retries, polling and cleanup
// This file should be run with cargo test --test test_deployment

#![allow(dead_code)]

#[path = "../src/config/mod.rs"]
mod config;

#[path = "../src/control/mod.rs"]
mod control;

#[path = "../src/deployment/mod.rs"]
mod deployment;

#[path = "../src/runner/mod.rs"]
mod runner;

mod common;

use common::{Reply, ScriptedRunner, conflict, fail, init_tracing, ok};
use config::{ProjectCreationInput, SuiteConfig};
use deployment::{DeploymentClient, DeploymentError, with_deployment};
use serde_json::json;
use std::sync::Arc;
use std::time::Duration;
use tokio::time::Instant;

const CLEAN: &str = r#"{"deployment": {"name": "sample-1", "operation": {"status": "DONE"}}}"#;

fn setup(replies: impl IntoIterator<Item = Reply>) -> (Arc<ScriptedRunner>, DeploymentClient) {
    init_tracing();
    let runner = Arc::new(ScriptedRunner::new(replies));
    let client = DeploymentClient::new(runner.clone(), SuiteConfig::new("test-proj"));
    (runner, client)
}

fn assert_slept(start: Instant, secs: u64) {
    let elapsed = start.elapsed();
    assert!(
        elapsed >= Duration::from_secs(secs)
            && elapsed < Duration::from_secs(secs) + Duration::from_millis(500),
        "expected about {secs}s of sleeping, got {elapsed:?}"
    );
}

#[cfg(test)]
mod command_tests {
    use super::*;

    /// create -> describe -> delete: three commands, no retries, no sleeps
    #[tokio::test(start_paused = true)]
    async fn test_deploy_end_to_end() {
        let (runner, client) = setup([
            ok("Create operation completed successfully.\n"),
            ok(r#"{"deployment": {"operation": {}}}"#),
            ok("Delete operation completed successfully.\n"),
        ]);
        let start = Instant::now();

        with_deployment(&client, "sample-1", || async {
            client.create("sample-1", "sample/vm.yaml", None).await?;
            client.check("sample-1").await
        })
        .await
        .unwrap();

        assert_eq!(
            runner.commands(),
            vec![
                "gcloud deployment-manager deployments create sample-1 --config examples/v2/sample/vm.yaml --project=test-proj",
                "gcloud deployment-manager deployments describe sample-1 --format=json --project=test-proj",
                "gcloud deployment-manager deployments delete sample-1 -q --project=test-proj",
            ]
        );
        assert_slept(start, 0);
    }

    /// An error payload in the description fails the check even though describe exited 0
    #[tokio::test]
    async fn test_check_detects_error_payload() {
        let description = r#"{"deployment": {"operation": {"error": {"errors": [{"code": "RESOURCE_ERROR"}]}}}}"#;
        let (_, client) = setup([ok(description)]);

        match client.check("sample-1").await {
            Err(DeploymentError::Operation {
                payload, detail, ..
            }) => {
                assert_eq!(payload, json!({"errors": [{"code": "RESOURCE_ERROR"}]}));
                assert!(detail.starts_with("---BEGIN DESCRIPTION---\n"));
                assert!(detail.contains(description));
                assert!(detail.ends_with("---END DESCRIPTION---"));
            }
            other => panic!("expected operation error, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_check_clean_description() {
        let (_, client) = setup([ok(CLEAN)]);
        let value = client.check("sample-1").await.unwrap();
        assert_eq!(value["deployment"]["name"], "sample-1");
    }

    #[tokio::test]
    async fn test_check_without_operation_is_malformed() {
        let (_, client) = setup([ok(r#"{"deployment": {}}"#)]);
        assert!(matches!(
            client.check("sample-1").await,
            Err(DeploymentError::MalformedResponse { .. })
        ));
    }

    #[tokio::test]
    async fn test_check_non_json_is_decode_error() {
        let (_, client) = setup([ok("WARNING: something odd\n")]);
        assert!(matches!(
            client.check("sample-1").await,
            Err(DeploymentError::Decode { .. })
        ));
    }

    /// Properties are quoted for the shell
    #[tokio::test]
    async fn test_create_with_properties() {
        let (runner, client) = setup([ok("")]);

        client
            .create(
                "image-based-igm-python",
                "image_based_igm/image_based_igm.py",
                Some("targetSize:3,zone:us-west1-b,maxReplicas:5"),
            )
            .await
            .unwrap();

        assert_eq!(
            runner.commands(),
            vec![
                "gcloud deployment-manager deployments create image-based-igm-python --config examples/v2/image_based_igm/image_based_igm.py --project=test-proj --properties \"targetSize:3,zone:us-west1-b,maxReplicas:5\""
            ]
        );
    }

    /// Transport failures surface with the captured output
    #[tokio::test]
    async fn test_create_failure_propagates() {
        let (_, client) = setup([fail("ERROR: quota exceeded")]);

        let err = client.create("sample-1", "sample/vm.yaml", None).await.unwrap_err();
        assert!(matches!(err, DeploymentError::Command(_)));
        assert!(err.to_string().contains("ERROR: quota exceeded"));
        assert!(!err.is_conflict());
    }

    #[tokio::test]
    async fn test_list_instances() {
        let resources = json!([
            {"name": "vm-1", "type": "compute.v1.instance", "properties": "zone: us-central1-f\nmachineType: f1-micro\n"},
            {"name": "fw-1", "type": "compute.v1.firewall", "properties": "network: default\n"}
        ]);
        let instance = json!({"name": "vm-1", "networkInterfaces": [{"networkIP": "10.128.0.2"}]});
        let (runner, client) = setup([ok(&resources.to_string()), ok(&instance.to_string())]);

        let instances = client.list_instances("step-by-step-8-9-python").await.unwrap();

        assert_eq!(instances.len(), 1);
        assert_eq!(instances[0].name, "vm-1");
        assert_eq!(instances[0].zone, "us-central1-f");
        assert_eq!(instances[0].network_ip.as_deref(), Some("10.128.0.2"));

        let commands = runner.commands();
        assert_eq!(
            commands[0],
            "gcloud deployment-manager resources list --deployment step-by-step-8-9-python --format=json --project=test-proj"
        );
        assert_eq!(
            commands[1],
            "gcloud compute instances describe vm-1 --zone=us-central1-f --format=json --project=test-proj"
        );
    }

    #[tokio::test]
    async fn test_reset_instance() {
        let (runner, client) = setup([ok("")]);
        let instance = deployment::Instance {
            name: "vm-1".into(),
            zone: "us-central1-f".into(),
            network_ip: None,
        };

        client.reset_instance(&instance).await.unwrap();
        assert_eq!(
            runner.commands(),
            vec!["gcloud compute instances reset vm-1 --project=test-proj --zone=us-central1-f"]
        );
    }

    /// Project creation runs in the host project; test deployments in the new one
    #[tokio::test]
    async fn test_project_creation_commands() {
        init_tracing();
        let mut config = SuiteConfig::new("host-proj");
        config.project_creation = Some(
            ProjectCreationInput {
                deployment_name: Some("dm-test-project".into()),
                project_to_create: Some("dm-test-1234".into()),
                organization_id: Some("111".into()),
                billing_account: Some("AAA-BBB".into()),
                service_account_to_create: Some("dm-sa".into()),
                service_account_owner_a: Some("a@example.com".into()),
                service_account_owner_b: Some("b@example.com".into()),
            }
            .validate()
            .unwrap(),
        );
        let runner = Arc::new(ScriptedRunner::new([ok(""), ok(""), ok("")]));
        let client = DeploymentClient::new(runner.clone(), config);

        client.create_project_deployment().await.unwrap();
        client.delete("sample-1").await.unwrap();
        client.delete_project_deployment().await.unwrap();

        assert_eq!(
            runner.commands(),
            vec![
                "gcloud deployment-manager deployments create dm-test-project --config examples/v2/project_creation/config-template.jinja --project=host-proj --properties \"PROJECT_NAME:'dm-test-1234',ORGANIZATION_ID:'111',BILLING_ACCOUNT:'AAA-BBB',SERVICE_ACCOUNT_TO_CREATE:'dm-sa',SERVICE_ACCOUNT_OWNER_A:'a@example.com',SERVICE_ACCOUNT_OWNER_B:'b@example.com'\"",
                "gcloud deployment-manager deployments delete sample-1 -q --project=dm-test-1234",
                "gcloud deployment-manager deployments delete dm-test-project -q --project=host-proj",
            ]
        );
    }

    /// Without project creation the setup and teardown issue nothing
    #[tokio::test]
    async fn test_project_deployment_noop() {
        let (runner, client) = setup(Vec::<Reply>::new());
        client.create_project_deployment().await.unwrap();
        client.delete_project_deployment().await.unwrap();
        assert!(runner.commands().is_empty());
    }
}

#[cfg(test)]
mod cleanup_tests {
    use super::*;

    /// A failing check still deletes, and the check's error is what comes back
    #[tokio::test]
    async fn test_delete_runs_after_check_failure() {
        let (runner, client) = setup([
            ok(""),
            ok(r#"{"deployment": {"operation": {"error": {"errors": ["boom"]}}}}"#),
            ok(""),
        ]);

        let err = with_deployment(&client, "sample-1", || async {
            client.create("sample-1", "sample/vm.yaml", None).await?;
            client.check("sample-1").await
        })
        .await
        .unwrap_err();

        assert!(matches!(err, DeploymentError::Operation { .. }));
        let commands = runner.commands();
        assert_eq!(commands.len(), 3);
        assert!(commands[2].contains("deployments delete sample-1"));
    }

    /// A failing create still deletes whatever was half-created
    #[tokio::test]
    async fn test_delete_runs_after_create_failure() {
        let (runner, client) = setup([fail("ERROR: resource error"), ok("")]);

        let err = with_deployment(&client, "sample-1", || async {
            client.create("sample-1", "sample/vm.yaml", None).await
        })
        .await
        .unwrap_err();

        assert!(err.to_string().contains("resource error"));
        assert_eq!(runner.commands().len(), 2);
    }

    /// When both body and cleanup fail, the body's error wins
    #[tokio::test]
    async fn test_body_error_wins_over_cleanup_error() {
        let (_, client) = setup([fail("create failed"), fail("delete failed")]);

        let err = with_deployment(&client, "sample-1", || async {
            client.create("sample-1", "sample/vm.yaml", None).await
        })
        .await
        .unwrap_err();

        assert!(err.to_string().contains("create failed"));
    }

    /// A cleanup failure after a good run is reported
    #[tokio::test]
    async fn test_cleanup_error_reported() {
        let (_, client) = setup([ok(""), fail("delete failed")]);

        let err = with_deployment(&client, "sample-1", || async {
            client.create("sample-1", "sample/vm.yaml", None).await
        })
        .await
        .unwrap_err();

        assert!(err.to_string().contains("delete failed"));
    }
}

#[cfg(test)]
mod update_tests {
    use super::*;

    /// Conflicts on both steps are retried with separate counters
    #[tokio::test(start_paused = true)]
    async fn test_update_and_check_retries_conflicts() {
        let (runner, client) = setup([
            conflict(),
            conflict(),
            ok(""),
            conflict(),
            conflict(),
            ok(CLEAN),
        ]);
        let start = Instant::now();

        client
            .update_and_check("igm-updater-python", "igm-updater/python/frontendver2.yaml")
            .await
            .unwrap();

        let commands = runner.commands();
        assert_eq!(commands.len(), 6);
        assert!(commands[..3].iter().all(|c| c.contains("deployments update")));
        assert!(commands[3..].iter().all(|c| c.contains("deployments describe")));
        assert_eq!(
            commands[0],
            "gcloud deployment-manager deployments update igm-updater-python --config examples/v2/igm-updater/python/frontendver2.yaml --project=test-proj"
        );
        assert_slept(start, 4 * 600);
    }

    /// Three conflicts on update give up without describing
    #[tokio::test(start_paused = true)]
    async fn test_update_conflicts_exhausted() {
        let (runner, client) = setup([conflict(), conflict(), conflict(), ok(CLEAN)]);

        let err = client
            .update_and_check("igm-updater-python", "igm-updater/python/frontendver2.yaml")
            .await
            .unwrap_err();

        assert!(err.is_conflict());
        assert_eq!(runner.commands().len(), 3);
        assert_eq!(runner.remaining(), 1);
    }

    /// Other update failures are not retried
    #[tokio::test(start_paused = true)]
    async fn test_update_other_failure_immediate() {
        let (runner, client) = setup([fail("ERROR: code=400, invalid config")]);
        let start = Instant::now();

        let err = client
            .update_and_check("igm-updater-python", "igm-updater/python/frontendver2.yaml")
            .await
            .unwrap_err();

        assert!(!err.is_conflict());
        assert_eq!(runner.commands().len(), 1);
        assert_slept(start, 0);
    }

    /// A "412" in the project id does not make an unrelated failure retryable
    #[tokio::test(start_paused = true)]
    async fn test_conflict_not_read_from_command_line() {
        init_tracing();
        let runner = Arc::new(ScriptedRunner::new([
            fail("ERROR: code=403, message=Forbidden"),
            ok(""),
            ok(""),
            ok(""),
        ]));
        let client = DeploymentClient::new(runner.clone(), SuiteConfig::new("dm-test-412"));
        let start = Instant::now();

        let err = client
            .update_and_check("igm-updater-python", "igm-updater/python/frontendver2.yaml")
            .await
            .unwrap_err();

        assert!(!err.is_conflict());
        assert!(err.to_string().contains("Forbidden"));
        assert_eq!(runner.commands().len(), 1);
        assert!(runner.commands()[0].contains("--project=dm-test-412"));
        assert_slept(start, 0);
    }

    /// An error payload after a good update is a semantic failure, never retried
    #[tokio::test(start_paused = true)]
    async fn test_update_check_error_payload_not_retried() {
        let (runner, client) = setup([
            ok(""),
            ok(r#"{"deployment": {"operation": {"error": {"errors": [{"code": "412"}]}}}}"#),
        ]);

        let err = client
            .update_and_check("igm-updater-python", "igm-updater/python/frontendver2.yaml")
            .await
            .unwrap_err();

        assert!(matches!(err, DeploymentError::Operation { .. }));
        assert_eq!(runner.commands().len(), 2);
    }
}

#[cfg(test)]
mod poll_tests {
    use super::*;

    /// Handle object, DONE on first poll: exactly one poll
    #[tokio::test(start_paused = true)]
    async fn test_done_on_first_poll() {
        let (runner, client) = setup([ok(r#"{"status": "DONE"}"#)]);
        let start = Instant::now();

        let response = client.wait_for_operation(r#"{"name": "op-1"}"#).await.unwrap();

        assert_eq!(response, json!({"status": "DONE"}));
        assert_eq!(
            runner.commands(),
            vec!["gcloud deployment-manager operations describe op-1 --format=json --project=test-proj"]
        );
        assert_slept(start, 0);
    }

    /// One-element list handle, terminal response with an error payload
    #[tokio::test(start_paused = true)]
    async fn test_done_with_error() {
        let error = json!({"errors": [{"code": "RESOURCE_ERROR", "message": "quota"}]});
        let (runner, client) = setup([
            ok(r#"{"status": "RUNNING"}"#),
            ok(&json!({"status": "DONE", "error": error}).to_string()),
        ]);

        match client.wait_for_operation(r#"[{"name": "op-2"}]"#).await {
            Err(DeploymentError::Operation { payload, subject, .. }) => {
                assert_eq!(payload, error);
                assert!(subject.contains("op-2"));
            }
            other => panic!("expected operation error, got {other:?}"),
        }
        assert_eq!(runner.commands().len(), 2);
        assert!(runner.commands()[0].contains("operations describe op-2"));
    }

    /// Never DONE: explicit timeout after the ceiling
    #[tokio::test(start_paused = true)]
    async fn test_timeout_is_an_error() {
        let (runner, client) = setup((0..90).map(|_| ok(r#"{"status": "RUNNING"}"#)));

        match client.wait_for_operation(r#"{"name": "op-3"}"#).await {
            Err(DeploymentError::Timeout { operation, polls }) => {
                assert_eq!(operation, "op-3");
                assert_eq!(polls, 90);
            }
            other => panic!("expected timeout, got {other:?}"),
        }
        assert_eq!(runner.commands().len(), 90);
    }

    #[tokio::test]
    async fn test_empty_handle_list() {
        let (runner, client) = setup(Vec::<Reply>::new());
        assert!(matches!(
            client.wait_for_operation("[]").await,
            Err(DeploymentError::MissingOperationName)
        ));
        assert!(runner.commands().is_empty());
    }

    /// `[]` is an empty list, not an operation with every field defaulted
    #[test]
    fn test_empty_list_is_not_a_single_operation() {
        use deployment::types::OperationHandle;

        let handle: OperationHandle = serde_json::from_str("[]").unwrap();
        assert!(matches!(handle, OperationHandle::List(ref ops) if ops.is_empty()));
        assert!(handle.into_operation().is_none());
    }

    #[tokio::test]
    async fn test_handle_not_json() {
        let (_, client) = setup(Vec::<Reply>::new());
        assert!(matches!(
            client.wait_for_operation("ERROR: not json").await,
            Err(DeploymentError::Decode { .. })
        ));
    }

    /// Async create submits with --async and polls the returned operation
    #[tokio::test(start_paused = true)]
    async fn test_create_async() {
        let (runner, client) = setup([
            ok(r#"[{"name": "operation-123", "status": "PENDING"}]"#),
            ok(r#"{"name": "operation-123", "status": "DONE"}"#),
        ]);

        let response = client
            .create_async("sample-1", "sample/vm.yaml", None)
            .await
            .unwrap();

        assert_eq!(response["status"], "DONE");
        assert_eq!(
            runner.commands(),
            vec![
                "gcloud deployment-manager deployments create sample-1 --config examples/v2/sample/vm.yaml --project=test-proj --async --format=json",
                "gcloud deployment-manager operations describe operation-123 --format=json --project=test-proj",
            ]
        );
    }
}
