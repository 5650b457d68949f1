// ABOUTME: Integration tests for hooks system.
// ABOUTME: Tests hook discovery, execution, and environment variable passing.

mod support;

use cutover::deploy::{FixedAnswer, Orchestrator};
use cutover::hooks::{HookContext, HookPoint, HookRunner};
use cutover::notify::LogSink;
use cutover::types::DeploymentTarget::{Blue, Green};
use cutover::types::{Environment, ResourceName};
use std::fs;
use std::os::unix::fs::PermissionsExt;
use support::fake_cluster::FakeCluster;
use support::{APP, NAMESPACE, fast_config, release, rollback_request};
use tempfile::TempDir;

fn create_hook(dir: &TempDir, name: &str, script: &str) {
    let hooks_dir = dir.path().join(".cutover").join("hooks");
    fs::create_dir_all(&hooks_dir).unwrap();

    let hook_path = hooks_dir.join(name);
    fs::write(&hook_path, script).unwrap();

    // Make executable
    let mut perms = fs::metadata(&hook_path).unwrap().permissions();
    perms.set_mode(0o755);
    fs::set_permissions(&hook_path, perms).unwrap();
}

fn test_context() -> HookContext {
    HookContext::before(
        "deploy",
        &ResourceName::new(APP).unwrap(),
        &ResourceName::new(NAMESPACE).unwrap(),
        Environment::Staging,
        Some("v1.4.0".to_string()),
    )
}

const PRINT_ENV: &str = "#!/bin/sh\nenv | grep '^CUTOVER_' | sort\n";

/// Test: pre-deploy hook runs before deployment.
#[tokio::test]
async fn pre_deploy_hook_runs() {
    let temp_dir = TempDir::new().unwrap();
    create_hook(
        &temp_dir,
        "pre-deploy",
        "#!/bin/sh\necho 'pre-deploy ran'\nexit 0\n",
    );

    let runner = HookRunner::new(temp_dir.path());
    assert!(runner.hook_exists(HookPoint::PreDeploy));

    let result = runner.run(HookPoint::PreDeploy, &test_context()).await.unwrap();
    assert!(result.success);
    assert!(result.stdout.contains("pre-deploy ran"));
}

/// Test: Hook failure in pre-deploy is detectable.
#[tokio::test]
async fn pre_deploy_failure_detected() {
    let temp_dir = TempDir::new().unwrap();
    create_hook(
        &temp_dir,
        "pre-deploy",
        "#!/bin/sh\necho 'freeze window active' >&2\nexit 1\n",
    );

    let runner = HookRunner::new(temp_dir.path());
    let result = runner.run(HookPoint::PreDeploy, &test_context()).await.unwrap();

    assert!(!result.success);
    assert_eq!(result.exit_code, Some(1));
    assert!(result.stderr.contains("freeze window active"));
    assert!(HookPoint::PreDeploy.is_fatal());
}

/// Test: Missing hook returns None.
#[tokio::test]
async fn missing_hook_returns_none() {
    let temp_dir = TempDir::new().unwrap();
    let runner = HookRunner::new(temp_dir.path());

    assert!(!runner.hook_exists(HookPoint::OnError));
    assert!(runner.run(HookPoint::OnError, &test_context()).await.is_none());
}

/// Test: pre-deploy context carries the release but no colors yet.
#[tokio::test]
async fn pre_deploy_hook_receives_release_environment() {
    let temp_dir = TempDir::new().unwrap();
    create_hook(&temp_dir, "pre-deploy", PRINT_ENV);

    let runner = HookRunner::new(temp_dir.path());
    let result = runner.run(HookPoint::PreDeploy, &test_context()).await.unwrap();

    assert!(result.stdout.contains("CUTOVER_APP=gameforge"));
    assert!(result.stdout.contains("CUTOVER_NAMESPACE=games"));
    assert!(result.stdout.contains("CUTOVER_ENVIRONMENT=staging"));
    assert!(result.stdout.contains("CUTOVER_OPERATION=deploy"));
    assert!(result.stdout.contains("CUTOVER_VERSION=v1.4.0"));
    assert!(!result.stdout.contains("CUTOVER_TO_COLOR"));
}

/// Test: a failed release hands its colors and error kind to on-error.
#[tokio::test]
async fn on_error_hook_receives_failure_details() {
    let temp_dir = TempDir::new().unwrap();
    create_hook(&temp_dir, "on-error", PRINT_ENV);

    let cluster = FakeCluster::new(NAMESPACE).with_active(APP, Blue, 3);
    cluster.probe_default(APP, Green, 503);
    let report = Orchestrator::new(&cluster, &LogSink)
        .deploy(release("v2.0.0"), &fast_config(), false)
        .await;

    let point = HookPoint::after(report.outcome()).unwrap();
    assert_eq!(point, HookPoint::OnError);

    let runner = HookRunner::new(temp_dir.path());
    let context = HookContext::from_record(&report.record);
    let result = runner.run(point, &context).await.unwrap();

    assert!(result.stdout.contains("CUTOVER_FROM_COLOR=blue"));
    assert!(result.stdout.contains("CUTOVER_TO_COLOR=green"));
    assert!(result.stdout.contains("CUTOVER_OUTCOME=failed"));
    assert!(result.stdout.contains("CUTOVER_ERROR_KIND=health_check_exhausted"));
}

/// Test: a finished rollback runs post-rollback.
#[tokio::test]
async fn post_rollback_hook_runs_after_rollback() {
    let temp_dir = TempDir::new().unwrap();
    create_hook(&temp_dir, "post-rollback", PRINT_ENV);

    let cluster = FakeCluster::new(NAMESPACE)
        .with_active(APP, Green, 3)
        .with_deployment(APP, Blue, 3, 3);
    let report = Orchestrator::new(&cluster, &LogSink)
        .rollback(rollback_request(true), &fast_config(), &FixedAnswer(true))
        .await;

    let point = HookPoint::after(report.outcome()).unwrap();
    assert_eq!(point, HookPoint::PostRollback);

    let runner = HookRunner::new(temp_dir.path());
    let result = runner
        .run(point, &HookContext::from_record(&report.record))
        .await
        .unwrap();

    assert!(result.success);
    assert!(result.stdout.contains("CUTOVER_OPERATION=rollback"));
    assert!(result.stdout.contains("CUTOVER_OUTCOME=rolled_back"));
    assert!(!result.stdout.contains("CUTOVER_VERSION"));
}
