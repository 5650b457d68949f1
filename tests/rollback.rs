// ABOUTME: Integration tests for the rollback workflow.
// ABOUTME: Covers the inverse-of-cutover property, confirmation, and target restoration.

mod support;

use cutover::cluster::ClusterClient;
use cutover::deploy::{
    CancelSignal, ErrorKind, FixedAnswer, Orchestrator, Phase, Rollback, RunReport,
};
use cutover::notify::{LogSink, MemorySink, NotificationStatus};
use cutover::types::DeploymentTarget::{Blue, Green};
use support::fake_cluster::FakeCluster;
use support::{APP, NAMESPACE, fast_config, release, rollback_request};

async fn roll_back(cluster: &FakeCluster, force: bool, answer: bool) -> RunReport {
    support::init_tracing();
    Orchestrator::new(cluster, &LogSink)
        .rollback(rollback_request(force), &fast_config(), &FixedAnswer(answer))
        .await
}

fn error_kind(report: &RunReport) -> Option<ErrorKind> {
    report.error.as_ref().map(|e| e.kind())
}

/// Rollback has no cleanup step; its typestate chain ends at `Monitored`.
#[test]
fn rollback_type_signatures_compile() {
    use cutover::deploy::{
        Confirmed, CutOver, Deployed, Healthy, Monitored, Pending, Resolved, TransitionResult,
    };

    #[allow(dead_code)]
    async fn check_signatures<C: ClusterClient>(cluster: &C) {
        let r0: Rollback<Pending> =
            Rollback::new(rollback_request(true), fast_config(), CancelSignal::never());
        let r1: TransitionResult<Rollback<Resolved>> = r0.init(cluster).await;
        let r2: TransitionResult<Rollback<Deployed>> = r1.ok().unwrap().ensure_ready(cluster).await;
        let r3: TransitionResult<Rollback<Healthy>> = r2.ok().unwrap().health_check(cluster).await;
        let r4: TransitionResult<Rollback<Confirmed>> =
            r3.ok().unwrap().confirm(&FixedAnswer(true)).await;
        let r5: TransitionResult<Rollback<CutOver>> = r4.ok().unwrap().cutover(cluster).await;
        let r6: TransitionResult<Rollback<Monitored>> = r5.ok().unwrap().monitor(cluster).await;
        let _finished = r6.ok().unwrap().finish();
    }
}

#[tokio::test]
async fn rollback_reverses_a_cutover_and_keeps_the_new_color() {
    let cluster = FakeCluster::new(NAMESPACE).with_active(APP, Blue, 3);
    let mut config = fast_config();
    config.cleanup.delete_previous = false;

    let deployed = Orchestrator::new(&cluster, &LogSink)
        .deploy(release("v2.0.0"), &config, false)
        .await;
    assert_eq!(deployed.outcome(), Phase::Succeeded, "{:?}", deployed.error);
    assert_eq!(cluster.selector(), Some(Green));

    let report = Orchestrator::new(&cluster, &LogSink)
        .rollback(rollback_request(true), &config, &FixedAnswer(false))
        .await;

    assert_eq!(report.outcome(), Phase::RolledBack, "{:?}", report.error);
    assert!(report.is_success());
    assert_eq!(cluster.selector(), Some(Blue));
    let green = cluster.replicas(APP, Green).expect("green must not be deleted");
    assert_eq!(green.desired, 3);
    assert!(cluster.deleted().is_empty());
}

#[tokio::test]
async fn unhealthy_target_aborts_before_cutover() {
    let cluster = FakeCluster::new(NAMESPACE)
        .with_active(APP, Green, 3)
        .with_deployment(APP, Blue, 3, 3);
    cluster.probe_default(APP, Blue, 502);

    let report = roll_back(&cluster, true, true).await;

    assert_eq!(report.outcome(), Phase::Failed);
    assert_eq!(error_kind(&report), Some(ErrorKind::HealthCheckExhausted));
    assert_eq!(report.record.failed_in(), Some(Phase::HealthChecking));
    assert_eq!(cluster.selector(), Some(Green));
    assert!(!cluster.calls().iter().any(|c| c.starts_with("set_selector")));
}

#[tokio::test]
async fn missing_target_fails_its_health_check() {
    let cluster = FakeCluster::new(NAMESPACE).with_active(APP, Green, 3);

    let report = roll_back(&cluster, true, true).await;

    assert_eq!(error_kind(&report), Some(ErrorKind::HealthCheckExhausted));
    assert_eq!(cluster.selector(), Some(Green));
}

#[tokio::test]
async fn declined_confirmation_is_cancelled() {
    let cluster = FakeCluster::new(NAMESPACE)
        .with_active(APP, Green, 3)
        .with_deployment(APP, Blue, 3, 3);

    let report = roll_back(&cluster, false, false).await;

    assert_eq!(report.outcome(), Phase::Failed);
    assert_eq!(error_kind(&report), Some(ErrorKind::Cancelled));
    assert_eq!(cluster.selector(), Some(Green));
}

#[tokio::test]
async fn approved_confirmation_rolls_back() {
    let cluster = FakeCluster::new(NAMESPACE)
        .with_active(APP, Green, 3)
        .with_deployment(APP, Blue, 3, 3);

    let report = roll_back(&cluster, false, true).await;

    assert_eq!(report.outcome(), Phase::RolledBack);
    assert!(!report.record.forced());
    assert_eq!(cluster.selector(), Some(Blue));
}

#[tokio::test]
async fn forced_rollback_skips_the_gate() {
    let cluster = FakeCluster::new(NAMESPACE)
        .with_active(APP, Green, 3)
        .with_deployment(APP, Blue, 3, 3);

    // The gate would decline; force must not ask it.
    let report = roll_back(&cluster, true, false).await;

    assert_eq!(report.outcome(), Phase::RolledBack);
    assert!(report.record.forced());
}

#[tokio::test]
async fn no_active_color_is_rejected() {
    let cluster = FakeCluster::new(NAMESPACE).with_deployment(APP, Blue, 3, 3);

    let report = roll_back(&cluster, true, true).await;

    assert_eq!(error_kind(&report), Some(ErrorKind::NoActiveColor));
    assert_eq!(report.record.failed_in(), Some(Phase::Init));
    assert!(!cluster.wrote_anything());
}

#[tokio::test]
async fn scaled_down_target_is_restored_before_health_check() {
    let cluster = FakeCluster::new(NAMESPACE)
        .with_active(APP, Green, 3)
        .with_deployment(APP, Blue, 0, 0);

    let report = roll_back(&cluster, true, true).await;

    assert_eq!(report.outcome(), Phase::RolledBack, "{:?}", report.error);
    let blue = cluster.replicas(APP, Blue).unwrap();
    assert_eq!((blue.ready, blue.desired), (3, 3));
    let calls = cluster.calls();
    let scaled = calls.iter().position(|c| c == "scale gameforge-blue 3").unwrap();
    let probed = calls
        .iter()
        .position(|c| c.starts_with("probe gameforge-blue"))
        .unwrap();
    assert!(scaled < probed);
}

#[tokio::test]
async fn restore_timeout_fails_with_deployment_timeout() {
    let cluster = FakeCluster::new(NAMESPACE)
        .with_active(APP, Green, 3)
        .with_deployment(APP, Blue, 0, 0);
    cluster.time_out_waits();

    let report = roll_back(&cluster, true, true).await;

    assert_eq!(error_kind(&report), Some(ErrorKind::DeploymentTimeout));
    assert_eq!(report.record.failed_in(), Some(Phase::DeployingInactive));
    assert_eq!(cluster.selector(), Some(Green));
}

#[tokio::test]
async fn rollback_notifies_rolled_back() {
    let cluster = FakeCluster::new(NAMESPACE)
        .with_active(APP, Green, 3)
        .with_deployment(APP, Blue, 3, 3);
    let sink = MemorySink::default();

    Orchestrator::new(&cluster, &sink)
        .rollback(rollback_request(true), &fast_config(), &FixedAnswer(true))
        .await;

    let messages = sink.messages();
    assert_eq!(messages.len(), 1);
    assert_eq!(messages[0].0, NotificationStatus::RolledBack);
    assert!(messages[0].1.contains("green -> blue"), "{}", messages[0].1);
}

#[tokio::test]
async fn rollback_plan_mentions_restore_and_confirmation() {
    let cluster = FakeCluster::new(NAMESPACE)
        .with_active(APP, Green, 3)
        .with_deployment(APP, Blue, 0, 0);

    let plan = Orchestrator::new(&cluster, &LogSink)
        .plan_rollback(rollback_request(false), &fast_config())
        .await
        .unwrap();

    assert_eq!(plan.active_color, Some(Green));
    assert_eq!(plan.target_color, Blue);
    assert!(plan.steps[0].starts_with("scale gameforge-blue to 3"));
    assert!(plan.steps.iter().any(|s| s == "ask for confirmation"));
    assert!(!cluster.wrote_anything());
}
