// ABOUTME: Rollback command implementation.
// ABOUTME: Moves traffic back to the inactive color after operator confirmation.

use super::{Invocation, finish, print_plan};
use cutover::cluster::KubectlClient;
use cutover::deploy::{CancelSignal, Orchestrator, StdinGate};
use cutover::error::Result;
use cutover::notify::LogSink;
use cutover::output::Output;
use cutover::types::RollbackRequest;

pub async fn rollback(
    invocation: Invocation,
    force: bool,
    dry_run: bool,
    cancel: CancelSignal,
    mut output: Output,
) -> Result<()> {
    output.start_timer();

    let request = RollbackRequest {
        environment: invocation.environment,
        namespace: invocation.namespace.clone(),
        app: invocation.app.clone(),
        force,
    };
    let cluster = KubectlClient::new(&invocation.config.cluster, invocation.namespace.clone());

    if dry_run {
        let orchestrator = Orchestrator::new(&cluster, &LogSink).with_cancel(cancel);
        let plan = orchestrator
            .plan_rollback(request, &invocation.config)
            .await
            .inspect_err(|_| output.hint(&invocation.remediation_hint()))?;
        print_plan(&plan, &output);
        return Ok(());
    }

    output.progress(&format!(
        "Rolling back {} in {} ({})",
        invocation.app, invocation.namespace, invocation.environment
    ));

    let hooks = invocation.hooks();
    let sink = invocation.notification_sink(&output);
    let mut orchestrator = Orchestrator::new(&cluster, &sink).with_cancel(cancel);
    if let Some(audit) = invocation.audit_log() {
        orchestrator = orchestrator.with_audit(audit);
    }

    let report = orchestrator
        .rollback(request, &invocation.config, &StdinGate)
        .await;

    finish(&invocation, report, &hooks, &output).await
}
