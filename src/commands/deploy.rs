// ABOUTME: Deploy command implementation.
// ABOUTME: Runs hooks around a blue/green release, or prints its plan on --dry-run.

use super::{Invocation, finish, print_plan};
use cutover::cluster::KubectlClient;
use cutover::deploy::{CancelSignal, Orchestrator};
use cutover::error::{Error, Result};
use cutover::hooks::{HookContext, HookPoint};
use cutover::notify::LogSink;
use cutover::output::Output;
use cutover::types::{ReleaseDescriptor, ReleaseVersion};
use std::time::Duration;

/// Flags specific to `cutover deploy`.
pub struct DeployArgs {
    pub version: ReleaseVersion,
    pub timeout: Option<u64>,
    pub dry_run: bool,
    pub skip_tests: bool,
}

pub async fn deploy(
    invocation: Invocation,
    args: DeployArgs,
    cancel: CancelSignal,
    mut output: Output,
) -> Result<()> {
    output.start_timer();

    let timeout = match args.timeout {
        Some(0) => {
            return Err(Error::InvalidArguments(
                "--timeout must be at least 1 second".to_string(),
            ));
        }
        Some(secs) => Duration::from_secs(secs),
        None => invocation.config.timeout,
    };
    let release = ReleaseDescriptor::new(
        args.version,
        invocation.environment,
        invocation.namespace.clone(),
        invocation.app.clone(),
        invocation.config.replicas,
        timeout,
    );

    let cluster = KubectlClient::new(&invocation.config.cluster, invocation.namespace.clone());

    if args.dry_run {
        let orchestrator = Orchestrator::new(&cluster, &LogSink).with_cancel(cancel);
        let plan = orchestrator
            .plan_release(release, &invocation.config, args.skip_tests)
            .await
            .inspect_err(|_| output.hint(&invocation.remediation_hint()))?;
        print_plan(&plan, &output);
        return Ok(());
    }

    output.progress(&format!(
        "Deploying {} {} to {} ({})",
        invocation.app, release.version(), invocation.namespace, invocation.environment
    ));

    let hooks = invocation.hooks();
    let hook_context = HookContext::before(
        "deploy",
        &invocation.app,
        &invocation.namespace,
        invocation.environment,
        Some(release.version().to_string()),
    );
    if let Some(result) = hooks.run(HookPoint::PreDeploy, &hook_context).await
        && !result.success
    {
        if !result.stderr.is_empty() {
            eprintln!("{}", result.stderr);
        }
        return Err(Error::Hook("pre-deploy hook failed".to_string()));
    }

    if args.skip_tests {
        output.warning("smoke tests skipped (--skip-tests)");
    }

    let sink = invocation.notification_sink(&output);
    let mut orchestrator = Orchestrator::new(&cluster, &sink).with_cancel(cancel);
    if let Some(audit) = invocation.audit_log() {
        orchestrator = orchestrator.with_audit(audit);
    }

    let report = orchestrator
        .deploy(release, &invocation.config, args.skip_tests)
        .await;

    finish(&invocation, report, &hooks, &output).await
}
