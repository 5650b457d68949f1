// ABOUTME: Command module aggregator for the cutover CLI.
// ABOUTME: Shared target resolution, sink wiring, and report rendering for the handlers.

mod deploy;
mod rollback;
mod status;

pub use deploy::{DeployArgs, deploy};
pub use rollback::rollback;
pub use status::status;

use cutover::config::Config;
use cutover::deploy::{AuditLog, AuditRecord, Plan, RunReport};
use cutover::diagnostics::Warning;
use cutover::error::{Error, Result};
use cutover::hooks::{HookContext, HookPoint, HookRunner};
use cutover::notify::{FanoutSink, LogSink, WebhookSink};
use cutover::output::Output;
use cutover::types::{Environment, ResourceName};
use std::path::{Path, PathBuf};

use crate::cli::Target;

/// Everything a command needs once flags and config are merged.
pub struct Invocation {
    pub project_dir: PathBuf,
    pub config: Config,
    pub environment: Environment,
    pub namespace: ResourceName,
    pub app: ResourceName,
}

impl Invocation {
    /// Load config, apply environment overrides, then let flags win.
    pub fn resolve(config_path: Option<&Path>, target: Target) -> Result<Self> {
        let project_dir = std::env::current_dir()?;
        let config =
            Config::resolve(config_path, &project_dir)?.for_environment(target.environment)?;

        let namespace = target
            .namespace
            .or_else(|| config.namespace.clone())
            .ok_or_else(|| {
                Error::InvalidArguments(
                    "--namespace is required (or set namespace in cutover.yml)".to_string(),
                )
            })?;
        let app = target.app.or_else(|| config.app.clone()).ok_or_else(|| {
            Error::InvalidArguments("--app is required (or set app in cutover.yml)".to_string())
        })?;

        Ok(Invocation {
            project_dir,
            config,
            environment: target.environment,
            namespace,
            app,
        })
    }

    pub fn hooks(&self) -> HookRunner {
        HookRunner::new(&self.project_dir)
    }

    /// Log sink plus the configured webhook. A bad webhook is a warning, not an error.
    pub fn notification_sink(&self, output: &Output) -> FanoutSink {
        let sink = FanoutSink::new().with(LogSink);
        let Some(ref webhook) = self.config.notifications.webhook else {
            return sink;
        };

        let url = match webhook.resolve() {
            Ok(url) => url,
            Err(e) => {
                output.warning(&format!("webhook notifications disabled: {e}"));
                return sink;
            }
        };
        match WebhookSink::new(&url, self.app.as_str(), self.environment.as_str()) {
            Ok(webhook) => sink.with(webhook.with_timeout(self.config.notifications.timeout)),
            Err(e) => {
                output.warning(&format!("webhook notifications disabled: {e}"));
                sink
            }
        }
    }

    pub fn audit_log(&self) -> Option<AuditLog> {
        self.config
            .audit
            .enabled
            .then(|| AuditLog::new(self.project_dir.join(&self.config.audit.dir)))
    }

    pub fn remediation_hint(&self) -> String {
        format!(
            "run 'cutover rollback --environment {} --namespace {} --app {}'",
            self.environment, self.namespace, self.app
        )
    }
}

/// Print a dry-run plan.
pub fn print_plan(plan: &Plan, output: &Output) {
    let mut lines = vec![format!(
        "Plan for {} {} in {}:",
        plan.operation, plan.app, plan.namespace
    )];
    match plan.active_color {
        Some(active) => lines.push(format!("  active color: {active}")),
        None => lines.push("  active color: none (first release)".to_string()),
    }
    lines.push(format!("  target color: {}", plan.target_color));
    for (i, step) in plan.steps.iter().enumerate() {
        lines.push(format!("  {}. {}", i + 1, step));
    }
    lines.push("Dry run: no changes made".to_string());
    output.data("plan", &lines, plan);
}

/// Run the hook for the report's terminal phase, then print the outcome.
///
/// Returns the run's error so the caller exits non-zero on failure.
pub async fn finish(
    invocation: &Invocation,
    mut report: RunReport,
    hooks: &HookRunner,
    output: &Output,
) -> Result<()> {
    if let Some(point) = HookPoint::after(report.outcome()) {
        let context = HookContext::from_record(&report.record);
        if let Some(result) = hooks.run(point, &context).await
            && !result.success
        {
            report.diagnostics.warn(Warning::hook(format!(
                "{} hook exited with {:?}: {}",
                point.filename(),
                result.exit_code,
                result.stderr.trim()
            )));
        }
    }

    for warning in report.diagnostics.warnings() {
        output.warning(&warning.message);
    }
    if let Some(ref path) = report.audit_path {
        output.progress(&format!("  → Audit record: {}", path.display()));
    }

    let audit = AuditRecord::new(&report.record, &report.diagnostics);
    output.data("report", &[], &audit);

    let summary = report.summary();
    match report.error {
        None => {
            output.success(&summary);
            Ok(())
        }
        Some(error) => {
            output.progress(&format!("  ✗ {summary}"));
            output.hint(&invocation.remediation_hint());
            Err(Error::Deploy(error))
        }
    }
}
