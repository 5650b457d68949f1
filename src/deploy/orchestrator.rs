// ABOUTME: Drives a release or rollback to a terminal phase and reports it.
// ABOUTME: Every terminal phase is notified and audited, whatever the outcome.

use serde::Serialize;
use std::path::PathBuf;

use crate::cluster::{ClusterClient, ReplicaCounts};
use crate::config::Config;
use crate::diagnostics::{Diagnostics, Warning};
use crate::notify::{NotificationSink, NotificationStatus};
use crate::types::{DeploymentName, DeploymentTarget, ReleaseDescriptor, RollbackRequest};

use super::context::{Aborted, Finished};
use super::state::Pending;
use super::{
    AuditLog, AuditRecord, CancelSignal, ConfirmationGate, DeployError, DeploymentRecord,
    Operation, Phase, Release, Rollback,
};

/// Terminal report of one run.
#[derive(Debug)]
pub struct RunReport {
    pub record: DeploymentRecord,
    pub diagnostics: Diagnostics,
    pub error: Option<DeployError>,
    pub audit_path: Option<PathBuf>,
}

impl RunReport {
    pub fn outcome(&self) -> Phase {
        self.record.phase()
    }

    pub fn is_success(&self) -> bool {
        matches!(self.outcome(), Phase::Succeeded | Phase::RolledBack)
    }

    /// One-line human summary, also used as the notification text.
    pub fn summary(&self) -> String {
        summarize(&self.record, self.error.as_ref())
    }
}

/// What a dry run found and would do.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Plan {
    pub operation: Operation,
    pub namespace: String,
    pub app: String,
    pub service: String,
    pub active_color: Option<DeploymentTarget>,
    pub target_color: DeploymentTarget,
    pub release_version: Option<String>,
    pub steps: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub manifest: Option<serde_json::Value>,
}

/// Runs blue/green workflows against one cluster namespace.
pub struct Orchestrator<'a, C: ClusterClient + ?Sized> {
    cluster: &'a C,
    sink: &'a dyn NotificationSink,
    audit: Option<AuditLog>,
    cancel: CancelSignal,
}

impl<'a, C: ClusterClient + ?Sized> Orchestrator<'a, C> {
    pub fn new(cluster: &'a C, sink: &'a dyn NotificationSink) -> Self {
        Self {
            cluster,
            sink,
            audit: None,
            cancel: CancelSignal::never(),
        }
    }

    pub fn with_audit(mut self, audit: AuditLog) -> Self {
        self.audit = Some(audit);
        self
    }

    pub fn with_cancel(mut self, cancel: CancelSignal) -> Self {
        self.cancel = cancel;
        self
    }

    /// Run a release through every phase. `config` must already carry the
    /// environment overrides.
    pub async fn deploy(
        &self,
        release: ReleaseDescriptor,
        config: &Config,
        skip_tests: bool,
    ) -> RunReport {
        tracing::info!(
            app = %release.app(),
            namespace = %release.namespace(),
            version = %release.version(),
            environment = %release.environment(),
            "starting release"
        );
        let start = Release::new(release, config.clone(), skip_tests, self.cancel.clone());
        let result = self.drive_release(start).await;
        self.conclude(result).await
    }

    async fn drive_release(&self, release: Release<Pending>) -> Result<Finished, Aborted> {
        let cluster = self.cluster;
        let release = release.init(cluster).await?;
        let release = release.deploy_inactive(cluster).await?;
        let release = release.health_check(cluster).await?;
        let release = if release.record().skip_tests() {
            release.skip_tests()
        } else {
            release.smoke_test(cluster).await?
        };
        let release = release.cutover(cluster).await?;
        let release = release.monitor(cluster).await?;
        let release = release.cleanup(cluster).await?;
        Ok(release.finish())
    }

    /// Move traffic back to the inactive color.
    pub async fn rollback(
        &self,
        request: RollbackRequest,
        config: &Config,
        gate: &dyn ConfirmationGate,
    ) -> RunReport {
        tracing::info!(
            app = %request.app,
            namespace = %request.namespace,
            environment = %request.environment,
            force = request.force,
            "starting rollback"
        );
        let start = Rollback::new(request, config.clone(), self.cancel.clone());
        let result = self.drive_rollback(start, gate).await;
        self.conclude(result).await
    }

    async fn drive_rollback(
        &self,
        rollback: Rollback<Pending>,
        gate: &dyn ConfirmationGate,
    ) -> Result<Finished, Aborted> {
        let cluster = self.cluster;
        let rollback = rollback.init(cluster).await?;
        let rollback = rollback.ensure_ready(cluster).await?;
        let rollback = rollback.health_check(cluster).await?;
        let rollback = rollback.confirm(gate).await?;
        let rollback = rollback.cutover(cluster).await?;
        let rollback = rollback.monitor(cluster).await?;
        Ok(rollback.finish())
    }

    /// Resolve colors and describe the release without writing anything.
    pub async fn plan_release(
        &self,
        release: ReleaseDescriptor,
        config: &Config,
        skip_tests: bool,
    ) -> Result<Plan, DeployError> {
        let start = Release::new(release, config.clone(), skip_tests, self.cancel.clone());
        let resolved = start.init(self.cluster).await.map_err(|a| a.error)?;

        let active = resolved.active_color();
        let target = resolved.target_color();
        let manifest = resolved.manifest();
        let record = resolved.record();
        let app = record.app();
        let service = config.service_for(app);
        let target_counts = self.replicas(&manifest.name).await;

        let mut steps = vec![format!(
            "apply {} ({}) with {} replicas{}",
            manifest.name,
            manifest.image(),
            manifest.replicas,
            describe_counts(target_counts)
        )];
        steps.push(format!(
            "wait up to {}s for {} to become ready",
            resolved.release().timeout().as_secs(),
            manifest.name
        ));
        steps.push(format!(
            "probe {} on port {} up to {} times every {}s",
            config.healthcheck.path,
            config.healthcheck.port,
            config.healthcheck.attempts,
            config.healthcheck.interval.as_secs()
        ));
        if skip_tests {
            steps.push("skip smoke tests".to_string());
        } else if !config.smoke_tests.is_empty() {
            let names: Vec<&str> = config.smoke_tests.iter().map(|t| t.name.as_str()).collect();
            steps.push(format!("run smoke tests: {}", names.join(", ")));
        }
        steps.push(format!("switch service {service} to {target}"));
        steps.push(format!(
            "monitor {} for {}s",
            manifest.name,
            config.monitoring.window.as_secs()
        ));
        match active {
            Some(previous) => {
                let old = DeploymentName::for_color(app, previous);
                let counts = self.replicas(&old).await;
                let action = if config.cleanup.delete_previous {
                    "scale to zero and delete"
                } else {
                    "scale to zero"
                };
                steps.push(format!("{action} {old}{}", describe_counts(counts)));
            }
            None => steps.push("no previous color to clean up".to_string()),
        }

        Ok(Plan {
            operation: Operation::Deploy,
            namespace: record.namespace().to_string(),
            app: app.to_string(),
            service: service.to_string(),
            active_color: active,
            target_color: target,
            release_version: record.release_version().map(|v| v.to_string()),
            steps,
            manifest: Some(manifest.to_json()),
        })
    }

    /// Resolve colors and describe the rollback without writing anything.
    pub async fn plan_rollback(
        &self,
        request: RollbackRequest,
        config: &Config,
    ) -> Result<Plan, DeployError> {
        let start = Rollback::new(request, config.clone(), self.cancel.clone());
        let resolved = start.init(self.cluster).await.map_err(|a| a.error)?;

        let active = resolved.active_color();
        let target = resolved.target_color();
        let record = resolved.record();
        let app = record.app();
        let service = config.service_for(app);
        let target_name = DeploymentName::for_color(app, target);
        let counts = self.replicas(&target_name).await;

        let mut steps = Vec::new();
        if counts.is_some_and(|c| c.desired == 0) {
            steps.push(format!(
                "scale {target_name} to {} replicas and wait for readiness",
                config.replicas.max(1)
            ));
        }
        steps.push(format!(
            "probe {target_name}{} on {}",
            describe_counts(counts),
            config.healthcheck.path
        ));
        if !resolved.request().force {
            steps.push("ask for confirmation".to_string());
        }
        steps.push(format!("switch service {service} from {active} to {target}"));
        steps.push(format!(
            "monitor {target_name} for {}s",
            config.monitoring.window.as_secs()
        ));

        Ok(Plan {
            operation: Operation::Rollback,
            namespace: record.namespace().to_string(),
            app: app.to_string(),
            service: service.to_string(),
            active_color: Some(active),
            target_color: target,
            release_version: None,
            steps,
            manifest: None,
        })
    }

    async fn replicas(&self, deployment: &DeploymentName) -> Option<ReplicaCounts> {
        match self.cluster.get_ready_replicas(deployment).await {
            Ok(counts) => Some(counts),
            Err(e) => {
                tracing::debug!(deployment = %deployment, "could not read replicas: {}", e);
                None
            }
        }
    }

    /// Notify and audit a terminal run.
    async fn conclude(&self, result: Result<Finished, Aborted>) -> RunReport {
        let (record, mut diagnostics, error) = match result {
            Ok(Finished {
                record,
                diagnostics,
            }) => (record, diagnostics, None),
            Err(Aborted {
                record,
                diagnostics,
                error,
            }) => (record, diagnostics, Some(error)),
        };

        let status = match record.phase() {
            Phase::Succeeded => NotificationStatus::Succeeded,
            Phase::RolledBack => NotificationStatus::RolledBack,
            _ => NotificationStatus::Failed,
        };
        let summary = summarize(&record, error.as_ref());
        if let Err(e) = self.sink.notify(status, &summary).await {
            diagnostics.warn(Warning::notification(format!(
                "failed to send notification: {e}"
            )));
        }

        let mut audit_path = None;
        if let Some(ref log) = self.audit {
            let entry = AuditRecord::new(&record, &diagnostics);
            match log.write(&entry).await {
                Ok(path) => audit_path = Some(path),
                Err(e) => diagnostics.warn(Warning::audit(format!(
                    "failed to write audit record to {}: {e}",
                    log.dir().display()
                ))),
            }
        }

        RunReport {
            record,
            diagnostics,
            error,
            audit_path,
        }
    }
}

fn describe_counts(counts: Option<ReplicaCounts>) -> String {
    match counts {
        Some(c) => format!(" (currently {}/{} ready)", c.ready, c.desired),
        None => " (does not exist yet)".to_string(),
    }
}

fn summarize(record: &DeploymentRecord, error: Option<&DeployError>) -> String {
    let scope = format!(
        "{} in {} ({})",
        record.app(),
        record.namespace(),
        record.environment()
    );
    let colors = match (record.from(), record.target()) {
        (Some(from), Some(to)) => format!("{from} -> {to}"),
        (None, Some(to)) => format!("first release -> {to}"),
        _ => "colors unresolved".to_string(),
    };

    match (record.phase(), error) {
        (Phase::Succeeded, _) => format!(
            "deployed {} {}: {}",
            scope,
            record
                .release_version()
                .map(|v| v.as_str())
                .unwrap_or("unknown version"),
            colors
        ),
        (Phase::RolledBack, _) => format!("rolled back {scope}: {colors}"),
        (_, Some(error)) => format!(
            "{} of {} failed during {}: {}",
            record.operation(),
            scope,
            record
                .failed_in()
                .map(|p| p.as_str())
                .unwrap_or("init"),
            error
        ),
        (phase, None) => format!("{} of {} ended in {}", record.operation(), scope, phase),
    }
}
