// ABOUTME: Phase steps shared by the release and rollback workflows.
// ABOUTME: Bounded retry loops for color lookup, health polling, selector switch, and monitoring.

use std::time::Duration;

use crate::cluster::{ClusterClient, ClusterError, HttpProbe, ProbeResult};
use crate::config::{CleanupConfig, ClusterConfig, CutoverConfig, HealthcheckConfig, MonitoringConfig};
use crate::diagnostics::{Diagnostics, Warning};
use crate::types::{DeploymentName, DeploymentTarget, ServiceRef};

use super::{CancelSignal, DeployError, DeploymentRecord, ErrorKind, Phase};

/// Extra time allowed on top of a probe's own timeout for `kubectl exec` overhead.
const PROBE_GRACE: Duration = Duration::from_secs(5);

pub(crate) fn health_probe(healthcheck: &HealthcheckConfig) -> HttpProbe {
    HttpProbe {
        port: healthcheck.port,
        path: healthcheck.path.clone(),
        timeout: healthcheck.timeout,
    }
}

/// Run one probe; the inner result is `Err` with a description on any non-answer.
pub(crate) async fn probe_once<C: ClusterClient + ?Sized>(
    cluster: &C,
    deployment: &DeploymentName,
    probe: &HttpProbe,
    cancel: &CancelSignal,
    phase: Phase,
) -> Result<Result<ProbeResult, String>, DeployError> {
    let call = tokio::time::timeout(
        probe.timeout + PROBE_GRACE,
        cluster.exec_health_probe(deployment, probe),
    );
    Ok(match cancel.guard(phase, call).await? {
        Ok(Ok(result)) if result.status == 0 => Err("no HTTP response".to_string()),
        Ok(Ok(result)) => Ok(result),
        Ok(Err(e)) => Err(e.to_string()),
        Err(_) => Err(format!(
            "probe did not return within {}s",
            (probe.timeout + PROBE_GRACE).as_secs()
        )),
    })
}

/// Read the color the production service selects, retrying with linear backoff.
pub(crate) async fn resolve_active_color<C: ClusterClient + ?Sized>(
    cluster: &C,
    service: &ServiceRef,
    retry: &ClusterConfig,
    cancel: &CancelSignal,
) -> Result<Option<DeploymentTarget>, DeployError> {
    let attempts = retry.retry_attempts.max(1);
    let mut last_error = None;

    for attempt in 1..=attempts {
        match cancel.guard(Phase::Init, cluster.get_active_color(service)).await? {
            Ok(color) => return Ok(color),
            Err(e @ ClusterError::NotFound { .. }) => {
                return Err(DeployError::new(
                    ErrorKind::ClusterCommandFailed,
                    format!(
                        "service {service} not found in namespace {}: {e}",
                        cluster.namespace()
                    ),
                ));
            }
            Err(e @ ClusterError::UnexpectedOutput { .. }) => {
                return Err(DeployError::new(
                    ErrorKind::ClusterCommandFailed,
                    format!("service {service} selects an unrecognized color: {e}"),
                ));
            }
            Err(e) => {
                tracing::warn!(attempt, attempts, service = %service, "failed to read active color: {}", e);
                last_error = Some(e);
            }
        }
        if attempt < attempts {
            cancel.sleep(Phase::Init, retry.retry_backoff * attempt).await?;
        }
    }

    Err(DeployError::new(
        ErrorKind::ClusterUnreachable,
        format!(
            "could not read the selector of service {service} after {attempts} attempts: {}",
            last_error.map(|e| e.to_string()).unwrap_or_default()
        ),
    ))
}

/// Poll the health endpoint until it answers with the expected status.
pub(crate) async fn wait_healthy<C: ClusterClient + ?Sized>(
    cluster: &C,
    deployment: &DeploymentName,
    healthcheck: &HealthcheckConfig,
    record: &mut DeploymentRecord,
    cancel: &CancelSignal,
) -> Result<(), DeployError> {
    let probe = health_probe(healthcheck);
    let attempts = healthcheck.attempts.max(1);
    let mut last = String::from("no probe attempted");

    for attempt in 1..=attempts {
        record.set_health_check_attempts(attempt);
        match probe_once(cluster, deployment, &probe, cancel, Phase::HealthChecking).await? {
            Ok(result) if result.status == healthcheck.expected_status => {
                tracing::info!(
                    deployment = %deployment,
                    attempt,
                    latency_ms = result.latency.as_millis() as u64,
                    "health check passed"
                );
                return Ok(());
            }
            Ok(result) => last = format!("HTTP {}", result.status),
            Err(reason) => last = reason,
        }
        tracing::debug!(deployment = %deployment, attempt, attempts, "health probe failed: {}", last);

        if attempt < attempts {
            cancel.sleep(Phase::HealthChecking, healthcheck.interval).await?;
        }
    }

    Err(DeployError::new(
        ErrorKind::HealthCheckExhausted,
        format!(
            "{deployment} did not answer {} with HTTP {} after {attempts} attempts (last: {last})",
            healthcheck.path, healthcheck.expected_status
        ),
    ))
}

/// Point the service at `color` and confirm the change by reading it back.
///
/// A failed write is not trusted either way: the read-back decides.
pub(crate) async fn switch_selector<C: ClusterClient + ?Sized>(
    cluster: &C,
    service: &ServiceRef,
    color: DeploymentTarget,
    cutover: &CutoverConfig,
    cancel: &CancelSignal,
) -> Result<(), DeployError> {
    let phase = Phase::CuttingOver;
    if let Err(e) = cancel
        .guard(phase, cluster.set_service_selector(service, color))
        .await?
    {
        tracing::warn!(service = %service, color = %color, "selector write reported an error, verifying: {}", e);
    }

    let attempts = cutover.verify_attempts.max(1);
    let mut observed = String::new();
    for attempt in 1..=attempts {
        match cancel.guard(phase, cluster.get_active_color(service)).await? {
            Ok(Some(current)) if current == color => {
                tracing::info!(service = %service, color = %color, attempt, "selector verified");
                return Ok(());
            }
            Ok(Some(current)) => observed = format!("selector still on {current}"),
            Ok(None) => observed = "selector names no color".to_string(),
            Err(e) => observed = e.to_string(),
        }
        tracing::debug!(service = %service, attempt, attempts, "read-back mismatch: {}", observed);

        if attempt < attempts {
            cancel.sleep(phase, cutover.verify_interval).await?;
        }
    }

    Err(DeployError::new(
        ErrorKind::CutoverVerificationFailed,
        format!("could not confirm {service} selects {color} after {attempts} reads ({observed})"),
    ))
}

/// Observe `deployment` for the monitoring window. Never fails on what it sees.
pub(crate) async fn monitor<C: ClusterClient + ?Sized>(
    cluster: &C,
    deployment: &DeploymentName,
    healthcheck: &HealthcheckConfig,
    monitoring: &MonitoringConfig,
    diagnostics: &mut Diagnostics,
    cancel: &CancelSignal,
) -> Result<(), DeployError> {
    let phase = Phase::Monitoring;
    let probe = health_probe(healthcheck);
    let samples = monitoring.samples();
    let mut not_ready = 0u32;
    let mut last_counts = None;
    let mut probe_failures = 0u32;

    for sample in 1..=samples {
        cancel.sleep(phase, monitoring.interval).await?;

        match cancel.guard(phase, cluster.get_ready_replicas(deployment)).await? {
            Ok(counts) if counts.is_fully_ready() => {}
            Ok(counts) => {
                not_ready += 1;
                last_counts = Some(counts);
                tracing::debug!(deployment = %deployment, sample, ready = counts.ready, desired = counts.desired, "readiness mismatch");
            }
            Err(e) => {
                not_ready += 1;
                tracing::debug!(deployment = %deployment, sample, "failed to read replicas: {}", e);
            }
        }

        match probe_once(cluster, deployment, &probe, cancel, phase).await? {
            Ok(result) if result.status == healthcheck.expected_status => {}
            Ok(result) => {
                probe_failures += 1;
                tracing::debug!(deployment = %deployment, sample, status = result.status, "monitoring probe failed");
            }
            Err(reason) => {
                probe_failures += 1;
                tracing::debug!(deployment = %deployment, sample, "monitoring probe failed: {}", reason);
            }
        }
    }

    if not_ready > 0 {
        let detail = last_counts
            .map(|c| format!(", last seen {}/{} ready", c.ready, c.desired))
            .unwrap_or_default();
        diagnostics.warn(Warning::readiness_mismatch(format!(
            "{deployment} was not fully ready in {not_ready} of {samples} monitoring samples{detail}"
        )));
    }
    if probe_failures > 0 {
        diagnostics.warn(Warning::probe_failed(format!(
            "{deployment} failed {probe_failures} of {samples} health probes while monitored"
        )));
    }
    Ok(())
}

/// Scale the previous color to zero and, unless kept for rollback, delete it.
pub(crate) async fn decommission<C: ClusterClient + ?Sized>(
    cluster: &C,
    deployment: &DeploymentName,
    cleanup: &CleanupConfig,
    diagnostics: &mut Diagnostics,
    cancel: &CancelSignal,
) -> Result<(), DeployError> {
    let phase = Phase::CleaningUp;

    if let Err(e) = cancel.guard(phase, cluster.scale_deployment(deployment, 0)).await? {
        diagnostics.warn(Warning::cleanup(format!(
            "failed to scale {deployment} to zero: {e}"
        )));
    }

    if !cleanup.delete_previous {
        tracing::info!(deployment = %deployment, "keeping scaled-down deployment for rollback");
        return Ok(());
    }

    cancel.sleep(phase, cleanup.grace_period).await?;

    if let Err(e) = cancel.guard(phase, cluster.delete_deployment(deployment)).await? {
        diagnostics.warn(Warning::cleanup(format!("failed to delete {deployment}: {e}")));
    }
    Ok(())
}
