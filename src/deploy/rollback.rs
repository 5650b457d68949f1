// ABOUTME: Rollback workflow: switch traffic back to the inactive color.
// ABOUTME: Verifies the destination is healthy and confirmed before touching the selector.

use std::marker::PhantomData;
use std::time::Duration;

use crate::cluster::{ClusterClient, ClusterError};
use crate::config::Config;
use crate::diagnostics::Diagnostics;
use crate::types::{DeploymentName, DeploymentTarget, RollbackRequest};

use super::context::{Finished, RunContext, TransitionResult};
use super::state::{Confirmed, CutOver, Deployed, Healthy, Monitored, Pending, Resolved};
use super::{
    Aborted, CancelSignal, ConfirmationGate, DeployError, DeploymentRecord, ErrorKind, Phase,
    steps,
};

/// A rollback in progress, parameterized by its current state.
///
/// Rollbacks never delete the color they move away from. No rollback state
/// carries data, so the marker lives only in the type.
pub struct Rollback<S> {
    pub(crate) request: RollbackRequest,
    pub(crate) ctx: RunContext,
    state: PhantomData<S>,
}

impl<S> Rollback<S> {
    fn transition<T>(self, _next: T) -> Rollback<T> {
        Rollback {
            request: self.request,
            ctx: self.ctx,
            state: PhantomData,
        }
    }

    fn abort(self, error: DeployError) -> Aborted {
        self.ctx.abort(error)
    }

    pub fn request(&self) -> &RollbackRequest {
        &self.request
    }

    pub fn record(&self) -> &DeploymentRecord {
        &self.ctx.record
    }

    pub fn diagnostics(&self) -> &Diagnostics {
        &self.ctx.diagnostics
    }

    pub fn config(&self) -> &Config {
        &self.ctx.config
    }

    /// Color traffic is moving back to. Only meaningful once resolved.
    fn target(&self) -> DeploymentTarget {
        self.ctx
            .record
            .target()
            .unwrap_or(DeploymentTarget::Blue)
    }

    fn target_deployment(&self) -> DeploymentName {
        self.ctx.deployment(self.target())
    }
}

// =============================================================================
// Pending -> Resolved
// =============================================================================

impl Rollback<Pending> {
    pub fn new(request: RollbackRequest, config: Config, cancel: CancelSignal) -> Self {
        let record = DeploymentRecord::for_rollback(&request);
        Rollback {
            request,
            ctx: RunContext::new(config, record, cancel),
            state: PhantomData,
        }
    }

    /// Resolve the active color; the rollback targets the other one.
    ///
    /// # Errors
    ///
    /// `NoActiveColor` when the service selects no color at all.
    #[must_use = "rollback state must be used"]
    pub async fn init<C: ClusterClient + ?Sized>(
        mut self,
        cluster: &C,
    ) -> TransitionResult<Rollback<Resolved>> {
        let active = steps::resolve_active_color(
            cluster,
            &self.ctx.service,
            &self.ctx.config.cluster,
            &self.ctx.cancel,
        )
        .await;

        let active = match active {
            Ok(Some(active)) => active,
            Ok(None) => {
                let error = DeployError::new(
                    ErrorKind::NoActiveColor,
                    format!(
                        "service {} selects no color, nothing to roll back",
                        self.ctx.service
                    ),
                );
                return Err(self.abort(error));
            }
            Err(e) => return Err(self.abort(e)),
        };

        let target = active.opposite();
        self.ctx.record.resolve(Some(active), target);
        tracing::info!(active = %active, target = %target, "rolling back");
        Ok(self.transition(Resolved))
    }
}

// =============================================================================
// Resolved -> Deployed
// =============================================================================

impl Rollback<Resolved> {
    pub fn active_color(&self) -> DeploymentTarget {
        self.target().opposite()
    }

    pub fn target_color(&self) -> DeploymentTarget {
        self.target()
    }

    /// Bring a scaled-down target back to the configured replica count.
    ///
    /// A missing target is left for the health check to reject.
    #[must_use = "rollback state must be used"]
    pub async fn ensure_ready<C: ClusterClient + ?Sized>(
        mut self,
        cluster: &C,
    ) -> TransitionResult<Rollback<Deployed>> {
        let deployment = self.target_deployment();
        let counts = self
            .ctx
            .cancel
            .guard(Phase::Init, cluster.get_ready_replicas(&deployment))
            .await;

        let counts = match counts {
            Ok(Ok(counts)) => counts,
            Ok(Err(ClusterError::NotFound { .. })) => {
                tracing::warn!(deployment = %deployment, "rollback target does not exist");
                return Ok(self.transition(Deployed));
            }
            Ok(Err(e)) => {
                let error = DeployError::from_cluster(&e, &format!("read replicas of {deployment}"));
                return Err(self.abort(error));
            }
            Err(cancelled) => return Err(self.abort(cancelled)),
        };
        if counts.desired > 0 {
            return Ok(self.transition(Deployed));
        }

        self.ctx.record.enter(Phase::DeployingInactive);
        let replicas = self.ctx.config.replicas.max(1);
        let timeout = self.ctx.config.timeout;
        tracing::info!(deployment = %deployment, replicas, "restoring scaled-down rollback target");

        let restored = restore(cluster, &deployment, replicas, timeout, &self.ctx.cancel).await;
        match restored {
            Ok(()) => Ok(self.transition(Deployed)),
            Err(e) => Err(self.abort(e)),
        }
    }
}

async fn restore<C: ClusterClient + ?Sized>(
    cluster: &C,
    deployment: &DeploymentName,
    replicas: u32,
    timeout: Duration,
    cancel: &CancelSignal,
) -> Result<(), DeployError> {
    let phase = Phase::DeployingInactive;
    cancel
        .guard(phase, cluster.scale_deployment(deployment, replicas))
        .await?
        .map_err(|e| DeployError::from_cluster(&e, &format!("scale {deployment}")))?;

    let wait = tokio::time::timeout(timeout, cluster.wait_for_ready(deployment, timeout));
    match cancel.guard(phase, wait).await? {
        Ok(Ok(())) => Ok(()),
        Ok(Err(ClusterError::Timeout { .. })) | Err(_) => Err(DeployError::new(
            ErrorKind::DeploymentTimeout,
            format!("{deployment} was not ready within {}s", timeout.as_secs()),
        )),
        Ok(Err(e)) => Err(DeployError::from_cluster(&e, &format!("wait for {deployment}"))),
    }
}

// =============================================================================
// Deployed -> Healthy
// =============================================================================

impl Rollback<Deployed> {
    /// Refuse to roll back into a color that is not healthy itself.
    #[must_use = "rollback state must be used"]
    pub async fn health_check<C: ClusterClient + ?Sized>(
        mut self,
        cluster: &C,
    ) -> TransitionResult<Rollback<Healthy>> {
        self.ctx.record.enter(Phase::HealthChecking);
        let deployment = self.target_deployment();
        let result = steps::wait_healthy(
            cluster,
            &deployment,
            &self.ctx.config.healthcheck,
            &mut self.ctx.record,
            &self.ctx.cancel,
        )
        .await;

        match result {
            Ok(()) => Ok(self.transition(Healthy)),
            Err(e) => Err(self.abort(e)),
        }
    }
}

// =============================================================================
// Healthy -> Confirmed
// =============================================================================

impl Rollback<Healthy> {
    /// Ask the operator to approve the cutover unless the rollback is forced.
    #[must_use = "rollback state must be used"]
    pub async fn confirm(
        self,
        gate: &dyn ConfirmationGate,
    ) -> TransitionResult<Rollback<Confirmed>> {
        if self.request.force {
            tracing::info!("rollback forced, skipping confirmation");
            return Ok(self.transition(Confirmed));
        }

        let prompt = format!(
            "Switch {} in {} ({}) from {} to {}?",
            self.request.app,
            self.request.namespace,
            self.request.environment,
            self.target().opposite(),
            self.target()
        );
        let answer = self
            .ctx
            .cancel
            .guard(Phase::HealthChecking, gate.confirm(&prompt))
            .await;

        match answer {
            Ok(true) => Ok(self.transition(Confirmed)),
            Ok(false) => {
                let error = DeployError::new(ErrorKind::Cancelled, "rollback declined by operator");
                Err(self.abort(error))
            }
            Err(cancelled) => Err(self.abort(cancelled)),
        }
    }
}

// =============================================================================
// Confirmed -> CutOver
// =============================================================================

impl Rollback<Confirmed> {
    #[must_use = "rollback state must be used"]
    pub async fn cutover<C: ClusterClient + ?Sized>(
        mut self,
        cluster: &C,
    ) -> TransitionResult<Rollback<CutOver>> {
        self.ctx.record.enter(Phase::CuttingOver);
        let result = steps::switch_selector(
            cluster,
            &self.ctx.service,
            self.target(),
            &self.ctx.config.cutover,
            &self.ctx.cancel,
        )
        .await;

        match result {
            Ok(()) => Ok(self.transition(CutOver)),
            Err(e) => Err(self.abort(e)),
        }
    }
}

// =============================================================================
// CutOver -> Monitored
// =============================================================================

impl Rollback<CutOver> {
    #[must_use = "rollback state must be used"]
    pub async fn monitor<C: ClusterClient + ?Sized>(
        mut self,
        cluster: &C,
    ) -> TransitionResult<Rollback<Monitored>> {
        self.ctx.record.enter(Phase::Monitoring);
        let deployment = self.target_deployment();
        let ctx = &mut self.ctx;
        let result = steps::monitor(
            cluster,
            &deployment,
            &ctx.config.healthcheck,
            &ctx.config.monitoring,
            &mut ctx.diagnostics,
            &ctx.cancel,
        )
        .await;

        match result {
            Ok(()) => Ok(self.transition(Monitored)),
            Err(e) => Err(self.abort(e)),
        }
    }
}

// =============================================================================
// Monitored - Terminal State
// =============================================================================

impl Rollback<Monitored> {
    /// Consume the rollback and mark the run as rolled back.
    pub fn finish(self) -> Finished {
        self.ctx.finish(Phase::RolledBack)
    }
}
