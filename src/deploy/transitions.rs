// ABOUTME: State transition methods for the release workflow.
// ABOUTME: Each method consumes self and returns the next state, or the aborted run.

use crate::cluster::{ClusterClient, ClusterError, DeploymentManifest};
use crate::config::Config;
use crate::diagnostics::Diagnostics;
use crate::types::{DeploymentName, DeploymentTarget, ReleaseDescriptor};

use super::context::{Finished, RunContext, TransitionResult};
use super::error::ClusterResultExt;
use super::smoke::run_smoke_tests;
use super::state::{
    Completed, CutOver, Deployed, Healthy, Monitored, Pending, Resolved, Tested,
};
use super::{
    CancelSignal, DeployError, DeploymentRecord, ErrorKind, Phase, SmokeOutcome, steps,
};

/// A release in progress, parameterized by its current state.
pub struct Release<S> {
    pub(crate) release: ReleaseDescriptor,
    pub(crate) ctx: RunContext,
    pub(crate) state: S,
}

// =============================================================================
// Internal Helpers
// =============================================================================

impl<S> Release<S> {
    fn transition<T>(self, state: T) -> Release<T> {
        Release {
            release: self.release,
            ctx: self.ctx,
            state,
        }
    }

    fn abort(self, error: DeployError) -> super::Aborted {
        self.ctx.abort(error)
    }

    pub fn release(&self) -> &ReleaseDescriptor {
        &self.release
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

    /// Color being deployed into. Blue until the active color is resolved.
    fn target(&self) -> DeploymentTarget {
        DeploymentTarget::inactive_for(self.ctx.record.from())
    }

    fn target_deployment(&self) -> DeploymentName {
        self.ctx.deployment(self.target())
    }
}

// =============================================================================
// Pending -> Resolved
// =============================================================================

impl Release<Pending> {
    pub fn new(
        release: ReleaseDescriptor,
        config: Config,
        skip_tests: bool,
        cancel: CancelSignal,
    ) -> Self {
        let record = DeploymentRecord::for_release(&release, skip_tests);
        Release {
            release,
            ctx: RunContext::new(config, record, cancel),
            state: Pending,
        }
    }

    /// Resolve which color serves traffic; the other one is the target.
    #[must_use = "deployment state must be used"]
    pub async fn init<C: ClusterClient + ?Sized>(
        mut self,
        cluster: &C,
    ) -> TransitionResult<Release<Resolved>> {
        let active = match steps::resolve_active_color(
            cluster,
            &self.ctx.service,
            &self.ctx.config.cluster,
            &self.ctx.cancel,
        )
        .await
        {
            Ok(active) => active,
            Err(e) => return Err(self.abort(e)),
        };

        let target = DeploymentTarget::inactive_for(active);
        self.ctx.record.resolve(active, target);
        match active {
            Some(active) => tracing::info!(active = %active, target = %target, "resolved colors"),
            None => tracing::info!(target = %target, "no active color, first release"),
        }
        Ok(self.transition(Resolved))
    }
}

// =============================================================================
// Resolved -> Deployed
// =============================================================================

impl Release<Resolved> {
    /// Color serving production traffic before this release.
    pub fn active_color(&self) -> Option<DeploymentTarget> {
        self.ctx.record.from()
    }

    pub fn target_color(&self) -> DeploymentTarget {
        self.target()
    }

    pub fn manifest(&self) -> DeploymentManifest {
        DeploymentManifest::for_release(&self.release, self.target(), &self.ctx.config)
    }

    /// Apply the manifest for the inactive color and wait for its rollout.
    ///
    /// # Errors
    ///
    /// `DeploymentTimeout` when the rollout is not ready within the release
    /// timeout; the production selector is left untouched.
    #[must_use = "deployment state must be used"]
    pub async fn deploy_inactive<C: ClusterClient + ?Sized>(
        mut self,
        cluster: &C,
    ) -> TransitionResult<Release<Deployed>> {
        self.ctx.record.enter(Phase::DeployingInactive);
        let manifest = self.manifest();
        let timeout = self.release.timeout();

        let applied = self
            .ctx
            .cancel
            .guard(Phase::DeployingInactive, cluster.apply_deployment(&manifest))
            .await
            .and_then(|r| r.or_deploy_error(&format!("apply {}", manifest.name)));
        if let Err(e) = applied {
            return Err(self.abort(e));
        }
        tracing::info!(deployment = %manifest.name, image = %manifest.image(), "manifest applied");

        let wait = tokio::time::timeout(timeout, cluster.wait_for_ready(&manifest.name, timeout));
        let waited = match self.ctx.cancel.guard(Phase::DeployingInactive, wait).await {
            Ok(Ok(Ok(()))) => Ok(()),
            Ok(Ok(Err(ClusterError::Timeout { .. }))) | Ok(Err(_)) => Err(DeployError::new(
                ErrorKind::DeploymentTimeout,
                format!(
                    "{} was not ready within {}s",
                    manifest.name,
                    timeout.as_secs()
                ),
            )),
            Ok(Ok(Err(e))) => Err(DeployError::from_cluster(
                &e,
                &format!("wait for {}", manifest.name),
            )),
            Err(cancelled) => Err(cancelled),
        };
        if let Err(e) = waited {
            return Err(self.abort(e));
        }

        Ok(self.transition(Deployed))
    }
}

// =============================================================================
// Deployed -> Healthy
// =============================================================================

impl Release<Deployed> {
    /// Poll the new color's health endpoint within the attempt budget.
    #[must_use = "deployment state must be used"]
    pub async fn health_check<C: ClusterClient + ?Sized>(
        mut self,
        cluster: &C,
    ) -> TransitionResult<Release<Healthy>> {
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
// Healthy -> Tested
// =============================================================================

impl Release<Healthy> {
    /// Run the configured smoke tests against the new color.
    #[must_use = "deployment state must be used"]
    pub async fn smoke_test<C: ClusterClient + ?Sized>(
        mut self,
        cluster: &C,
    ) -> TransitionResult<Release<Tested>> {
        self.ctx.record.enter(Phase::Testing);
        let deployment = self.target_deployment();
        let config = &self.ctx.config;

        if config.smoke_tests.is_empty() {
            tracing::info!("no smoke tests configured");
            return Ok(self.transition(Tested::default()));
        }

        let suite = run_smoke_tests(
            cluster,
            &deployment,
            &config.smoke_tests,
            &config.healthcheck,
            &config.smoke,
            &self.ctx.cancel,
        );
        let finished = self.ctx.cancel.guard(Phase::Testing, suite).await;
        let outcomes = match finished {
            Ok(outcomes) => outcomes,
            Err(e) => return Err(self.abort(e)),
        };
        if let Err(e) = self.ctx.cancel.check(Phase::Testing) {
            return Err(self.abort(e));
        }

        let failed: Vec<String> = outcomes
            .iter()
            .filter(|o| !o.passed)
            .map(SmokeOutcome::describe)
            .collect();
        if !failed.is_empty() {
            let error = DeployError::new(
                ErrorKind::SmokeTestFailed,
                format!(
                    "{} of {} smoke tests failed: {}",
                    failed.len(),
                    outcomes.len(),
                    failed.join(", ")
                ),
            );
            return Err(self.abort(error));
        }

        Ok(self.transition(Tested { outcomes }))
    }

    /// Skip the smoke tests. The choice is kept in the record.
    #[must_use = "deployment state must be used"]
    pub fn skip_tests(self) -> Release<Tested> {
        tracing::warn!(deployment = %self.target_deployment(), "smoke tests skipped by operator");
        self.transition(Tested::default())
    }
}

// =============================================================================
// Tested -> CutOver
// =============================================================================

impl Release<Tested> {
    pub fn smoke_outcomes(&self) -> &[SmokeOutcome] {
        &self.state.outcomes
    }

    /// Switch the production selector to the new color and verify it.
    #[must_use = "deployment state must be used"]
    pub async fn cutover<C: ClusterClient + ?Sized>(
        mut self,
        cluster: &C,
    ) -> TransitionResult<Release<CutOver>> {
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

impl Release<CutOver> {
    /// Watch the new active color. Problems become warnings, not failures.
    #[must_use = "deployment state must be used"]
    pub async fn monitor<C: ClusterClient + ?Sized>(
        mut self,
        cluster: &C,
    ) -> TransitionResult<Release<Monitored>> {
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
// Monitored -> Completed
// =============================================================================

impl Release<Monitored> {
    /// Decommission the previously active color, if there was one.
    ///
    /// Cleanup problems are recorded as warnings; the release still succeeds.
    #[must_use = "deployment state must be used"]
    pub async fn cleanup<C: ClusterClient + ?Sized>(
        mut self,
        cluster: &C,
    ) -> TransitionResult<Release<Completed>> {
        self.ctx.record.enter(Phase::CleaningUp);
        let Some(previous) = self.ctx.record.from() else {
            tracing::info!("first release, nothing to clean up");
            return Ok(self.transition(Completed));
        };

        let deployment = self.ctx.deployment(previous);
        let ctx = &mut self.ctx;
        let result = steps::decommission(
            cluster,
            &deployment,
            &ctx.config.cleanup,
            &mut ctx.diagnostics,
            &ctx.cancel,
        )
        .await;

        match result {
            Ok(()) => Ok(self.transition(Completed)),
            Err(e) => Err(self.abort(e)),
        }
    }
}

// =============================================================================
// Completed - Terminal State
// =============================================================================

impl Release<Completed> {
    /// Consume the release and mark the run as succeeded.
    pub fn finish(self) -> Finished {
        self.ctx.finish(Phase::Succeeded)
    }
}
