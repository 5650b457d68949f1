// ABOUTME: Mutable bookkeeping for one orchestration run.
// ABOUTME: Owned by a single run; becomes the audit record at its terminal phase.

use chrono::{DateTime, Utc};
use serde::Serialize;
use std::fmt;

use super::{DeployError, ErrorKind, Phase};
use crate::types::{
    DeploymentTarget, Environment, ReleaseDescriptor, ReleaseVersion, ResourceName,
    RollbackRequest,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Operation {
    Deploy,
    Rollback,
}

impl fmt::Display for Operation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Operation::Deploy => "deploy",
            Operation::Rollback => "rollback",
        })
    }
}

/// State of a run in progress.
#[derive(Debug, Clone)]
pub struct DeploymentRecord {
    operation: Operation,
    environment: Environment,
    namespace: ResourceName,
    app: ResourceName,
    release: Option<ReleaseDescriptor>,
    from: Option<DeploymentTarget>,
    target: Option<DeploymentTarget>,
    phase: Phase,
    started_at: DateTime<Utc>,
    health_check_attempts: u32,
    last_error: Option<ErrorKind>,
    failed_in: Option<Phase>,
    skip_tests: bool,
    forced: bool,
}

impl DeploymentRecord {
    pub(crate) fn for_release(release: &ReleaseDescriptor, skip_tests: bool) -> Self {
        Self {
            operation: Operation::Deploy,
            environment: release.environment(),
            namespace: release.namespace().clone(),
            app: release.app().clone(),
            release: Some(release.clone()),
            from: None,
            target: None,
            phase: Phase::Init,
            started_at: Utc::now(),
            health_check_attempts: 0,
            last_error: None,
            failed_in: None,
            skip_tests,
            forced: false,
        }
    }

    pub(crate) fn for_rollback(request: &RollbackRequest) -> Self {
        Self {
            operation: Operation::Rollback,
            environment: request.environment,
            namespace: request.namespace.clone(),
            app: request.app.clone(),
            release: None,
            from: None,
            target: None,
            phase: Phase::Init,
            started_at: Utc::now(),
            health_check_attempts: 0,
            last_error: None,
            failed_in: None,
            skip_tests: false,
            forced: request.force,
        }
    }

    pub(crate) fn enter(&mut self, phase: Phase) {
        debug_assert!(
            self.phase.can_transition_to(phase),
            "illegal phase change {} -> {}",
            self.phase,
            phase
        );
        tracing::debug!(
            operation = %self.operation,
            from_phase = %self.phase,
            phase = %phase,
            "phase change"
        );
        self.phase = phase;
    }

    pub(crate) fn resolve(&mut self, from: Option<DeploymentTarget>, target: DeploymentTarget) {
        self.from = from;
        self.target = Some(target);
    }

    pub(crate) fn fail(&mut self, error: &DeployError) {
        self.last_error = Some(error.kind());
        if !self.phase.is_terminal() {
            self.failed_in = Some(self.phase);
            self.enter(Phase::Failed);
        }
    }

    pub(crate) fn set_health_check_attempts(&mut self, attempts: u32) {
        self.health_check_attempts = attempts;
    }

    pub fn operation(&self) -> Operation {
        self.operation
    }

    pub fn environment(&self) -> Environment {
        self.environment
    }

    pub fn namespace(&self) -> &ResourceName {
        &self.namespace
    }

    pub fn app(&self) -> &ResourceName {
        &self.app
    }

    pub fn release(&self) -> Option<&ReleaseDescriptor> {
        self.release.as_ref()
    }

    pub fn release_version(&self) -> Option<&ReleaseVersion> {
        self.release.as_ref().map(|r| r.version())
    }

    /// Color serving traffic when the run started.
    pub fn from(&self) -> Option<DeploymentTarget> {
        self.from
    }

    /// Color the run deploys into or rolls back to.
    pub fn target(&self) -> Option<DeploymentTarget> {
        self.target
    }

    pub fn phase(&self) -> Phase {
        self.phase
    }

    pub fn started_at(&self) -> DateTime<Utc> {
        self.started_at
    }

    pub fn health_check_attempts(&self) -> u32 {
        self.health_check_attempts
    }

    pub fn last_error(&self) -> Option<ErrorKind> {
        self.last_error
    }

    /// Phase that was running when the run failed.
    pub fn failed_in(&self) -> Option<Phase> {
        self.failed_in
    }

    pub fn skip_tests(&self) -> bool {
        self.skip_tests
    }

    pub fn forced(&self) -> bool {
        self.forced
    }
}
