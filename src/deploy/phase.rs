// ABOUTME: Runtime phase of a release or rollback run.
// ABOUTME: Encodes the legal phase graph so records can only move forward.

use serde::Serialize;
use std::fmt;

/// Where a run currently is in the blue/green state machine.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Phase {
    Init,
    DeployingInactive,
    HealthChecking,
    Testing,
    CuttingOver,
    Monitoring,
    CleaningUp,
    Succeeded,
    Failed,
    RolledBack,
}

impl Phase {
    pub const ALL: [Phase; 10] = [
        Phase::Init,
        Phase::DeployingInactive,
        Phase::HealthChecking,
        Phase::Testing,
        Phase::CuttingOver,
        Phase::Monitoring,
        Phase::CleaningUp,
        Phase::Succeeded,
        Phase::Failed,
        Phase::RolledBack,
    ];

    pub fn is_terminal(self) -> bool {
        matches!(self, Phase::Succeeded | Phase::Failed | Phase::RolledBack)
    }

    /// Whether a run in `self` may move to `next`.
    ///
    /// Forward edges follow the fixed phase order. `Testing` may be skipped,
    /// and rollbacks go from `Init` straight to `HealthChecking` when the
    /// target needs no restoring. Any non-terminal phase may end in `Failed`
    /// or `RolledBack`. Terminal phases are final.
    pub fn can_transition_to(self, next: Phase) -> bool {
        if self.is_terminal() {
            return false;
        }
        match (self, next) {
            (_, Phase::Failed | Phase::RolledBack) => true,
            (Phase::Init, Phase::DeployingInactive | Phase::HealthChecking) => true,
            (Phase::DeployingInactive, Phase::HealthChecking) => true,
            (Phase::HealthChecking, Phase::Testing | Phase::CuttingOver) => true,
            (Phase::Testing, Phase::CuttingOver) => true,
            (Phase::CuttingOver, Phase::Monitoring) => true,
            (Phase::Monitoring, Phase::CleaningUp) => true,
            (Phase::CleaningUp, Phase::Succeeded) => true,
            _ => false,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Phase::Init => "init",
            Phase::DeployingInactive => "deploying_inactive",
            Phase::HealthChecking => "health_checking",
            Phase::Testing => "testing",
            Phase::CuttingOver => "cutting_over",
            Phase::Monitoring => "monitoring",
            Phase::CleaningUp => "cleaning_up",
            Phase::Succeeded => "succeeded",
            Phase::Failed => "failed",
            Phase::RolledBack => "rolled_back",
        }
    }
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
