// ABOUTME: State shared by every step of one run, whatever its typestate.
// ABOUTME: Also defines the terminal values a run resolves to.

use crate::config::Config;
use crate::diagnostics::Diagnostics;
use crate::types::{DeploymentName, DeploymentTarget, ServiceRef};

use super::{CancelSignal, DeployError, DeploymentRecord, Phase};

/// Result type for transitions: the next state, or the run's failed end.
pub type TransitionResult<T> = Result<T, Aborted>;

pub(crate) struct RunContext {
    pub(crate) config: Config,
    pub(crate) service: ServiceRef,
    pub(crate) record: DeploymentRecord,
    pub(crate) diagnostics: Diagnostics,
    pub(crate) cancel: CancelSignal,
}

impl RunContext {
    pub(crate) fn new(config: Config, record: DeploymentRecord, cancel: CancelSignal) -> Self {
        let service = config.service_for(record.app());
        Self {
            config,
            service,
            record,
            diagnostics: Diagnostics::default(),
            cancel,
        }
    }

    /// Deployment object hosting `color` for this run's app.
    pub(crate) fn deployment(&self, color: DeploymentTarget) -> DeploymentName {
        DeploymentName::for_color(self.record.app(), color)
    }

    pub(crate) fn abort(mut self, error: DeployError) -> Aborted {
        tracing::error!(
            phase = %self.record.phase(),
            kind = %error.kind(),
            "{}",
            error.message()
        );
        self.record.fail(&error);
        Aborted {
            record: self.record,
            diagnostics: self.diagnostics,
            error,
        }
    }

    pub(crate) fn finish(mut self, terminal: Phase) -> Finished {
        self.record.enter(terminal);
        Finished {
            record: self.record,
            diagnostics: self.diagnostics,
        }
    }
}

/// A run that ended in `Succeeded` or `RolledBack`.
#[derive(Debug)]
pub struct Finished {
    pub record: DeploymentRecord,
    pub diagnostics: Diagnostics,
}

/// A run that ended in `Failed`. No compensating action was taken.
#[derive(Debug)]
pub struct Aborted {
    pub record: DeploymentRecord,
    pub diagnostics: Diagnostics,
    pub error: DeployError,
}
