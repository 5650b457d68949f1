// ABOUTME: Error kinds and the error type surfaced by blue/green runs.
// ABOUTME: Maps control-plane failures onto the kind of the phase they happened in.

use serde::{Deserialize, Serialize};
use std::fmt;

use super::Phase;
use crate::cluster::ClusterError;

/// Why a run ended in `Failed`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    /// Control plane unavailable after the retry budget.
    ClusterUnreachable,
    /// Control plane answered but rejected the request.
    ClusterCommandFailed,
    /// New color never became ready within the release timeout.
    DeploymentTimeout,
    HealthCheckExhausted,
    SmokeTestFailed,
    /// Selector write could not be confirmed by reading it back.
    CutoverVerificationFailed,
    Cancelled,
    InvalidArguments,
    /// Rollback requested but the service selects no color.
    NoActiveColor,
}

impl ErrorKind {
    pub fn as_str(self) -> &'static str {
        match self {
            ErrorKind::ClusterUnreachable => "cluster_unreachable",
            ErrorKind::ClusterCommandFailed => "cluster_command_failed",
            ErrorKind::DeploymentTimeout => "deployment_timeout",
            ErrorKind::HealthCheckExhausted => "health_check_exhausted",
            ErrorKind::SmokeTestFailed => "smoke_test_failed",
            ErrorKind::CutoverVerificationFailed => "cutover_verification_failed",
            ErrorKind::Cancelled => "cancelled",
            ErrorKind::InvalidArguments => "invalid_arguments",
            ErrorKind::NoActiveColor => "no_active_color",
        }
    }
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A failed run: the error kind plus a human-readable explanation.
#[derive(Debug, Clone, thiserror::Error)]
#[error("{kind}: {message}")]
pub struct DeployError {
    kind: ErrorKind,
    message: String,
}

impl DeployError {
    pub fn new(kind: ErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
        }
    }

    pub fn cancelled(phase: Phase) -> Self {
        Self::new(ErrorKind::Cancelled, format!("cancelled during {phase}"))
    }

    pub fn kind(&self) -> ErrorKind {
        self.kind
    }

    pub fn message(&self) -> &str {
        &self.message
    }

    /// Classify a control-plane error that ended a phase.
    pub fn from_cluster(err: &ClusterError, action: &str) -> Self {
        let kind = match err {
            ClusterError::Unreachable { .. } | ClusterError::Spawn { .. } => {
                ErrorKind::ClusterUnreachable
            }
            ClusterError::Timeout { .. } => ErrorKind::DeploymentTimeout,
            _ => ErrorKind::ClusterCommandFailed,
        };
        Self::new(kind, format!("{action}: {err}"))
    }
}

/// Extension trait for converting cluster results into phase errors.
pub trait ClusterResultExt<T> {
    fn or_deploy_error(self, action: &str) -> Result<T, DeployError>;
}

impl<T> ClusterResultExt<T> for Result<T, ClusterError> {
    fn or_deploy_error(self, action: &str) -> Result<T, DeployError> {
        self.map_err(|e| DeployError::from_cluster(&e, action))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn kinds_serialize_as_snake_case() {
        let json = serde_json::to_string(&ErrorKind::CutoverVerificationFailed).unwrap();
        assert_eq!(json, "\"cutover_verification_failed\"");
        assert_eq!(ErrorKind::HealthCheckExhausted.to_string(), "health_check_exhausted");
    }

    #[test]
    fn cluster_errors_are_classified() {
        let unreachable = ClusterError::Unreachable {
            message: "connection refused".into(),
        };
        assert_eq!(
            DeployError::from_cluster(&unreachable, "apply").kind(),
            ErrorKind::ClusterUnreachable
        );

        let rejected: Result<(), ClusterError> = Err(ClusterError::CommandFailed {
            command: "kubectl apply -f -".into(),
            stderr: "admission webhook denied the request".into(),
        });
        let err = rejected.or_deploy_error("apply manifest").unwrap_err();
        assert_eq!(err.kind(), ErrorKind::ClusterCommandFailed);
        assert!(err.message().starts_with("apply manifest:"));
    }
}
