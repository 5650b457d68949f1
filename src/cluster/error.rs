// ABOUTME: Control-plane error types with SNAFU context selectors.
// ABOUTME: Classifies kubectl failures so callers can decide what is worth retrying.

use snafu::Snafu;

#[derive(Debug, Snafu)]
#[snafu(visibility(pub(crate)))]
pub enum ClusterError {
    #[snafu(display("failed to run {program}: {source}"))]
    Spawn {
        program: String,
        source: std::io::Error,
    },

    #[snafu(display("control plane unreachable: {message}"))]
    Unreachable { message: String },

    #[snafu(display("not found: {resource}"))]
    NotFound { resource: String },

    #[snafu(display("timed out: {operation}"))]
    Timeout { operation: String },

    #[snafu(display("`{command}` failed: {stderr}"))]
    CommandFailed { command: String, stderr: String },

    #[snafu(display("unexpected output from `{command}`: {detail}"))]
    UnexpectedOutput { command: String, detail: String },

    #[snafu(display("invalid JSON from `{command}`: {source}"))]
    Json {
        command: String,
        source: serde_json::Error,
    },
}

impl ClusterError {
    /// Whether retrying the same call might succeed.
    pub fn is_transient(&self) -> bool {
        matches!(
            self,
            ClusterError::Unreachable { .. } | ClusterError::Timeout { .. }
        )
    }

    /// Classify a failed kubectl invocation from its stderr.
    pub(crate) fn from_stderr(command: String, stderr: &str) -> Self {
        let stderr = stderr.trim();
        let lower = stderr.to_lowercase();
        if lower.contains("unable to connect to the server")
            || lower.contains("connection refused")
            || lower.contains("i/o timeout")
            || lower.contains("tls handshake timeout")
            || lower.contains("no route to host")
        {
            ClusterError::Unreachable {
                message: stderr.to_string(),
            }
        } else if lower.contains("timed out waiting") {
            ClusterError::Timeout { operation: command }
        } else if lower.contains("(notfound)") || lower.contains(" not found") {
            ClusterError::NotFound {
                resource: stderr.to_string(),
            }
        } else {
            ClusterError::CommandFailed {
                command,
                stderr: stderr.to_string(),
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn classifies_unreachable_api_server() {
        let err = ClusterError::from_stderr(
            "kubectl get service web".into(),
            "Unable to connect to the server: dial tcp 10.0.0.1:6443: connect: connection refused",
        );
        assert!(matches!(err, ClusterError::Unreachable { .. }));
        assert!(err.is_transient());
    }

    #[test]
    fn classifies_missing_objects() {
        let err = ClusterError::from_stderr(
            "kubectl get deployment web-blue".into(),
            "Error from server (NotFound): deployments.apps \"web-blue\" not found",
        );
        assert!(matches!(err, ClusterError::NotFound { .. }));
        assert!(!err.is_transient());
    }

    #[test]
    fn classifies_rollout_timeouts() {
        let err = ClusterError::from_stderr(
            "kubectl rollout status deployment/web-green".into(),
            "error: timed out waiting for the condition",
        );
        assert!(matches!(err, ClusterError::Timeout { .. }));
    }

    #[test]
    fn everything_else_is_a_command_failure() {
        let err = ClusterError::from_stderr(
            "kubectl apply -f -".into(),
            "error: error validating data: unknown field \"replica\"",
        );
        assert!(matches!(err, ClusterError::CommandFailed { .. }));
        assert!(!err.is_transient());
    }
}
