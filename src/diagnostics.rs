// ABOUTME: Diagnostics accumulator for non-fatal warnings during a run.
// ABOUTME: Collects problems that must not change the outcome but should reach the operator.

/// Collects non-fatal warnings during a release or rollback.
#[derive(Debug, Clone, Default)]
pub struct Diagnostics {
    warnings: Vec<Warning>,
}

impl Diagnostics {
    /// Record a warning, auto-logging it via tracing.
    pub fn warn(&mut self, warning: Warning) {
        tracing::warn!(kind = ?warning.kind, "{}", warning.message);
        self.warnings.push(warning);
    }

    pub fn warnings(&self) -> &[Warning] {
        &self.warnings
    }

    pub fn has_warnings(&self) -> bool {
        !self.warnings.is_empty()
    }

    /// Whether a warning of `kind` was recorded.
    pub fn has(&self, kind: WarningKind) -> bool {
        self.warnings.iter().any(|w| w.kind == kind)
    }
}

/// A non-fatal warning collected during a run.
#[derive(Debug, Clone)]
pub struct Warning {
    pub kind: WarningKind,
    pub message: String,
}

impl Warning {
    fn new(kind: WarningKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
        }
    }

    pub fn cleanup(message: impl Into<String>) -> Self {
        Self::new(WarningKind::Cleanup, message)
    }

    pub fn readiness_mismatch(message: impl Into<String>) -> Self {
        Self::new(WarningKind::ReadinessMismatch, message)
    }

    pub fn probe_failed(message: impl Into<String>) -> Self {
        Self::new(WarningKind::ProbeFailed, message)
    }

    pub fn notification(message: impl Into<String>) -> Self {
        Self::new(WarningKind::Notification, message)
    }

    pub fn audit(message: impl Into<String>) -> Self {
        Self::new(WarningKind::Audit, message)
    }

    pub fn hook(message: impl Into<String>) -> Self {
        Self::new(WarningKind::Hook, message)
    }
}

/// Categories of warnings that can occur during a run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WarningKind {
    /// Scaling down or deleting the previous color failed.
    Cleanup,
    /// New active color was short of ready replicas while monitored.
    ReadinessMismatch,
    /// Health probes failed while monitored.
    ProbeFailed,
    Notification,
    Audit,
    /// A non-fatal hook exited with an error.
    Hook,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn diagnostics_starts_empty() {
        let diag = Diagnostics::default();
        assert!(!diag.has_warnings());
        assert!(diag.warnings().is_empty());
    }

    #[test]
    fn diagnostics_collects_warnings() {
        let mut diag = Diagnostics::default();

        diag.warn(Warning::cleanup("failed to delete gameforge-blue"));
        diag.warn(Warning::readiness_mismatch("2/3 ready"));

        assert!(diag.has_warnings());
        assert_eq!(diag.warnings().len(), 2);
        assert!(diag.has(WarningKind::Cleanup));
        assert!(!diag.has(WarningKind::Notification));
    }

    #[test]
    fn warning_constructors_set_correct_kind() {
        assert_eq!(Warning::probe_failed("x").kind, WarningKind::ProbeFailed);
        assert_eq!(Warning::notification("x").kind, WarningKind::Notification);
        assert_eq!(Warning::audit("x").kind, WarningKind::Audit);
        assert_eq!(Warning::hook("x").kind, WarningKind::Hook);
    }
}
