// ABOUTME: Hooks system for release lifecycle events.
// ABOUTME: Discovers and executes project scripts before and after releases and rollbacks.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::process::Stdio;
use tokio::process::Command;

use crate::deploy::{DeploymentRecord, Phase};
use crate::types::{DeploymentTarget, Environment, ResourceName};

/// Hook execution points in the release lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HookPoint {
    /// Before any cluster write. Failure aborts the release.
    PreDeploy,
    /// After a successful release. Failure logs warning.
    PostDeploy,
    /// After a failed release or rollback. Failure logs warning.
    OnError,
    /// After a successful rollback. Failure logs warning.
    PostRollback,
}

impl HookPoint {
    pub fn filename(&self) -> &'static str {
        match self {
            HookPoint::PreDeploy => "pre-deploy",
            HookPoint::PostDeploy => "post-deploy",
            HookPoint::OnError => "on-error",
            HookPoint::PostRollback => "post-rollback",
        }
    }

    /// Whether failure at this hook point should abort the operation.
    pub fn is_fatal(&self) -> bool {
        matches!(self, HookPoint::PreDeploy)
    }

    /// Hook to run once a run reached `outcome`.
    pub fn after(outcome: Phase) -> Option<Self> {
        match outcome {
            Phase::Succeeded => Some(HookPoint::PostDeploy),
            Phase::RolledBack => Some(HookPoint::PostRollback),
            Phase::Failed => Some(HookPoint::OnError),
            _ => None,
        }
    }
}

/// Context passed to hooks via `CUTOVER_*` environment variables.
#[derive(Debug, Clone)]
pub struct HookContext {
    pub app: ResourceName,
    pub namespace: ResourceName,
    pub environment: Environment,
    pub operation: String,
    pub version: Option<String>,
    pub from_color: Option<DeploymentTarget>,
    pub to_color: Option<DeploymentTarget>,
    pub outcome: Option<String>,
    pub error_kind: Option<String>,
}

impl HookContext {
    /// Context for a run that has not touched the cluster yet.
    pub fn before(
        operation: &str,
        app: &ResourceName,
        namespace: &ResourceName,
        environment: Environment,
        version: Option<String>,
    ) -> Self {
        HookContext {
            app: app.clone(),
            namespace: namespace.clone(),
            environment,
            operation: operation.to_string(),
            version,
            from_color: None,
            to_color: None,
            outcome: None,
            error_kind: None,
        }
    }

    /// Context for a run that reached a terminal phase.
    pub fn from_record(record: &DeploymentRecord) -> Self {
        HookContext {
            app: record.app().clone(),
            namespace: record.namespace().clone(),
            environment: record.environment(),
            operation: record.operation().to_string(),
            version: record.release_version().map(|v| v.to_string()),
            from_color: record.from(),
            to_color: record.target(),
            outcome: Some(record.phase().to_string()),
            error_kind: record.last_error().map(|k| k.to_string()),
        }
    }

    pub fn to_env(&self) -> HashMap<String, String> {
        let mut env = HashMap::new();
        env.insert("CUTOVER_APP".to_string(), self.app.to_string());
        env.insert("CUTOVER_NAMESPACE".to_string(), self.namespace.to_string());
        env.insert(
            "CUTOVER_ENVIRONMENT".to_string(),
            self.environment.to_string(),
        );
        env.insert("CUTOVER_OPERATION".to_string(), self.operation.clone());
        if let Some(ref version) = self.version {
            env.insert("CUTOVER_VERSION".to_string(), version.clone());
        }
        if let Some(color) = self.from_color {
            env.insert("CUTOVER_FROM_COLOR".to_string(), color.to_string());
        }
        if let Some(color) = self.to_color {
            env.insert("CUTOVER_TO_COLOR".to_string(), color.to_string());
        }
        if let Some(ref outcome) = self.outcome {
            env.insert("CUTOVER_OUTCOME".to_string(), outcome.clone());
        }
        if let Some(ref kind) = self.error_kind {
            env.insert("CUTOVER_ERROR_KIND".to_string(), kind.clone());
        }
        env
    }
}

/// Result of running a hook.
#[derive(Debug)]
pub struct HookResult {
    pub success: bool,
    pub exit_code: Option<i32>,
    pub stdout: String,
    pub stderr: String,
}

/// Discovers and runs hooks from `<project>/.cutover/hooks`.
pub struct HookRunner {
    hooks_dir: PathBuf,
}

impl HookRunner {
    pub fn new(project_dir: &Path) -> Self {
        Self {
            hooks_dir: project_dir.join(".cutover").join("hooks"),
        }
    }

    pub fn hook_exists(&self, point: HookPoint) -> bool {
        self.hook_path(point).is_file()
    }

    fn hook_path(&self, point: HookPoint) -> PathBuf {
        self.hooks_dir.join(point.filename())
    }

    /// Run a hook if it exists.
    ///
    /// Returns None if the hook doesn't exist, or Some(HookResult) if it was run.
    pub async fn run(&self, point: HookPoint, context: &HookContext) -> Option<HookResult> {
        let hook_path = self.hook_path(point);

        if !hook_path.is_file() {
            return None;
        }

        tracing::info!("Running {} hook: {}", point.filename(), hook_path.display());

        let output = Command::new(&hook_path)
            .envs(context.to_env())
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .output()
            .await;

        match output {
            Ok(output) => {
                let result = HookResult {
                    success: output.status.success(),
                    exit_code: output.status.code(),
                    stdout: String::from_utf8_lossy(&output.stdout).to_string(),
                    stderr: String::from_utf8_lossy(&output.stderr).to_string(),
                };

                if result.success {
                    tracing::info!("{} hook completed successfully", point.filename());
                } else {
                    tracing::warn!(
                        "{} hook failed with exit code {:?}",
                        point.filename(),
                        result.exit_code
                    );
                }

                Some(result)
            }
            Err(e) => {
                tracing::error!("Failed to execute {} hook: {}", point.filename(), e);
                Some(HookResult {
                    success: false,
                    exit_code: None,
                    stdout: String::new(),
                    stderr: e.to_string(),
                })
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn context() -> HookContext {
        HookContext {
            app: ResourceName::new("gameforge").unwrap(),
            namespace: ResourceName::new("games").unwrap(),
            environment: Environment::Production,
            operation: "deploy".to_string(),
            version: Some("v2.0.0".to_string()),
            from_color: Some(DeploymentTarget::Blue),
            to_color: Some(DeploymentTarget::Green),
            outcome: None,
            error_kind: None,
        }
    }

    #[test]
    fn hook_point_filenames() {
        assert_eq!(HookPoint::PreDeploy.filename(), "pre-deploy");
        assert_eq!(HookPoint::PostRollback.filename(), "post-rollback");
    }

    #[test]
    fn only_pre_deploy_is_fatal() {
        assert!(HookPoint::PreDeploy.is_fatal());
        assert!(!HookPoint::PostDeploy.is_fatal());
        assert!(!HookPoint::OnError.is_fatal());
        assert!(!HookPoint::PostRollback.is_fatal());
    }

    #[test]
    fn terminal_phases_pick_a_hook() {
        assert_eq!(HookPoint::after(Phase::Succeeded), Some(HookPoint::PostDeploy));
        assert_eq!(HookPoint::after(Phase::RolledBack), Some(HookPoint::PostRollback));
        assert_eq!(HookPoint::after(Phase::Failed), Some(HookPoint::OnError));
        assert_eq!(HookPoint::after(Phase::Monitoring), None);
    }

    #[test]
    fn hook_context_to_env() {
        let env = context().to_env();
        assert_eq!(env.get("CUTOVER_APP"), Some(&"gameforge".to_string()));
        assert_eq!(env.get("CUTOVER_NAMESPACE"), Some(&"games".to_string()));
        assert_eq!(env.get("CUTOVER_ENVIRONMENT"), Some(&"production".to_string()));
        assert_eq!(env.get("CUTOVER_VERSION"), Some(&"v2.0.0".to_string()));
        assert_eq!(env.get("CUTOVER_FROM_COLOR"), Some(&"blue".to_string()));
        assert_eq!(env.get("CUTOVER_TO_COLOR"), Some(&"green".to_string()));
        assert!(!env.contains_key("CUTOVER_ERROR_KIND"));
    }

    #[test]
    fn hook_runner_checks_hooks_dir() {
        let runner = HookRunner::new(Path::new("/nonexistent"));
        assert!(!runner.hook_exists(HookPoint::PreDeploy));
    }
}
