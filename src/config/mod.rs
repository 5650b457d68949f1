// ABOUTME: Configuration types and parsing for cutover.yml.
// ABOUTME: Handles YAML parsing, env var references, and per-environment overrides.

mod env_value;
mod healthcheck;
mod init;
mod phases;
mod smoke;

pub use env_value::EnvValue;
pub use healthcheck::HealthcheckConfig;
pub use init::init_config;
pub use phases::{ClusterConfig, CleanupConfig, CutoverConfig, MonitoringConfig};
pub use smoke::{SmokeConfig, SmokeTest};

use crate::error::{Error, Result};
use crate::types::{Environment, ResourceName, ServiceRef};
use serde::Deserialize;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::time::Duration;

pub const CONFIG_FILENAME: &str = "cutover.yml";
pub const CONFIG_FILENAME_ALT: &str = "cutover.yaml";
pub const CONFIG_FILENAME_DIR: &str = ".cutover/config.yml";

#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    /// Application name; `--app` takes precedence.
    #[serde(default)]
    pub app: Option<ResourceName>,

    /// Namespace; `--namespace` takes precedence.
    #[serde(default)]
    pub namespace: Option<ResourceName>,

    /// Image repository without tag; defaults to the app name.
    #[serde(default)]
    pub image: Option<String>,

    /// Production service whose selector routes traffic; defaults to the app name.
    #[serde(default)]
    pub service: Option<ResourceName>,

    #[serde(default = "default_replicas")]
    pub replicas: u32,

    /// Readiness budget for the new color; `--timeout` takes precedence.
    #[serde(default = "default_timeout", with = "humantime_serde")]
    pub timeout: Duration,

    #[serde(default)]
    pub healthcheck: HealthcheckConfig,

    #[serde(default)]
    pub smoke_tests: Vec<SmokeTest>,

    #[serde(default)]
    pub smoke: SmokeConfig,

    #[serde(default)]
    pub cutover: CutoverConfig,

    #[serde(default)]
    pub monitoring: MonitoringConfig,

    #[serde(default)]
    pub cleanup: CleanupConfig,

    #[serde(default)]
    pub cluster: ClusterConfig,

    #[serde(default)]
    pub notifications: NotificationsConfig,

    #[serde(default)]
    pub audit: AuditConfig,

    #[serde(default)]
    pub environments: HashMap<Environment, EnvironmentOverrides>,
}

/// Settings that differ between staging and production.
#[derive(Debug, Clone, Deserialize, Default)]
pub struct EnvironmentOverrides {
    #[serde(default)]
    pub namespace: Option<ResourceName>,

    #[serde(default)]
    pub replicas: Option<u32>,

    /// kubeconfig context for this environment.
    #[serde(default)]
    pub context: Option<String>,

    #[serde(default)]
    pub healthcheck: Option<HealthcheckConfig>,

    #[serde(default)]
    pub smoke_tests: Option<Vec<SmokeTest>>,

    #[serde(default)]
    pub monitoring: Option<MonitoringConfig>,

    #[serde(default)]
    pub webhook: Option<EnvValue>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct NotificationsConfig {
    /// HTTP endpoint receiving a JSON status message at every terminal state.
    #[serde(default)]
    pub webhook: Option<EnvValue>,

    /// Upper bound on one webhook delivery.
    #[serde(default = "default_webhook_timeout", with = "humantime_serde")]
    pub timeout: Duration,
}

impl Default for NotificationsConfig {
    fn default() -> Self {
        Self {
            webhook: None,
            timeout: default_webhook_timeout(),
        }
    }
}

fn default_webhook_timeout() -> Duration {
    Duration::from_secs(10)
}

#[derive(Debug, Clone, Deserialize)]
pub struct AuditConfig {
    #[serde(default = "default_audit_enabled")]
    pub enabled: bool,

    #[serde(default = "default_audit_dir")]
    pub dir: PathBuf,
}

impl Default for AuditConfig {
    fn default() -> Self {
        AuditConfig {
            enabled: default_audit_enabled(),
            dir: default_audit_dir(),
        }
    }
}

fn default_replicas() -> u32 {
    2
}

fn default_timeout() -> Duration {
    Duration::from_secs(300)
}

fn default_audit_enabled() -> bool {
    true
}

fn default_audit_dir() -> PathBuf {
    PathBuf::from(".cutover/audit")
}

impl Default for Config {
    fn default() -> Self {
        Config {
            app: None,
            namespace: None,
            image: None,
            service: None,
            replicas: default_replicas(),
            timeout: default_timeout(),
            healthcheck: HealthcheckConfig::default(),
            smoke_tests: Vec::new(),
            smoke: SmokeConfig::default(),
            cutover: CutoverConfig::default(),
            monitoring: MonitoringConfig::default(),
            cleanup: CleanupConfig::default(),
            cluster: ClusterConfig::default(),
            notifications: NotificationsConfig::default(),
            audit: AuditConfig::default(),
            environments: HashMap::new(),
        }
    }
}

impl Config {
    pub fn from_yaml(yaml: &str) -> Result<Self> {
        let config: Config = serde_yaml::from_str(yaml)?;
        config.validate()?;
        for environment in config.environments.keys() {
            config.for_environment(*environment)?;
        }
        Ok(config)
    }

    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        Self::from_yaml(&content)
    }

    /// Find a config file in `dir`, falling back to built-in defaults.
    pub fn discover(dir: &Path) -> Result<Self> {
        let candidates = [
            dir.join(CONFIG_FILENAME),
            dir.join(CONFIG_FILENAME_ALT),
            dir.join(CONFIG_FILENAME_DIR),
        ];

        for path in &candidates {
            if path.exists() {
                tracing::debug!("Loading configuration from {}", path.display());
                return Self::load(path);
            }
        }

        tracing::debug!("No configuration file in {}, using defaults", dir.display());
        Ok(Config::default())
    }

    /// Load an explicitly named config file, or discover one in `dir`.
    pub fn resolve(explicit: Option<&Path>, dir: &Path) -> Result<Self> {
        match explicit {
            Some(path) if !path.exists() => Err(Error::ConfigNotFound(path.to_path_buf())),
            Some(path) => Self::load(path),
            None => Self::discover(dir),
        }
    }

    /// Apply the overrides declared for `environment` and validate the result.
    pub fn for_environment(&self, environment: Environment) -> Result<Config> {
        let mut merged = self.clone();
        let Some(overrides) = self.environments.get(&environment) else {
            return Ok(merged);
        };

        if let Some(ref namespace) = overrides.namespace {
            merged.namespace = Some(namespace.clone());
        }
        if let Some(replicas) = overrides.replicas {
            merged.replicas = replicas;
        }
        if let Some(ref context) = overrides.context {
            merged.cluster.context = Some(context.clone());
        }
        if let Some(ref healthcheck) = overrides.healthcheck {
            merged.healthcheck = healthcheck.clone();
        }
        if let Some(ref smoke_tests) = overrides.smoke_tests {
            merged.smoke_tests = smoke_tests.clone();
        }
        if let Some(ref monitoring) = overrides.monitoring {
            merged.monitoring = monitoring.clone();
        }
        if let Some(ref webhook) = overrides.webhook {
            merged.notifications.webhook = Some(webhook.clone());
        }

        merged
            .validate()
            .map_err(|e| match e {
                Error::InvalidConfig(message) => {
                    Error::InvalidConfig(format!("environments.{environment}: {message}"))
                }
                other => other,
            })?;
        Ok(merged)
    }

    /// Production service name for `app`.
    pub fn service_for(&self, app: &ResourceName) -> ServiceRef {
        ServiceRef::new(self.service.as_ref().unwrap_or(app).as_str())
    }

    /// Image repository for `app`.
    pub fn image_for(&self, app: &ResourceName) -> String {
        self.image.clone().unwrap_or_else(|| app.to_string())
    }

    fn validate(&self) -> Result<()> {
        if self.replicas == 0 {
            return Err(Error::InvalidConfig(
                "replicas must be at least 1".to_string(),
            ));
        }
        if self.timeout.is_zero() {
            return Err(Error::InvalidConfig(
                "timeout must be greater than zero".to_string(),
            ));
        }
        if self.healthcheck.attempts == 0 {
            return Err(Error::InvalidConfig(
                "healthcheck.attempts must be at least 1".to_string(),
            ));
        }
        if self.smoke.parallelism == 0 {
            return Err(Error::InvalidConfig(
                "smoke.parallelism must be at least 1".to_string(),
            ));
        }
        if self.cutover.verify_attempts == 0 {
            return Err(Error::InvalidConfig(
                "cutover.verify_attempts must be at least 1".to_string(),
            ));
        }
        if self.notifications.timeout.is_zero() {
            return Err(Error::InvalidConfig(
                "notifications.timeout must be greater than zero".to_string(),
            ));
        }
        if self.cluster.retry_attempts == 0 {
            return Err(Error::InvalidConfig(
                "cluster.retry_attempts must be at least 1".to_string(),
            ));
        }
        let mut names = std::collections::HashSet::new();
        for test in &self.smoke_tests {
            if !names.insert(test.name.as_str()) {
                return Err(Error::InvalidConfig(format!(
                    "duplicate smoke test name: {}",
                    test.name
                )));
            }
        }
        Ok(())
    }
}
