// ABOUTME: Timing and retry policy for the cutover, monitoring, and cleanup phases.
// ABOUTME: Also holds the control-plane retry budget and kubectl settings.

use serde::Deserialize;
use std::time::Duration;

/// Selector read-back policy after a cutover write.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct CutoverConfig {
    #[serde(default = "default_verify_attempts")]
    pub verify_attempts: u32,

    #[serde(default = "default_verify_interval", with = "humantime_serde")]
    pub verify_interval: Duration,
}

impl Default for CutoverConfig {
    fn default() -> Self {
        CutoverConfig {
            verify_attempts: default_verify_attempts(),
            verify_interval: default_verify_interval(),
        }
    }
}

fn default_verify_attempts() -> u32 {
    3
}

fn default_verify_interval() -> Duration {
    Duration::from_secs(2)
}

/// Post-cutover observation window.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct MonitoringConfig {
    #[serde(default = "default_window", with = "humantime_serde")]
    pub window: Duration,

    #[serde(default = "default_sample_interval", with = "humantime_serde")]
    pub interval: Duration,
}

impl MonitoringConfig {
    /// Number of samples taken over the window (at least one).
    pub fn samples(&self) -> u32 {
        if self.interval.is_zero() {
            return 1;
        }
        let samples = self.window.as_millis() / self.interval.as_millis();
        u32::try_from(samples).unwrap_or(u32::MAX).max(1)
    }
}

impl Default for MonitoringConfig {
    fn default() -> Self {
        MonitoringConfig {
            window: default_window(),
            interval: default_sample_interval(),
        }
    }
}

fn default_window() -> Duration {
    Duration::from_secs(120)
}

fn default_sample_interval() -> Duration {
    Duration::from_secs(10)
}

/// Decommissioning of the previously active color.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct CleanupConfig {
    #[serde(default = "default_grace_period", with = "humantime_serde")]
    pub grace_period: Duration,

    /// Delete the old deployment after scaling it to zero.
    #[serde(default = "default_delete_previous")]
    pub delete_previous: bool,
}

impl Default for CleanupConfig {
    fn default() -> Self {
        CleanupConfig {
            grace_period: default_grace_period(),
            delete_previous: default_delete_previous(),
        }
    }
}

fn default_grace_period() -> Duration {
    Duration::from_secs(30)
}

fn default_delete_previous() -> bool {
    true
}

/// Control-plane access settings.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct ClusterConfig {
    /// Path or name of the kubectl binary.
    #[serde(default = "default_kubectl")]
    pub kubectl: String,

    /// kubeconfig context to use; the current context when unset.
    #[serde(default)]
    pub context: Option<String>,

    #[serde(default = "default_retry_attempts")]
    pub retry_attempts: u32,

    /// Linear backoff step: attempt N waits N * step before retrying.
    #[serde(default = "default_retry_backoff", with = "humantime_serde")]
    pub retry_backoff: Duration,
}

impl Default for ClusterConfig {
    fn default() -> Self {
        ClusterConfig {
            kubectl: default_kubectl(),
            context: None,
            retry_attempts: default_retry_attempts(),
            retry_backoff: default_retry_backoff(),
        }
    }
}

fn default_kubectl() -> String {
    "kubectl".to_string()
}

fn default_retry_attempts() -> u32 {
    3
}

fn default_retry_backoff() -> Duration {
    Duration::from_secs(2)
}
