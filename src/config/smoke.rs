// ABOUTME: Smoke test definitions run against the inactive color before cutover.
// ABOUTME: Each check is a named HTTP request with an expected status code.

use serde::Deserialize;
use std::time::Duration;

/// A single named HTTP check.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct SmokeTest {
    pub name: String,
    pub path: String,
    #[serde(default = "default_expected_status")]
    pub expected_status: u16,
    /// Port override; defaults to the health check port.
    #[serde(default)]
    pub port: Option<u16>,
}

/// Execution policy shared by all smoke tests.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct SmokeConfig {
    /// Maximum number of checks in flight at once.
    #[serde(default = "default_parallelism")]
    pub parallelism: usize,

    #[serde(default = "default_attempts")]
    pub attempts: u32,

    #[serde(default = "default_interval", with = "humantime_serde")]
    pub interval: Duration,
}

impl Default for SmokeConfig {
    fn default() -> Self {
        SmokeConfig {
            parallelism: default_parallelism(),
            attempts: default_attempts(),
            interval: default_interval(),
        }
    }
}

fn default_expected_status() -> u16 {
    200
}

fn default_parallelism() -> usize {
    4
}

fn default_attempts() -> u32 {
    3
}

fn default_interval() -> Duration {
    Duration::from_secs(5)
}
