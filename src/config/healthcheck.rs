// ABOUTME: HTTP health check configuration for a freshly deployed color.
// ABOUTME: Probes run inside the color's pods at a fixed interval, up to a bounded attempt count.

use serde::Deserialize;
use std::time::Duration;

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct HealthcheckConfig {
    #[serde(default = "default_path")]
    pub path: String,

    #[serde(default = "default_port")]
    pub port: u16,

    #[serde(default = "default_interval", with = "humantime_serde")]
    pub interval: Duration,

    #[serde(default = "default_attempts")]
    pub attempts: u32,

    /// Per-probe timeout.
    #[serde(default = "default_timeout", with = "humantime_serde")]
    pub timeout: Duration,

    #[serde(default = "default_expected_status")]
    pub expected_status: u16,
}

impl HealthcheckConfig {
    /// Upper bound on the time spent polling before giving up.
    pub fn ceiling(&self) -> Duration {
        self.interval * self.attempts
    }
}

impl Default for HealthcheckConfig {
    fn default() -> Self {
        HealthcheckConfig {
            path: default_path(),
            port: default_port(),
            interval: default_interval(),
            attempts: default_attempts(),
            timeout: default_timeout(),
            expected_status: default_expected_status(),
        }
    }
}

fn default_path() -> String {
    "/health".to_string()
}

fn default_port() -> u16 {
    8080
}

fn default_interval() -> Duration {
    Duration::from_secs(10)
}

fn default_attempts() -> u32 {
    30
}

fn default_timeout() -> Duration {
    Duration::from_secs(5)
}

fn default_expected_status() -> u16 {
    200
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_ceiling_is_five_minutes() {
        assert_eq!(HealthcheckConfig::default().ceiling(), Duration::from_secs(300));
    }

    #[test]
    fn partial_yaml_keeps_defaults() {
        let hc: HealthcheckConfig = serde_yaml::from_str("path: /ready\ninterval: 2s\n").unwrap();
        assert_eq!(hc.path, "/ready");
        assert_eq!(hc.interval, Duration::from_secs(2));
        assert_eq!(hc.attempts, 30);
        assert_eq!(hc.expected_status, 200);
    }
}
