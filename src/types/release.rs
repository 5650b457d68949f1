// ABOUTME: Immutable descriptions of a requested release or rollback.
// ABOUTME: Built once per invocation from CLI flags and config, never mutated.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use std::time::Duration;
use thiserror::Error;

use super::ResourceName;

/// Target environment of a release.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Environment {
    Staging,
    Production,
}

impl Environment {
    pub fn as_str(self) -> &'static str {
        match self {
            Environment::Staging => "staging",
            Environment::Production => "production",
        }
    }
}

impl fmt::Display for Environment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Error)]
#[error("unknown environment: '{0}' (expected 'staging' or 'production')")]
pub struct ParseEnvironmentError(pub String);

impl FromStr for Environment {
    type Err = ParseEnvironmentError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "staging" => Ok(Environment::Staging),
            "production" => Ok(Environment::Production),
            other => Err(ParseEnvironmentError(other.to_string())),
        }
    }
}

#[derive(Debug, Error)]
pub enum ReleaseVersionError {
    #[error("release version cannot be empty")]
    Empty,

    #[error("release version exceeds maximum length of 128 characters")]
    TooLong,

    #[error("invalid character in release version: '{0}'")]
    InvalidChar(char),
}

/// Opaque release tag: a semantic version, image tag, or `sha256:` digest.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
#[serde(transparent)]
pub struct ReleaseVersion(String);

impl ReleaseVersion {
    pub fn new(value: &str) -> Result<Self, ReleaseVersionError> {
        let value = value.trim();
        if value.is_empty() {
            return Err(ReleaseVersionError::Empty);
        }
        if value.len() > 128 {
            return Err(ReleaseVersionError::TooLong);
        }
        if let Some(c) = value
            .chars()
            .find(|c| !c.is_ascii_alphanumeric() && !matches!(c, '.' | '-' | '_' | ':' | '+'))
        {
            return Err(ReleaseVersionError::InvalidChar(c));
        }
        Ok(Self(value.to_string()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Whether this version names an image digest rather than a tag.
    pub fn is_digest(&self) -> bool {
        self.0.starts_with("sha256:")
    }

    /// Kubernetes label values cannot contain ':' or '+' and are capped at 63 bytes.
    pub fn label_value(&self) -> String {
        let mut value: String = self.0.replace([':', '+'], "-").chars().take(63).collect();
        while value.ends_with(|c: char| !c.is_ascii_alphanumeric()) {
            value.pop();
        }
        value
    }
}

impl FromStr for ReleaseVersion {
    type Err = ReleaseVersionError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::new(s)
    }
}

impl fmt::Display for ReleaseVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// A requested deployment.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReleaseDescriptor {
    version: ReleaseVersion,
    environment: Environment,
    namespace: ResourceName,
    app: ResourceName,
    replica_count: u32,
    timeout: Duration,
}

impl ReleaseDescriptor {
    pub fn new(
        version: ReleaseVersion,
        environment: Environment,
        namespace: ResourceName,
        app: ResourceName,
        replica_count: u32,
        timeout: Duration,
    ) -> Self {
        Self {
            version,
            environment,
            namespace,
            app,
            replica_count: replica_count.max(1),
            timeout,
        }
    }

    pub fn version(&self) -> &ReleaseVersion {
        &self.version
    }

    pub fn environment(&self) -> Environment {
        self.environment
    }

    pub fn namespace(&self) -> &ResourceName {
        &self.namespace
    }

    pub fn app(&self) -> &ResourceName {
        &self.app
    }

    pub fn replica_count(&self) -> u32 {
        self.replica_count
    }

    /// Readiness budget for the new color.
    pub fn timeout(&self) -> Duration {
        self.timeout
    }
}

/// A requested rollback to the currently inactive color.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RollbackRequest {
    pub environment: Environment,
    pub namespace: ResourceName,
    pub app: ResourceName,
    /// Skip the operator confirmation gate.
    pub force: bool,
}
