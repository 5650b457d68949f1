// ABOUTME: Application-wide error types for cutover.
// ABOUTME: Uses thiserror for ergonomic error handling and maps errors to exit codes.

use std::path::PathBuf;
use thiserror::Error;

use crate::cluster::ClusterError;
use crate::deploy::DeployError;

#[derive(Debug, Error)]
pub enum Error {
    #[error("file already exists: {0}")]
    AlreadyExists(PathBuf),

    #[error("configuration file not found: {0}")]
    ConfigNotFound(PathBuf),

    #[error("missing required environment variable: {0}")]
    MissingEnvVar(String),

    #[error("invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("invalid arguments: {0}")]
    InvalidArguments(String),

    #[error("hook failed: {0}")]
    Hook(String),

    #[error(transparent)]
    Deploy(#[from] DeployError),

    #[error("cluster error: {0}")]
    Cluster(#[from] ClusterError),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("YAML parse error: {0}")]
    Yaml(#[from] serde_yaml::Error),
}

impl Error {
    /// Process exit code for this error: 2 for invalid input, 1 otherwise.
    pub fn exit_code(&self) -> i32 {
        match self {
            Error::InvalidArguments(_) => 2,
            Error::Deploy(e) if e.kind() == crate::deploy::ErrorKind::InvalidArguments => 2,
            _ => 1,
        }
    }
}

pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;
    use crate::deploy::ErrorKind;

    #[test]
    fn invalid_arguments_exit_with_two() {
        assert_eq!(Error::InvalidArguments("missing --version".into()).exit_code(), 2);
        let deploy = DeployError::new(ErrorKind::InvalidArguments, "bad namespace");
        assert_eq!(Error::from(deploy).exit_code(), 2);
    }

    #[test]
    fn failures_exit_with_one() {
        let deploy = DeployError::new(ErrorKind::HealthCheckExhausted, "30 attempts");
        assert_eq!(Error::from(deploy).exit_code(), 1);
        assert_eq!(Error::Hook("pre-deploy".into()).exit_code(), 1);
    }
}
