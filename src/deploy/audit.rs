// ABOUTME: Terminal audit record for a release or rollback.
// ABOUTME: Serialized as camelCase JSON into one file per run.

use chrono::{DateTime, Utc};
use serde::Serialize;
use std::path::{Path, PathBuf};

use super::{DeploymentRecord, ErrorKind, Operation, Phase};
use crate::diagnostics::Diagnostics;
use crate::types::{DeploymentTarget, Environment};

/// What happened in one run, written once it reaches a terminal phase.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AuditRecord {
    pub timestamp: DateTime<Utc>,
    pub started_at: DateTime<Utc>,
    pub operation: Operation,
    pub environment: Environment,
    pub namespace: String,
    pub app: String,
    pub from_color: Option<DeploymentTarget>,
    pub to_color: Option<DeploymentTarget>,
    pub release_version: Option<String>,
    pub outcome: Phase,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error_kind: Option<ErrorKind>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub failed_phase: Option<Phase>,
    pub skip_tests: bool,
    pub forced: bool,
    pub health_check_attempts: u32,
    pub operator: String,
    pub warnings: Vec<String>,
}

impl AuditRecord {
    pub fn new(record: &DeploymentRecord, diagnostics: &Diagnostics) -> Self {
        AuditRecord {
            timestamp: Utc::now(),
            started_at: record.started_at(),
            operation: record.operation(),
            environment: record.environment(),
            namespace: record.namespace().to_string(),
            app: record.app().to_string(),
            from_color: record.from(),
            to_color: record.target(),
            release_version: record.release_version().map(|v| v.to_string()),
            outcome: record.phase(),
            error_kind: record.last_error(),
            failed_phase: record.failed_in(),
            skip_tests: record.skip_tests(),
            forced: record.forced(),
            health_check_attempts: record.health_check_attempts(),
            operator: operator(),
            warnings: diagnostics
                .warnings()
                .iter()
                .map(|w| w.message.clone())
                .collect(),
        }
    }

    /// `<timestamp>-<app>-<operation>.json`
    pub fn file_name(&self) -> String {
        format!(
            "{}-{}-{}.json",
            self.timestamp.format("%Y%m%dT%H%M%S%.3fZ"),
            self.app,
            self.operation
        )
    }
}

/// `<hostname>:<pid>` of the process that ran the operation.
fn operator() -> String {
    let hostname = gethostname::gethostname().to_string_lossy().into_owned();
    format!("{}:{}", hostname, std::process::id())
}

/// Writes audit records into a directory.
#[derive(Debug, Clone)]
pub struct AuditLog {
    dir: PathBuf,
}

impl AuditLog {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub async fn write(&self, record: &AuditRecord) -> std::io::Result<PathBuf> {
        tokio::fs::create_dir_all(&self.dir).await?;
        let path = self.dir.join(record.file_name());
        let json = serde_json::to_vec_pretty(record)?;
        tokio::fs::write(&path, json).await?;
        tracing::debug!("wrote audit record {}", path.display());
        Ok(path)
    }
}
