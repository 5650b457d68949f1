// ABOUTME: Terminal-status notifications for releases and rollbacks.
// ABOUTME: Exports the NotificationSink trait and its log, webhook, memory, and fan-out sinks.

mod sinks;
mod webhook;

pub use sinks::{FanoutSink, LogSink, MemorySink};
pub use webhook::WebhookSink;

use async_trait::async_trait;
use serde::Serialize;
use std::fmt;

/// Terminal status reported to a sink.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum NotificationStatus {
    Succeeded,
    Failed,
    RolledBack,
}

impl fmt::Display for NotificationStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            NotificationStatus::Succeeded => "succeeded",
            NotificationStatus::Failed => "failed",
            NotificationStatus::RolledBack => "rolled_back",
        })
    }
}

/// Errors from delivering a notification.
#[derive(Debug, thiserror::Error)]
pub enum NotifyError {
    #[error("invalid webhook URL: {0}")]
    InvalidUrl(String),

    #[error("webhook delivery failed: {0}")]
    Delivery(String),

    #[error("webhook returned HTTP {0}")]
    Rejected(u16),
}

/// Receives one message per terminal state.
#[async_trait]
pub trait NotificationSink: Send + Sync {
    async fn notify(&self, status: NotificationStatus, summary: &str) -> Result<(), NotifyError>;
}
