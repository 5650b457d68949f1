// ABOUTME: Simple notification sinks: tracing log, in-memory capture, and fan-out.
// ABOUTME: The log sink is always active; others are layered on through FanoutSink.

use async_trait::async_trait;
use parking_lot::Mutex;

use super::{NotificationSink, NotificationStatus, NotifyError};

/// Writes notifications to the tracing log.
#[derive(Debug, Default)]
pub struct LogSink;

#[async_trait]
impl NotificationSink for LogSink {
    async fn notify(&self, status: NotificationStatus, summary: &str) -> Result<(), NotifyError> {
        match status {
            NotificationStatus::Failed => tracing::error!(%status, "{summary}"),
            _ => tracing::info!(%status, "{summary}"),
        }
        Ok(())
    }
}

/// Keeps every notification in memory.
#[derive(Debug, Default)]
pub struct MemorySink {
    messages: Mutex<Vec<(NotificationStatus, String)>>,
}

impl MemorySink {
    pub fn messages(&self) -> Vec<(NotificationStatus, String)> {
        self.messages.lock().clone()
    }
}

#[async_trait]
impl NotificationSink for MemorySink {
    async fn notify(&self, status: NotificationStatus, summary: &str) -> Result<(), NotifyError> {
        self.messages.lock().push((status, summary.to_string()));
        Ok(())
    }
}

/// Delivers to every inner sink; the first error is returned after all were tried.
#[derive(Default)]
pub struct FanoutSink {
    sinks: Vec<Box<dyn NotificationSink>>,
}

impl FanoutSink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, sink: impl NotificationSink + 'static) -> Self {
        self.sinks.push(Box::new(sink));
        self
    }

    pub fn len(&self) -> usize {
        self.sinks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sinks.is_empty()
    }
}

#[async_trait]
impl NotificationSink for FanoutSink {
    async fn notify(&self, status: NotificationStatus, summary: &str) -> Result<(), NotifyError> {
        let mut first_error = None;
        for sink in &self.sinks {
            if let Err(e) = sink.notify(status, summary).await {
                first_error.get_or_insert(e);
            }
        }
        first_error.map_or(Ok(()), Err)
    }
}
