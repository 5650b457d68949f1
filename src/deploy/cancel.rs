// ABOUTME: Cooperative cancellation for in-flight runs.
// ABOUTME: A watch channel flips once; every blocking wait races against it.

use std::future::Future;
use std::time::Duration;
use tokio::sync::watch;

use super::{DeployError, Phase};

/// Flips the paired [`CancelSignal`] when the operator aborts.
#[derive(Debug)]
pub struct CancelHandle {
    tx: watch::Sender<bool>,
}

impl CancelHandle {
    pub fn cancel(&self) {
        self.tx.send_replace(true);
    }
}

/// Observed by the orchestrator at every suspension point.
#[derive(Debug, Clone)]
pub struct CancelSignal {
    rx: watch::Receiver<bool>,
}

impl CancelSignal {
    pub fn pair() -> (CancelHandle, CancelSignal) {
        let (tx, rx) = watch::channel(false);
        (CancelHandle { tx }, CancelSignal { rx })
    }

    /// A signal that never fires.
    pub fn never() -> Self {
        let (_tx, rx) = watch::channel(false);
        CancelSignal { rx }
    }

    pub fn is_cancelled(&self) -> bool {
        *self.rx.borrow()
    }

    /// Resolves once cancellation is requested; pends forever otherwise.
    pub async fn cancelled(&self) {
        let mut rx = self.rx.clone();
        let closed = rx.wait_for(|cancelled| *cancelled).await.is_err();
        if closed {
            // Handle dropped without cancelling.
            std::future::pending::<()>().await;
        }
    }

    /// Run `fut` unless cancellation wins the race.
    pub(crate) async fn guard<F: Future>(
        &self,
        phase: Phase,
        fut: F,
    ) -> Result<F::Output, DeployError> {
        if self.is_cancelled() {
            return Err(DeployError::cancelled(phase));
        }
        tokio::select! {
            biased;
            _ = self.cancelled() => Err(DeployError::cancelled(phase)),
            out = fut => Ok(out),
        }
    }

    pub(crate) async fn sleep(&self, phase: Phase, duration: Duration) -> Result<(), DeployError> {
        if duration.is_zero() {
            return self.check(phase);
        }
        self.guard(phase, tokio::time::sleep(duration)).await
    }

    pub(crate) fn check(&self, phase: Phase) -> Result<(), DeployError> {
        if self.is_cancelled() {
            Err(DeployError::cancelled(phase))
        } else {
            Ok(())
        }
    }
}
