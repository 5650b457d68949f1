// ABOUTME: Concurrent smoke-test runner for a freshly deployed color.
// ABOUTME: Runs named HTTP checks through a bounded worker pool, each with its own retries.

use tokio::sync::Semaphore;

use crate::cluster::{ClusterClient, HttpProbe};
use crate::config::{HealthcheckConfig, SmokeConfig, SmokeTest};
use crate::types::DeploymentName;

use super::CancelSignal;
use super::Phase;
use super::steps::probe_once;

/// Final result of one named smoke test.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SmokeOutcome {
    pub name: String,
    pub passed: bool,
    pub attempts: u32,
    pub expected_status: u16,
    /// Status of the last answer, if any answer came back.
    pub last_status: Option<u16>,
    pub last_error: Option<String>,
}

impl SmokeOutcome {
    pub fn describe(&self) -> String {
        match (self.last_status, &self.last_error) {
            (_, Some(error)) => format!("{} ({error})", self.name),
            (Some(status), None) => format!(
                "{} (got HTTP {status}, expected {})",
                self.name, self.expected_status
            ),
            (None, None) => self.name.clone(),
        }
    }
}

/// Run every test with at most `smoke.parallelism` in flight.
///
/// Cancellation is checked by the caller around the whole suite and between
/// retries here.
pub(crate) async fn run_smoke_tests<C: ClusterClient + ?Sized>(
    cluster: &C,
    deployment: &DeploymentName,
    tests: &[SmokeTest],
    healthcheck: &HealthcheckConfig,
    smoke: &SmokeConfig,
    cancel: &CancelSignal,
) -> Vec<SmokeOutcome> {
    let workers = Semaphore::new(smoke.parallelism.max(1));

    let runs: Vec<_> = tests
        .iter()
        .map(|test| {
            let workers = &workers;
            async move {
                let _permit = workers.acquire().await;
                run_one(cluster, deployment, test, healthcheck, smoke, cancel).await
            }
        })
        .collect();

    futures::future::join_all(runs).await
}

async fn run_one<C: ClusterClient + ?Sized>(
    cluster: &C,
    deployment: &DeploymentName,
    test: &SmokeTest,
    healthcheck: &HealthcheckConfig,
    smoke: &SmokeConfig,
    cancel: &CancelSignal,
) -> SmokeOutcome {
    let probe = HttpProbe {
        port: test.port.unwrap_or(healthcheck.port),
        path: test.path.clone(),
        timeout: healthcheck.timeout,
    };
    let attempts = smoke.attempts.max(1);
    let mut outcome = SmokeOutcome {
        name: test.name.clone(),
        passed: false,
        attempts: 0,
        expected_status: test.expected_status,
        last_status: None,
        last_error: None,
    };

    for attempt in 1..=attempts {
        outcome.attempts = attempt;
        match probe_once(cluster, deployment, &probe, cancel, Phase::Testing).await {
            Ok(Ok(result)) => {
                outcome.last_status = Some(result.status);
                outcome.last_error = None;
                if result.status == test.expected_status {
                    outcome.passed = true;
                    tracing::info!(test = %test.name, attempt, "smoke test passed");
                    return outcome;
                }
            }
            Ok(Err(reason)) => outcome.last_error = Some(reason),
            Err(cancelled) => {
                outcome.last_error = Some(cancelled.to_string());
                return outcome;
            }
        }
        tracing::debug!(test = %test.name, attempt, attempts, "smoke test attempt failed");

        if attempt < attempts && cancel.sleep(Phase::Testing, smoke.interval).await.is_err() {
            outcome.last_error = Some("cancelled".to_string());
            return outcome;
        }
    }

    tracing::warn!(test = %test.name, "smoke test failed: {}", outcome.describe());
    outcome
}
