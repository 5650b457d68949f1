// ABOUTME: State marker types for release and rollback workflows.
// ABOUTME: Each marker unlocks only the transitions that are legal from it.

use super::SmokeOutcome;

/// Nothing read from the cluster yet.
/// Available actions: `init()`
#[derive(Debug, Clone, Copy, Default)]
pub struct Pending;

/// Active and target colors resolved.
/// Available actions: `deploy_inactive()` on a release, `ensure_ready()` on a rollback
#[derive(Debug, Clone, Copy, Default)]
pub struct Resolved;

/// Target color is running the wanted replica set.
/// Available actions: `health_check()`
#[derive(Debug, Clone, Copy, Default)]
pub struct Deployed;

/// Target color answered its health endpoint.
/// Available actions: `smoke_test()`, `skip_tests()` on a release, `confirm()` on a rollback
#[derive(Debug, Clone, Copy, Default)]
pub struct Healthy;

/// Smoke tests passed or were explicitly skipped.
/// Available actions: `cutover()`
#[derive(Debug, Clone, Default)]
pub struct Tested {
    pub(crate) outcomes: Vec<SmokeOutcome>,
}

/// Operator approved the rollback, or it was forced.
/// Available actions: `cutover()`
#[derive(Debug, Clone, Copy, Default)]
pub struct Confirmed;

/// Production selector verified on the target color.
/// Available actions: `monitor()`
#[derive(Debug, Clone, Copy, Default)]
pub struct CutOver;

/// Observation window finished.
/// Available actions: `cleanup()` on a release, `finish()` on a rollback
#[derive(Debug, Clone, Copy, Default)]
pub struct Monitored;

/// Previous color decommissioned.
/// Available actions: `finish()`
#[derive(Debug, Clone, Copy, Default)]
pub struct Completed;
