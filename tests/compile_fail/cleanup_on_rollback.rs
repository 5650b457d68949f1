// ABOUTME: Compile-fail test verifying a rollback has no cleanup step.
// ABOUTME: This test should fail to compile, validating state machine safety.

use cutover::cluster::ClusterClient;
use cutover::deploy::{Monitored, Rollback};

async fn try_cleanup<C: ClusterClient>(rollback: Rollback<Monitored>, cluster: &C) {
    // ERROR: cleanup() doesn't exist on Rollback<Monitored>
    let _ = rollback.cleanup(cluster).await;
}

fn main() {}
