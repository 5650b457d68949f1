// ABOUTME: Compile-fail test verifying cutover cannot be called on a Healthy release.
// ABOUTME: This test should fail to compile, validating state machine safety.

use cutover::cluster::ClusterClient;
use cutover::deploy::{Healthy, Release};

async fn try_early_cutover<C: ClusterClient>(release: Release<Healthy>, cluster: &C) {
    // ERROR: cutover() only exists once smoke tests ran or were skipped
    let _ = release.cutover(cluster).await;
}

fn main() {}
