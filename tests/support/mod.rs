// ABOUTME: Test support utilities.
// ABOUTME: Provides the fake cluster, fast configs, and request builders for integration tests.

use std::sync::Once;
use std::time::Duration;

use cutover::config::{Config, SmokeTest};
use cutover::types::{
    Environment, ReleaseDescriptor, ReleaseVersion, ResourceName, RollbackRequest,
};

// Each test binary only uses some of these helpers, so allow dead_code.
#[allow(dead_code)]
pub mod fake_cluster;

pub const APP: &str = "gameforge";
pub const NAMESPACE: &str = "games";

static TRACING_INIT: Once = Once::new();

/// Initialize tracing for tests. Safe to call multiple times.
#[allow(dead_code)]
pub fn init_tracing() {
    TRACING_INIT.call_once(|| {
        use tracing_subscriber::EnvFilter;
        let filter = EnvFilter::from_default_env().add_directive("cutover=debug".parse().unwrap());
        tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_test_writer()
            .try_init()
            .ok();
    });
}

/// Defaults with every wait shrunk to milliseconds.
#[allow(dead_code)]
pub fn fast_config() -> Config {
    let mut config = Config::default();
    config.app = Some(ResourceName::new(APP).unwrap());
    config.namespace = Some(ResourceName::new(NAMESPACE).unwrap());
    config.replicas = 3;
    config.timeout = Duration::from_secs(5);
    config.healthcheck.interval = Duration::from_millis(1);
    config.healthcheck.timeout = Duration::from_millis(200);
    config.smoke.interval = Duration::from_millis(1);
    config.cutover.verify_interval = Duration::from_millis(1);
    config.monitoring.window = Duration::from_millis(4);
    config.monitoring.interval = Duration::from_millis(2);
    config.cleanup.grace_period = Duration::from_millis(1);
    config.cluster.retry_backoff = Duration::from_millis(1);
    config.smoke_tests = vec![
        SmokeTest {
            name: "status".to_string(),
            path: "/api/status".to_string(),
            expected_status: 200,
            port: None,
        },
        SmokeTest {
            name: "matchmaking".to_string(),
            path: "/api/matchmaking/ping".to_string(),
            expected_status: 200,
            port: Some(9090),
        },
    ];
    config
}

#[allow(dead_code)]
pub fn release(version: &str) -> ReleaseDescriptor {
    ReleaseDescriptor::new(
        ReleaseVersion::new(version).unwrap(),
        Environment::Production,
        ResourceName::new(NAMESPACE).unwrap(),
        ResourceName::new(APP).unwrap(),
        3,
        Duration::from_secs(5),
    )
}

#[allow(dead_code)]
pub fn rollback_request(force: bool) -> RollbackRequest {
    RollbackRequest {
        environment: Environment::Production,
        namespace: ResourceName::new(NAMESPACE).unwrap(),
        app: ResourceName::new(APP).unwrap(),
        force,
    }
}
