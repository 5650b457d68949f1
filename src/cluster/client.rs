// ABOUTME: The ClusterClient trait consumed by the orchestrator.
// ABOUTME: Every method is an opaque side-effecting control-plane call scoped to one namespace.

use async_trait::async_trait;
use std::time::Duration;

use super::{ClusterError, DeploymentManifest};
use crate::types::{DeploymentName, DeploymentTarget, ResourceName, ServiceRef};

/// Ready vs desired replica counts of one deployment.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ReplicaCounts {
    pub ready: u32,
    pub desired: u32,
}

impl ReplicaCounts {
    pub fn is_fully_ready(&self) -> bool {
        self.desired > 0 && self.ready >= self.desired
    }
}

/// An HTTP GET issued from inside a color's pods.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HttpProbe {
    pub port: u16,
    pub path: String,
    pub timeout: Duration,
}

/// Outcome of one probe. A status of 0 means no HTTP response was received.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ProbeResult {
    pub status: u16,
    pub latency: Duration,
}

/// Control-plane operations used by blue/green workflows.
///
/// Implementations are bound to a single namespace. Reads are never cached:
/// other operators may change the cluster between calls.
#[async_trait]
pub trait ClusterClient: Send + Sync {
    /// Namespace every call operates in.
    fn namespace(&self) -> &ResourceName;

    /// Color currently selected by the production service, if any.
    async fn get_active_color(
        &self,
        service: &ServiceRef,
    ) -> Result<Option<DeploymentTarget>, ClusterError>;

    /// Create or update a deployment from a manifest.
    async fn apply_deployment(&self, manifest: &DeploymentManifest) -> Result<(), ClusterError>;

    /// Block until the deployment's rollout is complete or `timeout` elapses.
    async fn wait_for_ready(
        &self,
        deployment: &DeploymentName,
        timeout: Duration,
    ) -> Result<(), ClusterError>;

    async fn get_ready_replicas(
        &self,
        deployment: &DeploymentName,
    ) -> Result<ReplicaCounts, ClusterError>;

    /// Point the service's color selector at `color`.
    async fn set_service_selector(
        &self,
        service: &ServiceRef,
        color: DeploymentTarget,
    ) -> Result<(), ClusterError>;

    async fn scale_deployment(
        &self,
        deployment: &DeploymentName,
        replicas: u32,
    ) -> Result<(), ClusterError>;

    async fn delete_deployment(&self, deployment: &DeploymentName) -> Result<(), ClusterError>;

    /// Run an HTTP probe inside one of the deployment's pods.
    async fn exec_health_probe(
        &self,
        deployment: &DeploymentName,
        probe: &HttpProbe,
    ) -> Result<ProbeResult, ClusterError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fully_ready_requires_desired_replicas() {
        assert!(ReplicaCounts { ready: 3, desired: 3 }.is_fully_ready());
        assert!(!ReplicaCounts { ready: 2, desired: 3 }.is_fully_ready());
        assert!(!ReplicaCounts { ready: 0, desired: 0 }.is_fully_ready());
    }
}
