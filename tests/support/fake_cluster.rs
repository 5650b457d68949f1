// ABOUTME: Scripted in-memory ClusterClient for orchestration tests.
// ABOUTME: Tracks the service selector, deployments, and every call, with injectable failures.

use async_trait::async_trait;
use parking_lot::Mutex;
use std::collections::{HashMap, VecDeque};
use std::time::Duration;

use cutover::cluster::{
    ClusterClient, ClusterError, DeploymentManifest, HttpProbe, ProbeResult, ReplicaCounts,
};
use cutover::types::{DeploymentName, DeploymentTarget, ResourceName, ServiceRef};

#[derive(Default)]
struct State {
    selector: Option<DeploymentTarget>,
    previous_selector: Option<DeploymentTarget>,
    stale_reads_remaining: u32,
    stale_reads_per_write: u32,
    deployments: HashMap<String, ReplicaCounts>,
    applied: Vec<DeploymentManifest>,
    deleted: Vec<String>,
    probe_scripts: HashMap<String, VecDeque<u16>>,
    probe_defaults: HashMap<String, u16>,
    path_status: HashMap<String, u16>,
    active_color_failures: u32,
    wait_times_out: bool,
    selector_write_fails: bool,
    service_missing: bool,
    foreign_selector: Option<String>,
    calls: Vec<String>,
}

/// A namespace-scoped fake control plane.
pub struct FakeCluster {
    namespace: ResourceName,
    state: Mutex<State>,
}

impl FakeCluster {
    pub fn new(namespace: &str) -> Self {
        Self {
            namespace: ResourceName::new(namespace).unwrap(),
            state: Mutex::new(State::default()),
        }
    }

    /// Service selects `color`, whose deployment is fully ready with `replicas`.
    pub fn with_active(self, app: &str, color: DeploymentTarget, replicas: u32) -> Self {
        self.state.lock().selector = Some(color);
        self.with_deployment(app, color, replicas, replicas)
    }

    pub fn with_deployment(self, app: &str, color: DeploymentTarget, ready: u32, desired: u32) -> Self {
        self.state
            .lock()
            .deployments
            .insert(name(app, color), ReplicaCounts { ready, desired });
        self
    }

    /// Probes of `app`'s `color` answer with these statuses, in order, then the default.
    pub fn script_probes(&self, app: &str, color: DeploymentTarget, statuses: &[u16]) {
        self.state
            .lock()
            .probe_scripts
            .insert(name(app, color), statuses.iter().copied().collect());
    }

    /// Status for probes once the script is used up (200 unless set).
    pub fn probe_default(&self, app: &str, color: DeploymentTarget, status: u16) {
        self.state.lock().probe_defaults.insert(name(app, color), status);
    }

    /// Probes of `path` answer with `status` regardless of deployment.
    pub fn path_status(&self, path: &str, status: u16) {
        self.state.lock().path_status.insert(path.to_string(), status);
    }

    /// The next `reads` selector reads after each write return the old value.
    pub fn stale_reads_after_write(&self, reads: u32) {
        self.state.lock().stale_reads_per_write = reads;
    }

    pub fn fail_active_color_reads(&self, times: u32) {
        self.state.lock().active_color_failures = times;
    }

    pub fn time_out_waits(&self) {
        self.state.lock().wait_times_out = true;
    }

    /// Selector writes report an error but are still applied.
    pub fn selector_write_errors(&self) {
        self.state.lock().selector_write_fails = true;
    }

    pub fn without_service(&self) {
        self.state.lock().service_missing = true;
    }

    /// The service selects a color label this tool does not manage.
    pub fn select_foreign_color(&self, value: &str) {
        self.state.lock().foreign_selector = Some(value.to_string());
    }

    pub fn selector(&self) -> Option<DeploymentTarget> {
        self.state.lock().selector
    }

    pub fn replicas(&self, app: &str, color: DeploymentTarget) -> Option<ReplicaCounts> {
        self.state.lock().deployments.get(&name(app, color)).copied()
    }

    pub fn applied(&self) -> Vec<DeploymentManifest> {
        self.state.lock().applied.clone()
    }

    pub fn deleted(&self) -> Vec<String> {
        self.state.lock().deleted.clone()
    }

    pub fn calls(&self) -> Vec<String> {
        self.state.lock().calls.clone()
    }

    /// Whether any call other than a read reached the cluster.
    pub fn wrote_anything(&self) -> bool {
        self.calls().iter().any(|c| {
            c.starts_with("apply")
                || c.starts_with("set_selector")
                || c.starts_with("scale")
                || c.starts_with("delete")
        })
    }

    fn not_found(deployment: &DeploymentName) -> ClusterError {
        ClusterError::NotFound {
            resource: format!("deployment/{deployment}"),
        }
    }
}

fn name(app: &str, color: DeploymentTarget) -> String {
    format!("{app}-{color}")
}

#[async_trait]
impl ClusterClient for FakeCluster {
    fn namespace(&self) -> &ResourceName {
        &self.namespace
    }

    async fn get_active_color(
        &self,
        service: &ServiceRef,
    ) -> Result<Option<DeploymentTarget>, ClusterError> {
        let mut state = self.state.lock();
        state.calls.push(format!("get_active_color {service}"));
        if state.service_missing {
            return Err(ClusterError::NotFound {
                resource: format!("service/{service}"),
            });
        }
        if let Some(ref value) = state.foreign_selector {
            return Err(ClusterError::UnexpectedOutput {
                command: format!("get service {service}"),
                detail: format!("unknown color '{value}'"),
            });
        }
        if state.active_color_failures > 0 {
            state.active_color_failures -= 1;
            return Err(ClusterError::Unreachable {
                message: "connection refused".to_string(),
            });
        }
        if state.stale_reads_remaining > 0 {
            state.stale_reads_remaining -= 1;
            return Ok(state.previous_selector);
        }
        Ok(state.selector)
    }

    async fn apply_deployment(&self, manifest: &DeploymentManifest) -> Result<(), ClusterError> {
        let mut state = self.state.lock();
        state.calls.push(format!("apply {}", manifest.name));
        let counts = state
            .deployments
            .entry(manifest.name.to_string())
            .or_default();
        counts.desired = manifest.replicas;
        counts.ready = counts.ready.min(manifest.replicas);
        state.applied.push(manifest.clone());
        Ok(())
    }

    async fn wait_for_ready(
        &self,
        deployment: &DeploymentName,
        _timeout: Duration,
    ) -> Result<(), ClusterError> {
        let mut state = self.state.lock();
        state.calls.push(format!("wait {deployment}"));
        if state.wait_times_out {
            return Err(ClusterError::Timeout {
                operation: format!("rollout status {deployment}"),
            });
        }
        match state.deployments.get_mut(deployment.as_str()) {
            Some(counts) => {
                counts.ready = counts.desired;
                Ok(())
            }
            None => Err(Self::not_found(deployment)),
        }
    }

    async fn get_ready_replicas(
        &self,
        deployment: &DeploymentName,
    ) -> Result<ReplicaCounts, ClusterError> {
        let mut state = self.state.lock();
        state.calls.push(format!("get_replicas {deployment}"));
        state
            .deployments
            .get(deployment.as_str())
            .copied()
            .ok_or_else(|| Self::not_found(deployment))
    }

    async fn set_service_selector(
        &self,
        service: &ServiceRef,
        color: DeploymentTarget,
    ) -> Result<(), ClusterError> {
        let mut state = self.state.lock();
        state.calls.push(format!("set_selector {service} {color}"));
        state.previous_selector = state.selector;
        state.selector = Some(color);
        state.stale_reads_remaining = state.stale_reads_per_write;
        if state.selector_write_fails {
            return Err(ClusterError::CommandFailed {
                command: format!("kubectl patch service {service}"),
                stderr: "etcdserver: request timed out".to_string(),
            });
        }
        Ok(())
    }

    async fn scale_deployment(
        &self,
        deployment: &DeploymentName,
        replicas: u32,
    ) -> Result<(), ClusterError> {
        let mut state = self.state.lock();
        state.calls.push(format!("scale {deployment} {replicas}"));
        match state.deployments.get_mut(deployment.as_str()) {
            Some(counts) => {
                counts.desired = replicas;
                counts.ready = counts.ready.min(replicas);
                Ok(())
            }
            None => Err(Self::not_found(deployment)),
        }
    }

    async fn delete_deployment(&self, deployment: &DeploymentName) -> Result<(), ClusterError> {
        let mut state = self.state.lock();
        state.calls.push(format!("delete {deployment}"));
        match state.deployments.remove(deployment.as_str()) {
            Some(_) => {
                state.deleted.push(deployment.to_string());
                Ok(())
            }
            None => Err(Self::not_found(deployment)),
        }
    }

    async fn exec_health_probe(
        &self,
        deployment: &DeploymentName,
        probe: &HttpProbe,
    ) -> Result<ProbeResult, ClusterError> {
        let mut state = self.state.lock();
        state
            .calls
            .push(format!("probe {deployment} {}", probe.path));

        let ready = match state.deployments.get(deployment.as_str()) {
            Some(counts) => counts.ready,
            None => return Err(Self::not_found(deployment)),
        };
        if ready == 0 {
            return Err(ClusterError::CommandFailed {
                command: format!("kubectl exec deployment/{deployment}"),
                stderr: "no running pods".to_string(),
            });
        }

        let status = if let Some(status) = state.path_status.get(&probe.path) {
            *status
        } else if let Some(status) = state
            .probe_scripts
            .get_mut(deployment.as_str())
            .and_then(|script| script.pop_front())
        {
            status
        } else {
            state
                .probe_defaults
                .get(deployment.as_str())
                .copied()
                .unwrap_or(200)
        };

        Ok(ProbeResult {
            status,
            latency: Duration::from_millis(3),
        })
    }
}
