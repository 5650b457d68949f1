// ABOUTME: Control-plane access for blue/green releases.
// ABOUTME: Exports the ClusterClient contract, its kubectl binding, and manifest rendering.

mod client;
mod error;
mod kubectl;
mod manifest;

pub use client::{ClusterClient, HttpProbe, ProbeResult, ReplicaCounts};
pub use error::ClusterError;
pub use kubectl::KubectlClient;
pub use manifest::DeploymentManifest;
