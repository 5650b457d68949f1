// ABOUTME: Status command implementation.
// ABOUTME: Reports the active color and replica counts of both colors.

use super::Invocation;
use cutover::cluster::{ClusterClient, ClusterError, KubectlClient, ReplicaCounts};
use cutover::deploy::ClusterResultExt;
use cutover::error::Result;
use cutover::output::Output;
use cutover::types::{DeploymentName, DeploymentTarget};
use serde::Serialize;

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct ColorStatus {
    color: DeploymentTarget,
    deployment: String,
    exists: bool,
    ready: u32,
    desired: u32,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct StatusReport {
    namespace: String,
    app: String,
    service: String,
    active_color: Option<DeploymentTarget>,
    colors: Vec<ColorStatus>,
}

pub async fn status(invocation: Invocation, output: Output) -> Result<()> {
    let cluster = KubectlClient::new(&invocation.config.cluster, invocation.namespace.clone());
    let service = invocation.config.service_for(&invocation.app);

    let active = cluster
        .get_active_color(&service)
        .await
        .or_deploy_error("read active color")?;

    let mut colors = Vec::new();
    for color in [DeploymentTarget::Blue, DeploymentTarget::Green] {
        let name = DeploymentName::for_color(&invocation.app, color);
        let (exists, counts) = match cluster.get_ready_replicas(&name).await {
            Ok(counts) => (true, counts),
            Err(ClusterError::NotFound { .. }) => (false, ReplicaCounts::default()),
            Err(e) => return Err(e.into()),
        };
        colors.push(ColorStatus {
            color,
            deployment: name.to_string(),
            exists,
            ready: counts.ready,
            desired: counts.desired,
        });
    }

    let report = StatusReport {
        namespace: invocation.namespace.to_string(),
        app: invocation.app.to_string(),
        service: service.to_string(),
        active_color: active,
        colors,
    };

    let mut lines = vec![
        format!("App: {} ({})", report.app, report.namespace),
        format!(
            "Active color: {}",
            active.map(|c| c.to_string()).unwrap_or_else(|| "none".to_string())
        ),
    ];
    for c in &report.colors {
        let marker = if Some(c.color) == active { "*" } else { " " };
        if c.exists {
            lines.push(format!(
                "{marker} {}: {}/{} ready",
                c.deployment, c.ready, c.desired
            ));
        } else {
            lines.push(format!("{marker} {}: not deployed", c.deployment));
        }
    }
    output.data("status", &lines, &report);
    Ok(())
}
