// ABOUTME: Deployment manifest for one color of a release.
// ABOUTME: Renders an apps/v1 Deployment with color, version, and readiness probe wiring.

use serde_json::{Value, json};

use crate::config::Config;
use crate::types::{
    DeploymentName, DeploymentTarget, Environment, ReleaseDescriptor, ReleaseVersion,
    ResourceName,
};

/// Label key the production service selects on.
pub(crate) const COLOR_LABEL: &str = "color";

/// Everything needed to create the deployment for one color.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeploymentManifest {
    pub name: DeploymentName,
    pub namespace: ResourceName,
    pub app: ResourceName,
    pub color: DeploymentTarget,
    pub version: ReleaseVersion,
    pub environment: Environment,
    pub image_repository: String,
    pub replicas: u32,
    pub port: u16,
    pub health_path: String,
}

impl DeploymentManifest {
    /// Manifest deploying `release` into `color`.
    pub fn for_release(
        release: &ReleaseDescriptor,
        color: DeploymentTarget,
        config: &Config,
    ) -> Self {
        DeploymentManifest {
            name: DeploymentName::for_color(release.app(), color),
            namespace: release.namespace().clone(),
            app: release.app().clone(),
            color,
            version: release.version().clone(),
            environment: release.environment(),
            image_repository: config.image_for(release.app()),
            replicas: release.replica_count(),
            port: config.healthcheck.port,
            health_path: config.healthcheck.path.clone(),
        }
    }

    /// Full image reference: `repo:tag`, or `repo@sha256:...` for digests.
    pub fn image(&self) -> String {
        if self.version.is_digest() {
            format!("{}@{}", self.image_repository, self.version)
        } else {
            format!("{}:{}", self.image_repository, self.version)
        }
    }

    /// Render as a Kubernetes object suitable for `kubectl apply`.
    pub fn to_json(&self) -> Value {
        let selector = json!({
            "app": self.app.as_str(),
            "color": self.color.as_str(),
        });
        let labels = json!({
            "app": self.app.as_str(),
            "color": self.color.as_str(),
            "version": self.version.label_value(),
            "environment": self.environment.as_str(),
        });

        json!({
            "apiVersion": "apps/v1",
            "kind": "Deployment",
            "metadata": {
                "name": self.name.as_str(),
                "namespace": self.namespace.as_str(),
                "labels": labels,
            },
            "spec": {
                "replicas": self.replicas,
                "selector": { "matchLabels": selector },
                "template": {
                    "metadata": { "labels": labels },
                    "spec": {
                        "containers": [{
                            "name": self.app.as_str(),
                            "image": self.image(),
                            "ports": [{ "containerPort": self.port, "name": "http" }],
                            "env": [
                                { "name": "DEPLOYMENT_COLOR", "value": self.color.as_str() },
                                { "name": "RELEASE_VERSION", "value": self.version.as_str() },
                            ],
                            "readinessProbe": {
                                "httpGet": { "path": self.health_path, "port": self.port },
                                "periodSeconds": 5,
                                "failureThreshold": 3,
                            },
                        }],
                    },
                },
            },
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    fn release(version: &str) -> ReleaseDescriptor {
        ReleaseDescriptor::new(
            ReleaseVersion::new(version).unwrap(),
            Environment::Production,
            ResourceName::new("games").unwrap(),
            ResourceName::new("gameforge").unwrap(),
            3,
            Duration::from_secs(300),
        )
    }

    #[test]
    fn manifest_targets_color_specific_deployment() {
        let mut config = Config::default();
        config.image = Some("registry.example.com/gameforge".to_string());

        let manifest =
            DeploymentManifest::for_release(&release("v2.0.0"), DeploymentTarget::Green, &config);
        let doc = manifest.to_json();

        assert_eq!(doc["metadata"]["name"], "gameforge-green");
        assert_eq!(doc["metadata"]["namespace"], "games");
        assert_eq!(doc["spec"]["replicas"], 3);
        assert_eq!(doc["spec"]["selector"]["matchLabels"]["color"], "green");
        assert_eq!(doc["spec"]["template"]["metadata"]["labels"]["version"], "v2.0.0");
        let container = &doc["spec"]["template"]["spec"]["containers"][0];
        assert_eq!(container["image"], "registry.example.com/gameforge:v2.0.0");
        assert_eq!(container["readinessProbe"]["httpGet"]["path"], "/health");
    }

    #[test]
    fn digests_use_at_syntax() {
        let manifest = DeploymentManifest::for_release(
            &release("sha256:0123abcd"),
            DeploymentTarget::Blue,
            &Config::default(),
        );
        assert_eq!(manifest.image(), "gameforge@sha256:0123abcd");
    }
}
