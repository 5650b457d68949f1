// ABOUTME: ClusterClient implementation that shells out to kubectl.
// ABOUTME: Classifies kubectl failures and parses its JSON and jsonpath output.

use async_trait::async_trait;
use serde::Deserialize;
use snafu::ResultExt;
use std::process::{Output, Stdio};
use std::time::{Duration, Instant};
use tokio::io::AsyncWriteExt;
use tokio::process::Command;

use super::error::{JsonSnafu, SpawnSnafu};
use super::manifest::COLOR_LABEL;
use super::{
    ClusterClient, ClusterError, DeploymentManifest, HttpProbe, ProbeResult, ReplicaCounts,
};
use crate::config::ClusterConfig;
use crate::types::{DeploymentName, DeploymentTarget, ResourceName, ServiceRef};

/// Talks to the cluster through the `kubectl` binary.
#[derive(Debug, Clone)]
pub struct KubectlClient {
    program: String,
    context: Option<String>,
    namespace: ResourceName,
}

impl KubectlClient {
    pub fn new(config: &ClusterConfig, namespace: ResourceName) -> Self {
        Self {
            program: config.kubectl.clone(),
            context: config.context.clone(),
            namespace,
        }
    }

    fn command(&self, args: &[&str]) -> Command {
        let mut cmd = Command::new(&self.program);
        if let Some(ref context) = self.context {
            cmd.arg("--context").arg(context);
        }
        cmd.arg("--namespace")
            .arg(self.namespace.as_str())
            .args(args)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            // Cancelled waits must not leave kubectl running.
            .kill_on_drop(true);
        cmd
    }

    fn describe(&self, args: &[&str]) -> String {
        format!("{} {}", self.program, args.join(" "))
    }

    /// Run kubectl and return its raw output, whatever the exit status.
    async fn output(&self, args: &[&str], stdin: Option<&[u8]>) -> Result<Output, ClusterError> {
        let mut cmd = self.command(args);
        tracing::debug!(namespace = %self.namespace, "running {}", self.describe(args));

        let Some(input) = stdin else {
            return cmd.output().await.context(SpawnSnafu {
                program: self.program.clone(),
            });
        };

        cmd.stdin(Stdio::piped());
        let mut child = cmd.spawn().context(SpawnSnafu {
            program: self.program.clone(),
        })?;
        if let Some(mut pipe) = child.stdin.take() {
            pipe.write_all(input).await.context(SpawnSnafu {
                program: self.program.clone(),
            })?;
            // Dropping the pipe closes stdin so kubectl sees EOF.
        }
        child.wait_with_output().await.context(SpawnSnafu {
            program: self.program.clone(),
        })
    }

    /// Run kubectl and return stdout, mapping a non-zero exit to a classified error.
    async fn run(&self, args: &[&str], stdin: Option<&[u8]>) -> Result<String, ClusterError> {
        let output = self.output(args, stdin).await?;
        if output.status.success() {
            Ok(String::from_utf8_lossy(&output.stdout).into_owned())
        } else {
            Err(ClusterError::from_stderr(
                self.describe(args),
                &String::from_utf8_lossy(&output.stderr),
            ))
        }
    }
}

#[derive(Debug, Deserialize)]
struct DeploymentDoc {
    #[serde(default)]
    spec: DeploymentSpecDoc,
    #[serde(default)]
    status: DeploymentStatusDoc,
}

#[derive(Debug, Default, Deserialize)]
struct DeploymentSpecDoc {
    #[serde(default)]
    replicas: u32,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct DeploymentStatusDoc {
    #[serde(default)]
    ready_replicas: u32,
}

/// Parse the `%{http_code}` curl writes; "000" means no response.
fn parse_status_code(stdout: &str) -> Option<u16> {
    let code = stdout.trim();
    if code.len() != 3 {
        return None;
    }
    code.parse().ok()
}

#[async_trait]
impl ClusterClient for KubectlClient {
    fn namespace(&self) -> &ResourceName {
        &self.namespace
    }

    async fn get_active_color(
        &self,
        service: &ServiceRef,
    ) -> Result<Option<DeploymentTarget>, ClusterError> {
        let jsonpath = format!("jsonpath={{.spec.selector.{COLOR_LABEL}}}");
        let args = ["get", "service", service.as_str(), "-o", jsonpath.as_str()];
        let stdout = self.run(&args, None).await?;

        let value = stdout.trim();
        if value.is_empty() {
            return Ok(None);
        }
        value
            .parse::<DeploymentTarget>()
            .map(Some)
            .map_err(|e| ClusterError::UnexpectedOutput {
                command: self.describe(&args),
                detail: e.to_string(),
            })
    }

    async fn apply_deployment(&self, manifest: &DeploymentManifest) -> Result<(), ClusterError> {
        let body = manifest.to_json().to_string();
        self.run(&["apply", "-f", "-"], Some(body.as_bytes()))
            .await
            .map(|_| ())
    }

    async fn wait_for_ready(
        &self,
        deployment: &DeploymentName,
        timeout: Duration,
    ) -> Result<(), ClusterError> {
        let target = format!("deployment/{deployment}");
        let timeout = format!("--timeout={}s", timeout.as_secs().max(1));
        self.run(&["rollout", "status", target.as_str(), timeout.as_str()], None)
            .await
            .map(|_| ())
    }

    async fn get_ready_replicas(
        &self,
        deployment: &DeploymentName,
    ) -> Result<ReplicaCounts, ClusterError> {
        let args = ["get", "deployment", deployment.as_str(), "-o", "json"];
        let stdout = self.run(&args, None).await?;
        let doc: DeploymentDoc = serde_json::from_str(&stdout).context(JsonSnafu {
            command: self.describe(&args),
        })?;
        Ok(ReplicaCounts {
            ready: doc.status.ready_replicas,
            desired: doc.spec.replicas,
        })
    }

    async fn set_service_selector(
        &self,
        service: &ServiceRef,
        color: DeploymentTarget,
    ) -> Result<(), ClusterError> {
        let mut selector = serde_json::Map::new();
        selector.insert(COLOR_LABEL.to_string(), color.as_str().into());
        let patch = serde_json::json!({ "spec": { "selector": selector } }).to_string();
        self.run(
            &["patch", "service", service.as_str(), "--type", "merge", "-p", patch.as_str()],
            None,
        )
        .await
        .map(|_| ())
    }

    async fn scale_deployment(
        &self,
        deployment: &DeploymentName,
        replicas: u32,
    ) -> Result<(), ClusterError> {
        let target = format!("deployment/{deployment}");
        let replicas = format!("--replicas={replicas}");
        self.run(&["scale", target.as_str(), replicas.as_str()], None)
            .await
            .map(|_| ())
    }

    async fn delete_deployment(&self, deployment: &DeploymentName) -> Result<(), ClusterError> {
        self.run(
            &["delete", "deployment", deployment.as_str(), "--ignore-not-found"],
            None,
        )
        .await
        .map(|_| ())
    }

    async fn exec_health_probe(
        &self,
        deployment: &DeploymentName,
        probe: &HttpProbe,
    ) -> Result<ProbeResult, ClusterError> {
        let target = format!("deployment/{deployment}");
        let max_time = probe.timeout.as_secs().max(1).to_string();
        let url = format!(
            "http://localhost:{}/{}",
            probe.port,
            probe.path.trim_start_matches('/')
        );
        let args = [
            "exec",
            target.as_str(),
            "--",
            "curl",
            "-s",
            "-o",
            "/dev/null",
            "-w",
            "%{http_code}",
            "--max-time",
            max_time.as_str(),
            url.as_str(),
        ];

        let started = Instant::now();
        let output = self.output(&args, None).await?;
        let latency = started.elapsed();

        // curl exits non-zero on connection failure but still prints "000".
        let stdout = String::from_utf8_lossy(&output.stdout);
        match parse_status_code(&stdout) {
            Some(status) => Ok(ProbeResult { status, latency }),
            None if output.status.success() => Err(ClusterError::UnexpectedOutput {
                command: self.describe(&args),
                detail: format!("expected an HTTP status code, got '{}'", stdout.trim()),
            }),
            None => Err(ClusterError::from_stderr(
                self.describe(&args),
                &String::from_utf8_lossy(&output.stderr),
            )),
        }
    }
}
