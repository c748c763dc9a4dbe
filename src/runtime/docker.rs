//! Docker CLI adapter.
//!
//! All Docker interactions go through `DockerRuntime`, which provides
//! consistent timeout handling, error mapping to [`RuntimeError`], and a single
//! point where `Command::new("docker")` is constructed.

use super::{ContainerInfo, ContainerRuntime, RunSpec, RuntimeError, MANAGED_LABEL, USER_LABEL};
use async_trait::async_trait;
use serde::Deserialize;
use std::collections::BTreeMap;
use std::process::Output;
use std::time::Duration;

const DOCKER_BIN: &str = "docker";

/// Default per-command timeout.
const DEFAULT_TIMEOUT: Duration = Duration::from_secs(60);

/// Client for the `docker` binary.
#[derive(Debug, Clone)]
pub struct DockerRuntime {
    timeout: Duration,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
struct InspectState {
    status: String,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "PascalCase")]
struct InspectConfig {
    #[serde(default)]
    labels: Option<BTreeMap<String, String>>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
struct InspectEntry {
    id: String,
    name: String,
    state: InspectState,
    #[serde(default)]
    config: InspectConfig,
}

impl DockerRuntime {
    pub fn new() -> Self {
        Self {
            timeout: DEFAULT_TIMEOUT,
        }
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    // ========================================================================
    // Internal helpers
    // ========================================================================

    fn command_string(&self, args: &[&str]) -> String {
        format!("{} {}", DOCKER_BIN, args.join(" "))
    }

    /// Run a docker command with a timeout, returning raw Output.
    async fn exec(&self, args: &[&str]) -> Result<Output, RuntimeError> {
        let result = tokio::time::timeout(
            self.timeout,
            tokio::process::Command::new(DOCKER_BIN)
                .args(args)
                .kill_on_drop(true)
                .output(),
        )
        .await;

        let cmd_str = self.command_string(args);

        match result {
            Ok(Ok(output)) => Ok(output),
            Ok(Err(e)) => Err(RuntimeError::exec_failed(cmd_str, e)),
            Err(_) => Err(RuntimeError::timeout(cmd_str, self.timeout)),
        }
    }

    /// Run a docker command addressing `container`, returning Output only if exit 0.
    async fn exec_success(&self, args: &[&str], container: &str) -> Result<Output, RuntimeError> {
        let output = self.exec(args).await?;
        if output.status.success() {
            Ok(output)
        } else {
            Err(RuntimeError::failed(self.command_string(args), container, &output))
        }
    }

    /// Build the argument vector for `docker run`.
    pub(crate) fn run_args(spec: &RunSpec) -> Vec<String> {
        // No --rm: removal is explicit so state tracking stays accurate.
        let mut args = vec!["run".to_string(), "-d".to_string()];
        if spec.interactive {
            args.push("-i".to_string());
        }
        if spec.tty {
            args.push("-t".to_string());
        }
        args.push("--name".to_string());
        args.push(spec.name.clone());
        args.push("--cpu-period".to_string());
        args.push(spec.cpu_period.to_string());
        args.push("--cpu-quota".to_string());
        args.push(spec.cpu_quota.to_string());
        args.push("--memory".to_string());
        args.push(spec.memory_limit.clone());
        for (key, value) in &spec.labels {
            args.push("--label".to_string());
            args.push(format!("{}={}", key, value));
        }
        args.push(spec.image.clone());
        args
    }

    fn parse_inspect(command: &str, stdout: &[u8]) -> Result<ContainerInfo, RuntimeError> {
        let entries: Vec<InspectEntry> =
            serde_json::from_slice(stdout).map_err(|e| RuntimeError::Malformed {
                command: command.to_string(),
                reason: e.to_string(),
            })?;
        let entry = entries.into_iter().next().ok_or_else(|| RuntimeError::Malformed {
            command: command.to_string(),
            reason: "empty inspect result".to_string(),
        })?;
        Ok(ContainerInfo {
            id: entry.id,
            name: entry.name.trim_start_matches('/').to_string(),
            status: entry.state.status,
            labels: entry.config.labels.unwrap_or_default(),
        })
    }

    fn parse_ps_line(line: &str) -> Option<ContainerInfo> {
        let mut parts = line.splitn(4, '\t');
        let id = parts.next()?.trim();
        let name = parts.next()?.trim();
        if id.is_empty() || name.is_empty() {
            return None;
        }
        let status = parts.next().unwrap_or("").trim().to_string();
        let mut labels = BTreeMap::new();
        labels.insert(MANAGED_LABEL.to_string(), "true".to_string());
        if let Some(user) = parts.next().map(str::trim).filter(|u| !u.is_empty()) {
            labels.insert(USER_LABEL.to_string(), user.to_string());
        }
        Some(ContainerInfo {
            id: id.to_string(),
            name: name.to_string(),
            status,
            labels,
        })
    }
}

impl Default for DockerRuntime {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl ContainerRuntime for DockerRuntime {
    async fn run(&self, spec: &RunSpec) -> Result<ContainerInfo, RuntimeError> {
        let args = Self::run_args(spec);
        let arg_refs: Vec<&str> = args.iter().map(String::as_str).collect();
        let output = self.exec(&arg_refs).await?;
        if !output.status.success() {
            return Err(RuntimeError::failed(
                self.command_string(&arg_refs),
                &spec.name,
                &output,
            ));
        }

        let id = String::from_utf8_lossy(&output.stdout).trim().to_string();
        if id.is_empty() {
            return Err(RuntimeError::Malformed {
                command: self.command_string(&arg_refs),
                reason: "no container id printed".to_string(),
            });
        }

        // The container exists at this point; an inspect hiccup must not turn
        // a successful run into a failure.
        match self.inspect(&id).await {
            Ok(info) => Ok(info),
            Err(e) => {
                tracing::warn!("Created container {} but inspect failed: {}", id, e);
                Ok(ContainerInfo {
                    id,
                    name: spec.name.clone(),
                    status: "unknown".to_string(),
                    labels: spec.labels.clone(),
                })
            }
        }
    }

    async fn inspect(&self, container_id: &str) -> Result<ContainerInfo, RuntimeError> {
        let args = ["inspect", "--type", "container", container_id];
        let output = self.exec_success(&args, container_id).await?;
        Self::parse_inspect(&self.command_string(&args), &output.stdout)
    }

    async fn logs(&self, container_id: &str) -> Result<Vec<u8>, RuntimeError> {
        let output = self.exec_success(&["logs", container_id], container_id).await?;
        let mut combined = output.stdout;
        combined.extend_from_slice(&output.stderr);
        Ok(combined)
    }

    async fn stop(&self, container_id: &str) -> Result<(), RuntimeError> {
        self.exec_success(&["stop", container_id], container_id)
            .await
            .map(|_| ())
    }

    async fn remove(&self, container_id: &str) -> Result<(), RuntimeError> {
        self.exec_success(&["rm", container_id], container_id)
            .await
            .map(|_| ())
    }

    async fn list_managed(&self, name_prefix: &str) -> Result<Vec<ContainerInfo>, RuntimeError> {
        let label_filter = format!("label={}=true", MANAGED_LABEL);
        let name_filter = format!("name=^{}", name_prefix);
        let format = format!("{{{{.ID}}}}\t{{{{.Names}}}}\t{{{{.State}}}}\t{{{{.Label \"{}\"}}}}", USER_LABEL);
        let args = [
            "ps",
            "-a",
            "--no-trunc",
            "--filter",
            &label_filter,
            "--filter",
            &name_filter,
            "--format",
            &format,
        ];
        let output = self.exec(&args).await?;
        if !output.status.success() {
            return Err(RuntimeError::failed(self.command_string(&args), "", &output));
        }

        Ok(String::from_utf8_lossy(&output.stdout)
            .lines()
            .filter_map(Self::parse_ps_line)
            .filter(|c| c.name.starts_with(name_prefix))
            .collect())
    }
}
