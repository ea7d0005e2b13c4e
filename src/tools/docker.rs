//! Container runtime backed by the docker CLI

use super::runtime::{ContainerOutput, ContainerRuntime, ContainerSpec};
use crate::config::ToolsConfig;
use crate::error::{Error, ToolError};
use async_trait::async_trait;
use std::path::PathBuf;
use tokio::process::Command;

/// Runs stage containers with `docker run --rm`
///
/// # Examples
///
/// ```no_run
/// use immunespace_provider::tools::DockerCli;
/// use std::path::PathBuf;
///
/// // Explicit path
/// let docker = DockerCli::new(PathBuf::from("/usr/bin/docker"));
///
/// // Or auto-discover from PATH
/// let docker = DockerCli::from_path().expect("docker not found in PATH");
/// ```
pub struct DockerCli {
    binary_path: PathBuf,
}

impl DockerCli {
    /// Create a runtime with an explicit binary path
    pub fn new(binary_path: PathBuf) -> Self {
        Self { binary_path }
    }

    /// Attempt to find docker in PATH
    pub fn from_path() -> Option<Self> {
        which::which("docker").ok().map(Self::new)
    }

    /// Resolve the binary from configuration, falling back to PATH if allowed
    pub fn from_config(tools: &ToolsConfig) -> Option<Self> {
        match &tools.docker_path {
            Some(path) => Some(Self::new(path.clone())),
            None if tools.search_path => Self::from_path(),
            None => None,
        }
    }

    /// Arguments of the `docker run` invocation for `spec`
    pub fn run_args(spec: &ContainerSpec) -> Vec<String> {
        let mut args = vec![
            "run".to_string(),
            "--rm".to_string(),
            "--name".to_string(),
            spec.name.clone(),
            "--volume".to_string(),
            format!("{}:{}:rw", spec.volume, spec.mount_point),
            "--workdir".to_string(),
            spec.working_dir.clone(),
            spec.image.clone(),
        ];
        args.extend(spec.args.iter().cloned());
        args
    }
}

#[async_trait]
impl ContainerRuntime for DockerCli {
    async fn run(&self, spec: &ContainerSpec) -> crate::Result<ContainerOutput> {
        let mut command = Command::new(&self.binary_path);
        command.args(Self::run_args(spec)).kill_on_drop(true);

        let output = match tokio::time::timeout(spec.timeout, command.output()).await {
            Ok(result) => result.map_err(|e| ToolError::Launch {
                stage: spec.name.clone(),
                reason: format!("failed to execute docker: {}", e),
            })?,
            Err(_) => {
                // Killing the CLI client leaves the container running
                if let Err(e) = self.remove(&spec.name).await {
                    tracing::warn!(container = %spec.name, error = %e, "Failed to remove timed out container");
                }
                return Err(Error::Tool(ToolError::Timeout {
                    stage: spec.name.clone(),
                    seconds: spec.timeout.as_secs(),
                }));
            }
        };

        let mut combined = String::from_utf8_lossy(&output.stdout).into_owned();
        combined.push_str(&String::from_utf8_lossy(&output.stderr));

        Ok(ContainerOutput {
            success: output.status.success(),
            exit_code: output.status.code(),
            output: combined,
        })
    }

    async fn remove(&self, name: &str) -> crate::Result<()> {
        let output = Command::new(&self.binary_path)
            .args(["rm", "--force", name])
            .output()
            .await
            .map_err(|e| Error::Other(format!("Failed to execute docker rm: {}", e)))?;

        let stderr = String::from_utf8_lossy(&output.stderr);
        if output.status.success() || stderr.contains("No such container") {
            Ok(())
        } else {
            Err(Error::Other(format!(
                "docker rm {} failed: {}",
                name,
                stderr.trim()
            )))
        }
    }

    fn name(&self) -> &'static str {
        "docker-cli"
    }
}
