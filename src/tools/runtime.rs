//! Container runtime abstraction

use async_trait::async_trait;
use std::time::Duration;

/// Everything needed to start one stage container
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ContainerSpec {
    /// Container name, unique per download and stage
    pub name: String,
    /// Image reference
    pub image: String,
    /// Arguments passed to the image entrypoint
    pub args: Vec<String>,
    /// Volume or host path mounted read-write at `mount_point`
    pub volume: String,
    /// Mount point inside the container
    pub mount_point: String,
    /// Working directory inside the container
    pub working_dir: String,
    /// How long the container may run before it is killed
    pub timeout: Duration,
}

/// Captured result of a finished container
#[must_use]
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ContainerOutput {
    /// Whether the container exited with status 0
    pub success: bool,
    /// Exit code, if the process was not killed by a signal
    pub exit_code: Option<i32>,
    /// Combined stdout and stderr
    pub output: String,
}

/// Trait for running stage containers
///
/// Implementations can drive a container CLI, talk to a daemon API, or fake
/// the stages entirely in tests.
#[async_trait]
pub trait ContainerRuntime: Send + Sync {
    /// Run a container to completion and capture its output
    ///
    /// A non-zero exit is reported through [`ContainerOutput::success`], not as
    /// an error. Errors mean the container could not be run at all or timed out.
    async fn run(&self, spec: &ContainerSpec) -> crate::Result<ContainerOutput>;

    /// Force-remove a container by name; a missing container is not an error
    async fn remove(&self, name: &str) -> crate::Result<()>;

    /// Short name of the implementation for logging
    fn name(&self) -> &'static str;
}
