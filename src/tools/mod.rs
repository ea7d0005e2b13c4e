//! External tool stages
//!
//! A download is produced by two containerized tools run against the same
//! working directory: the groups tool fetches the matrices for an accession
//! and the mapper rewrites them in place. The [`ContainerRuntime`] trait is the
//! seam between the orchestration in [`ToolRunner`] and the process that
//! actually starts containers.

mod docker;
mod runner;
mod runtime;

pub use docker::DockerCli;
pub use runner::{Stage, ToolRunner};
pub use runtime::{ContainerOutput, ContainerRuntime, ContainerSpec};
