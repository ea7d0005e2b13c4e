//! Two-stage tool execution for one download

use super::runtime::{ContainerRuntime, ContainerSpec};
use crate::config::ToolsConfig;
use crate::error::{Error, Result, ToolError};
use crate::types::{DownloadId, FileType};
use std::sync::Arc;

/// The two tool stages, in execution order
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    /// Fetches the matrices for an accession from ImmunoSpace
    Groups,
    /// Maps the fetched matrices in place
    Mapper,
}

impl Stage {
    /// Stage name used in container names and logs
    pub fn as_str(&self) -> &'static str {
        match self {
            Stage::Groups => "groups",
            Stage::Mapper => "mapper",
        }
    }

    /// Container name for this stage of a download
    pub fn container_name(&self, download_id: &DownloadId) -> String {
        format!("{}-immunespace-{}", download_id, self.as_str())
    }
}

/// Runs the groups and mapper stages against a download's working directory
pub struct ToolRunner {
    runtime: Arc<dyn ContainerRuntime>,
    config: ToolsConfig,
}

impl ToolRunner {
    /// Create a runner over a container runtime
    pub fn new(runtime: Arc<dyn ContainerRuntime>, config: ToolsConfig) -> Self {
        Self { runtime, config }
    }

    /// Name of the underlying runtime
    pub fn runtime_name(&self) -> &'static str {
        self.runtime.name()
    }

    /// Container spec for one stage of a download
    pub fn stage_spec(
        &self,
        stage: Stage,
        download_id: &DownloadId,
        accession_id: &str,
        apikey: &str,
    ) -> ContainerSpec {
        let working_dir = format!("{}/{}", self.config.container_data_dir, download_id);
        let (image, args) = match stage {
            Stage::Groups => (
                self.config.groups_image.clone(),
                vec![
                    "-g".to_string(),
                    accession_id.to_string(),
                    "-a".to_string(),
                    apikey.to_string(),
                    "-o".to_string(),
                    working_dir.clone(),
                ],
            ),
            Stage::Mapper => (
                self.config.mapper_image.clone(),
                vec![
                    "-g".to_string(),
                    format!(
                        "{}/{}",
                        working_dir,
                        FileType::DatasetGeneExpression.file_name()
                    ),
                    "-p".to_string(),
                    format!("{}/{}", working_dir, FileType::DatasetProperties.file_name()),
                ],
            ),
        };

        ContainerSpec {
            name: stage.container_name(download_id),
            image,
            args,
            volume: self.config.data_volume.clone(),
            mount_point: self.config.container_data_dir.clone(),
            working_dir,
            timeout: self.config.stage_timeout,
        }
    }

    /// Run both stages and return their combined diagnostics
    ///
    /// A groups failure (non-zero exit or the failure marker in its output)
    /// aborts before the mapper runs. Mapper failures are only recorded in the
    /// diagnostics unless `strict_mapper` is set.
    pub async fn run(
        &self,
        download_id: &DownloadId,
        accession_id: &str,
        apikey: &str,
    ) -> Result<String> {
        let mut diagnostics = String::new();

        let groups = self.stage_spec(Stage::Groups, download_id, accession_id, apikey);
        tracing::info!(download_id = %download_id, stage = "groups", image = %groups.image, "Starting tool stage");
        let output = self.runtime.run(&groups).await?;
        diagnostics.push_str(&output.output);

        if !output.success || self.has_failure_marker(&output.output) {
            tracing::error!(
                download_id = %download_id,
                stage = "groups",
                exit_code = ?output.exit_code,
                "Tool stage failed"
            );
            return Err(Error::Tool(ToolError::StageFailed {
                stage: Stage::Groups.as_str().to_string(),
                diagnostics,
            }));
        }
        tracing::info!(download_id = %download_id, stage = "groups", "Tool stage finished");

        let mapper = self.stage_spec(Stage::Mapper, download_id, accession_id, apikey);
        tracing::info!(download_id = %download_id, stage = "mapper", image = %mapper.image, "Starting tool stage");
        let mapper_failed = match self.runtime.run(&mapper).await {
            Ok(output) => {
                diagnostics.push_str(&output.output);
                !output.success || self.has_failure_marker(&output.output)
            }
            Err(e) if !self.config.strict_mapper => {
                diagnostics.push_str(&format!("{}\n", e));
                true
            }
            Err(e) => return Err(e),
        };

        if mapper_failed {
            if self.config.strict_mapper {
                tracing::error!(download_id = %download_id, stage = "mapper", "Tool stage failed");
                return Err(Error::Tool(ToolError::StageFailed {
                    stage: Stage::Mapper.as_str().to_string(),
                    diagnostics,
                }));
            }
            tracing::warn!(
                download_id = %download_id,
                stage = "mapper",
                "Mapper stage reported a failure, keeping groups output"
            );
        } else {
            tracing::info!(download_id = %download_id, stage = "mapper", "Tool stage finished");
        }

        tracing::debug!(download_id = %download_id, diagnostics = %diagnostics, "Tool diagnostics");
        Ok(diagnostics)
    }

    /// Force-remove any stage containers left behind by an abandoned run
    pub async fn abort(&self, download_id: &DownloadId) {
        for stage in [Stage::Groups, Stage::Mapper] {
            let name = stage.container_name(download_id);
            if let Err(e) = self.runtime.remove(&name).await {
                tracing::warn!(container = %name, error = %e, "Failed to remove stage container");
            }
        }
    }

    fn has_failure_marker(&self, output: &str) -> bool {
        output.contains(&self.config.failure_marker)
    }
}
