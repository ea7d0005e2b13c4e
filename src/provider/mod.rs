//! Download orchestration split into focused submodules.
//!
//! The `ImmunespaceProvider` struct and its methods are organized by domain:
//! - [`submit`] - Deduplication and dispatch of submissions
//! - [`execute`] - Running the tool stages and recording file statistics
//! - [`jobs`] - In-process job registry and queue
//! - [`worker`] - Long-lived worker pool draining the queue
//! - [`status`] - Status reporting and search
//! - [`files`] - Object descriptors and file/bundle access
//! - [`delete`] - Deletion workflow
//! - [`lifecycle`] - Startup restoration and shutdown coordination

mod delete;
mod execute;
mod files;
mod jobs;
mod lifecycle;
mod locks;
mod status;
mod submit;
mod worker;

// unwrap/expect are acceptable in tests for concise failure-on-error assertions
#[allow(clippy::unwrap_used, clippy::expect_used)]
#[cfg(test)]
pub(crate) mod test_helpers;
#[allow(clippy::unwrap_used, clippy::expect_used)]
#[cfg(test)]
mod tests;

pub use delete::verify_deleted_count;
pub use files::{BUNDLE_FILE_NAME, OpenedFile};
pub use jobs::{CancelOutcome, JobOutcome};
pub use submit::{CacheDecision, plan_submission};

use crate::config::{Config, ExecutionMode};
use crate::db::{Database, DownloadRecord};
use crate::error::{Error, Result};
use crate::tools::{ContainerRuntime, DockerCli, ToolRunner};
use crate::types::{ContentsObject, DownloadId, ObjectDescriptor};
use chrono::{DateTime, Utc};
use std::path::PathBuf;
use std::sync::Arc;
use std::sync::atomic::AtomicBool;
use tokio_util::sync::CancellationToken;

/// Media type reported in object descriptors
pub const DESCRIPTOR_MIME_TYPE: &str = "application/csv";

/// Main provider instance (cloneable - all fields are Arc-wrapped)
#[derive(Clone)]
pub struct ImmunespaceProvider {
    /// Database instance for persistence
    /// Public for integration tests to inspect records
    pub db: Arc<Database>,
    /// Configuration (wrapped in Arc for sharing across tasks)
    pub(crate) config: Arc<Config>,
    /// Two-stage tool runner over the configured container runtime
    pub(crate) runner: Arc<ToolRunner>,
    /// Queued and running jobs
    pub(crate) jobs: jobs::JobTracker,
    /// Serializes check-then-act on one submission key
    pub(crate) key_locks: locks::KeyLocks,
    /// Flag to indicate whether new submissions are accepted (cleared during shutdown)
    pub(crate) accepting_new: Arc<AtomicBool>,
    /// Stops the worker pool
    pub(crate) shutdown_token: CancellationToken,
    /// Handles of the running workers
    pub(crate) workers: Arc<tokio::sync::Mutex<Vec<tokio::task::JoinHandle<()>>>>,
}

impl ImmunespaceProvider {
    /// Create a provider that runs the tool stages through the docker CLI
    ///
    /// Fails with [`Error::NotSupported`] when no docker binary is configured
    /// or found in PATH.
    pub async fn new(config: Config) -> Result<Self> {
        let docker = DockerCli::from_config(&config.tools).ok_or_else(|| {
            Error::NotSupported(
                "docker binary not found; set tools.docker_path or add docker to PATH".to_string(),
            )
        })?;
        Self::with_runtime(config, Arc::new(docker)).await
    }

    /// Create a provider over an explicit container runtime
    ///
    /// This initializes all core components:
    /// - Validates the configuration and creates the data root
    /// - Opens/creates the SQLite database and runs migrations
    /// - In async mode, re-enqueues interrupted downloads and starts the worker pool
    pub async fn with_runtime(config: Config, runtime: Arc<dyn ContainerRuntime>) -> Result<Self> {
        config.validate()?;

        tokio::fs::create_dir_all(config.data_root())
            .await
            .map_err(|e| {
                Error::Io(std::io::Error::new(
                    e.kind(),
                    format!(
                        "Failed to create data root '{}': {}",
                        config.data_root().display(),
                        e
                    ),
                ))
            })?;

        let db = Database::new(&config.persistence.database_path).await?;
        let runner = ToolRunner::new(runtime, config.tools.clone());

        tracing::info!(
            data_root = %config.data_root().display(),
            runtime = runner.runtime_name(),
            mode = ?config.queue.mode,
            "Provider initialized"
        );

        let provider = Self {
            db: Arc::new(db),
            config: Arc::new(config),
            runner: Arc::new(runner),
            jobs: jobs::JobTracker::default(),
            key_locks: locks::KeyLocks::default(),
            accepting_new: Arc::new(AtomicBool::new(true)),
            shutdown_token: CancellationToken::new(),
            workers: Arc::new(tokio::sync::Mutex::new(Vec::new())),
        };

        if provider.config.queue.mode == ExecutionMode::Async {
            provider.restore_queue().await?;
            let handles = provider.start_workers();
            provider.workers.lock().await.extend(handles);
        }

        Ok(provider)
    }

    /// Get a reference to the configuration
    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Working directory of a download
    pub fn working_dir(&self, download_id: &DownloadId) -> PathBuf {
        self.config.data_root().join(download_id.as_str())
    }

    /// Build the DRS-style descriptor of a record
    pub(crate) fn descriptor(&self, record: &DownloadRecord, size: u64) -> ObjectDescriptor {
        let base = self.config.server.api.public_base_url.trim_end_matches('/');
        let object_id = record.object_id.clone();

        ObjectDescriptor {
            id: object_id.clone(),
            object_id: object_id.clone(),
            download_id: record.download_id.clone(),
            submitter_id: record.submitter_id.clone(),
            name: record.file_name.clone(),
            self_uri: format!("{}/objects/{}", base, object_id),
            size,
            dimensions: record.dimensions.clone(),
            data_type: record.data_type.clone(),
            file_type: record.file_type.clone(),
            created_time: timestamp(record.created_at),
            mime_type: DESCRIPTOR_MIME_TYPE.to_string(),
            status: record.job_status(),
            contents: vec![ContentsObject {
                id: object_id.to_string(),
                name: record.file_name.clone(),
                drs_uri: format!("{}/files/{}", base, object_id),
            }],
            stderr: record.stderr.clone(),
        }
    }
}

/// Convert a stored Unix timestamp, falling back to the epoch
pub(crate) fn timestamp(secs: i64) -> DateTime<Utc> {
    DateTime::from_timestamp(secs, 0).unwrap_or_default()
}
