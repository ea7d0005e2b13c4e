//! Shared test helpers for creating ImmunespaceProvider instances in tests.

use crate::config::{Config, ExecutionMode};
use crate::provider::ImmunespaceProvider;
use crate::tools::{ContainerOutput, ContainerRuntime, ContainerSpec};
use crate::types::{DownloadId, JobStatus};
use async_trait::async_trait;
use std::path::PathBuf;
use std::sync::Arc;
use std::sync::Mutex;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::time::Duration;
use tempfile::tempdir;
use tokio::sync::Notify;

/// Gene matrix written by the fake groups stage: 4 lines, 3 sample columns
pub(crate) const GENE_MATRIX: &str = "gene,s1,s2,s3\nIL6,1.5,2.0,0.3\nTNF,0.1,0.2,0.9\nCD4,3.3,3.1,2.8\n";

/// Phenotype matrix written by the fake groups stage: 3 lines, 2 columns
pub(crate) const PHENO_MATRIX: &str = "sample,age,sex\ns1,34,F\ns2,51,M\n";

/// How the fake groups stage behaves
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum FakeBehavior {
    /// Write both matrices and exit 0
    Succeed,
    /// Print the failure marker without writing anything
    GroupsFail,
    /// Exit 0 but write nothing
    NoOutput,
}

/// Container runtime that writes fixture CSVs into the data root
pub(crate) struct FakeRuntime {
    data_root: PathBuf,
    behavior: Mutex<FakeBehavior>,
    groups_runs: AtomicUsize,
    mapper_runs: AtomicUsize,
    blocked: AtomicBool,
    release: Notify,
    removed: Mutex<Vec<String>>,
}

impl FakeRuntime {
    pub(crate) fn new(data_root: PathBuf) -> Arc<Self> {
        Arc::new(Self {
            data_root,
            behavior: Mutex::new(FakeBehavior::Succeed),
            groups_runs: AtomicUsize::new(0),
            mapper_runs: AtomicUsize::new(0),
            blocked: AtomicBool::new(false),
            release: Notify::new(),
            removed: Mutex::new(Vec::new()),
        })
    }

    pub(crate) fn set_behavior(&self, behavior: FakeBehavior) {
        *self.behavior.lock().unwrap() = behavior;
    }

    /// Number of groups stage runs so far
    pub(crate) fn groups_runs(&self) -> usize {
        self.groups_runs.load(Ordering::SeqCst)
    }

    /// Number of mapper stage runs so far
    pub(crate) fn mapper_runs(&self) -> usize {
        self.mapper_runs.load(Ordering::SeqCst)
    }

    /// Make the groups stage wait until [`FakeRuntime::unblock`] is called
    pub(crate) fn block(&self) {
        self.blocked.store(true, Ordering::SeqCst);
    }

    pub(crate) fn unblock(&self) {
        self.blocked.store(false, Ordering::SeqCst);
        self.release.notify_waiters();
    }

    pub(crate) fn removed(&self) -> Vec<String> {
        self.removed.lock().unwrap().clone()
    }

    async fn wait_while_blocked(&self) {
        loop {
            let notified = self.release.notified();
            if !self.blocked.load(Ordering::SeqCst) {
                return;
            }
            notified.await;
        }
    }

    fn download_id(spec: &ContainerSpec) -> String {
        spec.name
            .split_once("-immunespace-")
            .map(|(id, _)| id.to_string())
            .unwrap()
    }
}

#[async_trait]
impl ContainerRuntime for FakeRuntime {
    async fn run(&self, spec: &ContainerSpec) -> crate::Result<ContainerOutput> {
        let dir = self.data_root.join(Self::download_id(spec));

        if spec.name.ends_with("-mapper") {
            self.mapper_runs.fetch_add(1, Ordering::SeqCst);
            return Ok(ContainerOutput {
                success: true,
                exit_code: Some(0),
                output: "mapped\n".to_string(),
            });
        }

        self.groups_runs.fetch_add(1, Ordering::SeqCst);
        self.wait_while_blocked().await;

        let behavior = *self.behavior.lock().unwrap();
        match behavior {
            FakeBehavior::Succeed => {
                tokio::fs::create_dir_all(&dir).await.unwrap();
                tokio::fs::write(dir.join("geneBySampleMatrix.csv"), GENE_MATRIX)
                    .await
                    .unwrap();
                tokio::fs::write(dir.join("phenoDataMatrix.csv"), PHENO_MATRIX)
                    .await
                    .unwrap();
                Ok(ContainerOutput {
                    success: true,
                    exit_code: Some(0),
                    output: "fetched 2 matrices\n".to_string(),
                })
            }
            FakeBehavior::GroupsFail => Ok(ContainerOutput {
                success: true,
                exit_code: Some(0),
                output: "Command 'labkey' returned non-zero exit status 1.\n".to_string(),
            }),
            FakeBehavior::NoOutput => Ok(ContainerOutput {
                success: true,
                exit_code: Some(0),
                output: String::new(),
            }),
        }
    }

    async fn remove(&self, name: &str) -> crate::Result<()> {
        self.removed.lock().unwrap().push(name.to_string());
        Ok(())
    }

    fn name(&self) -> &'static str {
        "fake"
    }
}

/// Test configuration rooted in `dir`
pub(crate) fn test_config(dir: &std::path::Path, mode: ExecutionMode) -> Config {
    let mut config = Config::default();
    config.storage.data_root = dir.join("data");
    config.persistence.database_path = dir.join("test.db");
    config.queue.mode = mode;
    config.queue.workers = 2;
    config.server.api.public_base_url = "http://provider.test".to_string();
    config
}

/// Helper to create a test provider over a [`FakeRuntime`].
/// Returns the provider, the fake and the tempdir (which must be kept alive).
pub(crate) async fn create_test_provider(
    mode: ExecutionMode,
) -> (ImmunespaceProvider, Arc<FakeRuntime>, tempfile::TempDir) {
    let temp_dir = tempdir().unwrap();
    let config = test_config(temp_dir.path(), mode);
    let runtime = FakeRuntime::new(config.storage.data_root.clone());
    let provider = ImmunespaceProvider::with_runtime(config, runtime.clone())
        .await
        .unwrap();
    (provider, runtime, temp_dir)
}

/// Poll until the download reaches `expected` or five seconds pass
pub(crate) async fn wait_for_status(
    provider: &ImmunespaceProvider,
    download_id: &DownloadId,
    expected: JobStatus,
) {
    let deadline = tokio::time::Instant::now() + Duration::from_secs(5);
    loop {
        let status = provider.status(download_id.as_str()).await.ok().map(|s| s.status);
        if status == Some(expected) {
            return;
        }
        assert!(
            tokio::time::Instant::now() < deadline,
            "download {download_id} stuck at {status:?}, expected {expected}"
        );
        tokio::time::sleep(Duration::from_millis(20)).await;
    }
}
