//! Running the tool stages for one download and recording the results.

use crate::db::Completion;
use crate::error::{DownloadError, Error, Result, ToolError};
use crate::tabular::table_stats;
use crate::types::{DownloadId, JobStatus};

use super::{ImmunespaceProvider, JobOutcome};

impl ImmunespaceProvider {
    /// Run a registered job to completion and release its bookkeeping
    ///
    /// Used by both the inline (sync) path and the worker pool. A job that
    /// was deleted while running gets its working directory removed here.
    pub(crate) async fn run_job(&self, download_id: &DownloadId) -> Result<JobStatus> {
        let job_timeout = self.config.queue.job_timeout;
        let result = match tokio::time::timeout(job_timeout, self.execute_download(download_id))
            .await
        {
            Ok(result) => result,
            Err(_) => {
                self.runner.abort(download_id).await;
                let error = ToolError::Timeout {
                    stage: "job".to_string(),
                    seconds: job_timeout.as_secs(),
                };
                if let Err(e) = self.db.fail_download(download_id, &error.to_string()).await {
                    tracing::error!(download_id = %download_id, error = %e, "Failed to record job timeout");
                }
                Err(Error::Tool(error))
            }
        };

        if self.jobs.finish(download_id).await == JobOutcome::Detached {
            tracing::info!(download_id = %download_id, "Job was deleted while running, removing leftovers");
            if let Err(e) = self.remove_working_dir(download_id).await {
                tracing::warn!(download_id = %download_id, error = %e, "Failed to remove orphaned working directory");
            }
        }

        result
    }

    /// Run both tool stages and store per-file statistics
    ///
    /// Every failure is written to the download's records (status `failed`
    /// plus diagnostics) before it is returned.
    pub(crate) async fn execute_download(&self, download_id: &DownloadId) -> Result<JobStatus> {
        let records = self.db.list_by_download_id(download_id).await?;
        let Some(first) = records.first() else {
            return Err(Error::Download(DownloadError::NotFound {
                id: download_id.to_string(),
            }));
        };

        self.db.mark_started(download_id).await?;
        tracing::info!(
            download_id = %download_id,
            accession_id = %first.accession_id,
            "Running tool stages"
        );

        let diagnostics = match self
            .runner
            .run(download_id, &first.accession_id, &first.apikey)
            .await
        {
            Ok(diagnostics) => diagnostics,
            Err(e) => {
                let diagnostics = match &e {
                    Error::Tool(tool) => tool.diagnostics(),
                    other => other.to_string(),
                };
                tracing::error!(
                    download_id = %download_id,
                    error = %e,
                    diagnostics = %diagnostics,
                    "Tool stages failed"
                );
                self.db.fail_download(download_id, &diagnostics).await?;
                return Err(e);
            }
        };

        let dir = self.working_dir(download_id);
        let mut completions = Vec::with_capacity(records.len());
        for record in &records {
            let path = dir.join(&record.file_name);
            match table_stats(&path).await {
                Ok(stats) => completions.push((&record.object_id, stats)),
                Err(e) => {
                    tracing::error!(
                        download_id = %download_id,
                        path = %path.display(),
                        error = %e,
                        "Failed to read tool output"
                    );
                    let message = format!("{}{}: {}\n", diagnostics, record.file_name, e);
                    self.db.fail_download(download_id, &message).await?;
                    return Err(Error::Download(DownloadError::FilesNotFound {
                        id: download_id.to_string(),
                        path,
                    }));
                }
            }
        }

        for (object_id, stats) in completions {
            self.db
                .complete_record(
                    object_id,
                    &Completion {
                        size_bytes: i64::try_from(stats.size).unwrap_or(i64::MAX),
                        dimensions: stats.dimensions(),
                        stderr: diagnostics.clone(),
                    },
                )
                .await?;
        }

        tracing::info!(download_id = %download_id, files = records.len(), "Download finished");
        Ok(JobStatus::Finished)
    }

    /// Remove a download's working directory; a missing directory is fine
    pub(crate) async fn remove_working_dir(&self, download_id: &DownloadId) -> Result<bool> {
        match tokio::fs::remove_dir_all(self.working_dir(download_id)).await {
            Ok(()) => Ok(true),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(false),
            Err(e) => Err(Error::Io(e)),
        }
    }
}
