//! Submission handling: cache decision, record creation and dispatch.

use crate::config::ExecutionMode;
use crate::db::{NewDownloadRecord, RecordKey};
use crate::error::{Error, Result};
use crate::naming::{new_download_id, new_object_id};
use crate::types::{DownloadId, FileType, JobStatus, ObjectDescriptor, Submission};
use std::path::Path;
use std::sync::atomic::Ordering;

use super::ImmunespaceProvider;
use super::files::BUNDLE_FILE_NAME;
use super::locks::submission_key;

/// What to do with a submission whose key already has a record
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CacheDecision {
    /// Return the existing record without running anything
    Reuse,
    /// Run the tools again into the same download id
    Rerun,
}

/// Decide between reusing and re-running an existing download
///
/// A queued or running job always wins; otherwise only a finished download
/// whose working directory still has content is reused.
pub fn plan_submission(status: JobStatus, dir_populated: bool, job_active: bool) -> CacheDecision {
    if job_active {
        return CacheDecision::Reuse;
    }
    match status {
        JobStatus::Finished if dir_populated => CacheDecision::Reuse,
        _ => CacheDecision::Rerun,
    }
}

impl ImmunespaceProvider {
    /// Submit a retrieval request and return the descriptor of the requested file
    ///
    /// In sync mode both tool stages run before this returns; in async mode
    /// the job is queued and the descriptor reports `queued`.
    ///
    /// # Errors
    ///
    /// Tool and I/O failures are recorded in the download's records and
    /// returned. [`Error::ShuttingDown`] once shutdown has begun.
    pub async fn submit(&self, submission: Submission) -> Result<ObjectDescriptor> {
        if !self.accepting_new.load(Ordering::SeqCst) {
            return Err(Error::ShuttingDown);
        }

        let _guard = self
            .key_locks
            .lock(&submission_key(
                &submission.submitter_id,
                &submission.accession_id,
                &submission.apikey,
            ))
            .await;

        let key = RecordKey {
            submitter_id: &submission.submitter_id,
            accession_id: &submission.accession_id,
            apikey: &submission.apikey,
            file_type: submission.file_type.as_str(),
        };

        match self.db.find_by_key(&key).await? {
            Some(record) => {
                let download_id = record.download_id.clone();
                let dir = self.working_dir(&download_id);
                let populated = dir_populated(&dir).await;
                let active = self.jobs.is_active(&download_id).await;

                match plan_submission(record.job_status(), populated, active) {
                    CacheDecision::Reuse => {
                        tracing::info!(
                            download_id = %download_id,
                            object_id = %record.object_id,
                            "Submission matches an existing download"
                        );
                    }
                    CacheDecision::Rerun => {
                        tracing::info!(
                            download_id = %download_id,
                            status = %record.status,
                            "Existing download is incomplete, running tools again"
                        );
                        self.prepare_rerun(&dir).await?;
                        self.db.set_status(&download_id, JobStatus::Queued).await?;
                        self.dispatch(&download_id).await?;
                    }
                }
            }
            None => {
                let download_id = self.create_download(&submission).await?;
                self.dispatch(&download_id).await?;
            }
        }

        let record = self.db.find_by_key(&key).await?.ok_or_else(|| {
            Error::NotFound(format!(
                "record for {} / {} vanished during submission",
                submission.submitter_id, submission.accession_id
            ))
        })?;
        let size = u64::try_from(record.size_bytes).unwrap_or(0);
        Ok(self.descriptor(&record, size))
    }

    /// Allocate a download id, create its directory and one record per output file
    async fn create_download(&self, submission: &Submission) -> Result<DownloadId> {
        let download_id = new_download_id();
        let dir = self.working_dir(&download_id);
        tokio::fs::create_dir_all(&dir).await?;

        for file_type in FileType::ALL {
            self.db
                .insert_record(&NewDownloadRecord {
                    download_id: download_id.clone(),
                    object_id: new_object_id(),
                    submitter_id: submission.submitter_id.clone(),
                    accession_id: submission.accession_id.clone(),
                    apikey: submission.apikey.clone(),
                    data_type: submission.data_type.as_str().to_string(),
                    file_type: file_type.as_str().to_string(),
                    file_name: file_type.file_name().to_string(),
                    status: JobStatus::Queued,
                })
                .await?;
        }

        tracing::info!(
            download_id = %download_id,
            submitter_id = %submission.submitter_id,
            accession_id = %submission.accession_id,
            "Created download"
        );
        Ok(download_id)
    }

    /// Run the job inline or hand it to the worker pool
    async fn dispatch(&self, download_id: &DownloadId) -> Result<()> {
        match self.config.queue.mode {
            ExecutionMode::Sync => {
                if !self.jobs.begin(download_id).await {
                    tracing::debug!(download_id = %download_id, "Job already running");
                    return Ok(());
                }
                // The job outlives the request: a dropped caller must not
                // leave it registered as started
                let provider = self.clone();
                let id = download_id.clone();
                tokio::spawn(async move { provider.run_job(&id).await })
                    .await
                    .map_err(|e| {
                        Error::Other(format!("job task for {} failed: {}", download_id, e))
                    })??;
            }
            ExecutionMode::Async => {
                if self.jobs.enqueue(download_id).await {
                    tracing::info!(download_id = %download_id, "Job queued");
                }
            }
        }
        Ok(())
    }

    /// Make sure the working directory exists and drop any stale bundle
    async fn prepare_rerun(&self, dir: &Path) -> Result<()> {
        tokio::fs::create_dir_all(dir).await?;
        match tokio::fs::remove_file(dir.join(BUNDLE_FILE_NAME)).await {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(Error::Io(e)),
        }
    }
}

/// Whether `dir` exists and has at least one entry
pub(crate) async fn dir_populated(dir: &Path) -> bool {
    match tokio::fs::read_dir(dir).await {
        Ok(mut entries) => matches!(entries.next_entry().await, Ok(Some(_))),
        Err(_) => false,
    }
}

// unwrap/expect are acceptable in tests for concise failure-on-error assertions
#[allow(clippy::unwrap_used, clippy::expect_used)]
#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn finished_download_with_files_is_reused() {
        assert_eq!(
            plan_submission(JobStatus::Finished, true, false),
            CacheDecision::Reuse
        );
    }

    #[test]
    fn empty_directory_triggers_rerun() {
        assert_eq!(
            plan_submission(JobStatus::Finished, false, false),
            CacheDecision::Rerun
        );
    }

    #[test]
    fn failed_or_interrupted_download_is_rerun() {
        for status in [JobStatus::Failed, JobStatus::Queued, JobStatus::Started] {
            assert_eq!(plan_submission(status, true, false), CacheDecision::Rerun);
        }
    }

    #[test]
    fn active_job_is_never_duplicated() {
        for status in [JobStatus::Queued, JobStatus::Started, JobStatus::Failed] {
            assert_eq!(plan_submission(status, false, true), CacheDecision::Reuse);
        }
    }

    #[tokio::test]
    async fn dir_populated_distinguishes_missing_empty_and_filled() {
        let dir = tempfile::tempdir().unwrap();
        let missing = dir.path().join("missing");
        assert!(!dir_populated(&missing).await);

        let empty = dir.path().join("empty");
        std::fs::create_dir(&empty).unwrap();
        assert!(!dir_populated(&empty).await);

        std::fs::write(empty.join("geneBySampleMatrix.csv"), "a,b\n").unwrap();
        assert!(dir_populated(&empty).await);
    }
}
