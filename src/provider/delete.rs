//! Deletion workflow across the job queue, the records and the filesystem.

use crate::naming::is_safe_identifier;
use crate::types::{DeleteResult, DeleteStatus, DownloadId, ObjectId};

use super::{CancelOutcome, ImmunespaceProvider};

/// Check that a record deletion removed exactly what was found
pub fn verify_deleted_count(expected: u64, deleted: u64) -> std::result::Result<(), String> {
    if expected == deleted {
        Ok(())
    } else {
        Err(format!(
            "expected to delete {} records but deleted {}",
            expected, deleted
        ))
    }
}

/// Accumulates the outcome of each deletion step
struct DeleteReport {
    status: DeleteStatus,
    info: String,
    stderr: String,
}

impl DeleteReport {
    fn new() -> Self {
        Self {
            status: DeleteStatus::Done,
            info: String::new(),
            stderr: String::new(),
        }
    }

    fn removed(&mut self, message: String) {
        self.status = self.status.escalate(DeleteStatus::Deleted);
        self.info.push_str(&message);
    }

    fn failed(&mut self, message: String) {
        self.status = self.status.escalate(DeleteStatus::Failed);
        self.info.push_str(&message);
    }

    fn exception(&mut self, message: String) {
        self.status = self.status.escalate(DeleteStatus::Exception);
        self.stderr.push_str(&message);
    }

    fn into_result(self) -> DeleteResult {
        DeleteResult {
            status: self.status,
            info: self.info,
            stderr: self.stderr,
        }
    }
}

impl ImmunespaceProvider {
    /// Delete a download by object id or download id
    ///
    /// Each step runs even if an earlier one failed. The result is `done`
    /// when nothing matched, `deleted` when every step removed what it
    /// found, `failed` on a record count mismatch and `exception` when any
    /// step raised an error.
    pub async fn delete(&self, id: &str) -> DeleteResult {
        let mut report = DeleteReport::new();
        if !is_safe_identifier(id) {
            report.info.push_str(&format!("Nothing to delete for {}. ", id));
            return report.into_result();
        }

        let download_id = match self.db.find_by_object_id(&ObjectId::from(id)).await {
            Ok(Some(record)) => record.download_id,
            Ok(None) => DownloadId::from(id),
            Err(e) => {
                report.exception(format!("lookup of {} failed: {}\n", id, e));
                DownloadId::from(id)
            }
        };

        match self.jobs.cancel(&download_id).await {
            CancelOutcome::Dequeued => {
                report.removed(format!("Removed queued job {}. ", download_id));
            }
            CancelOutcome::Detached => {
                report.removed(format!("Detached running job {}. ", download_id));
            }
            CancelOutcome::NotFound => {}
        }

        match self.db.count_by_download_id(&download_id).await {
            Ok(0) => {}
            Ok(expected) => match self.db.delete_by_download_id(&download_id).await {
                Ok(deleted) => match verify_deleted_count(expected, deleted) {
                    Ok(()) => report.removed(format!("Deleted count=({}) records. ", deleted)),
                    Err(message) => report.failed(format!("{}. ", message)),
                },
                Err(e) => report.exception(format!("record deletion failed: {}\n", e)),
            },
            Err(e) => report.exception(format!("record count failed: {}\n", e)),
        }

        match self.remove_working_dir(&download_id).await {
            Ok(true) => report.removed(format!("Removed directory {}. ", download_id)),
            Ok(false) => {}
            Err(e) => report.exception(format!("directory removal failed: {}\n", e)),
        }

        if report.status == DeleteStatus::Done {
            report.info.push_str(&format!("Nothing to delete for {}. ", id));
        }

        tracing::info!(
            id = %id,
            download_id = %download_id,
            status = ?report.status,
            "Delete finished"
        );
        report.into_result()
    }
}
