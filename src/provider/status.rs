//! Status reporting and search.

use crate::error::{DownloadError, Error, Result};
use crate::naming::is_safe_identifier;
use crate::types::{DownloadId, SearchEntry, StatusResult};

use super::{ImmunespaceProvider, timestamp};

impl ImmunespaceProvider {
    /// Current status of a download
    ///
    /// A tracked job's state takes precedence over the records and is written
    /// back to them. Fails with not-found when neither exists.
    pub async fn status(&self, download_id: &str) -> Result<StatusResult> {
        let not_found = || {
            Error::Download(DownloadError::NotFound {
                id: download_id.to_string(),
            })
        };
        if !is_safe_identifier(download_id) {
            return Err(not_found());
        }
        let download_id = DownloadId::from(download_id);

        if let Some(status) = self.jobs.status(&download_id).await {
            self.db.mirror_job_status(&download_id, status).await?;
            return Ok(StatusResult {
                download_id,
                status,
            });
        }

        let records = self.db.list_by_download_id(&download_id).await?;
        let status = records
            .first()
            .map(|record| record.job_status())
            .ok_or_else(not_found)?;

        Ok(StatusResult {
            download_id,
            status,
        })
    }

    /// Every file submitted by `submitter_id`, oldest first
    pub async fn search(&self, submitter_id: &str) -> Result<Vec<SearchEntry>> {
        let records = self.db.search_by_submitter(submitter_id).await?;
        if records.is_empty() {
            return Err(Error::NotFound(format!(
                "no downloads for submitter {}",
                submitter_id
            )));
        }

        Ok(records
            .into_iter()
            .map(|record| SearchEntry {
                status: record.job_status(),
                date_downloaded: timestamp(record.created_at),
                size: u64::try_from(record.size_bytes).unwrap_or(0),
                download_id: record.download_id,
                object_id: record.object_id,
                submitter_id: record.submitter_id,
                accession_id: record.accession_id,
                data_type: record.data_type,
                file_type: record.file_type,
                file_name: record.file_name,
                dimensions: record.dimensions,
            })
            .collect())
    }
}
