//! Download record CRUD operations.

use crate::error::DatabaseError;
use crate::types::{DownloadId, JobStatus, ObjectId};
use crate::{Error, Result};

use super::{Completion, Database, DownloadRecord, NewDownloadRecord, RecordKey};

const RECORD_COLUMNS: &str = r#"
    id, download_id, object_id, submitter_id, accession_id, apikey,
    data_type, file_type, file_name, size_bytes, dimensions, status,
    stderr, created_at, started_at, completed_at
"#;

impl Database {
    /// Insert a new download record
    pub async fn insert_record(&self, record: &NewDownloadRecord) -> Result<i64> {
        let now = chrono::Utc::now().timestamp();

        let result = sqlx::query(
            r#"
            INSERT INTO download_records (
                download_id, object_id, submitter_id, accession_id, apikey,
                data_type, file_type, file_name, status, created_at
            ) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(&record.download_id)
        .bind(&record.object_id)
        .bind(&record.submitter_id)
        .bind(&record.accession_id)
        .bind(&record.apikey)
        .bind(&record.data_type)
        .bind(&record.file_type)
        .bind(&record.file_name)
        .bind(record.status.as_str())
        .bind(now)
        .execute(&self.pool)
        .await
        .map_err(|e| {
            Error::Database(DatabaseError::QueryFailed(format!(
                "Failed to insert download record: {}",
                e
            )))
        })?;

        Ok(result.last_insert_rowid())
    }

    /// Find the first record matching a submission key
    pub async fn find_by_key(&self, key: &RecordKey<'_>) -> Result<Option<DownloadRecord>> {
        let sql = format!(
            "SELECT {RECORD_COLUMNS} FROM download_records
             WHERE submitter_id = ? AND accession_id = ? AND apikey = ? AND file_type = ?
             ORDER BY id ASC LIMIT 1"
        );
        let row = sqlx::query_as::<_, DownloadRecord>(&sql)
            .bind(key.submitter_id)
            .bind(key.accession_id)
            .bind(key.apikey)
            .bind(key.file_type)
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| {
                Error::Database(DatabaseError::QueryFailed(format!(
                    "Failed to find download record: {}",
                    e
                )))
            })?;

        Ok(row)
    }

    /// Get the record of a single object
    pub async fn find_by_object_id(&self, object_id: &ObjectId) -> Result<Option<DownloadRecord>> {
        let sql = format!("SELECT {RECORD_COLUMNS} FROM download_records WHERE object_id = ?");
        let row = sqlx::query_as::<_, DownloadRecord>(&sql)
            .bind(object_id)
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| {
                Error::Database(DatabaseError::QueryFailed(format!(
                    "Failed to get object {}: {}",
                    object_id, e
                )))
            })?;

        Ok(row)
    }

    /// List every record of a download, in insertion order
    pub async fn list_by_download_id(&self, download_id: &DownloadId) -> Result<Vec<DownloadRecord>> {
        let sql = format!(
            "SELECT {RECORD_COLUMNS} FROM download_records WHERE download_id = ? ORDER BY id ASC"
        );
        let rows = sqlx::query_as::<_, DownloadRecord>(&sql)
            .bind(download_id)
            .fetch_all(&self.pool)
            .await
            .map_err(|e| {
                Error::Database(DatabaseError::QueryFailed(format!(
                    "Failed to list records of download {}: {}",
                    download_id, e
                )))
            })?;

        Ok(rows)
    }

    /// List every record submitted by `submitter_id`, oldest first
    pub async fn search_by_submitter(&self, submitter_id: &str) -> Result<Vec<DownloadRecord>> {
        let sql = format!(
            "SELECT {RECORD_COLUMNS} FROM download_records WHERE submitter_id = ? ORDER BY created_at ASC, id ASC"
        );
        let rows = sqlx::query_as::<_, DownloadRecord>(&sql)
            .bind(submitter_id)
            .fetch_all(&self.pool)
            .await
            .map_err(|e| {
                Error::Database(DatabaseError::QueryFailed(format!(
                    "Failed to search records: {}",
                    e
                )))
            })?;

        Ok(rows)
    }

    /// Distinct downloads whose records are in one of `statuses`, oldest first
    pub async fn list_download_ids_with_status(
        &self,
        statuses: &[JobStatus],
    ) -> Result<Vec<DownloadId>> {
        if statuses.is_empty() {
            return Ok(Vec::new());
        }

        let placeholders = vec!["?"; statuses.len()].join(", ");
        let sql = format!(
            "SELECT download_id FROM download_records
             WHERE status IN ({placeholders})
             GROUP BY download_id
             ORDER BY MIN(created_at) ASC, MIN(id) ASC"
        );

        let mut query = sqlx::query_scalar::<_, DownloadId>(&sql);
        for status in statuses {
            query = query.bind(status.as_str());
        }

        let ids = query.fetch_all(&self.pool).await.map_err(|e| {
            Error::Database(DatabaseError::QueryFailed(format!(
                "Failed to list downloads by status: {}",
                e
            )))
        })?;

        Ok(ids)
    }

    /// Number of records belonging to a download
    pub async fn count_by_download_id(&self, download_id: &DownloadId) -> Result<u64> {
        let count: i64 =
            sqlx::query_scalar("SELECT COUNT(*) FROM download_records WHERE download_id = ?")
                .bind(download_id)
                .fetch_one(&self.pool)
                .await
                .map_err(|e| {
                    Error::Database(DatabaseError::QueryFailed(format!(
                        "Failed to count records of download {}: {}",
                        download_id, e
                    )))
                })?;

        Ok(count.max(0) as u64)
    }

    /// Set the status of every record of a download, returning how many changed
    pub async fn set_status(&self, download_id: &DownloadId, status: JobStatus) -> Result<u64> {
        let result = sqlx::query("UPDATE download_records SET status = ? WHERE download_id = ?")
            .bind(status.as_str())
            .bind(download_id)
            .execute(&self.pool)
            .await
            .map_err(|e| {
                Error::Database(DatabaseError::QueryFailed(format!(
                    "Failed to update status of download {}: {}",
                    download_id, e
                )))
            })?;

        Ok(result.rows_affected())
    }

    /// Copy an in-process job state onto records that have not ended yet
    ///
    /// Records already `finished` or `failed` are left alone, so a stale
    /// job state read before the run ended cannot overwrite its outcome.
    pub async fn mirror_job_status(
        &self,
        download_id: &DownloadId,
        status: JobStatus,
    ) -> Result<u64> {
        let result = sqlx::query(
            r#"
            UPDATE download_records
            SET status = ?
            WHERE download_id = ? AND status NOT IN (?, ?)
            "#,
        )
        .bind(status.as_str())
        .bind(download_id)
        .bind(JobStatus::Finished.as_str())
        .bind(JobStatus::Failed.as_str())
        .execute(&self.pool)
        .await
        .map_err(|e| {
            Error::Database(DatabaseError::QueryFailed(format!(
                "Failed to mirror status of download {}: {}",
                download_id, e
            )))
        })?;

        Ok(result.rows_affected())
    }

    /// Mark a download as started, clearing results of any earlier run
    pub async fn mark_started(&self, download_id: &DownloadId) -> Result<u64> {
        let now = chrono::Utc::now().timestamp();
        let result = sqlx::query(
            r#"
            UPDATE download_records
            SET status = ?, started_at = ?, completed_at = NULL, stderr = NULL
            WHERE download_id = ?
            "#,
        )
        .bind(JobStatus::Started.as_str())
        .bind(now)
        .bind(download_id)
        .execute(&self.pool)
        .await
        .map_err(|e| {
            Error::Database(DatabaseError::QueryFailed(format!(
                "Failed to mark download {} started: {}",
                download_id, e
            )))
        })?;

        Ok(result.rows_affected())
    }

    /// Store statistics for one finished file
    pub async fn complete_record(&self, object_id: &ObjectId, completion: &Completion) -> Result<u64> {
        let now = chrono::Utc::now().timestamp();
        let result = sqlx::query(
            r#"
            UPDATE download_records
            SET status = ?, size_bytes = ?, dimensions = ?, stderr = ?, completed_at = ?
            WHERE object_id = ?
            "#,
        )
        .bind(JobStatus::Finished.as_str())
        .bind(completion.size_bytes)
        .bind(&completion.dimensions)
        .bind(&completion.stderr)
        .bind(now)
        .bind(object_id)
        .execute(&self.pool)
        .await
        .map_err(|e| {
            Error::Database(DatabaseError::QueryFailed(format!(
                "Failed to complete object {}: {}",
                object_id, e
            )))
        })?;

        Ok(result.rows_affected())
    }

    /// Mark every record of a download failed with the captured diagnostics
    pub async fn fail_download(&self, download_id: &DownloadId, stderr: &str) -> Result<u64> {
        let now = chrono::Utc::now().timestamp();
        let result = sqlx::query(
            r#"
            UPDATE download_records
            SET status = ?, stderr = ?, completed_at = ?
            WHERE download_id = ?
            "#,
        )
        .bind(JobStatus::Failed.as_str())
        .bind(stderr)
        .bind(now)
        .bind(download_id)
        .execute(&self.pool)
        .await
        .map_err(|e| {
            Error::Database(DatabaseError::QueryFailed(format!(
                "Failed to mark download {} failed: {}",
                download_id, e
            )))
        })?;

        Ok(result.rows_affected())
    }

    /// Delete every record of a download, returning how many were removed
    pub async fn delete_by_download_id(&self, download_id: &DownloadId) -> Result<u64> {
        let result = sqlx::query("DELETE FROM download_records WHERE download_id = ?")
            .bind(download_id)
            .execute(&self.pool)
            .await
            .map_err(|e| {
                Error::Database(DatabaseError::QueryFailed(format!(
                    "Failed to delete records of download {}: {}",
                    download_id, e
                )))
            })?;

        Ok(result.rows_affected())
    }
}
