//! Database layer for immunespace-provider
//!
//! Handles SQLite persistence for download records. One record exists per
//! derived file of a download; all records of a download share its
//! `download_id` and each carries its own `object_id`.
//!
//! ## Submodules
//!
//! Methods on [`Database`] are organized by domain:
//! - [`migrations`] — Database lifecycle, schema migrations
//! - [`records`] — Download record CRUD and lookups

use crate::types::{DownloadId, JobStatus, ObjectId};
use sqlx::{FromRow, sqlite::SqlitePool};

mod migrations;
mod records;

/// New download record to be inserted into the database
#[derive(Debug, Clone)]
pub struct NewDownloadRecord {
    /// Download (and working directory) this file belongs to
    pub download_id: DownloadId,
    /// Object identifier of the file
    pub object_id: ObjectId,
    /// Submitter email
    pub submitter_id: String,
    /// ImmunoSpace accession or group
    pub accession_id: String,
    /// ImmunoSpace API key
    pub apikey: String,
    /// Data type ("geneExpression")
    pub data_type: String,
    /// File type ("datasetGeneExpression", "datasetProperties")
    pub file_type: String,
    /// File name inside the working directory
    pub file_name: String,
    /// Initial status
    pub status: JobStatus,
}

/// Download record from database
#[derive(Debug, Clone, FromRow)]
pub struct DownloadRecord {
    /// Unique database ID
    pub id: i64,
    /// Download this file belongs to
    pub download_id: DownloadId,
    /// Object identifier of the file
    pub object_id: ObjectId,
    /// Submitter email
    pub submitter_id: String,
    /// ImmunoSpace accession or group
    pub accession_id: String,
    /// ImmunoSpace API key
    pub apikey: String,
    /// Data type
    pub data_type: String,
    /// File type
    pub file_type: String,
    /// File name inside the working directory
    pub file_name: String,
    /// File size in bytes (0 until finished)
    pub size_bytes: i64,
    /// `"{rows}x{cols}"` once finished
    pub dimensions: Option<String>,
    /// Status name (see [`JobStatus`])
    pub status: String,
    /// Captured tool diagnostics
    pub stderr: Option<String>,
    /// Unix timestamp when the download was requested
    pub created_at: i64,
    /// Unix timestamp when the tool stages started
    pub started_at: Option<i64>,
    /// Unix timestamp when the download finished or failed
    pub completed_at: Option<i64>,
}

impl DownloadRecord {
    /// Parsed status of the record
    pub fn job_status(&self) -> JobStatus {
        JobStatus::from_db(&self.status)
    }
}

/// Lookup key used for deduplicating submissions
#[derive(Debug, Clone, Copy)]
pub struct RecordKey<'a> {
    /// Submitter email
    pub submitter_id: &'a str,
    /// ImmunoSpace accession or group
    pub accession_id: &'a str,
    /// ImmunoSpace API key
    pub apikey: &'a str,
    /// File type of the wanted record
    pub file_type: &'a str,
}

/// Statistics written to a record when its download finishes
#[derive(Debug, Clone)]
pub struct Completion {
    /// File size in bytes
    pub size_bytes: i64,
    /// `"{rows}x{cols}"`
    pub dimensions: String,
    /// Captured tool diagnostics
    pub stderr: String,
}

/// Database handle for immunespace-provider
pub struct Database {
    pool: SqlitePool,
}

// unwrap/expect are acceptable in tests for concise failure-on-error assertions
#[allow(clippy::unwrap_used, clippy::expect_used)]
#[cfg(test)]
mod tests;
