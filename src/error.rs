//! Error types for immunespace-provider
//!
//! This module provides error handling for the service, including:
//! - Domain-specific error types (Download, Tool, Database, Config)
//! - HTTP status code mapping for API integration
//! - Structured error responses with machine-readable error codes

use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use thiserror::Error;
use utoipa::ToSchema;

/// Result type alias for immunespace-provider operations
pub type Result<T> = std::result::Result<T, Error>;

/// Main error type for immunespace-provider
#[derive(Debug, Error)]
pub enum Error {
    /// Configuration error with context about which setting is invalid
    #[error("configuration error: {message}")]
    Config {
        /// Human-readable error message describing the configuration issue
        message: String,
        /// The configuration key that caused the error (e.g., "queue.workers")
        key: Option<String>,
    },

    /// Submission parameters are missing or malformed
    #[error("validation error: {0}")]
    Validation(String),

    /// Database operation failed
    #[error("database error: {0}")]
    Database(#[from] DatabaseError),

    /// Download-related error
    #[error("download error: {0}")]
    Download(#[from] DownloadError),

    /// External tool stage failed
    #[error("tool execution error: {0}")]
    Tool(#[from] ToolError),

    /// I/O error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Object or record not found
    #[error("not found: {0}")]
    NotFound(String),

    /// Shutdown in progress - not accepting new submissions
    #[error("shutdown in progress: not accepting new submissions")]
    ShuttingDown,

    /// API server error
    #[error("API server error: {0}")]
    ApiServerError(String),

    /// Operation not supported (missing binary, not implemented, etc.)
    #[error("not supported: {0}")]
    NotSupported(String),

    /// Other error
    #[error("{0}")]
    Other(String),
}

/// Database-related errors
#[derive(Debug, Error)]
pub enum DatabaseError {
    /// Failed to connect to database
    #[error("failed to connect to database: {0}")]
    ConnectionFailed(String),

    /// Failed to run migrations
    #[error("failed to run migrations: {0}")]
    MigrationFailed(String),

    /// Query failed
    #[error("query failed: {0}")]
    QueryFailed(String),
}

/// Download-related errors
#[derive(Debug, Error)]
pub enum DownloadError {
    /// No record exists for the download or object identifier
    #[error("download {id} not found")]
    NotFound {
        /// The identifier that was not found
        id: String,
    },

    /// Download files not found on disk
    #[error("download {id} files not found at {path}")]
    FilesNotFound {
        /// The download whose files were not found
        id: String,
        /// The path where the files were expected to be
        path: PathBuf,
    },

    /// The download exists but has not finished producing its files
    #[error("download {id} is {status}, files are not available")]
    NotFinished {
        /// The download identifier
        id: String,
        /// The current status of the download
        status: String,
    },
}

/// Errors raised while running the containerized tool stages
#[derive(Debug, Error)]
pub enum ToolError {
    /// A stage reported failure, either by exit status or by the failure marker
    #[error("{stage} stage failed")]
    StageFailed {
        /// Stage name ("groups" or "mapper")
        stage: String,
        /// Diagnostics captured from every stage run so far
        diagnostics: String,
    },

    /// A stage did not finish within the configured timeout
    #[error("{stage} stage timed out after {seconds}s")]
    Timeout {
        /// Stage name
        stage: String,
        /// The timeout that elapsed
        seconds: u64,
    },

    /// The container runtime could not be launched
    #[error("failed to launch {stage} stage: {reason}")]
    Launch {
        /// Stage name
        stage: String,
        /// Why the runtime could not start
        reason: String,
    },
}

impl ToolError {
    /// Diagnostic text worth persisting alongside the failed records
    pub fn diagnostics(&self) -> String {
        match self {
            ToolError::StageFailed { diagnostics, .. } => diagnostics.clone(),
            other => other.to_string(),
        }
    }
}

/// API error response format
///
/// This structure is returned by API endpoints when an error occurs.
///
/// # Example JSON Response
///
/// ```json
/// {
///   "error": {
///     "code": "not_found",
///     "message": "not found: object 1f0c...",
///   }
/// }
/// ```
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct ApiError {
    /// The error details
    pub error: ErrorDetail,
}

/// Detailed error information for API responses
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct ErrorDetail {
    /// Machine-readable error code (e.g., "not_found", "validation_error")
    pub code: String,

    /// Human-readable error message
    pub message: String,

    /// Optional additional context about the error
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<serde_json::Value>,
}

impl ApiError {
    /// Create a new API error with code and message
    pub fn new(code: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            error: ErrorDetail {
                code: code.into(),
                message: message.into(),
                details: None,
            },
        }
    }

    /// Create a "not found" error
    pub fn not_found(resource: impl Into<String>) -> Self {
        Self::new("not_found", format!("{} not found", resource.into()))
    }

    /// Create a "validation error" error
    pub fn validation(message: impl Into<String>) -> Self {
        Self::new("validation_error", message)
    }

    /// Create a "not implemented" error
    pub fn not_implemented(message: impl Into<String>) -> Self {
        Self::new("not_implemented", message)
    }
}

/// Convert errors to HTTP status codes for API responses
pub trait ToHttpStatus {
    /// Get the HTTP status code for this error
    fn status_code(&self) -> u16;

    /// Get the machine-readable error code
    fn error_code(&self) -> &str;
}

impl ToHttpStatus for Error {
    fn status_code(&self) -> u16 {
        match self {
            Error::Validation(_) => 400,

            Error::NotFound(_) => 404,
            Error::Download(DownloadError::NotFound { .. }) => 404,
            Error::Download(DownloadError::FilesNotFound { .. }) => 404,
            Error::Download(DownloadError::NotFinished { .. }) => 404,

            Error::Config { .. } => 500,
            Error::Database(_) => 500,
            Error::Io(_) => 500,
            Error::ApiServerError(_) => 500,
            Error::Other(_) => 500,

            Error::NotSupported(_) => 501,

            // The external tools sit behind us like an upstream service
            Error::Tool(_) => 502,

            Error::ShuttingDown => 503,
        }
    }

    fn error_code(&self) -> &str {
        match self {
            Error::Config { .. } => "config_error",
            Error::Validation(_) => "validation_error",
            Error::Database(_) => "database_error",
            Error::Download(e) => match e {
                DownloadError::NotFound { .. } => "download_not_found",
                DownloadError::FilesNotFound { .. } => "files_not_found",
                DownloadError::NotFinished { .. } => "download_not_finished",
            },
            Error::Tool(e) => match e {
                ToolError::StageFailed { .. } => "tool_stage_failed",
                ToolError::Timeout { .. } => "tool_timeout",
                ToolError::Launch { .. } => "tool_launch_failed",
            },
            Error::Io(_) => "io_error",
            Error::NotFound(_) => "not_found",
            Error::ShuttingDown => "shutting_down",
            Error::ApiServerError(_) => "api_server_error",
            Error::NotSupported(_) => "not_implemented",
            Error::Other(_) => "internal_error",
        }
    }
}

impl From<Error> for ApiError {
    fn from(error: Error) -> Self {
        let code = error.error_code().to_string();
        // Server-side paths stay in the log
        let message = match &error {
            Error::Download(DownloadError::FilesNotFound { id, .. }) => {
                format!("files of download {} are not available", id)
            }
            other => other.to_string(),
        };

        let details = match &error {
            Error::Download(DownloadError::NotFound { id }) => Some(serde_json::json!({
                "id": id,
            })),
            Error::Download(DownloadError::FilesNotFound { id, path }) => Some(serde_json::json!({
                "download_id": id,
                "file": path.file_name().map(|name| name.to_string_lossy()),
            })),
            Error::Download(DownloadError::NotFinished { id, status }) => {
                Some(serde_json::json!({
                    "download_id": id,
                    "status": status,
                }))
            }
            Error::Config {
                key: Some(key), ..
            } => Some(serde_json::json!({
                "key": key,
            })),
            _ => None,
        };

        ApiError {
            error: ErrorDetail {
                code,
                message,
                details,
            },
        }
    }
}
