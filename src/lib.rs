//! # immunespace-provider
//!
//! Data provider that fetches ImmunoSpace datasets through containerized
//! tools and serves the resulting CSV matrices over a GA4GH DRS-style API.
//!
//! A submission names a submitter, an accession and an ImmunoSpace API key.
//! The provider runs the groups stage (which writes the matrices) and the
//! mapper stage into a per-download directory, records one object per
//! matrix, and returns the descriptor of the requested file. Repeating a
//! submission reuses the finished download.
//!
//! ## Quick Start
//!
//! ```no_run
//! use immunespace_provider::{Config, ImmunespaceProvider};
//! use std::sync::Arc;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let config = Config::default();
//!     let provider = Arc::new(ImmunespaceProvider::new(config.clone()).await?);
//!
//!     immunespace_provider::api::start_api_server(
//!         provider.clone(),
//!         Arc::new(config),
//!         immunespace_provider::shutdown_signal(),
//!     )
//!     .await?;
//!
//!     provider.shutdown().await?;
//!     Ok(())
//! }
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::unwrap_used)]
#![warn(clippy::expect_used)]

/// REST API module
pub mod api;
/// Configuration types
pub mod config;
/// Database persistence layer
pub mod db;
/// Error types
pub mod error;
/// Identifier generation and path-safety checks
pub mod naming;
/// Download orchestration (submission, queue, files, deletion)
pub mod provider;
/// CSV dimension and size scanning
pub mod tabular;
/// Container runtime and the two tool stages
pub mod tools;
/// Core types
pub mod types;

// Re-export commonly used types
pub use config::{Config, ExecutionMode};
pub use db::Database;
pub use error::{
    ApiError, DatabaseError, DownloadError, Error, ErrorDetail, Result, ToHttpStatus, ToolError,
};
pub use provider::ImmunespaceProvider;
pub use types::{
    DataType, DeleteResult, DeleteStatus, DownloadId, FileType, JobStatus, ObjectDescriptor,
    ObjectId, SearchEntry, StatusResult, Submission, SubmitParameters,
};

/// Helper function to run the provider with graceful signal handling.
///
/// Waits for a termination signal and then calls the provider's `shutdown()` method.
///
/// - **Unix:** listens for SIGTERM and SIGINT, with fallbacks if signal registration fails.
/// - **Windows/other:** listens for Ctrl+C via `tokio::signal::ctrl_c()`.
pub async fn run_with_shutdown(provider: ImmunespaceProvider) -> Result<()> {
    shutdown_signal().await;
    provider.shutdown().await
}

/// Resolve once a termination signal arrives
#[cfg(unix)]
pub async fn shutdown_signal() {
    use tokio::signal::unix::{SignalKind, signal};

    // Set up signal handlers - these may fail in restricted environments (containers, tests)
    let sigterm_result = signal(SignalKind::terminate());
    let sigint_result = signal(SignalKind::interrupt());

    match (sigterm_result, sigint_result) {
        (Ok(mut sigterm), Ok(mut sigint)) => {
            tokio::select! {
                _ = sigterm.recv() => {
                    tracing::info!("Received SIGTERM signal");
                }
                _ = sigint.recv() => {
                    tracing::info!("Received SIGINT signal (Ctrl+C)");
                }
            }
        }
        (Err(e), _) => {
            tracing::warn!(error = %e, "Could not register SIGTERM handler, waiting for SIGINT only");
            if let Ok(mut sigint) = signal(SignalKind::interrupt()) {
                sigint.recv().await;
                tracing::info!("Received SIGINT signal (Ctrl+C)");
            } else {
                tracing::error!("Could not register any signal handlers, using ctrl_c fallback");
                tokio::signal::ctrl_c().await.ok();
            }
        }
        (_, Err(e)) => {
            tracing::warn!(error = %e, "Could not register SIGINT handler, waiting for SIGTERM only");
            if let Ok(mut sigterm) = signal(SignalKind::terminate()) {
                sigterm.recv().await;
                tracing::info!("Received SIGTERM signal");
            } else {
                tracing::error!("Could not register any signal handlers, using ctrl_c fallback");
                tokio::signal::ctrl_c().await.ok();
            }
        }
    }
}

/// Resolve once a termination signal arrives
#[cfg(not(unix))]
pub async fn shutdown_signal() {
    match tokio::signal::ctrl_c().await {
        Ok(()) => {
            tracing::info!("Received Ctrl+C signal");
        }
        Err(e) => {
            tracing::error!(error = %e, "Failed to listen for Ctrl+C signal");
        }
    }
}
