//! Startup restoration and shutdown coordination.

use crate::error::Result;
use crate::types::JobStatus;
use std::sync::atomic::Ordering;
use std::time::Duration;

use super::ImmunespaceProvider;

/// How long shutdown waits for workers to finish their current job
const SHUTDOWN_TIMEOUT: Duration = Duration::from_secs(30);

impl ImmunespaceProvider {
    /// Re-enqueue downloads left queued or started by a previous process
    pub(crate) async fn restore_queue(&self) -> Result<usize> {
        let pending = self
            .db
            .list_download_ids_with_status(&[JobStatus::Queued, JobStatus::Started])
            .await?;

        let mut restored = 0;
        for download_id in pending {
            self.db.set_status(&download_id, JobStatus::Queued).await?;
            if self.jobs.enqueue(&download_id).await {
                restored += 1;
            }
        }

        if restored > 0 {
            tracing::info!(restored, "Restored interrupted downloads to the queue");
        }
        Ok(restored)
    }

    /// Gracefully shut down the provider
    ///
    /// Stops accepting submissions, signals the workers and waits up to 30
    /// seconds for running jobs. Jobs still queued stay `queued` in the store
    /// and are restored on the next start.
    pub async fn shutdown(&self) -> Result<()> {
        tracing::info!("Initiating graceful shutdown");

        self.accepting_new.store(false, Ordering::SeqCst);
        self.shutdown_token.cancel();

        let handles: Vec<_> = self.workers.lock().await.drain(..).collect();
        let wait = async {
            for handle in handles {
                if let Err(e) = handle.await {
                    tracing::warn!(error = %e, "Worker ended abnormally");
                }
            }
        };

        match tokio::time::timeout(SHUTDOWN_TIMEOUT, wait).await {
            Ok(()) => tracing::info!("All workers stopped"),
            Err(_) => tracing::warn!("Timeout waiting for workers, proceeding with shutdown"),
        }

        tracing::info!("Graceful shutdown complete");
        Ok(())
    }

    /// Whether new submissions are accepted
    pub fn is_accepting(&self) -> bool {
        self.accepting_new.load(Ordering::SeqCst)
    }
}
