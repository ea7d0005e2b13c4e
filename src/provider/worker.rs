//! Worker pool draining the job queue in async mode.

use std::time::Duration;

use super::ImmunespaceProvider;

/// Interval between queue polling attempts when the queue is empty
const QUEUE_POLL_INTERVAL: Duration = Duration::from_millis(100);

impl ImmunespaceProvider {
    /// Start `queue.workers` long-lived workers
    ///
    /// Each worker takes the oldest queued job, runs it to completion and
    /// repeats until shutdown. A worker never holds more than one job, so
    /// distinct downloads never share a working directory.
    pub(crate) fn start_workers(&self) -> Vec<tokio::task::JoinHandle<()>> {
        (0..self.config.queue.workers)
            .map(|worker| {
                let provider = self.clone();
                tokio::spawn(async move { provider.worker_loop(worker).await })
            })
            .collect()
    }

    async fn worker_loop(&self, worker: usize) {
        tracing::debug!(worker, "Worker started");
        while !self.shutdown_token.is_cancelled() {
            match self.jobs.next().await {
                Some(download_id) => {
                    tracing::info!(worker, download_id = %download_id, "Worker picked up job");
                    match self.run_job(&download_id).await {
                        Ok(status) => {
                            tracing::info!(worker, download_id = %download_id, status = %status, "Job ended");
                        }
                        Err(e) => {
                            tracing::error!(worker, download_id = %download_id, error = %e, "Job failed");
                        }
                    }
                }
                None => {
                    tokio::select! {
                        _ = self.shutdown_token.cancelled() => break,
                        _ = tokio::time::sleep(QUEUE_POLL_INTERVAL) => {}
                    }
                }
            }
        }
        tracing::debug!(worker, "Worker stopped");
    }
}
