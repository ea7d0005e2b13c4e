//! In-process job registry and FIFO queue.

use crate::types::{DownloadId, JobStatus};
use std::collections::{HashMap, VecDeque};
use std::sync::Arc;
use tokio::sync::Mutex;

/// What happened to a job's bookkeeping when its run ended
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JobOutcome {
    /// The final state belongs to the records
    Recorded,
    /// The job was deleted while running; its leftovers must be cleaned up
    Detached,
}

/// Result of cancelling a job
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CancelOutcome {
    /// No job was queued or running
    NotFound,
    /// A queued job was removed before it started
    Dequeued,
    /// A running job was detached; the worker cleans up when it ends
    Detached,
}

#[derive(Default)]
struct JobTable {
    queue: VecDeque<DownloadId>,
    states: HashMap<DownloadId, JobStatus>,
}

/// Jobs keyed by download id
///
/// Only queued, started and detached (deleted) jobs are tracked. A job leaves
/// the table when its run ends; from then on the records carry its status.
#[derive(Clone, Default)]
pub(crate) struct JobTracker {
    inner: Arc<Mutex<JobTable>>,
}

impl JobTracker {
    /// Queue a job unless one for the download is already queued or running
    pub(crate) async fn enqueue(&self, download_id: &DownloadId) -> bool {
        let mut table = self.inner.lock().await;
        if table.states.contains_key(download_id) {
            return false;
        }
        table.states.insert(download_id.clone(), JobStatus::Queued);
        table.queue.push_back(download_id.clone());
        true
    }

    /// Register a job that runs immediately, outside the queue
    pub(crate) async fn begin(&self, download_id: &DownloadId) -> bool {
        let mut table = self.inner.lock().await;
        if table.states.contains_key(download_id) {
            return false;
        }
        table.states.insert(download_id.clone(), JobStatus::Started);
        true
    }

    /// Take the oldest queued job and mark it started
    pub(crate) async fn next(&self) -> Option<DownloadId> {
        let mut table = self.inner.lock().await;
        while let Some(id) = table.queue.pop_front() {
            if let Some(state) = table.states.get_mut(&id)
                && *state == JobStatus::Queued
            {
                *state = JobStatus::Started;
                return Some(id);
            }
        }
        None
    }

    /// End a run and drop the job from the table
    pub(crate) async fn finish(&self, download_id: &DownloadId) -> JobOutcome {
        let mut table = self.inner.lock().await;
        match table.states.remove(download_id) {
            Some(JobStatus::Deleted) => JobOutcome::Detached,
            _ => JobOutcome::Recorded,
        }
    }

    /// Cancel a queued job or detach a running one
    pub(crate) async fn cancel(&self, download_id: &DownloadId) -> CancelOutcome {
        let mut table = self.inner.lock().await;
        match table.states.get(download_id).copied() {
            Some(JobStatus::Queued) => {
                table.states.remove(download_id);
                table.queue.retain(|id| id != download_id);
                CancelOutcome::Dequeued
            }
            // Already detached by an earlier cancel
            Some(JobStatus::Deleted) => CancelOutcome::NotFound,
            Some(_) => {
                table.states.insert(download_id.clone(), JobStatus::Deleted);
                CancelOutcome::Detached
            }
            None => CancelOutcome::NotFound,
        }
    }

    /// Current state of a tracked job
    pub(crate) async fn status(&self, download_id: &DownloadId) -> Option<JobStatus> {
        self.inner.lock().await.states.get(download_id).copied()
    }

    /// Whether a job for the download is queued or running
    pub(crate) async fn is_active(&self, download_id: &DownloadId) -> bool {
        self.status(download_id)
            .await
            .is_some_and(|status| status.is_active())
    }

    /// Number of jobs waiting for a worker
    pub(crate) async fn queued_len(&self) -> usize {
        let table = self.inner.lock().await;
        table
            .states
            .values()
            .filter(|status| **status == JobStatus::Queued)
            .count()
    }
}
