//! Job watching.

use std::sync::Arc;

use tokio::task::JoinHandle;
use tracing::{debug, info};
use tstudio_firestore::{JobStore, JobSubscription};
use tstudio_models::{JobId, JobStatus};

use crate::error::ClientResult;
use crate::progress::ProgressUpdate;

/// Follows job records through the Job Store.
#[derive(Clone)]
pub struct JobWatcher {
    store: Arc<dyn JobStore>,
}

impl JobWatcher {
    pub fn new(store: Arc<dyn JobStore>) -> Self {
        Self { store }
    }

    /// Report every status change of `job_id` to `on_update` until the job
    /// reaches a terminal status or the handle is released.
    pub async fn watch<F>(&self, job_id: &JobId, on_update: F) -> ClientResult<WatchHandle>
    where
        F: FnMut(ProgressUpdate) + Send + 'static,
    {
        let subscription = self.store.subscribe(job_id).await?;
        Ok(Self::watch_subscription(subscription, on_update))
    }

    /// Drive an existing subscription on a background task.
    pub fn watch_subscription<F>(mut subscription: JobSubscription, mut on_update: F) -> WatchHandle
    where
        F: FnMut(ProgressUpdate) + Send + 'static,
    {
        let job_id = subscription.job_id().clone();
        let task_job_id = job_id.clone();

        let task = tokio::spawn(async move {
            let mut last: Option<JobStatus> = None;
            while let Some(job) = subscription.next().await {
                if !is_status_change(last, job.status) {
                    debug!(job_id = %task_job_id, status = %job.status, "Ignoring snapshot");
                    continue;
                }
                last = Some(job.status);

                let update = ProgressUpdate::from_job(&job);
                on_update(update.clone());

                if update.is_terminal() {
                    info!(job_id = %task_job_id, status = %update.status, "Job finished, unsubscribing");
                    subscription.unsubscribe();
                    return Some(update);
                }
            }
            None
        });

        WatchHandle {
            job_id,
            task: Some(task),
        }
    }
}

/// Whether `next` is a forward move from `last`. Repeats and stale
/// snapshots that would move the status backwards are dropped.
fn is_status_change(last: Option<JobStatus>, next: JobStatus) -> bool {
    match last {
        None => true,
        Some(last) => next != last && next.rank() > last.rank(),
    }
}

/// Handle on a running watch. Dropping it stops the watch.
#[derive(Debug)]
pub struct WatchHandle {
    job_id: JobId,
    task: Option<JoinHandle<Option<ProgressUpdate>>>,
}

impl WatchHandle {
    pub fn job_id(&self) -> &JobId {
        &self.job_id
    }

    /// Whether the watch has stopped on its own.
    pub fn is_finished(&self) -> bool {
        self.task.as_ref().map_or(true, |t| t.is_finished())
    }

    /// Stop watching and release the subscription.
    pub fn unsubscribe(mut self) {
        self.stop();
    }

    /// Wait for the terminal update. `None` if the subscription closed
    /// before the job finished.
    pub async fn finished(mut self) -> Option<ProgressUpdate> {
        let task = self.task.take()?;
        task.await.ok().flatten()
    }

    fn stop(&mut self) {
        if let Some(task) = self.task.take() {
            task.abort();
            debug!(job_id = %self.job_id, "Watch stopped");
        }
    }
}

impl Drop for WatchHandle {
    fn drop(&mut self) {
        self.stop();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_is_status_change() {
        assert!(is_status_change(None, JobStatus::Processing));
        assert!(is_status_change(Some(JobStatus::Pending), JobStatus::Processing));
        assert!(is_status_change(Some(JobStatus::Processing), JobStatus::Failed));
        assert!(!is_status_change(Some(JobStatus::Processing), JobStatus::Processing));
        assert!(!is_status_change(Some(JobStatus::Processing), JobStatus::Pending));
        assert!(!is_status_change(Some(JobStatus::Completed), JobStatus::Failed));
    }
}
