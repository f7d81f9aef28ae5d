//! The job store contract and job subscriptions.

use async_trait::async_trait;
use tokio::sync::mpsc;
use tstudio_models::{Job, JobId, JobUpdate};

use crate::error::JobStoreResult;

/// Durable keyed storage for job records.
///
/// Implementations deliver every accepted update to live subscribers of the
/// job, in the order the updates were applied.
#[async_trait]
pub trait JobStore: Send + Sync {
    /// Persist a new record. Fails with `AlreadyExists` if the id is taken.
    async fn create(&self, job: &Job) -> JobStoreResult<()>;

    /// Merge `update` into an existing record and return the result.
    async fn update(&self, id: &JobId, update: JobUpdate) -> JobStoreResult<Job>;

    /// Current record, if any.
    async fn get(&self, id: &JobId) -> JobStoreResult<Option<Job>>;

    /// Subscribe to snapshots of `id`. The current snapshot is delivered first.
    async fn subscribe(&self, id: &JobId) -> JobStoreResult<JobSubscription>;
}

type Teardown = Box<dyn FnOnce() + Send>;

/// A live stream of job snapshots.
///
/// Snapshots stop once [`JobSubscription::unsubscribe`] is called or the
/// subscription is dropped.
pub struct JobSubscription {
    job_id: JobId,
    rx: mpsc::UnboundedReceiver<Job>,
    teardown: Option<Teardown>,
}

impl JobSubscription {
    pub fn new(job_id: JobId, rx: mpsc::UnboundedReceiver<Job>) -> Self {
        Self {
            job_id,
            rx,
            teardown: None,
        }
    }

    /// Run `teardown` when the subscription ends.
    pub fn with_unsubscribe(mut self, teardown: impl FnOnce() + Send + 'static) -> Self {
        self.teardown = Some(Box::new(teardown));
        self
    }

    pub fn job_id(&self) -> &JobId {
        &self.job_id
    }

    /// Next snapshot, or `None` once the store stops delivering.
    pub async fn next(&mut self) -> Option<Job> {
        self.rx.recv().await
    }

    /// Stop delivery. No snapshot is observed after this returns.
    pub fn unsubscribe(mut self) {
        self.close();
    }

    fn close(&mut self) {
        self.rx.close();
        if let Some(teardown) = self.teardown.take() {
            teardown();
        }
    }
}

impl Drop for JobSubscription {
    fn drop(&mut self) {
        self.close();
    }
}

impl std::fmt::Debug for JobSubscription {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("JobSubscription")
            .field("job_id", &self.job_id)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    #[tokio::test]
    async fn test_teardown_runs_once() {
        let calls = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&calls);
        let (_tx, rx) = mpsc::unbounded_channel();

        let sub = JobSubscription::new(JobId::from_string("job-1"), rx)
            .with_unsubscribe(move || {
                counter.fetch_add(1, Ordering::SeqCst);
            });
        sub.unsubscribe();

        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_drop_tears_down() {
        let calls = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&calls);
        let (tx, rx) = mpsc::unbounded_channel::<Job>();

        {
            let _sub = JobSubscription::new(JobId::from_string("job-1"), rx)
                .with_unsubscribe(move || {
                    counter.fetch_add(1, Ordering::SeqCst);
                });
        }

        assert_eq!(calls.load(Ordering::SeqCst), 1);
        assert!(tx.is_closed());
    }
}
