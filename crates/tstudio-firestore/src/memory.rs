//! In-memory job store.
//!
//! Updates are pushed to subscribers while the store lock is held, so every
//! subscriber sees snapshots in exactly the order they were applied.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard, Weak};

use async_trait::async_trait;
use chrono::Utc;
use tokio::sync::mpsc;
use tracing::debug;
use tstudio_models::{Job, JobId, JobUpdate};

use crate::error::{JobStoreError, JobStoreResult};
use crate::store::{JobStore, JobSubscription};

struct Subscriber {
    id: u64,
    tx: mpsc::UnboundedSender<Job>,
}

#[derive(Default)]
struct Inner {
    jobs: HashMap<JobId, Job>,
    subscribers: HashMap<JobId, Vec<Subscriber>>,
    next_subscriber: u64,
    unavailable: bool,
}

/// Process-local [`JobStore`].
#[derive(Clone, Default)]
pub struct MemoryJobStore {
    inner: Arc<Mutex<Inner>>,
}

impl MemoryJobStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make every operation fail with `Unavailable` while `available` is false.
    pub fn set_available(&self, available: bool) {
        if let Ok(mut inner) = self.inner.lock() {
            inner.unavailable = !available;
        }
    }

    /// Number of live subscriptions for `id`.
    pub fn subscriber_count(&self, id: &JobId) -> usize {
        self.inner
            .lock()
            .map(|inner| inner.subscribers.get(id).map_or(0, Vec::len))
            .unwrap_or(0)
    }

    fn lock(&self) -> JobStoreResult<MutexGuard<'_, Inner>> {
        let inner = self
            .inner
            .lock()
            .map_err(|_| JobStoreError::unavailable("job store lock poisoned"))?;
        if inner.unavailable {
            return Err(JobStoreError::unavailable("job store offline"));
        }
        Ok(inner)
    }
}

fn remove_subscriber(inner: &Weak<Mutex<Inner>>, job_id: &JobId, subscriber_id: u64) {
    let Some(inner) = inner.upgrade() else {
        return;
    };
    let Ok(mut inner) = inner.lock() else {
        return;
    };
    if let Some(subs) = inner.subscribers.get_mut(job_id) {
        subs.retain(|s| s.id != subscriber_id);
        if subs.is_empty() {
            inner.subscribers.remove(job_id);
        }
    }
}

#[async_trait]
impl JobStore for MemoryJobStore {
    async fn create(&self, job: &Job) -> JobStoreResult<()> {
        let mut inner = self.lock()?;
        if inner.jobs.contains_key(&job.id) {
            return Err(JobStoreError::AlreadyExists(job.id.clone()));
        }
        inner.jobs.insert(job.id.clone(), job.clone());
        debug!(job_id = %job.id, kind = %job.kind, "Job created");
        Ok(())
    }

    async fn update(&self, id: &JobId, update: JobUpdate) -> JobStoreResult<Job> {
        let mut guard = self.lock()?;
        let inner = &mut *guard;

        let job = inner
            .jobs
            .get_mut(id)
            .ok_or_else(|| JobStoreError::NotFound(id.clone()))?;

        job.apply(&update, Utc::now())
            .map_err(|source| JobStoreError::InvalidTransition {
                id: id.clone(),
                source,
            })?;
        let snapshot = job.clone();

        if let Some(subs) = inner.subscribers.get_mut(id) {
            subs.retain(|s| s.tx.send(snapshot.clone()).is_ok());
        }

        debug!(job_id = %id, status = %snapshot.status, "Job updated");
        Ok(snapshot)
    }

    async fn get(&self, id: &JobId) -> JobStoreResult<Option<Job>> {
        Ok(self.lock()?.jobs.get(id).cloned())
    }

    async fn subscribe(&self, id: &JobId) -> JobStoreResult<JobSubscription> {
        let mut inner = self.lock()?;
        let current = inner
            .jobs
            .get(id)
            .cloned()
            .ok_or_else(|| JobStoreError::NotFound(id.clone()))?;

        let (tx, rx) = mpsc::unbounded_channel();
        let _ = tx.send(current);

        let subscriber_id = inner.next_subscriber;
        inner.next_subscriber += 1;
        inner
            .subscribers
            .entry(id.clone())
            .or_default()
            .push(Subscriber { id: subscriber_id, tx });

        let weak = Arc::downgrade(&self.inner);
        let job_id = id.clone();
        Ok(JobSubscription::new(id.clone(), rx)
            .with_unsubscribe(move || remove_subscriber(&weak, &job_id, subscriber_id)))
    }
}
