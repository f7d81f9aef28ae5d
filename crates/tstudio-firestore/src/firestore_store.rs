//! Job store backed by a Firestore collection.
//!
//! Subscriptions poll the job document and push a snapshot whenever its
//! `updateTime` changes.

use std::time::Duration;

use async_trait::async_trait;
use chrono::Utc;
use tokio::sync::mpsc;
use tracing::{debug, warn};
use tstudio_models::{Job, JobId, JobUpdate};

use crate::client::FirestoreClient;
use crate::error::{JobStoreError, JobStoreResult};
use crate::job_doc::{job_from_document, job_to_fields, update_to_fields};
use crate::metrics::record_subscription_poll;
use crate::store::{JobStore, JobSubscription};
use crate::types::Document;

/// [`JobStore`] over a Firestore collection.
#[derive(Clone)]
pub struct FirestoreJobStore {
    client: FirestoreClient,
    collection: String,
    poll_interval: Duration,
}

impl FirestoreJobStore {
    /// Store over the collection and poll interval of the client's config.
    pub fn new(client: FirestoreClient) -> Self {
        let collection = client.config().jobs_collection.clone();
        let poll_interval = client.config().poll_interval;
        Self {
            client,
            collection,
            poll_interval,
        }
    }

    /// Create from environment variables.
    pub async fn from_env() -> JobStoreResult<Self> {
        let client = FirestoreClient::from_env()
            .await
            .map_err(|e| JobStoreError::unavailable(e.to_string()))?;
        Ok(Self::new(client))
    }

    async fn fetch(&self, id: &JobId) -> JobStoreResult<Option<Document>> {
        self.client
            .get_document(&self.collection, id.as_str())
            .await
            .map_err(|e| JobStoreError::from_firestore(id, e))
    }

    fn decode(id: &JobId, doc: &Document) -> JobStoreResult<Job> {
        job_from_document(doc).map_err(|e| JobStoreError::from_firestore(id, e))
    }
}

#[async_trait]
impl JobStore for FirestoreJobStore {
    async fn create(&self, job: &Job) -> JobStoreResult<()> {
        let fields = job_to_fields(job).map_err(|e| JobStoreError::from_firestore(&job.id, e))?;
        self.client
            .create_document(&self.collection, job.id.as_str(), fields)
            .await
            .map_err(|e| JobStoreError::from_firestore(&job.id, e))?;
        debug!(job_id = %job.id, kind = %job.kind, "Job created");
        Ok(())
    }

    async fn update(&self, id: &JobId, update: JobUpdate) -> JobStoreResult<Job> {
        let (fields, mask) =
            update_to_fields(&update, Utc::now()).map_err(|e| JobStoreError::from_firestore(id, e))?;
        let doc = self
            .client
            .update_document(&self.collection, id.as_str(), fields, &mask)
            .await
            .map_err(|e| JobStoreError::from_firestore(id, e))?;
        let job = Self::decode(id, &doc)?;
        debug!(job_id = %id, status = %job.status, "Job updated");
        Ok(job)
    }

    async fn get(&self, id: &JobId) -> JobStoreResult<Option<Job>> {
        match self.fetch(id).await? {
            Some(doc) => Ok(Some(Self::decode(id, &doc)?)),
            None => Ok(None),
        }
    }

    async fn subscribe(&self, id: &JobId) -> JobStoreResult<JobSubscription> {
        let doc = self
            .fetch(id)
            .await?
            .ok_or_else(|| JobStoreError::NotFound(id.clone()))?;
        let current = Self::decode(id, &doc)?;

        let (tx, rx) = mpsc::unbounded_channel();
        let _ = tx.send(current);

        let store = self.clone();
        let job_id = id.clone();
        let mut last_update_time = doc.update_time;

        let poller = tokio::spawn(async move {
            let mut interval = tokio::time::interval(store.poll_interval);
            interval.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
            interval.tick().await;

            loop {
                tokio::select! {
                    _ = tx.closed() => break,
                    _ = interval.tick() => {}
                }

                let doc = match store.fetch(&job_id).await {
                    Ok(Some(doc)) => doc,
                    Ok(None) => {
                        record_subscription_poll("missing");
                        warn!(job_id = %job_id, "Subscribed job disappeared");
                        break;
                    }
                    Err(e) => {
                        record_subscription_poll("error");
                        warn!(job_id = %job_id, error = %e, "Job poll failed");
                        continue;
                    }
                };

                if doc.update_time.is_some() && doc.update_time == last_update_time {
                    record_subscription_poll("unchanged");
                    continue;
                }
                last_update_time = doc.update_time.clone();

                match Self::decode(&job_id, &doc) {
                    Ok(job) => {
                        record_subscription_poll("changed");
                        if tx.send(job).is_err() {
                            break;
                        }
                    }
                    Err(e) => {
                        record_subscription_poll("error");
                        warn!(job_id = %job_id, error = %e, "Skipping undecodable job snapshot");
                    }
                }
            }
            debug!(job_id = %job_id, "Job subscription poller stopped");
        });

        Ok(JobSubscription::new(id.clone(), rx).with_unsubscribe(move || poller.abort()))
    }
}
