//! Application state.

use std::collections::HashMap;
use std::sync::Arc;

use tracing::info;
use tstudio_deepgram::DeepgramClient;
use tstudio_firestore::{FirestoreJobStore, JobStore};
use tstudio_models::JobKind;
use tstudio_storage::{ArtifactStore, S3ArtifactStore};
use tstudio_worker::{ClipEngine, EngineAdapter, JobPipeline, TranscriptionEngine, WorkerConfig};

use crate::config::ApiConfig;
use crate::error::ApiResult;

/// Shared application state.
#[derive(Clone)]
pub struct AppState {
    pub config: ApiConfig,
    pipelines: Arc<HashMap<JobKind, JobPipeline>>,
}

impl AppState {
    /// Assemble state from already-built pipelines, one per served kind.
    pub fn from_parts(config: ApiConfig, pipelines: Vec<JobPipeline>) -> Self {
        let pipelines = pipelines.into_iter().map(|p| (p.kind(), p)).collect();
        Self {
            config,
            pipelines: Arc::new(pipelines),
        }
    }

    /// Build the job store, artifact store and engines from the environment.
    pub async fn new(config: ApiConfig) -> ApiResult<Self> {
        let worker_config = WorkerConfig::from_env();

        let store: Arc<dyn JobStore> = Arc::new(FirestoreJobStore::from_env().await?);
        info!("Job store initialized");

        let artifacts: Arc<dyn ArtifactStore> = Arc::new(S3ArtifactStore::from_env().await?);
        info!(
            container = artifacts.default_container(),
            "Artifact store initialized"
        );

        let mut pipelines = Vec::with_capacity(worker_config.kinds.len());
        for kind in &worker_config.kinds {
            let engine: Arc<dyn EngineAdapter> = match kind {
                JobKind::Clip => Arc::new(ClipEngine::new(worker_config.default_output_format.clone())),
                JobKind::Transcription => Arc::new(TranscriptionEngine::new(DeepgramClient::from_env()?)),
            };
            info!(
                kind = kind.as_str(),
                engine = engine.name(),
                budget_secs = worker_config.budget_for(*kind).as_secs(),
                "Pipeline ready"
            );
            pipelines.push(JobPipeline::new(
                Arc::clone(&store),
                Arc::clone(&artifacts),
                engine,
                worker_config.clone(),
            ));
        }

        Ok(Self::from_parts(config, pipelines))
    }

    pub fn pipeline(&self, kind: JobKind) -> Option<&JobPipeline> {
        self.pipelines.get(&kind)
    }

    pub fn serves(&self, kind: JobKind) -> bool {
        self.pipelines.contains_key(&kind)
    }
}
