//! The job pipeline.
//!
//! One [`JobPipeline::run`] call is one non-retrying pass over one job:
//! validate, mark processing, resolve the input, run the engine under its
//! budget, check and publish the output, then write the terminal status.
//! The scratch directory is reclaimed on every path.

use std::path::Path;
use std::sync::Arc;

use chrono::Utc;
use tracing::{debug, Instrument};
use tstudio_firestore::JobStore;
use tstudio_media::video_content_type;
use tstudio_models::{ArtifactUri, JobId, JobKind, JobParams, JobUpdate, Transcript, WorkerRequest};
use tstudio_storage::{ArtifactStore, StorageError, UploadProgress, UploadProgressFn};

use crate::config::WorkerConfig;
use crate::engine::{invoke_with_budget, EngineAdapter, EngineOutput, InputMode, ResolvedInput};
use crate::error::{PipelineError, PipelineResult};
use crate::logging::JobLogger;
use crate::metrics;
use crate::scratch::ScratchDir;

/// Published result of a job.
#[derive(Debug, Clone, PartialEq)]
pub enum JobOutput {
    /// Canonical URI of an uploaded artifact
    Artifact(ArtifactUri),
    /// Structured result stored on the record
    Transcript(Transcript),
}

/// Result of a successful pipeline run.
#[derive(Debug, Clone)]
pub struct JobOutcome {
    pub job_id: JobId,
    pub kind: JobKind,
    pub output: JobOutput,
}

/// Runs jobs of one kind against explicitly provided services.
#[derive(Clone)]
pub struct JobPipeline {
    store: Arc<dyn JobStore>,
    artifacts: Arc<dyn ArtifactStore>,
    engine: Arc<dyn EngineAdapter>,
    config: WorkerConfig,
}

impl JobPipeline {
    pub fn new(
        store: Arc<dyn JobStore>,
        artifacts: Arc<dyn ArtifactStore>,
        engine: Arc<dyn EngineAdapter>,
        config: WorkerConfig,
    ) -> Self {
        Self {
            store,
            artifacts,
            engine,
            config,
        }
    }

    /// Job kind served by this pipeline.
    pub fn kind(&self) -> JobKind {
        self.engine.kind()
    }

    pub fn config(&self) -> &WorkerConfig {
        &self.config
    }

    /// Check a request before any state is touched.
    pub fn validate_request(&self, request: &WorkerRequest) -> PipelineResult<()> {
        if request.kind() != self.kind() {
            return Err(PipelineError::validation(format!(
                "{} worker cannot process a {} request",
                self.kind(),
                request.kind()
            )));
        }
        request.validate()?;
        Ok(())
    }

    /// Process one job.
    ///
    /// Validation failures return before any store call. Every failure after
    /// the job was marked processing is written to the record as `FAILED`.
    pub async fn run(&self, request: WorkerRequest) -> PipelineResult<JobOutcome> {
        let kind = self.kind();
        if let Err(e) = self.validate_request(&request) {
            metrics::record_job_rejected(kind);
            return Err(e);
        }

        let job_id = request.job_id();
        let logger = JobLogger::new(&job_id, kind, &format!("{}_pipeline", kind));
        let span = logger.create_span();

        async move {
            metrics::record_job_started(kind);
            metrics::increment_in_flight(kind);
            let _in_flight = scopeguard::guard(kind, metrics::decrement_in_flight);

            logger.log_start(&format!("input {}", request.input_uri()));

            if let Err(e) = self.mark_processing(&job_id).await {
                logger.log_error(&format!("Could not mark job as processing: {}", e));
                metrics::record_job_failed(kind, e.kind());
                return Err(e);
            }

            match self.execute(&job_id, &request, &logger).await {
                Ok(output) => {
                    self.mark_completed(&job_id, &output, &logger).await;
                    metrics::record_job_completed(kind);
                    logger.log_completion(&describe_output(&output));
                    Ok(JobOutcome {
                        job_id: job_id.clone(),
                        kind,
                        output,
                    })
                }
                Err(e) => {
                    logger.log_error(&e.to_string());
                    metrics::record_job_failed(kind, e.kind());
                    self.mark_failed(&job_id, &e, &logger).await;
                    Err(e)
                }
            }
        }
        .instrument(span)
        .await
    }

    async fn mark_processing(&self, job_id: &JobId) -> PipelineResult<()> {
        self.store
            .update(job_id, JobUpdate::processing(Utc::now()))
            .await?;
        Ok(())
    }

    /// Everything between marking the job processing and its terminal write.
    async fn execute(
        &self,
        job_id: &JobId,
        request: &WorkerRequest,
        logger: &JobLogger,
    ) -> PipelineResult<JobOutput> {
        let scratch = ScratchDir::create(&self.config.work_dir, self.kind(), job_id)?;
        debug!(path = %scratch.path().display(), "Scratch directory created");

        let result = self.execute_in(&scratch, job_id, request, logger).await;

        scratch.close();
        result
    }

    async fn execute_in(
        &self,
        scratch: &ScratchDir,
        job_id: &JobId,
        request: &WorkerRequest,
        logger: &JobLogger,
    ) -> PipelineResult<JobOutput> {
        let input_uri = ArtifactUri::parse(request.input_uri()).map_err(StorageError::from)?;
        let params = request.params();

        let input = self.resolve_input(&input_uri, scratch, logger).await?;

        logger.log_progress(&format!("Invoking {} engine", self.engine.name()));
        let output = invoke_with_budget(
            self.engine.as_ref(),
            input,
            &params,
            self.config.budget_for(self.kind()),
        )
        .await?;

        self.validate_output(&output, logger).await?;
        self.publish_output(job_id, output, &params, logger).await
    }

    async fn resolve_input(
        &self,
        uri: &ArtifactUri,
        scratch: &ScratchDir,
        logger: &JobLogger,
    ) -> PipelineResult<ResolvedInput> {
        if uri.container() != self.artifacts.default_container() {
            logger.log_warning(&format!(
                "Input container '{}' differs from default container '{}', reading from '{}'",
                uri.container(),
                self.artifacts.default_container(),
                uri.container()
            ));
        }

        match self.engine.input_mode() {
            InputMode::LocalFile => {
                let dest = scratch.join(uri.file_name());
                let bytes = self.artifacts.download_to(uri, &dest).await?;
                logger.log_progress(&format!("Downloaded {} ({} bytes)", uri, bytes));
                Ok(ResolvedInput::LocalFile {
                    path: dest,
                    output_dir: scratch.path().to_path_buf(),
                })
            }
            InputMode::SignedUrl => {
                let url = self
                    .artifacts
                    .signed_url(uri, self.config.signed_url_ttl)
                    .await?;
                logger.log_progress("Signed URL generated for input");
                Ok(ResolvedInput::SignedUrl(url))
            }
        }
    }

    /// Artifacts must exist and be non-empty; an empty transcript is only
    /// worth a warning.
    async fn validate_output(&self, output: &EngineOutput, logger: &JobLogger) -> PipelineResult<()> {
        match output {
            EngineOutput::Artifact(path) => {
                let metadata = tokio::fs::metadata(path).await.map_err(|e| {
                    PipelineError::engine(
                        format!("{} produced no output file {}", self.engine.name(), display_name(path)),
                        Some(e.to_string()),
                    )
                })?;
                if metadata.len() == 0 {
                    return Err(PipelineError::engine(
                        format!(
                            "{} produced an empty output file {}",
                            self.engine.name(),
                            display_name(path)
                        ),
                        None,
                    ));
                }
                Ok(())
            }
            EngineOutput::Transcript(transcript) => {
                if transcript.is_empty() {
                    logger.log_warning("Transcription finished without any words");
                }
                Ok(())
            }
        }
    }

    async fn publish_output(
        &self,
        job_id: &JobId,
        output: EngineOutput,
        params: &JobParams,
        logger: &JobLogger,
    ) -> PipelineResult<JobOutput> {
        let path = match output {
            EngineOutput::Transcript(transcript) => return Ok(JobOutput::Transcript(transcript)),
            EngineOutput::Artifact(path) => path,
        };

        let file_name = display_name(&path);
        let key = format!("clips/{}/{}", job_id, file_name);
        let format = path
            .extension()
            .map(|e| e.to_string_lossy().to_string())
            .or_else(|| params.as_clip().and_then(|c| c.output_format.clone()))
            .unwrap_or_else(|| self.config.default_output_format.clone());

        let progress_logger = logger.clone();
        let progress: UploadProgressFn = Arc::new(move |p: UploadProgress| {
            if p.bytes_sent == p.total_bytes {
                progress_logger.log_progress(&format!("Uploaded {} bytes", p.total_bytes));
            }
        });

        let uri = self
            .artifacts
            .upload(&path, &key, &video_content_type(&format), Some(progress))
            .await
            .map_err(|e| PipelineError::publish(e.to_string()))?;

        Ok(JobOutput::Artifact(uri))
    }

    async fn mark_completed(&self, job_id: &JobId, output: &JobOutput, logger: &JobLogger) {
        let update = match output {
            JobOutput::Artifact(uri) => JobUpdate::completed_artifact(uri.to_string(), Utc::now()),
            JobOutput::Transcript(transcript) => {
                JobUpdate::completed_transcript(transcript.clone(), Utc::now())
            }
        };
        if let Err(e) = self.store.update(job_id, update).await {
            metrics::record_terminal_write_failure(self.kind());
            logger.log_error(&format!("Failed to record COMPLETED status: {}", e));
        }
    }

    async fn mark_failed(&self, job_id: &JobId, error: &PipelineError, logger: &JobLogger) {
        let update = JobUpdate::failed(error.to_string(), Utc::now());
        if let Err(e) = self.store.update(job_id, update).await {
            metrics::record_terminal_write_failure(self.kind());
            logger.log_error(&format!("Failed to record FAILED status: {}", e));
        }
    }
}

fn display_name(path: &Path) -> String {
    path.file_name()
        .map(|n| n.to_string_lossy().to_string())
        .unwrap_or_else(|| path.display().to_string())
}

fn describe_output(output: &JobOutput) -> String {
    match output {
        JobOutput::Artifact(uri) => format!("published {}", uri),
        JobOutput::Transcript(transcript) => format!("{} words transcribed", transcript.len()),
    }
}
