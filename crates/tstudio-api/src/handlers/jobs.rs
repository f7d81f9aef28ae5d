//! Worker endpoints: one request runs one job to a terminal status.

use axum::body::Bytes;
use axum::extract::State;
use axum::Json;
use serde::Serialize;
use tracing::{error, info, warn};
use tstudio_models::{JobId, JobKind, WorkerRequest};

use crate::error::{ApiError, ApiResult};
use crate::state::AppState;

/// Body of a 200 response.
#[derive(Debug, Serialize)]
pub struct JobProcessedResponse {
    pub success: bool,
    pub message: String,
}

impl JobProcessedResponse {
    fn processed(job_id: &JobId) -> Self {
        Self {
            success: true,
            message: format!("Job {} processed.", job_id),
        }
    }
}

/// `POST /transcribe`
pub async fn transcribe(
    State(state): State<AppState>,
    body: Bytes,
) -> ApiResult<Json<JobProcessedResponse>> {
    process(&state, JobKind::Transcription, &body).await
}

/// `POST /clip`
pub async fn clip(
    State(state): State<AppState>,
    body: Bytes,
) -> ApiResult<Json<JobProcessedResponse>> {
    process(&state, JobKind::Clip, &body).await
}

async fn process(state: &AppState, kind: JobKind, body: &[u8]) -> ApiResult<Json<JobProcessedResponse>> {
    let pipeline = state
        .pipeline(kind)
        .cloned()
        .ok_or_else(|| ApiError::internal(format!("{} jobs are not served here", kind.label())))?;

    let request = WorkerRequest::parse(kind, body).map_err(|e| {
        warn!(kind = kind.as_str(), error = %e, "Rejected worker request");
        ApiError::from(e)
    })?;
    let job_id = request.job_id();
    info!(job_id = %job_id, kind = kind.as_str(), "Worker request accepted");

    // Detached from the connection: the job still gets its terminal write if
    // the caller goes away.
    let run = tokio::spawn(async move { pipeline.run(request).await });

    match run.await {
        Ok(Ok(outcome)) => Ok(Json(JobProcessedResponse::processed(&outcome.job_id))),
        Ok(Err(e)) => Err(ApiError::from_pipeline(&job_id, e)),
        Err(e) => {
            error!(job_id = %job_id, error = %e, "Job task ended abnormally");
            Err(ApiError::internal(format!("Job {} did not finish: {}", job_id, e)))
        }
    }
}
