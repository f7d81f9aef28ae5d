//! API error types.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::Serialize;
use thiserror::Error;
use tstudio_deepgram::DeepgramError;
use tstudio_firestore::JobStoreError;
use tstudio_models::{JobId, ModelError};
use tstudio_storage::StorageError;
use tstudio_worker::PipelineError;

pub type ApiResult<T> = Result<T, ApiError>;

#[derive(Debug, Error)]
pub enum ApiError {
    /// Rejected before any state was touched
    #[error("{0}")]
    BadRequest(String),

    #[error("Failed to process job {job_id}: {message}")]
    JobFailed { job_id: String, message: String },

    #[error("Internal error: {0}")]
    Internal(String),

    #[error("Storage error: {0}")]
    Storage(#[from] StorageError),

    #[error("Job store error: {0}")]
    JobStore(#[from] JobStoreError),

    #[error("Deepgram error: {0}")]
    Deepgram(#[from] DeepgramError),
}

impl ApiError {
    pub fn bad_request(msg: impl Into<String>) -> Self {
        Self::BadRequest(msg.into())
    }

    pub fn internal(msg: impl Into<String>) -> Self {
        Self::Internal(msg.into())
    }

    /// A job that failed after it was accepted.
    pub fn job_failed(job_id: &JobId, error: &PipelineError) -> Self {
        Self::JobFailed {
            job_id: job_id.to_string(),
            message: error.to_string(),
        }
    }

    /// Map a pipeline error for the HTTP response. Validation failures are
    /// the caller's fault; everything else failed the job.
    pub fn from_pipeline(job_id: &JobId, error: PipelineError) -> Self {
        if error.is_validation() {
            Self::BadRequest(error.to_string())
        } else {
            Self::job_failed(job_id, &error)
        }
    }

    fn status_code(&self) -> StatusCode {
        match self {
            ApiError::BadRequest(_) => StatusCode::BAD_REQUEST,
            ApiError::JobFailed { .. }
            | ApiError::Internal(_)
            | ApiError::Storage(_)
            | ApiError::JobStore(_)
            | ApiError::Deepgram(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl From<ModelError> for ApiError {
    fn from(err: ModelError) -> Self {
        Self::BadRequest(err.to_string())
    }
}

#[derive(Serialize)]
struct FailureResponse {
    success: bool,
    error: String,
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        match self {
            ApiError::BadRequest(message) => (status, message).into_response(),
            other => {
                let body = FailureResponse {
                    success: false,
                    error: other.to_string(),
                };
                (status, Json(body)).into_response()
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::header;

    #[test]
    fn test_bad_request_is_plain_text() {
        let response = ApiError::bad_request("jobId is required").into_response();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        let content_type = response.headers().get(header::CONTENT_TYPE).unwrap();
        assert!(content_type.to_str().unwrap().starts_with("text/plain"));
    }

    #[test]
    fn test_job_failure_message() {
        let err = ApiError::job_failed(
            &JobId::from_string("job-9"),
            &PipelineError::engine("FFmpeg exited with status 1", None),
        );
        assert_eq!(
            err.to_string(),
            "Failed to process job job-9: FFmpeg exited with status 1"
        );
        assert_eq!(err.into_response().status(), StatusCode::INTERNAL_SERVER_ERROR);
    }

    #[test]
    fn test_pipeline_validation_is_bad_request() {
        let err = ApiError::from_pipeline(
            &JobId::from_string("job-1"),
            PipelineError::validation("endTime must be greater than startTime"),
        );
        assert!(matches!(err, ApiError::BadRequest(_)));
    }
}
