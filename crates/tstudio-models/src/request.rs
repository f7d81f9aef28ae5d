//! Worker request bodies and their validation.

use serde::{Deserialize, Serialize};
use validator::{Validate, ValidationError, ValidationErrors, ValidationErrorsKind};

use crate::error::{ModelError, ModelResult};
use crate::job::{ClipParams, JobId, JobKind, JobParams};
use crate::ArtifactUri;

/// Longest accepted job id. Ids become path segments and document names.
const MAX_JOB_ID_LEN: usize = 128;

/// Body of `POST /transcribe`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct TranscriptionRequest {
    #[serde(default)]
    #[validate(custom(function = "validate_job_id"))]
    pub job_id: String,
    #[serde(default, alias = "gcsUri")]
    #[validate(custom(function = "validate_input_uri"))]
    pub input_uri: String,
}

/// Body of `POST /clip`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct ClipRequest {
    #[serde(default)]
    #[validate(custom(function = "validate_job_id"))]
    pub job_id: String,
    #[serde(default, alias = "gcsUri")]
    #[validate(custom(function = "validate_input_uri"))]
    pub input_uri: String,
    #[serde(flatten)]
    #[validate(nested)]
    pub params: ClipParams,
}

/// A validated request for one worker invocation.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum WorkerRequest {
    Transcription(TranscriptionRequest),
    Clip(ClipRequest),
}

impl WorkerRequest {
    /// Build the trigger payload for a job.
    pub fn for_job(id: &JobId, input_uri: &ArtifactUri, params: &JobParams) -> Self {
        match params {
            JobParams::None => Self::Transcription(TranscriptionRequest {
                job_id: id.to_string(),
                input_uri: input_uri.to_string(),
            }),
            JobParams::Clip(params) => Self::Clip(ClipRequest {
                job_id: id.to_string(),
                input_uri: input_uri.to_string(),
                params: params.clone(),
            }),
        }
    }

    /// Parse and validate a raw request body for a worker of `kind`.
    pub fn parse(kind: JobKind, body: &[u8]) -> ModelResult<Self> {
        let request = match kind {
            JobKind::Transcription => Self::Transcription(parse_body(body)?),
            JobKind::Clip => Self::Clip(parse_body(body)?),
        };
        request.validate()?;
        Ok(request)
    }

    /// Check required fields and kind-specific constraints.
    pub fn validate(&self) -> ModelResult<()> {
        let result = match self {
            WorkerRequest::Transcription(req) => req.validate(),
            WorkerRequest::Clip(req) => req.validate(),
        };
        result.map_err(|errors| ModelError::invalid_request(describe(&errors)))
    }

    pub fn kind(&self) -> JobKind {
        match self {
            WorkerRequest::Transcription(_) => JobKind::Transcription,
            WorkerRequest::Clip(_) => JobKind::Clip,
        }
    }

    pub fn job_id(&self) -> JobId {
        match self {
            WorkerRequest::Transcription(req) => JobId::from_string(req.job_id.clone()),
            WorkerRequest::Clip(req) => JobId::from_string(req.job_id.clone()),
        }
    }

    pub fn input_uri(&self) -> &str {
        match self {
            WorkerRequest::Transcription(req) => &req.input_uri,
            WorkerRequest::Clip(req) => &req.input_uri,
        }
    }

    pub fn params(&self) -> JobParams {
        match self {
            WorkerRequest::Transcription(_) => JobParams::None,
            WorkerRequest::Clip(req) => JobParams::Clip(req.params.clone()),
        }
    }
}

impl ClipParams {
    /// Validate a clip window on its own, before any request exists.
    pub fn check(&self) -> ModelResult<()> {
        Validate::validate(self).map_err(|errors| ModelError::invalid_request(describe(&errors)))
    }
}

fn parse_body<T: serde::de::DeserializeOwned>(body: &[u8]) -> ModelResult<T> {
    serde_json::from_slice(body)
        .map_err(|e| ModelError::invalid_request(format!("Invalid request body: {}", e)))
}

/// Flatten validation errors into a single sorted, human-readable line.
fn describe(errors: &ValidationErrors) -> String {
    let mut messages = Vec::new();
    collect_messages(errors, &mut messages);
    messages.sort();
    messages.dedup();
    if messages.is_empty() {
        "Invalid request".to_string()
    } else {
        messages.join("; ")
    }
}

fn collect_messages(errors: &ValidationErrors, out: &mut Vec<String>) {
    for (field, kind) in errors.errors() {
        match kind {
            ValidationErrorsKind::Field(list) => {
                for error in list {
                    out.push(match &error.message {
                        Some(message) => message.to_string(),
                        None => format!("{} is invalid ({})", field, error.code),
                    });
                }
            }
            ValidationErrorsKind::Struct(nested) => collect_messages(nested, out),
            ValidationErrorsKind::List(items) => {
                for nested in items.values() {
                    collect_messages(nested, out);
                }
            }
        }
    }
}

fn error_with_message(code: &'static str, message: &'static str) -> ValidationError {
    let mut error = ValidationError::new(code);
    error.message = Some(message.into());
    error
}

fn validate_job_id(job_id: &str) -> Result<(), ValidationError> {
    if job_id.trim().is_empty() {
        return Err(error_with_message("required", "jobId is required"));
    }
    if job_id.len() > MAX_JOB_ID_LEN || job_id.contains('/') || job_id.chars().any(char::is_control) {
        return Err(error_with_message("job_id", "jobId contains invalid characters"));
    }
    Ok(())
}

fn validate_input_uri(input_uri: &str) -> Result<(), ValidationError> {
    if input_uri.trim().is_empty() {
        return Err(error_with_message("required", "inputUri is required"));
    }
    ArtifactUri::parse(input_uri)
        .map(|_| ())
        .map_err(|_| error_with_message("artifact_uri", "inputUri must look like scheme://container/path"))
}

pub(crate) fn validate_clip_window(params: &ClipParams) -> Result<(), ValidationError> {
    if params.start_time >= params.end_time {
        return Err(error_with_message("clip_window", "startTime must be less than endTime"));
    }
    Ok(())
}

pub(crate) fn validate_output_format(format: &str) -> Result<(), ValidationError> {
    let valid = !format.is_empty()
        && format.len() <= 8
        && format.chars().all(|c| c.is_ascii_alphanumeric());
    if valid {
        Ok(())
    } else {
        Err(error_with_message(
            "output_format",
            "outputFormat must be a short alphanumeric extension",
        ))
    }
}
