//! Job records and the processing state machine.

use chrono::{DateTime, Utc};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

use crate::error::{ModelError, ModelResult};
use crate::transcript::Transcript;
use crate::ArtifactUri;

/// Unique identifier for a job.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize, JsonSchema)]
#[serde(transparent)]
pub struct JobId(pub String);

impl JobId {
    /// Generate a new random job ID (UUID v4).
    pub fn new() -> Self {
        Self(Uuid::new_v4().to_string())
    }

    /// Create from an existing string.
    pub fn from_string(s: impl Into<String>) -> Self {
        Self(s.into())
    }

    /// Get the inner string.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Default for JobId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for JobId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Kind of work a job asks for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "snake_case")]
pub enum JobKind {
    /// Speech-to-text over the input media
    Transcription,
    /// Cut a time window out of the input media
    Clip,
}

impl JobKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            JobKind::Transcription => "transcription",
            JobKind::Clip => "clip",
        }
    }

    /// Human-readable label used in progress descriptions.
    pub fn label(&self) -> &'static str {
        match self {
            JobKind::Transcription => "Transcription",
            JobKind::Clip => "Clip",
        }
    }
}

impl fmt::Display for JobKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for JobKind {
    type Err = ModelError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "transcription" | "transcribe" => Ok(JobKind::Transcription),
            "clip" | "clipping" => Ok(JobKind::Clip),
            other => Err(ModelError::invalid_request(format!("Unknown job kind: {}", other))),
        }
    }
}

/// Job processing status.
///
/// Statuses move along `PENDING -> PROCESSING -> {COMPLETED | FAILED}`. A new
/// worker trigger for the same job restarts it at `PROCESSING`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, JsonSchema, Default)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum JobStatus {
    /// Created by the submitter, waiting for a worker
    #[default]
    Pending,
    /// A worker has picked the job up
    Processing,
    /// Output is available
    Completed,
    /// Processing failed; `error` holds the reason
    Failed,
}

impl JobStatus {
    /// Get string representation of the status.
    pub fn as_str(&self) -> &'static str {
        match self {
            JobStatus::Pending => "PENDING",
            JobStatus::Processing => "PROCESSING",
            JobStatus::Completed => "COMPLETED",
            JobStatus::Failed => "FAILED",
        }
    }

    /// Check if this is a terminal state (no more updates expected).
    pub fn is_terminal(&self) -> bool {
        matches!(self, JobStatus::Completed | JobStatus::Failed)
    }

    /// Position along the status path. Terminal statuses share the last rank.
    pub fn rank(&self) -> u8 {
        match self {
            JobStatus::Pending => 0,
            JobStatus::Processing => 1,
            JobStatus::Completed | JobStatus::Failed => 2,
        }
    }

    /// Whether a record in `self` may be moved to `next`.
    ///
    /// `PROCESSING` is reachable from every status, since retrying a job is a
    /// new trigger for the same id. Terminal statuses are only reached from
    /// `PROCESSING`, and nothing goes back to `PENDING`.
    pub fn can_transition_to(&self, next: JobStatus) -> bool {
        match next {
            JobStatus::Pending => *self == JobStatus::Pending,
            JobStatus::Processing => true,
            JobStatus::Completed | JobStatus::Failed => *self == JobStatus::Processing,
        }
    }
}

impl fmt::Display for JobStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Clip window, in seconds from the start of the input.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema, validator::Validate)]
#[serde(rename_all = "camelCase")]
#[validate(schema(function = "crate::request::validate_clip_window"))]
pub struct ClipParams {
    #[validate(range(min = 0.0, message = "startTime must be non-negative"))]
    pub start_time: f64,
    pub end_time: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    #[validate(custom(function = "crate::request::validate_output_format"))]
    pub output_format: Option<String>,
}

impl ClipParams {
    pub fn new(start_time: f64, end_time: f64) -> Self {
        Self {
            start_time,
            end_time,
            output_format: None,
        }
    }

    pub fn with_output_format(mut self, format: impl Into<String>) -> Self {
        self.output_format = Some(format.into());
        self
    }

    /// Clip length in seconds (`end - start`).
    pub fn duration(&self) -> f64 {
        self.end_time - self.start_time
    }

    /// Output container extension, falling back to `default`.
    pub fn format_or<'a>(&'a self, default: &'a str) -> &'a str {
        self.output_format.as_deref().unwrap_or(default)
    }
}

/// Kind-specific job parameters.
#[derive(Debug, Clone, PartialEq)]
pub enum JobParams {
    /// Transcription jobs take no parameters.
    None,
    Clip(ClipParams),
}

impl JobParams {
    pub fn as_clip(&self) -> Option<&ClipParams> {
        match self {
            JobParams::Clip(params) => Some(params),
            JobParams::None => None,
        }
    }
}

/// The durable job record shared by submitter, worker and watcher.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct Job {
    /// Unique job ID
    pub id: JobId,

    /// What the job asks for
    pub kind: JobKind,

    /// Current status
    pub status: JobStatus,

    /// Source artifact, immutable after creation
    pub input_uri: String,

    /// Published artifact, set on completion of artifact-producing kinds
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub output_uri: Option<String>,

    /// Structured result, set on completion of transcription jobs
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub transcript: Option<Transcript>,

    /// Failure reason, set only when failed
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,

    /// Clip window for clip jobs
    #[serde(flatten)]
    pub clip: Option<ClipParams>,

    pub created_at: DateTime<Utc>,

    pub updated_at: DateTime<Utc>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub worker_started_at: Option<DateTime<Utc>>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub worker_completed_at: Option<DateTime<Utc>>,
}

impl Job {
    /// Create a new pending job.
    pub fn new_pending(id: JobId, kind: JobKind, input_uri: &ArtifactUri, params: JobParams) -> Self {
        let now = Utc::now();
        Self {
            id,
            kind,
            status: JobStatus::Pending,
            input_uri: input_uri.to_string(),
            output_uri: None,
            transcript: None,
            error: None,
            clip: match params {
                JobParams::Clip(clip) => Some(clip),
                JobParams::None => None,
            },
            created_at: now,
            updated_at: now,
            worker_started_at: None,
            worker_completed_at: None,
        }
    }

    /// Kind-specific parameters of this job.
    pub fn params(&self) -> JobParams {
        match &self.clip {
            Some(clip) => JobParams::Clip(clip.clone()),
            None => JobParams::None,
        }
    }

    pub fn is_terminal(&self) -> bool {
        self.status.is_terminal()
    }

    /// Whether the job carries an output (artifact URI or transcript).
    pub fn has_output(&self) -> bool {
        self.output_uri.as_deref().is_some_and(|uri| !uri.is_empty()) || self.transcript.is_some()
    }

    /// Merge a partial update into this record, bumping `updated_at`.
    ///
    /// Fails without modifying the record if the status change is not
    /// allowed by [`JobStatus::can_transition_to`].
    pub fn apply(&mut self, update: &JobUpdate, now: DateTime<Utc>) -> ModelResult<()> {
        if let Some(next) = update.status {
            if !self.status.can_transition_to(next) {
                return Err(ModelError::InvalidTransition {
                    from: self.status,
                    to: next,
                });
            }
            self.status = next;
        }
        for field in &update.cleared {
            match field {
                JobField::OutputUri => self.output_uri = None,
                JobField::Transcript => self.transcript = None,
                JobField::Error => self.error = None,
                JobField::WorkerCompletedAt => self.worker_completed_at = None,
            }
        }
        if let Some(ref uri) = update.output_uri {
            self.output_uri = Some(uri.clone());
        }
        if let Some(ref transcript) = update.transcript {
            self.transcript = Some(transcript.clone());
        }
        if let Some(ref error) = update.error {
            self.error = Some(error.clone());
        }
        if let Some(at) = update.worker_started_at {
            self.worker_started_at = Some(at);
        }
        if let Some(at) = update.worker_completed_at {
            self.worker_completed_at = Some(at);
        }
        self.updated_at = now;
        Ok(())
    }
}

/// Optional record fields an update can remove.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum JobField {
    OutputUri,
    Transcript,
    Error,
    WorkerCompletedAt,
}

impl JobField {
    /// Record (camelCase) name of the field.
    pub fn as_str(&self) -> &'static str {
        match self {
            JobField::OutputUri => "outputUri",
            JobField::Transcript => "transcript",
            JobField::Error => "error",
            JobField::WorkerCompletedAt => "workerCompletedAt",
        }
    }
}

/// Partial fields merged into a job record by the job store.
///
/// Each status change also removes the fields left over from an earlier
/// outcome, so `error` is present only on failed records and outputs only on
/// completed ones.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct JobUpdate {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<JobStatus>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub output_uri: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub transcript: Option<Transcript>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub worker_started_at: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub worker_completed_at: Option<DateTime<Utc>>,
    /// Fields removed from the record
    #[serde(skip)]
    pub cleared: Vec<JobField>,
}

impl JobUpdate {
    /// A worker picked the job up. Results of any earlier run are removed.
    pub fn processing(now: DateTime<Utc>) -> Self {
        Self {
            status: Some(JobStatus::Processing),
            worker_started_at: Some(now),
            cleared: vec![
                JobField::OutputUri,
                JobField::Transcript,
                JobField::Error,
                JobField::WorkerCompletedAt,
            ],
            ..Default::default()
        }
    }

    /// The job produced a published artifact.
    pub fn completed_artifact(output_uri: impl Into<String>, now: DateTime<Utc>) -> Self {
        Self {
            status: Some(JobStatus::Completed),
            output_uri: Some(output_uri.into()),
            worker_completed_at: Some(now),
            cleared: vec![JobField::Transcript, JobField::Error],
            ..Default::default()
        }
    }

    /// The job produced a transcript.
    pub fn completed_transcript(transcript: Transcript, now: DateTime<Utc>) -> Self {
        Self {
            status: Some(JobStatus::Completed),
            transcript: Some(transcript),
            worker_completed_at: Some(now),
            cleared: vec![JobField::OutputUri, JobField::Error],
            ..Default::default()
        }
    }

    /// The job failed with `message`.
    pub fn failed(message: impl Into<String>, now: DateTime<Utc>) -> Self {
        Self {
            status: Some(JobStatus::Failed),
            error: Some(message.into()),
            worker_completed_at: Some(now),
            cleared: vec![JobField::OutputUri, JobField::Transcript],
            ..Default::default()
        }
    }

    fn clears(&self, field: JobField) -> bool {
        self.cleared.contains(&field)
    }

    /// Record field names written or removed by this update, in record
    /// (camelCase) form. `updatedAt` is always included.
    pub fn field_paths(&self) -> Vec<&'static str> {
        let mut paths = Vec::new();
        if self.status.is_some() {
            paths.push("status");
        }
        if self.output_uri.is_some() || self.clears(JobField::OutputUri) {
            paths.push("outputUri");
        }
        if self.transcript.is_some() || self.clears(JobField::Transcript) {
            paths.push("transcript");
        }
        if self.error.is_some() || self.clears(JobField::Error) {
            paths.push("error");
        }
        if self.worker_started_at.is_some() {
            paths.push("workerStartedAt");
        }
        if self.worker_completed_at.is_some() || self.clears(JobField::WorkerCompletedAt) {
            paths.push("workerCompletedAt");
        }
        paths.push("updatedAt");
        paths
    }
}

/// JSON schema of the persisted job record.
pub fn job_record_schema() -> schemars::schema::RootSchema {
    schemars::schema_for!(Job)
}
