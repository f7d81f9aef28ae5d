//! User-facing progress of a job.

use tstudio_models::{Job, JobId, JobKind, JobStatus, Transcript};

/// One observed status change of a watched job.
#[derive(Debug, Clone, PartialEq)]
pub struct ProgressUpdate {
    pub job_id: JobId,
    pub kind: JobKind,
    pub status: JobStatus,
    /// Text suitable for showing to a user
    pub description: String,
    pub error: Option<String>,
    pub output_uri: Option<String>,
    pub transcript: Option<Transcript>,
}

impl ProgressUpdate {
    pub fn from_job(job: &Job) -> Self {
        Self {
            job_id: job.id.clone(),
            kind: job.kind,
            status: job.status,
            description: describe(job.kind, job.status, job.error.as_deref()),
            error: job.error.clone(),
            output_uri: job.output_uri.clone(),
            transcript: job.transcript.clone(),
        }
    }

    pub fn is_terminal(&self) -> bool {
        self.status.is_terminal()
    }
}

/// Description of `status` for a job of `kind`.
pub fn describe(kind: JobKind, status: JobStatus, error: Option<&str>) -> String {
    match status {
        JobStatus::Pending => format!("{} job is pending...", kind.label()),
        JobStatus::Processing => match kind {
            JobKind::Transcription => "AI is processing the video...".to_string(),
            JobKind::Clip => "Creating your clip...".to_string(),
        },
        JobStatus::Completed => "Processing complete!".to_string(),
        JobStatus::Failed => match error.filter(|e| !e.trim().is_empty()) {
            Some(error) => error.to_string(),
            None => match kind {
                JobKind::Transcription => "The AI failed to transcribe the video.".to_string(),
                JobKind::Clip => "The clip could not be created.".to_string(),
            },
        },
    }
}
