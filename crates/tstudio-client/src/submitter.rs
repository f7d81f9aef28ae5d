//! Job submission: upload, create, trigger.

use std::path::Path;
use std::sync::Arc;

use chrono::Utc;
use reqwest::Client;
use tokio::task::JoinHandle;
use tracing::{error, info, warn};
use tstudio_firestore::JobStore;
use tstudio_models::{ArtifactUri, Job, JobId, JobKind, JobParams, WorkerRequest};
use tstudio_storage::{ArtifactStore, UploadProgressFn};

use crate::config::ClientConfig;
use crate::error::{ClientError, ClientResult};

/// A created job and its in-flight worker trigger.
#[derive(Debug)]
pub struct Submission {
    pub job: Job,
    /// Background task delivering the trigger. Its outcome never affects
    /// the job record.
    pub trigger: JoinHandle<()>,
}

/// Creates jobs and hands them to workers.
#[derive(Clone)]
pub struct JobSubmitter {
    store: Arc<dyn JobStore>,
    artifacts: Arc<dyn ArtifactStore>,
    http: Client,
    config: ClientConfig,
}

impl JobSubmitter {
    pub fn new(
        store: Arc<dyn JobStore>,
        artifacts: Arc<dyn ArtifactStore>,
        config: ClientConfig,
    ) -> ClientResult<Self> {
        let http = Client::builder().timeout(config.trigger_timeout).build()?;
        Ok(Self {
            store,
            artifacts,
            http,
            config,
        })
    }

    pub fn config(&self) -> &ClientConfig {
        &self.config
    }

    /// Fresh unique job id.
    pub fn generate_job_id(&self) -> JobId {
        JobId::new()
    }

    /// Upload a local file as a job input and return its canonical URI.
    ///
    /// The key is `<prefix>/<unixMillis>-<fileName>`.
    pub async fn upload_artifact(
        &self,
        path: &Path,
        on_progress: Option<UploadProgressFn>,
    ) -> ClientResult<ArtifactUri> {
        let file_name = path
            .file_name()
            .map(|n| n.to_string_lossy().to_string())
            .filter(|n| !n.is_empty())
            .ok_or_else(|| ClientError::invalid_params(format!("{} has no file name", path.display())))?;

        let key = format!(
            "{}/{}-{}",
            self.config.upload_prefix.trim_end_matches('/'),
            Utc::now().timestamp_millis(),
            file_name
        );
        let uri = self
            .artifacts
            .upload(path, &key, content_type_for(path), on_progress)
            .await?;

        info!(uri = %uri, "Input uploaded");
        Ok(uri)
    }

    /// Write the PENDING record for a new job.
    pub async fn create_job(
        &self,
        id: JobId,
        kind: JobKind,
        input_uri: &ArtifactUri,
        params: JobParams,
    ) -> ClientResult<Job> {
        check_params(kind, &params)?;
        let job = Job::new_pending(id, kind, input_uri, params);
        self.store.create(&job).await?;
        info!(job_id = %job.id, kind = kind.as_str(), "Job created");
        Ok(job)
    }

    /// Send the worker request for `job` on a background task.
    ///
    /// Transport errors and non-2xx responses are logged with the response
    /// text; the job record is left as it is.
    pub fn trigger_worker(&self, job: &Job) -> ClientResult<JoinHandle<()>> {
        let url = self
            .config
            .worker_url(job.kind)
            .ok_or_else(|| missing_worker_url(job.kind))?
            .to_string();
        let input_uri = ArtifactUri::parse(&job.input_uri)?;
        let body = WorkerRequest::for_job(&job.id, &input_uri, &job.params());

        let http = self.http.clone();
        let job_id = job.id.clone();

        Ok(tokio::spawn(async move {
            match http.post(&url).json(&body).send().await {
                Ok(response) if response.status().is_success() => {
                    info!(job_id = %job_id, "Worker finished job");
                }
                Ok(response) => {
                    let status = response.status();
                    let text = response.text().await.unwrap_or_default();
                    warn!(
                        job_id = %job_id,
                        status = status.as_u16(),
                        body = %text,
                        "Worker trigger returned an error"
                    );
                }
                Err(e) => {
                    error!(job_id = %job_id, error = %e, "Failed to trigger worker");
                }
            }
        }))
    }

    /// Upload `path`, create the job and trigger its worker.
    ///
    /// The worker URL and the parameters are checked first, so a
    /// misconfigured or invalid submission leaves no upload and no record.
    pub async fn submit(
        &self,
        kind: JobKind,
        path: &Path,
        params: JobParams,
        on_progress: Option<UploadProgressFn>,
    ) -> ClientResult<Submission> {
        if self.config.worker_url(kind).is_none() {
            return Err(missing_worker_url(kind));
        }
        check_params(kind, &params)?;

        let input_uri = self.upload_artifact(path, on_progress).await?;
        let job = self
            .create_job(self.generate_job_id(), kind, &input_uri, params)
            .await?;
        let trigger = self.trigger_worker(&job)?;

        Ok(Submission { job, trigger })
    }

    /// Read a job record.
    pub async fn get_job(&self, id: &JobId) -> ClientResult<Option<Job>> {
        Ok(self.store.get(id).await?)
    }
}

fn missing_worker_url(kind: JobKind) -> ClientError {
    ClientError::config(format!("no worker URL configured for {} jobs", kind.as_str()))
}

fn check_params(kind: JobKind, params: &JobParams) -> ClientResult<()> {
    match (kind, params) {
        (JobKind::Transcription, JobParams::None) => Ok(()),
        (JobKind::Clip, JobParams::Clip(clip)) => clip
            .check()
            .map_err(|e| ClientError::invalid_params(e.to_string())),
        (JobKind::Clip, JobParams::None) => Err(ClientError::invalid_params("clip jobs need a clip window")),
        (JobKind::Transcription, JobParams::Clip(_)) => Err(ClientError::invalid_params(
            "transcription jobs take no clip window",
        )),
    }
}

/// Content type of an upload, from its extension.
fn content_type_for(path: &Path) -> &'static str {
    let ext = path
        .extension()
        .map(|e| e.to_string_lossy().to_ascii_lowercase())
        .unwrap_or_default();
    match ext.as_str() {
        "mp4" | "m4v" => "video/mp4",
        "mov" => "video/quicktime",
        "webm" => "video/webm",
        "mkv" => "video/x-matroska",
        "avi" => "video/x-msvideo",
        "mp3" => "audio/mpeg",
        "m4a" => "audio/mp4",
        "wav" => "audio/wav",
        "ogg" => "audio/ogg",
        "flac" => "audio/flac",
        _ => "application/octet-stream",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tstudio_models::ClipParams;

    #[test]
    fn test_content_type_for() {
        assert_eq!(content_type_for(Path::new("/tmp/video.MP4")), "video/mp4");
        assert_eq!(content_type_for(Path::new("talk.wav")), "audio/wav");
        assert_eq!(content_type_for(Path::new("notes")), "application/octet-stream");
    }

    #[test]
    fn test_check_params() {
        assert!(check_params(JobKind::Transcription, &JobParams::None).is_ok());
        assert!(check_params(JobKind::Clip, &JobParams::Clip(ClipParams::new(1.0, 2.0))).is_ok());
        assert!(matches!(
            check_params(JobKind::Clip, &JobParams::None),
            Err(ClientError::InvalidParams(_))
        ));
        assert!(matches!(
            check_params(JobKind::Clip, &JobParams::Clip(ClipParams::new(5.0, 2.0))),
            Err(ClientError::InvalidParams(_))
        ));
        assert!(matches!(
            check_params(JobKind::Transcription, &JobParams::Clip(ClipParams::new(1.0, 2.0))),
            Err(ClientError::InvalidParams(_))
        ));
    }
}
