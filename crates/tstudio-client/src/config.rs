//! Client configuration.

use std::time::Duration;

use tstudio_models::JobKind;

/// Where to upload inputs and how to reach the workers.
#[derive(Debug, Clone)]
pub struct ClientConfig {
    /// Endpoint of the transcription worker (`POST /transcribe`)
    pub transcription_worker_url: Option<String>,
    /// Endpoint of the clip worker (`POST /clip`)
    pub clip_worker_url: Option<String>,
    /// Key prefix for uploaded inputs
    pub upload_prefix: String,
    /// HTTP timeout of a worker trigger. A worker holds the request open
    /// for the whole job, so this bounds how long the trigger task lives.
    pub trigger_timeout: Duration,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            transcription_worker_url: None,
            clip_worker_url: None,
            upload_prefix: "videos".to_string(),
            trigger_timeout: Duration::from_secs(540),
        }
    }
}

impl ClientConfig {
    /// Create config from environment variables.
    pub fn from_env() -> Self {
        let defaults = Self::default();
        Self {
            transcription_worker_url: non_empty_var("TRANSCRIPTION_WORKER_URL"),
            clip_worker_url: non_empty_var("CLIP_WORKER_URL"),
            upload_prefix: non_empty_var("UPLOAD_PREFIX").unwrap_or(defaults.upload_prefix),
            trigger_timeout: std::env::var("WORKER_TRIGGER_TIMEOUT_SECS")
                .ok()
                .and_then(|s| s.parse().ok())
                .map(Duration::from_secs)
                .unwrap_or(defaults.trigger_timeout),
        }
    }

    pub fn with_worker_url(mut self, kind: JobKind, url: impl Into<String>) -> Self {
        match kind {
            JobKind::Transcription => self.transcription_worker_url = Some(url.into()),
            JobKind::Clip => self.clip_worker_url = Some(url.into()),
        }
        self
    }

    /// Trigger endpoint for `kind`, if configured.
    pub fn worker_url(&self, kind: JobKind) -> Option<&str> {
        match kind {
            JobKind::Transcription => self.transcription_worker_url.as_deref(),
            JobKind::Clip => self.clip_worker_url.as_deref(),
        }
    }
}

fn non_empty_var(key: &str) -> Option<String> {
    std::env::var(key)
        .ok()
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}
