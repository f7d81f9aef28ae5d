//! Worker configuration.

use std::path::PathBuf;
use std::time::Duration;

use tstudio_models::JobKind;

/// Worker configuration.
#[derive(Debug, Clone)]
pub struct WorkerConfig {
    /// Root for per-invocation scratch directories
    pub work_dir: PathBuf,
    /// Wall-clock budget for a clip engine call
    pub clip_budget: Duration,
    /// Wall-clock budget for a transcription engine call
    pub transcription_budget: Duration,
    /// Validity window of signed input URLs
    pub signed_url_ttl: Duration,
    /// Container extension used when a clip request names none
    pub default_output_format: String,
    /// Job kinds this deployment serves
    pub kinds: Vec<JobKind>,
}

impl Default for WorkerConfig {
    fn default() -> Self {
        Self {
            work_dir: std::env::temp_dir(),
            clip_budget: Duration::from_secs(450),
            transcription_budget: Duration::from_secs(300),
            signed_url_ttl: Duration::from_secs(15 * 60),
            default_output_format: "mp4".to_string(),
            kinds: vec![JobKind::Transcription, JobKind::Clip],
        }
    }
}

impl WorkerConfig {
    /// Create config from environment variables.
    pub fn from_env() -> Self {
        let defaults = Self::default();
        Self {
            work_dir: std::env::var("WORKER_WORK_DIR")
                .ok()
                .filter(|s| !s.is_empty())
                .map(PathBuf::from)
                .unwrap_or(defaults.work_dir),
            clip_budget: Duration::from_secs(
                std::env::var("CLIP_ENGINE_BUDGET_SECS")
                    .ok()
                    .and_then(|s| s.parse().ok())
                    .unwrap_or(450),
            ),
            transcription_budget: Duration::from_secs(
                std::env::var("TRANSCRIPTION_ENGINE_BUDGET_SECS")
                    .ok()
                    .and_then(|s| s.parse().ok())
                    .unwrap_or(300),
            ),
            signed_url_ttl: Duration::from_secs(
                std::env::var("SIGNED_URL_TTL_SECS")
                    .ok()
                    .and_then(|s| s.parse().ok())
                    .unwrap_or(900),
            ),
            default_output_format: std::env::var("DEFAULT_OUTPUT_FORMAT")
                .ok()
                .filter(|s| !s.is_empty())
                .unwrap_or(defaults.default_output_format),
            kinds: std::env::var("WORKER_KINDS")
                .ok()
                .map(|s| parse_kinds(&s))
                .filter(|kinds| !kinds.is_empty())
                .unwrap_or(defaults.kinds),
        }
    }

    /// Engine budget for `kind`.
    pub fn budget_for(&self, kind: JobKind) -> Duration {
        match kind {
            JobKind::Clip => self.clip_budget,
            JobKind::Transcription => self.transcription_budget,
        }
    }

    pub fn serves(&self, kind: JobKind) -> bool {
        self.kinds.contains(&kind)
    }
}

/// Parse a comma separated kind list, skipping unknown entries.
fn parse_kinds(value: &str) -> Vec<JobKind> {
    let mut kinds = Vec::new();
    for kind in value.split(',').filter_map(|s| s.trim().parse::<JobKind>().ok()) {
        if !kinds.contains(&kind) {
            kinds.push(kind);
        }
    }
    kinds
}
