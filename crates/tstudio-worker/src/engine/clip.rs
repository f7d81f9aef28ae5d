//! FFmpeg-backed clip engine.

use std::path::Path;

use async_trait::async_trait;
use tracing::debug;
use tstudio_media::{clip_file_name, extract_clip, FfmpegRunner, MediaError};
use tstudio_models::{JobKind, JobParams};

use super::{CancelSignal, EngineAdapter, EngineFailure, EngineOutput, InputMode, ResolvedInput};

/// Cuts `[start, end)` out of a local input file with FFmpeg.
///
/// The output lands next to the input as `clip_<inputStem>.<format>`.
#[derive(Debug, Clone)]
pub struct ClipEngine {
    default_format: String,
}

impl ClipEngine {
    pub fn new(default_format: impl Into<String>) -> Self {
        Self {
            default_format: default_format.into(),
        }
    }
}

impl Default for ClipEngine {
    fn default() -> Self {
        Self::new("mp4")
    }
}

fn failure_from_media(err: MediaError) -> EngineFailure {
    match err {
        MediaError::FfmpegFailed { message, stderr, .. } => {
            EngineFailure::new(message).with_diagnostics(stderr)
        }
        other => EngineFailure::new(other.to_string()),
    }
}

#[async_trait]
impl EngineAdapter for ClipEngine {
    fn kind(&self) -> JobKind {
        JobKind::Clip
    }

    fn name(&self) -> &str {
        "ffmpeg"
    }

    fn input_mode(&self) -> InputMode {
        InputMode::LocalFile
    }

    async fn invoke(
        &self,
        input: ResolvedInput,
        params: &JobParams,
        cancel: CancelSignal,
    ) -> Result<EngineOutput, EngineFailure> {
        let ResolvedInput::LocalFile { path, output_dir } = input else {
            return Err(EngineFailure::new("clip engine needs a local input file"));
        };
        let clip = params
            .as_clip()
            .ok_or_else(|| EngineFailure::new("clip job has no clip window"))?;

        let stem = Path::new(&path)
            .file_stem()
            .map(|s| s.to_string_lossy().to_string())
            .unwrap_or_else(|| "input".to_string());
        let output = output_dir.join(clip_file_name(&stem, clip.format_or(&self.default_format)));

        let runner = FfmpegRunner::new().with_cancel(cancel);
        let total_ms = (clip.duration() * 1000.0) as i64;
        extract_clip(&path, &output, clip, &runner, move |progress| {
            debug!(
                percent = progress.percentage(total_ms),
                speed = progress.speed,
                "Clip progress"
            );
        })
        .await
        .map_err(failure_from_media)?;

        Ok(EngineOutput::Artifact(output))
    }
}
