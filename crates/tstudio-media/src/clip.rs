//! Clip extraction.
//!
//! A clip is described by a start offset and an end offset in seconds. The
//! FFmpeg invocation always receives `-ss <start> -t <end - start>` after the
//! input, never an absolute `-to` end timestamp.

use std::path::Path;
use tracing::info;

use tstudio_models::ClipParams;

use crate::command::{FfmpegCommand, FfmpegRunner};
use crate::error::{MediaError, MediaResult};
use crate::progress::FfmpegProgress;

/// Output file name for a clip of `input_stem`, e.g. `clip_video.mp4`.
pub fn clip_file_name(input_stem: &str, format: &str) -> String {
    format!("clip_{}.{}", input_stem, format)
}

/// MIME type for a clip container extension.
pub fn video_content_type(format: &str) -> String {
    format!("video/{}", format.to_ascii_lowercase())
}

/// Build the FFmpeg command for a clip window.
pub fn clip_command(input: &Path, output: &Path, params: &ClipParams) -> MediaResult<FfmpegCommand> {
    if params.start_time.is_nan() || params.start_time < 0.0 {
        return Err(MediaError::InvalidClipWindow(format!(
            "start {} must be non-negative",
            params.start_time
        )));
    }
    if params.start_time >= params.end_time {
        return Err(MediaError::InvalidClipWindow(format!(
            "start {} must be before end {}",
            params.start_time, params.end_time
        )));
    }

    Ok(FfmpegCommand::new(input, output)
        .output_seek(params.start_time)
        .duration(params.duration()))
}

/// Cut `params`' window out of `input` into `output`.
pub async fn extract_clip<F>(
    input: &Path,
    output: &Path,
    params: &ClipParams,
    runner: &FfmpegRunner,
    on_progress: F,
) -> MediaResult<()>
where
    F: Fn(FfmpegProgress) + Send + 'static,
{
    let cmd = clip_command(input, output, params)?;

    if !tokio::fs::try_exists(input).await.unwrap_or(false) {
        return Err(MediaError::FileNotFound(input.to_path_buf()));
    }

    info!(
        "Extracting clip: {} -> {} (start: {:.2}s, duration: {:.2}s)",
        input.display(),
        output.display(),
        params.start_time,
        params.duration()
    );

    runner.run_with_progress(&cmd, on_progress).await?;

    info!("Clip extracted: {}", output.display());
    Ok(())
}
