//! FFmpeg CLI wrapper for clip extraction.
//!
//! This crate provides:
//! - Type-safe FFmpeg command building
//! - Progress parsing from `-progress pipe:2`
//! - Bounded stderr capture for failure diagnostics
//! - Cancellation support via tokio watch channels (the child is killed)
//! - Clip extraction with explicit seek + duration arguments

pub mod clip;
pub mod command;
pub mod error;
pub mod progress;

pub use clip::{clip_command, clip_file_name, extract_clip, video_content_type};
pub use command::{check_ffmpeg, FfmpegCommand, FfmpegRunner};
pub use error::{MediaError, MediaResult};
pub use progress::FfmpegProgress;
