//! Job pipeline for transcription and clip workers.
//!
//! This crate provides:
//! - The engine adapter contract with FFmpeg clip and Deepgram transcription engines
//! - Engine calls under a hard wall-clock budget with cancellation
//! - The per-job pipeline: mark processing, resolve input, invoke, validate, publish, terminal write
//! - Per-invocation scratch directories that are always reclaimed
//! - Structured job logging and pipeline metrics

pub mod config;
pub mod engine;
pub mod error;
pub mod logging;
pub mod metrics;
pub mod pipeline;
pub mod scratch;

pub use config::WorkerConfig;
pub use engine::{
    invoke_with_budget, CancelSignal, ClipEngine, EngineAdapter, EngineFailure, EngineOutput,
    InputMode, ResolvedInput, TranscriptionEngine,
};
pub use error::{ErrorKind, PipelineError, PipelineResult};
pub use logging::JobLogger;
pub use pipeline::{JobOutcome, JobOutput, JobPipeline};
pub use scratch::ScratchDir;
