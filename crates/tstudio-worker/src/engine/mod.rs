//! Engine adapters.
//!
//! An engine adapter wraps one external capability (transcoding, speech to
//! text) behind a single call. The pipeline runs that call under a
//! wall-clock budget with [`invoke_with_budget`].

mod clip;
mod transcription;

pub use clip::ClipEngine;
pub use transcription::TranscriptionEngine;

use std::path::PathBuf;
use std::time::{Duration, Instant};

use async_trait::async_trait;
use thiserror::Error;
use tokio::sync::watch;
use tracing::warn;
use tstudio_models::{JobKind, JobParams, Transcript};

use crate::error::{PipelineError, PipelineResult};
use crate::metrics;

/// Raised (`true`) when the caller gives up on an engine call.
pub type CancelSignal = watch::Receiver<bool>;

/// Resolve once `cancel` is raised. Never resolves if the sender is gone
/// without raising it.
pub(crate) async fn cancelled(cancel: &mut CancelSignal) {
    if cancel.wait_for(|raised| *raised).await.is_err() {
        std::future::pending::<()>().await;
    }
}

/// How an engine wants to receive its input.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InputMode {
    /// Downloaded into the invocation's scratch directory
    LocalFile,
    /// A time-limited pre-authorized fetch URL
    SignedUrl,
}

/// Input handed to an engine after resolution.
#[derive(Debug, Clone)]
pub enum ResolvedInput {
    LocalFile {
        path: PathBuf,
        /// Where the engine writes its outputs
        output_dir: PathBuf,
    },
    SignedUrl(String),
}

/// What an engine produced.
#[derive(Debug, Clone)]
pub enum EngineOutput {
    /// A file in the scratch directory, to be published
    Artifact(PathBuf),
    /// A structured result stored on the job record itself
    Transcript(Transcript),
}

/// Failure reported by an engine, with optional diagnostic text such as
/// captured stderr or an API response body.
#[derive(Debug, Clone, Error)]
#[error("{message}")]
pub struct EngineFailure {
    pub message: String,
    pub diagnostics: Option<String>,
}

impl EngineFailure {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            diagnostics: None,
        }
    }

    pub fn with_diagnostics(mut self, diagnostics: Option<String>) -> Self {
        self.diagnostics = diagnostics;
        self
    }
}

impl From<EngineFailure> for PipelineError {
    fn from(failure: EngineFailure) -> Self {
        PipelineError::engine(failure.message, failure.diagnostics)
    }
}

#[async_trait]
pub trait EngineAdapter: Send + Sync {
    /// Job kind this engine serves.
    fn kind(&self) -> JobKind;

    fn name(&self) -> &str;

    fn input_mode(&self) -> InputMode;

    /// Run the engine once. Implementations stop work when `cancel` is
    /// raised or the returned future is dropped.
    async fn invoke(
        &self,
        input: ResolvedInput,
        params: &JobParams,
        cancel: CancelSignal,
    ) -> Result<EngineOutput, EngineFailure>;
}

/// Invoke `engine` with a hard wall-clock `budget`.
///
/// Exactly one of output, engine failure or timeout is returned. On expiry
/// the cancel signal is raised and the in-flight call is dropped.
pub async fn invoke_with_budget(
    engine: &dyn EngineAdapter,
    input: ResolvedInput,
    params: &JobParams,
    budget: Duration,
) -> PipelineResult<EngineOutput> {
    let (cancel_tx, cancel_rx) = watch::channel(false);
    let started = Instant::now();

    let mut call = engine.invoke(input, params, cancel_rx);

    let result = tokio::select! {
        result = &mut call => Some(result),
        _ = tokio::time::sleep(budget) => None,
    };

    metrics::record_engine_duration(engine.kind(), started.elapsed().as_secs_f64());

    match result {
        Some(result) => result.map_err(PipelineError::from),
        None => {
            let _ = cancel_tx.send(true);
            drop(call);
            metrics::record_engine_timeout(engine.kind());
            warn!(
                engine = engine.name(),
                budget_secs = budget.as_secs_f64(),
                "Engine call exceeded its budget, abandoned"
            );
            Err(PipelineError::Timeout { budget })
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicBool, Ordering};
    use std::sync::Arc;

    struct SleepyEngine {
        sleep: Duration,
        saw_cancel: Arc<AtomicBool>,
    }

    #[async_trait]
    impl EngineAdapter for SleepyEngine {
        fn kind(&self) -> JobKind {
            JobKind::Transcription
        }

        fn name(&self) -> &str {
            "sleepy"
        }

        fn input_mode(&self) -> InputMode {
            InputMode::SignedUrl
        }

        async fn invoke(
            &self,
            _input: ResolvedInput,
            _params: &JobParams,
            mut cancel: CancelSignal,
        ) -> Result<EngineOutput, EngineFailure> {
            let saw_cancel = Arc::clone(&self.saw_cancel);
            tokio::select! {
                _ = tokio::time::sleep(self.sleep) => Ok(EngineOutput::Transcript(Transcript::default())),
                _ = cancel.changed() => {
                    saw_cancel.store(true, Ordering::SeqCst);
                    Err(EngineFailure::new("cancelled"))
                }
            }
        }
    }

    struct FailingEngine;

    #[async_trait]
    impl EngineAdapter for FailingEngine {
        fn kind(&self) -> JobKind {
            JobKind::Clip
        }

        fn name(&self) -> &str {
            "failing"
        }

        fn input_mode(&self) -> InputMode {
            InputMode::LocalFile
        }

        async fn invoke(
            &self,
            _input: ResolvedInput,
            _params: &JobParams,
            _cancel: CancelSignal,
        ) -> Result<EngineOutput, EngineFailure> {
            Err(EngineFailure::new("exit 1").with_diagnostics(Some("bad input".into())))
        }
    }

    fn url() -> ResolvedInput {
        ResolvedInput::SignedUrl("https://signed.example/v.mp4".into())
    }

    #[tokio::test]
    async fn test_fast_engine_wins() {
        let engine = SleepyEngine {
            sleep: Duration::from_millis(10),
            saw_cancel: Arc::new(AtomicBool::new(false)),
        };
        let output = invoke_with_budget(&engine, url(), &JobParams::None, Duration::from_secs(2))
            .await
            .unwrap();
        assert!(matches!(output, EngineOutput::Transcript(_)));
    }

    #[tokio::test]
    async fn test_budget_expiry_is_timeout() {
        let engine = SleepyEngine {
            sleep: Duration::from_secs(5),
            saw_cancel: Arc::new(AtomicBool::new(false)),
        };
        let started = Instant::now();
        let err = invoke_with_budget(&engine, url(), &JobParams::None, Duration::from_millis(200))
            .await
            .unwrap_err();

        assert!(matches!(err, PipelineError::Timeout { .. }));
        assert!(started.elapsed() < Duration::from_secs(1));
        // The abandoned call never got to report anything.
        assert!(!engine.saw_cancel.load(Ordering::SeqCst));
    }

    #[tokio::test]
    async fn test_engine_failure_keeps_diagnostics() {
        let input = ResolvedInput::LocalFile {
            path: PathBuf::from("/tmp/in.mp4"),
            output_dir: PathBuf::from("/tmp"),
        };
        let err = invoke_with_budget(&FailingEngine, input, &JobParams::None, Duration::from_secs(1))
            .await
            .unwrap_err();
        match err {
            PipelineError::Engine { message, diagnostics } => {
                assert_eq!(message, "exit 1");
                assert_eq!(diagnostics.as_deref(), Some("bad input"));
            }
            other => panic!("unexpected error: {other}"),
        }
    }
}
