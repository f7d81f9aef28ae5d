//! End-to-end pipeline scenarios against in-memory stores and stub engines.

use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

use async_trait::async_trait;
use tempfile::TempDir;
use tstudio_firestore::{JobStore, MemoryJobStore};
use tstudio_models::{
    ArtifactUri, ClipParams, ClipRequest, Job, JobId, JobKind, JobParams, JobStatus, Transcript,
    Word, WorkerRequest,
};
use tstudio_storage::MemoryArtifactStore;
use tstudio_worker::{
    CancelSignal, EngineAdapter, EngineFailure, EngineOutput, InputMode, JobOutput, JobPipeline,
    PipelineError, ResolvedInput, WorkerConfig,
};

const INPUT: &str = "store://bucket1/video.mp4";

/// Clip stub: optionally sleeps, then writes `bytes` as the clip.
struct StubClipEngine {
    bytes: Vec<u8>,
    sleep: Duration,
    seen_input: Mutex<Option<PathBuf>>,
    store_to_break: Option<MemoryJobStore>,
}

impl StubClipEngine {
    fn producing(bytes: &[u8]) -> Self {
        Self {
            bytes: bytes.to_vec(),
            sleep: Duration::ZERO,
            seen_input: Mutex::new(None),
            store_to_break: None,
        }
    }

    fn sleeping(sleep: Duration) -> Self {
        Self {
            sleep,
            ..Self::producing(b"late")
        }
    }
}

#[async_trait]
impl EngineAdapter for StubClipEngine {
    fn kind(&self) -> JobKind {
        JobKind::Clip
    }

    fn name(&self) -> &str {
        "stub-clip"
    }

    fn input_mode(&self) -> InputMode {
        InputMode::LocalFile
    }

    async fn invoke(
        &self,
        input: ResolvedInput,
        params: &JobParams,
        _cancel: CancelSignal,
    ) -> Result<EngineOutput, EngineFailure> {
        let ResolvedInput::LocalFile { path, output_dir } = input else {
            return Err(EngineFailure::new("expected a local file"));
        };
        assert!(params.as_clip().is_some());
        *self.seen_input.lock().unwrap() = Some(path.clone());

        if !self.sleep.is_zero() {
            tokio::time::sleep(self.sleep).await;
        }
        if let Some(store) = &self.store_to_break {
            store.set_available(false);
        }

        let stem = path.file_stem().unwrap().to_string_lossy().to_string();
        let output = output_dir.join(format!("clip_{}.mp4", stem));
        tokio::fs::write(&output, &self.bytes).await.unwrap();
        Ok(EngineOutput::Artifact(output))
    }
}

/// Transcription stub returning a fixed transcript or failure.
struct StubTranscriptionEngine {
    result: Result<Transcript, EngineFailure>,
}

#[async_trait]
impl EngineAdapter for StubTranscriptionEngine {
    fn kind(&self) -> JobKind {
        JobKind::Transcription
    }

    fn name(&self) -> &str {
        "stub-transcription"
    }

    fn input_mode(&self) -> InputMode {
        InputMode::SignedUrl
    }

    async fn invoke(
        &self,
        input: ResolvedInput,
        _params: &JobParams,
        _cancel: CancelSignal,
    ) -> Result<EngineOutput, EngineFailure> {
        assert!(matches!(input, ResolvedInput::SignedUrl(_)));
        self.result.clone().map(EngineOutput::Transcript)
    }
}

struct Harness {
    pipeline: JobPipeline,
    store: MemoryJobStore,
    artifacts: Arc<MemoryArtifactStore>,
    work_dir: TempDir,
}

fn harness(engine: Arc<dyn EngineAdapter>, store: MemoryJobStore) -> Harness {
    let work_dir = tempfile::tempdir().unwrap();
    let artifacts = Arc::new(MemoryArtifactStore::new("store", "defaultBucket"));
    artifacts.put(&ArtifactUri::parse(INPUT).unwrap(), b"source video".to_vec(), "video/mp4");

    let config = WorkerConfig {
        work_dir: work_dir.path().to_path_buf(),
        clip_budget: Duration::from_secs(2),
        transcription_budget: Duration::from_secs(2),
        ..WorkerConfig::default()
    };

    let pipeline = JobPipeline::new(Arc::new(store.clone()), artifacts.clone(), engine, config);
    Harness {
        pipeline,
        store,
        artifacts,
        work_dir,
    }
}

async fn create_job(store: &MemoryJobStore, kind: JobKind, params: JobParams) -> Job {
    let job = Job::new_pending(JobId::new(), kind, &ArtifactUri::parse(INPUT).unwrap(), params);
    store.create(&job).await.unwrap();
    job
}

fn request_for(job: &Job) -> WorkerRequest {
    WorkerRequest::for_job(&job.id, &ArtifactUri::parse(&job.input_uri).unwrap(), &job.params())
}

fn is_empty_dir(path: &Path) -> bool {
    std::fs::read_dir(path).unwrap().next().is_none()
}

#[tokio::test]
async fn test_clip_job_publishes_to_default_container() {
    let store = MemoryJobStore::new();
    let h = harness(Arc::new(StubClipEngine::producing(b"clip bytes")), store.clone());
    let job = create_job(&store, JobKind::Clip, JobParams::Clip(ClipParams::new(10.0, 20.0))).await;
    let mut sub = store.subscribe(&job.id).await.unwrap();

    let outcome = h.pipeline.run(request_for(&job)).await.unwrap();

    let expected = format!("store://defaultBucket/clips/{}/clip_video.mp4", job.id);
    assert_eq!(
        outcome.output,
        JobOutput::Artifact(ArtifactUri::parse(&expected).unwrap())
    );

    let record = store.get(&job.id).await.unwrap().unwrap();
    assert_eq!(record.status, JobStatus::Completed);
    assert_eq!(record.output_uri.as_deref(), Some(expected.as_str()));
    assert!(record.error.is_none());
    assert!(record.worker_started_at.is_some());
    assert!(record.worker_completed_at.is_some());
    assert_eq!(record.clip, Some(ClipParams::new(10.0, 20.0)));

    let published = ArtifactUri::parse(&expected).unwrap();
    assert_eq!(h.artifacts.get(&published).unwrap(), b"clip bytes");
    assert_eq!(h.artifacts.content_type(&published).as_deref(), Some("video/mp4"));

    let mut statuses = Vec::new();
    for _ in 0..3 {
        statuses.push(sub.next().await.unwrap().status);
    }
    assert_eq!(
        statuses,
        vec![JobStatus::Pending, JobStatus::Processing, JobStatus::Completed]
    );
    sub.unsubscribe();

    assert!(is_empty_dir(h.work_dir.path()));
}

#[tokio::test]
async fn test_slow_engine_times_out_within_budget() {
    let store = MemoryJobStore::new();
    let h = harness(Arc::new(StubClipEngine::sleeping(Duration::from_secs(5))), store.clone());
    let job = create_job(&store, JobKind::Clip, JobParams::Clip(ClipParams::new(0.0, 5.0))).await;

    let started = Instant::now();
    let err = h.pipeline.run(request_for(&job)).await.unwrap_err();

    assert!(matches!(err, PipelineError::Timeout { .. }));
    assert!(started.elapsed() < Duration::from_secs(3));

    let record = store.get(&job.id).await.unwrap().unwrap();
    assert_eq!(record.status, JobStatus::Failed);
    assert!(record.error.unwrap().contains("budget"));
    assert!(record.output_uri.is_none());
    assert!(is_empty_dir(h.work_dir.path()));
}

#[tokio::test]
async fn test_zero_byte_output_fails_the_job() {
    let store = MemoryJobStore::new();
    let h = harness(Arc::new(StubClipEngine::producing(b"")), store.clone());
    let job = create_job(&store, JobKind::Clip, JobParams::Clip(ClipParams::new(1.0, 2.0))).await;

    let err = h.pipeline.run(request_for(&job)).await.unwrap_err();
    assert!(matches!(err, PipelineError::Engine { .. }));

    let record = store.get(&job.id).await.unwrap().unwrap();
    assert_eq!(record.status, JobStatus::Failed);
    assert!(record.error.unwrap().contains("empty output"));
    assert!(is_empty_dir(h.work_dir.path()));
}

#[tokio::test]
async fn test_scratch_directory_is_gone_after_the_run() {
    let store = MemoryJobStore::new();
    let engine = Arc::new(StubClipEngine::producing(b"clip"));
    let h = harness(engine.clone(), store.clone());
    let job = create_job(&store, JobKind::Clip, JobParams::Clip(ClipParams::new(1.0, 2.0))).await;

    h.pipeline.run(request_for(&job)).await.unwrap();

    let input = engine.seen_input.lock().unwrap().clone().unwrap();
    let scratch = input.parent().unwrap().to_path_buf();
    assert!(scratch
        .file_name()
        .unwrap()
        .to_string_lossy()
        .starts_with(&format!("clip_{}_", job.id)));
    assert!(!scratch.exists());
}

#[tokio::test]
async fn test_invalid_clip_windows_touch_nothing() {
    let store = MemoryJobStore::new();
    let h = harness(Arc::new(StubClipEngine::producing(b"clip")), store.clone());
    let job = create_job(&store, JobKind::Clip, JobParams::Clip(ClipParams::new(1.0, 2.0))).await;

    for (start, end) in [(10.0, 5.0), (-1.0, 5.0)] {
        let request = WorkerRequest::Clip(ClipRequest {
            job_id: job.id.to_string(),
            input_uri: INPUT.to_string(),
            params: ClipParams::new(start, end),
        });
        let err = h.pipeline.run(request).await.unwrap_err();
        assert!(err.is_validation(), "{start}..{end} should be rejected");
    }

    let unknown = WorkerRequest::Clip(ClipRequest {
        job_id: "never-created".to_string(),
        input_uri: INPUT.to_string(),
        params: ClipParams::new(10.0, 5.0),
    });
    assert!(h.pipeline.run(unknown).await.unwrap_err().is_validation());

    assert_eq!(store.get(&job.id).await.unwrap().unwrap(), job);
    assert!(store
        .get(&JobId::from_string("never-created"))
        .await
        .unwrap()
        .is_none());
    assert!(is_empty_dir(h.work_dir.path()));
}

#[tokio::test]
async fn test_request_of_the_wrong_kind_is_rejected() {
    let store = MemoryJobStore::new();
    let h = harness(Arc::new(StubClipEngine::producing(b"clip")), store.clone());
    let job = create_job(&store, JobKind::Transcription, JobParams::None).await;

    let err = h.pipeline.run(request_for(&job)).await.unwrap_err();
    assert!(err.is_validation());
    assert_eq!(store.get(&job.id).await.unwrap().unwrap().status, JobStatus::Pending);
}

#[tokio::test]
async fn test_empty_transcript_still_completes() {
    let store = MemoryJobStore::new();
    let engine = Arc::new(StubTranscriptionEngine {
        result: Ok(Transcript::default()),
    });
    let h = harness(engine, store.clone());
    let job = create_job(&store, JobKind::Transcription, JobParams::None).await;

    let outcome = h.pipeline.run(request_for(&job)).await.unwrap();
    assert_eq!(outcome.output, JobOutput::Transcript(Transcript::default()));

    let record = store.get(&job.id).await.unwrap().unwrap();
    assert_eq!(record.status, JobStatus::Completed);
    assert_eq!(record.transcript, Some(Transcript::default()));
    assert!(record.has_output());
    assert_eq!(h.artifacts.signed_urls_issued(), 1);
}

#[tokio::test]
async fn test_transcript_is_stored_on_the_record() {
    let store = MemoryJobStore::new();
    let transcript = Transcript::new(vec![Word::new("hello", 0.0, 0.4), Word::new("there", 0.5, 0.9)]);
    let engine = Arc::new(StubTranscriptionEngine {
        result: Ok(transcript.clone()),
    });
    let h = harness(engine, store.clone());
    let job = create_job(&store, JobKind::Transcription, JobParams::None).await;

    h.pipeline.run(request_for(&job)).await.unwrap();

    let record = store.get(&job.id).await.unwrap().unwrap();
    assert_eq!(record.transcript, Some(transcript));
    assert!(record.output_uri.is_none());
}

#[tokio::test]
async fn test_engine_error_is_recorded_verbatim() {
    let store = MemoryJobStore::new();
    let engine = Arc::new(StubTranscriptionEngine {
        result: Err(EngineFailure::new("Deepgram API Error: HTTP 400")
            .with_diagnostics(Some("unsupported media".into()))),
    });
    let h = harness(engine, store.clone());
    let job = create_job(&store, JobKind::Transcription, JobParams::None).await;

    let err = h.pipeline.run(request_for(&job)).await.unwrap_err();

    let record = store.get(&job.id).await.unwrap().unwrap();
    assert_eq!(record.status, JobStatus::Failed);
    assert_eq!(record.error.as_deref(), Some(err.to_string().as_str()));
    assert!(record.error.unwrap().contains("unsupported media"));
}

#[tokio::test]
async fn test_missing_input_artifact_fails_the_job() {
    let store = MemoryJobStore::new();
    let h = harness(Arc::new(StubClipEngine::producing(b"clip")), store.clone());
    let job = Job::new_pending(
        JobId::new(),
        JobKind::Clip,
        &ArtifactUri::parse("store://otherBucket/missing.mp4").unwrap(),
        JobParams::Clip(ClipParams::new(0.0, 1.0)),
    );
    store.create(&job).await.unwrap();

    let err = h.pipeline.run(request_for(&job)).await.unwrap_err();
    assert!(matches!(err, PipelineError::Storage(_)));

    let record = store.get(&job.id).await.unwrap().unwrap();
    assert_eq!(record.status, JobStatus::Failed);
    assert!(record.error.unwrap().contains("missing.mp4"));
    assert!(is_empty_dir(h.work_dir.path()));
}

#[tokio::test]
async fn test_retriggered_job_completes_without_stale_error() {
    let store = MemoryJobStore::new();
    let h = harness(Arc::new(StubClipEngine::producing(b"clip")), store.clone());
    let input = ArtifactUri::parse("store://otherBucket/late.mp4").unwrap();
    let job = Job::new_pending(
        JobId::new(),
        JobKind::Clip,
        &input,
        JobParams::Clip(ClipParams::new(0.0, 1.0)),
    );
    store.create(&job).await.unwrap();

    h.pipeline.run(request_for(&job)).await.unwrap_err();
    let failed = store.get(&job.id).await.unwrap().unwrap();
    assert_eq!(failed.status, JobStatus::Failed);
    assert!(failed.error.is_some());

    h.artifacts.put(&input, b"arrived".to_vec(), "video/mp4");
    h.pipeline.run(request_for(&job)).await.unwrap();

    let record = store.get(&job.id).await.unwrap().unwrap();
    assert_eq!(record.status, JobStatus::Completed);
    assert!(record.error.is_none());
    assert_eq!(
        record.output_uri.as_deref(),
        Some(format!("store://defaultBucket/clips/{}/clip_late.mp4", job.id).as_str())
    );
}

#[tokio::test]
async fn test_unreachable_store_before_processing_is_reported() {
    let store = MemoryJobStore::new();
    let h = harness(Arc::new(StubClipEngine::producing(b"clip")), store.clone());
    let job = create_job(&store, JobKind::Clip, JobParams::Clip(ClipParams::new(0.0, 1.0))).await;

    store.set_available(false);
    let err = h.pipeline.run(request_for(&job)).await.unwrap_err();
    assert!(matches!(err, PipelineError::Store(_)));

    store.set_available(true);
    assert_eq!(store.get(&job.id).await.unwrap().unwrap().status, JobStatus::Pending);
}

#[tokio::test]
async fn test_failed_terminal_write_is_swallowed() {
    let store = MemoryJobStore::new();
    let engine = Arc::new(StubClipEngine {
        store_to_break: Some(store.clone()),
        ..StubClipEngine::producing(b"clip")
    });
    let h = harness(engine, store.clone());
    let job = create_job(&store, JobKind::Clip, JobParams::Clip(ClipParams::new(0.0, 1.0))).await;

    let outcome = h.pipeline.run(request_for(&job)).await;
    assert!(outcome.is_ok());

    store.set_available(true);
    let record = store.get(&job.id).await.unwrap().unwrap();
    assert_eq!(record.status, JobStatus::Processing);
    assert!(is_empty_dir(h.work_dir.path()));
}
