//! Router scenarios over in-memory stores and a stub clip engine.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use axum::body::Body;
use axum::http::{header, Method, Request, StatusCode};
use axum::Router;
use tempfile::TempDir;
use tower::ServiceExt;
use tstudio_api::{create_router, ApiConfig, AppState};
use tstudio_firestore::{JobStore, MemoryJobStore};
use tstudio_models::{ArtifactUri, ClipParams, Job, JobId, JobKind, JobParams, JobStatus};
use tstudio_storage::MemoryArtifactStore;
use tstudio_worker::{
    CancelSignal, EngineAdapter, EngineFailure, EngineOutput, InputMode, JobPipeline,
    ResolvedInput, WorkerConfig,
};

const INPUT: &str = "store://bucket1/video.mp4";

/// Writes a fixed clip after `delay`, or fails with `failure` when set.
struct StubClipEngine {
    failure: Option<EngineFailure>,
    delay: Duration,
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
        _params: &JobParams,
        _cancel: CancelSignal,
    ) -> Result<EngineOutput, EngineFailure> {
        if let Some(failure) = &self.failure {
            return Err(failure.clone());
        }
        if !self.delay.is_zero() {
            tokio::time::sleep(self.delay).await;
        }
        let ResolvedInput::LocalFile { path, output_dir } = input else {
            return Err(EngineFailure::new("expected a local file"));
        };
        let stem = path.file_stem().unwrap().to_string_lossy().to_string();
        let output = output_dir.join(format!("clip_{}.mp4", stem));
        tokio::fs::write(&output, b"clip bytes").await.unwrap();
        Ok(EngineOutput::Artifact(output))
    }
}

struct TestApp {
    router: Router,
    store: MemoryJobStore,
    artifacts: Arc<MemoryArtifactStore>,
    _work_dir: TempDir,
}

fn app(failure: Option<EngineFailure>) -> TestApp {
    app_with_engine(StubClipEngine {
        failure,
        delay: Duration::ZERO,
    })
}

fn app_with_engine(engine: StubClipEngine) -> TestApp {
    let work_dir = tempfile::tempdir().unwrap();
    let store = MemoryJobStore::new();
    let artifacts = Arc::new(MemoryArtifactStore::new("store", "defaultBucket"));
    artifacts.put(&ArtifactUri::parse(INPUT).unwrap(), b"source video".to_vec(), "video/mp4");

    let config = WorkerConfig {
        work_dir: work_dir.path().to_path_buf(),
        clip_budget: Duration::from_secs(2),
        ..WorkerConfig::default()
    };
    let pipeline = JobPipeline::new(
        Arc::new(store.clone()),
        artifacts.clone(),
        Arc::new(engine),
        config,
    );

    let state = AppState::from_parts(ApiConfig::default(), vec![pipeline]);
    TestApp {
        router: create_router(state, None),
        store,
        artifacts,
        _work_dir: work_dir,
    }
}

async fn create_clip_job(store: &MemoryJobStore, id: &str) -> JobId {
    let id = JobId::from_string(id);
    let job = Job::new_pending(
        id.clone(),
        JobKind::Clip,
        &ArtifactUri::parse(INPUT).unwrap(),
        JobParams::Clip(ClipParams::new(10.0, 20.0)),
    );
    store.create(&job).await.unwrap();
    id
}

fn post_clip(body: &str) -> Request<Body> {
    Request::builder()
        .method(Method::POST)
        .uri("/clip")
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(body.to_string()))
        .unwrap()
}

async fn body_text(response: axum::response::Response) -> String {
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX).await.unwrap();
    String::from_utf8(bytes.to_vec()).unwrap()
}

#[tokio::test]
async fn test_job_finishes_after_caller_disconnects() {
    let app = app_with_engine(StubClipEngine {
        failure: None,
        delay: Duration::from_millis(500),
    });
    let id = create_clip_job(&app.store, "job-1").await;

    let request = app.router.oneshot(post_clip(
        r#"{"jobId":"job-1","inputUri":"store://bucket1/video.mp4","startTime":10,"endTime":20}"#,
    ));
    // Dropping the response future is what a closed connection does.
    let finished = tokio::time::timeout(Duration::from_millis(100), request).await;
    assert!(finished.is_err());

    let mut status = JobStatus::Pending;
    for _ in 0..60 {
        status = app.store.get(&id).await.unwrap().unwrap().status;
        if status.is_terminal() {
            break;
        }
        tokio::time::sleep(Duration::from_millis(50)).await;
    }
    assert_eq!(status, JobStatus::Completed);
    assert!(app
        .artifacts
        .get(&ArtifactUri::parse("store://defaultBucket/clips/job-1/clip_video.mp4").unwrap())
        .is_some());
}

#[tokio::test]
async fn test_clip_job_succeeds() {
    let app = app(None);
    let id = create_clip_job(&app.store, "job-1").await;

    let response = app
        .router
        .oneshot(post_clip(
            r#"{"jobId":"job-1","inputUri":"store://bucket1/video.mp4","startTime":10,"endTime":20}"#,
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let body: serde_json::Value = serde_json::from_str(&body_text(response).await).unwrap();
    assert_eq!(body["success"], true);
    assert_eq!(body["message"], "Job job-1 processed.");

    let job = app.store.get(&id).await.unwrap().unwrap();
    assert_eq!(job.status, JobStatus::Completed);
    assert_eq!(
        job.output_uri.as_deref(),
        Some("store://defaultBucket/clips/job-1/clip_video.mp4")
    );
    let published = ArtifactUri::parse("store://defaultBucket/clips/job-1/clip_video.mp4").unwrap();
    assert_eq!(app.artifacts.get(&published).unwrap(), b"clip bytes");
}

#[tokio::test]
async fn test_engine_failure_is_500_json() {
    let app = app(Some(
        EngineFailure::new("FFmpeg exited with status 1").with_diagnostics(Some("moov atom not found".into())),
    ));
    let id = create_clip_job(&app.store, "job-2").await;

    let response = app
        .router
        .oneshot(post_clip(
            r#"{"jobId":"job-2","inputUri":"store://bucket1/video.mp4","startTime":10,"endTime":20}"#,
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    let body: serde_json::Value = serde_json::from_str(&body_text(response).await).unwrap();
    assert_eq!(body["success"], false);
    let error = body["error"].as_str().unwrap();
    assert!(error.starts_with("Failed to process job job-2: FFmpeg exited with status 1"));
    assert!(error.contains("moov atom not found"));

    let job = app.store.get(&id).await.unwrap().unwrap();
    assert_eq!(job.status, JobStatus::Failed);
    assert!(job.error.unwrap().contains("moov atom not found"));
}

#[tokio::test]
async fn test_invalid_window_is_400_and_untouched() {
    let app = app(None);
    let id = create_clip_job(&app.store, "job-3").await;

    let response = app
        .router
        .oneshot(post_clip(
            r#"{"jobId":"job-3","inputUri":"store://bucket1/video.mp4","startTime":10,"endTime":5}"#,
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let content_type = response.headers().get(header::CONTENT_TYPE).unwrap().to_str().unwrap().to_string();
    assert!(content_type.starts_with("text/plain"));
    assert!(!body_text(response).await.is_empty());

    let job = app.store.get(&id).await.unwrap().unwrap();
    assert_eq!(job.status, JobStatus::Pending);
}

#[tokio::test]
async fn test_malformed_json_is_400() {
    let app = app(None);
    let response = app.router.oneshot(post_clip("{not json")).await.unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_missing_job_id_is_400() {
    let app = app(None);
    let response = app
        .router
        .oneshot(post_clip(r#"{"inputUri":"store://bucket1/video.mp4","startTime":1,"endTime":2}"#))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_get_is_405() {
    let app = app(None);
    let response = app
        .router
        .oneshot(Request::builder().method(Method::GET).uri("/clip").body(Body::empty()).unwrap())
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::METHOD_NOT_ALLOWED);
}

#[tokio::test]
async fn test_unserved_kind_is_not_mounted() {
    let app = app(None);
    let response = app
        .router
        .oneshot(
            Request::builder()
                .method(Method::POST)
                .uri("/transcribe")
                .body(Body::from(r#"{"jobId":"j","inputUri":"store://bucket1/video.mp4"}"#))
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_health_lists_kinds_and_echoes_request_id() {
    let app = app(None);
    let response = app
        .router
        .oneshot(
            Request::builder()
                .uri("/healthz")
                .header("X-Request-ID", "req-42")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(response.headers().get("X-Request-ID").unwrap().to_str().unwrap(), "req-42");
    let body: serde_json::Value = serde_json::from_str(&body_text(response).await).unwrap();
    assert_eq!(body["status"], "healthy");
    assert_eq!(body["kinds"], serde_json::json!(["clip"]));
}
