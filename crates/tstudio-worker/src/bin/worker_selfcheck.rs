use std::path::Path;

use tstudio_models::{JobId, JobKind};
use tstudio_storage::S3ArtifactStore;
use tstudio_worker::{ScratchDir, WorkerConfig};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    let config = WorkerConfig::from_env();

    println!(
        "worker-selfcheck: starting with work_dir={} kinds={:?}",
        config.work_dir.display(),
        config.kinds
    );
    ensure_workdir(&config.work_dir).await?;

    if config.serves(JobKind::Clip) {
        ensure_ffmpeg()?;
    }
    if config.serves(JobKind::Transcription) {
        ensure_env_present(&["DEEPGRAM_API_KEY"])?;
    }
    ensure_env_present(&["S3_ACCESS_KEY_ID", "S3_SECRET_ACCESS_KEY", "S3_DEFAULT_BUCKET"])?;
    ensure_storage().await?;
    if std::env::var("FIRESTORE_EMULATOR_HOST").is_err() {
        ensure_env_present(&["GOOGLE_APPLICATION_CREDENTIALS"])?;
    }
    if std::env::var("GCP_PROJECT_ID").is_err() {
        ensure_env_present(&["FIREBASE_PROJECT_ID"])?;
    }

    println!("worker-selfcheck: ok");
    Ok(())
}

async fn ensure_workdir<P: AsRef<Path>>(path: P) -> anyhow::Result<()> {
    let path = path.as_ref();
    tokio::fs::create_dir_all(path).await?;
    let scratch = ScratchDir::create(path, JobKind::Clip, &JobId::from_string("selfcheck"))
        .map_err(|e| anyhow::anyhow!("work dir {} is not writable: {}", path.display(), e))?;
    tokio::fs::write(scratch.join("write-check"), b"ok").await?;
    scratch.close();
    Ok(())
}

fn ensure_ffmpeg() -> anyhow::Result<()> {
    let ffmpeg = tstudio_media::check_ffmpeg().map_err(|e| anyhow::anyhow!("{}", e))?;
    let output = std::process::Command::new(&ffmpeg)
        .arg("-version")
        .output()
        .map_err(|e| anyhow::anyhow!("ffmpeg not available: {}", e))?;

    if !output.status.success() {
        return Err(anyhow::anyhow!(
            "ffmpeg -version failed: {:?}",
            output.status
        ));
    }
    Ok(())
}

async fn ensure_storage() -> anyhow::Result<()> {
    let store = S3ArtifactStore::from_env()
        .await
        .map_err(|e| anyhow::anyhow!("artifact store misconfigured: {}", e))?;
    store
        .check_connectivity()
        .await
        .map_err(|e| anyhow::anyhow!("artifact store unreachable: {}", e))
}

fn ensure_env_present(vars: &[&str]) -> anyhow::Result<()> {
    for var in vars {
        if std::env::var(var).is_err() {
            return Err(anyhow::anyhow!("missing required env var {}", var));
        }
    }
    Ok(())
}
