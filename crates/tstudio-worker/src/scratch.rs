//! Per-invocation scratch directories.

use std::path::{Path, PathBuf};

use tempfile::TempDir;
use tracing::warn;
use tstudio_models::{JobId, JobKind};

/// A scratch directory owned by one pipeline invocation.
///
/// The directory is removed when the value is closed or dropped, whichever
/// comes first, so every exit path of the pipeline reclaims it.
#[derive(Debug)]
pub struct ScratchDir {
    dir: TempDir,
}

impl ScratchDir {
    /// Create `<root>/<kind>_<jobId>_<random>`.
    pub fn create(root: &Path, kind: JobKind, job_id: &JobId) -> std::io::Result<Self> {
        std::fs::create_dir_all(root)?;
        let dir = tempfile::Builder::new()
            .prefix(&format!("{}_{}_", kind.as_str(), job_id))
            .tempdir_in(root)?;
        Ok(Self { dir })
    }

    pub fn path(&self) -> &Path {
        self.dir.path()
    }

    /// Path of `file_name` inside the directory.
    pub fn join(&self, file_name: &str) -> PathBuf {
        self.dir.path().join(file_name)
    }

    /// Remove the directory now, logging instead of failing.
    pub fn close(self) {
        let path = self.dir.path().to_path_buf();
        if let Err(e) = self.dir.close() {
            warn!(path = %path.display(), error = %e, "Failed to remove scratch directory");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_scratch_dir_naming_and_removal() {
        let root = tempfile::tempdir().unwrap();
        let scratch = ScratchDir::create(root.path(), JobKind::Clip, &JobId::from_string("job-1")).unwrap();

        let path = scratch.path().to_path_buf();
        let name = path.file_name().unwrap().to_string_lossy().to_string();
        assert!(name.starts_with("clip_job-1_"));
        assert!(path.starts_with(root.path()));

        std::fs::write(scratch.join("video.mp4"), b"data").unwrap();
        scratch.close();
        assert!(!path.exists());
    }

    #[test]
    fn test_drop_removes_directory() {
        let root = tempfile::tempdir().unwrap();
        let path = {
            let scratch =
                ScratchDir::create(root.path(), JobKind::Transcription, &JobId::from_string("job-2")).unwrap();
            scratch.path().to_path_buf()
        };
        assert!(!path.exists());
    }

    #[test]
    fn test_creates_missing_root() {
        let root = tempfile::tempdir().unwrap();
        let nested = root.path().join("a/b");
        let scratch = ScratchDir::create(&nested, JobKind::Clip, &JobId::from_string("job-3")).unwrap();
        assert!(scratch.path().starts_with(&nested));
    }
}
