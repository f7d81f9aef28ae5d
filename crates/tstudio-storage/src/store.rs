//! The artifact store contract.

use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use tstudio_models::ArtifactUri;

use crate::error::StorageResult;

/// Upload progress snapshot.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct UploadProgress {
    pub bytes_sent: u64,
    pub total_bytes: u64,
}

impl UploadProgress {
    /// Percentage in `0.0..=100.0`. An empty file counts as complete.
    pub fn percentage(&self) -> f64 {
        if self.total_bytes == 0 {
            return 100.0;
        }
        (self.bytes_sent as f64 / self.total_bytes as f64 * 100.0).min(100.0)
    }
}

/// Best-effort upload progress callback.
pub type UploadProgressFn = Arc<dyn Fn(UploadProgress) + Send + Sync>;

/// Object storage holding job input and output media.
///
/// Reads address any container named in the URI; uploads always land in the
/// deployment's default container.
#[async_trait]
pub trait ArtifactStore: Send + Sync {
    /// URI scheme of canonical artifact URIs (e.g. `gs`).
    fn scheme(&self) -> &str;

    /// Container that receives uploads.
    fn default_container(&self) -> &str;

    /// Canonical URI of `key` in the default container.
    fn uri_for(&self, key: &str) -> StorageResult<ArtifactUri> {
        Ok(ArtifactUri::new(self.scheme(), self.default_container(), key)?)
    }

    /// Download `uri` into `dest`, returning the number of bytes written.
    async fn download_to(&self, uri: &ArtifactUri, dest: &Path) -> StorageResult<u64>;

    /// Upload `src` to `key` in the default container.
    async fn upload(
        &self,
        src: &Path,
        key: &str,
        content_type: &str,
        progress: Option<UploadProgressFn>,
    ) -> StorageResult<ArtifactUri>;

    /// Time-limited pre-authorized GET URL for `uri`.
    async fn signed_url(&self, uri: &ArtifactUri, ttl: Duration) -> StorageResult<String>;

    /// Whether `uri` names an existing object.
    async fn exists(&self, uri: &ArtifactUri) -> StorageResult<bool>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_progress_percentage() {
        let half = UploadProgress {
            bytes_sent: 50,
            total_bytes: 100,
        };
        assert!((half.percentage() - 50.0).abs() < f64::EPSILON);

        let empty = UploadProgress {
            bytes_sent: 0,
            total_bytes: 0,
        };
        assert_eq!(empty.percentage(), 100.0);
    }
}
