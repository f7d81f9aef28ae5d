//! In-memory artifact store.

use std::collections::HashMap;
use std::path::Path;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::RwLock;
use std::time::Duration;

use async_trait::async_trait;
use tstudio_models::ArtifactUri;

use crate::error::{StorageError, StorageResult};
use crate::store::{ArtifactStore, UploadProgress, UploadProgressFn};

/// Progress granularity for in-memory uploads.
const PROGRESS_CHUNK: usize = 64 * 1024;

#[derive(Debug, Clone)]
struct StoredObject {
    data: Vec<u8>,
    content_type: String,
}

/// Process-local artifact store with the same contract as the S3 store.
#[derive(Debug)]
pub struct MemoryArtifactStore {
    scheme: String,
    default_container: String,
    objects: RwLock<HashMap<(String, String), StoredObject>>,
    signed_urls_issued: AtomicUsize,
}

impl MemoryArtifactStore {
    pub fn new(scheme: impl Into<String>, default_container: impl Into<String>) -> Self {
        Self {
            scheme: scheme.into(),
            default_container: default_container.into(),
            objects: RwLock::new(HashMap::new()),
            signed_urls_issued: AtomicUsize::new(0),
        }
    }

    /// Store `data` at `uri` directly.
    pub fn put(&self, uri: &ArtifactUri, data: impl Into<Vec<u8>>, content_type: &str) {
        if let Ok(mut objects) = self.objects.write() {
            objects.insert(
                key_of(uri),
                StoredObject {
                    data: data.into(),
                    content_type: content_type.to_string(),
                },
            );
        }
    }

    /// Contents of `uri`, if present.
    pub fn get(&self, uri: &ArtifactUri) -> Option<Vec<u8>> {
        self.objects
            .read()
            .ok()
            .and_then(|objects| objects.get(&key_of(uri)).map(|o| o.data.clone()))
    }

    /// Content type recorded for `uri`, if present.
    pub fn content_type(&self, uri: &ArtifactUri) -> Option<String> {
        self.objects
            .read()
            .ok()
            .and_then(|objects| objects.get(&key_of(uri)).map(|o| o.content_type.clone()))
    }

    /// Number of signed URLs handed out so far.
    pub fn signed_urls_issued(&self) -> usize {
        self.signed_urls_issued.load(Ordering::SeqCst)
    }

    fn read_object(&self, uri: &ArtifactUri) -> StorageResult<Vec<u8>> {
        self.get(uri)
            .ok_or_else(|| StorageError::not_found(uri.to_string()))
    }
}

fn key_of(uri: &ArtifactUri) -> (String, String) {
    (uri.container().to_string(), uri.path().to_string())
}

#[async_trait]
impl ArtifactStore for MemoryArtifactStore {
    fn scheme(&self) -> &str {
        &self.scheme
    }

    fn default_container(&self) -> &str {
        &self.default_container
    }

    async fn download_to(&self, uri: &ArtifactUri, dest: &Path) -> StorageResult<u64> {
        let data = self.read_object(uri)?;
        if let Some(parent) = dest.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }
        tokio::fs::write(dest, &data).await?;
        Ok(data.len() as u64)
    }

    async fn upload(
        &self,
        src: &Path,
        key: &str,
        content_type: &str,
        progress: Option<UploadProgressFn>,
    ) -> StorageResult<ArtifactUri> {
        let uri = self.uri_for(key)?;
        let data = tokio::fs::read(src).await?;
        let total_bytes = data.len() as u64;

        if let Some(ref progress) = progress {
            progress(UploadProgress {
                bytes_sent: 0,
                total_bytes,
            });
            let mut bytes_sent = 0u64;
            for chunk in data.chunks(PROGRESS_CHUNK) {
                bytes_sent += chunk.len() as u64;
                progress(UploadProgress {
                    bytes_sent,
                    total_bytes,
                });
            }
        }

        self.put(&uri, data, content_type);
        Ok(uri)
    }

    async fn signed_url(&self, uri: &ArtifactUri, ttl: Duration) -> StorageResult<String> {
        if self.get(uri).is_none() {
            return Err(StorageError::not_found(uri.to_string()));
        }
        self.signed_urls_issued.fetch_add(1, Ordering::SeqCst);
        Ok(format!(
            "https://{}.storage.invalid/{}?expires_in={}",
            uri.container(),
            uri.path(),
            ttl.as_secs()
        ))
    }

    async fn exists(&self, uri: &ArtifactUri) -> StorageResult<bool> {
        Ok(self.get(uri).is_some())
    }
}
