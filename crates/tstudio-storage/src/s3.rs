//! S3-compatible artifact store.

use std::path::Path;
use std::time::Duration;

use async_trait::async_trait;
use aws_config::BehaviorVersion;
use aws_credential_types::Credentials;
use aws_sdk_s3::config::{Builder, Region};
use aws_sdk_s3::error::DisplayErrorContext;
use aws_sdk_s3::presigning::PresigningConfig;
use aws_sdk_s3::primitives::ByteStream;
use aws_sdk_s3::types::{CompletedMultipartUpload, CompletedPart};
use aws_sdk_s3::Client;
use tokio::fs::File;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tracing::{debug, info, warn};

use tstudio_models::ArtifactUri;

use crate::error::{StorageError, StorageResult};
use crate::store::{ArtifactStore, UploadProgress, UploadProgressFn};

/// Part size for multipart uploads. Smaller files go up in a single PUT.
const MULTIPART_PART_SIZE: usize = 8 * 1024 * 1024;

/// Configuration for the S3 client.
#[derive(Debug, Clone)]
pub struct S3Config {
    /// S3 API endpoint URL; `None` uses the AWS default resolver
    pub endpoint_url: Option<String>,
    /// Access key ID
    pub access_key_id: String,
    /// Secret access key
    pub secret_access_key: String,
    /// Bucket that receives uploads
    pub default_bucket: String,
    /// Region ("auto" for R2)
    pub region: String,
    /// Scheme used in canonical artifact URIs
    pub uri_scheme: String,
    /// Address buckets by path instead of virtual host
    pub force_path_style: bool,
}

impl S3Config {
    /// Create config from environment variables.
    pub fn from_env() -> StorageResult<Self> {
        Ok(Self {
            endpoint_url: std::env::var("S3_ENDPOINT_URL").ok().filter(|s| !s.is_empty()),
            access_key_id: std::env::var("S3_ACCESS_KEY_ID")
                .map_err(|_| StorageError::config_error("S3_ACCESS_KEY_ID not set"))?,
            secret_access_key: std::env::var("S3_SECRET_ACCESS_KEY")
                .map_err(|_| StorageError::config_error("S3_SECRET_ACCESS_KEY not set"))?,
            default_bucket: std::env::var("S3_DEFAULT_BUCKET")
                .map_err(|_| StorageError::config_error("S3_DEFAULT_BUCKET not set"))?,
            region: std::env::var("S3_REGION").unwrap_or_else(|_| "auto".to_string()),
            uri_scheme: std::env::var("ARTIFACT_URI_SCHEME").unwrap_or_else(|_| "gs".to_string()),
            force_path_style: std::env::var("S3_FORCE_PATH_STYLE")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(true),
        })
    }
}

/// Artifact store backed by any S3-compatible object storage.
#[derive(Clone)]
pub struct S3ArtifactStore {
    client: Client,
    default_bucket: String,
    scheme: String,
}

impl S3ArtifactStore {
    /// Create a new store from configuration.
    pub async fn new(config: S3Config) -> StorageResult<Self> {
        if config.default_bucket.is_empty() {
            return Err(StorageError::config_error("default bucket must not be empty"));
        }

        let credentials = Credentials::new(
            &config.access_key_id,
            &config.secret_access_key,
            None,
            None,
            "tstudio-s3",
        );

        let mut builder = Builder::new()
            .behavior_version(BehaviorVersion::latest())
            .region(Region::new(config.region))
            .credentials_provider(credentials)
            .force_path_style(config.force_path_style);

        if let Some(endpoint_url) = config.endpoint_url {
            builder = builder.endpoint_url(endpoint_url);
        }

        Ok(Self {
            client: Client::from_conf(builder.build()),
            default_bucket: config.default_bucket,
            scheme: config.uri_scheme,
        })
    }

    /// Create from environment variables.
    pub async fn from_env() -> StorageResult<Self> {
        let config = S3Config::from_env()?;
        Self::new(config).await
    }

    /// Check connectivity by performing a head bucket operation on the default bucket.
    pub async fn check_connectivity(&self) -> StorageResult<()> {
        self.client
            .head_bucket()
            .bucket(&self.default_bucket)
            .send()
            .await
            .map_err(|e| {
                StorageError::AwsSdk(format!("Connectivity check failed: {}", DisplayErrorContext(&e)))
            })?;
        Ok(())
    }

    async fn put_single(&self, src: &Path, key: &str, content_type: &str) -> StorageResult<()> {
        let body = ByteStream::from_path(src)
            .await
            .map_err(|e| StorageError::upload_failed(e.to_string()))?;

        self.client
            .put_object()
            .bucket(&self.default_bucket)
            .key(key)
            .body(body)
            .content_type(content_type)
            .send()
            .await
            .map_err(|e| StorageError::upload_failed(DisplayErrorContext(&e).to_string()))?;

        Ok(())
    }

    async fn put_multipart(
        &self,
        src: &Path,
        key: &str,
        content_type: &str,
        total_bytes: u64,
        progress: Option<&UploadProgressFn>,
    ) -> StorageResult<()> {
        let created = self
            .client
            .create_multipart_upload()
            .bucket(&self.default_bucket)
            .key(key)
            .content_type(content_type)
            .send()
            .await
            .map_err(|e| StorageError::upload_failed(DisplayErrorContext(&e).to_string()))?;

        let upload_id = created
            .upload_id()
            .ok_or_else(|| StorageError::upload_failed("multipart upload id missing"))?
            .to_string();

        let parts = match self
            .upload_parts(src, key, &upload_id, total_bytes, progress)
            .await
        {
            Ok(parts) => parts,
            Err(e) => {
                if let Err(abort_err) = self
                    .client
                    .abort_multipart_upload()
                    .bucket(&self.default_bucket)
                    .key(key)
                    .upload_id(&upload_id)
                    .send()
                    .await
                {
                    warn!(
                        key = %key,
                        "Failed to abort multipart upload: {}",
                        DisplayErrorContext(&abort_err)
                    );
                }
                return Err(e);
            }
        };

        self.client
            .complete_multipart_upload()
            .bucket(&self.default_bucket)
            .key(key)
            .upload_id(&upload_id)
            .multipart_upload(
                CompletedMultipartUpload::builder()
                    .set_parts(Some(parts))
                    .build(),
            )
            .send()
            .await
            .map_err(|e| StorageError::upload_failed(DisplayErrorContext(&e).to_string()))?;

        Ok(())
    }

    async fn upload_parts(
        &self,
        src: &Path,
        key: &str,
        upload_id: &str,
        total_bytes: u64,
        progress: Option<&UploadProgressFn>,
    ) -> StorageResult<Vec<CompletedPart>> {
        let mut file = File::open(src).await?;
        let mut parts = Vec::new();
        let mut bytes_sent = 0u64;
        let mut part_number = 1i32;

        loop {
            let chunk = read_chunk(&mut file, MULTIPART_PART_SIZE).await?;
            if chunk.is_empty() {
                break;
            }
            let len = chunk.len() as u64;

            let output = self
                .client
                .upload_part()
                .bucket(&self.default_bucket)
                .key(key)
                .upload_id(upload_id)
                .part_number(part_number)
                .body(ByteStream::from(chunk))
                .send()
                .await
                .map_err(|e| StorageError::upload_failed(DisplayErrorContext(&e).to_string()))?;

            parts.push(
                CompletedPart::builder()
                    .set_e_tag(output.e_tag().map(str::to_string))
                    .part_number(part_number)
                    .build(),
            );

            bytes_sent += len;
            report(progress, bytes_sent, total_bytes);
            part_number += 1;
        }

        Ok(parts)
    }
}

#[async_trait]
impl ArtifactStore for S3ArtifactStore {
    fn scheme(&self) -> &str {
        &self.scheme
    }

    fn default_container(&self) -> &str {
        &self.default_bucket
    }

    async fn download_to(&self, uri: &ArtifactUri, dest: &Path) -> StorageResult<u64> {
        debug!("Downloading {} to {}", uri, dest.display());

        let response = self
            .client
            .get_object()
            .bucket(uri.container())
            .key(uri.path())
            .send()
            .await
            .map_err(|e| match e.as_service_error() {
                Some(service) if service.is_no_such_key() => StorageError::not_found(uri.to_string()),
                _ => StorageError::download_failed(DisplayErrorContext(&e).to_string()),
            })?;

        if let Some(parent) = dest.parent() {
            tokio::fs::create_dir_all(parent).await.map_err(|e| {
                StorageError::download_failed(format!("Failed to create directory: {}", e))
            })?;
        }

        let mut file = File::create(dest).await?;
        let mut body = response.body.into_async_read();
        let bytes = tokio::io::copy(&mut body, &mut file)
            .await
            .map_err(|e| StorageError::download_failed(format!("Failed to write file: {}", e)))?;
        file.flush().await?;

        info!("Downloaded {} to {} ({} bytes)", uri, dest.display(), bytes);
        Ok(bytes)
    }

    async fn upload(
        &self,
        src: &Path,
        key: &str,
        content_type: &str,
        progress: Option<UploadProgressFn>,
    ) -> StorageResult<ArtifactUri> {
        let uri = self.uri_for(key)?;
        let total_bytes = tokio::fs::metadata(src).await?.len();
        debug!("Uploading {} to {} ({} bytes)", src.display(), uri, total_bytes);

        report(progress.as_ref(), 0, total_bytes);

        if total_bytes as usize <= MULTIPART_PART_SIZE {
            self.put_single(src, key, content_type).await?;
            report(progress.as_ref(), total_bytes, total_bytes);
        } else {
            self.put_multipart(src, key, content_type, total_bytes, progress.as_ref())
                .await?;
        }

        info!("Uploaded {} to {}", src.display(), uri);
        Ok(uri)
    }

    async fn signed_url(&self, uri: &ArtifactUri, ttl: Duration) -> StorageResult<String> {
        let presign_config = PresigningConfig::expires_in(ttl)
            .map_err(|e| StorageError::PresignFailed(e.to_string()))?;

        let presigned = self
            .client
            .get_object()
            .bucket(uri.container())
            .key(uri.path())
            .presigned(presign_config)
            .await
            .map_err(|e| StorageError::PresignFailed(DisplayErrorContext(&e).to_string()))?;

        Ok(presigned.uri().to_string())
    }

    async fn exists(&self, uri: &ArtifactUri) -> StorageResult<bool> {
        match self
            .client
            .head_object()
            .bucket(uri.container())
            .key(uri.path())
            .send()
            .await
        {
            Ok(_) => Ok(true),
            Err(e) if e.as_service_error().is_some_and(|s| s.is_not_found()) => Ok(false),
            Err(e) => Err(StorageError::AwsSdk(DisplayErrorContext(&e).to_string())),
        }
    }
}

fn report(progress: Option<&UploadProgressFn>, bytes_sent: u64, total_bytes: u64) {
    if let Some(progress) = progress {
        progress(UploadProgress {
            bytes_sent,
            total_bytes,
        });
    }
}

/// Read up to `size` bytes; returns fewer only at end of file.
async fn read_chunk(file: &mut File, size: usize) -> std::io::Result<Vec<u8>> {
    let mut buf = Vec::with_capacity(size);
    (&mut *file).take(size as u64).read_to_end(&mut buf).await?;
    Ok(buf)
}
