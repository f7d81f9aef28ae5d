//! Artifact storage for job inputs and outputs.
//!
//! This crate provides:
//! - The [`ArtifactStore`] contract addressed by `scheme://container/path` URIs
//! - An S3-compatible implementation (R2, GCS interoperability, AWS)
//! - Presigned GET URL generation
//! - Streaming uploads with progress reporting
//! - An in-memory implementation for tests and local runs

pub mod error;
pub mod memory;
pub mod s3;
pub mod store;

pub use error::{StorageError, StorageResult};
pub use memory::MemoryArtifactStore;
pub use s3::{S3ArtifactStore, S3Config};
pub use store::{ArtifactStore, UploadProgress, UploadProgressFn};
