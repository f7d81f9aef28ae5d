//! Shared data models for the transcript studio job pipeline.
//!
//! This crate provides Serde-serializable types for:
//! - Job records, kinds and the status state machine
//! - Partial job updates merged by the job store
//! - Artifact URIs (`scheme://container/path`)
//! - Timed-word transcripts
//! - Worker request bodies and their validation

pub mod artifact;
pub mod error;
pub mod job;
pub mod request;
pub mod transcript;

pub use artifact::ArtifactUri;
pub use error::{ModelError, ModelResult};
pub use job::{job_record_schema, ClipParams, Job, JobField, JobId, JobKind, JobParams, JobStatus, JobUpdate};
pub use request::{ClipRequest, TranscriptionRequest, WorkerRequest};
pub use transcript::{Transcript, Word};
