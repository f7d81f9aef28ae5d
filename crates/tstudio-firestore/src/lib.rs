//! Job store backed by Firestore.
//!
//! This crate provides:
//! - The [`JobStore`] contract (create, merge-update, get, subscribe)
//! - [`JobSubscription`], a push stream of job snapshots with explicit unsubscribe
//! - A Firestore REST implementation with service account auth and emulator support
//! - An in-memory implementation with synchronous push delivery
//! - Request metrics and tracing spans

pub mod client;
pub mod error;
pub mod firestore_store;
pub mod job_doc;
pub mod memory;
pub mod metrics;
pub mod store;
pub mod token_cache;
pub mod types;

pub use client::{FirestoreClient, FirestoreConfig};
pub use error::{FirestoreError, FirestoreResult, JobStoreError, JobStoreResult};
pub use firestore_store::FirestoreJobStore;
pub use memory::MemoryJobStore;
pub use store::{JobStore, JobSubscription};
pub use types::{Document, Value};
