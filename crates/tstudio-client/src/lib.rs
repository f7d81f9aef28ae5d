//! Client side of the job workflow.
//!
//! This crate provides:
//! - [`JobSubmitter`]: upload an input, create the PENDING record, trigger the worker
//! - [`JobWatcher`]: follow a job record and report each status change
//! - [`ProgressUpdate`] with user-facing status descriptions

pub mod config;
pub mod error;
pub mod progress;
pub mod submitter;
pub mod watcher;

pub use config::ClientConfig;
pub use error::{ClientError, ClientResult};
pub use progress::ProgressUpdate;
pub use submitter::{JobSubmitter, Submission};
pub use watcher::{JobWatcher, WatchHandle};
