//! Pipeline metrics.

use metrics::{counter, gauge, histogram};
use tstudio_models::JobKind;

use crate::error::ErrorKind;

/// Metric names as constants for consistency.
pub mod names {
    pub const JOBS_STARTED_TOTAL: &str = "tstudio_jobs_started_total";
    pub const JOBS_COMPLETED_TOTAL: &str = "tstudio_jobs_completed_total";
    pub const JOBS_FAILED_TOTAL: &str = "tstudio_jobs_failed_total";
    pub const JOBS_REJECTED_TOTAL: &str = "tstudio_jobs_rejected_total";
    pub const JOBS_IN_FLIGHT: &str = "tstudio_jobs_in_flight";
    pub const ENGINE_DURATION_SECONDS: &str = "tstudio_engine_duration_seconds";
    pub const ENGINE_TIMEOUTS_TOTAL: &str = "tstudio_engine_timeouts_total";
    pub const TERMINAL_WRITE_FAILURES_TOTAL: &str = "tstudio_terminal_write_failures_total";
}

pub fn record_job_started(kind: JobKind) {
    counter!(names::JOBS_STARTED_TOTAL, "kind" => kind.as_str()).increment(1);
}

pub fn record_job_completed(kind: JobKind) {
    counter!(names::JOBS_COMPLETED_TOTAL, "kind" => kind.as_str()).increment(1);
}

pub fn record_job_failed(kind: JobKind, error: ErrorKind) {
    counter!(
        names::JOBS_FAILED_TOTAL,
        "kind" => kind.as_str(),
        "error" => error.as_str()
    )
    .increment(1);
}

/// A request was refused before any job state was touched.
pub fn record_job_rejected(kind: JobKind) {
    counter!(names::JOBS_REJECTED_TOTAL, "kind" => kind.as_str()).increment(1);
}

pub fn increment_in_flight(kind: JobKind) {
    gauge!(names::JOBS_IN_FLIGHT, "kind" => kind.as_str()).increment(1.0);
}

pub fn decrement_in_flight(kind: JobKind) {
    gauge!(names::JOBS_IN_FLIGHT, "kind" => kind.as_str()).decrement(1.0);
}

pub fn record_engine_duration(kind: JobKind, secs: f64) {
    histogram!(names::ENGINE_DURATION_SECONDS, "kind" => kind.as_str()).record(secs);
}

pub fn record_engine_timeout(kind: JobKind) {
    counter!(names::ENGINE_TIMEOUTS_TOTAL, "kind" => kind.as_str()).increment(1);
}

pub fn record_terminal_write_failure(kind: JobKind) {
    counter!(names::TERMINAL_WRITE_FAILURES_TOTAL, "kind" => kind.as_str()).increment(1);
}
