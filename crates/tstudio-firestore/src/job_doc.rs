//! Mapping between job records and Firestore documents.

use std::collections::HashMap;

use chrono::{DateTime, SecondsFormat, Utc};
use tstudio_models::{Job, JobUpdate};

use crate::error::{FirestoreError, FirestoreResult};
use crate::types::{Document, Value};

/// Record fields stored as native Firestore timestamps.
const TIMESTAMP_FIELDS: &[&str] = &["createdAt", "updatedAt", "workerStartedAt", "workerCompletedAt"];

fn timestamp(at: &DateTime<Utc>) -> Value {
    Value::TimestampValue(at.to_rfc3339_opts(SecondsFormat::Micros, true))
}

fn to_fields(json: serde_json::Value) -> FirestoreResult<HashMap<String, Value>> {
    let serde_json::Value::Object(map) = json else {
        return Err(FirestoreError::serialization("job record is not an object"));
    };

    Ok(map
        .into_iter()
        .map(|(key, value)| {
            let converted = match (&value, TIMESTAMP_FIELDS.contains(&key.as_str())) {
                (serde_json::Value::String(s), true) => Value::TimestampValue(s.clone()),
                _ => Value::from_json(&value),
            };
            (key, converted)
        })
        .collect())
}

/// Fields of a full job record.
pub fn job_to_fields(job: &Job) -> FirestoreResult<HashMap<String, Value>> {
    let json = serde_json::to_value(job).map_err(|e| FirestoreError::serialization(e.to_string()))?;
    let mut fields = to_fields(json)?;
    fields.insert("createdAt".to_string(), timestamp(&job.created_at));
    fields.insert("updatedAt".to_string(), timestamp(&job.updated_at));
    Ok(fields)
}

/// Fields and update mask for merging `update` into a stored record.
///
/// Cleared fields appear in the mask without a value, which makes Firestore
/// delete them from the document.
pub fn update_to_fields(
    update: &JobUpdate,
    now: DateTime<Utc>,
) -> FirestoreResult<(HashMap<String, Value>, Vec<String>)> {
    let json = serde_json::to_value(update).map_err(|e| FirestoreError::serialization(e.to_string()))?;
    let mut fields = to_fields(json)?;
    fields.insert("updatedAt".to_string(), timestamp(&now));

    let mask = update.field_paths().into_iter().map(str::to_string).collect();
    Ok((fields, mask))
}

/// Decode a stored document into a job record.
pub fn job_from_document(doc: &Document) -> FirestoreResult<Job> {
    let fields = doc
        .fields
        .as_ref()
        .ok_or_else(|| FirestoreError::serialization("document has no fields"))?;

    let json: serde_json::Map<String, serde_json::Value> =
        fields.iter().map(|(k, v)| (k.clone(), v.to_json())).collect();

    serde_json::from_value(serde_json::Value::Object(json))
        .map_err(|e| FirestoreError::serialization(e.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use tstudio_models::{ArtifactUri, ClipParams, JobId, JobKind, JobParams, JobStatus, Transcript, Word};

    fn clip_job() -> Job {
        Job::new_pending(
            JobId::from_string("job-1"),
            JobKind::Clip,
            &ArtifactUri::parse("store://bucket1/video.mp4").unwrap(),
            JobParams::Clip(ClipParams::new(10.0, 20.0)),
        )
    }

    #[test]
    fn test_job_fields_layout() {
        let fields = job_to_fields(&clip_job()).unwrap();

        assert_eq!(fields.get("status"), Some(&Value::StringValue("PENDING".into())));
        assert_eq!(fields.get("kind"), Some(&Value::StringValue("clip".into())));
        assert_eq!(fields.get("startTime"), Some(&Value::DoubleValue(10.0)));
        assert!(matches!(fields.get("createdAt"), Some(Value::TimestampValue(_))));
        assert!(!fields.contains_key("outputUri"));
    }

    #[test]
    fn test_document_round_trip_keeps_job() {
        let job = clip_job();
        let doc = Document::new(job_to_fields(&job).unwrap());
        let decoded = job_from_document(&doc).unwrap();

        assert_eq!(decoded.id, job.id);
        assert_eq!(decoded.status, JobStatus::Pending);
        assert_eq!(decoded.clip, Some(ClipParams::new(10.0, 20.0)));
        // Firestore keeps microsecond precision
        assert_eq!(decoded.created_at.timestamp_micros(), job.created_at.timestamp_micros());
    }

    #[test]
    fn test_update_mask_lists_touched_fields() {
        let transcript = Transcript::new(vec![Word::new("hello", 0.0, 0.4)]);
        let (fields, mask) = update_to_fields(&JobUpdate::completed_transcript(transcript, Utc::now()), Utc::now()).unwrap();

        assert_eq!(
            mask,
            vec!["status", "outputUri", "transcript", "error", "workerCompletedAt", "updatedAt"]
        );
        assert!(matches!(fields.get("transcript"), Some(Value::MapValue(_))));
        assert!(matches!(fields.get("workerCompletedAt"), Some(Value::TimestampValue(_))));
        assert!(!fields.contains_key("error"));
        assert!(!fields.contains_key("outputUri"));
    }

    #[test]
    fn test_rerun_update_deletes_stale_error() {
        let (fields, mask) = update_to_fields(&JobUpdate::processing(Utc::now()), Utc::now()).unwrap();

        for deleted in ["error", "outputUri", "transcript", "workerCompletedAt"] {
            assert!(mask.iter().any(|m| m == deleted), "{deleted} missing from mask");
            assert!(!fields.contains_key(deleted), "{deleted} should carry no value");
        }
        assert_eq!(fields.get("status"), Some(&Value::StringValue("PROCESSING".into())));
        assert!(matches!(fields.get("workerStartedAt"), Some(Value::TimestampValue(_))));
    }

    #[test]
    fn test_malformed_document() {
        let mut fields = HashMap::new();
        fields.insert("status".to_string(), Value::StringValue("PENDING".into()));
        let err = job_from_document(&Document::new(fields)).unwrap_err();
        assert!(matches!(err, FirestoreError::SerializationError(_)));
    }
}
