//! Error types for the analysis engine and the attempt store.

use std::path::PathBuf;
use thiserror::Error;

/// Failures surfaced by the analysis service.
#[derive(Debug, Error)]
pub enum AnalysisError {
    /// No attempt exists for the requested key.
    #[error("exam attempt not found (exam '{exam_id}', user '{username}')")]
    AttemptNotFound { exam_id: String, username: String },

    /// A timestamp in the telemetry could not be parsed.
    #[error("malformed timestamp in {signal} data: '{value}'")]
    MalformedTimestamp { signal: &'static str, value: String },

    /// The attempt store failed.
    #[error(transparent)]
    Store(#[from] StoreError),
}

impl AnalysisError {
    pub fn is_not_found(&self) -> bool {
        matches!(self, AnalysisError::AttemptNotFound { .. })
    }
}

/// Failures of the attempt store.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("failed to access snapshot {}: {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse snapshot {}: {source}", .path.display())]
    Snapshot {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("failed to decode {collection} document: {source}")]
    Decode {
        collection: &'static str,
        #[source]
        source: serde_json::Error,
    },

    #[error("failed to encode {what}: {source}")]
    Encode {
        what: &'static str,
        #[source]
        source: serde_json::Error,
    },

    #[error("no attempt document to update (exam '{exam_id}', user '{username}')")]
    MissingAttempt { exam_id: String, username: String },

    #[error("attempt store lock poisoned")]
    Poisoned,
}
