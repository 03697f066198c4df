//! Attempt store interface.
//!
//! The analysis engine reads telemetry and writes results only through
//! [`AttemptStore`], which is injected into the service. [`MemoryStore`]
//! is a document store backed by a JSON snapshot file.

pub mod memory;

pub use memory::{MemoryStore, Snapshot};

use crate::error::StoreError;
use crate::models::{Attempt, AudioEvent, Frame, MonitoringEvent};

/// Attempt field holding the on-demand analysis.
pub const CHEATING_ANALYSIS_FIELD: &str = "cheating_analysis";
/// Attempt field holding the submission-time score.
pub const CHEATING_SCORE_FIELD: &str = "cheatingScore";
/// Attempt field holding the counters behind the submission-time score.
pub const CHEATING_FACTORS_FIELD: &str = "cheatingFactors";

/// Keyed access to attempt records and their telemetry.
pub trait AttemptStore: Send + Sync {
    /// Look up the attempt for `(exam_id, username)`.
    fn find_attempt(&self, exam_id: &str, username: &str) -> Result<Option<Attempt>, StoreError>;

    /// Webcam frames recorded for the attempt.
    fn find_frames(&self, exam_id: &str, username: &str) -> Result<Vec<Frame>, StoreError>;

    /// Mobile events for the attempt, in ascending timestamp order.
    fn find_mobile_events(
        &self,
        exam_id: &str,
        username: &str,
    ) -> Result<Vec<MonitoringEvent>, StoreError>;

    /// Audio windows recorded for the attempt.
    fn find_audio_events(&self, exam_id: &str, username: &str)
        -> Result<Vec<AudioEvent>, StoreError>;

    /// Replace several fields of the attempt document in one write.
    ///
    /// Either every field is replaced or, on error, none is.
    fn update_attempt_fields(
        &self,
        exam_id: &str,
        username: &str,
        fields: Vec<(&str, serde_json::Value)>,
    ) -> Result<(), StoreError>;

    /// Replace one field of the attempt document.
    fn update_attempt_field(
        &self,
        exam_id: &str,
        username: &str,
        field: &str,
        value: serde_json::Value,
    ) -> Result<(), StoreError> {
        self.update_attempt_fields(exam_id, username, vec![(field, value)])
    }

    /// Usernames with an attempt for `exam_id`.
    fn list_attempts(&self, exam_id: &str) -> Result<Vec<String>, StoreError>;
}

impl<S: AttemptStore + ?Sized> AttemptStore for std::sync::Arc<S> {
    fn find_attempt(&self, exam_id: &str, username: &str) -> Result<Option<Attempt>, StoreError> {
        (**self).find_attempt(exam_id, username)
    }

    fn find_frames(&self, exam_id: &str, username: &str) -> Result<Vec<Frame>, StoreError> {
        (**self).find_frames(exam_id, username)
    }

    fn find_mobile_events(
        &self,
        exam_id: &str,
        username: &str,
    ) -> Result<Vec<MonitoringEvent>, StoreError> {
        (**self).find_mobile_events(exam_id, username)
    }

    fn find_audio_events(
        &self,
        exam_id: &str,
        username: &str,
    ) -> Result<Vec<AudioEvent>, StoreError> {
        (**self).find_audio_events(exam_id, username)
    }

    fn update_attempt_fields(
        &self,
        exam_id: &str,
        username: &str,
        fields: Vec<(&str, serde_json::Value)>,
    ) -> Result<(), StoreError> {
        (**self).update_attempt_fields(exam_id, username, fields)
    }

    fn update_attempt_field(
        &self,
        exam_id: &str,
        username: &str,
        field: &str,
        value: serde_json::Value,
    ) -> Result<(), StoreError> {
        (**self).update_attempt_field(exam_id, username, field, value)
    }

    fn list_attempts(&self, exam_id: &str) -> Result<Vec<String>, StoreError> {
        (**self).list_attempts(exam_id)
    }
}
