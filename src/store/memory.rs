//! In-memory document store.
//!
//! Documents are kept as raw JSON, the way a document database holds
//! them, and decoded into typed records on read. The whole store can be
//! loaded from and saved to a JSON snapshot file.

use super::AttemptStore;
use crate::error::StoreError;
use crate::models::{Attempt, AudioEvent, Frame, MonitoringEvent};
use crate::signals::parse_timestamp;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::path::Path;
use std::sync::{RwLock, RwLockReadGuard, RwLockWriteGuard};
use tracing::{debug, info};

/// Raw document collections.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Snapshot {
    #[serde(default)]
    pub attempted_exams: Vec<Value>,
    #[serde(default)]
    pub frames: Vec<Value>,
    #[serde(default)]
    pub mobile_activity_logs: Vec<Value>,
    #[serde(default)]
    pub audio_logs: Vec<Value>,
}

/// Thread-safe in-memory attempt store.
#[derive(Debug, Default)]
pub struct MemoryStore {
    inner: RwLock<Snapshot>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_snapshot(snapshot: Snapshot) -> Self {
        Self {
            inner: RwLock::new(snapshot),
        }
    }

    /// Load a store from a JSON snapshot file.
    pub fn load(path: &Path) -> Result<Self, StoreError> {
        let content = std::fs::read_to_string(path).map_err(|source| StoreError::Io {
            path: path.to_path_buf(),
            source,
        })?;

        let snapshot: Snapshot =
            serde_json::from_str(&content).map_err(|source| StoreError::Snapshot {
                path: path.to_path_buf(),
                source,
            })?;

        info!(
            "Loaded snapshot {} ({} attempts)",
            path.display(),
            snapshot.attempted_exams.len()
        );
        Ok(Self::from_snapshot(snapshot))
    }

    /// Write the current contents to a JSON snapshot file.
    pub fn save(&self, path: &Path) -> Result<(), StoreError> {
        let content = {
            let snapshot = self.read()?;
            serde_json::to_string_pretty(&*snapshot).map_err(|source| StoreError::Encode {
                what: "snapshot",
                source,
            })?
        };

        std::fs::write(path, content).map_err(|source| StoreError::Io {
            path: path.to_path_buf(),
            source,
        })?;

        debug!("Saved snapshot {}", path.display());
        Ok(())
    }

    /// Copy of the current contents.
    pub fn snapshot(&self) -> Result<Snapshot, StoreError> {
        Ok(self.read()?.clone())
    }

    /// Insert an attempt, replacing any attempt with the same key.
    pub fn upsert_attempt(&self, attempt: &Attempt) -> Result<(), StoreError> {
        let doc = encode(attempt, "attempt")?;
        let mut snapshot = self.write()?;

        match snapshot
            .attempted_exams
            .iter_mut()
            .find(|d| is_attempt(d, &attempt.exam_id, &attempt.username))
        {
            Some(existing) => *existing = doc,
            None => snapshot.attempted_exams.push(doc),
        }
        Ok(())
    }

    pub fn insert_frame(&self, frame: &Frame) -> Result<(), StoreError> {
        let doc = encode(frame, "frame")?;
        self.write()?.frames.push(doc);
        Ok(())
    }

    pub fn insert_mobile_event(&self, event: &MonitoringEvent) -> Result<(), StoreError> {
        let doc = encode(event, "mobile event")?;
        self.write()?.mobile_activity_logs.push(doc);
        Ok(())
    }

    pub fn insert_audio_event(&self, event: &AudioEvent) -> Result<(), StoreError> {
        let doc = encode(event, "audio event")?;
        self.write()?.audio_logs.push(doc);
        Ok(())
    }

    fn read(&self) -> Result<RwLockReadGuard<'_, Snapshot>, StoreError> {
        self.inner.read().map_err(|_| StoreError::Poisoned)
    }

    fn write(&self) -> Result<RwLockWriteGuard<'_, Snapshot>, StoreError> {
        self.inner.write().map_err(|_| StoreError::Poisoned)
    }
}

impl AttemptStore for MemoryStore {
    fn find_attempt(&self, exam_id: &str, username: &str) -> Result<Option<Attempt>, StoreError> {
        let snapshot = self.read()?;
        snapshot
            .attempted_exams
            .iter()
            .find(|d| is_attempt(d, exam_id, username))
            .map(|d| decode(d, "attempted_exams"))
            .transpose()
    }

    fn find_frames(&self, exam_id: &str, username: &str) -> Result<Vec<Frame>, StoreError> {
        let snapshot = self.read()?;
        select(&snapshot.frames, "exam_id", exam_id, username, "frames")
    }

    fn find_mobile_events(
        &self,
        exam_id: &str,
        username: &str,
    ) -> Result<Vec<MonitoringEvent>, StoreError> {
        let snapshot = self.read()?;
        let mut events: Vec<MonitoringEvent> = select(
            &snapshot.mobile_activity_logs,
            "examId",
            exam_id,
            username,
            "mobile_activity_logs",
        )?;
        // By instant; unparsable timestamps go last in string order
        events.sort_by_cached_key(|e| {
            let instant = parse_timestamp(&e.timestamp);
            (instant.is_none(), instant, e.timestamp.clone())
        });
        Ok(events)
    }

    fn find_audio_events(
        &self,
        exam_id: &str,
        username: &str,
    ) -> Result<Vec<AudioEvent>, StoreError> {
        let snapshot = self.read()?;
        select(&snapshot.audio_logs, "examId", exam_id, username, "audio_logs")
    }

    fn update_attempt_fields(
        &self,
        exam_id: &str,
        username: &str,
        fields: Vec<(&str, Value)>,
    ) -> Result<(), StoreError> {
        let mut snapshot = self.write()?;
        let doc = snapshot
            .attempted_exams
            .iter_mut()
            .find(|d| is_attempt(d, exam_id, username))
            .and_then(Value::as_object_mut)
            .ok_or_else(|| StoreError::MissingAttempt {
                exam_id: exam_id.to_string(),
                username: username.to_string(),
            })?;

        for (field, value) in fields {
            debug!("Updated {} on attempt {}/{}", field, exam_id, username);
            doc.insert(field.to_string(), value);
        }
        Ok(())
    }

    fn list_attempts(&self, exam_id: &str) -> Result<Vec<String>, StoreError> {
        let snapshot = self.read()?;
        let mut usernames: Vec<String> = snapshot
            .attempted_exams
            .iter()
            .filter(|d| d.get("examId").and_then(Value::as_str) == Some(exam_id))
            .filter_map(|d| d.get("username").and_then(Value::as_str))
            .map(String::from)
            .collect();
        usernames.sort();
        usernames.dedup();
        Ok(usernames)
    }
}

fn is_attempt(doc: &Value, exam_id: &str, username: &str) -> bool {
    belongs_to(doc, "examId", exam_id, username)
}

fn belongs_to(doc: &Value, exam_field: &str, exam_id: &str, username: &str) -> bool {
    doc.get(exam_field).and_then(Value::as_str) == Some(exam_id)
        && doc.get("username").and_then(Value::as_str) == Some(username)
}

fn select<T: DeserializeOwned>(
    docs: &[Value],
    exam_field: &str,
    exam_id: &str,
    username: &str,
    collection: &'static str,
) -> Result<Vec<T>, StoreError> {
    docs.iter()
        .filter(|d| belongs_to(d, exam_field, exam_id, username))
        .map(|d| decode(d, collection))
        .collect()
}

fn decode<T: DeserializeOwned>(doc: &Value, collection: &'static str) -> Result<T, StoreError> {
    T::deserialize(doc).map_err(|source| StoreError::Decode { collection, source })
}

fn encode<T: Serialize>(record: &T, what: &'static str) -> Result<Value, StoreError> {
    serde_json::to_value(record).map_err(|source| StoreError::Encode { what, source })
}
