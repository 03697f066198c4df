//! ProctorScore - multi-signal cheating-risk scoring for online exams.
//!
//! The engine reads one exam attempt's monitoring telemetry (keystrokes,
//! tab switches, window resizes, companion-device events, audio and webcam
//! detections) from an [`store::AttemptStore`], scores each signal, and
//! combines the scores into an explainable [`models::CheatingAnalysis`].
//! A separate step-function score is computed at submission time.

pub mod analysis;
pub mod error;
pub mod models;
pub mod report;
pub mod signals;
pub mod store;

pub use analysis::{compute_submission_cheating_score, CheatingAnalysisService, RiskAggregator};
pub use error::{AnalysisError, StoreError};
pub use signals::TimestampPolicy;
