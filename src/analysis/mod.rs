//! Analysis modules.
//!
//! The risk aggregator combines the six signal scores, the submission
//! scorer computes the independent 0-100 score, and the service wires both
//! to an attempt store.

pub mod aggregator;
pub mod service;
pub mod submission;

pub use aggregator::*;
pub use service::CheatingAnalysisService;
pub use submission::{compute_submission_cheating_score, SubmissionTier, SUBMISSION_SCORE_CAP};
