//! Attempt-level analysis service.
//!
//! Pulls one attempt's telemetry from an injected [`AttemptStore`], runs
//! the scorers and writes the result back onto the attempt record.

use super::aggregator::{RiskAggregator, SignalBundle};
use crate::error::{AnalysisError, StoreError};
use crate::models::{
    Attempt, AttemptAnalysis, CheatingAnalysis, ExamAnalysis, MobileActivityReport, RiskSummary,
    SubmissionCounters, SubmissionScore,
};
use crate::signals::{mobile_activity_report, TimestampPolicy};
use crate::store::{
    AttemptStore, CHEATING_ANALYSIS_FIELD, CHEATING_FACTORS_FIELD, CHEATING_SCORE_FIELD,
};
use chrono::Utc;
use futures::stream::{self, StreamExt};
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, info, warn};

/// Computes and persists cheating assessments for exam attempts.
pub struct CheatingAnalysisService<S> {
    store: S,
    aggregator: RiskAggregator,
    persist: bool,
}

impl<S: AttemptStore> CheatingAnalysisService<S> {
    /// Create a service with strict timestamp handling and write-back on.
    pub fn new(store: S) -> Self {
        Self {
            store,
            aggregator: RiskAggregator::default(),
            persist: true,
        }
    }

    pub fn with_policy(mut self, policy: TimestampPolicy) -> Self {
        self.aggregator = RiskAggregator::new(policy);
        self
    }

    /// Enable or disable writing results back to the store.
    pub fn with_persist(mut self, persist: bool) -> Self {
        self.persist = persist;
        self
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    /// Run the weighted risk analysis for one attempt.
    ///
    /// The result replaces the attempt's `cheating_analysis` field only
    /// after every signal has been scored.
    pub fn compute_cheating_analysis(
        &self,
        exam_id: &str,
        username: &str,
    ) -> Result<CheatingAnalysis, AnalysisError> {
        let attempt = self.load_attempt(exam_id, username)?;

        let bundle = SignalBundle::from_attempt(
            attempt,
            self.store.find_mobile_events(exam_id, username)?,
            self.store.find_audio_events(exam_id, username)?,
            self.store.find_frames(exam_id, username)?,
        );
        debug!(
            "Telemetry for {}/{}: {} tab, {} resize, {} mobile, {} audio, {} frames",
            exam_id,
            username,
            bundle.tab_events.len(),
            bundle.resize_events.len(),
            bundle.mobile_events.len(),
            bundle.audio_events.len(),
            bundle.frames.len()
        );

        let analysis = self.aggregator.aggregate(&bundle)?;
        info!(
            "Attempt {}/{} scored {:.3} ({})",
            exam_id, username, analysis.total_score, analysis.risk_level
        );

        if self.persist {
            let value = encode(&analysis, "cheating analysis")?;
            self.store
                .update_attempt_field(exam_id, username, CHEATING_ANALYSIS_FIELD, value)?;
        }

        Ok(analysis)
    }

    /// Compute the submission-time score for one attempt.
    pub fn compute_submission_score(
        &self,
        exam_id: &str,
        username: &str,
    ) -> Result<SubmissionScore, AnalysisError> {
        let attempt = self.load_attempt(exam_id, username)?;
        let frames = self.store.find_frames(exam_id, username)?;
        let mobile_events = self.store.find_mobile_events(exam_id, username)?;

        let counters = SubmissionCounters::collect(
            attempt.cursor_warning_count,
            attempt.abnormal_audios.len(),
            &frames,
            &mobile_events,
        );
        let score = SubmissionScore::from_counters(counters);
        info!(
            "Attempt {}/{} submission score {}",
            exam_id, username, score.cheating_score
        );

        if self.persist {
            // Score and factors are written together so they never disagree.
            let factors = encode(&score.cheating_factors, "cheating factors")?;
            self.store.update_attempt_fields(
                exam_id,
                username,
                vec![
                    (CHEATING_SCORE_FIELD, serde_json::Value::from(score.cheating_score)),
                    (CHEATING_FACTORS_FIELD, factors),
                ],
            )?;
        }

        Ok(score)
    }

    /// Build the companion-device activity report for one attempt.
    pub fn mobile_activity_report(
        &self,
        exam_id: &str,
        username: &str,
    ) -> Result<MobileActivityReport, AnalysisError> {
        let events = self.store.find_mobile_events(exam_id, username)?;
        mobile_activity_report(&events, self.aggregator.policy())
    }

    fn load_attempt(&self, exam_id: &str, username: &str) -> Result<Attempt, AnalysisError> {
        self.store
            .find_attempt(exam_id, username)?
            .ok_or_else(|| AnalysisError::AttemptNotFound {
                exam_id: exam_id.to_string(),
                username: username.to_string(),
            })
    }
}

impl<S: AttemptStore + 'static> CheatingAnalysisService<S> {
    /// Analyze every attempt of an exam, at most `concurrency` at a time.
    ///
    /// Failures are recorded per student; `on_attempt` is called as each
    /// attempt finishes.
    pub async fn analyze_exam<F>(
        self: Arc<Self>,
        exam_id: &str,
        concurrency: usize,
        mut on_attempt: F,
    ) -> Result<ExamAnalysis, AnalysisError>
    where
        F: FnMut(&AttemptAnalysis),
    {
        let start = Instant::now();
        let usernames = self.store.list_attempts(exam_id)?;
        info!("Analyzing {} attempts of exam {}", usernames.len(), exam_id);

        let mut results = stream::iter(usernames)
            .map(|username| {
                let service = Arc::clone(&self);
                let exam_id = exam_id.to_string();
                async move {
                    let task_user = username.clone();
                    let outcome = tokio::task::spawn_blocking(move || {
                        service.compute_cheating_analysis(&exam_id, &task_user)
                    })
                    .await;

                    match outcome {
                        Ok(Ok(analysis)) => AttemptAnalysis::succeeded(username, analysis),
                        Ok(Err(e)) => {
                            warn!("Analysis of {} failed: {}", username, e);
                            AttemptAnalysis::failed(username, e.to_string())
                        }
                        Err(e) => AttemptAnalysis::failed(username, format!("analysis task failed: {}", e)),
                    }
                }
            })
            .buffer_unordered(concurrency.max(1));

        let mut attempts = Vec::new();
        while let Some(attempt) = results.next().await {
            on_attempt(&attempt);
            attempts.push(attempt);
        }
        attempts.sort_by(|a, b| a.username.cmp(&b.username));

        Ok(ExamAnalysis {
            exam_id: exam_id.to_string(),
            analysis_date: Utc::now(),
            summary: RiskSummary::from_attempts(&attempts),
            attempts,
            duration_seconds: start.elapsed().as_secs_f64(),
        })
    }
}

fn encode<T: serde::Serialize>(value: &T, what: &'static str) -> Result<serde_json::Value, StoreError> {
    serde_json::to_value(value).map_err(|source| StoreError::Encode { what, source })
}
