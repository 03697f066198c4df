//! Multi-signal risk aggregation.
//!
//! This module runs the six signal extractors over one attempt's
//! telemetry and combines their scores into a weighted, tiered
//! [`CheatingAnalysis`].

use crate::error::AnalysisError;
use crate::models::{
    Attempt, AudioEvent, CheatingAnalysis, DetailedScores, Frame, KeylogBuckets, MonitoringEvent,
    ResizeEvent, RiskLevel, Signal, TabEvent,
};
use crate::signals::{
    audio_anomalies_score, face_detection_score, keylog_score, mobile_activity_score,
    tab_switching_score, window_resize_score, TimestampPolicy,
};
use chrono::{DateTime, Utc};
use tracing::{debug, warn};

/// All telemetry for one attempt, as read from the store.
#[derive(Debug, Clone, Default)]
pub struct SignalBundle {
    pub suspicious_keylogs: KeylogBuckets,
    pub tab_events: Vec<TabEvent>,
    pub resize_events: Vec<ResizeEvent>,
    pub mobile_events: Vec<MonitoringEvent>,
    pub audio_events: Vec<AudioEvent>,
    pub frames: Vec<Frame>,
}

impl SignalBundle {
    /// Assemble a bundle from an attempt record and its side collections.
    pub fn from_attempt(
        attempt: Attempt,
        mobile_events: Vec<MonitoringEvent>,
        audio_events: Vec<AudioEvent>,
        frames: Vec<Frame>,
    ) -> Self {
        Self {
            suspicious_keylogs: attempt.suspicious_keylogs,
            tab_events: attempt.tab_events,
            resize_events: attempt.resize_events,
            mobile_events,
            audio_events,
            frames,
        }
    }
}

/// Combines signal scores into a risk assessment.
#[derive(Debug, Clone, Copy, Default)]
pub struct RiskAggregator {
    policy: TimestampPolicy,
}

impl RiskAggregator {
    pub fn new(policy: TimestampPolicy) -> Self {
        Self { policy }
    }

    pub fn policy(&self) -> TimestampPolicy {
        self.policy
    }

    /// Run every extractor over the bundle.
    pub fn score_signals(&self, bundle: &SignalBundle) -> Result<DetailedScores, AnalysisError> {
        let tab_switching_score = self.recover(
            Signal::TabSwitching,
            tab_switching_score(&bundle.tab_events),
        )?;

        let scores = DetailedScores {
            keylog_score: keylog_score(&bundle.suspicious_keylogs),
            tab_switching_score,
            window_resize_score: window_resize_score(&bundle.resize_events),
            mobile_activity_score: mobile_activity_score(&bundle.mobile_events),
            audio_anomalies_score: audio_anomalies_score(&bundle.audio_events),
            face_detection_score: face_detection_score(&bundle.frames),
        };

        debug!("Signal scores: {:?}", scores);
        Ok(scores)
    }

    /// Analyze the bundle, stamping the result with the current time.
    pub fn aggregate(&self, bundle: &SignalBundle) -> Result<CheatingAnalysis, AnalysisError> {
        self.aggregate_at(bundle, Utc::now())
    }

    /// Analyze the bundle, stamping the result with `now`.
    pub fn aggregate_at(
        &self,
        bundle: &SignalBundle,
        now: DateTime<Utc>,
    ) -> Result<CheatingAnalysis, AnalysisError> {
        let scores = self.score_signals(bundle)?;
        Ok(combine(scores, now))
    }

    /// Apply the timestamp policy to one extractor's outcome.
    fn recover(&self, signal: Signal, result: Result<f64, AnalysisError>) -> Result<f64, AnalysisError> {
        match result {
            Err(e @ AnalysisError::MalformedTimestamp { .. })
                if self.policy == TimestampPolicy::Lenient =>
            {
                warn!("Scoring {} as 0.0: {}", signal, e);
                Ok(0.0)
            }
            other => other,
        }
    }
}

/// Weighted sum of the six scores. Lies in `[0, 1]` since weights sum to 1.
pub fn weighted_total(scores: &DetailedScores) -> f64 {
    Signal::ALL.iter().map(|s| scores.contribution(*s)).sum()
}

/// Round a score to 3 decimal places.
pub fn round_score(score: f64) -> f64 {
    (score * 1000.0).round() / 1000.0
}

/// Build the final analysis from per-signal scores.
///
/// The tier is decided on the rounded total, so `risk_level` always agrees
/// with the stored `total_score`.
pub fn combine(scores: DetailedScores, now: DateTime<Utc>) -> CheatingAnalysis {
    let total = round_score(weighted_total(&scores));

    CheatingAnalysis {
        detailed_scores: scores,
        total_score: total,
        risk_level: RiskLevel::from_score(total),
        timestamp: now,
    }
}

/// Signals ordered by their contribution to the total, largest first.
pub fn top_contributors(scores: &DetailedScores) -> Vec<(Signal, f64)> {
    let mut contributions: Vec<(Signal, f64)> = Signal::ALL
        .iter()
        .map(|s| (*s, scores.contribution(*s)))
        .filter(|(_, c)| *c > 0.0)
        .collect();

    contributions.sort_by(|a, b| b.1.partial_cmp(&a.1).unwrap_or(std::cmp::Ordering::Equal));
    contributions
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use std::collections::BTreeMap;

    fn fixed_now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 5, 1, 12, 0, 0).unwrap()
    }

    fn tab_events(timestamps: &[&str]) -> Vec<TabEvent> {
        timestamps
            .iter()
            .map(|t| TabEvent {
                timestamp: t.to_string(),
            })
            .collect()
    }

    #[test]
    fn test_empty_bundle_is_low_risk() {
        let analysis = RiskAggregator::default()
            .aggregate_at(&SignalBundle::default(), fixed_now())
            .unwrap();

        assert_eq!(analysis.detailed_scores, DetailedScores::default());
        assert_eq!(analysis.total_score, 0.0);
        assert_eq!(analysis.risk_level, RiskLevel::Low);
        assert_eq!(analysis.timestamp, fixed_now());
    }

    #[test]
    fn test_keylog_only_stays_low() {
        let mut bundle = SignalBundle::default();
        bundle.suspicious_keylogs.insert(
            "t1".to_string(),
            BTreeMap::from([("ctrl+c".to_string(), 3), ("alt+tab".to_string(), 2)]),
        );

        let analysis = RiskAggregator::default()
            .aggregate_at(&bundle, fixed_now())
            .unwrap();

        assert_eq!(analysis.detailed_scores.keylog_score, 1.0);
        assert_eq!(analysis.total_score, 0.3);
        assert_eq!(analysis.risk_level, RiskLevel::Low);
    }

    #[test]
    fn test_combine_weights_and_tiers() {
        let scores = DetailedScores {
            keylog_score: 1.0,
            audio_anomalies_score: 1.0,
            face_detection_score: 1.0,
            ..DetailedScores::default()
        };
        let analysis = combine(scores, fixed_now());
        assert_eq!(analysis.total_score, 0.6);
        assert_eq!(analysis.risk_level, RiskLevel::Medium);

        let all = DetailedScores {
            keylog_score: 1.0,
            tab_switching_score: 1.0,
            window_resize_score: 1.0,
            mobile_activity_score: 1.0,
            audio_anomalies_score: 1.0,
            face_detection_score: 1.0,
        };
        let analysis = combine(all, fixed_now());
        assert_eq!(analysis.total_score, 1.0);
        assert_eq!(analysis.risk_level, RiskLevel::High);
    }

    #[test]
    fn test_boundary_total_keeps_its_tier() {
        // Sums to 0.39999999999999997 before rounding.
        let scores = DetailedScores {
            mobile_activity_score: 1.0,
            audio_anomalies_score: 1.0,
            face_detection_score: 0.5,
            ..DetailedScores::default()
        };
        let analysis = combine(scores, fixed_now());

        assert_eq!(analysis.total_score, 0.4);
        assert_eq!(analysis.risk_level, RiskLevel::Medium);
        assert_eq!(
            analysis.risk_level,
            RiskLevel::from_score(analysis.total_score)
        );
    }

    #[test]
    fn test_total_is_rounded_to_three_decimals() {
        let scores = DetailedScores {
            tab_switching_score: 1.0 / 3.0,
            ..DetailedScores::default()
        };
        let analysis = combine(scores, fixed_now());
        assert_eq!(analysis.total_score, 0.05);

        assert_eq!(round_score(0.123456), 0.123);
        assert_eq!(round_score(0.9996), 1.0);
    }

    #[test]
    fn test_strict_policy_aborts_on_bad_timestamp() {
        let bundle = SignalBundle {
            tab_events: tab_events(&["2024-05-01T10:00:00Z", "later"]),
            ..SignalBundle::default()
        };

        let err = RiskAggregator::new(TimestampPolicy::Strict)
            .aggregate_at(&bundle, fixed_now())
            .unwrap_err();
        assert!(matches!(err, AnalysisError::MalformedTimestamp { .. }));
    }

    #[test]
    fn test_lenient_policy_zeroes_signal() {
        let mut bundle = SignalBundle {
            tab_events: tab_events(&["2024-05-01T10:00:00Z", "later"]),
            ..SignalBundle::default()
        };
        bundle.audio_events.push(AudioEvent {
            exam_id: "e1".to_string(),
            username: "alice".to_string(),
            timestamp: String::new(),
            is_abnormal: true,
        });

        let analysis = RiskAggregator::new(TimestampPolicy::Lenient)
            .aggregate_at(&bundle, fixed_now())
            .unwrap();
        assert_eq!(analysis.detailed_scores.tab_switching_score, 0.0);
        assert_eq!(analysis.detailed_scores.audio_anomalies_score, 1.0);
        assert_eq!(analysis.total_score, 0.2);
    }

    #[test]
    fn test_top_contributors() {
        let scores = DetailedScores {
            keylog_score: 0.5,
            audio_anomalies_score: 1.0,
            ..DetailedScores::default()
        };
        let top = top_contributors(&scores);
        assert_eq!(top.len(), 2);
        assert_eq!(top[0].0, Signal::AudioAnomalies);
        assert_eq!(top[1].0, Signal::Keylog);
    }
}
