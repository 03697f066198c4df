//! Audio-anomaly analysis.

use super::saturating_ratio;
use crate::models::AudioEvent;

/// Score the share of audio windows flagged abnormal by the analyzer.
pub fn audio_anomalies_score(events: &[AudioEvent]) -> f64 {
    let abnormal = events.iter().filter(|e| e.is_abnormal).count();
    saturating_ratio(abnormal as u64, events.len() as u64)
}
