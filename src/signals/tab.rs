//! Tab-switch frequency analysis.

use super::timestamp::require_timestamp;
use crate::error::AnalysisError;
use crate::models::TabEvent;

/// Average gap (seconds) at and above which tab switching scores zero.
pub const TAB_SWITCH_WINDOW_SECS: f64 = 5.0;

/// Score how rapidly the student switched tabs.
///
/// Linear in the mean gap between consecutive events: a mean of 0s scores
/// 1.0, a mean of [`TAB_SWITCH_WINDOW_SECS`] or more scores 0.0. Fewer than
/// two events score 0.0. Any unparsable timestamp fails the whole signal.
pub fn tab_switching_score(events: &[TabEvent]) -> Result<f64, AnalysisError> {
    if events.len() < 2 {
        return Ok(0.0);
    }

    let timestamps = events
        .iter()
        .map(|e| require_timestamp("tab switch", &e.timestamp))
        .collect::<Result<Vec<_>, _>>()?;

    let deltas: Vec<f64> = timestamps
        .windows(2)
        .map(|pair| (pair[1] - pair[0]).num_milliseconds() as f64 / 1000.0)
        .collect();

    let avg_delta = deltas.iter().sum::<f64>() / deltas.len() as f64;
    Ok((1.0 - avg_delta / TAB_SWITCH_WINDOW_SECS).clamp(0.0, 1.0))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn events(timestamps: &[&str]) -> Vec<TabEvent> {
        timestamps
            .iter()
            .map(|t| TabEvent {
                timestamp: t.to_string(),
            })
            .collect()
    }

    #[test]
    fn test_fewer_than_two_events() {
        assert_eq!(tab_switching_score(&[]).unwrap(), 0.0);
        assert_eq!(
            tab_switching_score(&events(&["2024-05-01T10:00:00Z"])).unwrap(),
            0.0
        );
    }

    #[test]
    fn test_one_second_gaps() {
        let evs = events(&[
            "2024-05-01T10:00:00Z",
            "2024-05-01T10:00:01Z",
            "2024-05-01T10:00:02Z",
        ]);
        let score = tab_switching_score(&evs).unwrap();
        assert!((score - 0.8).abs() < 1e-9);
    }

    #[test]
    fn test_slow_switching_scores_zero() {
        let evs = events(&["2024-05-01T10:00:00Z", "2024-05-01T10:00:30Z"]);
        assert_eq!(tab_switching_score(&evs).unwrap(), 0.0);
    }

    #[test]
    fn test_out_of_order_events_saturate() {
        let evs = events(&["2024-05-01T10:00:10Z", "2024-05-01T10:00:00Z"]);
        assert_eq!(tab_switching_score(&evs).unwrap(), 1.0);
    }

    #[test]
    fn test_malformed_timestamp_fails() {
        let evs = events(&["2024-05-01T10:00:00Z", "not a time"]);
        let err = tab_switching_score(&evs).unwrap_err();
        assert!(matches!(err, AnalysisError::MalformedTimestamp { .. }));
    }
}
