//! Companion mobile device analysis.
//!
//! Two views over the same event stream: a focus-loss ratio that feeds
//! the risk aggregator, and a detailed activity report that pairs
//! `blur` -> `focus` events into violation intervals.

use super::saturating_ratio;
use super::timestamp::{require_timestamp, TimestampPolicy};
use crate::error::AnalysisError;
use crate::models::{FocusViolation, MobileActivityReport, MobileEventKind, MonitoringEvent};
use tracing::warn;

/// Closed intervals longer than this many seconds are focus violations.
pub const FOCUS_VIOLATION_SECS: f64 = 5.0;

/// Battery levels below this fraction count as battery issues.
pub const LOW_BATTERY_LEVEL: f64 = 0.2;

/// Score the share of device events where the exam page lost focus.
pub fn mobile_activity_score(events: &[MonitoringEvent]) -> f64 {
    let focus_losses = events.iter().filter(|e| e.is_focus_loss()).count();
    saturating_ratio(focus_losses as u64, events.len() as u64)
}

/// Build the detailed activity report for one attempt.
///
/// `events` must be in non-decreasing timestamp order. A `blur` opens an
/// interval when none is open; the next `focus` closes it. An interval
/// still open when the stream ends is dropped.
pub fn mobile_activity_report(
    events: &[MonitoringEvent],
    policy: TimestampPolicy,
) -> Result<MobileActivityReport, AnalysisError> {
    let mut report = MobileActivityReport {
        total_events: events.len(),
        ..MobileActivityReport::default()
    };

    let mut intervals: Vec<(&str, &str)> = Vec::new();
    let mut open_since: Option<&str> = None;

    for (i, event) in events.iter().enumerate() {
        match event.event {
            MobileEventKind::Blur => {
                if open_since.is_none() {
                    open_since = Some(event.timestamp.as_str());
                }
            }
            MobileEventKind::Focus => {
                if let Some(start) = open_since.take() {
                    intervals.push((start, event.timestamp.as_str()));
                }
            }
            MobileEventKind::Resize => report.screen_changes += 1,
            _ => {}
        }

        if let Some(network) = event.network_type.as_deref() {
            let previous = i
                .checked_sub(1)
                .map(|p| events[p].network_type.as_deref());
            if matches!(previous, Some(prev) if prev != Some(network)) {
                report.network_changes += 1;
            }
        }

        // A level of exactly 0 is treated as "not reported".
        if matches!(event.battery_level, Some(level) if level > 0.0 && level < LOW_BATTERY_LEVEL) {
            report.battery_issues += 1;
        }
    }

    for (start, end) in intervals {
        let duration = match interval_seconds(start, end) {
            Ok(duration) => duration,
            Err(e) if policy == TimestampPolicy::Lenient => {
                warn!("Skipping focus interval: {}", e);
                continue;
            }
            Err(e) => return Err(e),
        };

        if duration > FOCUS_VIOLATION_SECS {
            report.focus_violations += 1;
            report.suspicious_periods.push(FocusViolation {
                start: start.to_string(),
                end: end.to_string(),
                duration,
            });
        }
    }

    Ok(report)
}

fn interval_seconds(start: &str, end: &str) -> Result<f64, AnalysisError> {
    let start = require_timestamp("mobile activity", start)?;
    let end = require_timestamp("mobile activity", end)?;
    Ok((end - start).num_milliseconds() as f64 / 1000.0)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn event(kind: MobileEventKind, timestamp: &str) -> MonitoringEvent {
        MonitoringEvent {
            username: "alice".to_string(),
            exam_id: "e1".to_string(),
            timestamp: timestamp.to_string(),
            event: kind,
            screen_width: None,
            screen_height: None,
            battery_level: None,
            network_type: None,
        }
    }

    #[test]
    fn test_activity_score() {
        assert_eq!(mobile_activity_score(&[]), 0.0);

        let events = vec![
            event(MobileEventKind::Blur, "2024-05-01T10:00:00Z"),
            event(MobileEventKind::Focus, "2024-05-01T10:00:01Z"),
            event(MobileEventKind::VisibilityChange, "2024-05-01T10:00:02Z"),
            event(MobileEventKind::Heartbeat, "2024-05-01T10:00:03Z"),
        ];
        assert_eq!(mobile_activity_score(&events), 0.5);
    }

    #[test]
    fn test_empty_report() {
        let report = mobile_activity_report(&[], TimestampPolicy::Strict).unwrap();
        assert_eq!(report, MobileActivityReport::default());
    }

    #[test]
    fn test_focus_violation_pairing() {
        let events = vec![
            event(MobileEventKind::Blur, "2024-05-01T10:00:00Z"),
            // A second blur keeps the original start.
            event(MobileEventKind::Blur, "2024-05-01T10:00:03Z"),
            event(MobileEventKind::Focus, "2024-05-01T10:00:08Z"),
            event(MobileEventKind::Blur, "2024-05-01T10:01:00Z"),
            event(MobileEventKind::Focus, "2024-05-01T10:01:02Z"),
            // Focus with nothing open is ignored.
            event(MobileEventKind::Focus, "2024-05-01T10:01:30Z"),
        ];

        let report = mobile_activity_report(&events, TimestampPolicy::Strict).unwrap();
        assert_eq!(report.total_events, 6);
        assert_eq!(report.focus_violations, 1);
        assert_eq!(report.suspicious_periods.len(), 1);
        assert_eq!(report.suspicious_periods[0].start, "2024-05-01T10:00:00Z");
        assert_eq!(report.suspicious_periods[0].duration, 8.0);
    }

    #[test]
    fn test_exactly_five_seconds_is_not_a_violation() {
        let events = vec![
            event(MobileEventKind::Blur, "2024-05-01T10:00:00Z"),
            event(MobileEventKind::Focus, "2024-05-01T10:00:05Z"),
        ];
        let report = mobile_activity_report(&events, TimestampPolicy::Strict).unwrap();
        assert_eq!(report.focus_violations, 0);
    }

    #[test]
    fn test_unclosed_interval_is_dropped() {
        let events = vec![
            event(MobileEventKind::Blur, "2024-05-01T10:00:00Z"),
            event(MobileEventKind::Heartbeat, "2024-05-01T10:05:00Z"),
        ];
        let report = mobile_activity_report(&events, TimestampPolicy::Strict).unwrap();
        assert_eq!(report.focus_violations, 0);
        assert!(report.suspicious_periods.is_empty());
    }

    #[test]
    fn test_device_counters() {
        let mut first = event(MobileEventKind::Heartbeat, "2024-05-01T10:00:00Z");
        first.network_type = Some("wifi".to_string());
        first.battery_level = Some(0.5);

        let mut second = event(MobileEventKind::Resize, "2024-05-01T10:00:10Z");
        second.network_type = Some("4g".to_string());
        second.battery_level = Some(0.1);

        let mut third = event(MobileEventKind::Heartbeat, "2024-05-01T10:00:20Z");
        third.network_type = Some("4g".to_string());
        third.battery_level = Some(0.0);

        let report =
            mobile_activity_report(&[first, second, third], TimestampPolicy::Strict).unwrap();
        assert_eq!(report.screen_changes, 1);
        assert_eq!(report.network_changes, 1);
        assert_eq!(report.battery_issues, 1);
    }

    #[test]
    fn test_network_type_after_missing_counts_as_change() {
        let first = event(MobileEventKind::Heartbeat, "2024-05-01T10:00:00Z");
        let mut second = event(MobileEventKind::Heartbeat, "2024-05-01T10:00:10Z");
        second.network_type = Some("wifi".to_string());

        let report = mobile_activity_report(&[first, second], TimestampPolicy::Strict).unwrap();
        assert_eq!(report.network_changes, 1);
    }

    #[test]
    fn test_malformed_interval_policies() {
        let events = vec![
            event(MobileEventKind::Blur, "garbage"),
            event(MobileEventKind::Focus, "2024-05-01T10:00:30Z"),
            event(MobileEventKind::Blur, "2024-05-01T10:01:00Z"),
            event(MobileEventKind::Focus, "2024-05-01T10:01:10Z"),
        ];

        assert!(mobile_activity_report(&events, TimestampPolicy::Strict).is_err());

        let report = mobile_activity_report(&events, TimestampPolicy::Lenient).unwrap();
        assert_eq!(report.focus_violations, 1);
        assert_eq!(report.suspicious_periods[0].duration, 10.0);
    }
}
