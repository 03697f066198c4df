//! Submission-time cheating score.
//!
//! A step-function score in `0..=100` computed from four raw counters when
//! the student submits. It is tuned independently of the weighted risk
//! aggregator and the two are not expected to agree.

use crate::models::{Frame, MonitoringEvent, SubmissionCounters, SubmissionScore};

/// Upper bound of the submission score.
pub const SUBMISSION_SCORE_CAP: u32 = 100;

/// Step thresholds for one counter: `(exclusive lower bound, points)`,
/// checked from the highest bound down.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SubmissionTier {
    pub steps: [(u32, u32); 3],
}

impl SubmissionTier {
    pub const CURSOR_WARNINGS: SubmissionTier = SubmissionTier {
        steps: [(10, 20), (5, 10), (0, 5)],
    };
    pub const SUSPICIOUS_FRAMES: SubmissionTier = SubmissionTier {
        steps: [(5, 30), (2, 20), (0, 10)],
    };
    pub const ABNORMAL_AUDIO: SubmissionTier = SubmissionTier {
        steps: [(3, 25), (1, 15), (0, 5)],
    };
    pub const TAB_SWITCHES: SubmissionTier = SubmissionTier {
        steps: [(5, 25), (2, 15), (0, 5)],
    };

    /// Points awarded for `count`.
    pub fn points(&self, count: u32) -> u32 {
        self.steps
            .iter()
            .find(|(bound, _)| count > *bound)
            .map(|(_, points)| *points)
            .unwrap_or(0)
    }
}

/// Compute the capped submission-time score.
pub fn compute_submission_cheating_score(counters: &SubmissionCounters) -> u32 {
    let sum = SubmissionTier::CURSOR_WARNINGS.points(counters.cursor_warnings)
        + SubmissionTier::SUSPICIOUS_FRAMES.points(counters.suspicious_frames)
        + SubmissionTier::ABNORMAL_AUDIO.points(counters.abnormal_audio)
        + SubmissionTier::TAB_SWITCHES.points(counters.tab_switches);

    sum.min(SUBMISSION_SCORE_CAP)
}

impl SubmissionCounters {
    /// Gather counters from stored telemetry.
    ///
    /// Tab switches are the focus losses reported by the mobile device.
    pub fn collect(
        cursor_warnings: u32,
        abnormal_audios: usize,
        frames: &[Frame],
        mobile_events: &[MonitoringEvent],
    ) -> Self {
        Self {
            cursor_warnings,
            suspicious_frames: saturating_u32(frames.iter().filter(|f| f.is_suspicious()).count()),
            abnormal_audio: saturating_u32(abnormal_audios),
            tab_switches: saturating_u32(mobile_events.iter().filter(|e| e.is_focus_loss()).count()),
        }
    }
}

impl SubmissionScore {
    pub fn from_counters(counters: SubmissionCounters) -> Self {
        Self {
            cheating_score: compute_submission_cheating_score(&counters),
            cheating_factors: counters,
        }
    }
}

fn saturating_u32(count: usize) -> u32 {
    u32::try_from(count).unwrap_or(u32::MAX)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{DetectedObject, MobileEventKind};

    fn counters(cursor: u32, frames: u32, audio: u32, tabs: u32) -> SubmissionCounters {
        SubmissionCounters {
            cursor_warnings: cursor,
            suspicious_frames: frames,
            abnormal_audio: audio,
            tab_switches: tabs,
        }
    }

    #[test]
    fn test_zero_counters() {
        assert_eq!(compute_submission_cheating_score(&counters(0, 0, 0, 0)), 0);
    }

    #[test]
    fn test_cursor_tiers() {
        let tier = SubmissionTier::CURSOR_WARNINGS;
        assert_eq!(tier.points(0), 0);
        assert_eq!(tier.points(1), 5);
        assert_eq!(tier.points(5), 5);
        assert_eq!(tier.points(6), 10);
        assert_eq!(tier.points(10), 10);
        assert_eq!(tier.points(11), 20);
    }

    #[test]
    fn test_other_tiers() {
        assert_eq!(SubmissionTier::SUSPICIOUS_FRAMES.points(1), 10);
        assert_eq!(SubmissionTier::SUSPICIOUS_FRAMES.points(3), 20);
        assert_eq!(SubmissionTier::SUSPICIOUS_FRAMES.points(6), 30);
        assert_eq!(SubmissionTier::ABNORMAL_AUDIO.points(1), 5);
        assert_eq!(SubmissionTier::ABNORMAL_AUDIO.points(2), 15);
        assert_eq!(SubmissionTier::ABNORMAL_AUDIO.points(4), 25);
        assert_eq!(SubmissionTier::TAB_SWITCHES.points(2), 5);
        assert_eq!(SubmissionTier::TAB_SWITCHES.points(3), 15);
        assert_eq!(SubmissionTier::TAB_SWITCHES.points(6), 25);
    }

    #[test]
    fn test_maximum_is_exactly_capped() {
        assert_eq!(compute_submission_cheating_score(&counters(11, 6, 4, 6)), 100);
        assert_eq!(
            compute_submission_cheating_score(&counters(u32::MAX, u32::MAX, u32::MAX, u32::MAX)),
            100
        );
    }

    #[test]
    fn test_mixed_counters() {
        assert_eq!(compute_submission_cheating_score(&counters(3, 0, 2, 1)), 25);
    }

    #[test]
    fn test_collect_counters() {
        let frame = |labels: &[&str]| Frame {
            exam_id: "e1".to_string(),
            username: "alice".to_string(),
            timestamp: String::new(),
            objects: labels
                .iter()
                .map(|l| DetectedObject::Label(l.to_string()))
                .collect(),
        };
        let mobile = |kind| MonitoringEvent {
            username: "alice".to_string(),
            exam_id: "e1".to_string(),
            timestamp: "2024-05-01T10:00:00Z".to_string(),
            event: kind,
            screen_width: None,
            screen_height: None,
            battery_level: None,
            network_type: None,
        };

        let frames = vec![
            frame(&["person"]),
            frame(&["person", "cell phone"]),
            frame(&[]),
        ];
        let events = vec![
            mobile(MobileEventKind::Blur),
            mobile(MobileEventKind::Focus),
            mobile(MobileEventKind::VisibilityChange),
        ];

        let collected = SubmissionCounters::collect(7, 2, &frames, &events);
        assert_eq!(collected, counters(7, 2, 2, 2));

        let score = SubmissionScore::from_counters(collected);
        assert_eq!(score.cheating_score, 10 + 10 + 15 + 5);
    }
}
