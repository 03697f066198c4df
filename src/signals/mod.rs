//! Signal extractors.
//!
//! Each extractor maps one slice of an attempt's telemetry to a score in
//! `[0, 1]`. Extractors are pure: empty input scores exactly 0.0 and no
//! extractor holds state between calls.

pub mod audio;
pub mod face;
pub mod keylog;
pub mod mobile;
pub mod resize;
pub mod tab;
pub mod timestamp;

pub use audio::audio_anomalies_score;
pub use face::face_detection_score;
pub use keylog::keylog_score;
pub use mobile::{mobile_activity_report, mobile_activity_score, FOCUS_VIOLATION_SECS};
pub use resize::window_resize_score;
pub use tab::tab_switching_score;
pub use timestamp::{parse_timestamp, TimestampPolicy};

/// `min(1, hits / total)`, or 0.0 when there is nothing to divide by.
pub(crate) fn saturating_ratio(hits: u64, total: u64) -> f64 {
    if total == 0 {
        return 0.0;
    }
    (hits as f64 / total as f64).min(1.0)
}
