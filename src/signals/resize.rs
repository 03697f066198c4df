//! Window-resize analysis.

use super::saturating_ratio;
use crate::models::ResizeEvent;

/// Relative change against the baseline that makes a resize significant.
pub const SIGNIFICANT_RESIZE_RATIO: f64 = 0.2;

/// Returns true if either dimension moved more than 20% from its baseline.
///
/// A missing baseline counts as 0, so any non-zero size is significant.
pub fn is_significant_resize(event: &ResizeEvent) -> bool {
    let baseline_width = event.baseline_width.unwrap_or(0.0);
    let baseline_height = event.baseline_height.unwrap_or(0.0);

    (event.screen_width - baseline_width).abs() > baseline_width * SIGNIFICANT_RESIZE_RATIO
        || (event.screen_height - baseline_height).abs()
            > baseline_height * SIGNIFICANT_RESIZE_RATIO
}

/// Score the share of resize events that were significant.
pub fn window_resize_score(events: &[ResizeEvent]) -> f64 {
    let significant = events.iter().filter(|e| is_significant_resize(e)).count();
    saturating_ratio(significant as u64, events.len() as u64)
}
