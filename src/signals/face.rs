//! Face/person presence analysis.

use super::saturating_ratio;
use crate::models::Frame;

/// Score the share of frames showing nobody or more than one person.
pub fn face_detection_score(frames: &[Frame]) -> f64 {
    let flagged = frames.iter().filter(|f| f.has_presence_issue()).count();
    saturating_ratio(flagged as u64, frames.len() as u64)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::DetectedObject;

    fn frame(labels: &[&str]) -> Frame {
        Frame {
            exam_id: "e1".to_string(),
            username: "alice".to_string(),
            timestamp: String::new(),
            objects: labels
                .iter()
                .map(|l| DetectedObject::Label(l.to_string()))
                .collect(),
        }
    }

    #[test]
    fn test_empty_frames() {
        assert_eq!(face_detection_score(&[]), 0.0);
    }

    #[test]
    fn test_presence_issues() {
        let frames = vec![
            frame(&["person"]),
            frame(&["person", "book"]),
            frame(&[]),
            frame(&["person", "person"]),
        ];
        assert_eq!(face_detection_score(&frames), 0.5);
    }

    #[test]
    fn test_devices_do_not_affect_presence_score() {
        let frames = vec![frame(&["person", "cell phone"])];
        assert_eq!(face_detection_score(&frames), 0.0);
    }
}
