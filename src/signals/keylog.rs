//! Keystroke-pattern analysis.
//!
//! Upstream collectors only record keystrokes that already look
//! suspicious, so the ratio computed here is 1.0 for any log whose pattern
//! names all appear in [`SUSPICIOUS_PATTERNS`]. Patterns outside the
//! vocabulary (different spelling or case) dilute the score.

use super::saturating_ratio;
use crate::models::KeylogBuckets;

/// Pattern vocabulary, grouped by category. Matching is exact.
pub const SUSPICIOUS_PATTERNS: [(&str, &[&str]); 4] = [
    ("copy_paste", &["ctrl+c", "ctrl+v", "ctrl+x"]),
    ("shortcuts", &["alt+tab", "win+d", "win+e"]),
    ("browser", &["f5", "ctrl+r", "ctrl+l"]),
    ("capture", &["printscreen", "screenshot"]),
];

/// Returns true if `pattern` is part of the suspicious vocabulary.
pub fn is_suspicious_pattern(pattern: &str) -> bool {
    SUSPICIOUS_PATTERNS
        .iter()
        .any(|(_, patterns)| patterns.contains(&pattern))
}

/// Score the share of recorded keystrokes that match the vocabulary.
pub fn keylog_score(keylogs: &KeylogBuckets) -> f64 {
    let mut total = 0u64;
    let mut suspicious = 0u64;

    for counts in keylogs.values() {
        for (pattern, count) in counts {
            total = total.saturating_add(*count);
            if is_suspicious_pattern(pattern) {
                suspicious = suspicious.saturating_add(*count);
            }
        }
    }

    saturating_ratio(suspicious, total)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::BTreeMap;

    fn keylogs(entries: &[(&str, &[(&str, u64)])]) -> KeylogBuckets {
        entries
            .iter()
            .map(|(bucket, counts)| {
                let counts: BTreeMap<String, u64> =
                    counts.iter().map(|(p, c)| (p.to_string(), *c)).collect();
                (bucket.to_string(), counts)
            })
            .collect()
    }

    #[test]
    fn test_empty_keylogs() {
        assert_eq!(keylog_score(&KeylogBuckets::new()), 0.0);
        assert_eq!(keylog_score(&keylogs(&[("t1", &[])])), 0.0);
        assert_eq!(keylog_score(&keylogs(&[("t1", &[("ctrl+c", 0)])])), 0.0);
    }

    #[test]
    fn test_all_known_patterns_saturate() {
        let logs = keylogs(&[("t1", &[("ctrl+c", 3), ("alt+tab", 2)])]);
        assert_eq!(keylog_score(&logs), 1.0);
    }

    #[test]
    fn test_unknown_patterns_dilute() {
        let logs = keylogs(&[
            ("t1", &[("ctrl+v", 1), ("Ctrl+V", 1)]),
            ("t2", &[("printscreen", 1), ("print screen", 1)]),
        ]);
        assert_eq!(keylog_score(&logs), 0.5);
    }

    #[test]
    fn test_vocabulary_is_case_sensitive() {
        assert!(is_suspicious_pattern("f5"));
        assert!(!is_suspicious_pattern("F5"));
        assert!(is_suspicious_pattern("win+e"));
    }
}
