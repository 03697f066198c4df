//! Data models for the cheating-risk engine.
//!
//! This module contains the attempt record and telemetry documents read
//! from the attempt store, plus the analysis results written back to it.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

/// Keystroke logs: time bucket -> (pattern -> occurrence count).
pub type KeylogBuckets = BTreeMap<String, BTreeMap<String, u64>>;

/// One exam attempt, keyed by `(examId, username)`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Attempt {
    /// Exam identifier.
    pub exam_id: String,
    /// Student username.
    pub username: String,
    /// Suspicious keystroke patterns, already filtered upstream.
    #[serde(default)]
    pub suspicious_keylogs: KeylogBuckets,
    /// Tab switch events in arrival order.
    #[serde(default)]
    pub tab_events: Vec<TabEvent>,
    /// Window resize events.
    #[serde(default)]
    pub resize_events: Vec<ResizeEvent>,
    /// Number of times the cursor left the exam window.
    #[serde(default)]
    pub cursor_warning_count: u32,
    /// Abnormal audio clips reported at submission time.
    #[serde(default)]
    pub abnormal_audios: Vec<serde_json::Value>,
    /// Latest on-demand analysis, if one was computed.
    #[serde(
        rename = "cheating_analysis",
        default,
        skip_serializing_if = "Option::is_none"
    )]
    pub cheating_analysis: Option<CheatingAnalysis>,
}

impl Attempt {
    /// Creates an empty attempt for the given key.
    pub fn new(exam_id: impl Into<String>, username: impl Into<String>) -> Self {
        Self {
            exam_id: exam_id.into(),
            username: username.into(),
            ..Self::default()
        }
    }
}

/// A browser tab switch.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TabEvent {
    /// ISO-8601 timestamp.
    pub timestamp: String,
}

/// A window resize relative to the size at exam start.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ResizeEvent {
    pub screen_width: f64,
    pub screen_height: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub baseline_width: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub baseline_height: Option<f64>,
}

/// Kind of event reported by the companion mobile device.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MobileEventKind {
    Blur,
    Focus,
    VisibilityChange,
    Resize,
    #[default]
    Heartbeat,
    /// Any event name this engine does not know about.
    #[serde(other)]
    Other,
}

/// Telemetry from the companion mobile device.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MonitoringEvent {
    pub username: String,
    pub exam_id: String,
    /// ISO-8601 timestamp.
    pub timestamp: String,
    #[serde(default)]
    pub event: MobileEventKind,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub screen_width: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub screen_height: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub battery_level: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub network_type: Option<String>,
}

impl MonitoringEvent {
    /// Returns true if the exam page lost focus on the device.
    pub fn is_focus_loss(&self) -> bool {
        matches!(
            self.event,
            MobileEventKind::Blur | MobileEventKind::VisibilityChange
        )
    }
}

/// An object reported by the external detector.
///
/// Detectors either emit a bare label or a record with a `class` field.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum DetectedObject {
    Label(String),
    Detection {
        #[serde(rename = "class")]
        label: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        confidence: Option<f64>,
    },
}

impl DetectedObject {
    pub fn label(&self) -> &str {
        match self {
            DetectedObject::Label(label) => label,
            DetectedObject::Detection { label, .. } => label,
        }
    }
}

/// Labels that flag a frame regardless of how many people are visible.
pub const FORBIDDEN_OBJECTS: [&str; 2] = ["cell phone", "laptop"];

/// A webcam frame after object detection.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Frame {
    pub exam_id: String,
    pub username: String,
    #[serde(default)]
    pub timestamp: String,
    #[serde(default)]
    pub objects: Vec<DetectedObject>,
}

impl Frame {
    /// Number of `person` detections in the frame.
    pub fn person_count(&self) -> usize {
        self.objects.iter().filter(|o| o.label() == "person").count()
    }

    /// Returns true if nobody or more than one person is visible.
    pub fn has_presence_issue(&self) -> bool {
        let persons = self.person_count();
        persons == 0 || persons > 1
    }

    /// Returns true if the frame counts toward the submission-time
    /// suspicious frame counter.
    pub fn is_suspicious(&self) -> bool {
        self.has_presence_issue()
            || self
                .objects
                .iter()
                .any(|o| FORBIDDEN_OBJECTS.contains(&o.label()))
    }
}

/// Audio window classified by the external analyzer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AudioEvent {
    pub exam_id: String,
    pub username: String,
    #[serde(default)]
    pub timestamp: String,
    #[serde(default)]
    pub is_abnormal: bool,
}

/// Risk tier of an analyzed attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum RiskLevel {
    Low,
    Medium,
    High,
}

impl RiskLevel {
    /// Lower bound (inclusive) of the High tier.
    pub const HIGH_THRESHOLD: f64 = 0.7;
    /// Lower bound (inclusive) of the Medium tier.
    pub const MEDIUM_THRESHOLD: f64 = 0.4;

    /// Classifies a total score in `[0, 1]`, evaluated high to low.
    pub fn from_score(score: f64) -> Self {
        if score >= Self::HIGH_THRESHOLD {
            RiskLevel::High
        } else if score >= Self::MEDIUM_THRESHOLD {
            RiskLevel::Medium
        } else {
            RiskLevel::Low
        }
    }

    /// Classifies a submission-time score in `0..=100`.
    pub fn from_percent(score: u32) -> Self {
        Self::from_score(f64::from(score) / 100.0)
    }

    /// Returns an emoji representation of the tier.
    pub fn emoji(&self) -> &'static str {
        match self {
            RiskLevel::Low => "🟢",
            RiskLevel::Medium => "🟡",
            RiskLevel::High => "🔴",
        }
    }
}

impl fmt::Display for RiskLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RiskLevel::Low => write!(f, "Low"),
            RiskLevel::Medium => write!(f, "Medium"),
            RiskLevel::High => write!(f, "High"),
        }
    }
}

/// The six monitored signals, in report order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Signal {
    Keylog,
    TabSwitching,
    WindowResize,
    MobileActivity,
    AudioAnomalies,
    FaceDetection,
}

impl Signal {
    pub const ALL: [Signal; 6] = [
        Signal::Keylog,
        Signal::TabSwitching,
        Signal::WindowResize,
        Signal::MobileActivity,
        Signal::AudioAnomalies,
        Signal::FaceDetection,
    ];

    /// Fixed aggregation weight. The six weights sum to 1.0.
    pub fn weight(&self) -> f64 {
        match self {
            Signal::Keylog => 0.30,
            Signal::TabSwitching => 0.15,
            Signal::WindowResize => 0.10,
            Signal::MobileActivity => 0.15,
            Signal::AudioAnomalies => 0.20,
            Signal::FaceDetection => 0.10,
        }
    }

    /// Key used in `detailed_scores`.
    pub fn key(&self) -> &'static str {
        match self {
            Signal::Keylog => "keylog_score",
            Signal::TabSwitching => "tab_switching_score",
            Signal::WindowResize => "window_resize_score",
            Signal::MobileActivity => "mobile_activity_score",
            Signal::AudioAnomalies => "audio_anomalies_score",
            Signal::FaceDetection => "face_detection_score",
        }
    }
}

impl fmt::Display for Signal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Signal::Keylog => write!(f, "Keystroke patterns"),
            Signal::TabSwitching => write!(f, "Tab switching"),
            Signal::WindowResize => write!(f, "Window resize"),
            Signal::MobileActivity => write!(f, "Mobile activity"),
            Signal::AudioAnomalies => write!(f, "Audio anomalies"),
            Signal::FaceDetection => write!(f, "Face detection"),
        }
    }
}

/// Per-signal scores, each in `[0, 1]`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct DetailedScores {
    pub keylog_score: f64,
    pub tab_switching_score: f64,
    pub window_resize_score: f64,
    pub mobile_activity_score: f64,
    pub audio_anomalies_score: f64,
    pub face_detection_score: f64,
}

impl DetailedScores {
    pub fn get(&self, signal: Signal) -> f64 {
        match signal {
            Signal::Keylog => self.keylog_score,
            Signal::TabSwitching => self.tab_switching_score,
            Signal::WindowResize => self.window_resize_score,
            Signal::MobileActivity => self.mobile_activity_score,
            Signal::AudioAnomalies => self.audio_anomalies_score,
            Signal::FaceDetection => self.face_detection_score,
        }
    }

    /// Weighted contribution of one signal to the total.
    pub fn contribution(&self, signal: Signal) -> f64 {
        self.get(signal) * signal.weight()
    }
}

/// Result of the on-demand cheating analysis of one attempt.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CheatingAnalysis {
    pub detailed_scores: DetailedScores,
    /// Weighted total, rounded to 3 decimals.
    pub total_score: f64,
    pub risk_level: RiskLevel,
    /// When the analysis was computed.
    pub timestamp: DateTime<Utc>,
}

/// Raw counters feeding the submission-time score.
///
/// Serialized in the `cheatingFactors` shape the dashboards read.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SubmissionCounters {
    pub cursor_warnings: u32,
    pub suspicious_frames: u32,
    pub abnormal_audio: u32,
    pub tab_switches: u32,
}

/// Submission-time score in `0..=100` and the counters behind it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SubmissionScore {
    pub cheating_score: u32,
    pub cheating_factors: SubmissionCounters,
}

impl SubmissionScore {
    pub fn risk_level(&self) -> RiskLevel {
        RiskLevel::from_percent(self.cheating_score)
    }
}

/// A closed blur -> focus interval on the mobile device.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FocusViolation {
    pub start: String,
    pub end: String,
    /// Interval length in seconds.
    pub duration: f64,
}

/// Detailed breakdown of companion-device activity.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct MobileActivityReport {
    pub total_events: usize,
    pub focus_violations: usize,
    pub screen_changes: usize,
    pub network_changes: usize,
    pub battery_issues: usize,
    pub suspicious_periods: Vec<FocusViolation>,
}

/// Outcome of analyzing one attempt during an exam-wide batch.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AttemptAnalysis {
    pub username: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub analysis: Option<CheatingAnalysis>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl AttemptAnalysis {
    pub fn succeeded(username: String, analysis: CheatingAnalysis) -> Self {
        Self {
            username,
            analysis: Some(analysis),
            error: None,
        }
    }

    pub fn failed(username: String, error: String) -> Self {
        Self {
            username,
            analysis: None,
            error: Some(error),
        }
    }
}

/// Counts of analyzed attempts per risk tier.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RiskSummary {
    pub total: usize,
    pub high: usize,
    pub medium: usize,
    pub low: usize,
    pub failed: usize,
}

impl RiskSummary {
    /// Creates a summary from a batch of attempt outcomes.
    pub fn from_attempts(attempts: &[AttemptAnalysis]) -> Self {
        let mut summary = Self {
            total: attempts.len(),
            ..Self::default()
        };

        for attempt in attempts {
            match attempt.analysis.as_ref().map(|a| a.risk_level) {
                Some(RiskLevel::High) => summary.high += 1,
                Some(RiskLevel::Medium) => summary.medium += 1,
                Some(RiskLevel::Low) => summary.low += 1,
                None => summary.failed += 1,
            }
        }

        summary
    }
}

/// Exam-wide batch of attempt analyses.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExamAnalysis {
    pub exam_id: String,
    pub analysis_date: DateTime<Utc>,
    pub attempts: Vec<AttemptAnalysis>,
    pub summary: RiskSummary,
    pub duration_seconds: f64,
}
