//! Markdown and JSON report generation.
//!
//! This module renders analysis results for reviewers: a per-attempt
//! breakdown of signal scores, an exam-wide overview, the submission-time
//! score and the companion-device report.

use crate::analysis::top_contributors;
use crate::models::{
    AttemptAnalysis, CheatingAnalysis, ExamAnalysis, MobileActivityReport, RiskLevel, RiskSummary,
    Signal, SubmissionScore,
};
use anyhow::Result;
use serde::Serialize;

/// Identifies the attempt a report is about.
#[derive(Debug, Clone, Serialize)]
pub struct AttemptRef<'a> {
    pub exam_id: &'a str,
    pub username: &'a str,
}

/// JSON envelope for single-attempt reports.
#[derive(Serialize)]
struct AttemptEnvelope<'a, T: Serialize> {
    #[serde(flatten)]
    attempt: &'a AttemptRef<'a>,
    #[serde(flatten)]
    body: &'a T,
}

/// Generate the Markdown report for one analyzed attempt.
pub fn generate_analysis_markdown(attempt: &AttemptRef<'_>, analysis: &CheatingAnalysis) -> String {
    let mut output = String::new();

    output.push_str("# Cheating Analysis\n\n");
    output.push_str(&generate_attempt_header(attempt));
    output.push_str(&format!(
        "- **Analyzed:** {}\n\n",
        analysis.timestamp.format("%Y-%m-%d %H:%M:%S UTC")
    ));

    output.push_str(&generate_risk_banner(analysis.total_score, analysis.risk_level));
    output.push_str(&generate_signal_table(analysis));
    output.push_str(&generate_contributors_section(analysis));
    output.push_str(&generate_footer());

    output
}

/// Generate the Markdown overview of an exam-wide batch.
pub fn generate_exam_markdown(exam: &ExamAnalysis) -> String {
    let mut output = String::new();

    output.push_str("# Exam Cheating Overview\n\n");
    output.push_str(&format!("- **Exam:** `{}`\n", exam.exam_id));
    output.push_str(&format!(
        "- **Analysis Date:** {}\n",
        exam.analysis_date.format("%Y-%m-%d %H:%M:%S UTC")
    ));
    output.push_str(&format!("- **Attempts:** {}\n", exam.summary.total));
    output.push_str(&format!(
        "- **Analysis Duration:** {:.1}s\n\n",
        exam.duration_seconds
    ));

    output.push_str(&generate_summary_section(&exam.summary));
    output.push_str(&generate_attempts_table(&exam.attempts));
    output.push_str(&generate_footer());

    output
}

/// Generate the Markdown report for a submission-time score.
pub fn generate_submission_markdown(attempt: Option<&AttemptRef<'_>>, score: &SubmissionScore) -> String {
    let mut output = String::new();
    let factors = &score.cheating_factors;
    let level = score.risk_level();

    output.push_str("# Submission Cheating Score\n\n");
    if let Some(attempt) = attempt {
        output.push_str(&generate_attempt_header(attempt));
        output.push('\n');
    }

    output.push_str(&format!(
        "## {} {}% ({} Risk)\n\n",
        level.emoji(),
        score.cheating_score,
        level
    ));

    output.push_str("| Factor | Count |\n");
    output.push_str("|:---|:---:|\n");
    output.push_str(&format!("| Cursor warnings | {} |\n", factors.cursor_warnings));
    output.push_str(&format!("| Suspicious frames | {} |\n", factors.suspicious_frames));
    output.push_str(&format!("| Abnormal audio | {} |\n", factors.abnormal_audio));
    output.push_str(&format!("| Tab switches | {} |\n\n", factors.tab_switches));

    output.push_str(&format!("> {}\n\n", risk_assessment(level)));
    output.push_str(&generate_footer());

    output
}

/// Generate the Markdown report for companion-device activity.
pub fn generate_mobile_markdown(attempt: &AttemptRef<'_>, report: &MobileActivityReport) -> String {
    let mut output = String::new();

    output.push_str("# Mobile Activity\n\n");
    output.push_str(&generate_attempt_header(attempt));
    output.push('\n');

    output.push_str("| Total Events | Focus Violations | Screen Changes | Network Changes | Battery Issues |\n");
    output.push_str("|:---:|:---:|:---:|:---:|:---:|\n");
    output.push_str(&format!(
        "| {} | {} | {} | {} | {} |\n\n",
        report.total_events,
        report.focus_violations,
        report.screen_changes,
        report.network_changes,
        report.battery_issues
    ));

    if report.suspicious_periods.is_empty() {
        output.push_str("No focus violations were recorded.\n\n");
    } else {
        output.push_str("## Suspicious Periods\n\n");
        output.push_str("| Start | End | Duration |\n");
        output.push_str("|:---|:---|:---:|\n");
        for period in &report.suspicious_periods {
            output.push_str(&format!(
                "| {} | {} | {:.1}s |\n",
                period.start, period.end, period.duration
            ));
        }
        output.push('\n');
    }

    output.push_str(&generate_footer());
    output
}

/// Serialize any single-attempt result as JSON, tagged with its key.
pub fn generate_attempt_json<T: Serialize>(attempt: &AttemptRef<'_>, body: &T) -> Result<String> {
    let envelope = AttemptEnvelope { attempt, body };
    serde_json::to_string_pretty(&envelope).map_err(Into::into)
}

/// Generate a JSON report.
pub fn generate_json_report<T: Serialize>(report: &T) -> Result<String> {
    serde_json::to_string_pretty(report).map_err(Into::into)
}

fn generate_attempt_header(attempt: &AttemptRef<'_>) -> String {
    format!(
        "- **Exam:** `{}`\n- **Student:** `{}`\n",
        attempt.exam_id, attempt.username
    )
}

fn generate_risk_banner(total: f64, level: RiskLevel) -> String {
    format!(
        "## {} {} Risk (score {:.3})\n\n> {}\n\n",
        level.emoji(),
        level,
        total,
        risk_assessment(level)
    )
}

fn generate_signal_table(analysis: &CheatingAnalysis) -> String {
    let mut section = String::new();

    section.push_str("## Signal Scores\n\n");
    section.push_str("| Signal | Score | Weight | Contribution |\n");
    section.push_str("|:---|:---:|:---:|:---:|\n");

    for signal in Signal::ALL {
        section.push_str(&format!(
            "| {} | {:.3} | {:.2} | {:.3} |\n",
            signal,
            analysis.detailed_scores.get(signal),
            signal.weight(),
            analysis.detailed_scores.contribution(signal)
        ));
    }
    section.push_str(&format!(
        "| **Total** | | | **{:.3}** |\n\n",
        analysis.total_score
    ));

    section
}

fn generate_contributors_section(analysis: &CheatingAnalysis) -> String {
    let contributors = top_contributors(&analysis.detailed_scores);
    if contributors.is_empty() {
        return "No suspicious activity was detected.\n\n".to_string();
    }

    let mut section = String::new();
    section.push_str("## Main Contributors\n\n");
    for (i, (signal, contribution)) in contributors.iter().take(3).enumerate() {
        section.push_str(&format!("{}. {} (+{:.3})\n", i + 1, signal, contribution));
    }
    section.push('\n');

    section
}

fn generate_summary_section(summary: &RiskSummary) -> String {
    let mut section = String::new();

    section.push_str("## Summary\n\n");
    section.push_str(&format!(
        "| {} High | {} Medium | {} Low | Failed | **Total** |\n",
        RiskLevel::High.emoji(),
        RiskLevel::Medium.emoji(),
        RiskLevel::Low.emoji(),
    ));
    section.push_str("|:---:|:---:|:---:|:---:|:---:|\n");
    section.push_str(&format!(
        "| {} | {} | {} | {} | **{}** |\n\n",
        summary.high, summary.medium, summary.low, summary.failed, summary.total
    ));

    section
}

fn generate_attempts_table(attempts: &[AttemptAnalysis]) -> String {
    let mut section = String::new();

    section.push_str("## Attempts\n\n");
    if attempts.is_empty() {
        section.push_str("No attempts were found for this exam.\n\n");
        return section;
    }

    // Highest risk first, failures last
    let mut sorted: Vec<&AttemptAnalysis> = attempts.iter().collect();
    sorted.sort_by(|a, b| {
        let score = |entry: &AttemptAnalysis| entry.analysis.as_ref().map(|r| r.total_score);
        score(b)
            .partial_cmp(&score(a))
            .unwrap_or(std::cmp::Ordering::Equal)
    });

    section.push_str("| Student | Score | Risk |\n");
    section.push_str("|:---|:---:|:---|\n");
    for attempt in sorted {
        match (&attempt.analysis, &attempt.error) {
            (Some(analysis), _) => section.push_str(&format!(
                "| `{}` | {:.3} | {} {} |\n",
                attempt.username,
                analysis.total_score,
                analysis.risk_level.emoji(),
                analysis.risk_level
            )),
            (None, error) => section.push_str(&format!(
                "| `{}` | - | ⚠️ {} |\n",
                attempt.username,
                error.as_deref().unwrap_or("analysis failed")
            )),
        }
    }
    section.push('\n');

    section
}

fn risk_assessment(level: RiskLevel) -> &'static str {
    match level {
        RiskLevel::High => {
            "High risk of academic misconduct detected. Multiple suspicious activities observed."
        }
        RiskLevel::Medium => {
            "Medium risk of academic misconduct. Some suspicious activities detected."
        }
        RiskLevel::Low => {
            "Low risk of academic misconduct. No significant suspicious activities detected."
        }
    }
}

fn generate_footer() -> String {
    "---\n\n*Report generated by ProctorScore*\n".to_string()
}
