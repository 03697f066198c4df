//! Command-line interface argument parsing.
//!
//! This module handles all CLI argument parsing using clap,
//! including validation and default values.

use clap::{Parser, Subcommand};
use proctorscore::models::RiskLevel;
use std::path::PathBuf;

/// ProctorScore - cheating-risk scoring for proctored online exams
///
/// Scores exam attempts from recorded telemetry (keystrokes, tab switches,
/// window resizes, companion-device activity, audio and webcam frames)
/// and renders Markdown/JSON reports.
///
/// Examples:
///   proctorscore analyze --exam midterm --user alice
///   proctorscore analyze-exam --exam midterm --concurrency 8 --fail-on high
///   proctorscore submission-score --exam midterm --user alice --format json
///   proctorscore submission-score --cursor-warnings 11 --tab-switches 6
///   proctorscore mobile-report --exam midterm --user alice
///   proctorscore init-config
#[derive(Parser, Debug, Clone)]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Args {
    #[command(subcommand)]
    pub command: Command,

    /// Path to configuration file
    ///
    /// If not specified, looks for .proctorscore.toml in the current directory
    #[arg(short, long, global = true, value_name = "FILE")]
    pub config: Option<PathBuf>,

    /// JSON snapshot holding attempts and telemetry
    #[arg(
        short,
        long,
        global = true,
        value_name = "FILE",
        env = "PROCTORSCORE_STORE"
    )]
    pub store: Option<PathBuf>,

    /// Output format (markdown, json)
    #[arg(long, global = true, default_value = "markdown", value_name = "FORMAT")]
    pub format: OutputFormat,

    /// Output file path for the report (stdout if omitted)
    #[arg(short, long, global = true, value_name = "FILE")]
    pub output: Option<PathBuf>,

    /// Enable verbose logging output
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Run in quiet mode (minimal output)
    #[arg(short, long, global = true)]
    pub quiet: bool,

    /// Score a signal 0.0 instead of failing when it has a malformed timestamp
    #[arg(long, global = true)]
    pub lenient_timestamps: bool,

    /// Do not write results back to the snapshot
    #[arg(long, global = true)]
    pub no_persist: bool,

    /// Fail if an attempt reaches this risk level
    ///
    /// Useful for CI pipelines. Exit code 2 when threshold is reached.
    /// Values: low, medium, high
    #[arg(long, global = true, value_name = "LEVEL")]
    pub fail_on: Option<FailOnLevel>,
}

/// Available subcommands.
#[derive(Subcommand, Debug, Clone)]
pub enum Command {
    /// Run the weighted six-signal analysis for one attempt
    Analyze {
        /// Exam identifier
        #[arg(short, long)]
        exam: String,
        /// Student username
        #[arg(short, long)]
        user: String,
    },

    /// Analyze every attempt of an exam
    AnalyzeExam {
        /// Exam identifier
        #[arg(short, long)]
        exam: String,
        /// Number of attempts analyzed concurrently
        #[arg(long, value_name = "NUM")]
        concurrency: Option<usize>,
    },

    /// Compute the additive submission-time score
    ///
    /// Reads counters from a stored attempt, or takes them directly
    /// from the flags when no attempt is given.
    SubmissionScore {
        /// Exam identifier
        #[arg(short, long, requires = "user")]
        exam: Option<String>,
        /// Student username
        #[arg(short, long, requires = "exam")]
        user: Option<String>,
        /// Cursor-left-window warnings
        #[arg(long, value_name = "COUNT")]
        cursor_warnings: Option<u32>,
        /// Frames with forbidden objects or a missing or extra person
        #[arg(long, value_name = "COUNT")]
        suspicious_frames: Option<u32>,
        /// Abnormal audio recordings
        #[arg(long, value_name = "COUNT")]
        abnormal_audio: Option<u32>,
        /// Tab switches reported by the companion device
        #[arg(long, value_name = "COUNT")]
        tab_switches: Option<u32>,
    },

    /// Report companion-device focus violations for one attempt
    MobileReport {
        /// Exam identifier
        #[arg(short, long)]
        exam: String,
        /// Student username
        #[arg(short, long)]
        user: String,
    },

    /// Generate a default .proctorscore.toml configuration file
    InitConfig,
}

/// Output format for the report.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, clap::ValueEnum)]
pub enum OutputFormat {
    /// Markdown format (default)
    #[default]
    Markdown,
    /// JSON format
    Json,
}

/// Risk level for --fail-on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, clap::ValueEnum)]
pub enum FailOnLevel {
    Low,
    Medium,
    High,
}

impl FailOnLevel {
    /// Whether an attempt at `level` reaches this threshold.
    pub fn is_reached_by(self, level: RiskLevel) -> bool {
        let rank = match level {
            RiskLevel::Low => FailOnLevel::Low,
            RiskLevel::Medium => FailOnLevel::Medium,
            RiskLevel::High => FailOnLevel::High,
        };
        rank >= self
    }
}

impl Command {
    /// Whether the command may write results back to the snapshot.
    pub fn writes_results(&self) -> bool {
        match self {
            Command::Analyze { .. } | Command::AnalyzeExam { .. } => true,
            Command::SubmissionScore { exam, .. } => exam.is_some(),
            Command::MobileReport { .. } | Command::InitConfig => false,
        }
    }
}

impl Args {
    /// Parse command-line arguments.
    pub fn parse_args() -> Self {
        Self::parse()
    }

    /// Validate the parsed arguments.
    pub fn validate(&self) -> Result<(), String> {
        if self.verbose && self.quiet {
            return Err("Cannot use both --verbose and --quiet".to_string());
        }

        match &self.command {
            Command::Analyze { exam, user } | Command::MobileReport { exam, user } => {
                validate_key(exam, user)?;
            }
            Command::AnalyzeExam { exam, concurrency } => {
                if exam.trim().is_empty() {
                    return Err("Exam identifier must not be empty".to_string());
                }
                if *concurrency == Some(0) {
                    return Err("Concurrency must be at least 1".to_string());
                }
            }
            Command::SubmissionScore {
                exam,
                user,
                cursor_warnings,
                suspicious_frames,
                abnormal_audio,
                tab_switches,
            } => {
                let has_counters = cursor_warnings.is_some()
                    || suspicious_frames.is_some()
                    || abnormal_audio.is_some()
                    || tab_switches.is_some();

                match (exam, user) {
                    (Some(exam), Some(user)) => {
                        validate_key(exam, user)?;
                        if has_counters {
                            return Err(
                                "Counter flags cannot be combined with --exam/--user".to_string()
                            );
                        }
                    }
                    (None, None) if !has_counters => {
                        return Err(
                            "Give either --exam and --user or at least one counter flag"
                                .to_string(),
                        );
                    }
                    (None, None) => {}
                    _ => return Err("--exam and --user must be given together".to_string()),
                }
            }
            Command::InitConfig => {}
        }

        Ok(())
    }

    /// Returns the log level based on verbosity settings.
    pub fn log_level(&self) -> tracing::Level {
        if self.quiet {
            tracing::Level::ERROR
        } else if self.verbose {
            tracing::Level::DEBUG
        } else {
            tracing::Level::INFO
        }
    }
}

fn validate_key(exam: &str, user: &str) -> Result<(), String> {
    if exam.trim().is_empty() {
        return Err("Exam identifier must not be empty".to_string());
    }
    if user.trim().is_empty() {
        return Err("Username must not be empty".to_string());
    }
    Ok(())
}
