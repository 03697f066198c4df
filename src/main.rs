//! ProctorScore - cheating-risk scoring for proctored online exams
//!
//! A CLI tool that scores exam attempts from a snapshot of recorded
//! telemetry and renders Markdown or JSON reports for reviewers.
//!
//! Exit codes:
//!   0 - Success (no attempt at the --fail-on level, or no --fail-on set)
//!   1 - Runtime error (missing attempt, malformed telemetry, bad config, etc.)
//!   2 - An attempt reached the --fail-on risk level

mod cli;
mod config;

use anyhow::{Context, Result};
use cli::{Args, Command, OutputFormat};
use config::{Config, CONFIG_FILE};
use indicatif::{ProgressBar, ProgressStyle};
use proctorscore::models::{RiskLevel, SubmissionCounters, SubmissionScore};
use proctorscore::report::{self, AttemptRef};
use proctorscore::store::{AttemptStore, MemoryStore};
use proctorscore::CheatingAnalysisService;
use std::sync::Arc;
use tracing::{debug, error, info, warn};
use tracing_subscriber::filter::LevelFilter;
use tracing_subscriber::{EnvFilter, FmtSubscriber};

type Service = CheatingAnalysisService<Arc<MemoryStore>>;

/// A rendered report plus the risk levels it covers.
struct Outcome {
    report: String,
    levels: Vec<RiskLevel>,
}

#[tokio::main]
async fn main() -> Result<()> {
    // Parse command-line arguments
    let args = Args::parse_args();

    // Validate arguments
    if let Err(e) = args.validate() {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }

    // Handle init-config early (no logging needed)
    if matches!(args.command, Command::InitConfig) {
        return handle_init_config();
    }

    // Configuration is read before logging so the file can set verbosity
    let mut config = match load_config(&args) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("Error: {:#}", e);
            std::process::exit(1);
        }
    };
    config.merge_with_args(&args);

    init_logging(config.log_level(&args))?;

    info!("ProctorScore v{}", env!("CARGO_PKG_VERSION"));
    debug!("Arguments: {:?}", args);
    debug!("Effective config: {:?}", config);

    match run(args, config).await {
        Ok(exit_code) => {
            std::process::exit(exit_code);
        }
        Err(e) => {
            error!("Analysis failed: {:#}", e);
            eprintln!("\n❌ Error: {:#}", e);
            std::process::exit(1);
        }
    }
}

/// Handle init-config: generate a default .proctorscore.toml.
fn handle_init_config() -> Result<()> {
    let path = std::path::Path::new(CONFIG_FILE);

    if path.exists() {
        eprintln!(
            "⚠️  {} already exists. Remove it first or edit it manually.",
            CONFIG_FILE
        );
        std::process::exit(1);
    }

    let content = Config::default_toml();
    std::fs::write(path, &content).with_context(|| format!("Failed to write {}", CONFIG_FILE))?;

    println!("✅ Created {} with default settings.", CONFIG_FILE);
    println!("   Edit it to set the snapshot path, concurrency and timestamp policy.");
    Ok(())
}

/// Initialize logging at the given level.
///
/// `RUST_LOG` overrides the level chosen by --verbose / --quiet and the
/// config file. Logs go to stderr so reports printed to stdout stay clean.
fn init_logging(level: tracing::Level) -> Result<()> {
    let filter = EnvFilter::builder()
        .with_default_directive(LevelFilter::from_level(level).into())
        .from_env_lossy();

    let subscriber = FmtSubscriber::builder()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .with_thread_ids(false)
        .with_file(false)
        .with_line_number(false)
        .compact()
        .finish();

    tracing::subscriber::set_global_default(subscriber)
        .context("Failed to set tracing subscriber")
}

/// Run the selected command. Returns exit code (0 or 2).
async fn run(args: Args, config: Config) -> Result<i32> {
    let outcome = match &args.command {
        Command::SubmissionScore {
            exam: None,
            cursor_warnings,
            suspicious_frames,
            abnormal_audio,
            tab_switches,
            ..
        } => {
            // Counters given directly; no snapshot involved.
            let counters = SubmissionCounters {
                cursor_warnings: cursor_warnings.unwrap_or(0),
                suspicious_frames: suspicious_frames.unwrap_or(0),
                abnormal_audio: abnormal_audio.unwrap_or(0),
                tab_switches: tab_switches.unwrap_or(0),
            };
            let score = SubmissionScore::from_counters(counters);
            Outcome {
                report: render_submission(&args, None, &score)?,
                levels: vec![score.risk_level()],
            }
        }
        command => {
            let store = Arc::new(
                MemoryStore::load(&config.store.snapshot).context("Failed to open attempt store")?,
            );
            let service = CheatingAnalysisService::new(Arc::clone(&store))
                .with_policy(config.analysis.timestamp_policy)
                .with_persist(config.analysis.persist);

            let outcome = run_with_store(&args, &config, command, service).await?;

            if config.analysis.persist && command.writes_results() {
                store
                    .save(&config.store.snapshot)
                    .context("Failed to save attempt store")?;
                info!("Results written to {}", config.store.snapshot.display());
            }
            outcome
        }
    };

    write_report(&config, &outcome.report)?;

    // Check --fail-on threshold
    if let Some(fail_level) = args.fail_on {
        if outcome.levels.iter().any(|l| fail_level.is_reached_by(*l)) {
            eprintln!(
                "\n⛔ Attempt at or above {:?} risk found. Failing (exit code 2).",
                fail_level
            );
            return Ok(2);
        }
    }

    Ok(0)
}

/// Run a command that reads from the attempt store.
async fn run_with_store(
    args: &Args,
    config: &Config,
    command: &Command,
    service: Service,
) -> Result<Outcome> {
    let outcome = match command {
        Command::Analyze { exam, user } => {
            let analysis = service.compute_cheating_analysis(exam, user)?;
            let attempt = AttemptRef {
                exam_id: exam,
                username: user,
            };
            let report = match args.format {
                OutputFormat::Json => report::generate_attempt_json(&attempt, &analysis)?,
                OutputFormat::Markdown => report::generate_analysis_markdown(&attempt, &analysis),
            };
            Outcome {
                report,
                levels: vec![analysis.risk_level],
            }
        }
        Command::AnalyzeExam { exam, .. } => {
            analyze_exam(args, config, exam, Arc::new(service)).await?
        }
        Command::SubmissionScore {
            exam: Some(exam),
            user: Some(user),
            ..
        } => {
            let score = service.compute_submission_score(exam, user)?;
            let attempt = AttemptRef {
                exam_id: exam,
                username: user,
            };
            Outcome {
                report: render_submission(args, Some(&attempt), &score)?,
                levels: vec![score.risk_level()],
            }
        }
        Command::MobileReport { exam, user } => {
            let mobile = service.mobile_activity_report(exam, user)?;
            let attempt = AttemptRef {
                exam_id: exam,
                username: user,
            };
            let report = match args.format {
                OutputFormat::Json => report::generate_attempt_json(&attempt, &mobile)?,
                OutputFormat::Markdown => report::generate_mobile_markdown(&attempt, &mobile),
            };
            Outcome {
                report,
                levels: Vec::new(),
            }
        }
        Command::SubmissionScore { .. } | Command::InitConfig => {
            anyhow::bail!("Command does not use the attempt store")
        }
    };

    Ok(outcome)
}

/// Analyze every attempt of an exam with a progress bar.
async fn analyze_exam(
    args: &Args,
    config: &Config,
    exam: &str,
    service: Arc<Service>,
) -> Result<Outcome> {
    let total = service.store().list_attempts(exam)?.len();
    if total == 0 {
        warn!("No attempts found for exam {}", exam);
    }

    let progress_bar = if args.quiet {
        ProgressBar::hidden()
    } else {
        let pb = ProgressBar::new(total as u64);
        pb.set_style(
            ProgressStyle::default_bar()
                .template(
                    "{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} {msg}",
                )
                .context("Invalid progress bar template")?
                .progress_chars("#>-"),
        );
        pb
    };

    let exam_analysis = service
        .analyze_exam(exam, config.general.concurrency, |attempt| {
            progress_bar.set_message(attempt.username.clone());
            progress_bar.inc(1);
        })
        .await?;
    progress_bar.finish_with_message("Analysis complete");

    let summary = &exam_analysis.summary;
    eprintln!("\n📊 Exam Summary:");
    eprintln!("   Attempts: {}", summary.total);
    eprintln!(
        "   - 🔴 High: {} | 🟡 Medium: {} | 🟢 Low: {} | ⚠️ Failed: {}",
        summary.high, summary.medium, summary.low, summary.failed
    );
    eprintln!("   Duration: {:.1}s", exam_analysis.duration_seconds);

    let levels = exam_analysis
        .attempts
        .iter()
        .filter_map(|a| a.analysis.as_ref().map(|analysis| analysis.risk_level))
        .collect();

    let report = match args.format {
        OutputFormat::Json => report::generate_json_report(&exam_analysis)?,
        OutputFormat::Markdown => report::generate_exam_markdown(&exam_analysis),
    };

    Ok(Outcome { report, levels })
}

fn render_submission(
    args: &Args,
    attempt: Option<&AttemptRef<'_>>,
    score: &SubmissionScore,
) -> Result<String> {
    Ok(match (args.format, attempt) {
        (OutputFormat::Json, Some(attempt)) => report::generate_attempt_json(attempt, score)?,
        (OutputFormat::Json, None) => report::generate_json_report(score)?,
        (OutputFormat::Markdown, _) => report::generate_submission_markdown(attempt, score),
    })
}

/// Write the report to the configured file, or stdout when none is set.
fn write_report(config: &Config, report: &str) -> Result<()> {
    match config.general.output {
        Some(ref path) => {
            std::fs::write(path, report)
                .with_context(|| format!("Failed to write report to {}", path.display()))?;
            eprintln!("\n✅ Report saved to: {}", path.display());
        }
        None => print!("{}", report),
    }
    Ok(())
}

/// Load configuration from file or use defaults.
///
/// Runs before logging is initialized, so problems are reported on stderr.
fn load_config(args: &Args) -> Result<Config> {
    // Try explicit config path
    if let Some(ref config_path) = args.config {
        return Config::load(config_path);
    }

    // Try default location
    match Config::load_default() {
        Ok(Some(config)) => Ok(config),
        Ok(None) => Ok(Config::default()),
        Err(e) => {
            eprintln!("⚠️  Failed to load {}: {:#}. Using defaults.", CONFIG_FILE, e);
            Ok(Config::default())
        }
    }
}
