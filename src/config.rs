//! Configuration file handling.
//!
//! This module handles loading and merging configuration from
//! `.proctorscore.toml` files.

use anyhow::{Context, Result};
use proctorscore::TimestampPolicy;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Default configuration file name.
pub const CONFIG_FILE: &str = ".proctorscore.toml";

/// Root configuration structure.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    /// General settings.
    #[serde(default)]
    pub general: GeneralConfig,

    /// Attempt store settings.
    #[serde(default)]
    pub store: StoreConfig,

    /// Analysis settings.
    #[serde(default)]
    pub analysis: AnalysisConfig,
}

/// General application settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GeneralConfig {
    /// Default report output path. Reports go to stdout when unset.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub output: Option<PathBuf>,

    /// Enable verbose logging by default.
    #[serde(default)]
    pub verbose: bool,

    /// Number of attempts analyzed concurrently in exam-wide runs.
    #[serde(default = "default_concurrency")]
    pub concurrency: usize,
}

impl Default for GeneralConfig {
    fn default() -> Self {
        Self {
            output: None,
            verbose: false,
            concurrency: default_concurrency(),
        }
    }
}

fn default_concurrency() -> usize {
    4
}

/// Attempt store settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StoreConfig {
    /// JSON snapshot holding attempts and telemetry.
    #[serde(default = "default_snapshot")]
    pub snapshot: PathBuf,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            snapshot: default_snapshot(),
        }
    }
}

fn default_snapshot() -> PathBuf {
    PathBuf::from("proctor_snapshot.json")
}

/// Analysis settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AnalysisConfig {
    /// How malformed timestamps are handled: "strict" or "lenient".
    #[serde(default)]
    pub timestamp_policy: TimestampPolicy,

    /// Write results back to the snapshot.
    #[serde(default = "default_true")]
    pub persist: bool,
}

impl Default for AnalysisConfig {
    fn default() -> Self {
        Self {
            timestamp_policy: TimestampPolicy::default(),
            persist: true,
        }
    }
}

fn default_true() -> bool {
    true
}

impl Config {
    /// Load configuration from a file path.
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;

        let config: Config = toml::from_str(&content)
            .with_context(|| format!("Failed to parse config file: {}", path.display()))?;

        Ok(config)
    }

    /// Try to load configuration from the default location.
    ///
    /// Returns `Ok(None)` if the file doesn't exist, `Err` if it exists but can't be parsed.
    pub fn load_default() -> Result<Option<Self>> {
        let default_path = Path::new(CONFIG_FILE);

        if default_path.exists() {
            Ok(Some(Self::load(default_path)?))
        } else {
            Ok(None)
        }
    }

    /// Merge this configuration with CLI arguments.
    ///
    /// CLI arguments take precedence over config file settings, but only
    /// when they were actually given.
    pub fn merge_with_args(&mut self, args: &crate::cli::Args) {
        if let Some(ref store) = args.store {
            self.store.snapshot = store.clone();
        }

        if let Some(ref output) = args.output {
            self.general.output = Some(output.clone());
        }

        if let crate::cli::Command::AnalyzeExam {
            concurrency: Some(concurrency),
            ..
        } = args.command
        {
            self.general.concurrency = concurrency;
        }

        if args.lenient_timestamps {
            self.analysis.timestamp_policy = TimestampPolicy::Lenient;
        }

        if args.no_persist {
            self.analysis.persist = false;
        }

        if args.verbose {
            self.general.verbose = true;
        }
    }

    /// Log level after merging: `verbose = true` in the file raises the
    /// level to DEBUG unless --quiet was given.
    pub fn log_level(&self, args: &crate::cli::Args) -> tracing::Level {
        if self.general.verbose && !args.quiet {
            tracing::Level::DEBUG
        } else {
            args.log_level()
        }
    }

    /// Generate a default configuration file content.
    pub fn default_toml() -> String {
        let config = Config::default();
        toml::to_string_pretty(&config).unwrap_or_else(|_| String::new())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cli::{Args, Command, OutputFormat};

    fn make_args(command: Command) -> Args {
        Args {
            command,
            config: None,
            store: None,
            format: OutputFormat::Markdown,
            output: None,
            verbose: false,
            quiet: false,
            lenient_timestamps: false,
            no_persist: false,
            fail_on: None,
        }
    }

    #[test]
    fn test_default_config() {
        let config = Config::default();
        assert_eq!(config.general.concurrency, 4);
        assert_eq!(config.store.snapshot, PathBuf::from("proctor_snapshot.json"));
        assert_eq!(config.analysis.timestamp_policy, TimestampPolicy::Strict);
        assert!(config.analysis.persist);
    }

    #[test]
    fn test_parse_config() {
        let toml_content = r#"
[general]
output = "report.md"
concurrency = 8

[store]
snapshot = "/var/lib/proctor/snapshot.json"

[analysis]
timestamp_policy = "lenient"
persist = false
"#;

        let config: Config = toml::from_str(toml_content).unwrap();
        assert_eq!(config.general.output, Some(PathBuf::from("report.md")));
        assert_eq!(config.general.concurrency, 8);
        assert_eq!(
            config.store.snapshot,
            PathBuf::from("/var/lib/proctor/snapshot.json")
        );
        assert_eq!(config.analysis.timestamp_policy, TimestampPolicy::Lenient);
        assert!(!config.analysis.persist);
    }

    #[test]
    fn test_merge_with_args() {
        let mut config = Config::default();
        let mut args = make_args(Command::AnalyzeExam {
            exam: "midterm".to_string(),
            concurrency: Some(2),
        });
        args.store = Some(PathBuf::from("other.json"));
        args.lenient_timestamps = true;
        args.no_persist = true;

        config.merge_with_args(&args);
        assert_eq!(config.general.concurrency, 2);
        assert_eq!(config.store.snapshot, PathBuf::from("other.json"));
        assert_eq!(config.analysis.timestamp_policy, TimestampPolicy::Lenient);
        assert!(!config.analysis.persist);
    }

    #[test]
    fn test_merge_keeps_file_values_without_flags() {
        let mut config = Config::default();
        config.analysis.timestamp_policy = TimestampPolicy::Lenient;

        config.merge_with_args(&make_args(Command::InitConfig));
        assert_eq!(config.analysis.timestamp_policy, TimestampPolicy::Lenient);
        assert!(config.analysis.persist);
    }

    #[test]
    fn test_verbose_in_file_raises_log_level() {
        let mut config: Config = toml::from_str("[general]\nverbose = true\n").unwrap();
        let args = make_args(Command::InitConfig);
        config.merge_with_args(&args);
        assert_eq!(config.log_level(&args), tracing::Level::DEBUG);

        let mut quiet = make_args(Command::InitConfig);
        quiet.quiet = true;
        assert_eq!(config.log_level(&quiet), tracing::Level::ERROR);

        let plain = Config::default();
        assert_eq!(plain.log_level(&args), tracing::Level::INFO);
    }

    #[test]
    fn test_default_toml_generation() {
        let toml_str = Config::default_toml();
        assert!(toml_str.contains("[general]"));
        assert!(toml_str.contains("[store]"));
        assert!(toml_str.contains("[analysis]"));
        assert!(toml_str.contains("timestamp_policy = \"strict\""));
    }
}
