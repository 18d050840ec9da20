//! CLI argument definitions using clap.

use clap::{Parser, Subcommand, ValueEnum};
use std::path::PathBuf;

/// Buffered - in-process batching buffer toolkit
#[derive(Parser, Debug)]
#[command(
    name = "buffered",
    author,
    version,
    about = "Batching buffer load generator and configuration tools",
    long_about = "Drives a batching buffer with concurrent submitters against a simulated \n\
                  batch processor, and validates or inspects buffer configuration files."
)]
pub struct Cli {
    /// Increase logging verbosity (-v for debug, -vv for trace)
    #[arg(short, long, action = clap::ArgAction::Count, global = true, env = "BUFFERED_VERBOSE")]
    pub verbose: u8,

    /// Suppress all output except errors
    #[arg(short, long, global = true, conflicts_with = "verbose")]
    pub quiet: bool,

    /// Log output format
    #[arg(
        long,
        value_enum,
        default_value = "pretty",
        global = true,
        env = "BUFFERED_LOG_FORMAT"
    )]
    pub log_format: LogFormat,

    #[command(subcommand)]
    pub command: Commands,
}

impl Cli {
    /// Tracing setup for the chosen verbosity and format
    ///
    /// `RUST_LOG` still wins over the flag-derived level.
    pub fn observability_config(&self) -> observability::ObservabilityConfig {
        let level = match (self.quiet, self.verbose) {
            (true, _) => "warn",
            (false, 0) => "info",
            (false, 1) => "debug",
            (false, _) => "trace",
        };
        observability::ObservabilityConfig {
            log_format: self.log_format.into(),
            metrics_port: None,
            default_log_level: level.to_string(),
        }
    }
}

/// Available CLI commands
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Run a load against a simulated processor
    Run(RunArgs),

    /// Validate configuration file without running
    Validate(ValidateArgs),

    /// Display effective buffer settings
    Info(InfoArgs),
}

/// Arguments for the `run` command
#[derive(Parser, Debug, Clone)]
pub struct RunArgs {
    /// Path to configuration file (TOML or JSON); defaults are used when absent
    #[arg(short, long, env = "BUFFERED_CONFIG")]
    pub config: Option<PathBuf>,

    /// Override the capacity threshold
    #[arg(long, env = "BUFFERED_MAX_CAPACITY")]
    pub max_capacity: Option<usize>,

    /// Override the flush period in milliseconds
    #[arg(long, env = "BUFFERED_FLUSH_PERIOD_MS")]
    pub flush_period_ms: Option<u64>,

    /// Override the cumulative weight threshold
    #[arg(long, env = "BUFFERED_MAX_DATA_SIZE")]
    pub max_data_size: Option<usize>,

    /// Number of items to submit concurrently
    #[arg(long, default_value = "1000")]
    pub items: u64,

    /// Payload size of every item in bytes (its weight)
    #[arg(long, default_value = "64")]
    pub item_size: usize,

    /// Simulated processing latency per batch in milliseconds
    #[arg(long, default_value = "5")]
    pub latency_ms: u64,

    /// Probability in [0, 1] that a whole batch fails
    #[arg(long, default_value = "0.0", value_parser = parse_probability)]
    pub failure_rate: f64,

    /// Metrics server port (0 = disabled)
    #[arg(long, default_value = "0", env = "BUFFERED_METRICS_PORT")]
    pub metrics_port: u16,
}

/// Arguments for the `validate` command
#[derive(Parser, Debug)]
pub struct ValidateArgs {
    /// Path to configuration file to validate
    #[arg(short, long, default_value = "buffer.toml")]
    pub config: PathBuf,

    /// Output validation result as JSON
    #[arg(long)]
    pub json: bool,
}

/// Arguments for the `info` command
#[derive(Parser, Debug)]
pub struct InfoArgs {
    /// Path to configuration file
    #[arg(short, long, default_value = "buffer.toml")]
    pub config: PathBuf,

    /// Output as JSON
    #[arg(long)]
    pub json: bool,
}

/// Log output format
#[derive(ValueEnum, Clone, Copy, Debug, Default)]
pub enum LogFormat {
    /// JSON structured logging
    Json,
    /// Human-readable pretty format
    #[default]
    Pretty,
    /// Compact single-line format
    Compact,
}

impl From<LogFormat> for observability::LogFormat {
    fn from(format: LogFormat) -> Self {
        match format {
            LogFormat::Json => Self::Json,
            LogFormat::Pretty => Self::Pretty,
            LogFormat::Compact => Self::Compact,
        }
    }
}

fn parse_probability(s: &str) -> Result<f64, String> {
    let value: f64 = s.parse().map_err(|e| format!("not a number: {e}"))?;
    if (0.0..=1.0).contains(&value) {
        Ok(value)
    } else {
        Err(format!("must be between 0 and 1, got {value}"))
    }
}
