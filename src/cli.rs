//! CLI argument parsing for benchmarkr

use crate::config::BenchConfig;
use crate::performance::PerformanceKind;
use clap::{Parser, ValueEnum};
use std::path::PathBuf;

/// Output format for results
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    /// Human-readable text format (default)
    Text,
    /// JSON format for machine parsing
    Json,
    /// CSV format for spreadsheet analysis
    Csv,
}

#[derive(Parser, Debug)]
#[command(name = "benchmarkr")]
#[command(version)]
#[command(about = "Run a command until its performance is known to a given confidence", long_about = None)]
pub struct Cli {
    /// Command to be benchmarked (alternatively pass it after --)
    #[arg(short = 'e', long = "command", value_name = "CMD")]
    pub command: Option<String>,

    /// Confidence level for the interval, between 0.0 and 1.0 (default: 0.95)
    #[arg(short = 'i', long = "interval", value_name = "LEVEL")]
    pub confidence_level: Option<f64>,

    /// Stop once the interval is narrower than this percentage of the mean (default: 2.0)
    #[arg(short = 't', long = "threshold", value_name = "PERCENT")]
    pub max_interval_percentage: Option<f64>,

    /// Minimum number of runs (default: 5)
    #[arg(short = 'm', long = "min", value_name = "N", conflicts_with = "num")]
    pub min: Option<usize>,

    /// Maximum number of runs (default: 100)
    #[arg(short = 'M', long = "max", value_name = "N", conflicts_with = "num")]
    pub max: Option<usize>,

    /// Exact number of times to run the benchmark
    #[arg(short = 'n', long = "num", value_name = "N")]
    pub num: Option<usize>,

    /// How to measure each run
    #[arg(short = 'p', long = "performance", value_enum)]
    pub performance: Option<PerformanceKind>,

    /// Kill a run after this many seconds and discard it
    #[arg(long = "timeout", value_name = "SECS")]
    pub timeout: Option<f64>,

    /// Consecutive discarded runs tolerated before giving up (default: 3)
    #[arg(long = "max-retries", value_name = "N")]
    pub max_retries: Option<usize>,

    /// Keep every run's trace file in this directory
    #[arg(long = "trace-dir", value_name = "DIR")]
    pub trace_dir: Option<PathBuf>,

    /// Replay the stopping rule over a file of recorded samples instead of running
    #[arg(long = "simulate", value_name = "FILE")]
    pub simulate: Option<PathBuf>,

    /// TOML configuration file
    #[arg(long = "config", value_name = "FILE")]
    pub config: Option<PathBuf>,

    /// Output format
    #[arg(long = "format", value_enum, default_value = "text")]
    pub format: OutputFormat,

    /// Enable debug tracing on stderr
    #[arg(long = "debug")]
    pub debug: bool,

    /// Command to benchmark (everything after --)
    #[arg(last = true)]
    pub args: Option<Vec<String>>,
}

impl Cli {
    /// The command line to benchmark, from `-e` or the trailing arguments
    pub fn benchmark_command(&self) -> Option<String> {
        match (&self.command, &self.args) {
            (Some(cmd), _) => Some(cmd.clone()),
            (None, Some(args)) if !args.is_empty() => Some(args.join(" ")),
            _ => None,
        }
    }

    /// Override configuration values with the flags that were given
    pub fn apply_to(&self, config: &mut BenchConfig) {
        if let Some(level) = self.confidence_level {
            config.stopping.confidence_level = level;
        }
        if let Some(pct) = self.max_interval_percentage {
            config.stopping.max_interval_percentage = pct;
        }
        if let Some(n) = self.num {
            config.stopping.minimum_invocations = n;
            config.stopping.maximum_invocations = n;
        }
        if let Some(min) = self.min {
            config.stopping.minimum_invocations = min;
        }
        if let Some(max) = self.max {
            config.stopping.maximum_invocations = max;
        }
        if let Some(kind) = self.performance {
            config.performance = kind;
        }
        if let Some(secs) = self.timeout {
            config.runner.timeout_secs = Some(secs);
        }
        if let Some(retries) = self.max_retries {
            config.max_retries = retries;
        }
        if let Some(dir) = &self.trace_dir {
            config.runner.trace_dir = Some(dir.clone());
        }
    }
}
