//! Session configuration
//!
//! Settings come from defaults, an optional `benchmarkr.toml` file and
//! command-line flags, in increasing order of precedence.
//!
//! ```toml
//! performance = "time"
//! max_retries = 3
//!
//! [stopping]
//! minimum_invocations = 5
//! maximum_invocations = 100
//! confidence_level = 0.95
//! max_interval_percentage = 2.0
//!
//! [measurement]
//! time_binary = "/usr/bin/time"
//!
//! [runner]
//! timeout_secs = 120.0
//! ```

use crate::error::BenchError;
use crate::performance::PerformanceKind;
use crate::runner::RunnerConfig;
use crate::stopping::StoppingRule;
use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

/// Paths and selectors for the measurement tools
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MeasurementConfig {
    /// Timing binary that understands `-p` (POSIX output format)
    pub time_binary: String,

    /// perfex binary for hardware counter sampling
    pub perfex_binary: String,

    /// Counter selector passed to `perfex -e`
    ///
    /// Default: 0x00430076 (CPU cycles)
    pub perfex_event: String,
}

impl Default for MeasurementConfig {
    fn default() -> Self {
        Self {
            time_binary: "/usr/bin/time".to_string(),
            perfex_binary: "perfex".to_string(),
            perfex_event: "0x00430076".to_string(),
        }
    }
}

/// Complete configuration of a benchmarking session
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BenchConfig {
    /// Measurement strategy
    pub performance: PerformanceKind,

    /// Consecutive discarded repetitions tolerated before giving up
    pub max_retries: usize,

    /// When to stop repeating
    pub stopping: StoppingRule,

    /// Measurement tool settings
    pub measurement: MeasurementConfig,

    /// Process spawning settings
    pub runner: RunnerConfig,
}

impl Default for BenchConfig {
    fn default() -> Self {
        Self {
            performance: PerformanceKind::default(),
            max_retries: 3,
            stopping: StoppingRule::default(),
            measurement: MeasurementConfig::default(),
            runner: RunnerConfig::default(),
        }
    }
}

impl BenchConfig {
    /// Load configuration from a TOML file
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let content = fs::read_to_string(path)
            .with_context(|| format!("Failed to read {}", path.display()))?;

        Self::from_toml_str(&content)
    }

    /// Load configuration from a TOML string
    pub fn from_toml_str(content: &str) -> Result<Self> {
        toml::from_str(content).context("Failed to parse TOML")
    }

    /// Validate configuration
    ///
    /// Invalid bounds or thresholds abort the session before the first run.
    pub fn validate(&self) -> std::result::Result<(), BenchError> {
        self.stopping.validate()?;
        self.runner.validate()?;

        if self.measurement.time_binary.trim().is_empty() {
            return Err(BenchError::InvalidConfig(
                "measurement.time_binary must not be empty".to_string(),
            ));
        }

        if self.performance == PerformanceKind::Perfex
            && self.measurement.perfex_event.trim().is_empty()
        {
            return Err(BenchError::InvalidConfig(
                "measurement.perfex_event must not be empty".to_string(),
            ));
        }

        Ok(())
    }
}
