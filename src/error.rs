//! Error types for the estimator, the extractor and the driver
//!
//! Estimator and extractor errors are local conditions handed back to the
//! driver loop, which decides whether to discard a repetition or abort.

use thiserror::Error;

/// Errors produced while measuring a command or analysing its samples
#[derive(Error, Debug)]
pub enum BenchError {
    #[error("Invalid sample set: {reason}")]
    InvalidSampleSet { reason: String },

    #[error("Confidence level must lie strictly between 0 and 1, got {0}")]
    InvalidConfidenceLevel(f64),

    #[error("Sample mean {mean} is too close to zero to express the interval as a percentage")]
    DegenerateMean { mean: f64 },

    #[error("Run is tainted: found '{marker}' in line: {line}")]
    TaintedRun { marker: String, line: String },

    #[error("Unrecognized trace: {reason}")]
    UnrecognizedTrace { reason: String },

    #[error("Invocation exceeded the {seconds}s timeout")]
    Timeout { seconds: f64 },

    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("Malformed sample on line {line}: '{content}'")]
    MalformedSample { line: usize, content: String },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl BenchError {
    /// Whether the error only invalidates the current repetition
    ///
    /// Discardable errors cause the driver to drop the data point and run the
    /// repetition again. Everything else ends the session.
    pub fn is_discardable(&self) -> bool {
        matches!(
            self,
            BenchError::TaintedRun { .. }
                | BenchError::UnrecognizedTrace { .. }
                | BenchError::Timeout { .. }
        )
    }
}

/// Result type for benchmarking operations
pub type Result<T> = std::result::Result<T, BenchError>;
