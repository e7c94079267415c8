//! Sample file parsing for replaying recorded measurements
//!
//! One floating-point value per line. Surrounding whitespace is trimmed,
//! blank lines and `#` comments are skipped, anything else must parse.

use crate::error::{BenchError, Result};
use std::fs;
use std::path::Path;

/// Parse samples from text, one value per line
pub fn parse_samples(content: &str) -> Result<Vec<f64>> {
    let mut samples = Vec::new();

    for (index, raw) in content.lines().enumerate() {
        let line = raw.trim();
        if line.is_empty() || line.starts_with('#') {
            continue;
        }

        let value: f64 = line.parse().map_err(|_| BenchError::MalformedSample {
            line: index + 1,
            content: line.to_string(),
        })?;

        if !value.is_finite() {
            return Err(BenchError::MalformedSample {
                line: index + 1,
                content: line.to_string(),
            });
        }

        samples.push(value);
    }

    Ok(samples)
}

/// Read and parse a sample file
pub fn read_samples<P: AsRef<Path>>(path: P) -> Result<Vec<f64>> {
    let content = fs::read_to_string(path)?;
    parse_samples(&content)
}
