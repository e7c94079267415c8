//! benchmarkr - statistically rigorous command benchmarking
//!
//! Runs a command repeatedly, measures every run (wall-clock time or a
//! hardware counter) and stops once the Student's t confidence interval of
//! the mean is narrow enough, or the repetition ceiling is reached.

pub mod cli;
pub mod confidence;
pub mod config;
pub mod driver;
pub mod error;
pub mod performance;
pub mod report;
pub mod runner;
pub mod samples;
pub mod stopping;

pub use error::{BenchError, Result};
