//! Performance extraction from captured command traces
//!
//! A [`Performance`] strategy does two things:
//! - wraps the benchmarked command with a measurement tool
//! - pulls a single number out of the text that tool leaves in the trace
//!
//! Taint detection is shared by every strategy. A trace that mentions an
//! exception, a failed assertion, a non-zero exit and so on is discarded
//! before any metric is read from it.

use crate::config::MeasurementConfig;
use crate::error::{BenchError, Result};
use clap::ValueEnum;
use regex::RegexSet;
use serde::{Deserialize, Serialize};
use std::sync::OnceLock;

/// Patterns that mark a run as failed or abnormal (case-sensitive)
pub const TAINT_MARKERS: &[&str] = &[
    "[Ee]xception",
    "Error",
    "deadlock",
    "terminated by",
    "non_zero_status",
    "non-zero status",
    "-- Stack --",
    "FAILED",
    "NOT VALID",
];

fn taint_set() -> &'static RegexSet {
    static SET: OnceLock<RegexSet> = OnceLock::new();
    SET.get_or_init(|| RegexSet::new(TAINT_MARKERS).expect("taint markers are valid regexes"))
}

/// Check a single line for taint markers
///
/// Returns the first matching marker pattern, if any.
pub fn sweep_line_for_error(line: &str) -> Option<&'static str> {
    taint_set()
        .matches(line)
        .iter()
        .next()
        .map(|index| TAINT_MARKERS[index])
}

/// Scan every line of a trace for taint markers
pub fn detect_taint(trace: &str) -> Result<()> {
    for line in trace.lines() {
        if let Some(marker) = sweep_line_for_error(line) {
            return Err(BenchError::TaintedRun {
                marker: marker.to_string(),
                line: line.trim().to_string(),
            });
        }
    }
    Ok(())
}

/// A strategy for measuring one invocation of a command
pub trait Performance: std::fmt::Debug {
    /// Short name used in logs and reports
    fn name(&self) -> &str;

    /// Wrap `base_command` with the measurement tool
    fn prepare_invocation(&self, base_command: &str) -> String;

    /// Whether `line` carries this strategy's metric
    fn is_metric_line(&self, line: &str) -> bool;

    /// Pick the metric line out of a trace (first match by default)
    fn find_metric_line<'a>(&self, trace: &'a str) -> Option<&'a str> {
        trace.lines().find(|line| self.is_metric_line(line))
    }

    /// Extract the metric from a trace
    ///
    /// Fails with [`BenchError::TaintedRun`] if any line carries a taint
    /// marker, and with [`BenchError::UnrecognizedTrace`] if there is no
    /// parseable metric line.
    fn extract_metric(&self, trace: &str) -> Result<f64> {
        detect_taint(trace)?;

        let line = self
            .find_metric_line(trace)
            .ok_or_else(|| BenchError::UnrecognizedTrace {
                reason: format!("no {} metric line found", self.name()),
            })?;

        parse_last_field(line)
    }
}

/// Parse the last whitespace-separated field of `line` as a float
fn parse_last_field(line: &str) -> Result<f64> {
    let field = line
        .split_whitespace()
        .last()
        .ok_or_else(|| BenchError::UnrecognizedTrace {
            reason: "empty metric line".to_string(),
        })?;

    let value: f64 = field.parse().map_err(|_| BenchError::UnrecognizedTrace {
        reason: format!("cannot parse '{}' as a number in line: {}", field, line.trim()),
    })?;

    if !value.is_finite() {
        return Err(BenchError::UnrecognizedTrace {
            reason: format!("metric '{}' is not finite", field),
        });
    }

    Ok(value)
}

/// Whether `line` starts with `label` followed by whitespace or `:`
///
/// `real` must not match `realtime`, and `event 0x00430076` must not match
/// `event 0x004300761`.
fn starts_with_label(line: &str, label: &str) -> bool {
    line.strip_prefix(label)
        .is_some_and(|rest| rest.starts_with(char::is_whitespace) || rest.starts_with(':'))
}

/// Wall-clock time as reported by `time -p` (the `real` line, in seconds)
#[derive(Debug, Clone)]
pub struct TimePerformance {
    time_binary: String,
}

impl TimePerformance {
    pub fn new(time_binary: impl Into<String>) -> Self {
        Self {
            time_binary: time_binary.into(),
        }
    }
}

impl Default for TimePerformance {
    fn default() -> Self {
        Self::new(MeasurementConfig::default().time_binary)
    }
}

impl Performance for TimePerformance {
    fn name(&self) -> &str {
        "time"
    }

    fn prepare_invocation(&self, base_command: &str) -> String {
        format!("{} -p {}", self.time_binary, base_command)
    }

    fn is_metric_line(&self, line: &str) -> bool {
        starts_with_label(line, "real")
    }
}

/// Cycle count from a hardware performance counter sampled by `perfex`
#[derive(Debug, Clone)]
pub struct PerfexPerformance {
    perfex_binary: String,
    event: String,
    marker: String,
}

impl PerfexPerformance {
    pub fn new(perfex_binary: impl Into<String>, event: impl Into<String>) -> Self {
        let event = event.into();
        Self {
            perfex_binary: perfex_binary.into(),
            marker: format!("event {}", event),
            event,
        }
    }
}

impl Default for PerfexPerformance {
    fn default() -> Self {
        let config = MeasurementConfig::default();
        Self::new(config.perfex_binary, config.perfex_event)
    }
}

impl Performance for PerfexPerformance {
    fn name(&self) -> &str {
        "perfex"
    }

    fn prepare_invocation(&self, base_command: &str) -> String {
        format!("{} -e {} {}", self.perfex_binary, self.event, base_command)
    }

    fn is_metric_line(&self, line: &str) -> bool {
        starts_with_label(line, &self.marker)
    }

    /// perfex may report the counter more than once; the final value wins
    fn find_metric_line<'a>(&self, trace: &'a str) -> Option<&'a str> {
        trace.lines().rev().find(|line| self.is_metric_line(line))
    }
}

/// Available measurement strategies
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, ValueEnum, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PerformanceKind {
    /// Wall-clock seconds via `time -p`
    #[default]
    Time,
    /// Cycle count via the perfex hardware counter tool
    Perfex,
}

impl PerformanceKind {
    /// Build the strategy for this kind
    pub fn strategy(self, config: &MeasurementConfig) -> Box<dyn Performance> {
        match self {
            PerformanceKind::Time => Box::new(TimePerformance::new(config.time_binary.clone())),
            PerformanceKind::Perfex => Box::new(PerfexPerformance::new(
                config.perfex_binary.clone(),
                config.perfex_event.clone(),
            )),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const TIME_TRACE: &str = "hello from the benchmark\nreal 12.34\nuser 10.01\nsys 0.52\n";

    #[test]
    fn test_time_extracts_real_seconds() {
        let perf = TimePerformance::default();
        assert_eq!(perf.extract_metric(TIME_TRACE).unwrap(), 12.34);
    }

    #[test]
    fn test_time_prepare_invocation() {
        let perf = TimePerformance::new("/usr/bin/time");
        assert_eq!(
            perf.prepare_invocation("java -jar app.jar"),
            "/usr/bin/time -p java -jar app.jar"
        );
    }

    #[test]
    fn test_time_first_real_line_wins() {
        let perf = TimePerformance::default();
        let trace = "real 1.5\nreal 2.5\n";
        assert_eq!(perf.extract_metric(trace).unwrap(), 1.5);
    }

    #[test]
    fn test_exception_taints_even_after_metric() {
        let perf = TimePerformance::default();
        let trace = "real 12.34\njava.lang.NullPointerException\n";
        match perf.extract_metric(trace) {
            Err(BenchError::TaintedRun { marker, line }) => {
                assert_eq!(marker, "[Ee]xception");
                assert_eq!(line, "java.lang.NullPointerException");
            }
            other => panic!("expected TaintedRun, got {:?}", other),
        }
    }

    #[test]
    fn test_every_marker_taints() {
        let lines = [
            "Exception in thread main",
            "caught exception",
            "OutOfMemoryError",
            "possible deadlock detected",
            "Command terminated by signal 9",
            "non_zero_status",
            "Command exited with non-zero status 1",
            "-- Stack --",
            "test FAILED",
            "result NOT VALID",
        ];
        for line in lines {
            assert!(
                sweep_line_for_error(line).is_some(),
                "'{}' should be tainted",
                line
            );
        }
    }

    #[test]
    fn test_markers_are_case_sensitive() {
        assert!(sweep_line_for_error("no error here").is_none());
        assert!(sweep_line_for_error("failed quietly").is_none());
        assert!(sweep_line_for_error("real 0.01").is_none());
    }

    #[test]
    fn test_missing_metric_line_is_unrecognized() {
        let perf = TimePerformance::default();
        assert!(matches!(
            perf.extract_metric("user 1.0\nsys 0.1\n"),
            Err(BenchError::UnrecognizedTrace { .. })
        ));
    }

    #[test]
    fn test_unparseable_metric_is_unrecognized() {
        let perf = TimePerformance::default();
        assert!(matches!(
            perf.extract_metric("real abc\n"),
            Err(BenchError::UnrecognizedTrace { .. })
        ));
        assert!(matches!(
            perf.extract_metric("real\n"),
            Err(BenchError::UnrecognizedTrace { .. })
        ));
    }

    #[test]
    fn test_perfex_last_event_line_wins() {
        let perf = PerfexPerformance::default();
        let trace = "event 0x00430076 1000\nsome output\nevent 0x00430076 123456789\n";
        assert_eq!(perf.extract_metric(trace).unwrap(), 123456789.0);
    }

    #[test]
    fn test_perfex_ignores_other_events() {
        let perf = PerfexPerformance::new("perfex", "0x00430076");
        let trace = "event 0x00410079 42\n";
        assert!(matches!(
            perf.extract_metric(trace),
            Err(BenchError::UnrecognizedTrace { .. })
        ));
    }

    #[test]
    fn test_perfex_rejects_longer_event_selector() {
        let perf = PerfexPerformance::new("perfex", "0x00430076");
        assert!(!perf.is_metric_line("event 0x004300761 42"));
        assert!(perf.is_metric_line("event 0x00430076: 42"));
        assert!(matches!(
            perf.extract_metric("event 0x004300761 42\n"),
            Err(BenchError::UnrecognizedTrace { .. })
        ));
    }

    #[test]
    fn test_time_label_needs_a_boundary() {
        let perf = TimePerformance::default();
        assert!(!perf.is_metric_line("realtime 3"));
        assert!(!perf.is_metric_line("real"));
        assert!(perf.is_metric_line("real\t0.50"));
        assert_eq!(perf.extract_metric("realtime 3\nreal 0.50\n").unwrap(), 0.5);
    }

    #[test]
    fn test_perfex_prepare_invocation() {
        let perf = PerfexPerformance::new("perfex", "0x00430076");
        assert_eq!(
            perf.prepare_invocation("./bench"),
            "perfex -e 0x00430076 ./bench"
        );
    }

    #[test]
    fn test_kind_builds_matching_strategy() {
        let config = MeasurementConfig::default();
        assert_eq!(PerformanceKind::Time.strategy(&config).name(), "time");
        assert_eq!(PerformanceKind::Perfex.strategy(&config).name(), "perfex");
    }

    /// A new strategy only supplies wrapping and line recognition
    #[derive(Debug)]
    struct MaxRssPerformance;

    impl Performance for MaxRssPerformance {
        fn name(&self) -> &str {
            "maxrss"
        }

        fn prepare_invocation(&self, base_command: &str) -> String {
            format!("/usr/bin/time -f 'maxrss %M' {}", base_command)
        }

        fn is_metric_line(&self, line: &str) -> bool {
            line.starts_with("maxrss")
        }
    }

    #[test]
    fn test_custom_strategy_shares_taint_detection() {
        let perf = MaxRssPerformance;
        assert_eq!(perf.extract_metric("maxrss 20480\n").unwrap(), 20480.0);
        assert!(matches!(
            perf.extract_metric("maxrss 20480\nFAILED\n"),
            Err(BenchError::TaintedRun { .. })
        ));
    }
}
