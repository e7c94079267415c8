//! Stopping rule: when have enough repetitions been collected?
//!
//! The rule is evaluated in a fixed order, first match wins:
//! 1. fewer samples than `minimum_invocations` -> keep going
//! 2. at least `maximum_invocations` samples -> stop
//! 3. interval width (as % of the mean) below `max_interval_percentage` -> stop
//!
//! `confidence_level` and `max_interval_percentage` are separate quantities:
//! the first is a probability fed to the t quantile, the second is a
//! percentage compared against the interval width.

use crate::confidence::{confidence, ConfidenceInterval};
use crate::error::{BenchError, Result};
use serde::{Deserialize, Serialize};
use tracing::debug;

/// Bounds and thresholds for one benchmarking session
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StoppingRule {
    /// Never stop before this many samples
    pub minimum_invocations: usize,

    /// Always stop once this many samples have been collected
    pub maximum_invocations: usize,

    /// Probability in (0, 1) used for the t quantile
    ///
    /// Default: 0.95
    pub confidence_level: f64,

    /// Stop once the interval is narrower than this percentage of the mean
    ///
    /// Default: 2.0 (interval width below 2% of the mean)
    pub max_interval_percentage: f64,
}

impl Default for StoppingRule {
    fn default() -> Self {
        Self {
            minimum_invocations: 5,
            maximum_invocations: 100,
            confidence_level: 0.95,
            max_interval_percentage: 2.0,
        }
    }
}

/// Why a session or simulation stopped
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum StopReason {
    /// Interval narrower than the configured percentage
    ConfidenceReached,
    /// Ceiling on repetitions reached
    MaximumInvocations,
    /// Interrupted between repetitions
    Interrupted,
    /// Too many consecutive repetitions had to be discarded
    RetriesExhausted,
    /// Replay ran out of recorded samples before the rule fired
    SamplesExhausted,
}

impl std::fmt::Display for StopReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let text = match self {
            StopReason::ConfidenceReached => "confidence reached",
            StopReason::MaximumInvocations => "maximum invocations reached",
            StopReason::Interrupted => "interrupted",
            StopReason::RetriesExhausted => "too many discarded runs",
            StopReason::SamplesExhausted => "ran out of samples",
        };
        f.write_str(text)
    }
}

/// Outcome of evaluating the rule on the current samples
#[derive(Debug, Clone, PartialEq)]
pub enum Decision {
    Continue,
    Stop(StopReason),
}

impl Decision {
    pub fn is_stop(&self) -> bool {
        matches!(self, Decision::Stop(_))
    }
}

impl StoppingRule {
    /// Rule that runs exactly `n` repetitions
    pub fn exact(n: usize) -> Self {
        Self {
            minimum_invocations: n,
            maximum_invocations: n,
            ..Self::default()
        }
    }

    /// Validate bounds and thresholds
    pub fn validate(&self) -> Result<()> {
        if self.minimum_invocations < 1 {
            return Err(BenchError::InvalidConfig(
                "minimum_invocations must be >= 1".to_string(),
            ));
        }

        if self.minimum_invocations > self.maximum_invocations {
            return Err(BenchError::InvalidConfig(format!(
                "minimum_invocations ({}) must not exceed maximum_invocations ({})",
                self.minimum_invocations, self.maximum_invocations
            )));
        }

        if !(self.confidence_level > 0.0 && self.confidence_level < 1.0) {
            return Err(BenchError::InvalidConfig(format!(
                "confidence_level must be in (0, 1), got {}",
                self.confidence_level
            )));
        }

        if !(self.max_interval_percentage.is_finite() && self.max_interval_percentage > 0.0) {
            return Err(BenchError::InvalidConfig(format!(
                "max_interval_percentage must be a positive percentage, got {}",
                self.max_interval_percentage
            )));
        }

        Ok(())
    }

    /// Evaluate the rule against the samples collected so far
    ///
    /// Fewer than two samples have no interval, so the rule keeps going
    /// between the floor and the ceiling until a second sample arrives.
    pub fn evaluate(&self, samples: &[f64]) -> Result<Decision> {
        let n = samples.len();
        debug!(
            samples = n,
            min = self.minimum_invocations,
            max = self.maximum_invocations,
            "evaluating stopping rule"
        );

        if n < self.minimum_invocations {
            return Ok(Decision::Continue);
        }

        if n >= self.maximum_invocations {
            return Ok(Decision::Stop(StopReason::MaximumInvocations));
        }

        if n < 2 {
            return Ok(Decision::Continue);
        }

        let interval = confidence(samples, self.confidence_level)?;
        debug!(
            mean = interval.mean,
            percentage = interval.interval_percentage,
            "interval computed"
        );

        if interval.interval_percentage < self.max_interval_percentage {
            Ok(Decision::Stop(StopReason::ConfidenceReached))
        } else {
            Ok(Decision::Continue)
        }
    }
}

/// Decide whether enough repetitions have been collected
///
/// # Example
/// ```
/// use benchmarkr::stopping::{confidence_reached, StoppingRule};
///
/// let rule = StoppingRule {
///     minimum_invocations: 5,
///     maximum_invocations: 100,
///     confidence_level: 0.95,
///     max_interval_percentage: 5.0,
/// };
/// assert!(!confidence_reached(&rule, &[1.0, 1.0, 1.0]).unwrap());
/// ```
pub fn confidence_reached(rule: &StoppingRule, samples: &[f64]) -> Result<bool> {
    rule.evaluate(samples).map(|decision| decision.is_stop())
}

/// Result of replaying the stopping rule over recorded samples
#[derive(Debug, Clone, Serialize)]
pub struct SimulationReport {
    /// Number of samples after which the rule fired (or all of them)
    pub invocations: usize,

    /// Why the replay stopped
    pub reason: StopReason,

    /// Interval over the first `invocations` samples, if defined
    pub interval: Option<ConfidenceInterval>,
}

/// Replay the stopping rule over increasing prefixes of `samples`
///
/// Shows how many repetitions a live session would have needed for the
/// given rule. Prefixes from `minimum_invocations` up to
/// `maximum_invocations` (or all samples, if fewer) are evaluated in order.
pub fn simulate(rule: &StoppingRule, samples: &[f64]) -> Result<SimulationReport> {
    rule.validate()?;

    if samples.is_empty() {
        return Err(BenchError::InvalidSampleSet {
            reason: "no samples to simulate".to_string(),
        });
    }

    let upper = rule.maximum_invocations.min(samples.len());
    let mut invocations = samples.len();
    let mut reason = StopReason::SamplesExhausted;

    for k in rule.minimum_invocations..=upper {
        if let Decision::Stop(stop) = rule.evaluate(&samples[..k])? {
            invocations = k;
            reason = stop;
            break;
        }
    }

    let prefix = &samples[..invocations];
    let interval = if prefix.len() >= 2 {
        Some(confidence(prefix, rule.confidence_level)?)
    } else {
        None
    };

    Ok(SimulationReport {
        invocations,
        reason,
        interval,
    })
}
