//! Confidence interval estimation for the mean of a sample set
//!
//! Uses Student's t-distribution, which is the right model for the small
//! sample counts a benchmark session collects (a handful to a few hundred
//! repetitions).

use crate::error::{BenchError, Result};
use serde::Serialize;
use statrs::distribution::{ContinuousCDF, StudentsT};

/// Two-sided confidence interval for the sample mean
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ConfidenceInterval {
    /// Lower bound of the interval
    pub low: f64,
    /// Upper bound of the interval
    pub high: f64,
    /// Arithmetic mean of the samples
    pub mean: f64,
    /// Sample standard deviation (n - 1 denominator)
    pub stddev: f64,
    /// Interval width as a percentage of the mean
    pub interval_percentage: f64,
    /// Number of samples the interval was computed from
    pub samples: usize,
}

impl ConfidenceInterval {
    /// Half of the interval width, i.e. the `+/-` margin around the mean
    pub fn half_width(&self) -> f64 {
        (self.high - self.low) / 2.0
    }
}

/// Compute the confidence interval for the mean of `samples`
///
/// `confidence_level` is a probability in (0, 1), e.g. 0.95. The critical
/// value is the Student's t quantile at `(1 + confidence_level) / 2` with
/// `n - 1` degrees of freedom.
///
/// `interval_percentage` is `(high - low) / |mean| * 100`. For a positive
/// mean that is the plain `(high - low) / mean * 100`; a negative mean still
/// yields a positive width.
///
/// # Errors
///
/// - [`BenchError::InvalidSampleSet`] for fewer than two samples or any
///   non-finite sample, or when the mean or spread overflows `f64`
/// - [`BenchError::InvalidConfidenceLevel`] for a level outside (0, 1)
/// - [`BenchError::DegenerateMean`] when the mean is too close to zero for
///   the interval percentage to be defined
///
/// # Example
/// ```
/// use benchmarkr::confidence::confidence;
///
/// let ci = confidence(&[1.0, 2.0, 3.0, 4.0, 5.0], 0.95).unwrap();
/// assert_eq!(ci.mean, 3.0);
/// assert!(ci.low < ci.mean && ci.mean < ci.high);
/// ```
pub fn confidence(samples: &[f64], confidence_level: f64) -> Result<ConfidenceInterval> {
    validate_samples(samples)?;

    if !(confidence_level > 0.0 && confidence_level < 1.0) {
        return Err(BenchError::InvalidConfidenceLevel(confidence_level));
    }

    let n = samples.len() as f64;
    let mean = mean(samples);
    let stddev = sample_stddev(samples, mean);
    if !(mean.is_finite() && stddev.is_finite()) {
        return Err(BenchError::InvalidSampleSet {
            reason: format!(
                "sample mean or spread overflows f64 (mean {}, stddev {})",
                mean, stddev
            ),
        });
    }
    let degrees_of_freedom = n - 1.0;

    let t = t_quantile((1.0 + confidence_level) / 2.0, degrees_of_freedom)?;
    let margin = t * stddev / n.sqrt();

    let low = mean - margin;
    let high = mean + margin;
    if !(low.is_finite() && high.is_finite()) {
        return Err(BenchError::InvalidSampleSet {
            reason: format!("interval bounds overflow f64 (mean {}, margin {})", mean, margin),
        });
    }

    if mean.abs() < f64::EPSILON {
        return Err(BenchError::DegenerateMean { mean });
    }

    // Relative to |mean| so the percentage stays a width for negative metrics
    let interval_percentage = (high - low) / mean.abs() * 100.0;
    if !interval_percentage.is_finite() {
        return Err(BenchError::DegenerateMean { mean });
    }

    Ok(ConfidenceInterval {
        low,
        high,
        mean,
        stddev,
        interval_percentage,
        samples: samples.len(),
    })
}

fn validate_samples(samples: &[f64]) -> Result<()> {
    if samples.len() < 2 {
        return Err(BenchError::InvalidSampleSet {
            reason: format!("need at least 2 samples, got {}", samples.len()),
        });
    }

    if let Some((index, value)) = samples.iter().enumerate().find(|(_, v)| !v.is_finite()) {
        return Err(BenchError::InvalidSampleSet {
            reason: format!("sample {} is not finite ({})", index, value),
        });
    }

    Ok(())
}

/// Arithmetic mean; callers guarantee a non-empty slice
fn mean(samples: &[f64]) -> f64 {
    samples.iter().sum::<f64>() / samples.len() as f64
}

/// Bessel-corrected standard deviation
fn sample_stddev(samples: &[f64], mean: f64) -> f64 {
    let sum_sq: f64 = samples.iter().map(|x| (x - mean).powi(2)).sum();
    (sum_sq / (samples.len() as f64 - 1.0)).sqrt()
}

/// Student's t quantile at cumulative probability `p`
fn t_quantile(p: f64, degrees_of_freedom: f64) -> Result<f64> {
    let distribution = StudentsT::new(0.0, 1.0, degrees_of_freedom).map_err(|e| {
        BenchError::InvalidSampleSet {
            reason: format!("invalid t-distribution (df={}): {}", degrees_of_freedom, e),
        }
    })?;
    Ok(distribution.inverse_cdf(p))
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLES: [f64; 5] = [1.0, 2.0, 3.0, 4.0, 5.0];

    #[test]
    fn test_mean_and_stddev() {
        let ci = confidence(&SAMPLES, 0.95).unwrap();
        assert_eq!(ci.mean, 3.0);
        // sqrt(10 / 4)
        assert!((ci.stddev - 2.5_f64.sqrt()).abs() < 1e-12);
        assert_eq!(ci.samples, 5);
    }

    #[test]
    fn test_interval_is_symmetric_around_mean() {
        let ci = confidence(&SAMPLES, 0.95).unwrap();
        assert!(((ci.mean - ci.low) - (ci.high - ci.mean)).abs() < 1e-12);
        assert!(ci.low <= ci.mean && ci.mean <= ci.high);
    }

    #[test]
    fn test_known_t_value() {
        // t(0.975, df=4) = 2.776445
        let ci = confidence(&SAMPLES, 0.95).unwrap();
        let expected_margin = 2.776445 * 2.5_f64.sqrt() / 5.0_f64.sqrt();
        assert!(
            (ci.half_width() - expected_margin).abs() < 1e-4,
            "margin {} != {}",
            ci.half_width(),
            expected_margin
        );
        let expected_pct = 2.0 * expected_margin / 3.0 * 100.0;
        assert!((ci.interval_percentage - expected_pct).abs() < 1e-2);
    }

    #[test]
    fn test_lower_level_gives_narrower_interval() {
        let wide = confidence(&SAMPLES, 0.99).unwrap();
        let narrow = confidence(&SAMPLES, 0.90).unwrap();
        assert!(narrow.high - narrow.low < wide.high - wide.low);
    }

    #[test]
    fn test_constant_samples_have_zero_width() {
        let ci = confidence(&[4.0, 4.0, 4.0], 0.95).unwrap();
        assert_eq!(ci.low, 4.0);
        assert_eq!(ci.high, 4.0);
        assert_eq!(ci.interval_percentage, 0.0);
    }

    #[test]
    fn test_deterministic() {
        let a = confidence(&SAMPLES, 0.95).unwrap();
        let b = confidence(&SAMPLES, 0.95).unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn test_rejects_empty_and_single_sample() {
        assert!(matches!(
            confidence(&[], 0.95),
            Err(BenchError::InvalidSampleSet { .. })
        ));
        assert!(matches!(
            confidence(&[1.0], 0.95),
            Err(BenchError::InvalidSampleSet { .. })
        ));
    }

    #[test]
    fn test_rejects_non_finite_samples() {
        assert!(matches!(
            confidence(&[1.0, f64::NAN, 2.0], 0.95),
            Err(BenchError::InvalidSampleSet { .. })
        ));
        assert!(matches!(
            confidence(&[1.0, f64::INFINITY], 0.95),
            Err(BenchError::InvalidSampleSet { .. })
        ));
    }

    #[test]
    fn test_rejects_out_of_range_level() {
        for level in [0.0, 1.0, -0.5, 95.0, f64::NAN] {
            assert!(matches!(
                confidence(&SAMPLES, level),
                Err(BenchError::InvalidConfidenceLevel(_))
            ));
        }
    }

    #[test]
    fn test_zero_mean_is_degenerate() {
        assert!(matches!(
            confidence(&[-1.0, 1.0], 0.95),
            Err(BenchError::DegenerateMean { .. })
        ));
    }

    #[test]
    fn test_overflowing_samples_are_invalid_not_degenerate() {
        assert!(matches!(
            confidence(&[1e308, 1e308], 0.95),
            Err(BenchError::InvalidSampleSet { .. })
        ));
        assert!(matches!(
            confidence(&[1e308, 1e307], 0.95),
            Err(BenchError::InvalidSampleSet { .. })
        ));
    }

    #[test]
    fn test_negative_mean_has_positive_width() {
        let ci = confidence(&[-1.0, -2.0, -3.0, -4.0, -5.0], 0.95).unwrap();
        assert_eq!(ci.mean, -3.0);
        assert!(ci.interval_percentage > 0.0);
        let expected = (ci.high - ci.low) / 3.0 * 100.0;
        assert!((ci.interval_percentage - expected).abs() < 1e-9);
    }
}
