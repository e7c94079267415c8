//! Property-based tests for the estimator, the stopping rule and the extractor
//!
//! Properties covered:
//! 1. The interval always brackets the mean
//! 2. Lower confidence levels never widen the interval
//! 3. The floor and the ceiling of the stopping rule always win
//! 4. Any taint marker invalidates a trace wherever it appears
//! 5. The estimator is deterministic

use benchmarkr::confidence::confidence;
use benchmarkr::performance::{Performance, TimePerformance};
use benchmarkr::stopping::{confidence_reached, StoppingRule};
use benchmarkr::BenchError;
use proptest::prelude::*;

proptest! {
    #![proptest_config(ProptestConfig::with_cases(200))]

    #[test]
    fn prop_interval_contains_mean(
        samples in prop::collection::vec(0.001f64..1e6, 2..60),
        level in 0.5f64..0.999,
    ) {
        let ci = confidence(&samples, level).unwrap();
        prop_assert!(ci.low <= ci.mean);
        prop_assert!(ci.mean <= ci.high);
        prop_assert!(ci.interval_percentage >= 0.0);
    }

    #[test]
    fn prop_width_monotonic_in_level(
        samples in prop::collection::vec(1.0f64..1000.0, 2..40),
        a in 0.5f64..0.99,
        b in 0.5f64..0.99,
    ) {
        let (lower, higher) = if a <= b { (a, b) } else { (b, a) };
        let narrow = confidence(&samples, lower).unwrap();
        let wide = confidence(&samples, higher).unwrap();
        prop_assert!(narrow.high - narrow.low <= wide.high - wide.low + 1e-9);
    }

    #[test]
    fn prop_deterministic(samples in prop::collection::vec(1.0f64..1000.0, 2..40)) {
        let first = confidence(&samples, 0.95).unwrap();
        let second = confidence(&samples, 0.95).unwrap();
        prop_assert_eq!(first, second);
    }
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(100))]

    #[test]
    fn prop_never_stops_below_minimum(
        min in 2usize..20,
        extra in 0usize..50,
        value in 1.0f64..100.0,
    ) {
        // Identical samples give a zero-width interval, which would stop
        // immediately if the floor did not take precedence
        let rule = StoppingRule {
            minimum_invocations: min,
            maximum_invocations: min + extra,
            confidence_level: 0.95,
            max_interval_percentage: 5.0,
        };
        let samples = vec![value; min - 1];
        prop_assert!(!confidence_reached(&rule, &samples).unwrap());
    }

    #[test]
    fn prop_always_stops_at_maximum(
        samples in prop::collection::vec(0.001f64..1e6, 2..40),
    ) {
        let rule = StoppingRule {
            minimum_invocations: 1,
            maximum_invocations: samples.len(),
            confidence_level: 0.95,
            max_interval_percentage: 1e-9,
        };
        prop_assert!(confidence_reached(&rule, &samples).unwrap());
    }

    #[test]
    fn prop_taint_anywhere_discards_trace(
        before in prop::collection::vec("[0-9 ]{0,20}", 0..5),
        after in prop::collection::vec("[0-9 ]{0,20}", 0..5),
        marker in prop::sample::select(vec![
            "Exception", "exception", "Error", "deadlock", "terminated by",
            "non_zero_status", "-- Stack --", "FAILED", "NOT VALID",
        ]),
        seconds in 0.0f64..1000.0,
    ) {
        let mut lines = before.clone();
        lines.push(format!("real {}", seconds));
        lines.extend(after.iter().cloned());
        lines.push(format!("something {} happened", marker));

        let perf = TimePerformance::default();
        let clean = lines[..lines.len() - 1].join("\n");
        prop_assert_eq!(perf.extract_metric(&clean).unwrap(), seconds);

        let tainted = lines.join("\n");
        let is_tainted = matches!(
            perf.extract_metric(&tainted),
            Err(BenchError::TaintedRun { .. })
        );
        prop_assert!(is_tainted);
    }
}

#[test]
fn test_one_to_five_interval() {
    let ci = confidence(&[1.0, 2.0, 3.0, 4.0, 5.0], 0.95).unwrap();
    assert_eq!(ci.mean, 3.0);
    assert!((ci.mean - ci.low - (ci.high - ci.mean)).abs() < 1e-12);
}

#[test]
fn test_real_line_extraction() {
    let perf = TimePerformance::default();
    assert_eq!(perf.extract_metric("real 12.34\n").unwrap(), 12.34);
}
