#![no_main]

use benchmarkr::performance::{Performance, PerfexPerformance, TimePerformance};
use benchmarkr::samples::parse_samples;
use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &[u8]| {
    if let Ok(input) = std::str::from_utf8(data) {
        // Neither the extractors nor the sample parser may panic on any text
        let _ = TimePerformance::default().extract_metric(input);
        let _ = PerfexPerformance::default().extract_metric(input);
        let _ = parse_samples(input);
    }
});
