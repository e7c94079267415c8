//! Rendering of session and simulation results
//!
//! Text output mirrors the classic JavaStats summary line:
//! `Confidence interval for N values MEAN +/- HALF (= PCT%) = [LOW; HIGH]`

use crate::cli::OutputFormat;
use crate::confidence::ConfidenceInterval;
use crate::driver::SessionReport;
use crate::stopping::SimulationReport;

/// One-line interval summary
pub fn interval_line(ci: &ConfidenceInterval) -> String {
    format!(
        "Confidence interval for {} values {:.6} +/- {:.6} (= {:.6}%) = [{:.6}; {:.6}]",
        ci.samples,
        ci.mean,
        ci.half_width(),
        ci.interval_percentage,
        ci.low,
        ci.high
    )
}

/// Escape CSV field (handle commas, quotes, newlines)
fn escape_field(field: &str) -> String {
    if field.contains(',') || field.contains('"') || field.contains('\n') {
        format!("\"{}\"", field.replace('"', "\"\""))
    } else {
        field.to_string()
    }
}

/// Render a finished session
pub fn render_session(report: &SessionReport, format: OutputFormat) -> serde_json::Result<String> {
    match format {
        OutputFormat::Json => serde_json::to_string_pretty(report),
        OutputFormat::Csv => {
            let mut out = String::from("command,performance,run,value\n");
            let command = escape_field(&report.command);
            for (index, value) in report.samples.iter().enumerate() {
                out.push_str(&format!(
                    "{},{},{},{}\n",
                    command,
                    report.performance,
                    index + 1,
                    value
                ));
            }
            Ok(out)
        }
        OutputFormat::Text => {
            let mut out = String::new();
            out.push_str(&format!("Benchmarked: {}\n", report.command));
            out.push_str(&format!("Performance: {}\n", report.performance));
            out.push_str(&format!(
                "Runs: {} kept, {} discarded ({})\n",
                report.samples.len(),
                report.discarded,
                report.reason
            ));
            out.push_str(&format!("Wall time: {:.3}s\n", report.wall_time_secs));
            match &report.interval {
                Some(ci) => {
                    out.push_str(&interval_line(ci));
                    out.push('\n');
                }
                None => out.push_str("Not enough samples for a confidence interval\n"),
            }
            Ok(out)
        }
    }
}

/// Render a stopping-rule replay
pub fn render_simulation(
    report: &SimulationReport,
    format: OutputFormat,
) -> serde_json::Result<String> {
    match format {
        OutputFormat::Json => serde_json::to_string_pretty(report),
        OutputFormat::Csv => {
            let mut out =
                String::from("invocations,reason,mean,stddev,low,high,interval_percentage\n");
            out.push_str(&format!("{},{}", report.invocations, report.reason));
            match &report.interval {
                Some(ci) => out.push_str(&format!(
                    ",{},{},{},{},{}\n",
                    ci.mean, ci.stddev, ci.low, ci.high, ci.interval_percentage
                )),
                None => out.push_str(",,,,,\n"),
            }
            Ok(out)
        }
        OutputFormat::Text => {
            let mut out = String::new();
            match &report.interval {
                Some(ci) => out.push_str(&interval_line(ci)),
                None => out.push_str(&format!(
                    "No confidence interval for {} value(s)",
                    report.invocations
                )),
            }
            out.push_str(&format!(" ({})\n", report.reason));
            Ok(out)
        }
    }
}
