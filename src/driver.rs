//! Benchmark driver: run, measure, evaluate, repeat
//!
//! One repetition at a time: the wrapped command runs to completion, its
//! trace is handed to the performance strategy, the value (if any) is
//! appended to the sample set and the stopping rule decides whether to go
//! on. Discarded repetitions do not count towards the invocation bounds.

use crate::config::BenchConfig;
use crate::confidence::{confidence, ConfidenceInterval};
use crate::error::{BenchError, Result};
use crate::performance::Performance;
use crate::runner::CommandRunner;
use crate::stopping::{Decision, StopReason, StoppingRule};
use nix::sys::signal::{sigaction, SaFlags, SigAction, SigHandler, SigSet, Signal};
use serde::Serialize;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;
use tracing::{debug, info, warn};

static INTERRUPTED: AtomicBool = AtomicBool::new(false);

extern "C" fn on_sigint(_: nix::libc::c_int) {
    INTERRUPTED.store(true, Ordering::SeqCst);
}

/// Install a SIGINT handler that requests a stop between repetitions
///
/// The returned flag is what [`Benchmark::with_interrupt`] expects.
pub fn install_interrupt_handler() -> nix::Result<&'static AtomicBool> {
    let action = SigAction::new(
        SigHandler::Handler(on_sigint),
        SaFlags::empty(),
        SigSet::empty(),
    );
    // SAFETY: the handler only stores to an atomic
    unsafe { sigaction(Signal::SIGINT, &action) }?;
    Ok(&INTERRUPTED)
}

/// Summary of a finished benchmarking session
#[derive(Debug, Clone, Serialize)]
pub struct SessionReport {
    /// Command as given by the user (before wrapping)
    pub command: String,
    /// Measurement strategy name
    pub performance: String,
    /// Kept measurements, in collection order
    pub samples: Vec<f64>,
    /// Repetitions thrown away (tainted, unrecognized or timed out)
    pub discarded: usize,
    /// Why the session ended
    pub reason: StopReason,
    /// Wall time of every repetition that ran to completion, kept or
    /// discarded (timed-out runs excluded)
    pub wall_time_secs: f64,
    /// Interval over all kept samples (needs at least two)
    pub interval: Option<ConfidenceInterval>,
}

/// A benchmarking session for one command
pub struct Benchmark<'a, R: CommandRunner> {
    command: String,
    performance: Box<dyn Performance>,
    rule: StoppingRule,
    max_retries: usize,
    runner: R,
    interrupt: Option<&'a AtomicBool>,
}

impl<'a, R: CommandRunner> Benchmark<'a, R> {
    pub fn new(
        command: impl Into<String>,
        performance: Box<dyn Performance>,
        rule: StoppingRule,
        runner: R,
    ) -> Self {
        Self {
            command: command.into(),
            performance,
            rule,
            max_retries: BenchConfig::default().max_retries,
            runner,
            interrupt: None,
        }
    }

    /// Build a session from a validated configuration
    pub fn from_config(command: impl Into<String>, config: &BenchConfig, runner: R) -> Result<Self> {
        config.validate()?;
        let performance = config.performance.strategy(&config.measurement);
        Ok(Self::new(command, performance, config.stopping.clone(), runner)
            .with_max_retries(config.max_retries))
    }

    pub fn with_max_retries(mut self, max_retries: usize) -> Self {
        self.max_retries = max_retries;
        self
    }

    /// Check `flag` between repetitions and stop once it is set
    pub fn with_interrupt(mut self, flag: &'a AtomicBool) -> Self {
        self.interrupt = Some(flag);
        self
    }

    fn interrupted(&self) -> bool {
        self.interrupt
            .is_some_and(|flag| flag.load(Ordering::SeqCst))
    }

    /// Run one repetition and extract its metric
    ///
    /// The repetition's wall time is added to `wall_time` as soon as the
    /// process has finished, even if the run is then discarded.
    fn measure(&mut self, wrapped: &str, wall_time: &mut Duration) -> Result<f64> {
        let invocation = self.runner.run(wrapped)?;
        *wall_time += invocation.elapsed;
        debug!(elapsed_ms = invocation.elapsed.as_millis() as u64, "repetition finished");

        if !invocation.success() {
            return Err(BenchError::TaintedRun {
                marker: "non-zero exit status".to_string(),
                line: match invocation.exit_code {
                    Some(code) => format!("exit code {}", code),
                    None => "terminated by signal".to_string(),
                },
            });
        }

        self.performance.extract_metric(&invocation.trace)
    }

    /// Run repetitions until the stopping rule fires
    ///
    /// # Errors
    ///
    /// Invalid configuration, spawn failures and a degenerate sample mean end
    /// the session with an error. Tainted or unrecognized runs are discarded
    /// and retried instead.
    pub fn run(&mut self) -> Result<SessionReport> {
        self.rule.validate()?;

        let wrapped = self.performance.prepare_invocation(&self.command);
        info!(command = %wrapped, performance = self.performance.name(), "starting session");

        let mut samples: Vec<f64> = Vec::new();
        let mut discarded = 0;
        let mut consecutive_failures = 0;
        let mut wall_time = Duration::ZERO;

        let reason = loop {
            if self.interrupted() {
                break StopReason::Interrupted;
            }

            if let Decision::Stop(reason) = self.rule.evaluate(&samples)? {
                break reason;
            }

            match self.measure(&wrapped, &mut wall_time) {
                Ok(value) => {
                    samples.push(value);
                    consecutive_failures = 0;
                    info!(run = samples.len(), value, "sample recorded");
                }
                Err(e) if e.is_discardable() => {
                    discarded += 1;
                    consecutive_failures += 1;
                    warn!(
                        discarded,
                        consecutive_failures, "discarding repetition: {}", e
                    );
                    if consecutive_failures > self.max_retries {
                        break StopReason::RetriesExhausted;
                    }
                }
                Err(e) => return Err(e),
            }
        };

        let interval = if samples.len() >= 2 {
            Some(confidence(&samples, self.rule.confidence_level)?)
        } else {
            None
        };

        info!(samples = samples.len(), discarded, %reason, "session finished");

        Ok(SessionReport {
            command: self.command.clone(),
            performance: self.performance.name().to_string(),
            samples,
            discarded,
            reason,
            wall_time_secs: wall_time.as_secs_f64(),
            interval,
        })
    }
}
