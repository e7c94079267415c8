//! Process runner: executes one wrapped command line per repetition
//!
//! The command runs through the configured shell with stdout and stderr
//! both redirected into a single trace file, so a measurement wrapper that
//! reports on stderr (like `time -p`) ends up next to the program's own
//! output. The trace file is removed after reading unless a trace directory
//! is configured.
//!
//! Each invocation gets its own process group. On timeout the whole group
//! is killed, including anything the measurement wrapper forked. A SIGINT
//! from the terminal therefore only reaches benchmarkr, which finishes the
//! current repetition before stopping.

use crate::error::{BenchError, Result};
use nix::sys::signal::{killpg, Signal};
use nix::unistd::Pid;
use serde::{Deserialize, Serialize};
use std::fs;
use std::os::unix::process::CommandExt;
use std::path::PathBuf;
use std::process::{Command, ExitStatus, Stdio};
use std::thread;
use std::time::{Duration, Instant};
use tempfile::NamedTempFile;
use tracing::{debug, warn};

/// How often a child is polled while a timeout is armed
const POLL_INTERVAL: Duration = Duration::from_millis(10);

/// Process spawning settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RunnerConfig {
    /// Shell used to interpret the wrapped command (`<shell> -c <cmd>`)
    pub shell: String,

    /// Kill an invocation after this many seconds (None = wait forever)
    pub timeout_secs: Option<f64>,

    /// Keep each repetition's trace file in this directory
    pub trace_dir: Option<PathBuf>,
}

impl Default for RunnerConfig {
    fn default() -> Self {
        Self {
            shell: "sh".to_string(),
            timeout_secs: None,
            trace_dir: None,
        }
    }
}

impl RunnerConfig {
    pub fn validate(&self) -> Result<()> {
        if self.shell.trim().is_empty() {
            return Err(BenchError::InvalidConfig(
                "runner.shell must not be empty".to_string(),
            ));
        }

        if let Some(secs) = self.timeout_secs {
            if !(secs.is_finite() && secs > 0.0) {
                return Err(BenchError::InvalidConfig(format!(
                    "runner.timeout_secs must be positive, got {}",
                    secs
                )));
            }
            if Duration::try_from_secs_f64(secs).is_err() {
                return Err(BenchError::InvalidConfig(format!(
                    "runner.timeout_secs is too large, got {}",
                    secs
                )));
            }
        }

        Ok(())
    }

    fn timeout(&self) -> Option<Duration> {
        self.timeout_secs
            .and_then(|secs| Duration::try_from_secs_f64(secs).ok())
    }
}

/// Captured result of one invocation
#[derive(Debug, Clone)]
pub struct Invocation {
    /// Combined stdout and stderr
    pub trace: String,
    /// Exit code, None if the process was killed by a signal
    pub exit_code: Option<i32>,
    /// Wall time observed by the runner
    pub elapsed: Duration,
    /// Where the trace was kept, if a trace directory is configured
    pub trace_path: Option<PathBuf>,
}

impl Invocation {
    pub fn success(&self) -> bool {
        self.exit_code == Some(0)
    }
}

/// Executes wrapped command lines
///
/// The driver only depends on this trait so sessions can be exercised
/// without spawning real processes.
pub trait CommandRunner {
    fn run(&mut self, command: &str) -> Result<Invocation>;
}

/// Runs commands through a shell as child processes
#[derive(Debug, Clone, Default)]
pub struct ShellRunner {
    config: RunnerConfig,
    runs: usize,
}

impl ShellRunner {
    pub fn new(config: RunnerConfig) -> Self {
        Self { config, runs: 0 }
    }

    fn trace_file(&self) -> Result<NamedTempFile> {
        let file = match &self.config.trace_dir {
            Some(dir) => {
                fs::create_dir_all(dir)?;
                tempfile::Builder::new()
                    .prefix(&format!("run-{:04}-", self.runs))
                    .suffix(".trace")
                    .tempfile_in(dir)?
            }
            None => tempfile::Builder::new()
                .prefix("benchmarkr-")
                .suffix(".trace")
                .tempfile()?,
        };
        Ok(file)
    }

    fn wait(&self, child: &mut std::process::Child) -> Result<Option<ExitStatus>> {
        let Some(limit) = self.config.timeout() else {
            return Ok(Some(child.wait()?));
        };

        let start = Instant::now();
        loop {
            if let Some(status) = child.try_wait()? {
                return Ok(Some(status));
            }

            if start.elapsed() >= limit {
                warn!(pid = child.id(), "invocation timed out, killing process group");
                // The group leader is the spawned shell, its pid is the pgid
                let group = Pid::from_raw(child.id() as i32);
                if let Err(e) = killpg(group, Signal::SIGKILL) {
                    debug!("killpg failed: {}", e);
                    if let Err(e) = child.kill() {
                        debug!("kill failed: {}", e);
                    }
                }
                child.wait()?;
                return Ok(None);
            }

            thread::sleep(POLL_INTERVAL);
        }
    }
}

impl CommandRunner for ShellRunner {
    fn run(&mut self, command: &str) -> Result<Invocation> {
        self.runs += 1;
        let file = self.trace_file()?;
        let stdout = file.as_file().try_clone()?;
        let stderr = file.as_file().try_clone()?;

        debug!(run = self.runs, shell = %self.config.shell, command, "spawning");
        let start = Instant::now();
        let mut child = Command::new(&self.config.shell)
            .arg("-c")
            .arg(command)
            .stdin(Stdio::null())
            .stdout(Stdio::from(stdout))
            .stderr(Stdio::from(stderr))
            .process_group(0)
            .spawn()?;

        let status = self.wait(&mut child)?;
        let elapsed = start.elapsed();

        let trace = String::from_utf8_lossy(&fs::read(file.path())?).into_owned();

        let trace_path = if self.config.trace_dir.is_some() {
            let (_, path) = file.keep().map_err(|e| BenchError::Io(e.error))?;
            Some(path)
        } else {
            None
        };

        let Some(status) = status else {
            return Err(BenchError::Timeout {
                seconds: self.config.timeout_secs.unwrap_or_default(),
            });
        };

        debug!(
            run = self.runs,
            exit_code = ?status.code(),
            elapsed_ms = elapsed.as_millis() as u64,
            "invocation finished"
        );

        Ok(Invocation {
            trace,
            exit_code: status.code(),
            elapsed,
            trace_path,
        })
    }
}
