use anyhow::{Context, Result};
use benchmarkr::cli::Cli;
use benchmarkr::config::BenchConfig;
use benchmarkr::driver::{install_interrupt_handler, Benchmark};
use benchmarkr::runner::ShellRunner;
use benchmarkr::stopping::{simulate, StopReason};
use benchmarkr::{report, samples};
use clap::Parser;
use std::path::Path;
use tracing_subscriber::EnvFilter;

/// Initialize tracing subscriber for debug output
fn init_tracing(debug: bool) {
    if debug {
        tracing_subscriber::fmt()
            .with_env_filter(
                EnvFilter::from_default_env().add_directive(tracing::Level::DEBUG.into()),
            )
            .with_writer(std::io::stderr)
            .init();
    }
}

/// Replay the stopping rule over a recorded sample file
fn run_simulation(path: &Path, config: &BenchConfig, args: &Cli) -> Result<()> {
    let values = samples::read_samples(path)
        .with_context(|| format!("Failed to read samples from {}", path.display()))?;
    let simulation = simulate(&config.stopping, &values)?;
    print!("{}", report::render_simulation(&simulation, args.format)?);
    Ok(())
}

/// Run the command until the stopping rule fires
fn run_benchmark(command: String, config: &BenchConfig, args: &Cli) -> Result<()> {
    let interrupt = install_interrupt_handler().context("Failed to install SIGINT handler")?;
    let runner = ShellRunner::new(config.runner.clone());

    let mut benchmark = Benchmark::from_config(command, config, runner)?.with_interrupt(interrupt);
    let session = benchmark.run()?;

    print!("{}", report::render_session(&session, args.format)?);

    if session.reason == StopReason::RetriesExhausted {
        anyhow::bail!(
            "Gave up after {} consecutive discarded runs",
            config.max_retries + 1
        );
    }

    Ok(())
}

fn main() -> Result<()> {
    let args = Cli::parse();

    // Initialize tracing if --debug flag is set
    init_tracing(args.debug);

    let mut config = match &args.config {
        Some(path) => BenchConfig::from_file(path)?,
        None => BenchConfig::default(),
    };
    args.apply_to(&mut config);
    config.validate()?;

    if let Some(path) = &args.simulate {
        return run_simulation(path, &config, &args);
    }

    let Some(command) = args.benchmark_command() else {
        anyhow::bail!(
            "You must specify a command to benchmark. Usage: benchmarkr -e CMD or benchmarkr -- COMMAND [ARGS...]"
        );
    };

    run_benchmark(command, &config, &args)
}
