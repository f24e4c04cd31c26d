//! playloop: run functional and HA playbook jobs in retry loops.
//!
//! # Usage
//!
//! ```bash
//! # Every job found under the test directory
//! playloop -c playloop.toml
//!
//! # Jobs from one or more plan files in <test_directory>/plans
//! playloop -c playloop.toml -p smoke,failover
//!
//! # Reproducible HA ordering
//! playloop -c playloop.toml --seed 42
//! ```

use std::path::PathBuf;

use anyhow::Context;
use clap::Parser;
use playloop_core::{load_dotenv, resolve_job_set, JobSource, PlayloopConfig};
use playloop_runner::{AnsibleLauncher, CsvReport, LaunchSettings};
use playloop_scheduler::{IntervalTicker, Limits, Scheduler};
use rand::rngs::StdRng;
use rand::SeedableRng;

/// Exit status used when interrupted by Ctrl-C.
const EXIT_INTERRUPTED: i32 = 130;

/// Run playbook test jobs in bounded retry loops.
#[derive(Parser, Debug)]
#[command(name = "playloop", version, about)]
struct Cli {
    /// Path to the TOML configuration file.
    #[arg(short, long, env = "PLAYLOOP_CONFIG")]
    config: PathBuf,

    /// Comma-separated plan names (without extension).
    #[arg(short, long)]
    plan: Option<String>,

    /// Seed for HA job selection.
    #[arg(long, env = "PLAYLOOP_SEED")]
    seed: Option<u64>,

    /// Enable debug logging.
    #[arg(long)]
    debug: bool,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    load_dotenv();
    let cli = Cli::parse();

    let default_level = if cli.debug { "debug" } else { "info" };
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(default_level)),
        )
        .init();

    tracing::info!(?cli, "starting playloop");

    let config = PlayloopConfig::from_file(&cli.config)
        .with_context(|| format!("loading config {}", cli.config.display()))?;
    let general = &config.general;

    let source = JobSource::select(cli.plan.as_deref(), &config);
    let jobs = resolve_job_set(&source, &config).context("resolving job set")?;
    if jobs.is_empty() {
        tracing::warn!(%source, "no jobs to run");
    }

    let mut report = CsvReport::new(general.report_path(), &jobs);
    report.flush().context("writing initial report")?;

    let launcher = AnsibleLauncher::new(LaunchSettings::from_config(&config));
    let rng = match cli.seed {
        Some(seed) => StdRng::seed_from_u64(seed),
        None => StdRng::from_entropy(),
    };
    let limits = Limits::new(general.iterations, general.max_failures);
    let mut ticker = IntervalTicker::new(general.sweep_interval());

    let mut scheduler = Scheduler::new(limits, launcher, &mut report, rng);
    scheduler.start(&jobs);

    let interrupted = tokio::select! {
        _ = scheduler.run(&mut ticker) => false,
        _ = tokio::signal::ctrl_c() => true,
    };

    let summary = serde_json::to_string(scheduler.metrics()).context("serializing metrics")?;
    tracing::info!(%summary, "run summary");

    if interrupted {
        tracing::warn!(
            running = scheduler.running().count(),
            "interrupted, stopping running attempts"
        );
        // Dropping the scheduler drops every child handle, which kills them.
        drop(scheduler);
        if let Err(e) = report.flush() {
            tracing::warn!(error = %e, "final report write failed");
        }
        std::process::exit(EXIT_INTERRUPTED);
    }

    drop(scheduler);
    tracing::info!(report = %report.path().display(), "playloop finished");
    Ok(())
}
