//! Vantage CLI
//!
//! Run camera arbitration scenarios and inspect what the output would see.

use anyhow::Result;
use clap::{Parser, Subcommand};
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use tracing::info;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

mod scenario;
mod simulation;

use scenario::Scenario;
use simulation::Simulation;

#[derive(Parser)]
#[command(name = "vantage")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(about = "Vantage camera arbitration CLI", long_about = None)]
struct Cli {
    /// Enable verbose output
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run a scenario and print the output pose per frame
    Run {
        /// Scenario file
        scenario: PathBuf,

        /// Print one JSON record per line
        #[arg(long)]
        json: bool,

        /// Override the scenario duration in seconds
        #[arg(short, long)]
        duration: Option<f32>,
    },

    /// Validate a scenario file
    Check {
        /// Scenario file
        scenario: PathBuf,
    },
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    // Logs go to stderr so --json output stays parseable
    let filter = if cli.verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::new("info")
    };

    tracing_subscriber::registry()
        .with(fmt::layer().with_writer(io::stderr))
        .with(filter)
        .init();

    match cli.command {
        Commands::Run {
            scenario,
            json,
            duration,
        } => cmd_run(&scenario, json, duration),

        Commands::Check { scenario } => cmd_check(&scenario),
    }
}

fn cmd_run(path: &Path, json: bool, duration: Option<f32>) -> Result<()> {
    let mut scenario = Scenario::load(path)?;
    if let Some(duration) = duration {
        if duration < 0.0 {
            anyhow::bail!("Invalid duration {}", duration);
        }
        scenario.run.duration = duration;
    }

    info!(
        "Running {} ({} cameras, {} actions)",
        path.display(),
        scenario.cameras.len(),
        scenario.actions.len()
    );

    let mut simulation = Simulation::new(scenario);
    let stdout = io::stdout();
    let mut out = stdout.lock();
    let mut result = Ok(());

    simulation.run(|record| {
        if result.is_err() {
            return;
        }
        result = if json {
            serde_json::to_writer(&mut out, record)
                .map_err(anyhow::Error::from)
                .and_then(|_| writeln!(out).map_err(anyhow::Error::from))
        } else {
            writeln!(out, "{}", record.to_line()).map_err(anyhow::Error::from)
        };
    });
    result?;

    info!("Finished {} frames", simulation.frame_count());
    Ok(())
}

fn cmd_check(path: &Path) -> Result<()> {
    let scenario = Scenario::load(path)?;

    info!(
        "Scenario OK: brain '{}', {} cameras, {} actions, {} frames",
        scenario.brain.name,
        scenario.cameras.len(),
        scenario.actions.len(),
        scenario.run.frame_count()
    );

    Ok(())
}
