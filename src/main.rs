//! Photocell - Entry Point
//!
//! Headless runner: builds a simulation from the command line (and an
//! optional TOML config), runs it for a number of ticks and reports
//! throughput and population as it goes.

use std::path::PathBuf;
use std::process::ExitCode;
use std::time::Instant;

use clap::Parser;
use tracing_subscriber::EnvFilter;

use photocell::core::config::SimulationConfig;
use photocell::core::error::Result;
use photocell::render;
use photocell::simulation::tick::Simulation;

/// Photocell - evolve bytecode cells on a lit grid
#[derive(Parser, Debug)]
#[command(name = "photocell")]
#[command(about = "Run the cell grid simulation headless")]
struct Args {
    /// Grid width in cells
    width: Option<usize>,

    /// Grid height in cells
    height: Option<usize>,

    /// Ticks to run
    #[arg(long, default_value_t = 10_000)]
    ticks: u64,

    /// Random seed for deterministic runs
    #[arg(long)]
    seed: Option<u64>,

    /// Upper bound of the mutation count per division
    #[arg(long)]
    mutation_rate: Option<usize>,

    /// TOML config file; command-line values override it
    #[arg(long)]
    config: Option<PathBuf>,

    /// Issue a spawn command every N ticks (0 = only at start)
    #[arg(long, default_value_t = 0)]
    spawn_every: u64,

    /// Ticks between progress reports
    #[arg(long, default_value_t = 100)]
    report_every: u64,

    /// Write a PNG of the final frame here
    #[arg(long)]
    snapshot: Option<PathBuf>,

    /// Print each progress report as a JSON tick summary on stdout
    #[arg(long)]
    json: bool,
}

fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("photocell=info")),
        )
        .init();

    let args = Args::parse();
    match run(&args) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            tracing::error!(error = %e, "simulation aborted");
            ExitCode::FAILURE
        }
    }
}

fn build_config(args: &Args) -> Result<SimulationConfig> {
    let mut config = match &args.config {
        Some(path) => SimulationConfig::load(path)?,
        None => SimulationConfig::default(),
    };
    if let Some(width) = args.width {
        config.width = width;
    }
    if let Some(height) = args.height {
        config.height = height;
    }
    if let Some(seed) = args.seed {
        config.seed = Some(seed);
    }
    if let Some(rate) = args.mutation_rate {
        config.mutation_rate = rate;
    }
    config.validate()?;
    Ok(config)
}

fn run(args: &Args) -> Result<()> {
    let config = build_config(args)?;
    let mut sim = Simulation::new(config)?;
    tracing::info!(seed = sim.seed(), "Photocell starting...");

    if sim.world().population() == 0 {
        sim.spawn_batch()?;
    }

    let report_every = args.report_every.max(1);
    let mut window_start = Instant::now();

    for t in 1..=args.ticks {
        if args.spawn_every > 0 && t % args.spawn_every == 0 {
            sim.spawn_batch()?;
        }

        let summary = sim.step()?;

        if t % report_every == 0 {
            let elapsed = window_start.elapsed().as_secs_f64();
            let rate = if elapsed > 0.0 {
                report_every as f64 / elapsed
            } else {
                0.0
            };
            window_start = Instant::now();

            let stats = sim.world().stats();
            tracing::info!(
                tick = summary.tick,
                population = stats.population,
                mean_age = %format!("{:.1}", stats.mean_age),
                ticks_per_sec = %format!("{:.1}", rate),
                "progress"
            );
            if args.json {
                println!("{}", serde_json::to_string(&summary)?);
            }
        }

        if summary.population == 0 && args.spawn_every == 0 {
            tracing::info!(tick = summary.tick, "population extinct");
            break;
        }
    }

    if let Some(path) = &args.snapshot {
        render::save_png(sim.world(), path)?;
    }

    let stats = sim.world().stats();
    tracing::info!(
        ticks = sim.current_tick(),
        population = stats.population,
        total_energy = stats.total_energy,
        "Photocell finished"
    );
    Ok(())
}
