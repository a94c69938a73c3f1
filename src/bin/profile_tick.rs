use std::time::Duration;

use photocell::core::config::SimulationConfig;
use photocell::simulation::tick::{PhaseTimings, Simulation};

fn main() -> photocell::core::error::Result<()> {
    let config = SimulationConfig {
        seed: Some(7),
        initial_cells: 12_000,
        ..SimulationConfig::with_dims(400, 300)
    };
    println!(
        "Profiling tick phases on a {}x{} grid with {} seeded cells\n",
        config.width, config.height, config.initial_cells
    );

    let mut sim = Simulation::new(config)?;

    // Warm up
    for _ in 0..5 {
        sim.step()?;
    }

    // Profile 100 ticks
    let samples = 100;
    let mut times = PhaseTimings::default();
    for _ in 0..samples {
        let (_, timings) = sim.step_timed()?;
        times += timings;
    }

    println!("=== Average times per tick ({} samples) ===\n", samples);
    println!("Phase           | Time       | % of total");
    println!("----------------|------------|------------");

    let total = times.total();
    let rows = [
        ("Begin", times.begin),
        ("Resolve", times.resolve),
        ("Light", times.light),
        ("End", times.end),
        ("Commit", times.commit),
    ];
    for (name, time) in rows {
        println!(
            "{:<15} | {:>8.2?} | {:>5.1}%",
            name,
            time / samples,
            pct(time, total)
        );
    }
    println!("----------------|------------|------------");
    println!("TOTAL           | {:>8.2?} | 100.0%", total / samples);
    println!("\nPopulation after profiling: {}", sim.world().population());

    Ok(())
}

fn pct(part: Duration, total: Duration) -> f64 {
    if total.is_zero() {
        return 0.0;
    }
    (part.as_nanos() as f64 / total.as_nanos() as f64) * 100.0
}
