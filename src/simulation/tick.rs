//! Tick system - orchestrates one generation
//!
//! Every tick runs five strictly ordered phases:
//! begin (parallel) -> resolve -> light -> end (parallel) -> commit
//!
//! The parallel phases only touch each cell's own state and read the rest of
//! the world. Topology changes happen in resolve and commit, which run on the
//! calling thread.

use std::time::{Duration, Instant};

use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use rayon::prelude::*;
use serde::Serialize;

use crate::cell::{Cell, EndOfTick, Lifespan};
use crate::core::config::SimulationConfig;
use crate::core::error::Result;
use crate::core::types::{CellId, Tick};
use crate::ecs::world::{PhaseParts, World, WorldView};
use crate::simulation::lifecycle::{
    self, lower_mutation_rate, raise_mutation_rate, DeathCounts, Reproduction, Verdicts,
};
use crate::simulation::light::update_light;
use crate::simulation::resolve::{self, Requests, Staged};
use crate::simulation::workers::{job_rng, should_parallelize};

/// What happened during one tick
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize)]
pub struct TickSummary {
    /// The tick that was just run
    pub tick: Tick,
    /// Living cells after commit
    pub population: usize,
    pub births: usize,
    pub deaths: DeathCounts,
    pub moves: usize,
    pub blocked_moves: usize,
    pub feeds: usize,
    pub failed_feeds: usize,
    pub transfers: usize,
}

/// Wall time spent in each phase of one tick
#[derive(Debug, Clone, Copy, Default)]
pub struct PhaseTimings {
    pub begin: Duration,
    pub resolve: Duration,
    pub light: Duration,
    pub end: Duration,
    pub commit: Duration,
}

impl PhaseTimings {
    pub fn total(&self) -> Duration {
        self.begin + self.resolve + self.light + self.end + self.commit
    }
}

impl std::ops::AddAssign for PhaseTimings {
    fn add_assign(&mut self, other: Self) {
        self.begin += other.begin;
        self.resolve += other.resolve;
        self.light += other.light;
        self.end += other.end;
        self.commit += other.commit;
    }
}

/// A running simulation: config, world and the master random generator
pub struct Simulation {
    config: SimulationConfig,
    world: World,
    rng: ChaCha8Rng,
    seed: u64,
    mutation_rate: usize,
}

impl Simulation {
    /// Validate `config`, build an empty world and spawn `initial_cells`
    pub fn new(config: SimulationConfig) -> Result<Self> {
        config.validate()?;
        let seed = config.seed.unwrap_or_else(rand::random);
        let mut sim = Self {
            world: World::new(config.dims()),
            rng: ChaCha8Rng::seed_from_u64(seed),
            seed,
            mutation_rate: config.mutation_rate,
            config,
        };
        if sim.config.initial_cells > 0 {
            lifecycle::spawn_cells(&mut sim.world, sim.config.initial_cells, &mut sim.rng)?;
        }
        tracing::info!(
            width = sim.config.width,
            height = sim.config.height,
            seed,
            initial_cells = sim.config.initial_cells,
            "simulation created"
        );
        Ok(sim)
    }

    pub fn config(&self) -> &SimulationConfig {
        &self.config
    }

    pub fn world(&self) -> &World {
        &self.world
    }

    /// Mutable world access for seeding scenarios between ticks
    pub fn world_mut(&mut self) -> &mut World {
        &mut self.world
    }

    /// Seed the master generator was built from
    pub fn seed(&self) -> u64 {
        self.seed
    }

    pub fn current_tick(&self) -> Tick {
        self.world.current_tick
    }

    pub fn mutation_rate(&self) -> usize {
        self.mutation_rate
    }

    pub fn set_mutation_rate(&mut self, rate: usize) {
        self.mutation_rate = rate;
        tracing::info!(mutation_rate = rate, "mutation rate set");
    }

    pub fn raise_mutation_rate(&mut self) -> usize {
        self.set_mutation_rate(raise_mutation_rate(self.mutation_rate));
        self.mutation_rate
    }

    pub fn lower_mutation_rate(&mut self) -> usize {
        self.set_mutation_rate(lower_mutation_rate(self.mutation_rate));
        self.mutation_rate
    }

    /// External spawn command: `spawn_batch` default cells at random positions
    pub fn spawn_batch(&mut self) -> Result<usize> {
        let count = lifecycle::spawn_cells(&mut self.world, self.config.spawn_batch, &mut self.rng)?;
        tracing::info!(count, population = self.world.population(), "spawned cells");
        Ok(count)
    }

    fn lifespan(&self) -> Lifespan {
        Lifespan {
            division_energy: self.config.division_energy,
            max_age: self.config.max_age,
        }
    }

    /// Run one full tick
    pub fn step(&mut self) -> Result<TickSummary> {
        self.step_timed().map(|(summary, _)| summary)
    }

    /// Run one full tick, timing each phase
    pub fn step_timed(&mut self) -> Result<(TickSummary, PhaseTimings)> {
        let mut timings = PhaseTimings::default();
        let tick = self.world.current_tick;
        let tick_seed: u64 = self.rng.gen();
        let parallel = should_parallelize(self.world.population(), self.config.parallel_threshold);

        let start = Instant::now();
        let requests = self.begin_phase(parallel);
        timings.begin = start.elapsed();

        let start = Instant::now();
        let resolved = resolve::resolve(
            &mut self.world,
            &requests,
            self.config.feed_threshold,
            &mut self.rng,
        )?;
        timings.resolve = start.elapsed();

        let start = Instant::now();
        let (light, occupancy) = self.world.light_parts();
        update_light(light, occupancy, tick, tick_seed);
        timings.light = start.elapsed();

        let start = Instant::now();
        let verdicts = self.end_phase(parallel, tick_seed);
        timings.end = start.elapsed();

        let start = Instant::now();
        let reproduction = Reproduction {
            mutation_rate: self.mutation_rate,
            division_failure: self.config.division_failure,
        };
        let committed = lifecycle::commit(&mut self.world, &verdicts, reproduction, &mut self.rng)?;
        timings.commit = start.elapsed();

        self.world.tick();

        let mut deaths = committed.deaths;
        deaths.eaten += resolved.feeds;
        let summary = TickSummary {
            tick,
            population: self.world.population(),
            births: committed.births,
            deaths,
            moves: resolved.moves,
            blocked_moves: resolved.blocked_moves,
            feeds: resolved.feeds,
            failed_feeds: resolved.failed_feeds,
            transfers: resolved.transfers,
        };

        tracing::debug!(
            tick,
            population = summary.population,
            births = summary.births,
            deaths = summary.deaths.total(),
            moves = summary.moves,
            feeds = summary.feeds,
            "tick complete"
        );

        Ok((summary, timings))
    }

    /// Execute one instruction in every living cell and bucket the requests
    fn begin_phase(&mut self, parallel: bool) -> Requests {
        let PhaseParts {
            dims,
            cells,
            programs,
            positions,
            generations,
            alive,
            index,
            light,
        } = self.world.phase_parts();
        let energies: Vec<u8> = cells.iter().map(Cell::energy).collect();
        let view = WorldView::new(dims, index, light, programs, &energies);

        let run = |(slot, cell): (usize, &mut Cell)| -> Option<Staged> {
            if !alive[slot] {
                return None;
            }
            let from = positions[slot];
            cell.begin_tick(from, &programs[slot], &view).map(|request| Staged {
                id: CellId::new(slot as u32, generations[slot]),
                from,
                request,
            })
        };

        let staged: Vec<Staged> = if parallel {
            cells.par_iter_mut().enumerate().filter_map(run).collect()
        } else {
            cells.iter_mut().enumerate().filter_map(run).collect()
        };
        Requests::bucket(staged)
    }

    /// Settle every living cell and collect births and deaths
    fn end_phase(&mut self, parallel: bool, tick_seed: u64) -> Verdicts {
        let lifespan = self.lifespan();
        let chunk = self.config.worker_chunk;
        let PhaseParts {
            cells,
            positions,
            generations,
            alive,
            light,
            ..
        } = self.world.phase_parts();

        let run = |(job, cells): (usize, &mut [Cell])| -> Vec<(CellId, EndOfTick)> {
            let mut rng = job_rng(tick_seed, job as u64);
            let base = job * chunk;
            cells
                .iter_mut()
                .enumerate()
                .filter_map(|(offset, cell)| {
                    let slot = base + offset;
                    if !alive[slot] {
                        return None;
                    }
                    let level = light.get(positions[slot]).copied().unwrap_or(0);
                    match cell.end_tick(level, &lifespan, &mut rng) {
                        EndOfTick::None => None,
                        verdict => Some((CellId::new(slot as u32, generations[slot]), verdict)),
                    }
                })
                .collect()
        };

        let outcomes: Vec<(CellId, EndOfTick)> = if parallel {
            cells.par_chunks_mut(chunk).enumerate().flat_map_iter(run).collect()
        } else {
            cells.chunks_mut(chunk).enumerate().flat_map(run).collect()
        };

        let mut verdicts = Verdicts::default();
        for (id, outcome) in outcomes {
            match outcome {
                EndOfTick::Divide => verdicts.divisions.push(id),
                EndOfTick::Die(cause) => verdicts.deaths.push((id, cause)),
                EndOfTick::None => {}
            }
        }
        verdicts
    }
}
