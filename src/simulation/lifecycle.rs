//! Births and deaths
//!
//! Commit applies the end-phase verdicts to the world: first every death,
//! then every division. Also home to the external spawn command and the
//! mutation-rate steps.

use rand::Rng;
use serde::Serialize;

use crate::cell::{Cell, DeathCause, Program};
use crate::core::config::DivisionFailure;
use crate::core::error::Result;
use crate::core::types::CellId;
use crate::ecs::world::World;
use crate::spatial::geometry::Position;

/// End-phase output
#[derive(Debug, Default)]
pub struct Verdicts {
    pub deaths: Vec<(CellId, DeathCause)>,
    pub divisions: Vec<CellId>,
}

/// Deaths per cause over one tick
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct DeathCounts {
    pub starvation: usize,
    pub old_age: usize,
    pub eaten: usize,
    pub no_room: usize,
}

impl DeathCounts {
    pub fn record(&mut self, cause: DeathCause) {
        match cause {
            DeathCause::Starvation => self.starvation += 1,
            DeathCause::OldAge => self.old_age += 1,
            DeathCause::Eaten => self.eaten += 1,
            DeathCause::NoRoomToDivide => self.no_room += 1,
        }
    }

    pub fn total(&self) -> usize {
        self.starvation + self.old_age + self.eaten + self.no_room
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct CommitOutcome {
    pub births: usize,
    pub deaths: DeathCounts,
}

/// Commit parameters that can change between ticks
#[derive(Debug, Clone, Copy)]
pub struct Reproduction {
    pub mutation_rate: usize,
    pub division_failure: DivisionFailure,
}

/// Apply deaths, then divisions
///
/// Divisions are processed in verdict order; a child placed by one division
/// already blocks the positions seen by the next.
pub fn commit<R: Rng + ?Sized>(
    world: &mut World,
    verdicts: &Verdicts,
    reproduction: Reproduction,
    rng: &mut R,
) -> Result<CommitOutcome> {
    let mut outcome = CommitOutcome::default();

    for &(id, cause) in &verdicts.deaths {
        if world.remove(id) {
            outcome.deaths.record(cause);
        }
    }

    for &parent in &verdicts.divisions {
        let Some(at) = world.position(parent) else {
            continue;
        };
        let free: Vec<Position> = at
            .neighbors(world.dims())
            .map(|(_, pos)| pos)
            .filter(|&pos| !world.is_occupied(pos))
            .collect();

        if free.is_empty() {
            tracing::trace!(?parent, ?at, policy = ?reproduction.division_failure, "no room to divide");
            if reproduction.division_failure == DivisionFailure::ParentDies && world.remove(parent) {
                outcome.deaths.record(DeathCause::NoRoomToDivide);
            }
            continue;
        }

        let (Some(cell), Some(program)) = (world.cell(parent), world.program(parent)) else {
            continue;
        };
        let child = cell.fork();
        let mut child_program = program.clone();
        child_program.mutate(rng.gen_range(0..=reproduction.mutation_rate), rng);

        let target = free[rng.gen_range(0..free.len())];
        world.insert(target, child, child_program)?;
        outcome.births += 1;
    }

    Ok(outcome)
}

/// Drop `count` default cells at uniformly random positions
///
/// A cell already at a chosen position is replaced.
pub fn spawn_cells<R: Rng + ?Sized>(world: &mut World, count: usize, rng: &mut R) -> Result<usize> {
    let dims = world.dims();
    for _ in 0..count {
        let pos = Position::new(rng.gen_range(0..dims.height), rng.gen_range(0..dims.width));
        world.insert(pos, Cell::new(), Program::default())?;
    }
    Ok(count)
}

/// Next mutation rate up: steps of 5 from 5 upward, steps of 1 below
pub fn raise_mutation_rate(rate: usize) -> usize {
    if rate >= 5 {
        rate + 5
    } else {
        rate + 1
    }
}

/// Next mutation rate down, never below zero
pub fn lower_mutation_rate(rate: usize) -> usize {
    if rate > 5 {
        rate - 5
    } else {
        rate.saturating_sub(1)
    }
}
