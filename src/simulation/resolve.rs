//! Serialized resolution of staged action requests
//!
//! Energy transfers go first so they never depend on whether a feed or move
//! earlier in the pass removed or displaced their target. Feeds run next,
//! then moves. Every topology change goes through the [`World`] mutators, so
//! later lookups in the same pass see it immediately.

use rand::Rng;
use serde::Serialize;

use crate::cell::{ActionKind, ActionRequest};
use crate::core::error::{Result, SimError};
use crate::core::types::CellId;
use crate::ecs::world::World;
use crate::spatial::geometry::Position;

/// A request together with who staged it and from where
#[derive(Debug, Clone, Copy)]
pub struct Staged {
    pub id: CellId,
    pub from: Position,
    pub request: ActionRequest,
}

/// Begin-phase output, bucketed by kind
#[derive(Debug, Default)]
pub struct Requests {
    pub transfers: Vec<Staged>,
    pub feeds: Vec<Staged>,
    pub moves: Vec<Staged>,
}

impl Requests {
    pub fn bucket(staged: impl IntoIterator<Item = Staged>) -> Self {
        let mut requests = Self::default();
        for entry in staged {
            match entry.request.kind {
                ActionKind::Energy => requests.transfers.push(entry),
                ActionKind::Eat => requests.feeds.push(entry),
                ActionKind::Move => requests.moves.push(entry),
            }
        }
        requests
    }
}

/// Counters for one resolve pass
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct ResolveOutcome {
    pub transfers: usize,
    pub feeds: usize,
    pub failed_feeds: usize,
    pub moves: usize,
    pub blocked_moves: usize,
}

/// Whether a feed succeeds, given both sides' energy+power
///
/// An eater at least as strong as its prey always wins. A weaker one wins
/// only if a draw from `[0, diff]` lands below `threshold`.
pub fn feed_succeeds<R: Rng + ?Sized>(eater: u16, prey: u16, threshold: u16, rng: &mut R) -> bool {
    if eater < prey {
        rng.gen_range(0..=prey - eater) < threshold
    } else {
        true
    }
}

/// Resolve every staged request against the world
///
/// Fails only on a broken invariant: a staged direction that no longer
/// leads to an in-bounds position.
pub fn resolve<R: Rng + ?Sized>(
    world: &mut World,
    requests: &Requests,
    feed_threshold: u16,
    rng: &mut R,
) -> Result<ResolveOutcome> {
    let mut outcome = ResolveOutcome::default();

    for staged in &requests.transfers {
        let target = target_of(world, staged)?;
        let delivered = match world.cell_at(target).and_then(|id| world.cell_mut(id)) {
            Some(receiver) => {
                receiver.add_energy(staged.request.amount);
                true
            }
            None => false,
        };
        if delivered {
            outcome.transfers += 1;
        }
        write_result(world, staged.id, delivered);
    }

    for staged in &requests.feeds {
        if world.cell_at(staged.from) != Some(staged.id) {
            continue;
        }
        let target = target_of(world, staged)?;
        let won = match world.cell_at(target) {
            Some(prey) => feed(world, staged.id, prey, feed_threshold, rng),
            None => false,
        };
        if won {
            outcome.feeds += 1;
        } else {
            outcome.failed_feeds += 1;
        }
        write_result(world, staged.id, won);
    }

    for staged in &requests.moves {
        if world.cell_at(staged.from) != Some(staged.id) {
            continue;
        }
        let target = target_of(world, staged)?;
        let moved = world.relocate(staged.id, target);
        if moved {
            outcome.moves += 1;
        } else {
            outcome.blocked_moves += 1;
        }
        write_result(world, staged.id, moved);
    }

    Ok(outcome)
}

fn feed<R: Rng + ?Sized>(
    world: &mut World,
    eater: CellId,
    prey: CellId,
    threshold: u16,
    rng: &mut R,
) -> bool {
    let (Some(eater_cell), Some(prey_cell)) = (world.cell(eater), world.cell(prey)) else {
        return false;
    };
    let eater_potential = eater_cell.energy() as u16 + eater_cell.power() as u16;
    let prey_potential = prey_cell.energy() as u16 + prey_cell.power() as u16;
    let prey_energy = prey_cell.energy();

    if !feed_succeeds(eater_potential, prey_potential, threshold, rng) {
        tracing::trace!(?eater, ?prey, eater_potential, prey_potential, "feed failed");
        return false;
    }

    let gain = rng.gen_range(prey_energy / 2..=prey_energy);
    if let Some(cell) = world.cell_mut(eater) {
        cell.add_energy(gain);
    }
    world.remove(prey);
    tracing::trace!(?eater, ?prey, gain, "feed succeeded");
    true
}

fn target_of(world: &World, staged: &Staged) -> Result<Position> {
    staged
        .from
        .step(staged.request.dir, world.dims())
        .ok_or_else(|| {
            SimError::InvariantViolation(format!(
                "{:?} request from {:?} points {:?} off the grid",
                staged.request.kind, staged.from, staged.request.dir
            ))
        })
}

fn write_result(world: &mut World, id: CellId, success: bool) {
    if let Some(request) = world.cell_mut(id).and_then(|cell| cell.request_mut()) {
        request.result = success as u8;
    }
}
