//! Cell storage with SoA layout
//!
//! Slots are recycled through a free list. Each free bumps the slot's
//! generation, so a stale [`CellId`] never resolves to a newer cell.

use crate::cell::{Cell, Program};
use crate::core::types::CellId;
use crate::spatial::geometry::Position;

/// Structure of Arrays for cells
///
/// Programs are kept apart from the mutable cell state so the begin phase can
/// hand every cell `&mut` access to its own state while all programs stay
/// shared.
#[derive(Debug, Default)]
pub struct CellArchetype {
    pub cells: Vec<Cell>,
    pub programs: Vec<Program>,
    pub positions: Vec<Position>,
    pub generations: Vec<u32>,
    pub alive: Vec<bool>,
    free: Vec<u32>,
    living: usize,
}

impl CellArchetype {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of living cells
    pub fn count(&self) -> usize {
        self.living
    }

    pub fn spawn(&mut self, cell: Cell, program: Program, pos: Position) -> CellId {
        self.living += 1;

        if let Some(index) = self.free.pop() {
            let i = index as usize;
            self.cells[i] = cell;
            self.programs[i] = program;
            self.positions[i] = pos;
            self.alive[i] = true;
            return CellId::new(index, self.generations[i]);
        }

        let index = self.alive.len() as u32;
        self.cells.push(cell);
        self.programs.push(program);
        self.positions.push(pos);
        self.generations.push(0);
        self.alive.push(true);
        CellId::new(index, 0)
    }

    /// Free the slot behind `id`. Returns false if `id` was already stale.
    pub fn despawn(&mut self, id: CellId) -> bool {
        if !self.contains(id) {
            return false;
        }
        let i = id.slot();
        self.alive[i] = false;
        self.generations[i] = self.generations[i].wrapping_add(1);
        self.free.push(id.index);
        self.living -= 1;
        true
    }

    #[inline]
    pub fn contains(&self, id: CellId) -> bool {
        let i = id.slot();
        i < self.alive.len() && self.alive[i] && self.generations[i] == id.generation
    }

    /// Current handle of a living slot
    #[inline]
    pub fn id_at(&self, slot: usize) -> Option<CellId> {
        (slot < self.alive.len() && self.alive[slot])
            .then(|| CellId::new(slot as u32, self.generations[slot]))
    }

    pub fn iter_living(&self) -> impl Iterator<Item = usize> + '_ {
        self.alive
            .iter()
            .enumerate()
            .filter(|(_, &alive)| alive)
            .map(|(i, _)| i)
    }
}
