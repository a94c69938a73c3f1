//! ECS World - owns every cell, the position index and the light field
//!
//! The index maps each position to the handle of the cell living there. Only
//! [`World::insert`], [`World::remove`] and [`World::relocate`] change it, and
//! the scheduler only calls those from its serialized phases.

use serde::Serialize;

use crate::cell::{Cell, Neighbor, Program, Surroundings};
use crate::core::error::{Result, SimError};
use crate::core::types::{CellId, Tick};
use crate::ecs::archetype::CellArchetype;
use crate::spatial::geometry::{GridDims, Position};
use crate::spatial::grid::Grid;

/// Aggregate figures over the living population
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize)]
pub struct PopulationStats {
    pub population: usize,
    pub total_energy: u64,
    pub total_power: u64,
    pub mean_age: f64,
}

/// The simulation world containing all cells
#[derive(Debug)]
pub struct World {
    pub current_tick: Tick,
    dims: GridDims,
    cells: CellArchetype,
    index: Grid<Option<CellId>>,
    light: Grid<u8>,
}

impl World {
    pub fn new(dims: GridDims) -> Self {
        Self {
            current_tick: 0,
            dims,
            cells: CellArchetype::new(),
            index: Grid::new(dims),
            light: Grid::new(dims),
        }
    }

    pub fn dims(&self) -> GridDims {
        self.dims
    }

    pub fn population(&self) -> usize {
        self.cells.count()
    }

    pub fn tick(&mut self) {
        self.current_tick += 1;
    }

    /// Handle of the cell at `pos`. Out-of-bounds positions are empty.
    #[inline]
    pub fn cell_at(&self, pos: Position) -> Option<CellId> {
        self.index.get(pos).copied().flatten()
    }

    #[inline]
    pub fn is_occupied(&self, pos: Position) -> bool {
        self.cell_at(pos).is_some()
    }

    pub fn contains(&self, id: CellId) -> bool {
        self.cells.contains(id)
    }

    pub fn cell(&self, id: CellId) -> Option<&Cell> {
        self.contains(id).then(|| &self.cells.cells[id.slot()])
    }

    pub fn cell_mut(&mut self, id: CellId) -> Option<&mut Cell> {
        if self.contains(id) {
            Some(&mut self.cells.cells[id.slot()])
        } else {
            None
        }
    }

    pub fn program(&self, id: CellId) -> Option<&Program> {
        self.contains(id).then(|| &self.cells.programs[id.slot()])
    }

    pub fn position(&self, id: CellId) -> Option<Position> {
        self.contains(id).then(|| self.cells.positions[id.slot()])
    }

    #[inline]
    pub fn light_at(&self, pos: Position) -> u8 {
        self.light.get(pos).copied().unwrap_or(0)
    }

    /// Living cells with their positions, in slot order
    pub fn living(&self) -> impl Iterator<Item = (CellId, Position)> + '_ {
        self.cells
            .iter_living()
            .filter_map(move |slot| self.cells.id_at(slot).map(|id| (id, self.cells.positions[slot])))
    }

    /// Place a cell at `pos`, replacing whatever lived there
    pub fn insert(&mut self, pos: Position, cell: Cell, program: Program) -> Result<CellId> {
        if !self.dims.contains(pos) {
            return Err(SimError::InvariantViolation(format!(
                "insert at {:?} outside {}x{} grid",
                pos, self.dims.width, self.dims.height
            )));
        }
        if let Some(previous) = self.cell_at(pos) {
            self.cells.despawn(previous);
        }
        let id = self.cells.spawn(cell, program, pos);
        self.index.set(pos, Some(id));
        Ok(id)
    }

    /// Erase a cell. Returns false if it was already gone.
    pub fn remove(&mut self, id: CellId) -> bool {
        let Some(pos) = self.position(id) else {
            return false;
        };
        self.index.set(pos, None);
        self.cells.despawn(id)
    }

    /// Move a cell into an empty in-bounds position
    ///
    /// Returns false, and changes nothing, if the cell is gone or `to` is
    /// occupied or out of bounds.
    pub fn relocate(&mut self, id: CellId, to: Position) -> bool {
        let Some(from) = self.position(id) else {
            return false;
        };
        if !self.dims.contains(to) || self.is_occupied(to) {
            return false;
        }
        self.index.set(from, None);
        self.index.set(to, Some(id));
        self.cells.positions[id.slot()] = to;
        true
    }

    pub fn stats(&self) -> PopulationStats {
        let mut stats = PopulationStats::default();
        let mut total_age = 0u64;
        for slot in self.cells.iter_living() {
            let cell = &self.cells.cells[slot];
            stats.population += 1;
            stats.total_energy += cell.energy() as u64;
            stats.total_power += cell.power() as u64;
            total_age += cell.age() as u64;
        }
        if stats.population > 0 {
            stats.mean_age = total_age as f64 / stats.population as f64;
        }
        stats
    }

    /// Whether the position index and the arena agree exactly
    pub fn index_is_consistent(&self) -> bool {
        let indexed = self
            .dims
            .positions()
            .filter_map(|pos| self.cell_at(pos).map(|id| (id, pos)))
            .try_fold(0usize, |n, (id, pos)| (self.position(id) == Some(pos)).then_some(n + 1));
        indexed == Some(self.population())
    }

    /// Split borrows for the parallel phases: every cell state mutable, the
    /// rest of the world shared
    pub(crate) fn phase_parts(&mut self) -> PhaseParts<'_> {
        PhaseParts {
            dims: self.dims,
            cells: &mut self.cells.cells,
            programs: &self.cells.programs,
            positions: &self.cells.positions,
            generations: &self.cells.generations,
            alive: &self.cells.alive,
            index: &self.index,
            light: &self.light,
        }
    }

    /// Light field plus the occupancy it is shaded from
    pub(crate) fn light_parts(&mut self) -> (&mut Grid<u8>, &Grid<Option<CellId>>) {
        (&mut self.light, &self.index)
    }
}

/// Disjoint borrows of a [`World`] for the begin and end phases
pub(crate) struct PhaseParts<'a> {
    pub dims: GridDims,
    pub cells: &'a mut [Cell],
    pub programs: &'a [Program],
    pub positions: &'a [Position],
    pub generations: &'a [u32],
    pub alive: &'a [bool],
    pub index: &'a Grid<Option<CellId>>,
    pub light: &'a Grid<u8>,
}

/// What a running cell sees of its neighborhood
///
/// Neighbor energies come from a snapshot taken before the begin phase, so
/// every cell observes the same start-of-tick state regardless of the order
/// cells execute in.
#[derive(Clone, Copy)]
pub struct WorldView<'a> {
    dims: GridDims,
    index: &'a Grid<Option<CellId>>,
    light: &'a Grid<u8>,
    programs: &'a [Program],
    energies: &'a [u8],
}

impl<'a> WorldView<'a> {
    pub(crate) fn new(
        dims: GridDims,
        index: &'a Grid<Option<CellId>>,
        light: &'a Grid<u8>,
        programs: &'a [Program],
        energies: &'a [u8],
    ) -> Self {
        Self {
            dims,
            index,
            light,
            programs,
            energies,
        }
    }
}

impl Surroundings for WorldView<'_> {
    fn dims(&self) -> GridDims {
        self.dims
    }

    fn light(&self, pos: Position) -> u8 {
        self.light.get(pos).copied().unwrap_or(0)
    }

    fn neighbor(&self, pos: Position) -> Option<Neighbor<'_>> {
        let id = self.index.get(pos).copied().flatten()?;
        Some(Neighbor {
            energy: self.energies[id.slot()],
            program: &self.programs[id.slot()],
        })
    }
}
