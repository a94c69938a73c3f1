//! Core type definitions used throughout the codebase

use serde::{Deserialize, Serialize};

/// Simulation tick counter (one generation)
pub type Tick = u64;

/// Stable handle to a cell slot in the arena
///
/// The generation is bumped every time a slot is freed, so a handle held
/// across a death never aliases the slot's next occupant.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct CellId {
    pub index: u32,
    pub generation: u32,
}

impl CellId {
    pub fn new(index: u32, generation: u32) -> Self {
        Self { index, generation }
    }

    #[inline]
    pub fn slot(&self) -> usize {
        self.index as usize
    }
}
