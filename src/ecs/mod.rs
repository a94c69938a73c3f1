//! Cell storage and the shared world state

pub mod archetype;
pub mod world;

pub use archetype::CellArchetype;
pub use world::{PopulationStats, World, WorldView};
