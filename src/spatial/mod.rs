pub mod geometry;
pub mod grid;

pub use geometry::{Direction, GridDims, Position};
pub use grid::Grid;
