//! Photocell - bytecode cells competing for light on a bounded grid

pub mod cell;
pub mod core;
pub mod ecs;
pub mod render;
pub mod simulation;
pub mod spatial;
