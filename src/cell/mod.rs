//! Cells: bytecode, register file and the per-tick virtual machine

pub mod opcode;
pub mod program;
pub mod registers;
pub mod vm;

pub use opcode::{Opcode, Source};
pub use program::{Program, PROGRAM_LEN};
pub use vm::{
    ActionKind, ActionRequest, Cell, DeathCause, EndOfTick, Lifespan, Neighbor, Surroundings,
};
