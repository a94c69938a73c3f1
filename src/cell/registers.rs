//! Unified register addressing
//!
//! Bytecode names registers with a single byte, of which only the low four
//! bits count. Slots 0-2 are read-only views of live cell state; slots 3-15
//! are the 13 general-purpose registers.

/// Number of general-purpose registers
pub const GENERAL_REGISTERS: usize = 13;

/// General register whose value becomes the hibernate budget at tick start
pub const HIBERNATE_REG: usize = 0;
/// General register that receives instruction results and action outcomes
pub const OUTPUT_REG: usize = 1;
/// First arithmetic operand, also the target selector for RSET
pub const IR0: usize = 2;
/// Second arithmetic operand
pub const IR1: usize = 3;

/// A decoded register address
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Slot {
    Energy,
    Light,
    /// Age divided by four
    Age,
    General(usize),
}

impl Slot {
    #[inline]
    pub fn decode(byte: u8) -> Self {
        match byte & 0xF {
            0 => Slot::Energy,
            1 => Slot::Light,
            2 => Slot::Age,
            n => Slot::General(n as usize - 3),
        }
    }

    /// Unified slot number of a general register
    pub fn general_slot(index: usize) -> u8 {
        (index + 3) as u8
    }
}
