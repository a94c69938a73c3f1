//! Instruction set decoding
//!
//! Opcode numbers are part of the bytecode contract: evolved programs depend
//! on them, so they must never be renumbered. Bytes 23 and 24 are reserved
//! and, like every byte from 29 up, execute as a forward skip of their own
//! value.

/// Where an instruction takes its operand from
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Source {
    /// The next program byte
    Literal,
    /// The register named by the next program byte
    Register,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Opcode {
    /// 0: end the tick with minimal upkeep
    Hibernate,
    /// 1, 2: relative jump
    Jump(Source),
    /// 3, 4: stage a move into a neighboring position
    Move(Source),
    /// 5, 6: read a neighbor's energy
    Probe(Source),
    /// 7, 8: compare programs with a neighbor (costs a heavy wait)
    Analyze(Source),
    /// 9: literal into named register
    Set,
    /// 10: register to register
    Copy,
    /// 11: literal into the register named by IR0
    IndirectSet,
    /// 12..=14: IR0 op IR1 into the output register
    Add,
    Sub,
    Mul,
    /// 15, 16
    Inc,
    Dec,
    /// 17: branch when a register is zero
    IfZero,
    /// 18: branch when a register is below a literal
    IfLess,
    /// 19, 20: stage a feed on a neighbor
    Eat(Source),
    /// 21, 22: stage an energy transfer to a neighbor
    Give(Source),
    /// 23, 24: FIND / FINDE, not implemented
    Reserved(u8),
    /// 25, 26: convert energy into power
    Charge(Source),
    /// 27, 28: convert power back into energy at half rate
    Discharge(Source),
    /// 29..=255: skip forward by the opcode value
    Skip(u8),
}

impl Opcode {
    pub fn decode(byte: u8) -> Self {
        use Source::{Literal, Register};

        match byte {
            0 => Opcode::Hibernate,
            1 => Opcode::Jump(Literal),
            2 => Opcode::Jump(Register),
            3 => Opcode::Move(Literal),
            4 => Opcode::Move(Register),
            5 => Opcode::Probe(Literal),
            6 => Opcode::Probe(Register),
            7 => Opcode::Analyze(Literal),
            8 => Opcode::Analyze(Register),
            9 => Opcode::Set,
            10 => Opcode::Copy,
            11 => Opcode::IndirectSet,
            12 => Opcode::Add,
            13 => Opcode::Sub,
            14 => Opcode::Mul,
            15 => Opcode::Inc,
            16 => Opcode::Dec,
            17 => Opcode::IfZero,
            18 => Opcode::IfLess,
            19 => Opcode::Eat(Literal),
            20 => Opcode::Eat(Register),
            21 => Opcode::Give(Literal),
            22 => Opcode::Give(Register),
            23 | 24 => Opcode::Reserved(byte),
            25 => Opcode::Charge(Literal),
            26 => Opcode::Charge(Register),
            27 => Opcode::Discharge(Literal),
            28 => Opcode::Discharge(Register),
            n => Opcode::Skip(n),
        }
    }

    pub fn encode(self) -> u8 {
        use Source::{Literal, Register};

        match self {
            Opcode::Hibernate => 0,
            Opcode::Jump(Literal) => 1,
            Opcode::Jump(Register) => 2,
            Opcode::Move(Literal) => 3,
            Opcode::Move(Register) => 4,
            Opcode::Probe(Literal) => 5,
            Opcode::Probe(Register) => 6,
            Opcode::Analyze(Literal) => 7,
            Opcode::Analyze(Register) => 8,
            Opcode::Set => 9,
            Opcode::Copy => 10,
            Opcode::IndirectSet => 11,
            Opcode::Add => 12,
            Opcode::Sub => 13,
            Opcode::Mul => 14,
            Opcode::Inc => 15,
            Opcode::Dec => 16,
            Opcode::IfZero => 17,
            Opcode::IfLess => 18,
            Opcode::Eat(Literal) => 19,
            Opcode::Eat(Register) => 20,
            Opcode::Give(Literal) => 21,
            Opcode::Give(Register) => 22,
            Opcode::Reserved(n) | Opcode::Skip(n) => n,
            Opcode::Charge(Literal) => 25,
            Opcode::Charge(Register) => 26,
            Opcode::Discharge(Literal) => 27,
            Opcode::Discharge(Register) => 28,
        }
    }

    pub fn mnemonic(self) -> &'static str {
        use Source::{Literal, Register};

        match self {
            Opcode::Hibernate => "HIB",
            Opcode::Jump(Literal) => "JMP",
            Opcode::Jump(Register) => "RJMP",
            Opcode::Move(Literal) => "MOVE",
            Opcode::Move(Register) => "RMOVE",
            Opcode::Probe(Literal) => "PROBE",
            Opcode::Probe(Register) => "RPROBE",
            Opcode::Analyze(Literal) => "ANALYZE",
            Opcode::Analyze(Register) => "RANALYZE",
            Opcode::Set => "SET",
            Opcode::Copy => "COPY",
            Opcode::IndirectSet => "RSET",
            Opcode::Add => "ADD",
            Opcode::Sub => "SUB",
            Opcode::Mul => "MUL",
            Opcode::Inc => "INC",
            Opcode::Dec => "DEC",
            Opcode::IfZero => "IFZ",
            Opcode::IfLess => "IFL",
            Opcode::Eat(Literal) => "EAT",
            Opcode::Eat(Register) => "REAT",
            Opcode::Give(Literal) => "ENG",
            Opcode::Give(Register) => "RENG",
            Opcode::Reserved(23) => "FIND",
            Opcode::Reserved(_) => "FINDE",
            Opcode::Charge(Literal) => "POW",
            Opcode::Charge(Register) => "RPOW",
            Opcode::Discharge(Literal) => "POW2E",
            Opcode::Discharge(Register) => "RPOW2E",
            Opcode::Skip(_) => "SKIP",
        }
    }
}

impl std::fmt::Display for Opcode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Opcode::Skip(n) => write!(f, "SKIP {}", n),
            other => f.write_str(other.mnemonic()),
        }
    }
}
