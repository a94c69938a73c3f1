//! Per-cell virtual machine
//!
//! A cell executes exactly one instruction per tick in [`Cell::begin_tick`].
//! Instructions that affect other cells do not touch them; they stage an
//! [`ActionRequest`] that the scheduler resolves later in the tick. The
//! outcome comes back through [`Cell::end_tick`], which also settles the
//! energy budget and decides whether the cell divides or dies.

use rand::Rng;
use serde::{Deserialize, Serialize};

use crate::cell::opcode::{Opcode, Source};
use crate::cell::program::{Program, PROGRAM_LEN};
use crate::cell::registers::{Slot, GENERAL_REGISTERS, HIBERNATE_REG, IR0, IR1, OUTPUT_REG};
use crate::spatial::geometry::{Direction, GridDims, Position};

/// Energy a freshly spawned cell starts with
pub const SPAWN_ENERGY: u8 = 100;

/// Upkeep of an ordinary tick
pub const BASE_USAGE: u8 = 2;
/// Upkeep while serving a heavy wait
pub const HEAVY_WAIT_USAGE: u8 = 4;
/// Upkeep while hibernating or after HIB
pub const HIBERNATE_USAGE: u8 = 1;
/// Extra upkeep of a staged feed
pub const EAT_USAGE: u8 = 6;

/// Read-only view of the world a cell may consult while executing
///
/// Implementations must not expose anything mutable: begin-phase execution
/// runs in parallel across cells.
pub trait Surroundings {
    fn dims(&self) -> GridDims;

    /// Light level at `pos`
    fn light(&self, pos: Position) -> u8;

    /// The cell living at `pos`, if any
    fn neighbor(&self, pos: Position) -> Option<Neighbor<'_>>;
}

/// What a cell can see of an occupied neighboring position
#[derive(Debug, Clone, Copy)]
pub struct Neighbor<'a> {
    pub energy: u8,
    pub program: &'a Program,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ActionKind {
    Move,
    Energy,
    Eat,
}

/// A cell's single external effect for the current tick
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ActionRequest {
    pub kind: ActionKind,
    pub dir: Direction,
    /// Energy to transfer (ENG only)
    pub amount: u8,
    /// Outcome written by the resolver: 1 success, 0 failure
    pub result: u8,
}

impl ActionRequest {
    fn new(kind: ActionKind, dir: Direction, amount: u8) -> Self {
        Self {
            kind,
            dir,
            amount,
            result: 0,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum DeathCause {
    Starvation,
    OldAge,
    Eaten,
    NoRoomToDivide,
}

/// Verdict of [`Cell::end_tick`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EndOfTick {
    None,
    Divide,
    Die(DeathCause),
}

/// Lifecycle thresholds, taken from the simulation config
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Lifespan {
    pub division_energy: u8,
    pub max_age: u32,
}

impl Default for Lifespan {
    fn default() -> Self {
        Self {
            division_energy: 200,
            max_age: 1024,
        }
    }
}

/// Mutable state of one cell. Its program is stored alongside, not inside,
/// so that neighbors can read programs while every cell runs in parallel.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Cell {
    registers: [u8; GENERAL_REGISTERS],
    ip: usize,
    age: u32,
    energy: u8,
    power: u8,
    heavy_wait: u8,
    hibernate: u8,
    pending_income: u8,
    pending_usage: u8,
    request: Option<ActionRequest>,
}

impl Default for Cell {
    fn default() -> Self {
        Self {
            registers: [0; GENERAL_REGISTERS],
            ip: 0,
            age: 0,
            energy: SPAWN_ENERGY,
            power: 0,
            heavy_wait: 0,
            hibernate: 0,
            pending_income: 0,
            pending_usage: 0,
            request: None,
        }
    }
}

impl Cell {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_energy(mut self, energy: u8) -> Self {
        self.energy = energy;
        self
    }

    pub fn with_power(mut self, power: u8) -> Self {
        self.power = power;
        self
    }

    pub fn energy(&self) -> u8 {
        self.energy
    }

    pub fn power(&self) -> u8 {
        self.power
    }

    pub fn age(&self) -> u32 {
        self.age
    }

    pub fn instruction_pointer(&self) -> usize {
        self.ip
    }

    pub fn heavy_wait(&self) -> u8 {
        self.heavy_wait
    }

    pub fn set_heavy_wait(&mut self, ticks: u8) {
        self.heavy_wait = ticks;
    }

    pub fn hibernate(&self) -> u8 {
        self.hibernate
    }

    pub fn pending_income(&self) -> u8 {
        self.pending_income
    }

    pub fn pending_usage(&self) -> u8 {
        self.pending_usage
    }

    /// The request staged this tick, if any
    pub fn request(&self) -> Option<&ActionRequest> {
        self.request.as_ref()
    }

    pub(crate) fn request_mut(&mut self) -> Option<&mut ActionRequest> {
        self.request.as_mut()
    }

    pub fn general(&self, index: usize) -> u8 {
        self.registers[index]
    }

    pub fn set_general(&mut self, index: usize, value: u8) {
        self.registers[index] = value;
    }

    /// Credit energy to this tick's income, saturating at 255
    pub fn add_energy(&mut self, amount: u8) {
        self.pending_income = self.pending_income.saturating_add(amount);
    }

    /// Offspring state: same energy, a quarter of the power, fresh registers
    pub fn fork(&self) -> Cell {
        Cell {
            energy: self.energy,
            power: self.power / 4,
            ..Cell::default()
        }
    }

    /// Read a register through the unified 16-slot addressing
    pub fn read_slot(&self, slot: u8, light: u8) -> u8 {
        match Slot::decode(slot) {
            Slot::Energy => self.energy,
            Slot::Light => light,
            // saturates at 255 instead of wrapping once age passes 1023
            Slot::Age => (self.age / 4).min(u8::MAX as u32) as u8,
            Slot::General(idx) => self.registers[idx],
        }
    }

    /// Writes to the read-only slots are discarded
    pub fn write_slot(&mut self, slot: u8, value: u8) {
        if let Slot::General(idx) = Slot::decode(slot) {
            self.registers[idx] = value;
        }
    }

    #[inline]
    fn fetch(&mut self, program: &Program) -> u8 {
        let byte = program.read(self.ip);
        self.ip = (self.ip + 1) % PROGRAM_LEN;
        byte
    }

    #[inline]
    fn advance(&mut self, by: usize) {
        self.ip = (self.ip + by) % PROGRAM_LEN;
    }

    #[inline]
    fn operand<S: Surroundings>(
        &mut self,
        source: Source,
        program: &Program,
        pos: Position,
        env: &S,
    ) -> u8 {
        let byte = self.fetch(program);
        match source {
            Source::Literal => byte,
            Source::Register => self.read_slot(byte, env.light(pos)),
        }
    }

    #[inline]
    fn set_output(&mut self, value: u8) {
        self.registers[OUTPUT_REG] = value;
    }

    #[inline]
    fn use_energy(&mut self, amount: u8) {
        self.pending_usage = self.pending_usage.saturating_add(amount);
    }

    fn stage(&mut self, request: ActionRequest) -> Option<ActionRequest> {
        self.request = Some(request);
        self.request
    }

    /// Run this tick's instruction
    ///
    /// Returns the staged request, if the instruction produced one. Only the
    /// cell itself is mutated; `env` is consulted read-only.
    pub fn begin_tick<S: Surroundings>(
        &mut self,
        pos: Position,
        program: &Program,
        env: &S,
    ) -> Option<ActionRequest> {
        self.pending_income = 0;
        self.request = None;

        if self.heavy_wait > 0 {
            self.heavy_wait -= 1;
            self.pending_usage = HEAVY_WAIT_USAGE;
            return None;
        }
        if self.hibernate > 0 {
            self.hibernate -= 1;
            self.pending_usage = HIBERNATE_USAGE;
            return None;
        }
        self.pending_usage = BASE_USAGE;
        self.hibernate = self.registers[HIBERNATE_REG];

        let dims = env.dims();
        let opcode = Opcode::decode(self.fetch(program));

        match opcode {
            Opcode::Hibernate => {
                self.pending_usage = HIBERNATE_USAGE;
                None
            }
            Opcode::Jump(source) => {
                let len = self.operand(source, program, pos, env);
                self.advance(len as usize);
                None
            }
            Opcode::Move(source) => {
                self.use_energy(5 - (self.power / 7).min(5));
                let dir = Direction::from_byte(self.operand(source, program, pos, env));
                if pos.can_step(dir, dims) {
                    self.stage(ActionRequest::new(ActionKind::Move, dir, 0))
                } else {
                    self.set_output(0);
                    None
                }
            }
            Opcode::Probe(source) => {
                let dir = Direction::from_byte(self.operand(source, program, pos, env));
                let energy = pos
                    .step(dir, dims)
                    .and_then(|target| env.neighbor(target))
                    .map(|n| n.energy)
                    .unwrap_or(0);
                self.set_output(energy);
                None
            }
            Opcode::Analyze(source) => {
                let dir = Direction::from_byte(self.operand(source, program, pos, env));
                let diff = pos
                    .step(dir, dims)
                    .and_then(|target| env.neighbor(target))
                    .map(|n| program.difference(n.program));
                match diff {
                    Some(diff) => {
                        self.heavy_wait = 1;
                        self.set_output((diff / 2) as u8);
                    }
                    None => self.set_output(0),
                }
                None
            }
            Opcode::Set => {
                let value = self.fetch(program);
                let reg = self.fetch(program);
                self.write_slot(reg, value);
                None
            }
            Opcode::Copy => {
                let from = self.fetch(program);
                let value = self.read_slot(from, env.light(pos));
                let to = self.fetch(program);
                self.write_slot(to, value);
                None
            }
            Opcode::IndirectSet => {
                let value = self.fetch(program);
                self.write_slot(self.registers[IR0], value);
                None
            }
            Opcode::Add => {
                self.set_output(self.registers[IR0].wrapping_add(self.registers[IR1]));
                None
            }
            Opcode::Sub => {
                self.set_output(self.registers[IR0].wrapping_sub(self.registers[IR1]));
                None
            }
            Opcode::Mul => {
                self.set_output(self.registers[IR0].wrapping_mul(self.registers[IR1]));
                None
            }
            Opcode::Inc | Opcode::Dec => {
                let reg = self.fetch(program);
                let value = self.read_slot(reg, env.light(pos));
                let value = if opcode == Opcode::Inc {
                    value.wrapping_add(1)
                } else {
                    value.wrapping_sub(1)
                };
                self.write_slot(reg, value);
                None
            }
            Opcode::IfZero => {
                let reg = self.fetch(program);
                if self.read_slot(reg, env.light(pos)) == 0 {
                    let len = self.fetch(program);
                    self.advance(len as usize);
                } else {
                    self.advance(1);
                }
                None
            }
            Opcode::IfLess => {
                let reg = self.fetch(program);
                let value = self.read_slot(reg, env.light(pos));
                let bound = self.fetch(program);
                if value < bound {
                    let len = self.fetch(program);
                    self.advance(len as usize);
                } else {
                    self.advance(1);
                }
                None
            }
            Opcode::Eat(source) => {
                let dir = Direction::from_byte(self.operand(source, program, pos, env));
                let occupied = pos
                    .step(dir, dims)
                    .is_some_and(|target| env.neighbor(target).is_some());
                if occupied {
                    self.use_energy(EAT_USAGE);
                    self.stage(ActionRequest::new(ActionKind::Eat, dir, 0))
                } else {
                    self.set_output(0);
                    None
                }
            }
            Opcode::Give(source) => {
                let amount = self.operand(source, program, pos, env);
                let dir = Direction::from_byte(self.operand(source, program, pos, env));
                let occupied = pos
                    .step(dir, dims)
                    .is_some_and(|target| env.neighbor(target).is_some());
                if amount < self.energy && occupied {
                    self.use_energy(amount);
                    self.stage(ActionRequest::new(ActionKind::Energy, dir, amount))
                } else {
                    self.set_output(0);
                    None
                }
            }
            Opcode::Charge(source) => {
                let amount = self.operand(source, program, pos, env);
                if amount < self.energy {
                    self.energy -= amount;
                    self.power = self.power.saturating_add(amount);
                    self.set_output(self.power);
                } else {
                    self.set_output(0);
                }
                None
            }
            Opcode::Discharge(source) => {
                let amount = self.operand(source, program, pos, env);
                if amount < self.power {
                    self.power -= amount;
                    self.energy = self.energy.saturating_add(amount / 2);
                    self.set_output(self.power);
                } else {
                    self.set_output(0);
                }
                None
            }
            Opcode::Reserved(n) | Opcode::Skip(n) => {
                self.advance(n as usize);
                None
            }
        }
    }

    /// Settle this tick's energy budget and decide the cell's fate
    ///
    /// `light` is the light level at the cell's position after this tick's
    /// light update.
    pub fn end_tick<R: Rng + ?Sized>(
        &mut self,
        light: u8,
        lifespan: &Lifespan,
        rng: &mut R,
    ) -> EndOfTick {
        let request = self.request.take();

        let light_energy = light / 32;
        let power_drag = self.power / 10;
        if light_energy > power_drag {
            self.add_energy(light_energy - power_drag);
        }

        if self.pending_income < self.pending_usage {
            let deficit = self.pending_usage - self.pending_income;
            if deficit > self.energy {
                return EndOfTick::Die(DeathCause::Starvation);
            }
            self.energy -= deficit;
        } else {
            let net = self.pending_income - self.pending_usage;
            self.energy = self.energy.saturating_add(net);
        }

        self.age = self.age.saturating_add(1);
        if self.age >= lifespan.max_age
            || rng.gen_range(self.age..=lifespan.max_age) == lifespan.max_age
        {
            return EndOfTick::Die(DeathCause::OldAge);
        }

        if let Some(request) = request {
            self.set_output(request.result);
        }

        if self.energy >= lifespan.division_energy {
            self.energy /= 2;
            return EndOfTick::Divide;
        }

        EndOfTick::None
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cell::registers::Slot;
    use rand::SeedableRng;
    use rand_chacha::ChaCha8Rng;
    use std::collections::HashMap;

    /// Hand-built surroundings: fixed light, explicit neighbor table
    struct Fixture {
        dims: GridDims,
        light: u8,
        cells: HashMap<Position, (u8, Program)>,
    }

    impl Fixture {
        fn new() -> Self {
            Self {
                dims: GridDims::new(10, 10),
                light: 0,
                cells: HashMap::new(),
            }
        }

        fn with_neighbor(mut self, pos: Position, energy: u8, program: Program) -> Self {
            self.cells.insert(pos, (energy, program));
            self
        }
    }

    impl Surroundings for Fixture {
        fn dims(&self) -> GridDims {
            self.dims
        }

        fn light(&self, _pos: Position) -> u8 {
            self.light
        }

        fn neighbor(&self, pos: Position) -> Option<Neighbor<'_>> {
            self.cells.get(&pos).map(|(energy, program)| Neighbor {
                energy: *energy,
                program,
            })
        }
    }

    const CENTER: Position = Position { row: 5, col: 5 };

    /// Lifespan whose old-age draw practically never fires
    const IMMORTAL: Lifespan = Lifespan {
        division_energy: 200,
        max_age: u32::MAX,
    };

    fn op(opcode: Opcode) -> u8 {
        opcode.encode()
    }

    fn run_once(cell: &mut Cell, program: &[u8], env: &Fixture) -> Option<ActionRequest> {
        cell.begin_tick(CENTER, &Program::from_prefix(program), env)
    }

    #[test]
    fn test_set_writes_general_register() {
        let mut cell = Cell::new();
        run_once(&mut cell, &[op(Opcode::Set), 50, 3], &Fixture::new());
        assert_eq!(cell.general(0), 50);
        assert_eq!(cell.instruction_pointer(), 3);
        assert_eq!(cell.pending_usage(), BASE_USAGE);
    }

    #[test]
    fn test_writes_to_special_slots_are_discarded() {
        let mut cell = Cell::new();
        for slot in 0..3 {
            cell.write_slot(slot, 77);
        }
        assert_eq!(cell.energy(), SPAWN_ENERGY);
        assert!(cell.registers.iter().all(|&r| r == 0));
        assert_eq!(cell.read_slot(1, 42), 42);
    }

    #[test]
    fn test_hibernate_register_arms_countdown() {
        let mut cell = Cell::new();
        cell.set_general(HIBERNATE_REG, 2);
        let env = Fixture::new();
        let program = Program::from_prefix(&[op(Opcode::Set), 9, 4]);

        cell.begin_tick(CENTER, &program, &env);
        assert_eq!(cell.hibernate(), 2);
        assert_eq!(cell.general(OUTPUT_REG), 9);

        for remaining in [1, 0] {
            let ip = cell.instruction_pointer();
            cell.begin_tick(CENTER, &program, &env);
            assert_eq!(cell.hibernate(), remaining);
            assert_eq!(cell.instruction_pointer(), ip, "no bytecode while hibernating");
            assert_eq!(cell.pending_usage(), HIBERNATE_USAGE);
        }
    }

    #[test]
    fn test_heavy_wait_skips_execution() {
        let mut cell = Cell::new();
        cell.set_heavy_wait(2);
        let env = Fixture::new();
        let program = Program::from_prefix(&[op(Opcode::Set), 1, 3]);

        for remaining in [1, 0] {
            cell.begin_tick(CENTER, &program, &env);
            assert_eq!(cell.heavy_wait(), remaining);
            assert_eq!(cell.instruction_pointer(), 0);
            assert_eq!(cell.pending_usage(), HEAVY_WAIT_USAGE);
        }

        cell.begin_tick(CENTER, &program, &env);
        assert_eq!(cell.general(0), 1);
    }

    #[test]
    fn test_move_off_edge_stages_nothing() {
        let mut cell = Cell::new();
        cell.set_general(OUTPUT_REG, 9);
        let env = Fixture::new();
        let edge = Position::new(0, 3);
        let program = Program::from_prefix(&[op(Opcode::Move(Source::Literal)), Direction::Up as u8]);

        assert!(cell.begin_tick(edge, &program, &env).is_none());
        assert_eq!(cell.general(OUTPUT_REG), 0);
        assert_eq!(cell.pending_usage(), BASE_USAGE + 5);
    }

    #[test]
    fn test_move_cost_drops_with_power() {
        let mut cell = Cell::new().with_power(70);
        let request = run_once(
            &mut cell,
            &[op(Opcode::Move(Source::Literal)), Direction::Right as u8],
            &Fixture::new(),
        )
        .unwrap();
        assert_eq!(request.kind, ActionKind::Move);
        assert_eq!(request.dir, Direction::Right);
        assert_eq!(cell.pending_usage(), BASE_USAGE);
    }

    #[test]
    fn test_register_move_reads_direction() {
        let mut cell = Cell::new();
        cell.set_general(4, Direction::Down as u8);
        let request = run_once(
            &mut cell,
            &[op(Opcode::Move(Source::Register)), Slot::general_slot(4)],
            &Fixture::new(),
        )
        .unwrap();
        assert_eq!(request.dir, Direction::Down);
    }

    #[test]
    fn test_probe_reports_neighbor_energy() {
        let right = CENTER.step(Direction::Right, GridDims::new(10, 10)).unwrap();
        let env = Fixture::new().with_neighbor(right, 123, Program::default());

        let mut cell = Cell::new();
        run_once(&mut cell, &[op(Opcode::Probe(Source::Literal)), Direction::Right as u8], &env);
        assert_eq!(cell.general(OUTPUT_REG), 123);

        let mut cell = Cell::new();
        run_once(&mut cell, &[op(Opcode::Probe(Source::Literal)), Direction::Left as u8], &env);
        assert_eq!(cell.general(OUTPUT_REG), 0);
    }

    #[test]
    fn test_analyze_counts_half_the_differences() {
        let up = CENTER.step(Direction::Up, GridDims::new(10, 10)).unwrap();
        let other = [200u8; 10];
        let env = Fixture::new().with_neighbor(up, 50, Program::from_prefix(&other));

        let mut cell = Cell::new();
        // own program: [7, 0, 0...]; other: ten 200s, so 10 positions differ
        run_once(&mut cell, &[op(Opcode::Analyze(Source::Literal)), Direction::Up as u8], &env);
        assert_eq!(cell.general(OUTPUT_REG), 5);
        assert_eq!(cell.heavy_wait(), 1);
    }

    #[test]
    fn test_analyze_empty_neighbor_has_no_cooldown() {
        let mut cell = Cell::new();
        run_once(&mut cell, &[op(Opcode::Analyze(Source::Literal)), 0], &Fixture::new());
        assert_eq!(cell.heavy_wait(), 0);
        assert_eq!(cell.general(OUTPUT_REG), 0);
    }

    #[test]
    fn test_arithmetic_wraps() {
        let env = Fixture::new();
        let mut cell = Cell::new();
        cell.set_general(IR0, 250);
        cell.set_general(IR1, 10);

        run_once(&mut cell, &[op(Opcode::Add)], &env);
        assert_eq!(cell.general(OUTPUT_REG), 4);

        let mut cell2 = cell.clone();
        cell2.ip = 0;
        run_once(&mut cell2, &[op(Opcode::Sub)], &env);
        assert_eq!(cell2.general(OUTPUT_REG), 240);

        cell.ip = 0;
        run_once(&mut cell, &[op(Opcode::Mul)], &env);
        assert_eq!(cell.general(OUTPUT_REG), 250u8.wrapping_mul(10));
    }

    #[test]
    fn test_indirect_set_targets_ir0() {
        let mut cell = Cell::new();
        cell.set_general(IR0, Slot::general_slot(7));
        run_once(&mut cell, &[op(Opcode::IndirectSet), 33], &Fixture::new());
        assert_eq!(cell.general(7), 33);
    }

    #[test]
    fn test_copy_reads_special_slot() {
        let mut cell = Cell::new().with_energy(88);
        run_once(&mut cell, &[op(Opcode::Copy), 0, Slot::general_slot(5)], &Fixture::new());
        assert_eq!(cell.general(5), 88);
    }

    #[test]
    fn test_dec_wraps_below_zero() {
        let mut cell = Cell::new();
        run_once(&mut cell, &[op(Opcode::Dec), Slot::general_slot(6)], &Fixture::new());
        assert_eq!(cell.general(6), 255);
    }

    #[test]
    fn test_if_zero_branches() {
        let env = Fixture::new();
        // register 4 is zero: skip 10 past the literal
        let mut cell = Cell::new();
        run_once(&mut cell, &[op(Opcode::IfZero), Slot::general_slot(4), 10], &env);
        assert_eq!(cell.instruction_pointer(), 13);

        // non-zero: step over the literal only
        let mut cell = Cell::new();
        cell.set_general(4, 1);
        run_once(&mut cell, &[op(Opcode::IfZero), Slot::general_slot(4), 10], &env);
        assert_eq!(cell.instruction_pointer(), 3);
    }

    #[test]
    fn test_if_less_branches() {
        let env = Fixture::new();
        let program = [op(Opcode::IfLess), Slot::general_slot(4), 5, 20];

        let mut cell = Cell::new();
        cell.set_general(4, 4);
        run_once(&mut cell, &program, &env);
        assert_eq!(cell.instruction_pointer(), 24);

        let mut cell = Cell::new();
        cell.set_general(4, 5);
        run_once(&mut cell, &program, &env);
        assert_eq!(cell.instruction_pointer(), 4);
    }

    #[test]
    fn test_jump_and_skip_wrap_around() {
        let env = Fixture::new();
        let mut cell = Cell::new();
        run_once(&mut cell, &[op(Opcode::Jump(Source::Literal)), 200], &env);
        assert_eq!(cell.instruction_pointer(), (2 + 200) % PROGRAM_LEN);

        let mut cell = Cell::new();
        run_once(&mut cell, &[40], &env);
        assert_eq!(cell.instruction_pointer(), 41);

        let mut cell = Cell::new();
        run_once(&mut cell, &[23], &env);
        assert_eq!(cell.instruction_pointer(), 24);
    }

    #[test]
    fn test_eat_requires_occupied_target() {
        let left = CENTER.step(Direction::Left, GridDims::new(10, 10)).unwrap();
        let env = Fixture::new().with_neighbor(left, 10, Program::default());

        let mut cell = Cell::new();
        let request = run_once(&mut cell, &[op(Opcode::Eat(Source::Literal)), Direction::Left as u8], &env);
        assert_eq!(request.map(|r| r.kind), Some(ActionKind::Eat));
        assert_eq!(cell.pending_usage(), BASE_USAGE + EAT_USAGE);

        let mut cell = Cell::new();
        let request = run_once(&mut cell, &[op(Opcode::Eat(Source::Literal)), Direction::Right as u8], &env);
        assert!(request.is_none());
        assert_eq!(cell.pending_usage(), BASE_USAGE);
    }

    #[test]
    fn test_give_requires_enough_energy() {
        let down = CENTER.step(Direction::Down, GridDims::new(10, 10)).unwrap();
        let env = Fixture::new().with_neighbor(down, 10, Program::default());
        let program = [op(Opcode::Give(Source::Literal)), 30, Direction::Down as u8];

        let mut cell = Cell::new().with_energy(31);
        let request = run_once(&mut cell, &program, &env).unwrap();
        assert_eq!(request.kind, ActionKind::Energy);
        assert_eq!(request.amount, 30);
        assert_eq!(cell.pending_usage(), BASE_USAGE + 30);

        let mut cell = Cell::new().with_energy(30);
        assert!(run_once(&mut cell, &program, &env).is_none());
        assert_eq!(cell.instruction_pointer(), 3, "both operands consumed");
    }

    #[test]
    fn test_charge_and_discharge() {
        let env = Fixture::new();
        let mut cell = Cell::new().with_energy(100).with_power(250);
        run_once(&mut cell, &[op(Opcode::Charge(Source::Literal)), 20], &env);
        assert_eq!(cell.energy(), 80);
        assert_eq!(cell.power(), 255);
        assert_eq!(cell.general(OUTPUT_REG), 255);

        let mut cell = Cell::new().with_energy(100).with_power(50);
        run_once(&mut cell, &[op(Opcode::Discharge(Source::Literal)), 21], &env);
        assert_eq!(cell.power(), 29);
        assert_eq!(cell.energy(), 110);

        let mut cell = Cell::new().with_power(21);
        run_once(&mut cell, &[op(Opcode::Discharge(Source::Literal)), 21], &env);
        assert_eq!(cell.power(), 21);
        assert_eq!(cell.general(OUTPUT_REG), 0);
    }

    #[test]
    fn test_register_give_reads_amount_and_direction() {
        let right = CENTER.step(Direction::Right, GridDims::new(10, 10)).unwrap();
        let env = Fixture::new().with_neighbor(right, 10, Program::default());
        let mut cell = Cell::new().with_energy(100);
        cell.set_general(4, 30);
        cell.set_general(5, Direction::Right as u8);
        let program = [
            op(Opcode::Give(Source::Register)),
            Slot::general_slot(4),
            Slot::general_slot(5),
        ];

        let request = run_once(&mut cell, &program, &env).unwrap();
        assert_eq!(request.kind, ActionKind::Energy);
        assert_eq!(request.dir, Direction::Right);
        assert_eq!(request.amount, 30);
        assert_eq!(cell.pending_usage(), BASE_USAGE + 30);
        assert_eq!(cell.instruction_pointer(), 3);
    }

    #[test]
    fn test_register_charge_and_discharge() {
        let env = Fixture::new();
        let mut cell = Cell::new().with_energy(100);
        cell.set_general(4, 20);
        let program = [op(Opcode::Charge(Source::Register)), Slot::general_slot(4)];
        run_once(&mut cell, &program, &env);
        assert_eq!(cell.energy(), 80);
        assert_eq!(cell.power(), 20);

        let mut cell = Cell::new().with_energy(100).with_power(40);
        cell.set_general(4, 10);
        let program = [op(Opcode::Discharge(Source::Register)), Slot::general_slot(4)];
        run_once(&mut cell, &program, &env);
        assert_eq!(cell.power(), 30);
        assert_eq!(cell.energy(), 105);
        assert_eq!(cell.general(OUTPUT_REG), 30);
    }

    #[test]
    fn test_register_discharge_can_read_energy_slot() {
        // slot 0 is energy: 60 is not below power 50, so nothing happens
        let mut cell = Cell::new().with_energy(60).with_power(50);
        run_once(&mut cell, &[op(Opcode::Discharge(Source::Register)), 0], &Fixture::new());
        assert_eq!(cell.power(), 50);
        assert_eq!(cell.general(OUTPUT_REG), 0);
    }

    #[test]
    fn test_register_jump_reads_length() {
        let mut cell = Cell::new();
        cell.set_general(6, 10);
        let program = [op(Opcode::Jump(Source::Register)), Slot::general_slot(6)];
        run_once(&mut cell, &program, &Fixture::new());
        assert_eq!(cell.instruction_pointer(), 12);
    }

    #[test]
    fn test_register_probe_and_eat_read_direction() {
        let left = CENTER.step(Direction::Left, GridDims::new(10, 10)).unwrap();
        let env = Fixture::new().with_neighbor(left, 77, Program::default());

        let mut cell = Cell::new();
        cell.set_general(4, Direction::Left as u8);
        let program = [op(Opcode::Probe(Source::Register)), Slot::general_slot(4)];
        run_once(&mut cell, &program, &env);
        assert_eq!(cell.general(OUTPUT_REG), 77);

        let mut cell = Cell::new();
        cell.set_general(4, Direction::Left as u8);
        let program = [op(Opcode::Eat(Source::Register)), Slot::general_slot(4)];
        let request = run_once(&mut cell, &program, &env).unwrap();
        assert_eq!(request.kind, ActionKind::Eat);
        assert_eq!(request.dir, Direction::Left);
        assert_eq!(cell.pending_usage(), BASE_USAGE + EAT_USAGE);
    }

    #[test]
    fn test_register_analyze_reads_direction() {
        let down = CENTER.step(Direction::Down, GridDims::new(10, 10)).unwrap();
        let env = Fixture::new().with_neighbor(down, 50, Program::from_prefix(&[200u8; 10]));
        let mut cell = Cell::new();
        cell.set_general(4, Direction::Down as u8);
        let program = [op(Opcode::Analyze(Source::Register)), Slot::general_slot(4)];
        run_once(&mut cell, &program, &env);
        assert_eq!(cell.general(OUTPUT_REG), 5);
        assert_eq!(cell.heavy_wait(), 1);
    }

    #[test]
    fn test_age_slot_saturates() {
        let mut cell = Cell::new();
        cell.age = 4 * 200;
        assert_eq!(cell.read_slot(2, 0), 200);
        cell.age = 4 * 300;
        assert_eq!(cell.read_slot(2, 0), 255);
    }

    #[test]
    fn test_income_saturates() {
        let mut cell = Cell::new().with_energy(250);
        cell.add_energy(250);
        cell.add_energy(10);
        cell.add_energy(10);
        assert_eq!(cell.pending_income(), 255);
    }

    #[test]
    fn test_settle_saturates_energy() {
        let mut rng = ChaCha8Rng::seed_from_u64(3);
        let mut cell = Cell::new().with_energy(250);
        cell.begin_tick(CENTER, &Program::from_prefix(&[op(Opcode::Add)]), &Fixture::new());
        cell.add_energy(10);
        cell.add_energy(10);
        // 250 + 20 - 2 clamps to 255 (a wrap would leave 2 and no division)
        assert_eq!(cell.end_tick(0, &IMMORTAL, &mut rng), EndOfTick::Divide);
        assert_eq!(cell.energy(), 127);
    }

    #[test]
    fn test_starvation_when_deficit_exceeds_energy() {
        let mut rng = ChaCha8Rng::seed_from_u64(3);
        let mut cell = Cell::new().with_energy(1);
        cell.begin_tick(CENTER, &Program::default(), &Fixture::new());
        // HIB costs 1: survives with nothing left
        assert_eq!(cell.end_tick(0, &IMMORTAL, &mut rng), EndOfTick::None);
        assert_eq!(cell.energy(), 0);

        cell.begin_tick(CENTER, &Program::default(), &Fixture::new());
        assert_eq!(
            cell.end_tick(0, &IMMORTAL, &mut rng),
            EndOfTick::Die(DeathCause::Starvation)
        );
    }

    #[test]
    fn test_light_income_offsets_usage() {
        let mut rng = ChaCha8Rng::seed_from_u64(3);
        let mut cell = Cell::new().with_energy(100);
        cell.begin_tick(CENTER, &Program::from_prefix(&[op(Opcode::Add)]), &Fixture::new());
        // 255 / 32 = 7 income, 2 usage
        cell.end_tick(255, &IMMORTAL, &mut rng);
        assert_eq!(cell.energy(), 105);
    }

    #[test]
    fn test_division_halves_energy() {
        let mut rng = ChaCha8Rng::seed_from_u64(3);
        let mut cell = Cell::new().with_energy(202);
        cell.begin_tick(CENTER, &Program::from_prefix(&[op(Opcode::Add)]), &Fixture::new());
        assert_eq!(cell.end_tick(0, &IMMORTAL, &mut rng), EndOfTick::Divide);
        assert_eq!(cell.energy(), 100);
    }

    #[test]
    fn test_old_age_is_certain_at_ceiling() {
        let mut rng = ChaCha8Rng::seed_from_u64(3);
        let mut cell = Cell::new();
        cell.age = 1023;
        cell.begin_tick(CENTER, &Program::default(), &Fixture::new());
        assert_eq!(
            cell.end_tick(0, &Lifespan::default(), &mut rng),
            EndOfTick::Die(DeathCause::OldAge)
        );
    }

    #[test]
    fn test_result_written_back_to_output() {
        let mut rng = ChaCha8Rng::seed_from_u64(3);
        let mut cell = Cell::new();
        let request = run_once(
            &mut cell,
            &[op(Opcode::Move(Source::Literal)), Direction::Up as u8],
            &Fixture::new(),
        );
        assert!(request.is_some());
        if let Some(r) = cell.request_mut() {
            r.result = 1;
        }
        cell.end_tick(0, &IMMORTAL, &mut rng);
        assert_eq!(cell.general(OUTPUT_REG), 1);
        assert!(cell.request().is_none());
    }

    #[test]
    fn test_fork_quarters_power() {
        let mut parent = Cell::new().with_energy(120).with_power(41);
        parent.set_general(3, 9);
        let child = parent.fork();
        assert_eq!(child.energy(), 120);
        assert_eq!(child.power(), 10);
        assert_eq!(child.general(3), 0);
        assert_eq!(child.age(), 0);
    }
}
