//! Bounded grid coordinates and 8-way compass directions
//!
//! The grid does not wrap: stepping across an edge fails instead.

use serde::{Deserialize, Serialize};

/// Grid dimensions, fixed for the lifetime of a simulation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct GridDims {
    pub width: usize,
    pub height: usize,
}

impl GridDims {
    pub fn new(width: usize, height: usize) -> Self {
        Self { width, height }
    }

    #[inline]
    pub fn contains(&self, pos: Position) -> bool {
        pos.row < self.height && pos.col < self.width
    }

    pub fn area(&self) -> usize {
        self.width * self.height
    }

    /// Row-major iteration over every position
    pub fn positions(&self) -> impl Iterator<Item = Position> + '_ {
        (0..self.height).flat_map(move |row| (0..self.width).map(move |col| Position::new(row, col)))
    }
}

/// Grid coordinate, row 0 is the top edge
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub struct Position {
    pub row: usize,
    pub col: usize,
}

impl Position {
    pub fn new(row: usize, col: usize) -> Self {
        Self { row, col }
    }

    /// Whether `dir` can be applied without leaving the grid
    #[inline]
    pub fn can_step(&self, dir: Direction, dims: GridDims) -> bool {
        self.step(dir, dims).is_some()
    }

    /// Neighbor in `dir`, or `None` when it would cross an edge
    #[inline]
    pub fn step(&self, dir: Direction, dims: GridDims) -> Option<Position> {
        let (dr, dc) = dir.offset();
        let row = self.row.checked_add_signed(dr)?;
        let col = self.col.checked_add_signed(dc)?;
        let next = Position::new(row, col);
        dims.contains(next).then_some(next)
    }

    /// All in-bounds neighbors, paired with the direction that reaches them
    pub fn neighbors(&self, dims: GridDims) -> impl Iterator<Item = (Direction, Position)> + '_ {
        Direction::ALL
            .into_iter()
            .filter_map(move |dir| self.step(dir, dims).map(|pos| (dir, pos)))
    }
}

/// 8-way compass direction
///
/// The numeric values are what bytecode operands decode to (low three bits).
/// Numbering starts at `Up` and runs clockwise, so operand 0 moves straight
/// up. Programs written for an UpLeft-first numbering (UpLeft = 0 .. Left = 7)
/// turn one step clockwise of what they meant.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[repr(u8)]
pub enum Direction {
    Up = 0,
    UpRight = 1,
    Right = 2,
    DownRight = 3,
    Down = 4,
    DownLeft = 5,
    Left = 6,
    UpLeft = 7,
}

impl Direction {
    pub const ALL: [Direction; 8] = [
        Direction::Up,
        Direction::UpRight,
        Direction::Right,
        Direction::DownRight,
        Direction::Down,
        Direction::DownLeft,
        Direction::Left,
        Direction::UpLeft,
    ];

    /// Decode a bytecode operand. Only the low three bits matter.
    #[inline]
    pub fn from_byte(byte: u8) -> Self {
        Self::ALL[(byte & 0x7) as usize]
    }

    /// (row, col) displacement
    #[inline]
    pub fn offset(&self) -> (isize, isize) {
        match self {
            Direction::Up => (-1, 0),
            Direction::UpRight => (-1, 1),
            Direction::Right => (0, 1),
            Direction::DownRight => (1, 1),
            Direction::Down => (1, 0),
            Direction::DownLeft => (1, -1),
            Direction::Left => (0, -1),
            Direction::UpLeft => (-1, -1),
        }
    }

    pub fn opposite(&self) -> Self {
        Self::from_byte(*self as u8 + 4)
    }
}
