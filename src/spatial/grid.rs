//! Dense per-position storage

use crate::spatial::geometry::{GridDims, Position};

/// Dense 2D grid, stored column by column
///
/// Column-major layout keeps each column contiguous, which is what the
/// top-to-bottom light walk wants.
#[derive(Debug, Clone)]
pub struct Grid<T: Clone + Default> {
    dims: GridDims,
    data: Vec<T>,
}

impl<T: Clone + Default> Grid<T> {
    pub fn new(dims: GridDims) -> Self {
        Self {
            dims,
            data: vec![T::default(); dims.area()],
        }
    }

    pub fn dims(&self) -> GridDims {
        self.dims
    }

    #[inline]
    fn index(&self, pos: Position) -> usize {
        pos.col * self.dims.height + pos.row
    }

    #[inline]
    pub fn get(&self, pos: Position) -> Option<&T> {
        if self.dims.contains(pos) {
            Some(&self.data[self.index(pos)])
        } else {
            None
        }
    }

    #[inline]
    pub fn get_mut(&mut self, pos: Position) -> Option<&mut T> {
        if self.dims.contains(pos) {
            let idx = self.index(pos);
            Some(&mut self.data[idx])
        } else {
            None
        }
    }

    #[inline]
    pub fn set(&mut self, pos: Position, value: T) {
        if let Some(slot) = self.get_mut(pos) {
            *slot = value;
        }
    }

    /// One contiguous slice per column, top row first
    pub fn column(&self, col: usize) -> &[T] {
        let h = self.dims.height;
        &self.data[col * h..(col + 1) * h]
    }

    /// Raw column-major storage, for splitting into column bands
    pub fn as_mut_slice(&mut self) -> &mut [T] {
        &mut self.data
    }
}
