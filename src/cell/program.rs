//! Fixed-length cell bytecode

use rand::Rng;

/// Bytes in every cell program
pub const PROGRAM_LEN: usize = 127;

/// A cell's bytecode. Addressing wraps modulo [`PROGRAM_LEN`].
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Program([u8; PROGRAM_LEN]);

impl Default for Program {
    fn default() -> Self {
        Self([0; PROGRAM_LEN])
    }
}

impl Program {
    /// Program starting with `prefix`, zero-filled after it
    ///
    /// Bytes past [`PROGRAM_LEN`] are dropped.
    pub fn from_prefix(prefix: &[u8]) -> Self {
        let mut bytes = [0; PROGRAM_LEN];
        let n = prefix.len().min(PROGRAM_LEN);
        bytes[..n].copy_from_slice(&prefix[..n]);
        Self(bytes)
    }

    #[inline]
    pub fn read(&self, addr: usize) -> u8 {
        self.0[addr % PROGRAM_LEN]
    }

    pub fn bytes(&self) -> &[u8; PROGRAM_LEN] {
        &self.0
    }

    /// Number of positions at which the two programs differ
    pub fn difference(&self, other: &Program) -> usize {
        self.0
            .iter()
            .zip(other.0.iter())
            .filter(|(a, b)| a != b)
            .count()
    }

    /// Overwrite `count` uniformly chosen bytes with uniformly random values
    ///
    /// The same position may be picked more than once, so fewer than `count`
    /// bytes can end up changed.
    pub fn mutate<R: Rng + ?Sized>(&mut self, count: usize, rng: &mut R) {
        for _ in 0..count {
            let idx = rng.gen_range(0..PROGRAM_LEN);
            self.0[idx] = rng.gen();
        }
    }
}
