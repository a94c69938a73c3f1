//! Per-job random streams for the parallel phases
//!
//! A job is a fixed range of work (a chunk of cells, a band of light
//! columns). Every job gets its own ChaCha stream derived from the tick seed,
//! so no generator is ever shared between threads and results do not depend
//! on how rayon schedules the jobs.

use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;

/// First stream id used by light bands. End-phase chunks use the ids below.
pub const LIGHT_STREAM_BASE: u64 = 1 << 32;

/// Generator for job number `stream` of the tick seeded with `tick_seed`
pub fn job_rng(tick_seed: u64, stream: u64) -> ChaCha8Rng {
    let mut rng = ChaCha8Rng::seed_from_u64(tick_seed);
    rng.set_stream(stream);
    rng
}

/// Whether a phase over `live` cells should go parallel
#[inline]
pub fn should_parallelize(live: usize, threshold: usize) -> bool {
    live >= threshold
}
