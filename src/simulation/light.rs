//! Light field: day/night cycle and column shadows
//!
//! Light enters at the top row of every column and loses a little at each row
//! it passes, more where a cell sits.

use rand::Rng;
use rayon::prelude::*;

use crate::core::types::{CellId, Tick};
use crate::simulation::workers::{job_rng, LIGHT_STREAM_BASE};
use crate::spatial::grid::Grid;

/// Ticks in one day/night cycle
pub const DAY_LENGTH: Tick = 256;

/// Attenuation per empty row
pub const OPEN_SHADE: u8 = 3;
/// Attenuation per occupied row
pub const CELL_SHADE: u8 = 6;

/// Columns handled by one light job
const BAND_COLUMNS: usize = 16;

/// Top-row light level for `tick`: a triangle wave over [`DAY_LENGTH`]
pub fn day_light(tick: Tick) -> u8 {
    let t = tick % DAY_LENGTH;
    if t < DAY_LENGTH / 2 {
        (DAY_LENGTH - t).min(u8::MAX as Tick) as u8
    } else {
        t as u8
    }
}

/// Recompute the whole light field from current occupancy
///
/// Columns are independent, so bands of columns run in parallel, each with
/// its own random stream.
pub fn update_light(
    light: &mut Grid<u8>,
    occupancy: &Grid<Option<CellId>>,
    tick: Tick,
    tick_seed: u64,
) {
    let height = light.dims().height;
    let top = day_light(tick);

    light
        .as_mut_slice()
        .par_chunks_mut(height * BAND_COLUMNS)
        .enumerate()
        .for_each(|(band, columns)| {
            let mut rng = job_rng(tick_seed, LIGHT_STREAM_BASE + band as u64);
            for (offset, column) in columns.chunks_mut(height).enumerate() {
                let col = band * BAND_COLUMNS + offset;
                shade_column(column, occupancy.column(col), top, &mut rng);
            }
        });
}

fn shade_column<R: Rng + ?Sized>(
    column: &mut [u8],
    occupied: &[Option<CellId>],
    top: u8,
    rng: &mut R,
) {
    let mut level = top;
    for (light, cell) in column.iter_mut().zip(occupied) {
        *light = level;
        let shade = if cell.is_some() { CELL_SHADE } else { OPEN_SHADE };
        level = level.saturating_sub(shade + rng.gen_range(0..=1));
    }
}
