//! Read-only projection of the world for display
//!
//! Nothing here modifies simulation state. Call it between ticks, never
//! while a tick is running.

pub mod colors;

use std::path::Path;

use image::RgbImage;

use crate::core::error::Result;
use crate::ecs::world::World;
use crate::spatial::geometry::Position;

pub use colors::{pixel, Rgb};

/// What a display needs to know about one position
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CellSample {
    pub position: Position,
    pub occupied: bool,
    pub energy: u8,
    pub power: u8,
    pub light: u8,
}

impl CellSample {
    pub fn color(&self) -> Rgb {
        pixel(self.energy, self.power, self.light)
    }
}

/// Sample every position in row-major order into a reusable buffer
pub fn collect_samples(world: &World, buffer: &mut Vec<CellSample>) {
    buffer.clear();
    buffer.reserve(world.dims().area());

    for position in world.dims().positions() {
        let cell = world.cell_at(position).and_then(|id| world.cell(id));
        buffer.push(CellSample {
            position,
            occupied: cell.is_some(),
            energy: cell.map_or(0, |c| c.energy()),
            power: cell.map_or(0, |c| c.power()),
            light: world.light_at(position),
        });
    }
}

/// Row-major RGB24 frame, three bytes per position
pub fn rgb_frame(world: &World) -> Vec<u8> {
    let mut samples = Vec::new();
    collect_samples(world, &mut samples);
    samples
        .iter()
        .flat_map(|sample| sample.color().to_array())
        .collect()
}

/// Write the current frame as a PNG image
pub fn save_png(world: &World, path: &Path) -> Result<()> {
    let dims = world.dims();
    let image = RgbImage::from_fn(dims.width as u32, dims.height as u32, |x, y| {
        let position = Position::new(y as usize, x as usize);
        let cell = world.cell_at(position).and_then(|id| world.cell(id));
        let color = pixel(
            cell.map_or(0, |c| c.energy()),
            cell.map_or(0, |c| c.power()),
            world.light_at(position),
        );
        image::Rgb(color.to_array())
    });
    image.save(path)?;
    tracing::info!(path = %path.display(), "saved snapshot");
    Ok(())
}
