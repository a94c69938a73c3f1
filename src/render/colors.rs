//! Pixel colors for cells and light

/// 8-bit RGB color
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Rgb {
    pub r: u8,
    pub g: u8,
    pub b: u8,
}

impl Rgb {
    pub const fn new(r: u8, g: u8, b: u8) -> Self {
        Self { r, g, b }
    }

    pub fn to_array(self) -> [u8; 3] {
        [self.r, self.g, self.b]
    }
}

/// Red per point of power
pub const POWER_BRIGHTNESS: u16 = 5;

/// Color of one position
///
/// Red shows power, green energy and blue the light level. An empty
/// position shows light only.
pub fn pixel(energy: u8, power: u8, light: u8) -> Rgb {
    let red = (power as u16 * POWER_BRIGHTNESS).min(u8::MAX as u16) as u8;
    Rgb::new(red, energy, light)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_power_brightness_clamps() {
        assert_eq!(pixel(0, 10, 0).r, 50);
        assert_eq!(pixel(0, 51, 0).r, 255);
        assert_eq!(pixel(0, 200, 0).r, 255);
    }

    #[test]
    fn test_channels() {
        assert_eq!(pixel(120, 0, 33), Rgb::new(0, 120, 33));
    }
}
