//! Indexed colour palette
//!
//! The emulator's colour lookup service is consumed as a plain table of 256
//! RGB entries. The AVI video stream stores it after the bitmap header.

use crate::error::{Error, Result};

/// One palette colour
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Rgb {
    pub r: u8,
    pub g: u8,
    pub b: u8,
}

impl Rgb {
    pub const fn new(r: u8, g: u8, b: u8) -> Self {
        Rgb { r, g, b }
    }
}

/// 256-entry colour table indexed by pixel value
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Palette {
    entries: [Rgb; 256],
}

impl Palette {
    /// Number of palette entries
    pub const SIZE: usize = 256;

    /// Build a palette by querying a colour for every index
    pub fn from_fn<F: FnMut(u8) -> Rgb>(mut lookup: F) -> Self {
        let mut entries = [Rgb::default(); 256];
        for (index, entry) in entries.iter_mut().enumerate() {
            *entry = lookup(index as u8);
        }
        Palette { entries }
    }

    /// Build a palette from packed `RGBRGB...` bytes (768 bytes)
    pub fn from_rgb_bytes(data: &[u8]) -> Result<Self> {
        if data.len() != Self::SIZE * 3 {
            return Err(Error::invalid_input(format!(
                "Palette must be {} bytes, got {}",
                Self::SIZE * 3,
                data.len()
            )));
        }

        Ok(Self::from_fn(|i| {
            let base = i as usize * 3;
            Rgb::new(data[base], data[base + 1], data[base + 2])
        }))
    }

    /// Grey ramp, used when no colour table is supplied
    pub fn grayscale() -> Self {
        Self::from_fn(|i| Rgb::new(i, i, i))
    }

    /// Approximation of the 8-bit Atari GTIA palette: high nibble is the hue,
    /// low nibble the luminance
    pub fn atari_default() -> Self {
        const HUES: [(f32, f32, f32); 16] = [
            (1.00, 1.00, 1.00),
            (1.00, 0.70, 0.30),
            (1.00, 0.55, 0.25),
            (1.00, 0.45, 0.40),
            (1.00, 0.40, 0.60),
            (0.85, 0.40, 0.85),
            (0.60, 0.45, 1.00),
            (0.45, 0.50, 1.00),
            (0.40, 0.60, 1.00),
            (0.35, 0.75, 1.00),
            (0.35, 0.90, 0.90),
            (0.40, 1.00, 0.60),
            (0.50, 1.00, 0.40),
            (0.70, 0.95, 0.30),
            (0.90, 0.85, 0.30),
            (1.00, 0.75, 0.30),
        ];

        Self::from_fn(|i| {
            let (hr, hg, hb) = HUES[(i >> 4) as usize];
            let luma = ((i & 0x0F) as f32 + 1.0) / 16.0;
            let scale = |c: f32| (c * luma * 255.0).round().clamp(0.0, 255.0) as u8;
            Rgb::new(scale(hr), scale(hg), scale(hb))
        })
    }

    /// Look up the colour for a pixel value
    pub fn rgb(&self, index: u8) -> Rgb {
        self.entries[index as usize]
    }

    /// Iterate over all 256 colours in index order
    pub fn iter(&self) -> impl Iterator<Item = &Rgb> {
        self.entries.iter()
    }
}

impl Default for Palette {
    fn default() -> Self {
        Self::atari_default()
    }
}
