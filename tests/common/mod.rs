//! Common test utilities for retrorec integration tests
//!
//! Screen and sound generators plus little helpers for poking at the raw
//! bytes of finished recordings.

#![allow(dead_code)]

use retrorec_lib::codec::ScreenGeometry;
use retrorec_lib::format::avi::AviParams;
use retrorec_lib::format::{AudioFormat, TvMode};
use retrorec_lib::util::{Palette, SampleFormat};

// ============================================================================
// Screen Generation
// ============================================================================

/// Small xorshift generator so tests stay deterministic
pub struct Noise(u32);

impl Noise {
    pub fn new(seed: u32) -> Self {
        Noise(seed.max(1))
    }

    pub fn next_u8(&mut self) -> u8 {
        self.0 ^= self.0 << 13;
        self.0 ^= self.0 >> 17;
        self.0 ^= self.0 << 5;
        (self.0 >> 24) as u8
    }
}

/// Screen mixing long runs, short runs and noise.
///
/// Overscan columns outside the visible area are filled with 0xEE so a
/// decoder that leaks them is caught.
pub fn test_screen(geometry: &ScreenGeometry, seed: u32) -> Vec<u8> {
    let mut noise = Noise::new(seed);
    let mut screen = vec![0xEE; geometry.frame_len()];
    let visible = geometry.visible;

    for y in 0..visible.height {
        let row_start = ((visible.y + y) * geometry.width + visible.x) as usize;
        let row = &mut screen[row_start..row_start + visible.width as usize];
        match (y + seed) % 4 {
            0 => row.fill((y % 256) as u8),
            1 => {
                for (x, pixel) in row.iter_mut().enumerate() {
                    *pixel = (x / 7) as u8;
                }
            }
            2 => {
                for pixel in row.iter_mut() {
                    *pixel = noise.next_u8();
                }
            }
            _ => {
                for (x, pixel) in row.iter_mut().enumerate() {
                    *pixel = if x < 300 { 0x94 } else { noise.next_u8() & 3 };
                }
            }
        }
    }
    screen
}

/// Visible rectangle of `screen`, top row first
pub fn visible_pixels(geometry: &ScreenGeometry, screen: &[u8]) -> Vec<u8> {
    (0..geometry.visible.height)
        .flat_map(|row| geometry.visible_row(screen, row).to_vec())
        .collect()
}

// ============================================================================
// Stream Parameters
// ============================================================================

pub fn mono16() -> AudioFormat {
    AudioFormat::new(1, 44_100, SampleFormat::I16)
}

pub fn mono8() -> AudioFormat {
    AudioFormat::new(1, 44_100, SampleFormat::U8)
}

/// Full Atari screen, PAL timing
pub fn atari_params(audio: AudioFormat) -> AviParams {
    AviParams {
        geometry: ScreenGeometry::ATARI,
        frame_rate: TvMode::Pal.frame_rate(),
        audio,
        palette: Palette::default(),
    }
}

/// Tiny screen for tests that count bytes
pub fn tiny_params(audio: AudioFormat) -> AviParams {
    AviParams {
        geometry: ScreenGeometry::with_margin(8, 4, 2).unwrap(),
        frame_rate: TvMode::Ntsc.frame_rate(),
        audio,
        palette: Palette::grayscale(),
    }
}

// ============================================================================
// Byte Helpers
// ============================================================================

pub fn le16(bytes: &[u8], offset: usize) -> u16 {
    u16::from_le_bytes([bytes[offset], bytes[offset + 1]])
}

pub fn le32(bytes: &[u8], offset: usize) -> u32 {
    u32::from_le_bytes(bytes[offset..offset + 4].try_into().unwrap())
}

/// Offset of the first occurrence of `fourcc` at or after `from`
pub fn find_fourcc(bytes: &[u8], fourcc: &[u8; 4], from: usize) -> Option<usize> {
    bytes[from..]
        .windows(4)
        .position(|w| w == fourcc)
        .map(|p| p + from)
}
