//! Frame types handed over by the emulator core

use crate::error::{Error, Result};
use crate::util::SampleFormat;
use byteorder::{ByteOrder, LittleEndian};
use serde::{Deserialize, Serialize};

/// Part of the screen buffer that ends up in the recording
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct VisibleRect {
    pub x: u32,
    pub y: u32,
    pub width: u32,
    pub height: u32,
}

/// Layout of the indexed-colour screen buffer
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScreenGeometry {
    /// Buffer width in pixels (one byte per pixel)
    pub width: u32,
    /// Buffer height in lines
    pub height: u32,
    /// Cropped area that is encoded
    pub visible: VisibleRect,
}

impl ScreenGeometry {
    /// Atari screen buffer: 384x240 with 24 pixels of overscan cropped on
    /// each side
    pub const ATARI: ScreenGeometry = ScreenGeometry {
        width: 384,
        height: 240,
        visible: VisibleRect {
            x: 24,
            y: 0,
            width: 336,
            height: 240,
        },
    };

    /// Full-height geometry with `margin` pixels cropped left and right
    pub fn with_margin(width: u32, height: u32, margin: u32) -> Result<Self> {
        if margin.saturating_mul(2) >= width {
            return Err(Error::invalid_input(format!(
                "Margin {} leaves nothing visible of a {} pixel wide screen",
                margin, width
            )));
        }
        let geometry = ScreenGeometry {
            width,
            height,
            visible: VisibleRect {
                x: margin,
                y: 0,
                width: width - 2 * margin,
                height,
            },
        };
        geometry.validate()?;
        Ok(geometry)
    }

    /// Check that the visible rectangle is non-empty, inside the buffer and
    /// small enough for the 16-bit and 32-bit AVI header fields
    pub fn validate(&self) -> Result<()> {
        let v = &self.visible;
        if v.width == 0 || v.height == 0 {
            return Err(Error::invalid_input("Visible area is empty"));
        }
        if v.width > u16::MAX as u32 || v.height > u16::MAX as u32 {
            return Err(Error::invalid_input(format!(
                "Visible area {}x{} exceeds {} pixels per side",
                v.width,
                v.height,
                u16::MAX
            )));
        }
        if self.width as u64 * self.height as u64 > u32::MAX as u64 {
            return Err(Error::invalid_input(format!(
                "Screen buffer {}x{} is too large",
                self.width, self.height
            )));
        }
        // Worst-case RLE8 frame must fit a 32-bit chunk size
        if v.height as u64 * (2 * v.width as u64 + 2) + 2 > u32::MAX as u64 {
            return Err(Error::invalid_input(format!(
                "Visible area {}x{} is too large to encode",
                v.width, v.height
            )));
        }
        if v.x as u64 + v.width as u64 > self.width as u64
            || v.y as u64 + v.height as u64 > self.height as u64
        {
            return Err(Error::invalid_input(format!(
                "Visible area {}x{}+{}+{} exceeds {}x{} screen",
                v.width, v.height, v.x, v.y, self.width, self.height
            )));
        }
        Ok(())
    }

    /// Bytes in one full screen buffer
    pub fn frame_len(&self) -> usize {
        self.width as usize * self.height as usize
    }

    /// Visible line `row` (0 = top) of a screen buffer
    pub fn visible_row<'a>(&self, screen: &'a [u8], row: u32) -> &'a [u8] {
        let start = (self.visible.y + row) as usize * self.width as usize + self.visible.x as usize;
        &screen[start..start + self.visible.width as usize]
    }
}

impl Default for ScreenGeometry {
    fn default() -> Self {
        Self::ATARI
    }
}

/// One block of interleaved PCM samples from the sound emulation
#[derive(Debug, Clone, Copy)]
pub enum AudioSamples<'a> {
    /// Unsigned 8-bit samples
    U8(&'a [u8]),
    /// Signed 16-bit samples in host order
    I16(&'a [i16]),
}

impl<'a> AudioSamples<'a> {
    /// Sample format of this block
    pub fn sample_format(&self) -> SampleFormat {
        match self {
            AudioSamples::U8(_) => SampleFormat::U8,
            AudioSamples::I16(_) => SampleFormat::I16,
        }
    }

    /// Number of samples, counting every channel
    pub fn len(&self) -> usize {
        match self {
            AudioSamples::U8(s) => s.len(),
            AudioSamples::I16(s) => s.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Size of the block once serialized
    pub fn byte_len(&self) -> usize {
        self.len() * self.sample_format().sample_size()
    }

    /// Append the samples to `out` in little-endian order
    pub fn extend_le_bytes(&self, out: &mut Vec<u8>) {
        match self {
            AudioSamples::U8(s) => out.extend_from_slice(s),
            AudioSamples::I16(s) => {
                let start = out.len();
                out.resize(start + s.len() * 2, 0);
                LittleEndian::write_i16_into(s, &mut out[start..]);
            }
        }
    }
}
