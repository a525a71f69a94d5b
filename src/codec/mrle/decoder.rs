//! Reference RLE8 decoder
//!
//! Understands encoded runs, end-of-line, end-of-bitmap, delta and absolute
//! mode, which covers everything a Microsoft RLE8 stream may contain.

use super::{DELTA, END_OF_BITMAP, END_OF_LINE, ESCAPE};
use crate::error::{Error, Result};

/// Decodes RLE8 bitmaps into top-down rows of palette indices
#[derive(Debug, Clone)]
pub struct MrleDecoder {
    width: u32,
    height: u32,
}

impl MrleDecoder {
    pub fn new(width: u32, height: u32) -> Self {
        MrleDecoder { width, height }
    }

    /// Decode one frame. Pixels not touched by the stream stay 0.
    pub fn decode(&self, data: &[u8]) -> Result<Vec<u8>> {
        let width = self.width as usize;
        let height = self.height as usize;
        let mut pixels = vec![0u8; width * height];

        // Row counted from the bottom of the bitmap
        let mut line = 0usize;
        let mut x = 0usize;
        let mut pos = 0usize;

        let mut put = |line: usize, x: usize, value: u8| -> Result<()> {
            if line >= height || x >= width {
                return Err(Error::codec(format!(
                    "RLE8 pixel ({}, {}) outside {}x{} bitmap",
                    x, line, width, height
                )));
            }
            pixels[(height - 1 - line) * width + x] = value;
            Ok(())
        };

        loop {
            let pair = data
                .get(pos..pos + 2)
                .ok_or_else(|| Error::codec("RLE8 stream ends without end-of-bitmap"))?;
            let (count, value) = (pair[0], pair[1]);
            pos += 2;

            if count != ESCAPE {
                for _ in 0..count {
                    put(line, x, value)?;
                    x += 1;
                }
                continue;
            }

            match value {
                END_OF_LINE => {
                    line += 1;
                    x = 0;
                }
                END_OF_BITMAP => break,
                DELTA => {
                    let delta = data
                        .get(pos..pos + 2)
                        .ok_or_else(|| Error::codec("Truncated RLE8 delta"))?;
                    x += delta[0] as usize;
                    line += delta[1] as usize;
                    pos += 2;
                }
                literal => {
                    let len = literal as usize;
                    let run = data
                        .get(pos..pos + len)
                        .ok_or_else(|| Error::codec("Truncated RLE8 absolute run"))?;
                    for &value in run {
                        put(line, x, value)?;
                        x += 1;
                    }
                    // Absolute runs are padded to a word boundary
                    pos += len + (len & 1);
                }
            }
        }

        Ok(pixels)
    }
}
