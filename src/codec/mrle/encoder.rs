//! RLE8 encoder

use super::{max_encoded_size, END_OF_BITMAP, END_OF_LINE, ESCAPE, MAX_RUN};
use crate::codec::ScreenGeometry;
use crate::error::{Error, Result};

/// Encodes the visible part of an indexed-colour screen as RLE8
#[derive(Debug, Clone)]
pub struct MrleEncoder {
    geometry: ScreenGeometry,
}

impl MrleEncoder {
    /// Create an encoder for a screen layout
    pub fn new(geometry: ScreenGeometry) -> Result<Self> {
        geometry.validate()?;
        Ok(MrleEncoder { geometry })
    }

    pub fn geometry(&self) -> &ScreenGeometry {
        &self.geometry
    }

    /// Buffer size that is always large enough for one frame
    pub fn max_frame_size(&self) -> usize {
        max_encoded_size(self.geometry.visible.width, self.geometry.visible.height)
    }

    /// Encode one screen into `out`, returning the number of bytes used.
    ///
    /// `out` must hold the worst case; this is checked before anything is
    /// written so a short buffer never ends up with a partial frame.
    pub fn encode(&self, screen: &[u8], out: &mut [u8]) -> Result<usize> {
        if screen.len() != self.geometry.frame_len() {
            return Err(Error::invalid_input(format!(
                "Screen buffer is {} bytes, expected {}",
                screen.len(),
                self.geometry.frame_len()
            )));
        }

        let need = self.max_frame_size();
        if out.len() < need {
            return Err(Error::BufferTooSmall {
                need,
                have: out.len(),
            });
        }

        let mut pos = 0;
        for row in (0..self.geometry.visible.height).rev() {
            let line = self.geometry.visible_row(screen, row);
            pos = encode_line(line, out, pos);
            out[pos] = ESCAPE;
            out[pos + 1] = END_OF_LINE;
            pos += 2;
        }
        out[pos] = ESCAPE;
        out[pos + 1] = END_OF_BITMAP;

        Ok(pos + 2)
    }

    /// Encode one screen into `out`, replacing its contents
    pub fn encode_to_vec(&self, screen: &[u8], out: &mut Vec<u8>) -> Result<usize> {
        out.clear();
        out.resize(self.max_frame_size(), 0);
        let size = self.encode(screen, out)?;
        out.truncate(size);
        Ok(size)
    }
}

/// Emit `(count, value)` pairs for the maximal runs of `line`
fn encode_line(line: &[u8], out: &mut [u8], mut pos: usize) -> usize {
    let mut x = 0;
    while x < line.len() {
        let value = line[x];
        let mut run = 1;
        while run < MAX_RUN && x + run < line.len() && line[x + run] == value {
            run += 1;
        }
        out[pos] = run as u8;
        out[pos + 1] = value;
        pos += 2;
        x += run;
    }
    pos
}
