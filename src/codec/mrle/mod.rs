//! Microsoft RLE8 ("mrle") video codec
//!
//! Each scanline is a list of `(count, value)` byte pairs followed by an
//! end-of-line marker `(0, 0)`; the bitmap ends with `(0, 1)`. AVI bitmaps
//! are stored bottom-up, so the last visible line is encoded first.

pub mod decoder;
pub mod encoder;

pub use decoder::MrleDecoder;
pub use encoder::MrleEncoder;

/// FourCC used in the stream header handler field
pub const MRLE_FOURCC: [u8; 4] = *b"mrle";

/// `BITMAPINFOHEADER.biCompression` value for 8-bit RLE
pub const BI_RLE8: u32 = 1;

/// Escape byte that introduces the markers below
pub const ESCAPE: u8 = 0;
/// `(0, 0)` end of line
pub const END_OF_LINE: u8 = 0;
/// `(0, 1)` end of bitmap
pub const END_OF_BITMAP: u8 = 1;
/// `(0, 2, dx, dy)` cursor move
pub const DELTA: u8 = 2;

/// Longest run a single pair can describe
pub const MAX_RUN: usize = 255;

/// Worst-case encoded size of a `width x height` bitmap: every pixel differs
/// from its neighbour (two bytes each), plus the line and bitmap markers.
pub fn max_encoded_size(width: u32, height: u32) -> usize {
    height as usize * (2 * width as usize + 2) + 2
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_max_encoded_size() {
        assert_eq!(max_encoded_size(1, 1), 6);
        assert_eq!(max_encoded_size(336, 240), 240 * 674 + 2);
    }
}
