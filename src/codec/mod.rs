//! Video and audio codec implementations
//!
//! Recordings use a single video codec, Microsoft RLE8 ("mrle"), which maps
//! directly onto the emulator's one-byte-per-pixel indexed screen. Audio is
//! stored as uncompressed PCM.

pub mod frame;
pub mod mrle;

pub use frame::{AudioSamples, ScreenGeometry, VisibleRect};
pub use mrle::{MrleDecoder, MrleEncoder};
