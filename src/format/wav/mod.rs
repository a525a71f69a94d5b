//! WAV audio format support
//!
//! Sound-only recordings are canonical 44-byte-header PCM WAV files. The
//! two size fields are backpatched when the writer is closed.

pub mod header;
pub mod writer;

pub use header::{FormatTag, WavFormat, WavHeader};
pub use writer::WavWriter;

/// WAV format magic numbers
pub const WAVE_MAGIC: &[u8; 4] = b"WAVE";
pub const FMT_CHUNK: &[u8; 4] = b"fmt ";
pub const DATA_CHUNK: &[u8; 4] = b"data";
