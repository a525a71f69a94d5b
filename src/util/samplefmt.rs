//! Audio sample format definitions

use serde::{Deserialize, Serialize};
use std::fmt;

/// PCM sample format produced by the sound chip emulation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SampleFormat {
    /// Unsigned 8-bit
    U8,
    /// Signed 16-bit
    I16,
}

impl SampleFormat {
    /// Get the size in bytes of one sample
    pub fn sample_size(&self) -> usize {
        match self {
            SampleFormat::U8 => 1,
            SampleFormat::I16 => 2,
        }
    }

    /// Get bits per sample
    pub fn bits_per_sample(&self) -> u16 {
        (self.sample_size() * 8) as u16
    }

    /// Look up the format for a sample width in bytes
    pub fn from_sample_size(size: usize) -> Option<Self> {
        match size {
            1 => Some(SampleFormat::U8),
            2 => Some(SampleFormat::I16),
            _ => None,
        }
    }
}

impl fmt::Display for SampleFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SampleFormat::U8 => write!(f, "u8"),
            SampleFormat::I16 => write!(f, "s16"),
        }
    }
}
