//! Common utilities and data structures

pub mod filename;
pub mod le;
pub mod palette;
pub mod samplefmt;

#[cfg(test)]
pub(crate) mod failing;

pub use filename::FilenamePattern;
pub use le::LeWriteExt;
pub use palette::{Palette, Rgb};
pub use samplefmt::SampleFormat;

use std::fmt;

/// Media carried by a recording
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MediaType {
    /// Screen frames
    Video,
    /// Sound samples
    Audio,
}

impl fmt::Display for MediaType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MediaType::Video => write!(f, "video"),
            MediaType::Audio => write!(f, "audio"),
        }
    }
}
