//! Container format handling
//!
//! Recordings are written either as AVI (run-length video plus PCM audio)
//! or as WAV (audio only). The container is chosen from the file extension.

pub mod avi;
pub mod riff;
pub mod stats;
pub mod stream;
pub mod wav;

pub use stats::RecordingStats;
pub use stream::{AudioFormat, FrameRate, TvMode};

use crate::error::{Error, Result};
use std::fmt;
use std::path::Path;

/// Output container of a recording
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum OutputFormat {
    /// Audio-only WAV file
    Wav,
    /// AVI movie with video and audio
    Avi,
}

impl OutputFormat {
    /// Short name of the format
    pub fn name(&self) -> &'static str {
        match self {
            OutputFormat::Wav => "wav",
            OutputFormat::Avi => "avi",
        }
    }

    /// Human readable label for status displays
    pub fn label(&self) -> &'static str {
        match self {
            OutputFormat::Wav => "WAV",
            OutputFormat::Avi => "AVI",
        }
    }

    /// Detect the container from a file name, ignoring extension case
    pub fn from_path<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let ext = path
            .extension()
            .and_then(|e| e.to_str())
            .map(|e| e.to_ascii_lowercase());

        match ext.as_deref() {
            Some("wav") => Ok(OutputFormat::Wav),
            Some("avi") => Ok(OutputFormat::Avi),
            _ => Err(Error::unsupported(format!(
                "Cannot record to '{}': use .wav for sound or .avi for video",
                path.display()
            ))),
        }
    }
}

impl fmt::Display for OutputFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name())
    }
}
