//! Recorder settings
//!
//! Persisted as JSON. Every field has a default, so a partial file only
//! overrides what it names.

use crate::codec::ScreenGeometry;
use crate::error::{Error, Result};
use crate::format::avi::{AviParams, HEADER_SIZE, INDEX_BYTES_PER_PAIR, MAX_RECORDING_SIZE};
use crate::format::{AudioFormat, TvMode};
use crate::util::{FilenamePattern, Palette};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;
use tracing::debug;

pub const DEFAULT_SOUND_PATTERN: &str = "atari###.wav";
pub const DEFAULT_VIDEO_PATTERN: &str = "atari###.avi";

/// Settings captured when a recording is opened
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RecorderConfig {
    /// Selects the AVI frame rate
    pub tv_mode: TvMode,
    pub audio: AudioFormat,
    pub geometry: ScreenGeometry,
    /// Largest file a recording may grow to, headers and index included
    pub size_limit: u64,
    /// Pattern for `open_next_sound_file`
    pub sound_pattern: String,
    /// Pattern for `open_next_video_file`
    pub video_pattern: String,
}

impl Default for RecorderConfig {
    fn default() -> Self {
        RecorderConfig {
            tv_mode: TvMode::default(),
            audio: AudioFormat::default(),
            geometry: ScreenGeometry::default(),
            size_limit: MAX_RECORDING_SIZE,
            sound_pattern: DEFAULT_SOUND_PATTERN.to_string(),
            video_pattern: DEFAULT_VIDEO_PATTERN.to_string(),
        }
    }
}

impl RecorderConfig {
    /// Read and validate a JSON settings file
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let text = fs::read_to_string(path).map_err(|e| {
            Error::config(format!("Failed to read config {}: {}", path.display(), e))
        })?;
        let config = RecorderConfig::from_json(&text)?;
        debug!("Loaded recorder config from {}", path.display());
        Ok(config)
    }

    pub fn from_json(text: &str) -> Result<Self> {
        let config: RecorderConfig = serde_json::from_str(text)
            .map_err(|e| Error::config(format!("Invalid config: {}", e)))?;
        config.validate()?;
        Ok(config)
    }

    pub fn to_json(&self) -> Result<String> {
        serde_json::to_string_pretty(self)
            .map_err(|e| Error::config(format!("Failed to serialize config: {}", e)))
    }

    /// Write the settings as pretty-printed JSON
    pub fn save<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let path = path.as_ref();
        fs::write(path, self.to_json()?).map_err(|e| {
            Error::config(format!("Failed to write config {}: {}", path.display(), e))
        })
    }

    pub fn validate(&self) -> Result<()> {
        self.audio.validate()?;
        self.geometry.validate()?;

        // Room for the header, an empty index and at least one index entry
        let minimum = HEADER_SIZE + 8 + INDEX_BYTES_PER_PAIR;
        if self.size_limit < minimum || self.size_limit > MAX_RECORDING_SIZE {
            return Err(Error::config(format!(
                "Size limit {} outside {}..={}",
                self.size_limit, minimum, MAX_RECORDING_SIZE
            )));
        }

        FilenamePattern::parse(&self.sound_pattern)?;
        FilenamePattern::parse(&self.video_pattern)?;
        Ok(())
    }

    /// AVI stream parameters for a recording with `palette`
    pub fn avi_params(&self, palette: &Palette) -> AviParams {
        AviParams {
            geometry: self.geometry,
            frame_rate: self.tv_mode.frame_rate(),
            audio: self.audio,
            palette: palette.clone(),
        }
    }
}
