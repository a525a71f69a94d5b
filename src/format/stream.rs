//! Stream parameters supplied by the emulator

use crate::error::{Error, Result};
use crate::util::SampleFormat;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Frame rate as an exact `rate / scale` fraction, the way AVI stores it
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct FrameRate {
    pub rate: u32,
    pub scale: u32,
}

impl FrameRate {
    pub const fn new(rate: u32, scale: u32) -> Self {
        FrameRate { rate, scale }
    }

    /// Frames per second
    pub fn fps(&self) -> f64 {
        self.rate as f64 / self.scale as f64
    }

    /// Frame duration in microseconds, as stored in the AVI main header
    pub fn micros_per_frame(&self) -> u32 {
        (1_000_000u64 * self.scale as u64 / self.rate as u64) as u32
    }

    /// Playing time of `frames` frames
    pub fn duration_secs(&self, frames: u64) -> f64 {
        frames as f64 * self.scale as f64 / self.rate as f64
    }
}

/// Television standard of the emulated machine
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum TvMode {
    #[default]
    Pal,
    Ntsc,
}

impl TvMode {
    /// Exact refresh rate of the emulated video chip
    pub fn frame_rate(&self) -> FrameRate {
        match self {
            // 1773447 Hz CPU clock / 35568 cycles per frame
            TvMode::Pal => FrameRate::new(1_773_447, 35_568),
            // 1789790 Hz CPU clock / 29868 cycles per frame
            TvMode::Ntsc => FrameRate::new(1_789_790, 29_868),
        }
    }
}

impl fmt::Display for TvMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TvMode::Pal => write!(f, "pal"),
            TvMode::Ntsc => write!(f, "ntsc"),
        }
    }
}

impl FromStr for TvMode {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_ascii_lowercase().as_str() {
            "pal" => Ok(TvMode::Pal),
            "ntsc" => Ok(TvMode::Ntsc),
            other => Err(Error::invalid_input(format!("Unknown TV mode: {}", other))),
        }
    }
}

/// Format of the PCM stream produced by the sound emulation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct AudioFormat {
    /// Number of channels (1 = mono, 2 = stereo)
    pub channels: u16,
    /// Sample rate in Hz
    pub sample_rate: u32,
    /// Sample width
    pub sample_format: SampleFormat,
}

impl AudioFormat {
    pub fn new(channels: u16, sample_rate: u32, sample_format: SampleFormat) -> Self {
        AudioFormat {
            channels,
            sample_rate,
            sample_format,
        }
    }

    /// Bytes per sample frame (all channels)
    pub fn block_align(&self) -> u16 {
        self.channels * self.sample_format.sample_size() as u16
    }

    /// Average bytes per second
    pub fn byte_rate(&self) -> u32 {
        self.sample_rate * self.block_align() as u32
    }

    pub fn bits_per_sample(&self) -> u16 {
        self.sample_format.bits_per_sample()
    }

    /// Validate format parameters
    pub fn validate(&self) -> Result<()> {
        if self.channels == 0 || self.channels > 2 {
            return Err(Error::invalid_input(format!(
                "Invalid channel count: {}",
                self.channels
            )));
        }
        if self.sample_rate == 0 {
            return Err(Error::invalid_input("Invalid sample rate: 0"));
        }
        Ok(())
    }
}

impl Default for AudioFormat {
    fn default() -> Self {
        AudioFormat::new(1, 44_100, SampleFormat::I16)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tv_mode_rates() {
        let pal = TvMode::Pal.frame_rate();
        assert!((pal.fps() - 49.86).abs() < 0.01);
        assert_eq!(pal.micros_per_frame(), 20_055);

        let ntsc = TvMode::Ntsc.frame_rate();
        assert!((ntsc.fps() - 59.92).abs() < 0.01);
        assert_eq!(ntsc.micros_per_frame(), 16_687);
    }

    #[test]
    fn test_tv_mode_parse() {
        assert_eq!("PAL".parse::<TvMode>().unwrap(), TvMode::Pal);
        assert_eq!("ntsc".parse::<TvMode>().unwrap(), TvMode::Ntsc);
        assert!("secam".parse::<TvMode>().is_err());
    }

    #[test]
    fn test_audio_format_calculations() {
        let format = AudioFormat::new(2, 44_100, SampleFormat::I16);
        assert_eq!(format.block_align(), 4);
        assert_eq!(format.byte_rate(), 176_400);
        assert_eq!(format.bits_per_sample(), 16);
        assert!(format.validate().is_ok());

        assert!(AudioFormat::new(0, 44_100, SampleFormat::U8).validate().is_err());
        assert!(AudioFormat::new(1, 0, SampleFormat::U8).validate().is_err());
    }

    #[test]
    fn test_duration() {
        let rate = FrameRate::new(50, 1);
        assert_eq!(rate.duration_secs(100), 2.0);
    }
}
