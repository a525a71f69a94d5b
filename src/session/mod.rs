//! Multimedia session
//!
//! [`MediaSession`] owns at most one open recording and routes the
//! emulator's per-frame audio and video to it. Opening a new file closes
//! the current one; a failed write closes the recording so that its header
//! is always backpatched.

use crate::codec::AudioSamples;
use crate::config::RecorderConfig;
use crate::error::{Error, Result};
use crate::format::avi::AviWriter;
use crate::format::stats::RecordingStats;
use crate::format::wav::WavWriter;
use crate::format::{AudioFormat, OutputFormat, TvMode};
use crate::util::{FilenamePattern, Palette};
use serde::Serialize;
use std::fs::File;
use std::io::BufWriter;
use std::path::{Path, PathBuf};
use tracing::{info, warn};

type FileWavWriter = WavWriter<BufWriter<File>>;
type FileAviWriter = AviWriter<BufWriter<File>>;

/// The active output, if any
pub enum Recording {
    Closed,
    Wav {
        path: PathBuf,
        writer: FileWavWriter,
    },
    Avi {
        path: PathBuf,
        writer: Box<FileAviWriter>,
    },
}

impl Recording {
    pub fn is_open(&self) -> bool {
        !matches!(self, Recording::Closed)
    }

    pub fn path(&self) -> Option<&Path> {
        match self {
            Recording::Closed => None,
            Recording::Wav { path, .. } | Recording::Avi { path, .. } => Some(path),
        }
    }

    pub fn format(&self) -> Option<OutputFormat> {
        match self {
            Recording::Closed => None,
            Recording::Wav { .. } => Some(OutputFormat::Wav),
            Recording::Avi { .. } => Some(OutputFormat::Avi),
        }
    }
}

/// Snapshot returned by [`MediaSession::recording_stats`]
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RecordingStatus {
    pub elapsed_secs: f64,
    /// Bytes in the file so far
    pub size_bytes: u64,
    /// Human-readable format, e.g. "AVI MRLE/PCM"
    pub label: String,
}

/// Recording controller driven by the emulator's frame loop
pub struct MediaSession {
    config: RecorderConfig,
    palette: Palette,
    recording: Recording,
    paused: bool,
    sound_names: FilenamePattern,
    video_names: FilenamePattern,
}

impl MediaSession {
    pub fn new(config: RecorderConfig) -> Result<Self> {
        config.validate()?;
        Ok(MediaSession {
            sound_names: FilenamePattern::parse(&config.sound_pattern)?,
            video_names: FilenamePattern::parse(&config.video_pattern)?,
            config,
            palette: Palette::default(),
            recording: Recording::Closed,
            paused: false,
        })
    }

    pub fn config(&self) -> &RecorderConfig {
        &self.config
    }

    /// Palette used by the next video recording
    pub fn set_palette(&mut self, palette: Palette) {
        self.palette = palette;
    }

    /// TV standard used by the next video recording
    pub fn set_tv_mode(&mut self, tv_mode: TvMode) {
        self.config.tv_mode = tv_mode;
    }

    /// Sound format used by the next recording
    pub fn set_audio_format(&mut self, format: AudioFormat) -> Result<()> {
        format.validate()?;
        self.config.audio = format;
        Ok(())
    }

    pub fn recording(&self) -> &Recording {
        &self.recording
    }

    pub fn is_file_open(&self) -> bool {
        self.recording.is_open()
    }

    pub fn is_paused(&self) -> bool {
        self.paused
    }

    /// While paused, writes are accepted and dropped
    pub fn set_paused(&mut self, paused: bool) {
        if paused != self.paused && self.is_file_open() {
            info!("Recording {}", if paused { "paused" } else { "resumed" });
        }
        self.paused = paused;
    }

    /// Finalize the current recording and cut off anything a failed write
    /// left past its end. Returns `Ok(false)` if nothing was open.
    pub fn close_file(&mut self) -> Result<bool> {
        self.paused = false;
        let result = match std::mem::replace(&mut self.recording, Recording::Closed) {
            Recording::Closed => return Ok(false),
            Recording::Wav { path, writer } => {
                let seconds = writer.elapsed_secs();
                writer.close_and_truncate().map(|_| (path, seconds))
            }
            Recording::Avi { path, writer } => {
                let seconds = writer.elapsed_secs();
                (*writer).close_and_truncate().map(|_| (path, seconds))
            }
        };

        let (path, seconds) = result?;
        info!("Closed {} ({:.1}s)", path.display(), seconds);
        Ok(true)
    }

    /// Start an audio-only recording
    pub fn open_sound_file<P: AsRef<Path>>(&mut self, path: P) -> Result<()> {
        self.close_previous();
        let path = path.as_ref().to_path_buf();

        let writer =
            WavWriter::create(&path, self.config.audio)?.with_size_limit(self.config.size_limit);
        info!(
            "Recording sound to {} ({} Hz, {} channel(s), {})",
            path.display(),
            self.config.audio.sample_rate,
            self.config.audio.channels,
            self.config.audio.sample_format
        );
        self.recording = Recording::Wav { path, writer };
        Ok(())
    }

    /// Start a movie recording
    pub fn open_video_file<P: AsRef<Path>>(&mut self, path: P) -> Result<()> {
        self.close_previous();
        let path = path.as_ref().to_path_buf();

        let params = self.config.avi_params(&self.palette);
        let writer = AviWriter::create(&path, params)?.with_size_limit(self.config.size_limit);
        info!(
            "Recording video to {} ({}, {:.3} fps)",
            path.display(),
            self.config.tv_mode,
            self.config.tv_mode.frame_rate().fps()
        );
        self.recording = Recording::Avi {
            path,
            writer: Box::new(writer),
        };
        Ok(())
    }

    /// Open a sound or video recording depending on the file extension
    pub fn open_file<P: AsRef<Path>>(&mut self, path: P) -> Result<OutputFormat> {
        let format = OutputFormat::from_path(&path)?;
        match format {
            OutputFormat::Wav => self.open_sound_file(path)?,
            OutputFormat::Avi => self.open_video_file(path)?,
        }
        Ok(format)
    }

    /// Open the next unused name of the sound file pattern
    pub fn open_next_sound_file(&mut self) -> Result<PathBuf> {
        let path = next_name(&mut self.sound_names, &self.config.sound_pattern)?;
        self.open_sound_file(&path)?;
        Ok(path)
    }

    /// Open the next unused name of the video file pattern
    pub fn open_next_video_file(&mut self) -> Result<PathBuf> {
        let path = next_name(&mut self.video_names, &self.config.video_pattern)?;
        self.open_video_file(&path)?;
        Ok(path)
    }

    /// Hand one frame's worth of sound to the recording.
    ///
    /// Returns the bytes taken, 0 when nothing is recording.
    pub fn write_audio(&mut self, samples: AudioSamples<'_>) -> Result<usize> {
        if self.paused {
            return Ok(0);
        }
        let result = match &mut self.recording {
            Recording::Closed => return Ok(0),
            Recording::Wav { writer, .. } => writer.write_samples(samples),
            Recording::Avi { writer, .. } => writer.add_audio_samples(samples),
        };
        self.close_on_error(result)
    }

    /// Hand one screen to the recording.
    ///
    /// Returns `false` when no movie is recording.
    pub fn write_video(&mut self, screen: &[u8]) -> Result<bool> {
        if self.paused {
            return Ok(false);
        }
        let result = match &mut self.recording {
            Recording::Avi { writer, .. } => writer.add_video_frame(screen).map(|_| true),
            _ => return Ok(false),
        };
        self.close_on_error(result)
    }

    /// Elapsed time, size and format of the current recording
    pub fn recording_stats(&self) -> Option<RecordingStatus> {
        match &self.recording {
            Recording::Closed => None,
            Recording::Wav { writer, .. } => Some(RecordingStatus {
                elapsed_secs: writer.elapsed_secs(),
                size_bytes: writer.stats().total_bytes,
                label: format!("{} PCM", OutputFormat::Wav.label()),
            }),
            Recording::Avi { writer, .. } => Some(RecordingStatus {
                elapsed_secs: writer.elapsed_secs(),
                size_bytes: writer.stats().total_bytes,
                label: format!("{} MRLE/PCM", OutputFormat::Avi.label()),
            }),
        }
    }

    /// Detailed counters of the current recording
    pub fn stats(&self) -> Option<&RecordingStats> {
        match &self.recording {
            Recording::Closed => None,
            Recording::Wav { writer, .. } => Some(writer.stats()),
            Recording::Avi { writer, .. } => Some(writer.stats()),
        }
    }

    fn close_previous(&mut self) {
        if let Err(e) = self.close_file() {
            warn!("Failed to close previous recording: {}", e);
        }
    }

    fn close_on_error<T>(&mut self, result: Result<T>) -> Result<T> {
        if let Err(e) = &result {
            if e.is_size_limit() {
                warn!("{}", e);
            } else {
                warn!("Recording failed, closing: {}", e);
            }
            if let Err(close_err) = self.close_file() {
                warn!("Failed to close recording: {}", close_err);
            }
        }
        result
    }
}

impl Drop for MediaSession {
    fn drop(&mut self) {
        if let Err(e) = self.close_file() {
            warn!("Failed to close recording on shutdown: {}", e);
        }
    }
}

fn next_name(names: &mut FilenamePattern, pattern: &str) -> Result<PathBuf> {
    names.next_free().ok_or_else(|| {
        Error::invalid_state(format!("No unused file name left for pattern '{}'", pattern))
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::util::SampleFormat;

    fn session() -> MediaSession {
        let config = RecorderConfig {
            audio: AudioFormat::new(1, 8_000, SampleFormat::U8),
            ..RecorderConfig::default()
        };
        MediaSession::new(config).unwrap()
    }

    #[test]
    fn test_writes_without_file_are_noops() {
        let mut session = session();
        assert!(!session.is_file_open());
        assert_eq!(session.write_audio(AudioSamples::U8(&[1, 2])).unwrap(), 0);
        assert!(!session.write_video(&[0; 384 * 240]).unwrap());
        assert!(session.recording_stats().is_none());
        assert!(!session.close_file().unwrap());
    }

    #[test]
    fn test_open_file_selects_by_extension() {
        let dir = tempfile::tempdir().unwrap();
        let mut session = session();

        let format = session.open_file(dir.path().join("a.WAV")).unwrap();
        assert_eq!(format, OutputFormat::Wav);
        assert_eq!(session.recording().format(), Some(OutputFormat::Wav));

        let format = session.open_file(dir.path().join("b.avi")).unwrap();
        assert_eq!(format, OutputFormat::Avi);
        assert_eq!(
            session.recording().path(),
            Some(dir.path().join("b.avi").as_path())
        );

        assert!(session.open_file(dir.path().join("c.mp4")).is_err());
        // A rejected extension leaves the open recording alone
        assert!(session.is_file_open());
    }

    #[test]
    fn test_video_ignored_by_sound_recording() {
        let dir = tempfile::tempdir().unwrap();
        let mut session = session();
        session.open_sound_file(dir.path().join("s.wav")).unwrap();
        assert!(!session.write_video(&[0; 384 * 240]).unwrap());
        assert_eq!(session.write_audio(AudioSamples::U8(&[1, 2, 3])).unwrap(), 3);

        let status = session.recording_stats().unwrap();
        assert_eq!(status.label, "WAV PCM");
        assert_eq!(status.size_bytes, 47);
    }

    #[test]
    fn test_pause_drops_writes() {
        let dir = tempfile::tempdir().unwrap();
        let mut session = session();
        session.open_sound_file(dir.path().join("p.wav")).unwrap();
        session.set_paused(true);
        assert!(session.is_paused());
        assert_eq!(session.write_audio(AudioSamples::U8(&[1])).unwrap(), 0);
        session.set_paused(false);
        assert_eq!(session.write_audio(AudioSamples::U8(&[1])).unwrap(), 1);
    }

    #[test]
    fn test_order_error_closes_recording() {
        let dir = tempfile::tempdir().unwrap();
        let mut session = session();
        session.open_video_file(dir.path().join("o.avi")).unwrap();
        let screen = vec![0u8; 384 * 240];
        assert!(session.write_video(&screen).unwrap());
        assert!(session.write_video(&screen).is_err());
        assert!(!session.is_file_open());
    }
}
