//! retrorec - AVI/WAV recording for 8-bit home computer emulators
//!
//! Captures the emulated screen and sound to disk, either as an AVI movie
//! (Microsoft RLE8 video plus PCM audio) or as a WAV sound file.
//!
//! # Architecture
//!
//! - `session`: the recording controller the emulator talks to
//! - `format`: WAV and AVI writers and readers
//! - `codec`: RLE8 encoder and reference decoder, frame types
//! - `config`: recorder settings persisted as JSON
//! - `util`: little-endian writing, palettes, sample formats, file names

pub mod codec;
pub mod config;
pub mod error;
pub mod format;
pub mod session;
pub mod util;

pub use config::RecorderConfig;
pub use error::{Error, Result};
pub use session::{MediaSession, RecordingStatus};

/// retrorec version information
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Library-wide settings
#[derive(Debug, Clone, Default)]
pub struct Config {
    /// Enable verbose logging
    pub verbose: bool,
    /// Enable debug output
    pub debug: bool,
}

/// Initialize logging for the given configuration
pub fn init(config: Config) -> Result<()> {
    if config.verbose || config.debug {
        let level = if config.debug { "debug" } else { "info" };
        tracing_subscriber::fmt()
            .with_env_filter(level)
            .try_init()
            .map_err(|e| Error::Init(format!("Failed to initialize logging: {}", e)))?;
    }

    Ok(())
}
