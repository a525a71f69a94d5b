//! Error types for retrorec

use crate::util::MediaType;
use thiserror::Error;

/// Result type alias for retrorec operations
pub type Result<T> = std::result::Result<T, Error>;

/// Main error type for retrorec
#[derive(Error, Debug)]
pub enum Error {
    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// The output accepted fewer bytes than requested
    #[error("Short write: {expected} bytes requested")]
    ShortWrite { expected: usize },

    /// A second frame of the same kind arrived before its partner
    #[error("Frame order violation: {pending} frame already pending, waiting for its partner")]
    FrameOrder { pending: MediaType },

    /// Buffer too small
    #[error("Buffer too small: need {need}, have {have}")]
    BufferTooSmall { need: usize, have: usize },

    /// Recording stopped because the file would exceed its size ceiling
    #[error("Size limit of {limit} bytes reached after {frames} frames")]
    SizeLimit { limit: u64, frames: u32 },

    /// Format error
    #[error("Format error: {0}")]
    Format(String),

    /// Codec error
    #[error("Codec error: {0}")]
    Codec(String),

    /// Invalid input
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// Invalid state
    #[error("Invalid state: {0}")]
    InvalidState(String),

    /// Unsupported feature
    #[error("Unsupported: {0}")]
    Unsupported(String),

    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),

    /// Initialization error
    #[error("Initialization error: {0}")]
    Init(String),
}

impl Error {
    /// Create a format error
    pub fn format<S: Into<String>>(msg: S) -> Self {
        Error::Format(msg.into())
    }

    /// Create a codec error
    pub fn codec<S: Into<String>>(msg: S) -> Self {
        Error::Codec(msg.into())
    }

    /// Create an invalid input error
    pub fn invalid_input<S: Into<String>>(msg: S) -> Self {
        Error::InvalidInput(msg.into())
    }

    /// Create an invalid state error
    pub fn invalid_state<S: Into<String>>(msg: S) -> Self {
        Error::InvalidState(msg.into())
    }

    /// Create an unsupported error
    pub fn unsupported<S: Into<String>>(msg: S) -> Self {
        Error::Unsupported(msg.into())
    }

    /// Create a configuration error
    pub fn config<S: Into<String>>(msg: S) -> Self {
        Error::Config(msg.into())
    }

    /// True for the deliberate size-ceiling stop, as opposed to a failure
    pub fn is_size_limit(&self) -> bool {
        matches!(self, Error::SizeLimit { .. })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_size_limit_is_distinguishable() {
        let stop = Error::SizeLimit {
            limit: 1024,
            frames: 3,
        };
        assert!(stop.is_size_limit());

        let io = Error::from(std::io::Error::new(std::io::ErrorKind::Other, "disk full"));
        assert!(!io.is_size_limit());
    }

    #[test]
    fn test_error_display() {
        let err = Error::FrameOrder {
            pending: MediaType::Video,
        };
        assert!(err.to_string().contains("video"));

        let err = Error::BufferTooSmall { need: 10, have: 4 };
        assert_eq!(err.to_string(), "Buffer too small: need 10, have 4");
    }
}
