//! Error types for the real-time audio pipeline.
//!
//! Only conditions a caller can act on are errors. Render underruns and
//! completing an empty utterance are handled in place and never surface here.

use std::io;
use thiserror::Error;

pub type Result<T> = std::result::Result<T, MediaError>;

/// Error type for media operations
#[derive(Debug, Error)]
pub enum MediaError {
    /// Input or output device could not be opened, or access was denied.
    /// Fatal to the capture/playback session; never retried automatically.
    #[error("Audio device unavailable: {0}")]
    DeviceUnavailable(String),

    /// A zero or unsupported field was passed to the container encoder.
    #[error("Invalid audio spec: {0}")]
    InvalidAudioSpec(String),

    /// Malformed PCM data (empty, odd byte count, channel mismatch).
    #[error("Invalid frame: {0}")]
    InvalidFrame(String),

    /// Out-of-range configuration value.
    #[error("Config error: {0}")]
    Config(String),

    #[error("I/O error: {0}")]
    Io(#[from] io::Error),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display_device() {
        let err = MediaError::DeviceUnavailable("No input device available".to_string());
        assert_eq!(
            err.to_string(),
            "Audio device unavailable: No input device available"
        );
    }

    #[test]
    fn test_error_display_spec() {
        let err = MediaError::InvalidAudioSpec("sample rate is zero".to_string());
        assert_eq!(err.to_string(), "Invalid audio spec: sample rate is zero");
    }

    #[test]
    fn test_error_from_io() {
        let io_err = std::io::Error::new(std::io::ErrorKind::NotFound, "file not found");
        let media_err: MediaError = io_err.into();

        assert!(matches!(media_err, MediaError::Io(_)));
    }

    #[test]
    fn test_error_is_error_trait() {
        let err = MediaError::Config("test".to_string());
        let _: &dyn std::error::Error = &err;
    }
}
