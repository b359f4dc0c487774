//! Error type for the voice session layer.

use config_loader::ConfigError;
use logging::LoggingError;
use media::MediaError;
use thiserror::Error;

pub type Result<T> = std::result::Result<T, VoiceError>;

#[derive(Debug, Error)]
pub enum VoiceError {
    #[error("Media error: {0}")]
    Media(#[from] MediaError),

    #[error("Config error: {0}")]
    Config(#[from] ConfigError),

    #[error("Logging error: {0}")]
    Logging(#[from] LoggingError),

    #[error("Invalid JSON: {0}")]
    Json(#[from] serde_json::Error),

    /// Raised by a session client when the remote endpoint is unreachable.
    #[error("Transport error: {0}")]
    Transport(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Thread error: {0}")]
    Thread(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_media_error_is_wrapped() {
        let err: VoiceError = MediaError::DeviceUnavailable("no mic".into()).into();
        assert_eq!(
            err.to_string(),
            "Media error: Audio device unavailable: no mic"
        );
    }

    #[test]
    fn test_transport_display() {
        let err = VoiceError::Transport("socket closed".into());
        assert_eq!(err.to_string(), "Transport error: socket closed");
    }

    #[test]
    fn test_json_error_is_wrapped() {
        let json_err = serde_json::from_str::<u32>("nope").unwrap_err();
        let err: VoiceError = json_err.into();
        assert!(matches!(err, VoiceError::Json(_)));
    }
}
