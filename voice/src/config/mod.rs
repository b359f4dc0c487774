//! Session configuration

pub mod asset_config;
pub mod audio_settings;
pub mod logging_config;
pub mod voice_config;

pub use asset_config::AssetConfig;
pub use audio_settings::AudioSettings;
pub use logging_config::LoggingConfig;
pub use voice_config::VoiceConfig;
