use crate::config::{AssetConfig, AudioSettings, LoggingConfig};
use crate::error::Result;
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Name looked up by `config_loader::find_config_file`
pub const CONFIG_FILE_NAME: &str = "voice_config.json";

/// Voice session configuration
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct VoiceConfig {
    pub audio: AudioSettings,
    pub logging: LoggingConfig,
    pub assets: AssetConfig,
}

impl VoiceConfig {
    /// Parses an inline JSON document. Missing fields take their defaults.
    pub fn from_json(json: &str) -> Result<Self> {
        Ok(config_loader::parse_json(json)?)
    }

    /// Load configuration from a JSON file
    pub fn load_from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        Ok(config_loader::load_json(path)?)
    }

    /// Searches `CONFIG_PATH`, `./config/` and `./` for `voice_config.json`.
    pub fn find() -> Result<Self> {
        Ok(config_loader::find_and_load(CONFIG_FILE_NAME)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_partial_json_keeps_defaults() {
        let config = VoiceConfig::from_json(r#"{ "audio": { "sample_rate": 16000 } }"#).unwrap();
        assert_eq!(config.audio.sample_rate, 16000);
        assert_eq!(config.audio.channel_count, 1);
        assert_eq!(config.audio.render_period_frames, 8192);
        assert_eq!(config.logging, LoggingConfig::default());
        assert_eq!(config.assets.output_dir, "recordings");
    }

    #[test]
    fn test_empty_object_is_default() {
        assert_eq!(VoiceConfig::from_json("{}").unwrap(), VoiceConfig::default());
    }

    #[test]
    fn test_invalid_json_is_an_error() {
        assert!(VoiceConfig::from_json("{ audio: ").is_err());
    }

    #[test]
    fn test_load_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(
            file,
            r#"{{ "assets": {{ "output_dir": "/tmp/utterances", "enabled": false }} }}"#
        )
        .unwrap();

        let config = VoiceConfig::load_from_file(file.path()).unwrap();
        assert_eq!(config.assets.output_dir, "/tmp/utterances");
        assert!(!config.assets.enabled);
    }

    #[test]
    fn test_missing_file_is_an_error() {
        assert!(VoiceConfig::load_from_file("/no/such/voice_config.json").is_err());
    }
}
