//! # Config Loader
//!
//! Locates configuration files on disk and deserializes JSON configuration.
//!
//! ```no_run
//! use config_loader::{find_config_file, load_json};
//!
//! #[derive(serde::Deserialize)]
//! struct AudioSection {
//!     sample_rate: u32,
//! }
//!
//! fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let path = find_config_file("voice_config.json")?;
//!     let audio: AudioSection = load_json(&path)?;
//!     println!("sample rate: {}", audio.sample_rate);
//!     Ok(())
//! }
//! ```

pub mod error;

pub use error::{ConfigError, Result};

use serde::de::DeserializeOwned;
use std::env;
use std::fs;
use std::path::{Path, PathBuf};

/// Environment variable that points at an explicit configuration file.
pub const CONFIG_PATH_ENV: &str = "CONFIG_PATH";

/// Reads a configuration file into a `String` without interpreting it.
pub fn load_config_file<P: AsRef<Path>>(path: P) -> Result<String> {
    let path = path.as_ref();

    if !path.exists() {
        return Err(ConfigError::FileNotFound(path.display().to_string()));
    }

    fs::read_to_string(path).map_err(|e| ConfigError::ReadError(e.to_string()))
}

/// Searches the usual locations for a configuration file.
///
/// Order:
/// 1. `CONFIG_PATH` environment variable (if it names an existing file)
/// 2. `./config/{filename}`
/// 3. `./{filename}`
pub fn find_config_file(filename: &str) -> Result<PathBuf> {
    if let Ok(path) = env::var(CONFIG_PATH_ENV) {
        let path_buf = PathBuf::from(&path);
        if path_buf.is_file() {
            return Ok(path_buf);
        }
    }

    let candidates = [
        PathBuf::from("./config").join(filename),
        PathBuf::from("./").join(filename),
    ];
    if let Some(found) = candidates.into_iter().find(|p| p.is_file()) {
        return Ok(found);
    }

    Err(ConfigError::FileNotFound(format!(
        "'{}' not found. Searched: ${} env var, ./config/{}, ./{}",
        filename, CONFIG_PATH_ENV, filename, filename
    )))
}

/// Parses a JSON document into `T`.
pub fn parse_json<T: DeserializeOwned>(content: &str) -> Result<T> {
    Ok(serde_json::from_str(content)?)
}

/// Reads and parses a JSON configuration file.
pub fn load_json<T: DeserializeOwned, P: AsRef<Path>>(path: P) -> Result<T> {
    let content = load_config_file(path)?;
    parse_json(&content)
}

/// Finds a configuration file by name and parses it as JSON.
pub fn find_and_load<T: DeserializeOwned>(filename: &str) -> Result<T> {
    let path = find_config_file(filename)?;
    load_json(path)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde::Deserialize;
    use std::io::Write;

    #[derive(Debug, Deserialize, PartialEq)]
    struct Sample {
        sample_rate: u32,
        #[serde(default)]
        channel_count: u16,
    }

    #[test]
    fn test_load_nonexistent_file() {
        let result = load_config_file("/path/that/does/not/exist.json");
        assert!(matches!(result, Err(ConfigError::FileNotFound(_))));
    }

    #[test]
    fn test_find_nonexistent_file() {
        let result = find_config_file("file_that_definitely_does_not_exist_12345.json");
        assert!(result.is_err());
    }

    #[test]
    fn test_load_json_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, r#"{{ "sample_rate": 24000, "channel_count": 1 }}"#).unwrap();

        let sample: Sample = load_json(file.path()).unwrap();
        assert_eq!(
            sample,
            Sample {
                sample_rate: 24000,
                channel_count: 1
            }
        );
    }

    #[test]
    fn test_parse_json_reports_errors() {
        let result: Result<Sample> = parse_json("{ \"sample_rate\": \"fast\" }");
        assert!(matches!(result, Err(ConfigError::Parse(_))));
    }
}
