use crate::error::Result;
use logging::{LogLevel, Logger};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Logging configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    pub log_file_path: String,
    pub log_level: String,
    pub enable_console: bool,
    pub enable_file: bool,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        LoggingConfig {
            log_file_path: "voice.log".to_string(),
            log_level: "info".to_string(),
            enable_console: true,
            enable_file: true,
        }
    }
}

impl LoggingConfig {
    /// Parsed `log_level`.
    pub fn level(&self) -> Result<LogLevel> {
        Ok(self.log_level.parse()?)
    }

    /// Builds the root logger for `component`.
    ///
    /// File output wins when enabled; otherwise a console-only or a
    /// discarding logger is returned.
    pub fn build_logger(&self, component: &str) -> Result<Logger> {
        let level = self.level()?;
        if self.enable_file {
            let logger = Logger::with_component(
                PathBuf::from(&self.log_file_path),
                level,
                component.to_string(),
                self.enable_console,
            )?;
            return Ok(logger);
        }
        if self.enable_console {
            return Ok(Logger::console(level).for_component(component));
        }
        Ok(Logger::disabled())
    }
}
