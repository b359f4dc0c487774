//! Thread-safe asynchronous logger implementation.
//!
//! This module provides the main [`Logger`] interface for logging messages
//! to a file and/or the console without blocking the caller.

use crate::error::Result;
use crate::log_level::LogLevel;
use crate::log_message::LogMessage;
use crate::log_writer::spawn_writer_thread;
use std::path::{Path, PathBuf};
use std::sync::mpsc::{Sender, channel};

/// Thread-safe, non-blocking logger.
///
/// Cloneable instances share the same channel to a dedicated writer thread.
/// Child loggers created with [`Logger::for_component`] reuse that channel,
/// so every component of a session ends up in the same file.
///
/// # Examples
///
/// ```
/// use logging::{Logger, LogLevel};
///
/// let dir = std::env::temp_dir().join("logging-doctest.log");
/// let logger = Logger::new(dir, LogLevel::Info).unwrap();
/// logger.info("Session started");
/// logger.error("Output device lost");
/// ```
#[derive(Clone)]
pub struct Logger {
    sender: Option<Sender<LogMessage>>,
    level: LogLevel,
    component: Option<String>,
    log_path: Option<PathBuf>,
    console_output: bool,
}

impl Logger {
    /// Creates a new file logger with dedicated writer thread.
    ///
    /// # Errors
    ///
    /// Returns error if the log file cannot be created or opened.
    pub fn new(log_path: PathBuf, level: LogLevel) -> Result<Self> {
        let (sender, receiver) = channel();
        spawn_writer_thread(log_path.clone(), receiver)?;
        Ok(Logger {
            sender: Some(sender),
            level,
            component: None,
            log_path: Some(log_path),
            console_output: false,
        })
    }

    /// Creates a new file logger tagged with a component/layer name.
    ///
    /// # Arguments
    ///
    /// * `log_path` - Path to log file (created if it doesn't exist)
    /// * `level` - Minimum log level to record
    /// * `component` - Component or layer name (e.g., "Capture", "Playback", "Turn")
    /// * `console_output` - Mirror every record to stdout
    ///
    /// # Errors
    ///
    /// Returns error if the log file cannot be created or opened.
    pub fn with_component(
        log_path: PathBuf,
        level: LogLevel,
        component: String,
        console_output: bool,
    ) -> Result<Self> {
        let mut logger = Self::new(log_path, level)?;
        logger.component = Some(component);
        logger.console_output = console_output;
        Ok(logger)
    }

    /// Creates a console-only logger. Nothing is written to disk.
    pub fn console(level: LogLevel) -> Self {
        Logger {
            sender: None,
            level,
            component: None,
            log_path: None,
            console_output: true,
        }
    }

    /// Creates a logger that discards every message.
    pub fn disabled() -> Self {
        Logger {
            sender: None,
            level: LogLevel::Error,
            component: None,
            log_path: None,
            console_output: false,
        }
    }

    /// Returns a logger for another component sharing this logger's writer.
    ///
    /// # Examples
    ///
    /// ```
    /// use logging::{Logger, LogLevel};
    ///
    /// let main_logger = Logger::console(LogLevel::Info);
    /// let capture_logger = main_logger.for_component("Capture");
    /// capture_logger.info("Microphone opened");
    /// ```
    pub fn for_component(&self, component: &str) -> Self {
        Logger {
            sender: self.sender.clone(),
            level: self.level,
            component: Some(component.to_string()),
            log_path: self.log_path.clone(),
            console_output: self.console_output,
        }
    }

    /// Minimum level this logger records.
    pub fn level(&self) -> LogLevel {
        self.level
    }

    /// Path of the backing log file, if any.
    pub fn log_path(&self) -> Option<&Path> {
        self.log_path.as_deref()
    }

    /// Logs a debug message (only if level is Debug or lower).
    pub fn debug(&self, message: &str) {
        self.log(LogLevel::Debug, message);
    }

    /// Logs an info message (only if level is Info or lower).
    pub fn info(&self, message: &str) {
        self.log(LogLevel::Info, message);
    }

    /// Logs a warning message (only if level is Warn or lower).
    pub fn warn(&self, message: &str) {
        self.log(LogLevel::Warn, message);
    }

    /// Logs an error message.
    pub fn error(&self, message: &str) {
        self.log(LogLevel::Error, message);
    }

    /// Filters by level and hands the message to the console and writer thread.
    fn log(&self, level: LogLevel, message: &str) {
        if level < self.level || (self.sender.is_none() && !self.console_output) {
            return;
        }

        let msg = match self.component {
            Some(ref component) => {
                LogMessage::new_with_component(level, component.clone(), message.to_string())
            }
            None => LogMessage::new(level, message.to_string()),
        };

        if self.console_output {
            print!("{}", msg.format());
        }

        if let Some(ref sender) = self.sender {
            // The writer thread only goes away at process exit.
            let _ = sender.send(msg);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use std::thread;
    use std::time::Duration;
    use tempfile::tempdir;

    fn wait_for_write() {
        thread::sleep(Duration::from_millis(50));
    }

    #[test]
    fn test_logger_creates_file() {
        let dir = tempdir().unwrap();
        let log_path = dir.path().join("test.log");

        let logger = Logger::new(log_path.clone(), LogLevel::Debug).unwrap();
        logger.info("Test message");
        wait_for_write();

        assert!(log_path.exists());
        let content = fs::read_to_string(log_path).unwrap();
        assert!(content.contains("Test message"));
    }

    #[test]
    fn test_logger_respects_level() {
        let dir = tempdir().unwrap();
        let log_path = dir.path().join("test.log");

        let logger = Logger::new(log_path.clone(), LogLevel::Warn).unwrap();
        logger.debug("Debug message");
        logger.info("Info message");
        logger.warn("Warn message");
        wait_for_write();

        let content = fs::read_to_string(log_path).unwrap();
        assert!(!content.contains("Debug message"));
        assert!(!content.contains("Info message"));
        assert!(content.contains("Warn message"));
    }

    #[test]
    fn test_component_loggers_share_file() {
        let dir = tempdir().unwrap();
        let log_path = dir.path().join("test.log");

        let logger = Logger::new(log_path.clone(), LogLevel::Info).unwrap();
        let capture = logger.for_component("Capture");
        let playback = logger.for_component("Playback");

        capture.info("mic open");
        playback.info("speaker open");
        wait_for_write();

        let content = fs::read_to_string(&log_path).unwrap();
        assert!(content.contains("[component: Capture]: mic open"));
        assert!(content.contains("[component: Playback]: speaker open"));
        assert_eq!(capture.log_path(), Some(log_path.as_path()));
    }

    #[test]
    fn test_logger_clone_across_threads() {
        let dir = tempdir().unwrap();
        let log_path = dir.path().join("test.log");

        let logger = Logger::new(log_path.clone(), LogLevel::Info).unwrap();
        let logger_clone = logger.clone();

        thread::spawn(move || {
            logger_clone.info("Message from thread");
        })
        .join()
        .unwrap();

        logger.info("Message from main");
        wait_for_write();

        let content = fs::read_to_string(log_path).unwrap();
        assert!(content.contains("Message from thread"));
        assert!(content.contains("Message from main"));
    }

    #[test]
    fn test_console_and_disabled_have_no_file() {
        let console = Logger::console(LogLevel::Debug);
        assert!(console.log_path().is_none());
        assert_eq!(console.level(), LogLevel::Debug);

        let disabled = Logger::disabled();
        assert!(disabled.log_path().is_none());
        disabled.error("dropped");
    }
}
