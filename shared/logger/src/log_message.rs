//! Internal log record.

use crate::log_level::LogLevel;
use chrono::{DateTime, Local};

/// A log record captured on the caller's thread.
///
/// Only the timestamp is taken eagerly; formatting happens on the writer thread.
#[derive(Debug, Clone)]
pub(crate) struct LogMessage {
    pub timestamp: DateTime<Local>,
    pub level: LogLevel,
    pub component: Option<String>,
    pub message: String,
}

impl LogMessage {
    pub fn new(level: LogLevel, message: String) -> Self {
        Self {
            timestamp: Local::now(),
            level,
            component: None,
            message,
        }
    }

    pub fn new_with_component(level: LogLevel, component: String, message: String) -> Self {
        Self {
            component: Some(component),
            ..Self::new(level, message)
        }
    }

    /// Formats the record as `[timestamp] LEVEL [component: X]: message\n`.
    pub fn format(&self) -> String {
        let timestamp = self.timestamp.format("%Y-%m-%d %H:%M:%S%.3f");
        match self.component {
            Some(ref component) => format!(
                "[{}] {} [component: {}]: {}\n",
                timestamp, self.level, component, self.message
            ),
            None => format!("[{}] {}: {}\n", timestamp, self.level, self.message),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_without_component() {
        let msg = LogMessage::new(LogLevel::Error, "Output device lost".to_string());
        let formatted = msg.format();

        assert!(formatted.contains("] ERROR: Output device lost"));
        assert!(formatted.ends_with('\n'));
    }

    #[test]
    fn test_format_with_component() {
        let msg = LogMessage::new_with_component(
            LogLevel::Info,
            "Turn".to_string(),
            "utterance started".to_string(),
        );

        assert!(
            msg.format()
                .contains("INFO [component: Turn]: utterance started")
        );
    }

    #[test]
    fn test_timestamp_format() {
        let msg = LogMessage::new(LogLevel::Info, "Test".to_string());
        let formatted = msg.format();
        let ts = &formatted[1..formatted.find(']').unwrap()];

        // YYYY-MM-DD HH:MM:SS.mmm
        assert_eq!(ts.len(), 23);
        assert_eq!(&ts[4..5], "-");
        assert_eq!(&ts[19..20], ".");
    }
}
