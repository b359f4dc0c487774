//! Log file writer running on its own thread.

use crate::error::Result;
use crate::log_message::LogMessage;
use std::fs::{File, OpenOptions};
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};
use std::sync::mpsc::Receiver;

pub(crate) struct LogWriter {
    file: BufWriter<File>,
}

impl LogWriter {
    /// Opens (or creates) the file in append mode.
    pub fn new(log_path: &Path) -> Result<Self> {
        let file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(log_path)?;
        Ok(Self {
            file: BufWriter::new(file),
        })
    }

    fn write_message(&mut self, message: &LogMessage) {
        if let Err(e) = self.file.write_all(message.format().as_bytes()) {
            eprintln!("Error writing log: {}", e);
        }
    }

    fn flush(&mut self) {
        if let Err(e) = self.file.flush() {
            eprintln!("Error flushing log: {}", e);
        }
    }

    /// Writes records until every sender is gone.
    ///
    /// Records that are already queued are written as one batch and flushed once.
    pub fn run(mut self, receiver: Receiver<LogMessage>) {
        while let Ok(first) = receiver.recv() {
            self.write_message(&first);
            for message in receiver.try_iter() {
                self.write_message(&message);
            }
            self.flush();
        }
    }
}

/// Spawns a dedicated log writer thread.
pub(crate) fn spawn_writer_thread(log_path: PathBuf, receiver: Receiver<LogMessage>) -> Result<()> {
    let writer = LogWriter::new(&log_path)?;
    std::thread::Builder::new()
        .name("log-writer".to_string())
        .spawn(move || writer.run(receiver))?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::log_level::LogLevel;
    use std::fs;
    use std::sync::mpsc::channel;
    use tempfile::tempdir;

    #[test]
    fn test_log_writer_creation() {
        let dir = tempdir().unwrap();
        let log_path = dir.path().join("test.log");

        assert!(LogWriter::new(&log_path).is_ok());
        assert!(log_path.exists());
    }

    #[test]
    fn test_run_drains_and_flushes() {
        let dir = tempdir().unwrap();
        let log_path = dir.path().join("test.log");
        let (sender, receiver) = channel();

        for i in 0..3 {
            sender
                .send(LogMessage::new(LogLevel::Info, format!("batch {}", i)))
                .unwrap();
        }
        drop(sender);

        // Returns once the channel is closed and drained.
        LogWriter::new(&log_path).unwrap().run(receiver);

        let content = fs::read_to_string(log_path).unwrap();
        assert_eq!(content.lines().count(), 3);
        assert!(content.contains("batch 2"));
    }
}
