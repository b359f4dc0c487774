//! Non-blocking logging shared by every crate in the voice workspace.
//!
//! Records are formatted and written on a dedicated thread so that callers on
//! latency-sensitive paths only pay for a channel send.

pub mod error;
mod log_level;
mod log_message;
mod log_writer;
mod logger;

pub use error::{LoggingError, Result};
pub use log_level::LogLevel;
pub use logger::Logger;
