//! Voice session layer
//!
//! Wires the `media` pipeline to a session client: microphone frames go out
//! through `SessionClient::send_audio`, response audio comes back as
//! `TurnEvent`s, and completed utterances land in an `AssetSink`.

pub mod assets;
pub mod client;
pub mod config;
pub mod error;
pub mod session;

pub use assets::{AssetSink, DiscardSink, MemorySink, WavFileSink};
pub use client::{LoopbackClient, SessionClient, new_utterance_id};
pub use config::{AssetConfig, AudioSettings, LoggingConfig, VoiceConfig};
pub use error::{Result, VoiceError};
pub use session::VoiceSession;
