//! Session client seam.
//!
//! The remote conversational endpoint is reached through a `SessionClient`.
//! Captured audio goes out through `send_audio`; response audio and control
//! signals come back as `TurnEvent`s on the sender handed to `attach`.

use crate::error::Result;
use chrono::Local;
use logging::Logger;
use media::{CaptureChunk, TurnEvent};
use std::sync::mpsc::Sender;
use std::time::Duration;

pub trait SessionClient: Send + 'static {
    /// Receives the channel on which inbound events must be delivered.
    /// Called once, before any audio is sent.
    fn attach(&mut self, _inbound: Sender<TurnEvent>) {}

    /// Delivers one captured chunk. An error is treated as a disconnect.
    fn send_audio(&mut self, chunk: CaptureChunk) -> Result<()>;

    /// Tells the endpoint how much of `utterance_id` the listener heard
    /// before playback was cut.
    fn truncate(&mut self, utterance_id: &str, played: Duration);
}

/// Generates utterance ids of the form `utt_<timestamp>_<random hex>`.
pub fn new_utterance_id() -> String {
    format!(
        "utt_{}_{:08x}",
        Local::now().format("%Y%m%d%H%M%S"),
        rand::random::<u32>()
    )
}

/// Echoes captured audio back as response utterances of a fixed length.
///
/// Stands in for a remote endpoint when running the pipeline locally.
pub struct LoopbackClient {
    inbound: Option<Sender<TurnEvent>>,
    utterance_bytes: usize,
    current: Option<(String, usize)>,
    truncations: Vec<(String, Duration)>,
    logger: Logger,
}

impl LoopbackClient {
    /// `utterance_samples` captured samples make up one echoed utterance.
    pub fn new(utterance_samples: usize, logger: &Logger) -> Self {
        Self {
            inbound: None,
            utterance_bytes: utterance_samples.max(1) * 2,
            current: None,
            truncations: Vec::new(),
            logger: logger.for_component("Loopback"),
        }
    }

    /// Truncation notices received so far
    pub fn truncations(&self) -> &[(String, Duration)] {
        &self.truncations
    }

    fn deliver(&self, event: TurnEvent) -> Result<()> {
        let Some(inbound) = &self.inbound else {
            return Err(crate::error::VoiceError::Transport(
                "loopback client is not attached".into(),
            ));
        };
        inbound
            .send(event)
            .map_err(|_| crate::error::VoiceError::Transport("session has shut down".into()))
    }

    fn finish_current(&mut self) -> Result<()> {
        if let Some((id, _)) = self.current.take() {
            self.logger.debug(&format!("Echo {} complete", id));
            self.deliver(TurnEvent::complete(Vec::new(), id))?;
        }
        Ok(())
    }
}

impl SessionClient for LoopbackClient {
    fn attach(&mut self, inbound: Sender<TurnEvent>) {
        self.inbound = Some(inbound);
    }

    fn send_audio(&mut self, chunk: CaptureChunk) -> Result<()> {
        if chunk.is_final {
            return self.finish_current();
        }
        if chunk.pcm.is_empty() {
            return Ok(());
        }

        let (id, sent) = self
            .current
            .get_or_insert_with(|| (new_utterance_id(), 0));
        *sent += chunk.pcm.len();
        let id = id.clone();
        let full = *sent >= self.utterance_bytes;

        self.deliver(TurnEvent::audio(chunk.pcm, id))?;
        if full {
            self.finish_current()?;
        }
        Ok(())
    }

    fn truncate(&mut self, utterance_id: &str, played: Duration) {
        self.logger.info(&format!(
            "Truncate {} at {:.3}s",
            utterance_id,
            played.as_secs_f64()
        ));
        if self
            .current
            .as_ref()
            .is_some_and(|(id, _)| id == utterance_id)
        {
            self.current = None;
        }
        self.truncations.push((utterance_id.to_string(), played));
    }
}
