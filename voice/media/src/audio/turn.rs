//! Utterance turn tracking for inbound response audio.
//!
//! ```text
//! NoActiveUtterance --Audio(X)--> Streaming(X) --complete(X)--> Completed(X) --> NoActiveUtterance
//!                                  |   ^
//!                        Audio(Y)  |   |  reset playback + accumulator
//!                                  +---+
//! Interrupt / Disconnect: reset playback + accumulator --> NoActiveUtterance
//! ```

use super::config::AudioConfig;
use super::frame::AudioFrame;
use super::playback::PlaybackBuffer;
use super::utterance::{UtteranceAsset, UtteranceBuffer};
use super::wav::WavSpec;
use crate::common::constants::logging::PLAYBACK_LOG_INTERVAL;
use crate::error::Result;
use logging::Logger;
use std::fmt;
use std::time::Duration;

/// Inbound event from the session client.
#[derive(Debug, Clone, PartialEq)]
pub enum TurnEvent {
    /// Little-endian PCM for `utterance_id`; `is_complete` marks its last chunk.
    Audio {
        pcm: Vec<u8>,
        utterance_id: String,
        is_complete: bool,
    },
    /// The user started talking over the response.
    Interrupt,
    /// The transport went away.
    Disconnect,
}

impl TurnEvent {
    pub fn audio(pcm: Vec<u8>, utterance_id: impl Into<String>) -> Self {
        TurnEvent::Audio {
            pcm,
            utterance_id: utterance_id.into(),
            is_complete: false,
        }
    }

    pub fn complete(pcm: Vec<u8>, utterance_id: impl Into<String>) -> Self {
        TurnEvent::Audio {
            pcm,
            utterance_id: utterance_id.into(),
            is_complete: true,
        }
    }
}

/// What handling an event did.
#[derive(Debug, Clone, PartialEq)]
pub enum TurnOutcome {
    /// Nothing to do
    Idle,
    /// Samples queued for the active utterance
    Accepted,
    /// A new utterance replaced `previous`, whose audio was flushed
    Switched { previous: String },
    /// Playback was cut; `played` is how much had been heard
    Interrupted {
        utterance_id: Option<String>,
        played: Duration,
    },
    Completed(UtteranceAsset),
    /// Everything flushed after a disconnect
    Reset,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TurnState {
    NoActiveUtterance,
    Streaming(String),
    Completed(String),
}

impl TurnState {
    pub fn utterance_id(&self) -> Option<&str> {
        match self {
            TurnState::NoActiveUtterance => None,
            TurnState::Streaming(id) | TurnState::Completed(id) => Some(id),
        }
    }
}

impl fmt::Display for TurnState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TurnState::NoActiveUtterance => write!(f, "idle"),
            TurnState::Streaming(id) => write!(f, "streaming {}", id),
            TurnState::Completed(id) => write!(f, "completed {}", id),
        }
    }
}

/// Where an utterance begins in the playback buffer's current reset window.
#[derive(Debug, Clone)]
struct Segment {
    utterance_id: String,
    start: u64,
}

/// Drives the playback buffer and utterance accumulator from inbound events.
pub struct TurnController {
    playback: PlaybackBuffer,
    accumulated: UtteranceBuffer,
    state: TurnState,
    spec: WavSpec,
    channels: u16,
    sample_rate: u32,
    /// Utterances queued since the last playback reset, oldest first
    segments: Vec<Segment>,
    chunks_received: u64,
    logger: Logger,
}

impl TurnController {
    pub fn new(config: &AudioConfig, playback: PlaybackBuffer, logger: Logger) -> Self {
        Self {
            playback,
            accumulated: UtteranceBuffer::new(),
            state: TurnState::NoActiveUtterance,
            spec: WavSpec::pcm16(config.sample_rate, config.channel_count),
            channels: config.channel_count,
            sample_rate: config.sample_rate,
            segments: Vec::new(),
            chunks_received: 0,
            logger,
        }
    }

    /// Applies one inbound event.
    ///
    /// # Errors
    /// `InvalidFrame` for malformed PCM (the state is left untouched), or
    /// `InvalidAudioSpec` if the completed utterance cannot be encoded.
    pub fn handle(&mut self, event: TurnEvent) -> Result<TurnOutcome> {
        match event {
            TurnEvent::Audio {
                pcm,
                utterance_id,
                is_complete,
            } => self.on_audio(&pcm, utterance_id, is_complete),
            TurnEvent::Interrupt => Ok(self.interrupt()),
            TurnEvent::Disconnect => Ok(self.disconnect()),
        }
    }

    /// Stops playback immediately and reports how much of the utterance was heard.
    ///
    /// The reported utterance is the one the speaker is on, which may be an
    /// earlier completed utterance still draining ahead of the streaming one.
    pub fn interrupt(&mut self) -> TurnOutcome {
        let heard = self.now_playing();
        self.playback.reset();
        self.accumulated.clear();
        self.segments.clear();
        self.state = TurnState::NoActiveUtterance;

        let (utterance_id, played) = match heard {
            Some((id, played)) => (Some(id), played),
            None => (None, Duration::ZERO),
        };
        match &utterance_id {
            Some(id) => self.logger.info(&format!(
                "Interrupted {} after {:.3}s of playback",
                id,
                played.as_secs_f64()
            )),
            None => self.logger.debug("Interrupt with no active utterance"),
        }
        TurnOutcome::Interrupted {
            utterance_id,
            played,
        }
    }

    /// Flushes everything after the transport went away.
    pub fn disconnect(&mut self) -> TurnOutcome {
        self.playback.stop();
        self.accumulated.clear();
        self.segments.clear();
        if self.state != TurnState::NoActiveUtterance {
            self.logger
                .warn(&format!("Disconnected while {}, buffers flushed", self.state));
        }
        self.state = TurnState::NoActiveUtterance;
        TurnOutcome::Reset
    }

    /// Utterance the speaker is currently on and how much of it has rendered.
    ///
    /// `None` once everything queued has been played and nothing is streaming.
    pub fn now_playing(&self) -> Option<(String, Duration)> {
        let rendered = self.playback.rendered();
        let drained = rendered >= self.playback.len() as u64;
        if drained && self.state == TurnState::NoActiveUtterance {
            return None;
        }

        match self.segments.iter().rev().find(|s| s.start <= rendered) {
            Some(segment) => Some((
                segment.utterance_id.clone(),
                self.playback.duration_of(rendered - segment.start),
            )),
            None => self
                .state
                .utterance_id()
                .map(|id| (id.to_string(), Duration::ZERO)),
        }
    }

    pub fn state(&self) -> &TurnState {
        &self.state
    }

    pub fn playback(&self) -> &PlaybackBuffer {
        &self.playback
    }

    /// Samples accumulated for the active utterance
    pub fn accumulated_len(&self) -> usize {
        self.accumulated.len()
    }

    fn on_audio(&mut self, pcm: &[u8], utterance_id: String, is_complete: bool) -> Result<TurnOutcome> {
        let frame = if pcm.is_empty() {
            None
        } else {
            Some(AudioFrame::from_le_bytes(pcm, self.channels, self.sample_rate)?)
        };

        let mut outcome = TurnOutcome::Idle;
        if let Some(frame) = frame {
            outcome = self.begin_or_switch(&utterance_id);
            self.accumulated.append(frame.samples());
            self.playback.append_frame(frame);

            self.chunks_received += 1;
            if self.chunks_received % PLAYBACK_LOG_INTERVAL == 0 {
                self.logger.debug(&format!(
                    "Received {} response chunks, {} samples pending playback",
                    self.chunks_received,
                    self.playback.pending()
                ));
            }
        }

        if is_complete {
            if let TurnState::Streaming(active) = &self.state {
                if *active == utterance_id {
                    if let TurnOutcome::Switched { previous } = &outcome {
                        self.logger
                            .debug(&format!("{} replaced {} and completed at once", utterance_id, previous));
                    }
                    return self.complete(utterance_id);
                }
            }
            self.logger.debug(&format!(
                "Ignoring completion of {} while {}",
                utterance_id, self.state
            ));
        }

        Ok(outcome)
    }

    fn begin_or_switch(&mut self, utterance_id: &str) -> TurnOutcome {
        let previous = match &self.state {
            TurnState::Streaming(active) if active == utterance_id => return TurnOutcome::Accepted,
            TurnState::Streaming(active) => Some(active.clone()),
            TurnState::NoActiveUtterance | TurnState::Completed(_) => None,
        };
        self.state = TurnState::Streaming(utterance_id.to_string());

        let outcome = match previous {
            Some(previous) => {
                self.logger
                    .info(&format!("Turn switch: {} -> {}", previous, utterance_id));
                self.playback.reset();
                self.accumulated.clear();
                self.segments.clear();
                TurnOutcome::Switched { previous }
            }
            None => {
                self.logger.info(&format!("Utterance {} started", utterance_id));
                TurnOutcome::Accepted
            }
        };
        self.push_segment(utterance_id);
        outcome
    }

    /// Records that `utterance_id` starts after everything already queued.
    fn push_segment(&mut self, utterance_id: &str) {
        let rendered = self.playback.rendered();
        // Segments before the one being rendered can no longer be reported.
        if let Some(current) = self.segments.iter().rposition(|s| s.start <= rendered) {
            self.segments.drain(..current);
        }
        self.segments.push(Segment {
            utterance_id: utterance_id.to_string(),
            start: self.playback.len() as u64,
        });
    }

    fn complete(&mut self, utterance_id: String) -> Result<TurnOutcome> {
        self.state = TurnState::Completed(utterance_id.clone());
        let samples = self.accumulated.take();
        if samples.is_empty() {
            self.state = TurnState::NoActiveUtterance;
            return Ok(TurnOutcome::Idle);
        }

        let asset = UtteranceAsset::encode(utterance_id.clone(), &self.spec, &samples);
        self.state = TurnState::NoActiveUtterance;
        let asset = asset?;
        self.logger.info(&format!(
            "Utterance {} complete: {:.2}s, {} bytes",
            utterance_id,
            asset.duration.as_secs_f64(),
            asset.container.len()
        ));
        Ok(TurnOutcome::Completed(asset))
    }
}
