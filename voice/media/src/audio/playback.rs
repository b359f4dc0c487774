//! Interruptible playback buffer.
//!
//! `PlaybackBuffer` is the producer handle used by the transport side and
//! the turn controller. `PlaybackRenderer` is the single consumer owned by
//! the output device callback. They share nothing but atomics and a channel:
//!
//! - appended samples travel over an mpsc channel, tagged with a generation
//! - `reset()` bumps the generation in one atomic step; the renderer notices
//!   at the top of its next tick and drops whatever it holds
//! - the rendered sample count lives in the same `AtomicU64` as the
//!   generation, so `elapsed()` never mixes counts from two utterances
//!
//! The render path never takes a lock and never blocks.

use super::config::AudioConfig;
use super::convert;
use super::frame::{AudioFrame, AudioSample};
use super::traits::{ActiveStream, AudioOutput};
use crate::common::constants::memory::RETAINED_CAPACITY;
use crate::error::Result;
use logging::Logger;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::mpsc::{Receiver, Sender, TryRecvError, channel};
use std::sync::{Arc, Mutex};
use std::time::Duration;

const COUNT_BITS: u32 = 48;
const COUNT_MASK: u64 = (1 << COUNT_BITS) - 1;

fn pack(generation: u16, count: u64) -> u64 {
    ((generation as u64) << COUNT_BITS) | (count & COUNT_MASK)
}

fn generation_of(state: u64) -> u16 {
    (state >> COUNT_BITS) as u16
}

fn count_of(state: u64) -> u64 {
    state & COUNT_MASK
}

struct Chunk {
    generation: u16,
    samples: Vec<AudioSample>,
}

struct PlaybackShared {
    /// generation | samples rendered in that generation
    rendered: AtomicU64,
    /// generation | samples appended in that generation
    appended: AtomicU64,
    playing: AtomicBool,
    paused: AtomicBool,
    pending_start: AtomicBool,
    device_error: Mutex<Option<String>>,
    sample_rate: u32,
    channels: u16,
}

impl PlaybackShared {
    fn generation(&self) -> u16 {
        generation_of(self.rendered.load(Ordering::Acquire))
    }

    fn samples_to_duration(&self, samples: u64) -> Duration {
        let per_sec = self.sample_rate as f64 * self.channels as f64;
        Duration::from_secs_f64(samples as f64 / per_sec)
    }
}

/// Producer side of the playback pipeline. Cheap to clone.
#[derive(Clone)]
pub struct PlaybackBuffer {
    shared: Arc<PlaybackShared>,
    chunks: Sender<Chunk>,
    logger: Logger,
}

impl PlaybackBuffer {
    /// Creates a connected buffer/renderer pair for the given stream format.
    pub fn new(config: &AudioConfig, logger: Logger) -> (PlaybackBuffer, PlaybackRenderer) {
        let (tx, rx) = channel();
        let shared = Arc::new(PlaybackShared {
            rendered: AtomicU64::new(pack(0, 0)),
            appended: AtomicU64::new(pack(0, 0)),
            playing: AtomicBool::new(false),
            paused: AtomicBool::new(false),
            pending_start: AtomicBool::new(false),
            device_error: Mutex::new(None),
            sample_rate: config.sample_rate,
            channels: config.channel_count,
        });

        let renderer = PlaybackRenderer {
            shared: Arc::clone(&shared),
            chunks: rx,
            samples: Vec::new(),
            cursor: 0,
            generation: 0,
            scratch: vec![0.0; config.period_samples()],
        };

        (
            PlaybackBuffer {
                shared,
                chunks: tx,
                logger,
            },
            renderer,
        )
    }

    /// Queues samples for rendering after everything appended before them.
    ///
    /// Never blocks. Appending an empty slice is a no-op.
    pub fn append(&self, samples: Vec<AudioSample>) {
        if samples.is_empty() {
            return;
        }
        let n = samples.len() as u64;
        let generation = self.shared.generation();
        let _ = self
            .shared
            .appended
            .fetch_update(Ordering::AcqRel, Ordering::Acquire, |state| {
                let count = if generation_of(state) == generation {
                    count_of(state)
                } else {
                    0
                };
                Some(pack(generation, count + n))
            });

        // Raised before the send so the tick that picks the chunk up also plays it.
        self.shared.pending_start.store(true, Ordering::Release);
        if self.chunks.send(Chunk { generation, samples }).is_err() {
            self.logger.warn("Playback renderer is gone, dropping audio");
        }
    }

    /// Appends an already-validated frame.
    pub fn append_frame(&self, frame: AudioFrame) {
        self.append(frame.into_samples());
    }

    /// Parses little-endian PCM bytes and appends them.
    ///
    /// # Errors
    /// `InvalidFrame` on an odd byte count.
    pub fn append_pcm(&self, pcm: &[u8]) -> Result<()> {
        if pcm.is_empty() {
            return Ok(());
        }
        let frame = AudioFrame::from_le_bytes(pcm, self.shared.channels, self.shared.sample_rate)?;
        self.append_frame(frame);
        Ok(())
    }

    /// Drops every pending sample and zeroes `elapsed()`.
    ///
    /// Takes effect before the next render tick: the renderer checks the
    /// generation at the start of every tick.
    pub fn reset(&self) {
        self.shared.pending_start.store(false, Ordering::Release);
        self.shared.playing.store(false, Ordering::Release);
        let previous = self
            .shared
            .rendered
            .fetch_update(Ordering::AcqRel, Ordering::Acquire, |state| {
                Some(pack(generation_of(state).wrapping_add(1), 0))
            })
            .unwrap_or_else(|state| state);
        self.logger.debug(&format!(
            "Playback reset after {} rendered samples",
            count_of(previous)
        ));
    }

    /// Stops playback: reset plus leaving the paused state.
    pub fn stop(&self) {
        self.reset();
        self.shared.paused.store(false, Ordering::Release);
    }

    /// Renders silence without advancing until `resume()`.
    pub fn pause(&self) {
        self.shared.paused.store(true, Ordering::Release);
    }

    pub fn resume(&self) {
        self.shared.paused.store(false, Ordering::Release);
    }

    pub fn is_paused(&self) -> bool {
        self.shared.paused.load(Ordering::Acquire)
    }

    /// True once a render tick has picked up appended audio, until the next reset.
    pub fn is_playing(&self) -> bool {
        self.shared.playing.load(Ordering::Acquire)
    }

    /// Played time since the last reset, accumulated across pauses.
    ///
    /// Utterances queued back to back share one reset window; the turn
    /// controller splits this per utterance.
    pub fn elapsed(&self) -> Duration {
        self.shared.samples_to_duration(self.rendered())
    }

    /// Samples rendered since the last reset.
    pub fn rendered(&self) -> u64 {
        count_of(self.shared.rendered.load(Ordering::Acquire))
    }

    /// Playing time of `samples` stream samples.
    pub fn duration_of(&self, samples: u64) -> Duration {
        self.shared.samples_to_duration(samples)
    }

    /// Samples appended since the last reset.
    pub fn len(&self) -> usize {
        let generation = self.shared.generation();
        let appended = self.shared.appended.load(Ordering::Acquire);
        if generation_of(appended) == generation {
            count_of(appended) as usize
        } else {
            0
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Appended samples not yet rendered.
    pub fn pending(&self) -> usize {
        self.len().saturating_sub(self.rendered() as usize)
    }

    /// Time left to render at the current position.
    pub fn remaining(&self) -> Duration {
        self.shared.samples_to_duration(self.pending() as u64)
    }

    /// Last asynchronous failure reported by the output device.
    pub fn device_error(&self) -> Option<String> {
        self.shared
            .device_error
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .clone()
    }
}

/// Consumer side, owned by the output device callback.
pub struct PlaybackRenderer {
    shared: Arc<PlaybackShared>,
    chunks: Receiver<Chunk>,
    samples: Vec<AudioSample>,
    cursor: usize,
    generation: u16,
    scratch: Vec<f32>,
}

impl PlaybackRenderer {
    /// Renders exactly `frame_count` stream samples.
    pub fn render(&mut self, frame_count: usize) -> Vec<f32> {
        let mut out = vec![0.0; frame_count];
        self.render_into(&mut out);
        out
    }

    /// Fills `out` completely, padding with silence on underrun.
    pub fn render_into(&mut self, out: &mut [f32]) {
        self.sync();

        if self.shared.pending_start.swap(false, Ordering::AcqRel) {
            self.shared.playing.store(true, Ordering::Release);
        }

        let active = self.shared.playing.load(Ordering::Acquire)
            && !self.shared.paused.load(Ordering::Acquire);
        if !active {
            out.fill(0.0);
            return;
        }

        let available = self.samples.len() - self.cursor;
        let n = available.min(out.len());
        for (dst, &src) in out[..n]
            .iter_mut()
            .zip(&self.samples[self.cursor..self.cursor + n])
        {
            *dst = convert::to_f32(src);
        }
        out[n..].fill(0.0);

        if n > 0 {
            self.cursor += n;
            let generation = self.generation;
            // Only count samples if no reset happened during this tick.
            let _ = self
                .shared
                .rendered
                .fetch_update(Ordering::AcqRel, Ordering::Acquire, |state| {
                    (generation_of(state) == generation)
                        .then(|| pack(generation, count_of(state) + n as u64))
                });
        }

        if self.cursor == self.samples.len() {
            self.samples.clear();
            self.cursor = 0;
        }
    }

    /// Renders into an interleaved device buffer with `device_channels` channels.
    ///
    /// Mono streams are copied to every device channel; otherwise channels the
    /// stream does not have are silent and extra stream channels are dropped.
    pub fn render_interleaved(&mut self, out: &mut [f32], device_channels: u16) {
        let stream_channels = self.shared.channels as usize;
        let device_channels = device_channels.max(1) as usize;
        if stream_channels == device_channels {
            self.render_into(out);
            return;
        }

        let frames = out.len() / device_channels;
        let needed = frames * stream_channels;
        let mut scratch = std::mem::take(&mut self.scratch);
        if scratch.len() < needed {
            scratch.resize(needed, 0.0);
        }
        self.render_into(&mut scratch[..needed]);

        for (device_frame, stream_frame) in out
            .chunks_exact_mut(device_channels)
            .zip(scratch[..needed].chunks_exact(stream_channels))
        {
            for (c, slot) in device_frame.iter_mut().enumerate() {
                *slot = if stream_channels == 1 {
                    stream_frame[0]
                } else {
                    stream_frame.get(c).copied().unwrap_or(0.0)
                };
            }
        }
        let tail = frames * device_channels;
        out[tail..].fill(0.0);
        self.scratch = scratch;
    }

    /// Moves the renderer into an output device callback.
    ///
    /// The returned stream keeps rendering until it is dropped.
    pub fn attach<O: AudioOutput>(
        mut self,
        output: &mut O,
        config: &AudioConfig,
    ) -> Result<Box<dyn ActiveStream>> {
        let shared = Arc::clone(&self.shared);
        output.open(
            config,
            Box::new(move |data: &mut [f32], channels: u16| {
                self.render_interleaved(data, channels)
            }),
            Box::new(move |message: String| {
                if let Ok(mut slot) = shared.device_error.try_lock() {
                    *slot = Some(message);
                }
                shared.playing.store(false, Ordering::Release);
            }),
        )
    }

    /// Samples held and not yet rendered
    pub fn buffered(&self) -> usize {
        self.samples.len() - self.cursor
    }

    /// Pulls queued chunks and applies any reset that happened since the last tick.
    fn sync(&mut self) {
        let current = self.shared.generation();
        if current != self.generation {
            self.discard(current);
        }

        loop {
            match self.chunks.try_recv() {
                Ok(chunk) => {
                    if chunk.generation != self.generation {
                        let current = self.shared.generation();
                        if current != self.generation {
                            self.discard(current);
                        }
                        if chunk.generation != self.generation {
                            continue;
                        }
                    }
                    self.samples.extend_from_slice(&chunk.samples);
                }
                Err(TryRecvError::Empty) | Err(TryRecvError::Disconnected) => break,
            }
        }
    }

    fn discard(&mut self, generation: u16) {
        self.generation = generation;
        self.samples.clear();
        self.cursor = 0;
        if self.samples.capacity() > RETAINED_CAPACITY {
            self.samples.shrink_to(RETAINED_CAPACITY);
        }
    }
}
