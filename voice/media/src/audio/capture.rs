//! Microphone capture session.
//!
//! State machine: `Idle -> Recording <-> Paused -> Stopped`, with `Error`
//! reachable from any state when the device fails. The device clock drives
//! the input callback; every time a full render period of samples has
//! accumulated, one `AudioFrame` is emitted as a `CaptureChunk` on the
//! transport channel.

use super::config::AudioConfig;
use super::convert;
use super::frame::{AudioFrame, AudioSample};
use super::traits::{ActiveStream, AudioInput};
use crate::error::Result;
use logging::Logger;
use std::sync::atomic::{AtomicU8, AtomicU32, AtomicU64, Ordering};
use std::sync::mpsc::Sender;
use std::sync::{Arc, Mutex};
use std::time::Duration;

/// Capture lifecycle
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum CaptureStatus {
    Idle = 0,
    Recording = 1,
    Paused = 2,
    Stopped = 3,
    Error = 4,
}

impl CaptureStatus {
    fn from_u8(value: u8) -> Self {
        match value {
            1 => CaptureStatus::Recording,
            2 => CaptureStatus::Paused,
            3 => CaptureStatus::Stopped,
            4 => CaptureStatus::Error,
            _ => CaptureStatus::Idle,
        }
    }
}

impl std::fmt::Display for CaptureStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            CaptureStatus::Idle => "idle",
            CaptureStatus::Recording => "recording",
            CaptureStatus::Paused => "paused",
            CaptureStatus::Stopped => "stopped",
            CaptureStatus::Error => "error",
        };
        f.write_str(name)
    }
}

/// Unit handed to the session client: little-endian PCM plus an end marker.
///
/// The final chunk of a capture run carries no PCM.
#[derive(Debug, Clone, PartialEq)]
pub struct CaptureChunk {
    pub pcm: Vec<u8>,
    pub is_final: bool,
}

impl CaptureChunk {
    pub fn from_frame(frame: &AudioFrame) -> Self {
        Self {
            pcm: frame.to_le_bytes(),
            is_final: false,
        }
    }

    pub fn end_of_stream() -> Self {
        Self {
            pcm: Vec::new(),
            is_final: true,
        }
    }
}

/// State shared between the control side and the input callback.
struct CaptureShared {
    status: AtomicU8,
    accepted_samples: AtomicU64,
    frames_emitted: AtomicU64,
    level_bits: AtomicU32,
    last_error: Mutex<Option<String>>,
}

impl CaptureShared {
    fn status(&self) -> CaptureStatus {
        CaptureStatus::from_u8(self.status.load(Ordering::Acquire))
    }

    fn set_status(&self, status: CaptureStatus) {
        self.status.store(status as u8, Ordering::Release);
    }
}

/// Accumulates device blocks into fixed-size frames inside the input callback.
struct FrameAssembler {
    shared: Arc<CaptureShared>,
    sink: Sender<CaptureChunk>,
    staging: Vec<AudioSample>,
    period_samples: usize,
    channels: u16,
    sample_rate: u32,
}

impl FrameAssembler {
    fn new(config: &AudioConfig, shared: Arc<CaptureShared>, sink: Sender<CaptureChunk>) -> Self {
        let period_samples = config.period_samples();
        Self {
            shared,
            sink,
            staging: Vec::with_capacity(period_samples),
            period_samples,
            channels: config.channel_count,
            sample_rate: config.sample_rate,
        }
    }

    /// Consumes one interleaved device block.
    fn on_block(&mut self, data: &[f32], device_channels: u16) {
        if self.shared.status() != CaptureStatus::Recording {
            return;
        }
        let device_channels = device_channels.max(1) as usize;
        let channels = self.channels as usize;

        for device_frame in data.chunks_exact(device_channels) {
            for c in 0..channels {
                let source = device_frame[c.min(device_channels - 1)];
                self.staging.push(convert::to_i16(source));
            }
            if self.staging.len() >= self.period_samples {
                self.emit();
            }
        }

        let accepted = (data.len() / device_channels * channels) as u64;
        self.shared
            .accepted_samples
            .fetch_add(accepted, Ordering::Relaxed);
    }

    fn emit(&mut self) {
        let samples = std::mem::replace(&mut self.staging, Vec::with_capacity(self.period_samples));
        let Ok(frame) = AudioFrame::new(samples, self.channels, self.sample_rate) else {
            return;
        };
        self.shared
            .level_bits
            .store(frame.rms().to_bits(), Ordering::Relaxed);
        self.shared.frames_emitted.fetch_add(1, Ordering::Relaxed);
        // A closed channel means the transport side is gone; keep the clock running.
        let _ = self.sink.send(CaptureChunk::from_frame(&frame));
    }
}

/// Owns the input device subscription and the capture state machine.
pub struct CaptureSession<I: AudioInput> {
    input: I,
    config: AudioConfig,
    shared: Arc<CaptureShared>,
    sink: Sender<CaptureChunk>,
    stream: Option<Box<dyn ActiveStream>>,
    logger: Logger,
}

impl<I: AudioInput> CaptureSession<I> {
    /// Creates an idle session that will emit chunks on `sink`.
    pub fn new(input: I, config: AudioConfig, sink: Sender<CaptureChunk>, logger: Logger) -> Self {
        Self {
            input,
            config,
            shared: Arc::new(CaptureShared {
                status: AtomicU8::new(CaptureStatus::Idle as u8),
                accepted_samples: AtomicU64::new(0),
                frames_emitted: AtomicU64::new(0),
                level_bits: AtomicU32::new(0),
                last_error: Mutex::new(None),
            }),
            sink,
            stream: None,
            logger,
        }
    }

    /// Acquires the input device and starts recording.
    ///
    /// Valid from `Idle`, `Stopped` and `Error`; a no-op while recording or paused.
    ///
    /// # Errors
    /// `DeviceUnavailable` if the device cannot be opened. The status is left unchanged.
    pub fn start(&mut self) -> Result<()> {
        match self.status() {
            CaptureStatus::Recording | CaptureStatus::Paused => {
                self.logger.debug("Capture already running");
                return Ok(());
            }
            CaptureStatus::Idle | CaptureStatus::Stopped | CaptureStatus::Error => {}
        }

        self.release_failed();

        self.logger.info(&format!(
            "Starting capture: {} Hz, {} channel(s), {} frames per period",
            self.config.sample_rate, self.config.channel_count, self.config.render_period_frames
        ));

        let mut assembler = FrameAssembler::new(&self.config, Arc::clone(&self.shared), self.sink.clone());
        let error_shared = Arc::clone(&self.shared);

        let stream = self
            .input
            .open(
                &self.config,
                Box::new(move |data: &[f32], channels: u16| {
                    assembler.on_block(data, channels)
                }),
                Box::new(move |message: String| {
                    if let Ok(mut last) = error_shared.last_error.try_lock() {
                        *last = Some(message);
                    }
                    error_shared.set_status(CaptureStatus::Error);
                }),
            )
            .inspect_err(|e| self.logger.error(&format!("Failed to open input: {}", e)))?;

        self.logger
            .info(&format!("Using input device: {}", stream.device_name()));

        self.shared.accepted_samples.store(0, Ordering::Relaxed);
        self.shared.level_bits.store(0, Ordering::Relaxed);
        *self.lock_error() = None;
        self.shared.set_status(CaptureStatus::Recording);
        self.stream = Some(stream);
        Ok(())
    }

    /// Stops accepting samples. No-op unless recording.
    pub fn pause(&mut self) {
        if self
            .shared
            .status
            .compare_exchange(
                CaptureStatus::Recording as u8,
                CaptureStatus::Paused as u8,
                Ordering::AcqRel,
                Ordering::Acquire,
            )
            .is_ok()
        {
            self.logger.info("Capture paused");
        }
    }

    /// Resumes accepting samples. No-op unless paused.
    pub fn resume(&mut self) {
        if self
            .shared
            .status
            .compare_exchange(
                CaptureStatus::Paused as u8,
                CaptureStatus::Recording as u8,
                Ordering::AcqRel,
                Ordering::Acquire,
            )
            .is_ok()
        {
            self.logger.info("Capture resumed");
        }
    }

    /// Releases the device from any state, discarding the partial frame.
    ///
    /// If a stream was open, a final empty chunk tells the transport that the
    /// capture run is over.
    pub fn stop(&mut self) {
        let previous = self.status();
        self.shared.set_status(CaptureStatus::Stopped);

        // Dropping the stream drops the callback and its partial frame.
        if self.stream.take().is_some() {
            let _ = self.sink.send(CaptureChunk::end_of_stream());
            self.logger.info(&format!(
                "Capture stopped after {:.2}s ({} frames emitted)",
                self.elapsed().as_secs_f64(),
                self.frames_emitted()
            ));
        } else if previous != CaptureStatus::Stopped {
            self.logger.debug(&format!("Capture stopped from {}", previous));
        }

        self.shared.accepted_samples.store(0, Ordering::Relaxed);
        self.shared.level_bits.store(0, Ordering::Relaxed);
    }

    pub fn status(&self) -> CaptureStatus {
        self.shared.status()
    }

    /// Closes the stream of a device that reported a failure.
    ///
    /// The error callback runs on the device's own thread and cannot drop
    /// the stream, so the owner calls this once it sees `Error`. The status
    /// stays `Error`; the transport gets the final chunk of the run.
    /// Returns whether a stream was released.
    pub fn release_failed(&mut self) -> bool {
        if self.status() != CaptureStatus::Error || self.stream.take().is_none() {
            return false;
        }
        let _ = self.sink.send(CaptureChunk::end_of_stream());
        self.logger.error(&format!(
            "Input device failed, stream released: {}",
            self.last_error().unwrap_or_default()
        ));
        true
    }

    /// Audio time accepted while recording.
    pub fn elapsed(&self) -> Duration {
        let samples = self.shared.accepted_samples.load(Ordering::Relaxed);
        Duration::from_secs_f64(self.config.samples_to_secs(samples))
    }

    /// RMS level of the most recent frame, in `[0.0, 1.0]`.
    pub fn level(&self) -> f32 {
        f32::from_bits(self.shared.level_bits.load(Ordering::Relaxed))
    }

    /// Frames emitted since the session was created
    pub fn frames_emitted(&self) -> u64 {
        self.shared.frames_emitted.load(Ordering::Relaxed)
    }

    /// Message of the last device failure, if the session is in `Error`.
    pub fn last_error(&self) -> Option<String> {
        self.lock_error().clone()
    }

    pub fn config(&self) -> &AudioConfig {
        &self.config
    }

    fn lock_error(&self) -> std::sync::MutexGuard<'_, Option<String>> {
        self.shared
            .last_error
            .lock()
            .unwrap_or_else(|e| e.into_inner())
    }
}

impl<I: AudioInput> Drop for CaptureSession<I> {
    fn drop(&mut self) {
        if self.stream.is_some() {
            self.stop();
        }
    }
}
