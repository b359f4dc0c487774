//! Voice session wiring.
//!
//! A `VoiceSession` owns one capture session, one output stream and two
//! transport threads:
//!
//! - uplink: drains captured chunks into `SessionClient::send_audio`
//! - downlink: runs the `TurnController` over inbound `TurnEvent`s, sends
//!   truncation notices back to the client and completed assets to the sink
//!
//! Device callbacks only touch channels and atomics; everything that may
//! block (client I/O, file writes, log formatting) happens on these threads.

use crate::assets::AssetSink;
use crate::client::SessionClient;
use crate::error::{Result, VoiceError};
use logging::Logger;
use media::common::constants::logging::CAPTURE_LOG_INTERVAL;
use media::{
    ActiveStream, AudioConfig, AudioInput, AudioOutput, CaptureChunk, CaptureSession,
    CaptureStatus, PlaybackBuffer, TurnController, TurnEvent, TurnOutcome,
};
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::mpsc::{Receiver, RecvTimeoutError, Sender, channel};
use std::sync::{Arc, Mutex, MutexGuard};
use std::thread::{self, JoinHandle};
use std::time::Duration;

/// How often idle transport threads check for shutdown
const POLL_INTERVAL: Duration = Duration::from_millis(50);

fn lock_client<C>(client: &Mutex<C>) -> MutexGuard<'_, C> {
    client.lock().unwrap_or_else(|e| e.into_inner())
}

/// A transport thread plus the flag that tells it to wind down.
struct Worker {
    running: Arc<AtomicBool>,
    handle: Option<JoinHandle<()>>,
}

impl Worker {
    fn spawn<F>(name: &str, body: F) -> Result<Self>
    where
        F: FnOnce(Arc<AtomicBool>) + Send + 'static,
    {
        let running = Arc::new(AtomicBool::new(true));
        let flag = Arc::clone(&running);
        let handle = thread::Builder::new()
            .name(name.to_string())
            .spawn(move || body(flag))
            .map_err(|e| VoiceError::Thread(format!("Failed to spawn {}: {}", name, e)))?;
        Ok(Self {
            running,
            handle: Some(handle),
        })
    }

    /// Lets the thread drain what is queued, then waits for it.
    fn finish(&mut self) -> bool {
        self.running.store(false, Ordering::Release);
        match self.handle.take() {
            Some(handle) => handle.join().is_ok(),
            None => true,
        }
    }
}

/// Receives until the channel closes, or until it is idle after `running` cleared.
fn next<T>(rx: &Receiver<T>, running: &AtomicBool) -> Option<T> {
    loop {
        match rx.recv_timeout(POLL_INTERVAL) {
            Ok(item) => return Some(item),
            Err(RecvTimeoutError::Timeout) => {
                if !running.load(Ordering::Acquire) {
                    return None;
                }
            }
            Err(RecvTimeoutError::Disconnected) => return None,
        }
    }
}

/// Explicitly constructed voice session. Nothing here is process-global.
pub struct VoiceSession<I: AudioInput> {
    capture: CaptureSession<I>,
    speaker: Option<Box<dyn ActiveStream>>,
    playback: PlaybackBuffer,
    inbound: Sender<TurnEvent>,
    uplink: Worker,
    downlink: Worker,
    frames_sent: Arc<AtomicU64>,
    config: AudioConfig,
    logger: Logger,
    closed: bool,
}

impl<I: AudioInput> VoiceSession<I> {
    /// Opens the output device and starts the transport threads. Capture
    /// stays idle until `start()`.
    ///
    /// # Errors
    /// `DeviceUnavailable` if the output device cannot be opened, or a
    /// thread error if a transport thread cannot be spawned.
    pub fn new<O, C, S>(
        config: &AudioConfig,
        input: I,
        mut output: O,
        client: C,
        sink: S,
        logger: &Logger,
    ) -> Result<Self>
    where
        O: AudioOutput,
        C: SessionClient,
        S: AssetSink,
    {
        let logger = logger.for_component("Session");
        let (chunk_tx, chunk_rx) = channel::<CaptureChunk>();
        let (event_tx, event_rx) = channel::<TurnEvent>();

        let mut client = client;
        client.attach(event_tx.clone());
        let client = Arc::new(Mutex::new(client));

        let (playback, renderer) = PlaybackBuffer::new(config, logger.for_component("Playback"));
        let speaker = renderer.attach(&mut output, config)?;
        logger.info(&format!("Playback on {}", speaker.device_name()));

        let frames_sent = Arc::new(AtomicU64::new(0));
        let uplink = Self::spawn_uplink(
            chunk_rx,
            Arc::clone(&client),
            event_tx.clone(),
            Arc::clone(&frames_sent),
            logger.for_component("Uplink"),
        )?;

        let turns = TurnController::new(config, playback.clone(), logger.for_component("Turn"));
        let downlink = Self::spawn_downlink(
            event_rx,
            turns,
            client,
            sink,
            logger.for_component("Downlink"),
        )?;

        let capture = CaptureSession::new(input, config.clone(), chunk_tx, logger.for_component("Capture"));

        logger.info(&format!(
            "Session ready: {} Hz, {} channel(s), {:.1} ms render period",
            config.sample_rate,
            config.channel_count,
            config.period_duration_ms()
        ));

        Ok(Self {
            capture,
            speaker: Some(speaker),
            playback,
            inbound: event_tx,
            uplink,
            downlink,
            frames_sent,
            config: config.clone(),
            logger,
            closed: false,
        })
    }

    fn spawn_uplink<C: SessionClient>(
        chunks: Receiver<CaptureChunk>,
        client: Arc<Mutex<C>>,
        inbound: Sender<TurnEvent>,
        frames_sent: Arc<AtomicU64>,
        logger: Logger,
    ) -> Result<Worker> {
        Worker::spawn("voice-uplink", move |running| {
            while let Some(chunk) = next(&chunks, &running) {
                let is_final = chunk.is_final;
                if let Err(e) = lock_client(&client).send_audio(chunk) {
                    logger.error(&format!("Failed to send audio: {}", e));
                    let _ = inbound.send(TurnEvent::Disconnect);
                    continue;
                }
                if is_final {
                    logger.debug("End of capture delivered");
                    continue;
                }
                let sent = frames_sent.fetch_add(1, Ordering::Relaxed) + 1;
                if sent % CAPTURE_LOG_INTERVAL == 0 {
                    logger.debug(&format!("Sent {} captured frames", sent));
                }
            }
            logger.debug("Uplink stopped");
        })
    }

    fn spawn_downlink<C: SessionClient, S: AssetSink>(
        events: Receiver<TurnEvent>,
        mut turns: TurnController,
        client: Arc<Mutex<C>>,
        mut sink: S,
        logger: Logger,
    ) -> Result<Worker> {
        Worker::spawn("voice-downlink", move |running| {
            while let Some(event) = next(&events, &running) {
                match turns.handle(event) {
                    Ok(TurnOutcome::Interrupted {
                        utterance_id: Some(id),
                        played,
                    }) => lock_client(&client).truncate(&id, played),
                    Ok(TurnOutcome::Completed(asset)) => {
                        if let Err(e) = sink.store(&asset) {
                            logger.error(&format!(
                                "Failed to store {}: {}",
                                asset.utterance_id, e
                            ));
                        }
                    }
                    Ok(TurnOutcome::Reset) => logger.warn("Transport reset, buffers flushed"),
                    Ok(_) => {}
                    Err(e) => logger.warn(&format!("Dropping inbound audio: {}", e)),
                }
            }
            logger.debug("Downlink stopped");
        })
    }

    /// Starts (or restarts) microphone capture.
    pub fn start(&mut self) -> Result<()> {
        Ok(self.capture.start()?)
    }

    pub fn pause(&mut self) {
        self.capture.pause();
    }

    pub fn resume(&mut self) {
        self.capture.resume();
    }

    /// Stops capture and tells the client the capture run is over.
    pub fn stop_capture(&mut self) {
        self.capture.stop();
    }

    /// Sender for events coming from the remote endpoint.
    pub fn inbound(&self) -> Sender<TurnEvent> {
        self.inbound.clone()
    }

    /// Barge-in: cut playback of the current response.
    pub fn interrupt(&self) {
        let _ = self.inbound.send(TurnEvent::Interrupt);
    }

    pub fn capture_status(&self) -> CaptureStatus {
        self.capture.status()
    }

    /// Releases a failed input device and reports the capture status.
    ///
    /// Meant to be polled by whoever drives the session; `start()` reopens
    /// the device after a failure.
    pub fn check_capture(&mut self) -> CaptureStatus {
        if self.capture.release_failed() {
            self.logger.warn("Capture device lost; call start() to reopen it");
        }
        self.capture.status()
    }

    /// Input level of the last captured frame
    pub fn level(&self) -> f32 {
        self.capture.level()
    }

    /// Recording time of the current capture run
    pub fn capture_elapsed(&self) -> Duration {
        self.capture.elapsed()
    }

    pub fn playback(&self) -> &PlaybackBuffer {
        &self.playback
    }

    /// Captured frames delivered to the client
    pub fn frames_sent(&self) -> u64 {
        self.frames_sent.load(Ordering::Relaxed)
    }

    pub fn config(&self) -> &AudioConfig {
        &self.config
    }

    /// Stops capture, drains both transport threads and releases the devices.
    pub fn shutdown(mut self) {
        self.close();
    }

    fn close(&mut self) {
        if self.closed {
            return;
        }
        self.closed = true;
        self.logger.info("Shutting down session");

        self.capture.stop();
        // Uplink first: anything it forwards to the client can still
        // produce inbound events for the downlink to handle.
        if !self.uplink.finish() {
            self.logger.error("Uplink thread panicked");
        }
        if !self.downlink.finish() {
            self.logger.error("Downlink thread panicked");
        }

        self.playback.stop();
        self.speaker = None;
        self.logger.info(&format!(
            "Session closed after {} frames sent",
            self.frames_sent()
        ));
    }
}

impl<I: AudioInput> Drop for VoiceSession<I> {
    fn drop(&mut self) {
        self.close();
    }
}
