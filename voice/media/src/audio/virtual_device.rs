//! In-memory audio devices.
//!
//! A virtual device has no clock of its own: whoever holds a clone of it
//! calls `push_block` / `pull_block` to play the role of the host audio
//! subsystem. Used for headless sessions and tests.

use super::config::AudioConfig;
use super::traits::{
    ActiveStream, AudioInput, AudioOutput, ErrorCallback, InputCallback, OutputCallback,
};
use crate::error::{MediaError, Result};
use std::sync::{Arc, Mutex, MutexGuard};

struct Slot<C> {
    callback: Option<C>,
    on_error: Option<ErrorCallback>,
    opens: usize,
}

impl<C> Default for Slot<C> {
    fn default() -> Self {
        Self {
            callback: None,
            on_error: None,
            opens: 0,
        }
    }
}

fn lock<C>(slot: &Mutex<Slot<C>>) -> MutexGuard<'_, Slot<C>> {
    slot.lock().unwrap_or_else(|e| e.into_inner())
}

/// Stream handle that detaches the callbacks when dropped.
struct VirtualStream<C: Send + 'static> {
    name: String,
    slot: Arc<Mutex<Slot<C>>>,
}

impl<C: Send + 'static> ActiveStream for VirtualStream<C> {
    fn device_name(&self) -> &str {
        &self.name
    }
}

impl<C: Send + 'static> Drop for VirtualStream<C> {
    fn drop(&mut self) {
        let mut slot = lock(&self.slot);
        slot.callback = None;
        slot.on_error = None;
    }
}

fn open_slot<C: Send + 'static>(
    name: &str,
    slot: &Arc<Mutex<Slot<C>>>,
    unavailable: bool,
    callback: C,
    on_error: ErrorCallback,
) -> Result<Box<dyn ActiveStream>> {
    if unavailable {
        return Err(MediaError::DeviceUnavailable(format!(
            "{} refused to open",
            name
        )));
    }
    let mut guard = lock(slot);
    if guard.callback.is_some() {
        return Err(MediaError::DeviceUnavailable(format!(
            "{} is already in use",
            name
        )));
    }
    guard.callback = Some(callback);
    guard.on_error = Some(on_error);
    guard.opens += 1;
    drop(guard);

    Ok(Box::new(VirtualStream {
        name: name.to_string(),
        slot: Arc::clone(slot),
    }))
}

fn fail_slot<C>(slot: &Mutex<Slot<C>>, message: &str) {
    if let Some(on_error) = lock(slot).on_error.as_mut() {
        on_error(message.to_string());
    }
}

/// Virtual microphone
#[derive(Clone)]
pub struct VirtualInput {
    slot: Arc<Mutex<Slot<InputCallback>>>,
    channels: u16,
    unavailable: bool,
}

impl VirtualInput {
    /// A microphone delivering interleaved blocks with `channels` channels.
    pub fn new(channels: u16) -> Self {
        Self {
            slot: Arc::default(),
            channels: channels.max(1),
            unavailable: false,
        }
    }

    /// A microphone whose `open` always fails, as with denied permission.
    pub fn unavailable() -> Self {
        Self {
            unavailable: true,
            ..Self::new(1)
        }
    }

    /// Delivers one block from the "device clock". Returns false if no stream is open.
    pub fn push_block(&self, samples: &[f32]) -> bool {
        let mut slot = lock(&self.slot);
        match slot.callback.as_mut() {
            Some(callback) => {
                callback(samples, self.channels);
                true
            }
            None => false,
        }
    }

    /// Reports an asynchronous device failure to the open stream.
    pub fn fail(&self, message: &str) {
        fail_slot(&self.slot, message);
    }

    pub fn is_open(&self) -> bool {
        lock(&self.slot).callback.is_some()
    }

    /// Number of successful `open` calls so far
    pub fn open_count(&self) -> usize {
        lock(&self.slot).opens
    }
}

impl AudioInput for VirtualInput {
    fn open(
        &mut self,
        _config: &AudioConfig,
        on_data: InputCallback,
        on_error: ErrorCallback,
    ) -> Result<Box<dyn ActiveStream>> {
        open_slot(
            "virtual input",
            &self.slot,
            self.unavailable,
            on_data,
            on_error,
        )
    }
}

/// Virtual speaker
#[derive(Clone)]
pub struct VirtualOutput {
    slot: Arc<Mutex<Slot<OutputCallback>>>,
    channels: u16,
    unavailable: bool,
}

impl VirtualOutput {
    pub fn new(channels: u16) -> Self {
        Self {
            slot: Arc::default(),
            channels: channels.max(1),
            unavailable: false,
        }
    }

    pub fn unavailable() -> Self {
        Self {
            unavailable: true,
            ..Self::new(1)
        }
    }

    /// Runs one render tick of `frames` device frames and returns what was rendered.
    /// Returns `None` if no stream is open.
    pub fn pull_block(&self, frames: usize) -> Option<Vec<f32>> {
        let mut slot = lock(&self.slot);
        let callback = slot.callback.as_mut()?;
        let mut data = vec![f32::NAN; frames * self.channels as usize];
        callback(&mut data, self.channels);
        Some(data)
    }

    pub fn fail(&self, message: &str) {
        fail_slot(&self.slot, message);
    }

    pub fn is_open(&self) -> bool {
        lock(&self.slot).callback.is_some()
    }
}

impl AudioOutput for VirtualOutput {
    fn open(
        &mut self,
        _config: &AudioConfig,
        on_render: OutputCallback,
        on_error: ErrorCallback,
    ) -> Result<Box<dyn ActiveStream>> {
        open_slot(
            "virtual output",
            &self.slot,
            self.unavailable,
            on_render,
            on_error,
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[test]
    fn test_input_detaches_on_drop() {
        let mut input = VirtualInput::new(2);
        let seen = Arc::new(AtomicUsize::new(0));
        let seen_cb = Arc::clone(&seen);

        let stream = input
            .open(
                &AudioConfig::default(),
                Box::new(move |data: &[f32], channels: u16| {
                    assert_eq!(channels, 2);
                    seen_cb.fetch_add(data.len(), Ordering::SeqCst);
                }),
                Box::new(|_: String| {}),
            )
            .unwrap();

        assert_eq!(stream.device_name(), "virtual input");
        assert!(input.push_block(&[0.0; 8]));
        drop(stream);
        assert!(!input.push_block(&[0.0; 8]));
        assert_eq!(seen.load(Ordering::SeqCst), 8);
        assert_eq!(input.open_count(), 1);
    }

    #[test]
    fn test_device_is_exclusive() {
        let mut output = VirtualOutput::new(1);
        let config = AudioConfig::default();
        let silence = || -> OutputCallback { Box::new(|d: &mut [f32], _: u16| d.fill(0.0)) };
        let _first = output
            .open(&config, silence(), Box::new(|_: String| {}))
            .unwrap();
        let second = output.open(&config, silence(), Box::new(|_: String| {}));
        assert!(matches!(second, Err(MediaError::DeviceUnavailable(_))));
    }

    #[test]
    fn test_unavailable_devices_refuse() {
        let config = AudioConfig::default();
        let result = VirtualInput::unavailable().open(
            &config,
            Box::new(|_: &[f32], _: u16| {}),
            Box::new(|_: String| {}),
        );
        assert!(matches!(result, Err(MediaError::DeviceUnavailable(_))));
        assert!(VirtualOutput::new(1).pull_block(16).is_none());
    }
}
