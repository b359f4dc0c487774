//! Device traits for audio input and output
//!
//! The capture session and playback renderer never talk to a host audio API
//! directly. They hand callbacks to an `AudioInput` / `AudioOutput`, which
//! invokes them from the device's own clock. `CpalInput`/`CpalOutput` drive
//! real hardware; `VirtualInput`/`VirtualOutput` let tests drive the clock.

use super::config::AudioConfig;
use crate::error::Result;

/// Called from the input clock with interleaved samples and the device's
/// channel count. Must not block, perform I/O, or allocate without bound.
pub type InputCallback = Box<dyn FnMut(&[f32], u16) + Send + 'static>;

/// Called from the output clock to fill an interleaved buffer with the
/// given channel count. Must always fill the whole buffer.
pub type OutputCallback = Box<dyn FnMut(&mut [f32], u16) + Send + 'static>;

/// Receives asynchronous device failures (unplugged, revoked, ...).
pub type ErrorCallback = Box<dyn FnMut(String) + Send + 'static>;

/// A running device stream. Dropping it stops the stream and releases the
/// device handle.
pub trait ActiveStream {
    /// Human-readable name of the opened device
    fn device_name(&self) -> &str;
}

/// Trait for audio input devices
pub trait AudioInput {
    /// Opens the device at the session sample rate and starts delivering blocks.
    ///
    /// # Errors
    /// `MediaError::DeviceUnavailable` if the device cannot be opened or
    /// permission is denied.
    fn open(
        &mut self,
        config: &AudioConfig,
        on_data: InputCallback,
        on_error: ErrorCallback,
    ) -> Result<Box<dyn ActiveStream>>;
}

/// Trait for audio output devices
pub trait AudioOutput {
    /// Opens the device at the session sample rate and starts pulling blocks.
    ///
    /// # Errors
    /// `MediaError::DeviceUnavailable` if the device cannot be opened.
    fn open(
        &mut self,
        config: &AudioConfig,
        on_render: OutputCallback,
        on_error: ErrorCallback,
    ) -> Result<Box<dyn ActiveStream>>;
}
