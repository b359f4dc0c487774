//! Real-time PCM streaming core
//!
//! Captures microphone audio into fixed-size linear-PCM frames, renders
//! inbound response audio through an interruptible playback buffer, and
//! serializes completed utterances into WAV containers.

pub mod audio;
pub mod common;
pub mod error;

// Re-export commonly used types
pub use error::{MediaError, Result};

pub use audio::{
    ActiveStream, AudioConfig, AudioDetection, AudioFrame, AudioInput, AudioOutput, AudioSample,
    CaptureChunk, CaptureSession, CaptureStatus, CpalInput, CpalOutput, DeviceDirection,
    DeviceInfo, EncodedContainer, PlaybackBuffer, PlaybackRenderer, TurnController, TurnEvent,
    TurnOutcome, TurnState, UtteranceAsset, UtteranceBuffer, VirtualInput, VirtualOutput,
    WavHeader, WavSpec,
};
