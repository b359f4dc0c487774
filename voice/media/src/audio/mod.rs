//! Audio processing module
//!
//! Handles capture, sample conversion, playback, utterance turns and WAV
//! container encoding.

pub mod capture;
pub mod config;
pub mod convert;
pub mod detection;
pub mod device;
pub mod frame;
pub mod info;
pub mod playback;
pub mod traits;
pub mod turn;
pub mod utterance;
pub mod virtual_device;
pub mod wav;

pub use capture::{CaptureChunk, CaptureSession, CaptureStatus};
pub use config::AudioConfig;
pub use detection::AudioDetection;
pub use device::{CpalInput, CpalOutput};
pub use frame::{AudioFrame, AudioSample};
pub use info::{DeviceDirection, DeviceInfo};
pub use playback::{PlaybackBuffer, PlaybackRenderer};
pub use traits::{ActiveStream, AudioInput, AudioOutput};
pub use turn::{TurnController, TurnEvent, TurnOutcome, TurnState};
pub use utterance::{UtteranceAsset, UtteranceBuffer};
pub use virtual_device::{VirtualInput, VirtualOutput};
pub use wav::{EncodedContainer, WavHeader, WavSpec};
