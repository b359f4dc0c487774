//! Per-utterance sample accumulation.

use super::frame::AudioSample;
use super::wav::{EncodedContainer, WavSpec};
use crate::common::constants::memory::RETAINED_CAPACITY;
use crate::error::Result;
use std::time::Duration;

/// Growable arena holding every sample of the utterance being received.
///
/// Memory is bounded by one utterance: `clear()` releases capacity beyond
/// `RETAINED_CAPACITY` samples.
#[derive(Debug, Default)]
pub struct UtteranceBuffer {
    samples: Vec<AudioSample>,
}

impl UtteranceBuffer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn append(&mut self, samples: &[AudioSample]) {
        self.samples.extend_from_slice(samples);
    }

    pub fn samples(&self) -> &[AudioSample] {
        &self.samples
    }

    pub fn len(&self) -> usize {
        self.samples.len()
    }

    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    /// Hands the accumulated samples off, leaving the buffer empty.
    pub fn take(&mut self) -> Vec<AudioSample> {
        std::mem::take(&mut self.samples)
    }

    pub fn clear(&mut self) {
        self.samples.clear();
        if self.samples.capacity() > RETAINED_CAPACITY {
            self.samples.shrink_to(RETAINED_CAPACITY);
        }
    }
}

/// A finished utterance ready to be persisted or uploaded.
#[derive(Debug, Clone, PartialEq)]
pub struct UtteranceAsset {
    pub utterance_id: String,
    pub container: EncodedContainer,
    pub duration: Duration,
    pub channels: u16,
    pub sample_rate: u32,
}

impl UtteranceAsset {
    /// Encodes `samples` as a complete WAV asset.
    pub fn encode(utterance_id: String, spec: &WavSpec, samples: &[AudioSample]) -> Result<Self> {
        let container = spec.encode(samples)?;
        Ok(Self {
            utterance_id,
            duration: container.duration(),
            channels: spec.channels,
            sample_rate: spec.sample_rate,
            container,
        })
    }

    /// File name of the form `<id>.<ext>`.
    pub fn file_name(&self) -> String {
        format!("{}.{}", self.utterance_id, self.container.extension())
    }

    pub fn mime_type(&self) -> &'static str {
        self.container.mime_type()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_append_and_take() {
        let mut buffer = UtteranceBuffer::new();
        buffer.append(&[1, 2, 3]);
        buffer.append(&[4]);
        assert_eq!(buffer.len(), 4);

        let samples = buffer.take();
        assert_eq!(samples, vec![1, 2, 3, 4]);
        assert!(buffer.is_empty());
    }

    #[test]
    fn test_clear_bounds_capacity() {
        let mut buffer = UtteranceBuffer::new();
        buffer.append(&vec![0; RETAINED_CAPACITY * 2]);
        buffer.clear();
        assert!(buffer.is_empty());
        assert!(buffer.samples.capacity() <= RETAINED_CAPACITY);
    }

    #[test]
    fn test_asset_metadata() {
        let spec = WavSpec::pcm16(24000, 1);
        let asset = UtteranceAsset::encode("utt_1".into(), &spec, &[1000; 12000]).unwrap();
        assert_eq!(asset.duration, Duration::from_millis(500));
        assert_eq!(asset.channels, 1);
        assert_eq!(asset.sample_rate, 24000);
        assert_eq!(asset.container.len(), 44 + 24000);
        assert_eq!(asset.file_name(), "utt_1.wav");
        assert_eq!(asset.mime_type(), "audio/wav");
    }

    #[test]
    fn test_encode_empty_is_rejected() {
        let mut buffer = UtteranceBuffer::new();
        let samples = buffer.take();
        assert!(UtteranceAsset::encode("utt_1".into(), &WavSpec::pcm16(24000, 1), &samples).is_err());
    }
}
