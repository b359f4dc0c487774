//! Audio frame representation.
//!
//! `AudioFrame` is the unit exchanged between capture, transport and
//! playback. Frames are validated on construction and never mutated after.

use crate::error::{MediaError, Result};
use byteorder::{ByteOrder, LittleEndian};

/// Audio sample data type (16-bit PCM)
pub type AudioSample = i16;

/// A contiguous block of 16-bit PCM samples at a fixed rate.
#[derive(Debug, Clone, PartialEq)]
pub struct AudioFrame {
    samples: Vec<AudioSample>,
    channels: u16,
    sample_rate: u32,
    timestamp_ms: u64,
}

impl AudioFrame {
    /// Creates a validated frame stamped with the current wall-clock time.
    ///
    /// # Errors
    /// `InvalidFrame` if `samples` is empty, `channels` or `sample_rate` is
    /// zero, or the sample count is not a multiple of `channels`.
    pub fn new(samples: Vec<AudioSample>, channels: u16, sample_rate: u32) -> Result<Self> {
        if samples.is_empty() {
            return Err(MediaError::InvalidFrame("frame has no samples".into()));
        }
        if channels == 0 {
            return Err(MediaError::InvalidFrame("channel count is zero".into()));
        }
        if sample_rate == 0 {
            return Err(MediaError::InvalidFrame("sample rate is zero".into()));
        }
        if samples.len() % channels as usize != 0 {
            return Err(MediaError::InvalidFrame(format!(
                "{} samples do not divide into {} channels",
                samples.len(),
                channels
            )));
        }

        use std::time::{SystemTime, UNIX_EPOCH};
        let timestamp_ms = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .unwrap_or_default()
            .as_millis() as u64;

        Ok(Self {
            samples,
            channels,
            sample_rate,
            timestamp_ms,
        })
    }

    /// Parses little-endian 16-bit PCM bytes.
    pub fn from_le_bytes(bytes: &[u8], channels: u16, sample_rate: u32) -> Result<Self> {
        if bytes.len() % 2 != 0 {
            return Err(MediaError::InvalidFrame(format!(
                "PCM payload has odd length {}",
                bytes.len()
            )));
        }
        let mut samples = vec![0; bytes.len() / 2];
        LittleEndian::read_i16_into(bytes, &mut samples);
        Self::new(samples, channels, sample_rate)
    }

    /// Serializes the samples as little-endian 16-bit PCM.
    pub fn to_le_bytes(&self) -> Vec<u8> {
        let mut bytes = vec![0; self.size_bytes()];
        LittleEndian::write_i16_into(&self.samples, &mut bytes);
        bytes
    }

    pub fn samples(&self) -> &[AudioSample] {
        &self.samples
    }

    pub fn into_samples(self) -> Vec<AudioSample> {
        self.samples
    }

    pub fn channels(&self) -> u16 {
        self.channels
    }

    pub fn sample_rate(&self) -> u32 {
        self.sample_rate
    }

    /// Capture time in milliseconds since the Unix epoch
    pub fn timestamp_ms(&self) -> u64 {
        self.timestamp_ms
    }

    /// Returns the number of frames (samples per channel)
    pub fn frame_count(&self) -> usize {
        self.samples.len() / self.channels as usize
    }

    /// Returns the duration of this audio frame in milliseconds
    pub fn duration_ms(&self) -> f64 {
        (self.frame_count() as f64 / self.sample_rate as f64) * 1000.0
    }

    /// Returns the size in bytes
    pub fn size_bytes(&self) -> usize {
        self.samples.len() * std::mem::size_of::<AudioSample>()
    }

    /// Root-mean-square level, normalized to `[0.0, 1.0]`.
    pub fn rms(&self) -> f32 {
        let sum_sq: f64 = self
            .samples
            .iter()
            .map(|&s| {
                let v = s as f64;
                v * v
            })
            .sum();
        ((sum_sq / self.samples.len() as f64).sqrt() / 32768.0) as f32
    }

    /// Largest absolute sample, normalized to `[0.0, 1.0]`.
    pub fn peak(&self) -> f32 {
        let max = self
            .samples
            .iter()
            .map(|&s| (s as i32).unsigned_abs())
            .max()
            .unwrap_or(0);
        max as f32 / 32768.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_frame_metrics() {
        let frame = AudioFrame::new(vec![0; 960 * 2], 2, 48000).unwrap();
        assert_eq!(frame.channels(), 2);
        assert_eq!(frame.frame_count(), 960);
        assert_eq!(frame.size_bytes(), 3840);
        assert!((frame.duration_ms() - 20.0).abs() < 0.1);
        assert!(frame.timestamp_ms() > 0);
    }

    #[test]
    fn test_frame_rejects_invalid_shapes() {
        assert!(matches!(
            AudioFrame::new(vec![], 1, 24000),
            Err(MediaError::InvalidFrame(_))
        ));
        assert!(AudioFrame::new(vec![1, 2], 0, 24000).is_err());
        assert!(AudioFrame::new(vec![1, 2], 1, 0).is_err());
        assert!(AudioFrame::new(vec![1, 2, 3], 2, 24000).is_err());
    }

    #[test]
    fn test_le_bytes() {
        let frame = AudioFrame::new(vec![1, -2, 0x1234], 1, 24000).unwrap();
        let bytes = frame.to_le_bytes();
        assert_eq!(bytes, vec![0x01, 0x00, 0xFE, 0xFF, 0x34, 0x12]);

        let parsed = AudioFrame::from_le_bytes(&bytes, 1, 24000).unwrap();
        assert_eq!(parsed.samples(), frame.samples());
    }

    #[test]
    fn test_from_le_bytes_rejects_odd_length() {
        assert!(AudioFrame::from_le_bytes(&[0, 1, 2], 1, 24000).is_err());
        assert!(AudioFrame::from_le_bytes(&[], 1, 24000).is_err());
    }

    #[test]
    fn test_levels() {
        let frame = AudioFrame::new(vec![16384, -16384, 16384, -16384], 1, 24000).unwrap();
        assert!((frame.rms() - 0.5).abs() < 1e-6);
        assert!((frame.peak() - 0.5).abs() < 1e-6);

        let extreme = AudioFrame::new(vec![i16::MIN], 1, 24000).unwrap();
        assert_eq!(extreme.peak(), 1.0);
    }
}
