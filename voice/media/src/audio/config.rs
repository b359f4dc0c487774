//! Audio pipeline configuration.
//!
//! One `AudioConfig` is shared by capture, playback and the turn controller
//! so that every stage agrees on the session sample rate.

use crate::common::constants::defaults;
use crate::error::{MediaError, Result};

/// Session-wide audio parameters
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AudioConfig {
    /// Sample rate in Hz. Must match the remote endpoint; a mismatch changes
    /// pitch and speed but is not detected.
    pub sample_rate: u32,
    /// Number of audio channels (1 = mono, 2 = stereo)
    pub channel_count: u16,
    /// Frames produced or consumed per render tick
    pub render_period_frames: u32,
    /// Input device name (None = host default)
    pub input_device: Option<String>,
    /// Output device name (None = host default)
    pub output_device: Option<String>,
}

impl AudioConfig {
    const MIN_SAMPLE_RATE: u32 = 8000;
    const MAX_SAMPLE_RATE: u32 = 192000;
    const MIN_CHANNELS: u16 = 1;
    const MAX_CHANNELS: u16 = 2;
    const MIN_RENDER_PERIOD: u32 = 64;
    const MAX_RENDER_PERIOD: u32 = 16384;

    /// Creates a configuration with validation and default devices.
    ///
    /// # Errors
    /// `MediaError::Config` if any value is outside its supported range.
    pub fn new(sample_rate: u32, channel_count: u16, render_period_frames: u32) -> Result<Self> {
        let config = Self {
            sample_rate,
            channel_count,
            render_period_frames,
            input_device: None,
            output_device: None,
        };
        config.validate()?;
        Ok(config)
    }

    /// Selects devices by name.
    pub fn with_devices(mut self, input: Option<String>, output: Option<String>) -> Self {
        self.input_device = input;
        self.output_device = output;
        self
    }

    pub fn validate(&self) -> Result<()> {
        if !(Self::MIN_SAMPLE_RATE..=Self::MAX_SAMPLE_RATE).contains(&self.sample_rate) {
            return Err(MediaError::Config(format!(
                "Sample rate must be between {} and {}, got {}",
                Self::MIN_SAMPLE_RATE,
                Self::MAX_SAMPLE_RATE,
                self.sample_rate
            )));
        }
        if !(Self::MIN_CHANNELS..=Self::MAX_CHANNELS).contains(&self.channel_count) {
            return Err(MediaError::Config(format!(
                "Channel count must be between {} and {}, got {}",
                Self::MIN_CHANNELS,
                Self::MAX_CHANNELS,
                self.channel_count
            )));
        }
        if !(Self::MIN_RENDER_PERIOD..=Self::MAX_RENDER_PERIOD).contains(&self.render_period_frames)
        {
            return Err(MediaError::Config(format!(
                "Render period must be between {} and {} frames, got {}",
                Self::MIN_RENDER_PERIOD,
                Self::MAX_RENDER_PERIOD,
                self.render_period_frames
            )));
        }
        Ok(())
    }

    /// Samples (all channels) in one render period
    pub fn period_samples(&self) -> usize {
        self.render_period_frames as usize * self.channel_count as usize
    }

    /// Returns the render period in milliseconds
    pub fn period_duration_ms(&self) -> f64 {
        (self.render_period_frames as f64 / self.sample_rate as f64) * 1000.0
    }

    /// Converts a sample count (all channels) into seconds
    pub fn samples_to_secs(&self, samples: u64) -> f64 {
        samples as f64 / (self.sample_rate as f64 * self.channel_count as f64)
    }
}

/// 24 kHz mono with 8192-frame render ticks on the default devices
impl Default for AudioConfig {
    fn default() -> Self {
        Self {
            sample_rate: defaults::SAMPLE_RATE,
            channel_count: defaults::CHANNEL_COUNT,
            render_period_frames: defaults::RENDER_PERIOD_FRAMES,
            input_device: None,
            output_device: None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = AudioConfig::default();
        assert_eq!(config.sample_rate, 24000);
        assert_eq!(config.channel_count, 1);
        assert_eq!(config.render_period_frames, 8192);
        assert!(config.input_device.is_none());
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_range_validation() {
        assert!(AudioConfig::new(4000, 1, 8192).is_err());
        assert!(AudioConfig::new(24000, 0, 8192).is_err());
        assert!(AudioConfig::new(24000, 3, 8192).is_err());
        assert!(AudioConfig::new(24000, 1, 32).is_err());
        assert!(AudioConfig::new(24000, 1, 32768).is_err());
        assert!(AudioConfig::new(48000, 2, 1024).is_ok());
    }

    #[test]
    fn test_derived_values() {
        let config = AudioConfig::new(24000, 2, 960).unwrap();
        assert_eq!(config.period_samples(), 1920);
        assert!((config.period_duration_ms() - 40.0).abs() < 1e-9);
        assert!((config.samples_to_secs(48000) - 1.0).abs() < 1e-9);
    }

    #[test]
    fn test_with_devices() {
        let config = AudioConfig::default().with_devices(Some("USB Mic".into()), None);
        assert_eq!(config.input_device.as_deref(), Some("USB Mic"));
        assert!(config.output_device.is_none());
    }
}
