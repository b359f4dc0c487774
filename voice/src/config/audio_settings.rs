use media::{AudioConfig, Result};
use serde::{Deserialize, Serialize};

/// Audio section of the config file; validated into a `media::AudioConfig`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct AudioSettings {
    pub sample_rate: u32,
    pub channel_count: u16,
    pub render_period_frames: u32,
    pub input_device: Option<String>,
    pub output_device: Option<String>,
}

impl Default for AudioSettings {
    fn default() -> Self {
        let defaults = AudioConfig::default();
        AudioSettings {
            sample_rate: defaults.sample_rate,
            channel_count: defaults.channel_count,
            render_period_frames: defaults.render_period_frames,
            input_device: None,
            output_device: None,
        }
    }
}

impl AudioSettings {
    /// # Errors
    /// `MediaError::Config` if a value is out of range.
    pub fn to_audio_config(&self) -> Result<AudioConfig> {
        Ok(
            AudioConfig::new(self.sample_rate, self.channel_count, self.render_period_frames)?
                .with_devices(self.input_device.clone(), self.output_device.clone()),
        )
    }
}
