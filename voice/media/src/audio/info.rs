//! Audio device information.
//!
//! Metadata reported for each device found during enumeration.

use std::fmt;

/// Whether a device records or plays
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeviceDirection {
    Input,
    Output,
}

impl fmt::Display for DeviceDirection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DeviceDirection::Input => write!(f, "input"),
            DeviceDirection::Output => write!(f, "output"),
        }
    }
}

/// Information about an available audio device
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeviceInfo {
    /// Name as reported by the host; usable as `input_device`/`output_device`
    pub name: String,
    pub direction: DeviceDirection,
    /// Native sample rate of the default configuration in Hz
    pub default_sample_rate: u32,
    /// Native channel count of the default configuration
    pub channels: u16,
    /// Whether the host picks this device when none is configured
    pub is_default: bool,
}

impl DeviceInfo {
    pub fn new(
        name: String,
        direction: DeviceDirection,
        default_sample_rate: u32,
        channels: u16,
    ) -> Self {
        Self {
            name,
            direction,
            default_sample_rate,
            channels,
            is_default: false,
        }
    }

    /// Marks the entry as the host default.
    pub fn as_default(mut self) -> Self {
        self.is_default = true;
        self
    }

    /// Returns a string representation of the sample rate
    pub fn sample_rate_string(&self) -> String {
        format!("{} Hz", self.default_sample_rate)
    }

    /// True if the device runs natively at `sample_rate`, so no host resampling happens.
    pub fn matches_rate(&self, sample_rate: u32) -> bool {
        self.default_sample_rate == sample_rate
    }
}

impl fmt::Display for DeviceInfo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "[{}] {} ({}, {} ch){}",
            self.direction,
            self.name,
            self.sample_rate_string(),
            self.channels,
            if self.is_default { " *default*" } else { "" }
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_device_info_creation() {
        let info = DeviceInfo::new("Test Microphone".to_string(), DeviceDirection::Input, 48000, 2);

        assert_eq!(info.name, "Test Microphone");
        assert_eq!(info.direction, DeviceDirection::Input);
        assert_eq!(info.default_sample_rate, 48000);
        assert!(!info.is_default);
        assert!(info.as_default().is_default);
    }

    #[test]
    fn test_sample_rate_string() {
        let info = DeviceInfo::new("Test".to_string(), DeviceDirection::Output, 24000, 1);
        assert_eq!(info.sample_rate_string(), "24000 Hz");
        assert!(info.matches_rate(24000));
        assert!(!info.matches_rate(48000));
    }

    #[test]
    fn test_display() {
        let info = DeviceInfo::new("Speakers".to_string(), DeviceDirection::Output, 48000, 2)
            .as_default();
        assert_eq!(info.to_string(), "[output] Speakers (48000 Hz, 2 ch) *default*");
    }
}
