//! Audio device detection and enumeration.
//!
//! Queries the default cpal host for every input and output device and
//! the native configuration it reports.

use super::device::find_device;
use super::info::{DeviceDirection, DeviceInfo};
use crate::error::{MediaError, Result};
use cpal::traits::{DeviceTrait, HostTrait};
use logging::Logger;

/// Audio device detection and enumeration
pub struct AudioDetection;

impl AudioDetection {
    /// Lists all input and output devices of the default host.
    ///
    /// Devices whose default configuration cannot be queried are skipped
    /// with a warning.
    ///
    /// # Errors
    /// `DeviceUnavailable` if the host refuses to enumerate devices.
    pub fn list_devices(logger: &Logger) -> Result<Vec<DeviceInfo>> {
        logger.info("Scanning for available audio devices...");
        let host = cpal::default_host();

        let mut devices = Vec::new();
        for direction in [DeviceDirection::Input, DeviceDirection::Output] {
            devices.extend(Self::list_direction(&host, direction, logger)?);
        }

        if devices.is_empty() {
            logger.warn("No audio devices detected");
        } else {
            logger.info(&format!("Found {} audio device(s)", devices.len()));
        }
        Ok(devices)
    }

    fn list_direction(
        host: &cpal::Host,
        direction: DeviceDirection,
        logger: &Logger,
    ) -> Result<Vec<DeviceInfo>> {
        let default_name = find_device(host, None, direction)
            .ok()
            .and_then(|d| d.name().ok());

        let devices = match direction {
            DeviceDirection::Input => host.input_devices(),
            DeviceDirection::Output => host.output_devices(),
        }
        .map_err(|e| MediaError::DeviceUnavailable(format!("Failed to enumerate devices: {}", e)))?;

        let mut found = Vec::new();
        for device in devices {
            let Ok(name) = device.name() else {
                continue;
            };
            let config = match direction {
                DeviceDirection::Input => device.default_input_config(),
                DeviceDirection::Output => device.default_output_config(),
            };
            let config = match config {
                Ok(config) => config,
                Err(e) => {
                    logger.warn(&format!("Skipping {} device {}: {}", direction, name, e));
                    continue;
                }
            };

            logger.debug(&format!("Found {} device: {}", direction, name));
            let mut info = DeviceInfo::new(
                name,
                direction,
                config.sample_rate().0,
                config.channels(),
            );
            if default_name.as_deref() == Some(info.name.as_str()) {
                info = info.as_default();
            }
            found.push(info);
        }
        Ok(found)
    }

    /// Checks if a device with the given name exists.
    pub fn is_available(name: &str, direction: DeviceDirection, logger: &Logger) -> bool {
        logger.debug(&format!("Checking availability of {} device {}", direction, name));
        find_device(&cpal::default_host(), Some(name), direction).is_ok()
    }

    /// Gets information about the default device for `direction`.
    pub fn get_default_device(direction: DeviceDirection, logger: &Logger) -> Result<DeviceInfo> {
        Self::list_devices(logger)?
            .into_iter()
            .find(|d| d.direction == direction && d.is_default)
            .ok_or_else(|| {
                MediaError::DeviceUnavailable(format!("No default {} device found", direction))
            })
    }
}
