//! cpal-backed audio devices.
//!
//! `CpalInput` and `CpalOutput` open the host's devices by name (or the
//! default) and adapt whatever sample format the device offers to the f32
//! callbacks of the `AudioInput`/`AudioOutput` traits.

use super::config::AudioConfig;
use super::convert;
use super::info::DeviceDirection;
use super::traits::{
    ActiveStream, AudioInput, AudioOutput, ErrorCallback, InputCallback, OutputCallback,
};
use crate::error::{MediaError, Result};
use cpal::traits::{DeviceTrait, HostTrait, StreamTrait};
use logging::Logger;

/// A running cpal stream. Dropping it stops the stream and closes the device.
pub struct CpalStream {
    _stream: cpal::Stream,
    name: String,
}

impl ActiveStream for CpalStream {
    fn device_name(&self) -> &str {
        &self.name
    }
}

/// Resolves a device by name, or the host default when `wanted` is `None`.
pub(crate) fn find_device(
    host: &cpal::Host,
    wanted: Option<&str>,
    direction: DeviceDirection,
) -> Result<cpal::Device> {
    let Some(wanted) = wanted else {
        let device = match direction {
            DeviceDirection::Input => host.default_input_device(),
            DeviceDirection::Output => host.default_output_device(),
        };
        return device.ok_or_else(|| {
            MediaError::DeviceUnavailable(format!("No default {} device available", direction))
        });
    };

    let devices = match direction {
        DeviceDirection::Input => host.input_devices(),
        DeviceDirection::Output => host.output_devices(),
    }
    .map_err(|e| MediaError::DeviceUnavailable(format!("Failed to enumerate devices: {}", e)))?;

    for device in devices {
        if device.name().map(|name| name == wanted).unwrap_or(false) {
            return Ok(device);
        }
    }
    Err(MediaError::DeviceUnavailable(format!(
        "{} device '{}' not found",
        direction, wanted
    )))
}

/// Stream parameters at the session rate with the device's native channel count.
fn stream_config(
    device: &cpal::Device,
    config: &AudioConfig,
    direction: DeviceDirection,
) -> Result<(cpal::StreamConfig, cpal::SampleFormat)> {
    let default = match direction {
        DeviceDirection::Input => device.default_input_config(),
        DeviceDirection::Output => device.default_output_config(),
    }
    .map_err(|e| MediaError::DeviceUnavailable(format!("Failed to get default config: {}", e)))?;

    let stream_config = cpal::StreamConfig {
        channels: default.channels(),
        sample_rate: cpal::SampleRate(config.sample_rate),
        buffer_size: cpal::BufferSize::Default,
    };
    Ok((stream_config, default.sample_format()))
}

/// Microphone on the default cpal host
pub struct CpalInput {
    host: cpal::Host,
    logger: Logger,
}

impl CpalInput {
    pub fn new(logger: &Logger) -> Self {
        Self {
            host: cpal::default_host(),
            logger: logger.for_component("CpalInput"),
        }
    }
}

impl AudioInput for CpalInput {
    fn open(
        &mut self,
        config: &AudioConfig,
        mut on_data: InputCallback,
        mut on_error: ErrorCallback,
    ) -> Result<Box<dyn ActiveStream>> {
        let device = find_device(
            &self.host,
            config.input_device.as_deref(),
            DeviceDirection::Input,
        )?;
        let name = device.name().unwrap_or_default();
        let (stream_config, format) = stream_config(&device, config, DeviceDirection::Input)?;
        let channels = stream_config.channels;

        self.logger.info(&format!(
            "Input format: {:?}, {} Hz, {} channels",
            format, stream_config.sample_rate.0, channels
        ));

        let error_fn = move |err: cpal::StreamError| on_error(err.to_string());
        let mut scratch: Vec<f32> = Vec::with_capacity(config.period_samples() * 2);

        let stream = match format {
            cpal::SampleFormat::F32 => device.build_input_stream(
                &stream_config,
                move |data: &[f32], _: &cpal::InputCallbackInfo| on_data(data, channels),
                error_fn,
                None,
            ),
            cpal::SampleFormat::I16 => device.build_input_stream(
                &stream_config,
                move |data: &[i16], _: &cpal::InputCallbackInfo| {
                    scratch.clear();
                    scratch.extend(data.iter().map(|&s| convert::to_f32(s)));
                    on_data(&scratch, channels);
                },
                error_fn,
                None,
            ),
            cpal::SampleFormat::U16 => device.build_input_stream(
                &stream_config,
                move |data: &[u16], _: &cpal::InputCallbackInfo| {
                    scratch.clear();
                    scratch.extend(data.iter().map(|&s| convert::u16_to_f32(s)));
                    on_data(&scratch, channels);
                },
                error_fn,
                None,
            ),
            other => {
                return Err(MediaError::DeviceUnavailable(format!(
                    "Unsupported input sample format {:?}",
                    other
                )));
            }
        }
        .map_err(|e| MediaError::DeviceUnavailable(format!("Failed to build input stream: {}", e)))?;

        stream
            .play()
            .map_err(|e| MediaError::DeviceUnavailable(format!("Failed to start input stream: {}", e)))?;

        self.logger.info(&format!("Input stream started on {}", name));
        Ok(Box::new(CpalStream {
            _stream: stream,
            name,
        }))
    }
}

/// Speaker on the default cpal host
pub struct CpalOutput {
    host: cpal::Host,
    logger: Logger,
}

impl CpalOutput {
    pub fn new(logger: &Logger) -> Self {
        Self {
            host: cpal::default_host(),
            logger: logger.for_component("CpalOutput"),
        }
    }
}

impl AudioOutput for CpalOutput {
    fn open(
        &mut self,
        config: &AudioConfig,
        mut on_render: OutputCallback,
        mut on_error: ErrorCallback,
    ) -> Result<Box<dyn ActiveStream>> {
        let device = find_device(
            &self.host,
            config.output_device.as_deref(),
            DeviceDirection::Output,
        )?;
        let name = device.name().unwrap_or_default();
        let (stream_config, format) = stream_config(&device, config, DeviceDirection::Output)?;
        let channels = stream_config.channels;

        self.logger.info(&format!(
            "Output format: {:?}, {} Hz, {} channels",
            format, stream_config.sample_rate.0, channels
        ));
        if channels != config.channel_count {
            self.logger.warn(&format!(
                "Channel mismatch: stream {}, device {}",
                config.channel_count, channels
            ));
        }

        let error_fn = move |err: cpal::StreamError| on_error(err.to_string());
        let mut scratch: Vec<f32> = Vec::with_capacity(config.period_samples() * 2);

        let stream = match format {
            cpal::SampleFormat::F32 => device.build_output_stream(
                &stream_config,
                move |data: &mut [f32], _: &cpal::OutputCallbackInfo| on_render(data, channels),
                error_fn,
                None,
            ),
            cpal::SampleFormat::I16 => device.build_output_stream(
                &stream_config,
                move |data: &mut [i16], _: &cpal::OutputCallbackInfo| {
                    scratch.resize(data.len(), 0.0);
                    on_render(&mut scratch, channels);
                    for (dst, &src) in data.iter_mut().zip(scratch.iter()) {
                        *dst = convert::to_i16(src);
                    }
                },
                error_fn,
                None,
            ),
            cpal::SampleFormat::U16 => device.build_output_stream(
                &stream_config,
                move |data: &mut [u16], _: &cpal::OutputCallbackInfo| {
                    scratch.resize(data.len(), 0.0);
                    on_render(&mut scratch, channels);
                    for (dst, &src) in data.iter_mut().zip(scratch.iter()) {
                        *dst = (convert::to_i16(src) as i32 + 32768) as u16;
                    }
                },
                error_fn,
                None,
            ),
            other => {
                return Err(MediaError::DeviceUnavailable(format!(
                    "Unsupported output sample format {:?}",
                    other
                )));
            }
        }
        .map_err(|e| MediaError::DeviceUnavailable(format!("Failed to build output stream: {}", e)))?;

        stream
            .play()
            .map_err(|e| MediaError::DeviceUnavailable(format!("Failed to start output stream: {}", e)))?;

        self.logger.info(&format!("Output stream started on {}", name));
        Ok(Box::new(CpalStream {
            _stream: stream,
            name,
        }))
    }
}
