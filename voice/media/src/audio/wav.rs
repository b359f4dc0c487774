//! Minimal WAV container encoding.
//!
//! Layout (all multi-byte fields little-endian):
//!
//! | offset | size | field                          |
//! |--------|------|--------------------------------|
//! | 0      | 4    | `RIFF`                         |
//! | 4      | 4    | chunk size = 36 + data size    |
//! | 8      | 4    | `WAVE`                         |
//! | 12     | 4    | `fmt `                         |
//! | 16     | 4    | 16 (fmt body length)           |
//! | 20     | 2    | 1 (PCM)                        |
//! | 22     | 2    | channel count                  |
//! | 24     | 4    | sample rate                    |
//! | 28     | 4    | byte rate                      |
//! | 32     | 2    | block align                    |
//! | 34     | 2    | bits per sample                |
//! | 36     | 4    | `data`                         |
//! | 40     | 4    | data size                      |
//! | 44     | n    | samples                        |

use super::frame::AudioSample;
use crate::error::{MediaError, Result};
use byteorder::{ByteOrder, LittleEndian};
use std::io::Write;
use std::time::Duration;

/// Size of the header written by [`WavSpec::encode`].
pub const HEADER_LEN: usize = 44;

const FORMAT_PCM: u16 = 1;
const FMT_BODY_LEN: u32 = 16;
const SUPPORTED_BITS: u16 = 16;

/// MIME label used when handing assets to an uploader.
pub const MIME_TYPE: &str = "audio/wav";
pub const EXTENSION: &str = "wav";

/// Format parameters of a PCM container.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WavSpec {
    pub sample_rate: u32,
    pub bits_per_sample: u16,
    pub channels: u16,
}

impl WavSpec {
    pub fn new(sample_rate: u32, bits_per_sample: u16, channels: u16) -> Self {
        Self {
            sample_rate,
            bits_per_sample,
            channels,
        }
    }

    /// 16-bit PCM at the given rate and channel count.
    pub fn pcm16(sample_rate: u32, channels: u16) -> Self {
        Self::new(sample_rate, SUPPORTED_BITS, channels)
    }

    pub fn block_align(&self) -> u16 {
        self.channels * self.bits_per_sample / 8
    }

    pub fn byte_rate(&self) -> u32 {
        self.sample_rate * self.block_align() as u32
    }

    fn validate(&self) -> Result<()> {
        if self.sample_rate == 0 {
            return Err(MediaError::InvalidAudioSpec("sample rate is zero".into()));
        }
        if self.channels == 0 {
            return Err(MediaError::InvalidAudioSpec("channel count is zero".into()));
        }
        if self.bits_per_sample == 0 {
            return Err(MediaError::InvalidAudioSpec("bits per sample is zero".into()));
        }
        if self.bits_per_sample != SUPPORTED_BITS {
            return Err(MediaError::InvalidAudioSpec(format!(
                "{} bits per sample not supported (only {})",
                self.bits_per_sample, SUPPORTED_BITS
            )));
        }
        Ok(())
    }

    /// Serializes interleaved samples into a complete container.
    ///
    /// # Errors
    /// `InvalidAudioSpec` when a field is zero or unsupported, `samples` is
    /// empty, its length is not a multiple of the channel count, or the
    /// payload would not fit the 32-bit size fields.
    pub fn encode(&self, samples: &[AudioSample]) -> Result<EncodedContainer> {
        self.validate()?;
        if samples.is_empty() {
            return Err(MediaError::InvalidAudioSpec("no samples to encode".into()));
        }
        if samples.len() % self.channels as usize != 0 {
            return Err(MediaError::InvalidAudioSpec(format!(
                "{} samples do not divide into {} channels",
                samples.len(),
                self.channels
            )));
        }

        let bytes_per_sample = (self.bits_per_sample / 8) as usize;
        let data_size = samples
            .len()
            .checked_mul(bytes_per_sample)
            .and_then(|n| u32::try_from(n).ok())
            .filter(|&n| n <= u32::MAX - 36)
            .ok_or_else(|| {
                MediaError::InvalidAudioSpec("payload exceeds container size limit".into())
            })?;

        let mut bytes = vec![0u8; HEADER_LEN + data_size as usize];
        self.write_header(&mut bytes[..HEADER_LEN], data_size);
        LittleEndian::write_i16_into(samples, &mut bytes[HEADER_LEN..]);

        Ok(EncodedContainer {
            bytes,
            spec: *self,
            data_size,
        })
    }

    fn write_header(&self, header: &mut [u8], data_size: u32) {
        let chunk_size = 4 + (8 + FMT_BODY_LEN) + (8 + data_size);

        header[0..4].copy_from_slice(b"RIFF");
        LittleEndian::write_u32(&mut header[4..8], chunk_size);
        header[8..12].copy_from_slice(b"WAVE");
        header[12..16].copy_from_slice(b"fmt ");
        LittleEndian::write_u32(&mut header[16..20], FMT_BODY_LEN);
        LittleEndian::write_u16(&mut header[20..22], FORMAT_PCM);
        LittleEndian::write_u16(&mut header[22..24], self.channels);
        LittleEndian::write_u32(&mut header[24..28], self.sample_rate);
        LittleEndian::write_u32(&mut header[28..32], self.byte_rate());
        LittleEndian::write_u16(&mut header[32..34], self.block_align());
        LittleEndian::write_u16(&mut header[34..36], self.bits_per_sample);
        header[36..40].copy_from_slice(b"data");
        LittleEndian::write_u32(&mut header[40..44], data_size);
    }
}

/// Encodes with explicit parameters, mirroring [`WavSpec::encode`].
pub fn encode(
    sample_rate: u32,
    bits_per_sample: u16,
    channels: u16,
    samples: &[AudioSample],
) -> Result<EncodedContainer> {
    WavSpec::new(sample_rate, bits_per_sample, channels).encode(samples)
}

/// A serialized container owned by the caller.
#[derive(Debug, Clone, PartialEq)]
pub struct EncodedContainer {
    bytes: Vec<u8>,
    spec: WavSpec,
    data_size: u32,
}

impl EncodedContainer {
    pub fn as_bytes(&self) -> &[u8] {
        &self.bytes
    }

    pub fn into_bytes(self) -> Vec<u8> {
        self.bytes
    }

    /// Total length: header plus payload.
    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }

    pub fn spec(&self) -> WavSpec {
        self.spec
    }

    pub fn data_size(&self) -> u32 {
        self.data_size
    }

    /// Playback length: payload bytes over byte rate.
    pub fn duration(&self) -> Duration {
        Duration::from_secs_f64(self.duration_secs())
    }

    pub fn duration_secs(&self) -> f64 {
        self.data_size as f64 / self.spec.byte_rate() as f64
    }

    pub fn mime_type(&self) -> &'static str {
        MIME_TYPE
    }

    pub fn extension(&self) -> &'static str {
        EXTENSION
    }

    pub fn write_to<W: Write>(&self, writer: &mut W) -> Result<()> {
        writer.write_all(&self.bytes)?;
        Ok(())
    }
}

/// Header fields read back from a container.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WavHeader {
    pub format_tag: u16,
    pub channels: u16,
    pub sample_rate: u32,
    pub byte_rate: u32,
    pub block_align: u16,
    pub bits_per_sample: u16,
    pub chunk_size: u32,
    pub data_size: u32,
}

impl WavHeader {
    /// Parses the fixed 44-byte layout and checks it against the buffer.
    ///
    /// # Errors
    /// `InvalidAudioSpec` on a short buffer, wrong chunk tags, a non-PCM
    /// format, or a declared data length that differs from the bytes present.
    pub fn parse(bytes: &[u8]) -> Result<Self> {
        if bytes.len() < HEADER_LEN {
            return Err(MediaError::InvalidAudioSpec(format!(
                "container is {} bytes, header needs {}",
                bytes.len(),
                HEADER_LEN
            )));
        }
        for (range, tag) in [(0..4, b"RIFF"), (8..12, b"WAVE"), (12..16, b"fmt "), (36..40, b"data")]
        {
            if &bytes[range.clone()] != tag {
                return Err(MediaError::InvalidAudioSpec(format!(
                    "expected '{}' at offset {}",
                    String::from_utf8_lossy(tag),
                    range.start
                )));
            }
        }

        let header = Self {
            chunk_size: LittleEndian::read_u32(&bytes[4..8]),
            format_tag: LittleEndian::read_u16(&bytes[20..22]),
            channels: LittleEndian::read_u16(&bytes[22..24]),
            sample_rate: LittleEndian::read_u32(&bytes[24..28]),
            byte_rate: LittleEndian::read_u32(&bytes[28..32]),
            block_align: LittleEndian::read_u16(&bytes[32..34]),
            bits_per_sample: LittleEndian::read_u16(&bytes[34..36]),
            data_size: LittleEndian::read_u32(&bytes[40..44]),
        };

        if header.format_tag != FORMAT_PCM {
            return Err(MediaError::InvalidAudioSpec(format!(
                "format tag {} is not PCM",
                header.format_tag
            )));
        }
        let payload = bytes.len() - HEADER_LEN;
        if header.data_size as usize != payload {
            return Err(MediaError::InvalidAudioSpec(format!(
                "header declares {} data bytes, container holds {}",
                header.data_size, payload
            )));
        }
        Ok(header)
    }

    pub fn spec(&self) -> WavSpec {
        WavSpec::new(self.sample_rate, self.bits_per_sample, self.channels)
    }
}

/// Reads a 16-bit container back into its header and samples.
pub fn decode(bytes: &[u8]) -> Result<(WavHeader, Vec<AudioSample>)> {
    let header = WavHeader::parse(bytes)?;
    if header.bits_per_sample != SUPPORTED_BITS {
        return Err(MediaError::InvalidAudioSpec(format!(
            "{} bits per sample not supported",
            header.bits_per_sample
        )));
    }
    let payload = &bytes[HEADER_LEN..];
    if payload.len() % 2 != 0 {
        return Err(MediaError::InvalidAudioSpec("odd payload length".into()));
    }
    let mut samples = vec![0; payload.len() / 2];
    LittleEndian::read_i16_into(payload, &mut samples);
    Ok((header, samples))
}
