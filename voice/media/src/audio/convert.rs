//! Conversion between normalized float samples and signed 16-bit PCM.
//!
//! Encoding is asymmetric: negative values scale by 32768 and non-negative
//! values by 32767, so `+1.0` lands on `i16::MAX` without overflowing.
//! Decoding divides by 32768 uniformly, which leaves positive full scale one
//! step short of `1.0`. That asymmetry is accepted, not corrected.

use super::frame::AudioSample;
use crate::error::{MediaError, Result};

const NEGATIVE_SCALE: f32 = 32768.0;
const POSITIVE_SCALE: f32 = 32767.0;
const DECODE_SCALE: f32 = 32768.0;

/// Quantizes one normalized sample.
///
/// Input is clamped to `[-1.0, 1.0]`; NaN becomes silence. Positive values
/// round up so that `to_f32(to_i16(s))` stays within 1/32768 of `s`.
#[inline]
pub fn to_i16(sample: f32) -> AudioSample {
    if sample.is_nan() {
        return 0;
    }
    let s = sample.clamp(-1.0, 1.0);
    if s < 0.0 {
        (s * NEGATIVE_SCALE).round() as i16
    } else {
        (s * POSITIVE_SCALE).ceil() as i16
    }
}

/// Expands one 16-bit sample to the normalized float range.
#[inline]
pub fn to_f32(sample: AudioSample) -> f32 {
    sample as f32 / DECODE_SCALE
}

/// Maps unsigned 16-bit device samples (midpoint 32768) to normalized floats.
#[inline]
pub fn u16_to_f32(sample: u16) -> f32 {
    (sample as i32 - 32768) as f32 / DECODE_SCALE
}

/// Converts a block of float samples. Empty input is rejected.
pub fn f32_to_i16(samples: &[f32]) -> Result<Vec<AudioSample>> {
    if samples.is_empty() {
        return Err(MediaError::InvalidFrame(
            "cannot convert an empty sample block".into(),
        ));
    }
    Ok(samples.iter().map(|&s| to_i16(s)).collect())
}

/// Converts a block of 16-bit samples. Empty input is rejected.
pub fn i16_to_f32(samples: &[AudioSample]) -> Result<Vec<f32>> {
    if samples.is_empty() {
        return Err(MediaError::InvalidFrame(
            "cannot convert an empty sample block".into(),
        ));
    }
    Ok(samples.iter().map(|&s| to_f32(s)).collect())
}

#[cfg(test)]
mod tests {
    use super::*;

    const LSB: f32 = 1.0 / 32768.0;

    #[test]
    fn test_full_scale_endpoints() {
        assert_eq!(to_i16(1.0), i16::MAX);
        assert_eq!(to_i16(-1.0), i16::MIN);
        assert_eq!(to_i16(0.0), 0);
        assert_eq!(to_i16(-0.0), 0);
    }

    #[test]
    fn test_clamps_out_of_range() {
        assert_eq!(to_i16(1.7), i16::MAX);
        assert_eq!(to_i16(-3.0), i16::MIN);
        assert_eq!(to_i16(f32::INFINITY), i16::MAX);
        assert_eq!(to_i16(f32::NAN), 0);
    }

    #[test]
    fn test_decode_divides_uniformly() {
        assert_eq!(to_f32(i16::MIN), -1.0);
        assert_eq!(to_f32(16384), 0.5);
        // Positive full scale stays one step short of 1.0.
        assert!((1.0 - to_f32(i16::MAX) - LSB).abs() < f32::EPSILON);
    }

    #[test]
    fn test_round_trip_within_one_step() {
        let steps = 200_000;
        for i in 0..=steps {
            let s = -1.0 + 2.0 * (i as f32 / steps as f32);
            let back = to_f32(to_i16(s));
            assert!(
                (back - s).abs() <= LSB + f32::EPSILON,
                "{} -> {} -> {}",
                s,
                to_i16(s),
                back
            );
        }
    }

    #[test]
    fn test_u16_midpoint_is_silence() {
        assert_eq!(u16_to_f32(32768), 0.0);
        assert_eq!(u16_to_f32(0), -1.0);
    }

    #[test]
    fn test_block_conversion_rejects_empty() {
        assert!(f32_to_i16(&[]).is_err());
        assert!(i16_to_f32(&[]).is_err());
        assert_eq!(f32_to_i16(&[0.5, -0.5]).unwrap(), vec![16384, -16384]);
    }
}
