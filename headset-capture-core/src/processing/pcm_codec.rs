//! Signed PCM ↔ normalized float conversion at 16 and 24 bits.
//!
//! Samples are little-endian. Normalization divides by `2^(bits-1)`, so the
//! most negative integer maps to exactly -1.0 and the most positive one to
//! slightly less than 1.0.

use crate::models::audio_models::BitDepth;
use crate::models::error::CaptureError;

/// Decode little-endian signed PCM into normalized `f32` samples.
///
/// A trailing partial sample is dropped.
pub fn pcm_to_float(bytes: &[u8], bit_depth: u16) -> Result<Vec<f32>, CaptureError> {
    let depth = BitDepth::from_bits(bit_depth)?;
    let width = depth.bytes_per_sample();
    let scale = depth.full_scale();

    let samples = bytes
        .chunks_exact(width)
        .map(|sample| decode_sample(depth, sample) as f32 / scale)
        .collect();
    Ok(samples)
}

/// Encode normalized samples as little-endian signed PCM.
///
/// Scaled values are clamped to the integer range before truncation, so
/// out-of-range input saturates instead of wrapping.
pub fn float_to_pcm(samples: &[f32], bit_depth: u16) -> Result<Vec<u8>, CaptureError> {
    let depth = BitDepth::from_bits(bit_depth)?;
    let width = depth.bytes_per_sample();
    let scale = depth.full_scale();
    let (min, max) = depth.range();

    let mut data = Vec::with_capacity(samples.len() * width);
    for &sample in samples {
        let scaled = (sample * scale).clamp(min as f32, max as f32);
        let value = scaled as i32;
        data.extend_from_slice(&value.to_le_bytes()[..width]);
    }
    Ok(data)
}

/// Callers pass exactly one sample's width of bytes.
fn decode_sample(depth: BitDepth, sample: &[u8]) -> i32 {
    match depth {
        BitDepth::Pcm16 => i16::from_le_bytes([sample[0], sample[1]]) as i32,
        BitDepth::Pcm24 => {
            let raw = sample[0] as i32 | (sample[1] as i32) << 8 | (sample[2] as i32) << 16;
            // sign-extend bit 23
            (raw << 8) >> 8
        }
    }
}

/// Number of whole samples in `byte_len` bytes.
pub fn sample_count(byte_len: usize, bit_depth: u16) -> Result<usize, CaptureError> {
    Ok(byte_len / BitDepth::from_bits(bit_depth)?.bytes_per_sample())
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn pcm24(value: i32) -> [u8; 3] {
        let b = value.to_le_bytes();
        [b[0], b[1], b[2]]
    }

    #[test]
    fn pcm16_known_values() {
        let bytes: Vec<u8> = [0i16, 16384, -16384, i16::MIN, i16::MAX]
            .iter()
            .flat_map(|v| v.to_le_bytes())
            .collect();

        let samples = pcm_to_float(&bytes, 16).unwrap();

        assert_eq!(samples.len(), 5);
        assert_eq!(samples[0], 0.0);
        assert_relative_eq!(samples[1], 0.5);
        assert_relative_eq!(samples[2], -0.5);
        assert_eq!(samples[3], -1.0);
        assert_relative_eq!(samples[4], 32767.0 / 32768.0);
    }

    #[test]
    fn pcm24_sign_extension() {
        let mut bytes = Vec::new();
        bytes.extend_from_slice(&pcm24(-1));
        bytes.extend_from_slice(&pcm24(-8_388_608));
        bytes.extend_from_slice(&pcm24(4_194_304));
        assert_eq!(&bytes[0..3], &[0xFF, 0xFF, 0xFF]);
        assert_eq!(&bytes[3..6], &[0x00, 0x00, 0x80]);

        let samples = pcm_to_float(&bytes, 24).unwrap();

        assert_relative_eq!(samples[0], -1.0 / 8_388_608.0);
        assert_eq!(samples[1], -1.0);
        assert_relative_eq!(samples[2], 0.5);
    }

    #[test]
    fn trailing_partial_sample_is_dropped() {
        let samples = pcm_to_float(&[0x00, 0x40, 0x7F], 16).unwrap();
        assert_eq!(samples.len(), 1);

        let samples = pcm_to_float(&[0x00, 0x00, 0x40, 0x01, 0x02], 24).unwrap();
        assert_eq!(samples.len(), 1);
        assert_eq!(sample_count(5, 24).unwrap(), 1);
    }

    #[test]
    fn unsupported_bit_depth() {
        assert_eq!(pcm_to_float(&[0, 0], 8), Err(CaptureError::UnsupportedFormat(8)));
        assert_eq!(float_to_pcm(&[0.0], 32), Err(CaptureError::UnsupportedFormat(32)));
    }

    #[test]
    fn float_to_pcm16_clamps() {
        let pcm = float_to_pcm(&[1.0, 2.0, -1.0, -3.0, 0.5], 16).unwrap();
        let values: Vec<i16> = pcm.chunks_exact(2).map(|b| i16::from_le_bytes([b[0], b[1]])).collect();
        assert_eq!(values, vec![i16::MAX, i16::MAX, i16::MIN, i16::MIN, 16384]);
    }

    #[test]
    fn float_to_pcm24_clamps() {
        let pcm = float_to_pcm(&[1.5, -1.5], 24).unwrap();
        assert_eq!(pcm.len(), 6);
        assert_eq!(decode_sample(BitDepth::Pcm24, &pcm[0..3]), 8_388_607);
        assert_eq!(decode_sample(BitDepth::Pcm24, &pcm[3..6]), -8_388_608);
    }

    #[test]
    fn pcm16_round_trip_every_value() {
        let bytes: Vec<u8> = (i16::MIN..=i16::MAX).flat_map(|v| v.to_le_bytes()).collect();

        let samples = pcm_to_float(&bytes, 16).unwrap();
        let back = float_to_pcm(&samples, 16).unwrap();

        assert_eq!(back, bytes);
    }

    #[test]
    fn pcm24_round_trip_within_one_lsb() {
        let mut values: Vec<i32> = (-8_388_608..=8_388_607).step_by(9973).collect();
        values.extend_from_slice(&[-8_388_608, -1, 0, 1, 8_388_607]);
        let bytes: Vec<u8> = values.iter().flat_map(|&v| pcm24(v)).collect();

        let samples = pcm_to_float(&bytes, 24).unwrap();
        let back = float_to_pcm(&samples, 24).unwrap();

        for (i, &expected) in values.iter().enumerate() {
            let actual = decode_sample(BitDepth::Pcm24, &back[i * 3..i * 3 + 3]);
            assert!((actual - expected).abs() <= 1, "{} decoded as {}", expected, actual);
        }
    }

    #[test]
    fn normalized_samples_stay_in_range() {
        let bytes: Vec<u8> = [i16::MIN, i16::MAX].iter().flat_map(|v| v.to_le_bytes()).collect();
        for s in pcm_to_float(&bytes, 16).unwrap() {
            assert!((-1.0..=1.0).contains(&s));
        }
    }
}
