//! Canonical 16-bit PCM WAV framing
//!
//! Produces the 44-byte `RIFF/WAVE/fmt /data` layout the fingerprint oracle
//! expects: PCM format tag 1, one channel, 16 bits per sample, little-endian.

use std::io::Cursor;

use crate::error::ScanError;

/// Size of the canonical header preceding the sample data
pub const WAV_HEADER_LEN: usize = 44;

/// Quantize one sample to 16-bit after clamping to [-1.0, 1.0]
#[inline]
pub fn quantize_sample(sample: f32) -> i16 {
    (sample.clamp(-1.0, 1.0) * i16::MAX as f32).round() as i16
}

/// Encode mono samples as a 16-bit PCM WAV file
///
/// # Arguments
///
/// * `samples` - Mono samples; values outside [-1.0, 1.0] are clamped
/// * `sample_rate` - Sample rate declared in the `fmt ` chunk
///
/// # Returns
///
/// Complete file bytes: header followed by `2 * samples.len()` data bytes
pub fn encode_wav(samples: &[f32], sample_rate: u32) -> Result<Vec<u8>, ScanError> {
    if sample_rate == 0 {
        return Err(ScanError::InvalidInput("Invalid sample rate: 0".to_string()));
    }

    let spec = hound::WavSpec {
        channels: 1,
        sample_rate,
        bits_per_sample: 16,
        sample_format: hound::SampleFormat::Int,
    };

    let mut cursor = Cursor::new(Vec::with_capacity(WAV_HEADER_LEN + samples.len() * 2));
    {
        let mut writer = hound::WavWriter::new(&mut cursor, spec)?;
        for &sample in samples {
            writer.write_sample(quantize_sample(sample))?;
        }
        writer.finalize()?;
    }

    Ok(cursor.into_inner())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn read_u32(bytes: &[u8], offset: usize) -> u32 {
        u32::from_le_bytes([
            bytes[offset],
            bytes[offset + 1],
            bytes[offset + 2],
            bytes[offset + 3],
        ])
    }

    fn read_u16(bytes: &[u8], offset: usize) -> u16 {
        u16::from_le_bytes([bytes[offset], bytes[offset + 1]])
    }

    #[test]
    fn test_canonical_header() {
        let samples = vec![0.25f32; 1000];
        let bytes = encode_wav(&samples, 44100).unwrap();

        assert_eq!(bytes.len(), WAV_HEADER_LEN + 2000);
        assert_eq!(&bytes[0..4], b"RIFF");
        assert_eq!(read_u32(&bytes, 4), 36 + 2000);
        assert_eq!(&bytes[8..12], b"WAVE");
        assert_eq!(&bytes[12..16], b"fmt ");
        assert_eq!(read_u32(&bytes, 16), 16);
        assert_eq!(read_u16(&bytes, 20), 1); // PCM
        assert_eq!(read_u16(&bytes, 22), 1); // mono
        assert_eq!(read_u32(&bytes, 24), 44100);
        assert_eq!(read_u32(&bytes, 28), 88200); // byte rate
        assert_eq!(read_u16(&bytes, 32), 2); // block align
        assert_eq!(read_u16(&bytes, 34), 16);
        assert_eq!(&bytes[36..40], b"data");
        assert_eq!(read_u32(&bytes, 40), 2000);
    }

    #[test]
    fn test_clamping() {
        assert_eq!(quantize_sample(2.0), i16::MAX);
        assert_eq!(quantize_sample(-2.0), -i16::MAX);
        assert_eq!(quantize_sample(0.0), 0);

        let bytes = encode_wav(&[1.5, -1.5], 44100).unwrap();
        let first = i16::from_le_bytes([bytes[44], bytes[45]]);
        let second = i16::from_le_bytes([bytes[46], bytes[47]]);
        assert_eq!(first, i16::MAX);
        assert_eq!(second, -i16::MAX);
    }

    #[test]
    fn test_zero_sample_rate_rejected() {
        assert!(encode_wav(&[0.0], 0).is_err());
    }
}
