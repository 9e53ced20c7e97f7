//! Channel mixing utilities (multichannel to mono conversion)

use crate::error::ScanError;

/// Average interleaved channels into a mono signal
///
/// # Arguments
///
/// * `samples` - Interleaved samples (`frame0_ch0, frame0_ch1, ...`)
/// * `channels` - Number of interleaved channels
///
/// # Returns
///
/// One sample per frame, the arithmetic mean of that frame's channels. A
/// trailing partial frame is dropped.
pub fn mix_to_mono(samples: &[f32], channels: usize) -> Result<Vec<f32>, ScanError> {
    if channels == 0 {
        return Err(ScanError::InvalidInput("Channel count must be > 0".to_string()));
    }

    if channels == 1 {
        return Ok(samples.to_vec());
    }

    log::debug!(
        "Mixing {} interleaved samples from {} channels to mono",
        samples.len(),
        channels
    );

    let scale = 1.0 / channels as f32;
    Ok(samples
        .chunks_exact(channels)
        .map(|frame| frame.iter().sum::<f32>() * scale)
        .collect())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_stereo_average() {
        let interleaved = vec![1.0, 0.0, 0.5, 0.5, -1.0, 1.0];
        let mono = mix_to_mono(&interleaved, 2).unwrap();
        assert_eq!(mono, vec![0.5, 0.5, 0.0]);
    }

    #[test]
    fn test_mono_passthrough() {
        let samples = vec![0.1, 0.2, 0.3];
        assert_eq!(mix_to_mono(&samples, 1).unwrap(), samples);
    }

    #[test]
    fn test_partial_frame_dropped() {
        let interleaved = vec![0.3, 0.3, 0.3, 0.9, 0.9];
        let mono = mix_to_mono(&interleaved, 3).unwrap();
        assert_eq!(mono.len(), 1);
        assert!((mono[0] - 0.3).abs() < 1e-6);
    }

    #[test]
    fn test_zero_channels_rejected() {
        assert!(mix_to_mono(&[0.0], 0).is_err());
    }
}
