//! Sliding-window energy and uniqueness statistics

use crate::error::ScanError;
use crate::preprocessing::normalization::rms;

/// Statistics of one analysis window
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct WindowStats {
    /// First sample of the window
    pub start: usize,
    /// RMS energy
    pub energy: f32,
    /// Variance of the per-band energy sums
    pub uniqueness: f32,
}

/// Band-energy variance of a region
///
/// The region is split into `bands` equal contiguous chunks (any remainder is
/// ignored); each band's value is its sum of squared samples, and the result
/// is the population variance of those sums. This is a time-domain proxy for
/// spectral variety, not a spectral measurement.
pub fn band_energy_variance(samples: &[f32], bands: usize) -> f32 {
    if bands == 0 {
        return 0.0;
    }

    let chunk = samples.len() / bands;
    if chunk == 0 {
        return 0.0;
    }

    let sums: Vec<f64> = samples
        .chunks_exact(chunk)
        .take(bands)
        .map(|band| band.iter().map(|&x| x as f64 * x as f64).sum::<f64>())
        .collect();

    let mean = sums.iter().sum::<f64>() / sums.len() as f64;
    let variance = sums.iter().map(|&s| (s - mean) * (s - mean)).sum::<f64>() / sums.len() as f64;
    variance as f32
}

/// Compute statistics for every full window
///
/// # Arguments
///
/// * `samples` - Mono samples
/// * `window` - Window length in samples
/// * `hop` - Distance between window starts
/// * `bands` - Band count for the uniqueness proxy
///
/// # Errors
///
/// `ScanError::InsufficientAudio` when fewer than `window` samples exist;
/// `ScanError::InvalidInput` for a zero window or hop.
pub fn analyze_windows(
    samples: &[f32],
    window: usize,
    hop: usize,
    bands: usize,
) -> Result<Vec<WindowStats>, ScanError> {
    if window == 0 || hop == 0 {
        return Err(ScanError::InvalidInput(format!(
            "Window ({}) and hop ({}) must be > 0",
            window, hop
        )));
    }

    if samples.len() < window {
        return Err(ScanError::InsufficientAudio {
            required: window,
            actual: samples.len(),
        });
    }

    let count = (samples.len() - window) / hop + 1;
    let stats = (0..count)
        .map(|i| {
            let start = i * hop;
            let frame = &samples[start..start + window];
            WindowStats {
                start,
                energy: rms(frame),
                uniqueness: band_energy_variance(frame, bands),
            }
        })
        .collect();

    Ok(stats)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_uniform_signal_has_zero_variance() {
        let samples = vec![0.5f32; 3200];
        assert!(band_energy_variance(&samples, 32).abs() < 1e-6);
    }

    #[test]
    fn test_localized_burst_has_high_variance() {
        let mut samples = vec![0.0f32; 3200];
        for s in samples[0..100].iter_mut() {
            *s = 1.0;
        }
        // One band sums to 100, the other 31 to 0
        let expected = {
            let mean = 100.0 / 32.0;
            ((100.0f32 - mean).powi(2) + 31.0 * mean * mean) / 32.0
        };
        assert!((band_energy_variance(&samples, 32) - expected).abs() < 1e-3);
    }

    #[test]
    fn test_window_count_with_half_overlap() {
        let samples = vec![0.1f32; 44100 * 3];
        let stats = analyze_windows(&samples, 44100, 22050, 32).unwrap();
        assert_eq!(stats.len(), 5);
        assert_eq!(stats[4].start, 88200);
        assert!((stats[0].energy - 0.1).abs() < 1e-5);
    }

    #[test]
    fn test_too_short_for_one_window() {
        let samples = vec![0.1f32; 1000];
        assert!(matches!(
            analyze_windows(&samples, 44100, 22050, 32),
            Err(ScanError::InsufficientAudio { required: 44100, actual: 1000 })
        ));
    }

    #[test]
    fn test_long_uniform_region_keeps_zero_variance() {
        // Band sums of ~330k equal terms each
        let samples = vec![0.9f32; 44100 * 240];
        assert!(band_energy_variance(&samples, 32) < 1e-3);
    }

    #[test]
    fn test_tiny_region_variance_is_zero() {
        assert_eq!(band_energy_variance(&[1.0; 10], 32), 0.0);
        assert_eq!(band_energy_variance(&[1.0; 10], 0), 0.0);
    }
}
