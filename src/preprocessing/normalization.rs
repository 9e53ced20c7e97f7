//! Peak normalization
//!
//! Scales a buffer so its largest absolute sample lands on a fixed target
//! (0.9 by default, leaving a little headroom before 16-bit quantization).
//!
//! # Example
//!
//! ```
//! use beatscan::preprocessing::normalization::peak_normalize;
//!
//! let mut samples = vec![0.25f32, -0.5, 0.1];
//! let report = peak_normalize(&mut samples, 0.9);
//! assert!((samples[1] + 0.9).abs() < 1e-6);
//! assert!((report.gain - 1.8).abs() < 1e-6);
//! ```

/// Outcome of a normalization pass
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct NormalizationReport {
    /// Maximum absolute sample before normalization
    pub peak_before: f32,
    /// Linear gain applied (1.0 when nothing changed)
    pub gain: f32,
}

/// Largest absolute sample value
pub fn peak_amplitude(samples: &[f32]) -> f32 {
    samples.iter().map(|&x| x.abs()).fold(0.0f32, f32::max)
}

/// Root mean square of the buffer (0.0 for an empty buffer)
pub fn rms(samples: &[f32]) -> f32 {
    if samples.is_empty() {
        return 0.0;
    }
    let sum_sq: f64 = samples.iter().map(|&x| x as f64 * x as f64).sum();
    (sum_sq / samples.len() as f64).sqrt() as f32
}

/// Normalize samples in place so the peak equals `target_peak`
///
/// An all-zero (or empty) buffer is left untouched and reports a gain of 1.0.
pub fn peak_normalize(samples: &mut [f32], target_peak: f32) -> NormalizationReport {
    let peak = peak_amplitude(samples);

    if peak == 0.0 {
        log::debug!("Peak normalization skipped: buffer is silent");
        return NormalizationReport {
            peak_before: 0.0,
            gain: 1.0,
        };
    }

    let gain = target_peak / peak;
    for sample in samples.iter_mut() {
        *sample *= gain;
    }

    log::debug!(
        "Peak normalization: peak={:.4}, target={:.2}, gain={:.4}",
        peak,
        target_peak,
        gain
    );

    NormalizationReport {
        peak_before: peak,
        gain,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sine(freq: f32, amplitude: f32, len: usize) -> Vec<f32> {
        (0..len)
            .map(|i| (2.0 * std::f32::consts::PI * freq * i as f32 / 44100.0).sin() * amplitude)
            .collect()
    }

    #[test]
    fn test_peak_reaches_target() {
        let mut samples = sine(440.0, 0.3, 44100);
        let report = peak_normalize(&mut samples, 0.9);

        assert!((peak_amplitude(&samples) - 0.9).abs() < 1e-4);
        assert!((report.peak_before - 0.3).abs() < 1e-3);
        assert!(report.gain > 2.9 && report.gain < 3.1);
    }

    #[test]
    fn test_renormalization_is_idempotent() {
        let mut samples = sine(220.0, 0.7, 22050);
        peak_normalize(&mut samples, 0.9);
        let first = samples.clone();

        let report = peak_normalize(&mut samples, 0.9);
        assert!((report.gain - 1.0).abs() < 1e-5, "gain was {}", report.gain);
        for (a, b) in first.iter().zip(samples.iter()) {
            assert!((a - b).abs() < 1e-5);
        }
    }

    #[test]
    fn test_silent_buffer_untouched() {
        let mut samples = vec![0.0f32; 1000];
        let report = peak_normalize(&mut samples, 0.9);
        assert_eq!(report.gain, 1.0);
        assert!(samples.iter().all(|&x| x == 0.0));
    }

    #[test]
    fn test_rms() {
        assert_eq!(rms(&[]), 0.0);
        assert!((rms(&[0.5, -0.5, 0.5, -0.5]) - 0.5).abs() < 1e-6);
    }

    #[test]
    fn test_rms_of_long_buffer() {
        // Four minutes at 44.1 kHz
        let samples = vec![0.9f32; 44100 * 240];
        let value = rms(&samples);
        assert!((value - 0.9).abs() < 1e-5, "rms {}", value);

        let window = vec![0.1f32; 44100];
        assert!((rms(&window) - 0.1).abs() < 1e-6);
    }
}
