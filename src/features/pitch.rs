//! Coarse pitch-offset estimation
//!
//! The fundamental is approximated from the zero-crossing rate
//! (`f0 = ZCR * sample_rate / 2`) and expressed in semitones relative to
//! A4 = 440 Hz. Harmonics, noise and percussion all raise the crossing rate,
//! so the value is a bias hint for pitch normalization, not a pitch tracker.

use crate::preprocessing::quality::zero_crossing_rate;

/// Reference pitch (A4)
pub const REFERENCE_HZ: f32 = 440.0;

/// Zero-crossing estimate of the fundamental frequency in Hz
pub fn estimate_fundamental(samples: &[f32], sample_rate: u32) -> f32 {
    zero_crossing_rate(samples) * sample_rate as f32 / 2.0
}

/// Semitone offset of the estimated fundamental from 440 Hz
///
/// Returns 0.0 when the signal never crosses zero.
///
/// # Example
///
/// ```
/// use beatscan::features::pitch::estimate_pitch_shift;
///
/// let tone: Vec<f32> = (0..44100)
///     .map(|i| (2.0 * std::f32::consts::PI * 880.0 * i as f32 / 44100.0).sin())
///     .collect();
/// let semitones = estimate_pitch_shift(&tone, 44100);
/// assert!((semitones - 12.0).abs() < 0.1);
/// ```
pub fn estimate_pitch_shift(samples: &[f32], sample_rate: u32) -> f32 {
    let f0 = estimate_fundamental(samples, sample_rate);
    if f0 <= 0.0 {
        return 0.0;
    }

    let semitones = 12.0 * (f0 / REFERENCE_HZ).log2();
    log::debug!("Pitch estimate: f0 ~{:.1} Hz, {:+.2} semitones", f0, semitones);
    semitones
}
