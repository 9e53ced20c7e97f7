//! Tempo and pitch normalization by linear resampling
//!
//! Both operations read the input at a constant fractional step and
//! interpolate linearly. Changing tempo this way also shifts pitch, and
//! shifting pitch also changes duration; matching only needs both sides
//! brought to the same reference, not a transparent time stretch.

use std::borrow::Cow;

use crate::error::ScanError;
use crate::preprocessing::resample::stretch_by_factor;

/// Resample from `from_bpm` to `to_bpm`
///
/// Reads the input `to_bpm / from_bpm` times faster. A factor of exactly 1.0
/// borrows the input unchanged.
///
/// # Errors
///
/// `ScanError::InvalidInput` for non-positive or non-finite tempos.
pub fn normalize_tempo(samples: &[f32], from_bpm: f32, to_bpm: f32) -> Result<Cow<'_, [f32]>, ScanError> {
    if !(from_bpm.is_finite() && to_bpm.is_finite()) || from_bpm <= 0.0 || to_bpm <= 0.0 {
        return Err(ScanError::InvalidInput(format!(
            "Invalid tempo normalization: {} -> {} BPM",
            from_bpm, to_bpm
        )));
    }

    let factor = to_bpm as f64 / from_bpm as f64;
    Ok(apply_factor(samples, factor))
}

/// Shift pitch by `semitones` (positive raises)
///
/// Reads the input `2^(semitones / 12)` times faster; zero semitones borrows
/// the input unchanged.
pub fn normalize_pitch(samples: &[f32], semitones: f32) -> Cow<'_, [f32]> {
    let factor = 2f64.powf(semitones as f64 / 12.0);
    apply_factor(samples, factor)
}

fn apply_factor(samples: &[f32], factor: f64) -> Cow<'_, [f32]> {
    if factor == 1.0 {
        return Cow::Borrowed(samples);
    }

    log::debug!("Stretching {} samples by factor {:.4}", samples.len(), factor);
    Cow::Owned(stretch_by_factor(samples, factor))
}
