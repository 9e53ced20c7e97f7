//! Diagnostic quality scoring

use super::normalization::rms;

/// Fraction of adjacent sample pairs whose sign differs
pub fn zero_crossing_rate(samples: &[f32]) -> f32 {
    if samples.len() < 2 {
        return 0.0;
    }

    let crossings = samples
        .windows(2)
        .filter(|w| (w[0] >= 0.0) != (w[1] >= 0.0))
        .count();

    crossings as f32 / samples.len() as f32
}

/// Score a preprocessed buffer in [0, 1]
///
/// Mean of an energy term (`RMS * 10`, capped at 1) and a complexity term
/// (`ZCR * 100`, capped at 1). Reported only; never used to reject input.
pub fn quality_score(samples: &[f32]) -> f32 {
    let energy = (rms(samples) * 10.0).min(1.0);
    let complexity = (zero_crossing_rate(samples) * 100.0).min(1.0);
    (energy + complexity) / 2.0
}
