//! Coarse tempo estimation
//!
//! # Algorithm
//!
//! 1. Onset envelope: RMS of 2048-sample frames at a 512-sample hop
//! 2. Autocorrelate the envelope over the lags that correspond to 60-180 BPM:
//!    `ACF[lag] = sum(env[i] * env[i + lag])` over the valid overlap
//! 3. The lag with the largest sum wins (earliest lag on ties)
//! 4. `BPM = round(60 * sample_rate / (lag * hop_size))`
//!
//! # Limitations
//!
//! The envelope is not mean-removed and the sums are not normalized by the
//! overlap length, so shorter lags collect more terms and dense material
//! drifts toward the fast end of the range. Strong low-frequency transients
//! dominate the RMS envelope. Resolution is one integer lag (no sub-beat
//! refinement). The estimate is a hint for tempo normalization, not a
//! beat tracker.

use crate::error::ScanError;
use crate::preprocessing::normalization::rms;

/// Onset envelope frame size
pub const TEMPO_FRAME_SIZE: usize = 2048;

/// Onset envelope hop size
pub const TEMPO_HOP_SIZE: usize = 512;

/// Slowest tempo considered
pub const MIN_BPM: f32 = 60.0;

/// Fastest tempo considered
pub const MAX_BPM: f32 = 180.0;

/// Tempo estimate with the autocorrelation evidence behind it
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TempoEstimate {
    /// Rounded tempo in BPM
    pub bpm: f32,
    /// Winning lag in envelope frames
    pub lag: usize,
    /// Autocorrelation sum at the winning lag
    pub correlation: f32,
}

/// Per-frame RMS envelope
///
/// Returns one value per full frame; empty when the signal is shorter than
/// one frame.
pub fn onset_envelope(samples: &[f32], frame_size: usize, hop_size: usize) -> Vec<f32> {
    if frame_size == 0 || hop_size == 0 || samples.len() < frame_size {
        return Vec::new();
    }

    let num_frames = (samples.len() - frame_size) / hop_size + 1;
    (0..num_frames)
        .map(|i| {
            let start = i * hop_size;
            rms(&samples[start..start + frame_size])
        })
        .collect()
}

/// Estimate tempo in BPM
///
/// # Errors
///
/// `ScanError::InsufficientAudio` when the envelope is too short to cover the
/// smallest lag (about 0.35 s at 44.1 kHz); `ScanError::InvalidInput` for a
/// zero sample rate.
///
/// # Example
///
/// ```no_run
/// use beatscan::features::tempo::estimate_tempo;
///
/// let samples = vec![0.0f32; 44100 * 10];
/// let bpm = estimate_tempo(&samples, 44100)?;
/// assert!((60.0..=180.0).contains(&bpm));
/// # Ok::<(), beatscan::ScanError>(())
/// ```
pub fn estimate_tempo(samples: &[f32], sample_rate: u32) -> Result<f32, ScanError> {
    estimate_tempo_detailed(samples, sample_rate).map(|e| e.bpm)
}

/// Estimate tempo and return the winning lag and correlation
pub fn estimate_tempo_detailed(samples: &[f32], sample_rate: u32) -> Result<TempoEstimate, ScanError> {
    if sample_rate == 0 {
        return Err(ScanError::InvalidInput("Invalid sample rate: 0".to_string()));
    }

    let frames_per_minute = 60.0 * sample_rate as f32 / TEMPO_HOP_SIZE as f32;
    let lag_min = (frames_per_minute / MAX_BPM).ceil() as usize;
    let lag_max = (frames_per_minute / MIN_BPM).floor() as usize;

    let envelope = onset_envelope(samples, TEMPO_FRAME_SIZE, TEMPO_HOP_SIZE);

    if envelope.len() <= lag_min {
        return Err(ScanError::InsufficientAudio {
            required: TEMPO_FRAME_SIZE + lag_min * TEMPO_HOP_SIZE,
            actual: samples.len(),
        });
    }

    let lag_max = lag_max.min(envelope.len() - 1);

    let mut best_lag = lag_min;
    let mut best_correlation = f32::NEG_INFINITY;

    for lag in lag_min..=lag_max {
        let correlation: f32 = envelope[..envelope.len() - lag]
            .iter()
            .zip(&envelope[lag..])
            .map(|(a, b)| a * b)
            .sum();

        if correlation > best_correlation {
            best_correlation = correlation;
            best_lag = lag;
        }
    }

    let bpm = (frames_per_minute / best_lag as f32).round();

    log::debug!(
        "Tempo estimate: {} BPM (lag {} of [{}, {}], correlation {:.4})",
        bpm,
        best_lag,
        lag_min,
        lag_max,
        best_correlation
    );

    Ok(TempoEstimate {
        bpm,
        lag: best_lag,
        correlation: best_correlation,
    })
}
