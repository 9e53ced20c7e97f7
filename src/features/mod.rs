//! Feature extraction modules
//!
//! This module contains the tempo/pitch-invariant representations used for
//! matching:
//! - Tempo estimation (onset autocorrelation)
//! - Pitch offset estimation (zero-crossing rate)
//! - Tempo and pitch normalization (linear resampling)
//! - Spectral embeddings (mel band statistics)
//! - Sequence alignment (DTW)

pub mod dtw;
pub mod embedding;
pub mod mel;
pub mod pitch;
pub mod tempo;
pub mod time_stretch;

use std::borrow::Cow;

use serde::Serialize;

use crate::config::FeatureConfig;
use crate::error::ScanError;
use embedding::Embedding;
use tempo::{onset_envelope, TEMPO_FRAME_SIZE, TEMPO_HOP_SIZE};

/// Points in an onset contour
pub const CONTOUR_POINTS: usize = 64;

/// Features extracted from one segment
#[derive(Debug, Clone, Serialize)]
pub struct SegmentFeatures {
    /// Native tempo estimate, `None` when the segment is too short
    pub bpm: Option<f32>,
    /// Pitch offset from A440 in semitones
    pub pitch_semitones: f32,
    /// Embedding of the normalized segment
    pub embedding: Option<Embedding>,
    /// Z-normalized onset envelope resampled to [`CONTOUR_POINTS`] values
    pub contour: Vec<f32>,
}

/// Onset envelope resampled to `CONTOUR_POINTS` and z-normalized
///
/// Empty when the signal is shorter than one envelope frame.
pub fn onset_contour(samples: &[f32]) -> Vec<f32> {
    let envelope = onset_envelope(samples, TEMPO_FRAME_SIZE, TEMPO_HOP_SIZE);
    dtw::znormalize(&dtw::resample_contour(&envelope, CONTOUR_POINTS))
}

/// Extract matching features from a segment
///
/// The segment is stretched to `config.reference_bpm` when its tempo can be
/// estimated, optionally shifted back to A440, then embedded.
///
/// # Errors
///
/// `ScanError::InsufficientAudio` if embeddings are enabled and the segment
/// is shorter than one embedding frame.
pub fn extract_segment_features(
    samples: &[f32],
    sample_rate: u32,
    config: &FeatureConfig,
) -> Result<SegmentFeatures, ScanError> {
    let bpm = match tempo::estimate_tempo(samples, sample_rate) {
        Ok(bpm) => Some(bpm),
        Err(e) => {
            log::debug!("No tempo estimate for segment: {}", e);
            None
        }
    };

    let mut normalized: Cow<'_, [f32]> = match (bpm, config.reference_bpm) {
        (Some(from), Some(to)) => time_stretch::normalize_tempo(samples, from, to)?,
        _ => Cow::Borrowed(samples),
    };

    let pitch_semitones = pitch::estimate_pitch_shift(&normalized, sample_rate);
    if config.normalize_pitch && pitch_semitones != 0.0 {
        normalized = Cow::Owned(time_stretch::normalize_pitch(&normalized, -pitch_semitones).into_owned());
    }

    let embedding = if config.extract_embeddings {
        Some(embedding::extract_embedding_with(
            &normalized,
            sample_rate,
            &config.embedding,
        )?)
    } else {
        None
    };

    let contour = onset_contour(&normalized);

    Ok(SegmentFeatures {
        bpm,
        pitch_semitones,
        embedding,
        contour,
    })
}
