//! Acoustic corroboration of weak candidates
//!
//! Candidates that only matched by text (or weakly by fingerprint) are
//! checked against the upload itself: the candidate's audio preview is
//! preprocessed like an upload, normalized to the same reference tempo and
//! compared with every analyzed segment.
//!
//! `score = 100 * (0.6 * sim + 0.4 / (1 + dtw))`
//!
//! where `dtw` is the aligned distance of the z-normalized onset contours and
//! `sim` the embedding profile correlation rescaled against a noise baseline:
//! `sim = max(0, (c - b) / (1 - b))` with `c` the correlation between segment
//! and preview and `b` the correlation between segment and white noise run
//! through the same feature pipeline. A preview unrelated to the segment thus
//! earns no embedding credit. The candidate's confidence becomes the mean of
//! its previous confidence and the best score.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use futures::future::join_all;
use reqwest::Client;
use tokio::sync::OnceCell;

use super::candidate::MatchCandidate;
use super::platforms::{check_status, http_client};
use super::PreparedSegment;
use crate::config::{FeatureConfig, PreprocessConfig, TARGET_SAMPLE_RATE};
use crate::error::{ScanError, SearchError};
use crate::features::{dtw, extract_segment_features, SegmentFeatures};
use crate::preprocessing::preprocess;

/// Weight of the embedding similarity in the score
const EMBEDDING_WEIGHT: f32 = 0.6;

/// Weight of the contour alignment in the score
const CONTOUR_WEIGHT: f32 = 0.4;

/// Length of the noise reference
const NOISE_SECONDS: f32 = 6.0;

/// Highest baseline still leaving room for a rescaled similarity
const MAX_BASELINE: f32 = 0.95;

/// Downloads candidate audio previews
#[async_trait]
pub trait PreviewFetcher: Send + Sync {
    /// Fetch the preview at `url`
    async fn fetch(&self, url: &str) -> Result<Vec<u8>, SearchError>;
}

/// [`PreviewFetcher`] over HTTP
pub struct HttpPreviewFetcher {
    client: Client,
}

impl HttpPreviewFetcher {
    /// Fetcher whose requests give up after `timeout`
    pub fn new(timeout: Duration) -> Result<Self, SearchError> {
        Ok(Self {
            client: http_client(timeout)?,
        })
    }
}

#[async_trait]
impl PreviewFetcher for HttpPreviewFetcher {
    async fn fetch(&self, url: &str) -> Result<Vec<u8>, SearchError> {
        let response = self.client.get(url).send().await?;
        let bytes = check_status(response).await?.bytes().await?;
        Ok(bytes.to_vec())
    }
}

/// Embedding profile correlation of two feature sets, floored at 0
///
/// 0.0 when either side has no embedding.
pub fn embedding_similarity(a: &SegmentFeatures, b: &SegmentFeatures) -> f32 {
    match (&a.embedding, &b.embedding) {
        (Some(ea), Some(eb)) => ea.profile_correlation(eb).max(0.0),
        _ => 0.0,
    }
}

/// Rescale `similarity` so that `baseline` maps to 0 and 1 stays 1
pub fn calibrate(similarity: f32, baseline: f32) -> f32 {
    let baseline = baseline.clamp(0.0, MAX_BASELINE);
    ((similarity - baseline) / (1.0 - baseline)).clamp(0.0, 1.0)
}

/// Similarity of two feature sets in [0, 100]
///
/// `baseline` is the embedding similarity `a` reaches against unrelated
/// noise; pass 0.0 to score the raw correlation. Missing embeddings
/// contribute no similarity; an empty contour on either side contributes no
/// alignment credit.
pub fn corroboration_score(a: &SegmentFeatures, b: &SegmentFeatures, baseline: f32) -> f32 {
    let similarity = calibrate(embedding_similarity(a, b), baseline);

    let alignment = if a.contour.is_empty() || b.contour.is_empty() {
        0.0
    } else {
        1.0 / (1.0 + dtw::align(&a.contour, &b.contour))
    };

    100.0 * (EMBEDDING_WEIGHT * similarity + CONTOUR_WEIGHT * alignment)
}

/// Deterministic uniform white noise peaking at `amplitude`
fn white_noise(len: usize, amplitude: f32) -> Vec<f32> {
    let mut state: u32 = 0x2545_f491;
    (0..len)
        .map(|_| {
            state = state.wrapping_mul(1_664_525).wrapping_add(1_013_904_223);
            ((state >> 8) as f32 / (1u32 << 23) as f32 - 1.0) * amplitude
        })
        .collect()
}

/// Re-scores weak candidates against the upload's segments
pub struct Corroborator {
    fetcher: Arc<dyn PreviewFetcher>,
    preprocess: PreprocessConfig,
    features: FeatureConfig,
    threshold: f32,
    noise: OnceCell<SegmentFeatures>,
}

impl Corroborator {
    /// Corroborate candidates below `threshold` using previews from `fetcher`
    pub fn new(
        fetcher: Arc<dyn PreviewFetcher>,
        preprocess: PreprocessConfig,
        features: FeatureConfig,
        threshold: f32,
    ) -> Self {
        Self {
            fetcher,
            preprocess,
            features,
            threshold,
            noise: OnceCell::new(),
        }
    }

    /// Update eligible candidates in place
    ///
    /// Eligible: below the threshold, with a preview URL, not yet
    /// corroborated. Any failure leaves the candidate untouched.
    pub async fn corroborate(&self, candidates: &mut [MatchCandidate], segments: &[PreparedSegment]) {
        let references: Vec<&SegmentFeatures> = segments.iter().filter_map(|s| s.features.as_ref()).collect();
        if references.is_empty() {
            return;
        }

        let jobs = candidates.iter().enumerate().filter_map(|(i, c)| {
            if c.confidence >= self.threshold || c.corroboration.is_some() {
                return None;
            }
            let url = c.preview_url.clone()?;
            Some(async move { (i, self.preview_features(&url).await) })
        });

        let results = join_all(jobs).await;
        if results.is_empty() {
            return;
        }

        let noise = self.noise_features().await;
        let baselines: Vec<f32> = references
            .iter()
            .map(|r| noise.map_or(0.0, |n| embedding_similarity(r, n)))
            .collect();
        log::debug!("Noise baselines: {:?}", baselines);

        for (i, result) in results {
            let candidate = &mut candidates[i];
            match result {
                Ok(preview) => {
                    let best = references
                        .iter()
                        .zip(&baselines)
                        .map(|(r, &baseline)| corroboration_score(r, &preview, baseline))
                        .fold(0.0f32, f32::max);
                    let updated = (candidate.confidence + best) / 2.0;
                    log::debug!(
                        "Corroborated {:?} by {:?}: score {:.1}, confidence {:.1} -> {:.1}",
                        candidate.title,
                        candidate.artist,
                        best,
                        candidate.confidence,
                        updated
                    );
                    candidate.corroboration = Some(best);
                    candidate.confidence = updated;
                }
                Err(e) => {
                    log::warn!("Corroboration skipped for {:?}: {}", candidate.title, e);
                }
            }
        }
    }

    /// Features of white noise through the preview pipeline, computed once
    ///
    /// `None` when the extraction fails; scores then use the raw correlation.
    async fn noise_features(&self) -> Option<&SegmentFeatures> {
        let sample_rate = match self.preprocess.target_sample_rate {
            0 => TARGET_SAMPLE_RATE,
            rate => rate,
        };
        let amplitude = self.preprocess.target_peak;
        let feature_config = self.features.clone();

        let result = self
            .noise
            .get_or_try_init(|| async move {
                tokio::task::spawn_blocking(move || {
                    let noise = white_noise((NOISE_SECONDS * sample_rate as f32) as usize, amplitude);
                    extract_segment_features(&noise, sample_rate, &feature_config)
                })
                .await
                .map_err(ScanError::from)
                .and_then(|features| features)
            })
            .await;

        match result {
            Ok(features) => Some(features),
            Err(e) => {
                log::warn!("Noise baseline unavailable: {}", e);
                None
            }
        }
    }

    async fn preview_features(&self, url: &str) -> Result<SegmentFeatures, CorroborationError> {
        let bytes = self.fetcher.fetch(url).await?;
        let preprocess_config = self.preprocess.clone();
        let feature_config = self.features.clone();
        let extension = url_extension(url);

        let features = tokio::task::spawn_blocking(move || {
            let audio = preprocess(&bytes, extension.as_deref(), &preprocess_config)?;
            extract_segment_features(audio.buffer.samples(), audio.buffer.sample_rate(), &feature_config)
        })
        .await
        .map_err(ScanError::from)??;

        Ok(features)
    }
}

/// Why a preview could not be compared
#[derive(Debug, thiserror::Error)]
enum CorroborationError {
    #[error("preview download failed: {0}")]
    Fetch(#[from] SearchError),
    #[error("preview analysis failed: {0}")]
    Analysis(#[from] ScanError),
}

/// Lowercase file extension of a URL path, ignoring query and fragment
fn url_extension(url: &str) -> Option<String> {
    let path = url.split(|c: char| c == '?' || c == '#').next().unwrap_or(url);
    let file = path.rsplit('/').next()?;
    let (_, ext) = file.rsplit_once('.')?;
    if ext.is_empty() || ext.len() > 5 {
        return None;
    }
    Some(ext.to_ascii_lowercase())
}
