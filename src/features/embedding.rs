//! Spectral embedding extraction
//!
//! Summarizes a variable-length segment as a fixed-length vector for fast
//! similarity comparison.
//!
//! # Algorithm
//!
//! 1. Frame the signal (512 samples, 256 hop) and apply a Hamming window
//! 2. Power spectrum by direct DFT summation over every 4th sample of the
//!    frame (bins `0..frame_size / 2`)
//! 3. Sum bin powers into 128 mel bands and take `ln(sum + 1e-10)`
//! 4. Per band across frames: mean, standard deviation, max and mean
//!    absolute frame-to-frame delta, concatenated (`4 * bands` values)
//!
//! # Approximation
//!
//! Step 2 is neither an FFT nor a full DFT: decimating the time index by 4
//! folds energy above `sample_rate / 8` back into lower bins. Similarity
//! thresholds are calibrated against exactly this spectrum, so replacing it
//! with an FFT changes every embedding and requires recalibration.

use std::f32::consts::PI;

use serde::{Deserialize, Serialize};

use super::mel::band_map;
use crate::error::ScanError;

/// Floor added before the logarithm
const LOG_EPSILON: f32 = 1e-10;

/// Distance above `ln(LOG_EPSILON)` still counted as an empty band
const EMPTY_BAND_MARGIN: f32 = 1e-3;

/// Statistic blocks per embedding
const BLOCKS: usize = 4;

/// Embedding extraction parameters
///
/// Embeddings are only comparable when extracted with equal configurations.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct EmbeddingConfig {
    /// Samples per frame (default: 512)
    pub frame_size: usize,
    /// Samples between frame starts (default: 256)
    pub hop_size: usize,
    /// Mel band count (default: 128)
    pub bands: usize,
    /// Time-index stride of the direct spectrum summation (default: 4)
    pub decimation: usize,
}

impl Default for EmbeddingConfig {
    fn default() -> Self {
        Self {
            frame_size: 512,
            hop_size: 256,
            bands: 128,
            decimation: 4,
        }
    }
}

impl EmbeddingConfig {
    /// Length of embeddings produced with this configuration
    pub fn embedding_len(&self) -> usize {
        4 * self.bands
    }
}

/// Fixed-length spectral summary of a segment
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Embedding {
    values: Vec<f32>,
    config: EmbeddingConfig,
}

impl Embedding {
    /// Concatenated `[mean | std | max | delta]` band statistics
    pub fn values(&self) -> &[f32] {
        &self.values
    }

    /// Configuration the embedding was extracted with
    pub fn config(&self) -> &EmbeddingConfig {
        &self.config
    }

    /// Vector length
    pub fn len(&self) -> usize {
        self.values.len()
    }

    /// True for a zero-length embedding
    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Cosine similarity, or 0.0 when the extraction configs differ
    pub fn similarity(&self, other: &Embedding) -> f32 {
        if self.config != other.config {
            return 0.0;
        }
        cosine_similarity(&self.values, &other.values)
    }

    /// True when no frame put any energy into `band`
    ///
    /// Narrow low mel bands fall between DFT bins and sit at `ln(1e-10)` for
    /// every input.
    pub fn is_band_empty(&self, band: usize) -> bool {
        let floor = LOG_EPSILON.ln();
        self.values
            .get(2 * self.config.bands + band)
            .map_or(true, |&max| max <= floor + EMPTY_BAND_MARGIN)
    }

    /// Correlation of the band profiles of two embeddings
    ///
    /// Only bands occupied in both embeddings take part. Each statistic block
    /// is centered on its mean over those bands before the cosine is taken,
    /// so the empty-band floor and level offsets shared by all bands add no
    /// similarity. Ranges over `[-1, 1]`; 0.0 when the configs differ or
    /// fewer than two bands are occupied.
    pub fn profile_correlation(&self, other: &Embedding) -> f32 {
        let bands = self.config.bands;
        if self.config != other.config
            || self.values.len() != BLOCKS * bands
            || other.values.len() != BLOCKS * bands
        {
            return 0.0;
        }

        let occupied: Vec<usize> = (0..bands)
            .filter(|&b| !self.is_band_empty(b) && !other.is_band_empty(b))
            .collect();
        if occupied.len() < 2 {
            return 0.0;
        }

        let mut a = Vec::with_capacity(BLOCKS * occupied.len());
        let mut b = Vec::with_capacity(BLOCKS * occupied.len());
        for block in 0..BLOCKS {
            let offset = block * bands;
            append_centered(&self.values[offset..offset + bands], &occupied, &mut a);
            append_centered(&other.values[offset..offset + bands], &occupied, &mut b);
        }

        cosine_similarity(&a, &b)
    }
}

fn append_centered(block: &[f32], occupied: &[usize], out: &mut Vec<f32>) {
    let mean = occupied.iter().map(|&b| block[b] as f64).sum::<f64>() / occupied.len() as f64;
    out.extend(occupied.iter().map(|&b| (block[b] as f64 - mean) as f32));
}

/// Cosine similarity of two vectors
///
/// Returns 0.0 when the lengths differ or either vector has zero norm.
///
/// # Example
///
/// ```
/// use beatscan::features::embedding::cosine_similarity;
///
/// assert!((cosine_similarity(&[1.0, 2.0], &[2.0, 4.0]) - 1.0).abs() < 1e-6);
/// assert_eq!(cosine_similarity(&[1.0, 2.0], &[1.0, 2.0, 3.0]), 0.0);
/// assert_eq!(cosine_similarity(&[0.0, 0.0], &[1.0, 1.0]), 0.0);
/// ```
pub fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
    if a.len() != b.len() || a.is_empty() {
        return 0.0;
    }

    let mut dot = 0.0f64;
    let mut norm_a = 0.0f64;
    let mut norm_b = 0.0f64;
    for (&x, &y) in a.iter().zip(b) {
        dot += x as f64 * y as f64;
        norm_a += x as f64 * x as f64;
        norm_b += y as f64 * y as f64;
    }

    if norm_a == 0.0 || norm_b == 0.0 {
        return 0.0;
    }

    (dot / (norm_a.sqrt() * norm_b.sqrt())) as f32
}

/// Precomputed window and twiddle tables for one frame size
struct SpectrumTables {
    window: Vec<f32>,
    cos: Vec<f32>,
    sin: Vec<f32>,
}

impl SpectrumTables {
    fn new(frame_size: usize) -> Self {
        let n = frame_size as f32;
        let window = (0..frame_size)
            .map(|i| {
                if frame_size == 1 {
                    1.0
                } else {
                    0.54 - 0.46 * (2.0 * PI * i as f32 / (n - 1.0)).cos()
                }
            })
            .collect();
        let cos = (0..frame_size).map(|m| (2.0 * PI * m as f32 / n).cos()).collect();
        let sin = (0..frame_size).map(|m| (2.0 * PI * m as f32 / n).sin()).collect();
        Self { window, cos, sin }
    }

    /// Power of bins `0..frame_size / 2` summing every `decimation`-th sample
    fn power_spectrum(&self, frame: &[f32], decimation: usize, out: &mut [f32]) {
        let n = frame.len();
        for (k, power) in out.iter_mut().enumerate() {
            let mut re = 0.0f32;
            let mut im = 0.0f32;
            for t in (0..n).step_by(decimation) {
                let m = (k * t) % n;
                re += frame[t] * self.cos[m];
                im -= frame[t] * self.sin[m];
            }
            *power = re * re + im * im;
        }
    }
}

/// Log mel energies per frame
///
/// # Errors
///
/// `ScanError::InsufficientAudio` when the signal is shorter than one frame;
/// `ScanError::InvalidInput` for zero-sized parameters.
pub fn mel_spectrogram(
    samples: &[f32],
    sample_rate: u32,
    config: &EmbeddingConfig,
) -> Result<Vec<Vec<f32>>, ScanError> {
    if config.frame_size == 0 || config.hop_size == 0 || config.bands == 0 || config.decimation == 0 {
        return Err(ScanError::InvalidInput(format!(
            "Invalid embedding config: {:?}",
            config
        )));
    }

    if sample_rate == 0 {
        return Err(ScanError::InvalidInput("Invalid sample rate: 0".to_string()));
    }

    if samples.len() < config.frame_size {
        return Err(ScanError::InsufficientAudio {
            required: config.frame_size,
            actual: samples.len(),
        });
    }

    let num_frames = (samples.len() - config.frame_size) / config.hop_size + 1;
    let num_bins = config.frame_size / 2;
    let tables = SpectrumTables::new(config.frame_size);
    let bands_of_bin = band_map(num_bins, config.frame_size, sample_rate, config.bands);

    let mut windowed = vec![0.0f32; config.frame_size];
    let mut power = vec![0.0f32; num_bins];
    let mut spectrogram = Vec::with_capacity(num_frames);

    for i in 0..num_frames {
        let start = i * config.hop_size;
        let frame = &samples[start..start + config.frame_size];
        for ((w, &s), &win) in windowed.iter_mut().zip(frame).zip(&tables.window) {
            *w = s * win;
        }

        tables.power_spectrum(&windowed, config.decimation, &mut power);

        let mut band_energy = vec![0.0f32; config.bands];
        for (&p, &band) in power.iter().zip(&bands_of_bin) {
            band_energy[band] += p;
        }
        for e in band_energy.iter_mut() {
            *e = (*e + LOG_EPSILON).ln();
        }
        spectrogram.push(band_energy);
    }

    Ok(spectrogram)
}

/// Extract an embedding with the default configuration
///
/// # Example
///
/// ```
/// use beatscan::features::embedding::extract_embedding;
///
/// let tone: Vec<f32> = (0..22050)
///     .map(|i| (2.0 * std::f32::consts::PI * 440.0 * i as f32 / 44100.0).sin() * 0.5)
///     .collect();
/// let embedding = extract_embedding(&tone, 44100)?;
/// assert_eq!(embedding.len(), 512);
/// assert!((embedding.similarity(&embedding) - 1.0).abs() < 1e-5);
/// # Ok::<(), beatscan::ScanError>(())
/// ```
pub fn extract_embedding(samples: &[f32], sample_rate: u32) -> Result<Embedding, ScanError> {
    extract_embedding_with(samples, sample_rate, &EmbeddingConfig::default())
}

/// Extract an embedding with explicit parameters
pub fn extract_embedding_with(
    samples: &[f32],
    sample_rate: u32,
    config: &EmbeddingConfig,
) -> Result<Embedding, ScanError> {
    let spectrogram = mel_spectrogram(samples, sample_rate, config)?;
    let bands = config.bands;
    let frames = spectrogram.len() as f32;

    let mut mean = vec![0.0f32; bands];
    let mut max = vec![f32::NEG_INFINITY; bands];
    let mut delta = vec![0.0f32; bands];

    for (i, frame) in spectrogram.iter().enumerate() {
        for b in 0..bands {
            mean[b] += frame[b];
            max[b] = max[b].max(frame[b]);
            if i > 0 {
                delta[b] += (frame[b] - spectrogram[i - 1][b]).abs();
            }
        }
    }

    for m in mean.iter_mut() {
        *m /= frames;
    }

    let mut std = vec![0.0f32; bands];
    for frame in &spectrogram {
        for b in 0..bands {
            let d = frame[b] - mean[b];
            std[b] += d * d;
        }
    }
    for s in std.iter_mut() {
        *s = (*s / frames).sqrt();
    }

    if spectrogram.len() > 1 {
        let transitions = (spectrogram.len() - 1) as f32;
        for d in delta.iter_mut() {
            *d /= transitions;
        }
    }

    let mut values = Vec::with_capacity(config.embedding_len());
    values.extend_from_slice(&mean);
    values.extend_from_slice(&std);
    values.extend_from_slice(&max);
    values.extend_from_slice(&delta);

    log::debug!(
        "Extracted {}-value embedding from {} frames",
        values.len(),
        spectrogram.len()
    );

    Ok(Embedding {
        values,
        config: *config,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sine(freq: f32, len: usize, amplitude: f32) -> Vec<f32> {
        (0..len)
            .map(|i| (2.0 * PI * freq * i as f32 / 44100.0).sin() * amplitude)
            .collect()
    }

    #[test]
    fn test_embedding_length() {
        let embedding = extract_embedding(&sine(440.0, 8192, 0.5), 44100).unwrap();
        assert_eq!(embedding.len(), 512);

        let config = EmbeddingConfig {
            bands: 40,
            ..EmbeddingConfig::default()
        };
        let embedding = extract_embedding_with(&sine(440.0, 8192, 0.5), 44100, &config).unwrap();
        assert_eq!(embedding.len(), 160);
    }

    #[test]
    fn test_self_similarity() {
        let embedding = extract_embedding(&sine(300.0, 11025, 0.7), 44100).unwrap();
        assert!((embedding.similarity(&embedding) - 1.0).abs() < 1e-5);
    }

    #[test]
    fn test_config_mismatch_is_incomparable() {
        let samples = sine(300.0, 11025, 0.7);
        let a = extract_embedding(&samples, 44100).unwrap();
        let b = extract_embedding_with(
            &samples,
            44100,
            &EmbeddingConfig {
                hop_size: 128,
                ..EmbeddingConfig::default()
            },
        )
        .unwrap();
        assert_eq!(a.len(), b.len());
        assert_eq!(a.similarity(&b), 0.0);
    }

    #[test]
    fn test_similar_sounds_closer_than_different() {
        let base = extract_embedding(&sine(440.0, 22050, 0.5), 44100).unwrap();
        let same = extract_embedding(&sine(440.0, 22050, 0.45), 44100).unwrap();

        let mut state: u32 = 7;
        let noise: Vec<f32> = (0..22050)
            .map(|_| {
                state = state.wrapping_mul(1_664_525).wrapping_add(1_013_904_223);
                (state >> 8) as f32 / (1u32 << 24) as f32 - 0.5
            })
            .collect();
        let different = extract_embedding(&noise, 44100).unwrap();

        assert!(base.similarity(&same) > base.similarity(&different));
    }

    #[test]
    fn test_profile_correlation_ignores_shared_floor() {
        let floor = LOG_EPSILON.ln();
        let config = EmbeddingConfig {
            bands: 4,
            ..EmbeddingConfig::default()
        };
        // Bands 0 and 1 empty in both, occupied bands with opposite profiles
        let a = Embedding {
            values: vec![
                floor, floor, 1.0, 3.0, 0.0, 0.0, 0.5, 0.2, floor, floor, 2.0, 4.0, 0.0, 0.0, 0.1, 0.3,
            ],
            config,
        };
        let b = Embedding {
            values: vec![
                floor, floor, 3.0, 1.0, 0.0, 0.0, 0.2, 0.5, floor, floor, 4.0, 2.0, 0.0, 0.0, 0.3, 0.1,
            ],
            config,
        };

        assert!(a.is_band_empty(0) && a.is_band_empty(1));
        assert!(!a.is_band_empty(2));
        assert!(a.similarity(&b) > 0.9);
        assert!(a.profile_correlation(&b) < -0.99);
        assert!((a.profile_correlation(&a) - 1.0).abs() < 1e-5);
    }

    #[test]
    fn test_profile_correlation_of_real_signals() {
        let tone = extract_embedding(&sine(440.0, 22050, 0.5), 44100).unwrap();
        let quieter = extract_embedding(&sine(440.0, 22050, 0.2), 44100).unwrap();
        assert!(tone.profile_correlation(&quieter) > 0.95);
        assert!(tone.profile_correlation(&quieter) <= 1.0 + 1e-6);
    }

    #[test]
    fn test_single_frame_has_zero_spread() {
        let embedding = extract_embedding(&sine(440.0, 512, 0.5), 44100).unwrap();
        let values = embedding.values();
        // std and delta blocks are zero, max equals mean
        assert!(values[128..256].iter().all(|&v| v == 0.0));
        assert!(values[384..512].iter().all(|&v| v == 0.0));
        assert_eq!(&values[0..128], &values[256..384]);
    }

    #[test]
    fn test_too_short() {
        assert!(matches!(
            extract_embedding(&[0.1; 100], 44100),
            Err(ScanError::InsufficientAudio { required: 512, actual: 100 })
        ));
    }

    #[test]
    fn test_cosine_edge_cases() {
        assert_eq!(cosine_similarity(&[], &[]), 0.0);
        assert_eq!(cosine_similarity(&[1.0], &[1.0, 0.0]), 0.0);
        assert!((cosine_similarity(&[1.0, 0.0], &[0.0, 1.0])).abs() < 1e-6);
        assert!((cosine_similarity(&[1.0, 1.0], &[-1.0, -1.0]) + 1.0).abs() < 1e-6);
    }
}
