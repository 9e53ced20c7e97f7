//! Audio preprocessing
//!
//! Turns an uploaded file into the canonical representation every later stage
//! consumes:
//! - Channel mixing (any layout to mono)
//! - Peak normalization
//! - Silence trimming
//! - Linear resampling to 44.1 kHz
//! - 16-bit WAV framing and quality scoring

pub mod channel_mixer;
pub mod normalization;
pub mod quality;
pub mod resample;
pub mod silence;

use serde::Serialize;

use crate::config::{PreprocessConfig, TARGET_SAMPLE_RATE};
use crate::error::ScanError;
use crate::io::{decode_audio, encode_wav};

/// Mono PCM samples at a known sample rate
///
/// Buffers produced by [`preprocess`] are always at 44,100 Hz.
#[derive(Debug, Clone, PartialEq)]
pub struct PcmBuffer {
    samples: Vec<f32>,
    sample_rate: u32,
}

impl PcmBuffer {
    /// Wrap mono samples
    pub fn new(samples: Vec<f32>, sample_rate: u32) -> Self {
        Self {
            samples,
            sample_rate,
        }
    }

    /// Sample data
    pub fn samples(&self) -> &[f32] {
        &self.samples
    }

    /// Sample rate in Hz
    pub fn sample_rate(&self) -> u32 {
        self.sample_rate
    }

    /// Always 1
    pub fn channels(&self) -> u16 {
        1
    }

    /// Number of samples
    pub fn len(&self) -> usize {
        self.samples.len()
    }

    /// True when the buffer holds no samples
    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    /// Duration in seconds
    pub fn duration_seconds(&self) -> f32 {
        if self.sample_rate == 0 {
            return 0.0;
        }
        self.samples.len() as f32 / self.sample_rate as f32
    }

    /// Samples in `[start, start + len)`, clamped to the buffer
    pub fn range(&self, start: usize, len: usize) -> &[f32] {
        let start = start.min(self.samples.len());
        let end = start.saturating_add(len).min(self.samples.len());
        &self.samples[start..end]
    }

    /// Whole buffer as a 16-bit PCM WAV file
    pub fn to_wav_bytes(&self) -> Result<Vec<u8>, ScanError> {
        encode_wav(&self.samples, self.sample_rate)
    }

    /// A sub-range as a 16-bit PCM WAV file
    pub fn range_wav_bytes(&self, start: usize, len: usize) -> Result<Vec<u8>, ScanError> {
        encode_wav(self.range(start, len), self.sample_rate)
    }
}

/// What preprocessing did to the upload
#[derive(Debug, Clone, Serialize)]
pub struct PreprocessReport {
    /// Sample rate of the decoded source
    pub source_sample_rate: u32,
    /// Channel count of the decoded source
    pub source_channels: usize,
    /// Linear gain applied by peak normalization
    pub gain: f32,
    /// Samples removed before the first audible sample (source rate)
    pub trimmed_leading: usize,
    /// Samples removed after the last audible sample (source rate)
    pub trimmed_trailing: usize,
}

/// Preprocessing output
#[derive(Debug, Clone)]
pub struct PreprocessedAudio {
    /// Canonical mono buffer at the target rate
    pub buffer: PcmBuffer,
    /// `buffer` framed as 16-bit PCM WAV
    pub wav: Vec<u8>,
    /// Diagnostic quality score in [0, 1]
    pub quality_score: f32,
    /// Details of the transformation
    pub report: PreprocessReport,
}

/// Preprocess an uploaded audio file
///
/// # Arguments
///
/// * `bytes` - Raw file contents
/// * `extension` - Optional extension hint for container detection
/// * `config` - Preprocessing parameters
///
/// # Errors
///
/// - `ScanError::Decode` if the file cannot be parsed
/// - `ScanError::EmptyAudio` if nothing decodes or only silence remains
///
/// # Example
///
/// ```no_run
/// use beatscan::config::PreprocessConfig;
/// use beatscan::preprocessing::preprocess;
///
/// let bytes = std::fs::read("upload.mp3")?;
/// let audio = preprocess(&bytes, Some("mp3"), &PreprocessConfig::default())?;
/// assert_eq!(audio.buffer.sample_rate(), 44100);
/// # Ok::<(), Box<dyn std::error::Error>>(())
/// ```
pub fn preprocess(
    bytes: &[u8],
    extension: Option<&str>,
    config: &PreprocessConfig,
) -> Result<PreprocessedAudio, ScanError> {
    let decoded = decode_audio(bytes, extension)?;

    if decoded.frames() == 0 {
        return Err(ScanError::EmptyAudio("No samples decoded".to_string()));
    }

    let source_sample_rate = decoded.sample_rate;
    let source_channels = decoded.channels;

    let mut mono = channel_mixer::mix_to_mono(&decoded.samples, decoded.channels)?;
    drop(decoded);

    let normalization = normalization::peak_normalize(&mut mono, config.target_peak);

    let (trimmed, range) = silence::trim_silence(&mono, config.silence_threshold)?;
    let total = mono.len();
    drop(mono);

    let target_rate = if config.target_sample_rate == 0 {
        TARGET_SAMPLE_RATE
    } else {
        config.target_sample_rate
    };
    let samples = resample::resample_linear(&trimmed, source_sample_rate, target_rate)?;

    if samples.is_empty() {
        return Err(ScanError::EmptyAudio("Nothing left after resampling".to_string()));
    }

    let buffer = PcmBuffer::new(samples, target_rate);
    let wav = buffer.to_wav_bytes()?;
    let quality_score = quality::quality_score(buffer.samples());

    log::debug!(
        "Preprocessed {:.2}s of audio ({} Hz x{} -> {} Hz mono), quality {:.2}",
        buffer.duration_seconds(),
        source_sample_rate,
        source_channels,
        target_rate,
        quality_score
    );

    Ok(PreprocessedAudio {
        buffer,
        wav,
        quality_score,
        report: PreprocessReport {
            source_sample_rate,
            source_channels,
            gain: normalization.gain,
            trimmed_leading: range.leading(),
            trimmed_trailing: range.trailing(total),
        },
    })
}
