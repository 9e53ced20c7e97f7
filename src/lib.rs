//! # beatscan
//!
//! Finds published songs that use a producer's uploaded instrumental.
//!
//! ## Features
//!
//! - **Preprocessing**: Any Symphonia-supported upload to mono 44.1 kHz, peak
//!   normalized, silence trimmed, framed as 16-bit WAV
//! - **Segment Selection**: Energy peaks and spectral uniqueness pick a small,
//!   prioritized set of excerpts (standard or deep scan)
//! - **Invariant Features**: Tempo/pitch estimation and normalization, mel
//!   band embeddings, DTW over onset contours
//! - **Match Aggregation**: Fingerprint oracle plus Spotify/YouTube searches,
//!   deduplicated, corroborated and ranked by confidence
//!
//! ## Quick Start
//!
//! ```no_run
//! use beatscan::{scan_upload, MatchAggregator, MetadataHints, PlatformCredentials, ScanConfig};
//!
//! # async fn run() -> Result<(), Box<dyn std::error::Error>> {
//! let config = ScanConfig::default();
//! let aggregator = MatchAggregator::from_credentials(&PlatformCredentials::from_env(), None, &config)?;
//!
//! let bytes = std::fs::read("Kay Moss - Night Drive.mp3")?;
//! let hints = MetadataHints::from_filename("Kay Moss - Night Drive.mp3");
//! let result = scan_upload(bytes, Some("mp3".to_string()), &hints, &aggregator, &config).await?;
//!
//! for candidate in &result.matches {
//!     println!("{:5.1}  {} - {} ({})", candidate.confidence, candidate.artist, candidate.title, candidate.source);
//! }
//! # Ok(())
//! # }
//! ```
//!
//! ## Architecture
//!
//! ```text
//! Upload → Preprocessing → Segment Selection → Features → Match Aggregation → ScanResult
//! ```
//!
//! The DSP stages are synchronous; [`scan_upload`] runs them on the blocking
//! pool and awaits the network fan-out.

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod analysis;
pub mod config;
pub mod error;
pub mod features;
pub mod io;
pub mod matching;
pub mod preprocessing;
pub mod segmentation;

use std::time::Instant;

// Re-export main types
pub use analysis::{ScanFlag, ScanMetrics, ScanResult};
pub use config::{PlatformCredentials, ScanConfig};
pub use error::{ScanError, SearchError};
pub use features::embedding::Embedding;
pub use features::SegmentFeatures;
pub use matching::{MatchAggregator, MatchCandidate, MatchSource, MetadataHints, PreparedSegment};
pub use preprocessing::{PcmBuffer, PreprocessedAudio};
pub use segmentation::{AudioSegment, Priority};

/// Output of the synchronous half of a scan
#[derive(Debug, Clone)]
pub struct PreparedScan {
    /// Preprocessed upload
    pub audio: PreprocessedAudio,
    /// Selected segments with WAV bytes and features
    pub segments: Vec<PreparedSegment>,
    /// Metrics collected so far (matching fields still empty)
    pub metrics: ScanMetrics,
}

impl PreparedScan {
    /// True when a peak-anchored segment was selected
    pub fn has_peak_segment(&self) -> bool {
        self.segments.iter().any(|s| s.segment.name.starts_with("PEAK"))
    }
}

fn elapsed_ms(since: Instant) -> u64 {
    since.elapsed().as_millis() as u64
}

/// Preprocess an upload, select segments and extract their features
///
/// A segment whose features cannot be extracted is kept (its WAV still goes
/// to the oracle) with `features: None`.
///
/// # Arguments
///
/// * `bytes` - Raw upload
/// * `extension` - Optional file extension hint for the decoder
/// * `config` - Scan configuration
///
/// # Errors
///
/// Decode failures, silent uploads and uploads shorter than one analysis
/// window abort the scan.
///
/// # Example
///
/// ```no_run
/// use beatscan::{prepare_scan, ScanConfig};
///
/// let bytes = std::fs::read("beat.wav")?;
/// let prepared = prepare_scan(&bytes, Some("wav"), &ScanConfig::default())?;
/// println!("{} segment(s), {:?} BPM", prepared.segments.len(), prepared.metrics.bpm);
/// # Ok::<(), Box<dyn std::error::Error>>(())
/// ```
pub fn prepare_scan(
    bytes: &[u8],
    extension: Option<&str>,
    config: &ScanConfig,
) -> Result<PreparedScan, ScanError> {
    log::debug!("Preparing scan of {} bytes (deep: {})", bytes.len(), config.deep_scan);

    let started = Instant::now();
    let audio = preprocessing::preprocess(bytes, extension, &config.preprocess)?;
    let preprocess_ms = elapsed_ms(started);

    let started = Instant::now();
    let segments = segmentation::select_segments_with(
        &audio.buffer,
        config.target_segment_count(),
        config.deep_scan,
        &config.segments,
    )?;
    let segmentation_ms = elapsed_ms(started);

    let started = Instant::now();
    let buffer = &audio.buffer;
    let bpm = features::tempo::estimate_tempo(buffer.samples(), buffer.sample_rate()).ok();
    let pitch_semitones = features::pitch::estimate_pitch_shift(buffer.samples(), buffer.sample_rate());

    let segments_attempted = segments.len();
    let mut prepared = Vec::with_capacity(segments.len());
    for segment in segments {
        let wav = buffer.range_wav_bytes(segment.start, segment.len)?;
        let features = match features::extract_segment_features(
            segment.samples(buffer),
            buffer.sample_rate(),
            &config.features,
        ) {
            Ok(features) => Some(features),
            Err(e) => {
                log::warn!("Feature extraction failed for {}: {}", segment.name, e);
                None
            }
        };
        prepared.push(PreparedSegment {
            segment,
            wav,
            features,
        });
    }
    let features_ms = elapsed_ms(started);
    let segments_succeeded = prepared.iter().filter(|p| p.features.is_some()).count();

    let metrics = ScanMetrics {
        preprocess_ms,
        segmentation_ms,
        features_ms,
        duration_seconds: buffer.duration_seconds(),
        quality_score: audio.quality_score,
        bpm,
        pitch_semitones,
        segments_attempted,
        segments_succeeded,
        algorithm_version: analysis::result::ALGORITHM_VERSION.to_string(),
        ..ScanMetrics::default()
    };

    Ok(PreparedScan {
        audio,
        segments: prepared,
        metrics,
    })
}

/// Scan an upload end to end
///
/// Runs [`prepare_scan`] on the blocking pool, then searches every source
/// configured on `aggregator`.
///
/// # Errors
///
/// Everything [`prepare_scan`] rejects, `ScanError::RateLimitExceeded` when
/// the fingerprint oracle asks to back off, and `ScanError::Join` if the
/// blocking task panics. Platform failures are recovered and reported in
/// [`ScanMetrics::failures`].
pub async fn scan_upload(
    bytes: Vec<u8>,
    extension: Option<String>,
    hints: &MetadataHints,
    aggregator: &MatchAggregator,
    config: &ScanConfig,
) -> Result<ScanResult, ScanError> {
    let started = Instant::now();

    let prepare_config = config.clone();
    let prepared = tokio::task::spawn_blocking(move || {
        prepare_scan(&bytes, extension.as_deref(), &prepare_config)
    })
    .await??;

    let had_peaks = prepared.has_peak_segment();
    let PreparedScan {
        audio,
        segments,
        mut metrics,
    } = prepared;

    let matching_started = Instant::now();
    let outcome = aggregator.find_matches(&segments, hints).await?;
    metrics.matching_ms = elapsed_ms(matching_started);

    metrics.segments_identified = outcome.segments_identified;
    metrics.queries = outcome.queries;
    metrics.failures = outcome.failures;
    metrics.processing_time_ms = elapsed_ms(started);
    metrics.compute_flags(had_peaks);

    log::info!(
        "Scan finished in {} ms: {} match(es) from {} segment(s), flags {:?}",
        metrics.processing_time_ms,
        outcome.matches.len(),
        metrics.segments_attempted,
        metrics.flags
    );

    Ok(ScanResult {
        matches: outcome.matches,
        segments: segments.into_iter().map(|p| p.segment).collect(),
        preprocess: audio.report,
        metrics,
    })
}
