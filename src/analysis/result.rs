//! Scan result types

use serde::Serialize;

use crate::matching::{MatchCandidate, SourceFailure};
use crate::preprocessing::PreprocessReport;
use crate::segmentation::AudioSegment;

/// Version tag written into every result
pub const ALGORITHM_VERSION: &str = "beatscan-0.1";

/// Quality score under which results are flagged
pub const LOW_QUALITY_THRESHOLD: f32 = 0.3;

/// Conditions worth surfacing next to the matches
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ScanFlag {
    /// Quality score below [`LOW_QUALITY_THRESHOLD`]
    LowQuality,
    /// No tempo estimate for the whole track
    NoTempoEstimate,
    /// No energy peak, so no peak-anchored segment was submitted
    NoEnergyPeaks,
    /// At least one source failed and was skipped
    SourceFailures,
}

/// Timings and diagnostics of one scan
#[derive(Debug, Clone, Default, Serialize)]
pub struct ScanMetrics {
    /// Decode, normalize, trim, resample
    pub preprocess_ms: u64,
    /// Window analysis and segment selection
    pub segmentation_ms: u64,
    /// Tempo/pitch normalization, embeddings and segment WAVs
    pub features_ms: u64,
    /// Oracle, platform searches and corroboration
    pub matching_ms: u64,
    /// Wall time of the whole scan
    pub processing_time_ms: u64,

    /// Duration of the preprocessed audio in seconds
    pub duration_seconds: f32,
    /// Diagnostic quality score in [0, 1]
    pub quality_score: f32,
    /// Whole-track tempo estimate
    pub bpm: Option<f32>,
    /// Whole-track pitch offset from A440 in semitones
    pub pitch_semitones: f32,

    /// Segments selected
    pub segments_attempted: usize,
    /// Segments whose features were extracted
    pub segments_succeeded: usize,
    /// Segments the oracle answered for
    pub segments_identified: usize,

    /// Text queries sent to the platforms
    pub queries: Vec<String>,
    /// Recovered per-source failures
    pub failures: Vec<SourceFailure>,
    /// Notable conditions
    pub flags: Vec<ScanFlag>,
    /// Algorithm version
    pub algorithm_version: String,
}

impl ScanMetrics {
    /// Derive flags from the collected values
    pub fn compute_flags(&mut self, had_peaks: bool) {
        self.flags.clear();
        if self.quality_score < LOW_QUALITY_THRESHOLD {
            self.flags.push(ScanFlag::LowQuality);
        }
        if self.bpm.is_none() {
            self.flags.push(ScanFlag::NoTempoEstimate);
        }
        if !had_peaks {
            self.flags.push(ScanFlag::NoEnergyPeaks);
        }
        if !self.failures.is_empty() {
            self.flags.push(ScanFlag::SourceFailures);
        }
    }
}

/// Complete scan result
#[derive(Debug, Clone, Serialize)]
pub struct ScanResult {
    /// Deduplicated candidates, highest confidence first
    pub matches: Vec<MatchCandidate>,
    /// Segments that were submitted
    pub segments: Vec<AudioSegment>,
    /// What preprocessing did to the upload
    pub preprocess: PreprocessReport,
    /// Timings and diagnostics
    pub metrics: ScanMetrics,
}

impl ScanResult {
    /// Serialize to pretty-printed JSON
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(self)
    }

    /// Best candidate, if any
    pub fn best_match(&self) -> Option<&MatchCandidate> {
        self.matches.first()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::matching::MatchSource;

    #[test]
    fn test_flags() {
        let mut metrics = ScanMetrics {
            quality_score: 0.1,
            bpm: None,
            failures: vec![SourceFailure {
                source: MatchSource::YouTube,
                context: "q".to_string(),
                message: "Rate limited".to_string(),
            }],
            ..ScanMetrics::default()
        };
        metrics.compute_flags(true);
        assert_eq!(
            metrics.flags,
            vec![ScanFlag::LowQuality, ScanFlag::NoTempoEstimate, ScanFlag::SourceFailures]
        );

        metrics.quality_score = 0.9;
        metrics.bpm = Some(120.0);
        metrics.failures.clear();
        metrics.compute_flags(false);
        assert_eq!(metrics.flags, vec![ScanFlag::NoEnergyPeaks]);
    }

    #[test]
    fn test_json_shape() {
        let result = ScanResult {
            matches: vec![MatchCandidate::new("Night Drive", "Kay Moss", MatchSource::Spotify, 85.0)],
            segments: Vec::new(),
            preprocess: PreprocessReport {
                source_sample_rate: 48000,
                source_channels: 2,
                gain: 1.5,
                trimmed_leading: 10,
                trimmed_trailing: 0,
            },
            metrics: ScanMetrics {
                flags: vec![ScanFlag::LowQuality],
                ..ScanMetrics::default()
            },
        };

        let value: serde_json::Value = serde_json::from_str(&result.to_json().unwrap()).unwrap();
        assert_eq!(value["matches"][0]["source"], "spotify");
        assert_eq!(value["preprocess"]["source_channels"], 2);
        assert_eq!(value["metrics"]["flags"][0], "low_quality");
        assert_eq!(result.best_match().map(|m| m.title.as_str()), Some("Night Drive"));
    }
}
