//! Configuration parameters for scanning

use serde::Deserialize;

use crate::error::ScanError;
use crate::features::embedding::EmbeddingConfig;

/// Canonical sample rate every downstream stage expects
pub const TARGET_SAMPLE_RATE: u32 = 44_100;

/// Preprocessing parameters
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct PreprocessConfig {
    /// Output sample rate (default: 44100)
    pub target_sample_rate: u32,

    /// Peak level after normalization (default: 0.9)
    pub target_peak: f32,

    /// Absolute amplitude at or below which edge samples count as silence (default: 0.01)
    pub silence_threshold: f32,
}

impl Default for PreprocessConfig {
    fn default() -> Self {
        Self {
            target_sample_rate: TARGET_SAMPLE_RATE,
            target_peak: 0.9,
            silence_threshold: 0.01,
        }
    }
}

/// Segment selection parameters
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct SegmentConfig {
    /// Analysis window length in seconds (default: 1.0)
    pub window_seconds: f32,

    /// Window overlap fraction (default: 0.5)
    pub overlap: f32,

    /// Number of contiguous chunks used for the uniqueness proxy (default: 32)
    pub bands: usize,

    /// Segments submitted by a standard scan (default: 4)
    pub standard_count: usize,

    /// Segments submitted by a deep scan (default: 12)
    pub deep_count: usize,
}

impl Default for SegmentConfig {
    fn default() -> Self {
        Self {
            window_seconds: 1.0,
            overlap: 0.5,
            bands: 32,
            standard_count: 4,
            deep_count: 12,
        }
    }
}

/// Tempo/pitch normalization and embedding parameters
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct FeatureConfig {
    /// Time-stretch every segment to this tempo before embedding.
    /// `None` keeps the native tempo (default: Some(120.0))
    pub reference_bpm: Option<f32>,

    /// Shift every segment back to A440 before embedding (default: false)
    pub normalize_pitch: bool,

    /// Extract embeddings at all (default: true)
    pub extract_embeddings: bool,

    /// Embedding extraction parameters
    pub embedding: EmbeddingConfig,
}

impl Default for FeatureConfig {
    fn default() -> Self {
        Self {
            reference_bpm: Some(120.0),
            normalize_pitch: false,
            extract_embeddings: true,
            embedding: EmbeddingConfig::default(),
        }
    }
}

/// Match aggregation parameters
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct MatchingConfig {
    /// Candidates below this confidence are dropped by every source (default: 50.0)
    pub min_confidence: f32,

    /// Upper bound for a single oracle or platform call in seconds (default: 10)
    pub platform_timeout_secs: u64,

    /// Results requested per platform query (default: 10)
    pub search_limit: usize,

    /// Maximum number of distinct text queries sent to platforms (default: 3)
    pub max_hint_queries: usize,

    /// Candidates below this confidence get acoustic corroboration (default: 70.0)
    pub corroboration_threshold: f32,

    /// Refresh cached OAuth tokens this many seconds before expiry (default: 60)
    pub token_safety_margin_secs: u64,
}

impl Default for MatchingConfig {
    fn default() -> Self {
        Self {
            min_confidence: 50.0,
            platform_timeout_secs: 10,
            search_limit: 10,
            max_hint_queries: 3,
            corroboration_threshold: 70.0,
            token_safety_margin_secs: 60,
        }
    }
}

/// Scan configuration
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct ScanConfig {
    /// Request the deep segment set
    pub deep_scan: bool,

    /// Preprocessing
    pub preprocess: PreprocessConfig,

    /// Segment selection
    pub segments: SegmentConfig,

    /// Tempo/pitch/embedding
    pub features: FeatureConfig,

    /// Aggregation
    pub matching: MatchingConfig,
}

impl ScanConfig {
    /// Parse a configuration from JSON; missing fields keep their defaults
    pub fn from_json(json: &str) -> Result<Self, ScanError> {
        serde_json::from_str(json)
            .map_err(|e| ScanError::InvalidInput(format!("Invalid scan config: {}", e)))
    }

    /// Number of segments to request for the configured scan depth
    pub fn target_segment_count(&self) -> usize {
        if self.deep_scan {
            self.segments.deep_count
        } else {
            self.segments.standard_count
        }
    }
}

/// API credentials for the platform searches
///
/// Missing values leave the corresponding platform unconfigured; its searches
/// then return no results instead of failing the scan.
#[derive(Debug, Clone, Default)]
pub struct PlatformCredentials {
    /// Spotify client-credentials id
    pub spotify_client_id: Option<String>,
    /// Spotify client-credentials secret
    pub spotify_client_secret: Option<String>,
    /// YouTube Data API key
    pub youtube_api_key: Option<String>,
}

impl PlatformCredentials {
    /// Read `SPOTIFY_CLIENT_ID`, `SPOTIFY_CLIENT_SECRET` and `YOUTUBE_API_KEY`
    pub fn from_env() -> Self {
        fn var(name: &str) -> Option<String> {
            std::env::var(name).ok().filter(|v| !v.trim().is_empty())
        }

        Self {
            spotify_client_id: var("SPOTIFY_CLIENT_ID"),
            spotify_client_secret: var("SPOTIFY_CLIENT_SECRET"),
            youtube_api_key: var("YOUTUBE_API_KEY"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = ScanConfig::default();
        assert_eq!(config.preprocess.target_sample_rate, 44_100);
        assert!((config.preprocess.target_peak - 0.9).abs() < 1e-6);
        assert_eq!(config.segments.bands, 32);
        assert_eq!(config.target_segment_count(), 4);
        assert_eq!(config.matching.token_safety_margin_secs, 60);
    }

    #[test]
    fn test_from_json_partial() {
        let config = ScanConfig::from_json(
            r#"{ "deep_scan": true, "matching": { "platform_timeout_secs": 3 } }"#,
        )
        .unwrap();
        assert!(config.deep_scan);
        assert_eq!(config.target_segment_count(), 12);
        assert_eq!(config.matching.platform_timeout_secs, 3);
        // Untouched fields keep defaults
        assert!((config.matching.min_confidence - 50.0).abs() < 1e-6);
        assert_eq!(config.features.embedding.bands, 128);
    }

    #[test]
    fn test_from_json_invalid() {
        assert!(ScanConfig::from_json("{ not json").is_err());
    }
}
