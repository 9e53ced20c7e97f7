//! Multi-source match aggregation
//!
//! Fans each prepared segment out to the fingerprint oracle and every text
//! query out to the platform searches, then merges the answers:
//! - Candidate model and sources
//! - Title/artist normalization and deduplication
//! - Filename metadata hints
//! - OAuth token caching
//! - Acoustic corroboration of weak candidates

pub mod aggregator;
pub mod candidate;
pub mod corroboration;
pub mod hints;
pub mod normalize;
pub mod oracle;
pub mod platforms;
pub mod token;

use crate::features::SegmentFeatures;
use crate::segmentation::AudioSegment;

pub use aggregator::{AggregateOutcome, MatchAggregator, MatchAggregatorBuilder, SourceFailure};
pub use candidate::{MatchCandidate, MatchSource};
pub use hints::MetadataHints;
pub use oracle::{FingerprintOracle, OracleMatch};
pub use platforms::{PlatformSearch, SearchQuery};

/// A segment ready for matching
#[derive(Debug, Clone)]
pub struct PreparedSegment {
    /// Where the segment sits in the preprocessed buffer
    pub segment: AudioSegment,
    /// Segment audio as 16-bit PCM WAV, sent to the oracle
    pub wav: Vec<u8>,
    /// Tempo/pitch-normalized features, `None` when extraction failed
    pub features: Option<SegmentFeatures>,
}
