//! Fingerprint oracle interface
//!
//! The oracle is an external audio-fingerprint service: it receives a WAV
//! segment and answers with scored candidate tracks. Only the contract lives
//! here; HTTP or SDK bindings implement [`FingerprintOracle`] outside the
//! crate.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use super::candidate::{MatchCandidate, MatchSource};
use crate::error::SearchError;

/// One candidate returned by the oracle
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OracleMatch {
    /// Track title
    pub title: String,
    /// Primary artist
    pub artist: String,
    /// Album, if known
    #[serde(default)]
    pub album: Option<String>,
    /// Oracle score in [0, 100]
    pub score: f32,
    /// Oracle-side identifier
    #[serde(default)]
    pub external_id: Option<String>,
    /// Release date as reported
    #[serde(default)]
    pub release_date: Option<String>,
}

impl OracleMatch {
    /// Convert to a candidate attributed to `segment_name`
    pub fn into_candidate(self, segment_name: &str) -> MatchCandidate {
        let mut candidate = MatchCandidate::new(self.title, self.artist, MatchSource::Oracle, self.score);
        candidate.album = self.album;
        candidate.platform_id = self.external_id;
        candidate.release_date = self.release_date;
        candidate.segment_name = Some(segment_name.to_string());
        candidate
    }
}

/// Audio fingerprint matching service
#[async_trait]
pub trait FingerprintOracle: Send + Sync {
    /// Identify tracks containing the audio in `wav` (16-bit PCM WAV bytes)
    ///
    /// Return `SearchError::RateLimited` when the service asks the caller to
    /// back off; the scan then fails with `ScanError::RateLimitExceeded`.
    async fn identify(&self, wav: &[u8]) -> Result<Vec<OracleMatch>, SearchError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_into_candidate() {
        let m: OracleMatch = serde_json::from_str(
            r#"{ "title": "Night Drive", "artist": "Kay Moss", "score": 91.5, "external_id": "acr-1" }"#,
        )
        .unwrap();
        let candidate = m.into_candidate("PEAK");

        assert_eq!(candidate.source, MatchSource::Oracle);
        assert_eq!(candidate.confidence, 91.5);
        assert_eq!(candidate.platform_id.as_deref(), Some("acr-1"));
        assert_eq!(candidate.segment_name.as_deref(), Some("PEAK"));
        assert_eq!(candidate.album, None);
    }
}
