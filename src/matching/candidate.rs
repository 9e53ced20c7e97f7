//! Match candidates and their sources

use std::fmt;

use serde::{Deserialize, Serialize};

use super::normalize::dedup_key;

/// Where a candidate came from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MatchSource {
    /// Fingerprint service
    Oracle,
    /// Spotify Web API search
    Spotify,
    /// YouTube Data API search
    YouTube,
    /// TikTok (not searched yet)
    TikTok,
    /// SoundCloud (not searched yet)
    SoundCloud,
}

impl MatchSource {
    /// Lowercase identifier used in logs and serialized output
    pub fn as_str(&self) -> &'static str {
        match self {
            MatchSource::Oracle => "oracle",
            MatchSource::Spotify => "spotify",
            MatchSource::YouTube => "youtube",
            MatchSource::TikTok => "tiktok",
            MatchSource::SoundCloud => "soundcloud",
        }
    }
}

impl fmt::Display for MatchSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A published track that may contain the uploaded beat
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MatchCandidate {
    /// Track title
    pub title: String,
    /// Primary artist
    pub artist: String,
    /// Album, when the source reports one
    pub album: Option<String>,
    /// Source that produced the candidate
    pub source: MatchSource,
    /// Confidence in [0, 100]
    pub confidence: f32,
    /// Source-specific identifier
    pub platform_id: Option<String>,
    /// Link to the track
    pub url: Option<String>,
    /// Short audio preview, used for corroboration
    pub preview_url: Option<String>,
    /// Artwork
    pub cover_url: Option<String>,
    /// Release or publish date as reported by the source
    pub release_date: Option<String>,
    /// Segment whose audio produced the candidate (oracle matches only)
    pub segment_name: Option<String>,
    /// Acoustic corroboration score in [0, 100], when computed
    pub corroboration: Option<f32>,
}

impl MatchCandidate {
    /// Candidate with only the required fields set
    pub fn new(
        title: impl Into<String>,
        artist: impl Into<String>,
        source: MatchSource,
        confidence: f32,
    ) -> Self {
        Self {
            title: title.into(),
            artist: artist.into(),
            album: None,
            source,
            confidence: confidence.clamp(0.0, 100.0),
            platform_id: None,
            url: None,
            preview_url: None,
            cover_url: None,
            release_date: None,
            segment_name: None,
            corroboration: None,
        }
    }

    /// Normalized (title, artist) identity used for deduplication
    pub fn dedup_key(&self) -> (String, String) {
        (dedup_key(&self.title), dedup_key(&self.artist))
    }
}
