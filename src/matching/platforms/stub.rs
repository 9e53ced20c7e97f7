//! Platforms without a usable public search API
//!
//! Registered so results and diagnostics list every source; both always
//! answer with no candidates.

use async_trait::async_trait;

use super::{PlatformSearch, SearchQuery};
use crate::error::SearchError;
use crate::matching::candidate::{MatchCandidate, MatchSource};

/// TikTok search (no results)
#[derive(Debug, Default, Clone, Copy)]
pub struct TikTokSearch;

/// SoundCloud search (no results)
#[derive(Debug, Default, Clone, Copy)]
pub struct SoundCloudSearch;

#[async_trait]
impl PlatformSearch for TikTokSearch {
    fn source(&self) -> MatchSource {
        MatchSource::TikTok
    }

    async fn search(&self, _query: &SearchQuery) -> Result<Vec<MatchCandidate>, SearchError> {
        Ok(Vec::new())
    }
}

#[async_trait]
impl PlatformSearch for SoundCloudSearch {
    fn source(&self) -> MatchSource {
        MatchSource::SoundCloud
    }

    async fn search(&self, _query: &SearchQuery) -> Result<Vec<MatchCandidate>, SearchError> {
        Ok(Vec::new())
    }
}
