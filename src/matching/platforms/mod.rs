//! Platform text searches
//!
//! Each platform turns a text query into scored [`MatchCandidate`]s. Failures
//! are returned as [`SearchError`]s and recovered by the aggregator; a
//! platform never aborts a scan.

pub mod spotify;
pub mod stub;
pub mod youtube;

#[cfg(test)]
pub(crate) mod test_http;

use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Client, Response};

use super::candidate::{MatchCandidate, MatchSource};
use crate::error::SearchError;

pub use spotify::SpotifySearch;
pub use stub::{SoundCloudSearch, TikTokSearch};
pub use youtube::YouTubeSearch;

/// A text search request
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SearchQuery {
    /// Free-text query (usually `"artist title"`)
    pub text: String,
    /// Maximum results requested from the platform
    pub limit: usize,
}

impl SearchQuery {
    /// Query with the given text and limit
    pub fn new(text: impl Into<String>, limit: usize) -> Self {
        Self {
            text: text.into(),
            limit,
        }
    }
}

/// A searchable music/video platform
#[async_trait]
pub trait PlatformSearch: Send + Sync {
    /// Source tag for produced candidates
    fn source(&self) -> MatchSource;

    /// Search for tracks matching `query`, already scored and filtered
    async fn search(&self, query: &SearchQuery) -> Result<Vec<MatchCandidate>, SearchError>;
}

/// HTTP client shared by the platform implementations
pub(crate) fn http_client(timeout: Duration) -> Result<Client, SearchError> {
    let builder = Client::builder().timeout(timeout);
    // Test servers listen on loopback, never behind a proxy
    #[cfg(test)]
    let builder = builder.no_proxy();
    builder
        .build()
        .map_err(|e| SearchError::Http(format!("Failed to build HTTP client: {}", e)))
}

/// Map non-success statuses to search errors
pub(crate) async fn check_status(response: Response) -> Result<Response, SearchError> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }

    match status.as_u16() {
        429 => Err(SearchError::RateLimited),
        401 => Err(SearchError::Auth(format!("Unauthorized ({})", status))),
        code => {
            let message = response.text().await.unwrap_or_default();
            Err(SearchError::Api {
                status: code,
                message,
            })
        }
    }
}
