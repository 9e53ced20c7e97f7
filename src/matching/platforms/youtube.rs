//! YouTube Data API v3 search

use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;

use super::{check_status, http_client, PlatformSearch, SearchQuery};
use crate::error::SearchError;
use crate::matching::candidate::{MatchCandidate, MatchSource};

const YOUTUBE_SEARCH_URL: &str = "https://www.googleapis.com/youtube/v3/search";

/// Largest `maxResults` the search endpoint accepts
const MAX_RESULTS: usize = 50;

/// 403 reasons that mean "back off" rather than "forbidden"
const QUOTA_REASONS: &[&str] = &[
    "quotaExceeded",
    "rateLimitExceeded",
    "userRateLimitExceeded",
    "dailyLimitExceeded",
];

/// YouTube video search by API key
pub struct YouTubeSearch {
    client: Client,
    api_key: Option<String>,
    base_url: String,
    min_confidence: f32,
}

#[derive(Debug, Deserialize)]
struct SearchResponse {
    #[serde(default)]
    items: Vec<SearchItem>,
}

#[derive(Debug, Deserialize)]
struct SearchItem {
    id: VideoId,
    snippet: Snippet,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct VideoId {
    video_id: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct Snippet {
    title: String,
    #[serde(default)]
    channel_title: String,
    published_at: Option<String>,
    thumbnails: Option<Thumbnails>,
}

#[derive(Debug, Deserialize)]
struct Thumbnails {
    high: Option<Thumbnail>,
    default: Option<Thumbnail>,
}

#[derive(Debug, Deserialize)]
struct Thumbnail {
    url: String,
}

#[derive(Debug, Deserialize)]
struct ErrorResponse {
    error: ErrorBody,
}

#[derive(Debug, Deserialize)]
struct ErrorBody {
    #[serde(default)]
    errors: Vec<ErrorDetail>,
}

#[derive(Debug, Deserialize)]
struct ErrorDetail {
    #[serde(default)]
    reason: String,
}

/// True when a 403 body reports an exhausted quota or rate limit
fn is_quota_error(body: &str) -> bool {
    serde_json::from_str::<ErrorResponse>(body)
        .map(|e| e.error.errors.iter().any(|d| QUOTA_REASONS.contains(&d.reason.as_str())))
        .unwrap_or(false)
}

impl YouTubeSearch {
    /// Create a client; `None` leaves the platform unconfigured
    pub fn new(api_key: Option<String>, timeout: Duration, min_confidence: f32) -> Result<Self, SearchError> {
        Ok(Self {
            client: http_client(timeout)?,
            api_key,
            base_url: YOUTUBE_SEARCH_URL.to_string(),
            min_confidence,
        })
    }

    /// Override the search endpoint
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }
}

/// Title relevance of a result for `query`
///
/// 100 when the whole query appears in the title (case-insensitive);
/// otherwise the percentage of query words longer than two characters that
/// appear in the title or contain it.
///
/// # Example
///
/// ```
/// use beatscan::matching::platforms::youtube::title_confidence;
///
/// assert_eq!(title_confidence("night drive", "Kay Moss - Night Drive (Official Video)"), 100.0);
/// assert_eq!(title_confidence("kay moss night drive", "Night Drive"), 50.0);
/// ```
pub fn title_confidence(query: &str, title: &str) -> f32 {
    let query = query.trim().to_lowercase();
    let title = title.to_lowercase();

    if !query.is_empty() && title.contains(&query) {
        return 100.0;
    }

    let words: Vec<&str> = query
        .split_whitespace()
        .filter(|w| w.chars().count() > 2)
        .collect();
    if words.is_empty() {
        return 0.0;
    }

    let matched = words
        .iter()
        .filter(|w| title.contains(*w) || (!title.is_empty() && w.contains(title.as_str())))
        .count();

    100.0 * matched as f32 / words.len() as f32
}

fn parse_response(query: &str, response: SearchResponse, min_confidence: f32) -> Vec<MatchCandidate> {
    response
        .items
        .into_iter()
        .filter_map(|item| {
            let video_id = item.id.video_id?;
            let confidence = title_confidence(query, &item.snippet.title);
            if confidence < min_confidence {
                return None;
            }

            let mut candidate = MatchCandidate::new(
                item.snippet.title,
                item.snippet.channel_title,
                MatchSource::YouTube,
                confidence,
            );
            candidate.url = Some(format!("https://www.youtube.com/watch?v={}", video_id));
            candidate.platform_id = Some(video_id);
            candidate.release_date = item.snippet.published_at;
            candidate.cover_url = item
                .snippet
                .thumbnails
                .and_then(|t| t.high.or(t.default))
                .map(|t| t.url);
            Some(candidate)
        })
        .collect()
}

#[async_trait]
impl PlatformSearch for YouTubeSearch {
    fn source(&self) -> MatchSource {
        MatchSource::YouTube
    }

    async fn search(&self, query: &SearchQuery) -> Result<Vec<MatchCandidate>, SearchError> {
        let api_key = self
            .api_key
            .as_deref()
            .ok_or_else(|| SearchError::NotConfigured("youtube: missing API key".to_string()))?;

        log::debug!("YouTube search: {:?} (limit {})", query.text, query.limit);

        let max_results = query.limit.clamp(1, MAX_RESULTS).to_string();
        let response = self
            .client
            .get(&self.base_url)
            .query(&[
                ("part", "snippet"),
                ("type", "video"),
                ("maxResults", max_results.as_str()),
                ("q", query.text.as_str()),
                ("key", api_key),
            ])
            .send()
            .await?;

        // Exhausted quota shares 403 with key restrictions
        if response.status().as_u16() == 403 {
            let message = response.text().await.unwrap_or_default();
            if is_quota_error(&message) {
                return Err(SearchError::RateLimited);
            }
            return Err(SearchError::Api { status: 403, message });
        }

        let body: SearchResponse = check_status(response).await?.json().await?;
        Ok(parse_response(&query.text, body, self.min_confidence))
    }
}
