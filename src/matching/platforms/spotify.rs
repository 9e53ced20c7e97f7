//! Spotify Web API track search (client-credentials flow)

use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;

use super::{check_status, http_client, PlatformSearch, SearchQuery};
use crate::error::SearchError;
use crate::matching::candidate::{MatchCandidate, MatchSource};
use crate::matching::token::{AccessToken, CachedTokenProvider, TokenSource};

const SPOTIFY_TOKEN_URL: &str = "https://accounts.spotify.com/api/token";
const SPOTIFY_SEARCH_URL: &str = "https://api.spotify.com/v1/search";

/// Client-credentials token endpoint
pub struct SpotifyTokenSource {
    client: Client,
    client_id: String,
    client_secret: String,
    token_url: String,
}

#[derive(Debug, Deserialize)]
struct TokenResponse {
    access_token: String,
    expires_in: u64,
}

impl SpotifyTokenSource {
    /// Token source for one client id/secret pair
    pub fn new(client: Client, client_id: String, client_secret: String) -> Self {
        Self {
            client,
            client_id,
            client_secret,
            token_url: SPOTIFY_TOKEN_URL.to_string(),
        }
    }

    /// Override the token endpoint
    pub fn with_token_url(mut self, token_url: impl Into<String>) -> Self {
        self.token_url = token_url.into();
        self
    }
}

#[async_trait]
impl TokenSource for SpotifyTokenSource {
    async fn fetch_token(&self) -> Result<AccessToken, SearchError> {
        let response = self
            .client
            .post(&self.token_url)
            .basic_auth(&self.client_id, Some(&self.client_secret))
            .form(&[("grant_type", "client_credentials")])
            .send()
            .await?;

        if response.status().as_u16() == 400 {
            let body = response.text().await.unwrap_or_default();
            return Err(SearchError::Auth(format!("Token request rejected: {}", body)));
        }

        let token: TokenResponse = check_status(response).await?.json().await?;
        log::debug!("Spotify token issued, valid for {}s", token.expires_in);

        Ok(AccessToken {
            value: token.access_token,
            expires_in: Duration::from_secs(token.expires_in),
        })
    }
}

/// Spotify track search
pub struct SpotifySearch {
    client: Client,
    tokens: Option<CachedTokenProvider<SpotifyTokenSource>>,
    base_url: String,
    min_confidence: f32,
}

#[derive(Debug, Deserialize)]
struct SearchResponse {
    tracks: Option<TrackPage>,
}

#[derive(Debug, Deserialize)]
struct TrackPage {
    #[serde(default)]
    items: Vec<Track>,
}

#[derive(Debug, Deserialize)]
struct Track {
    id: String,
    name: String,
    #[serde(default)]
    artists: Vec<Artist>,
    album: Option<Album>,
    #[serde(default)]
    popularity: u32,
    preview_url: Option<String>,
    external_urls: Option<ExternalUrls>,
}

#[derive(Debug, Deserialize)]
struct Artist {
    name: String,
}

#[derive(Debug, Deserialize)]
struct Album {
    name: String,
    release_date: Option<String>,
    #[serde(default)]
    images: Vec<Image>,
}

#[derive(Debug, Deserialize)]
struct Image {
    url: String,
}

#[derive(Debug, Deserialize)]
struct ExternalUrls {
    spotify: Option<String>,
}

impl SpotifySearch {
    /// Create a client; both credentials are required to search
    pub fn new(
        client_id: Option<String>,
        client_secret: Option<String>,
        timeout: Duration,
        token_safety_margin: Duration,
        min_confidence: f32,
    ) -> Result<Self, SearchError> {
        let client = http_client(timeout)?;
        let tokens = match (client_id, client_secret) {
            (Some(id), Some(secret)) => Some(CachedTokenProvider::new(
                SpotifyTokenSource::new(client.clone(), id, secret),
                token_safety_margin,
            )),
            _ => None,
        };

        Ok(Self {
            client,
            tokens,
            base_url: SPOTIFY_SEARCH_URL.to_string(),
            min_confidence,
        })
    }

    /// Override the search endpoint
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    /// Override the token endpoint, discarding any cached token
    pub fn with_token_url(mut self, token_url: impl Into<String>) -> Self {
        let token_url = token_url.into();
        self.tokens = self
            .tokens
            .map(|tokens| tokens.map_source(|source| source.with_token_url(token_url)));
        self
    }
}

/// Confidence of the result at `index` (0-based) with the given popularity
///
/// Mean of a rank score (`100 - 5 * index`, floored at 0) and popularity.
///
/// # Example
///
/// ```
/// use beatscan::matching::platforms::spotify::rank_confidence;
///
/// assert_eq!(rank_confidence(0, 80), 90.0);
/// assert_eq!(rank_confidence(30, 40), 20.0);
/// ```
pub fn rank_confidence(index: usize, popularity: u32) -> f32 {
    let rank = 100.0 - 5.0 * index as f32;
    (rank.max(0.0) + popularity.min(100) as f32) / 2.0
}

fn parse_response(response: SearchResponse, min_confidence: f32) -> Vec<MatchCandidate> {
    let items = response.tracks.map(|t| t.items).unwrap_or_default();

    items
        .into_iter()
        .enumerate()
        .filter_map(|(index, track)| {
            let confidence = rank_confidence(index, track.popularity);
            if confidence < min_confidence {
                return None;
            }

            let artist = track
                .artists
                .into_iter()
                .next()
                .map(|a| a.name)
                .unwrap_or_default();

            let mut candidate = MatchCandidate::new(track.name, artist, MatchSource::Spotify, confidence);
            candidate.platform_id = Some(track.id);
            candidate.url = track.external_urls.and_then(|u| u.spotify);
            candidate.preview_url = track.preview_url;
            if let Some(album) = track.album {
                candidate.cover_url = album.images.into_iter().next().map(|i| i.url);
                candidate.release_date = album.release_date;
                candidate.album = Some(album.name);
            }
            Some(candidate)
        })
        .collect()
}

#[async_trait]
impl PlatformSearch for SpotifySearch {
    fn source(&self) -> MatchSource {
        MatchSource::Spotify
    }

    async fn search(&self, query: &SearchQuery) -> Result<Vec<MatchCandidate>, SearchError> {
        let tokens = self
            .tokens
            .as_ref()
            .ok_or_else(|| SearchError::NotConfigured("spotify: missing client credentials".to_string()))?;
        let token = tokens.token().await?;

        log::debug!("Spotify search: {:?} (limit {})", query.text, query.limit);

        let limit = query.limit.clamp(1, 50).to_string();
        let response = self
            .client
            .get(&self.base_url)
            .bearer_auth(token)
            .query(&[("q", query.text.as_str()), ("type", "track"), ("limit", limit.as_str())])
            .send()
            .await?;

        let body: SearchResponse = check_status(response).await?.json().await?;
        Ok(parse_response(body, self.min_confidence))
    }
}
