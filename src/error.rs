//! Error types for the scan pipeline

use thiserror::Error;

use crate::matching::candidate::MatchSource;

/// Errors that abort a scan
///
/// Buffer-level failures (decode, empty or too-short audio) are fatal and
/// surfaced to the caller. Per-platform search failures never show up here;
/// they are recovered inside the aggregator as [`SearchError`]s.
#[derive(Debug, Error)]
pub enum ScanError {
    /// The container or codec could not be parsed
    #[error("Decoding error: {0}")]
    Decode(String),

    /// Nothing left after decoding or silence trimming
    #[error("Empty audio: {0}")]
    EmptyAudio(String),

    /// Fewer samples than one analysis window or frame
    #[error("Insufficient audio: need at least {required} samples, got {actual}")]
    InsufficientAudio {
        /// Minimum sample count for the stage
        required: usize,
        /// Samples actually available
        actual: usize,
    },

    /// Invalid input parameters
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// WAV encoding failed
    #[error("Encoding error: {0}")]
    Encode(String),

    /// An upstream service asked us to back off
    #[error("Rate limit exceeded by {origin}")]
    RateLimitExceeded {
        /// Source that rejected the request
        origin: MatchSource,
    },

    /// A blocking analysis task panicked or was cancelled
    #[error("Analysis task failed: {0}")]
    Join(String),
}

impl From<hound::Error> for ScanError {
    fn from(err: hound::Error) -> Self {
        ScanError::Encode(err.to_string())
    }
}

impl From<tokio::task::JoinError> for ScanError {
    fn from(err: tokio::task::JoinError) -> Self {
        ScanError::Join(err.to_string())
    }
}

/// Errors from a single match source (oracle or platform search)
#[derive(Debug, Error)]
pub enum SearchError {
    /// Credentials are missing for this platform
    #[error("Platform not configured: {0}")]
    NotConfigured(String),

    /// Transport failure
    #[error("Connection error: {0}")]
    Http(String),

    /// Non-success status from the platform API
    #[error("API error (status {status}): {message}")]
    Api {
        /// HTTP status code
        status: u16,
        /// Response body or reason
        message: String,
    },

    /// Token request rejected
    #[error("Authentication failed: {0}")]
    Auth(String),

    /// Quota or rate limit hit
    #[error("Rate limited")]
    RateLimited,

    /// The call did not settle within the configured bound
    #[error("Request timeout")]
    Timeout,

    /// Response body did not have the expected shape
    #[error("Invalid response: {0}")]
    InvalidResponse(String),
}

impl From<reqwest::Error> for SearchError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            SearchError::Timeout
        } else if err.is_decode() {
            SearchError::InvalidResponse(err.to_string())
        } else {
            SearchError::Http(err.to_string())
        }
    }
}
