//! OAuth access token caching
//!
//! One [`CachedTokenProvider`] per credential set. The cached token is reused
//! until it is within the safety margin of expiry; a refresh holds the async
//! lock across the fetch, so concurrent callers wait for a single request
//! instead of issuing their own.

use std::time::Duration;

use async_trait::async_trait;
use tokio::sync::Mutex;
use tokio::time::Instant;

use crate::error::SearchError;

/// A freshly issued access token
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AccessToken {
    /// Bearer token value
    pub value: String,
    /// Lifetime from the moment it was issued
    pub expires_in: Duration,
}

/// Something that can issue access tokens (an OAuth token endpoint)
#[async_trait]
pub trait TokenSource: Send + Sync {
    /// Request a new token
    async fn fetch_token(&self) -> Result<AccessToken, SearchError>;
}

#[derive(Debug)]
struct CachedToken {
    value: String,
    expires_at: Instant,
}

/// Caches tokens from a [`TokenSource`] with single-flight refresh
pub struct CachedTokenProvider<S> {
    source: S,
    safety_margin: Duration,
    cached: Mutex<Option<CachedToken>>,
}

impl<S: TokenSource> CachedTokenProvider<S> {
    /// Wrap a token source, refreshing `safety_margin` before expiry
    pub fn new(source: S, safety_margin: Duration) -> Self {
        Self {
            source,
            safety_margin,
            cached: Mutex::new(None),
        }
    }

    /// Provider over a transformed source, with the same margin and an empty cache
    pub fn map_source<T: TokenSource>(self, f: impl FnOnce(S) -> T) -> CachedTokenProvider<T> {
        CachedTokenProvider::new(f(self.source), self.safety_margin)
    }

    /// Current token, fetching a new one when missing or about to expire
    pub async fn token(&self) -> Result<String, SearchError> {
        let mut cached = self.cached.lock().await;

        if let Some(token) = cached.as_ref() {
            if Instant::now() + self.safety_margin < token.expires_at {
                return Ok(token.value.clone());
            }
        }

        log::debug!("Refreshing access token");
        let fresh = self.source.fetch_token().await?;
        let value = fresh.value.clone();
        *cached = Some(CachedToken {
            value: fresh.value,
            expires_at: Instant::now() + fresh.expires_in,
        });

        Ok(value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    struct CountingSource {
        calls: Arc<AtomicUsize>,
        lifetime: Duration,
        delay: Duration,
    }

    #[async_trait]
    impl TokenSource for CountingSource {
        async fn fetch_token(&self) -> Result<AccessToken, SearchError> {
            let n = self.calls.fetch_add(1, Ordering::SeqCst) + 1;
            if !self.delay.is_zero() {
                tokio::time::sleep(self.delay).await;
            }
            Ok(AccessToken {
                value: format!("token-{}", n),
                expires_in: self.lifetime,
            })
        }
    }

    struct FailingSource;

    #[async_trait]
    impl TokenSource for FailingSource {
        async fn fetch_token(&self) -> Result<AccessToken, SearchError> {
            Err(SearchError::Auth("invalid_client".to_string()))
        }
    }

    fn provider(lifetime_secs: u64, delay_ms: u64) -> (CachedTokenProvider<CountingSource>, Arc<AtomicUsize>) {
        let calls = Arc::new(AtomicUsize::new(0));
        let source = CountingSource {
            calls: calls.clone(),
            lifetime: Duration::from_secs(lifetime_secs),
            delay: Duration::from_millis(delay_ms),
        };
        (CachedTokenProvider::new(source, Duration::from_secs(60)), calls)
    }

    #[tokio::test(start_paused = true)]
    async fn test_token_reused_until_margin() {
        let (provider, calls) = provider(3600, 0);

        assert_eq!(provider.token().await.unwrap(), "token-1");
        assert_eq!(provider.token().await.unwrap(), "token-1");
        assert_eq!(calls.load(Ordering::SeqCst), 1);

        // 3600 - 60 - 1 seconds in: still outside the margin
        tokio::time::advance(Duration::from_secs(3539)).await;
        assert_eq!(provider.token().await.unwrap(), "token-1");

        // Within 60 s of expiry
        tokio::time::advance(Duration::from_secs(2)).await;
        assert_eq!(provider.token().await.unwrap(), "token-2");
        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn test_concurrent_refresh_is_single_flight() {
        let (provider, calls) = provider(3600, 500);

        let results = futures::future::join_all((0..8).map(|_| provider.token())).await;

        assert!(results.iter().all(|r| r.as_deref().ok() == Some("token-1")));
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_fetch_failure_is_not_cached() {
        let provider = CachedTokenProvider::new(FailingSource, Duration::from_secs(60));
        assert!(matches!(provider.token().await, Err(SearchError::Auth(_))));
        assert!(matches!(provider.token().await, Err(SearchError::Auth(_))));
    }
}
