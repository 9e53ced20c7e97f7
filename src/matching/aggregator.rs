//! Fan-out / fan-in over the oracle and platform searches
//!
//! 1. Every prepared segment's WAV goes to the oracle (concurrently, each call
//!    bounded by the platform timeout)
//! 2. Text queries: upload hints first, then distinct (artist, title) pairs
//!    from the oracle, capped at `max_hint_queries`
//! 3. Every (platform, query) pair runs concurrently with its own timeout;
//!    failures become empty results recorded in [`AggregateOutcome::failures`]
//! 4. Merge, dedupe by normalized (title, artist), corroborate weak
//!    candidates, rank by confidence
//!
//! Only an oracle rate limit aborts the search.

use std::collections::HashSet;
use std::sync::Arc;
use std::time::Duration;

use futures::future::join_all;
use serde::Serialize;

use super::candidate::{MatchCandidate, MatchSource};
use super::corroboration::{Corroborator, HttpPreviewFetcher};
use super::hints::MetadataHints;
use super::normalize::{dedup_key, dedupe, rank};
use super::oracle::FingerprintOracle;
use super::platforms::{
    PlatformSearch, SearchQuery, SoundCloudSearch, SpotifySearch, TikTokSearch, YouTubeSearch,
};
use super::PreparedSegment;
use crate::config::{MatchingConfig, PlatformCredentials, ScanConfig};
use crate::error::{ScanError, SearchError};

/// A recovered failure from one source
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SourceFailure {
    /// Source that failed
    pub source: MatchSource,
    /// Segment name (oracle) or query text (platforms)
    pub context: String,
    /// What went wrong
    pub message: String,
}

/// Result of a multi-source search
#[derive(Debug, Clone, Default, Serialize)]
pub struct AggregateOutcome {
    /// Deduplicated candidates, highest confidence first
    pub matches: Vec<MatchCandidate>,
    /// Recovered per-source failures
    pub failures: Vec<SourceFailure>,
    /// Text queries sent to the platforms
    pub queries: Vec<String>,
    /// Segments the oracle answered for (possibly with no matches)
    pub segments_identified: usize,
}

/// Searches every configured source for tracks containing a beat
pub struct MatchAggregator {
    oracle: Option<Arc<dyn FingerprintOracle>>,
    platforms: Vec<Arc<dyn PlatformSearch>>,
    corroborator: Option<Corroborator>,
    config: MatchingConfig,
}

/// Builder for [`MatchAggregator`]
pub struct MatchAggregatorBuilder {
    oracle: Option<Arc<dyn FingerprintOracle>>,
    platforms: Vec<Arc<dyn PlatformSearch>>,
    corroborator: Option<Corroborator>,
    config: MatchingConfig,
}

impl MatchAggregatorBuilder {
    /// Use `oracle` for segment fingerprinting
    pub fn oracle(mut self, oracle: Arc<dyn FingerprintOracle>) -> Self {
        self.oracle = Some(oracle);
        self
    }

    /// Add a platform search
    pub fn platform(mut self, platform: Arc<dyn PlatformSearch>) -> Self {
        self.platforms.push(platform);
        self
    }

    /// Corroborate weak candidates acoustically
    pub fn corroborator(mut self, corroborator: Corroborator) -> Self {
        self.corroborator = Some(corroborator);
        self
    }

    /// Finish building
    pub fn build(self) -> MatchAggregator {
        MatchAggregator {
            oracle: self.oracle,
            platforms: self.platforms,
            corroborator: self.corroborator,
            config: self.config,
        }
    }
}

impl MatchAggregator {
    /// Start an aggregator with no sources
    pub fn builder(config: MatchingConfig) -> MatchAggregatorBuilder {
        MatchAggregatorBuilder {
            oracle: None,
            platforms: Vec::new(),
            corroborator: None,
            config,
        }
    }

    /// Aggregator over every supported platform plus HTTP corroboration
    ///
    /// Platforms without credentials stay registered and report
    /// `NotConfigured` failures instead of results.
    pub fn from_credentials(
        credentials: &PlatformCredentials,
        oracle: Option<Arc<dyn FingerprintOracle>>,
        config: &ScanConfig,
    ) -> Result<Self, SearchError> {
        let matching = &config.matching;
        let timeout = Duration::from_secs(matching.platform_timeout_secs);

        let spotify = SpotifySearch::new(
            credentials.spotify_client_id.clone(),
            credentials.spotify_client_secret.clone(),
            timeout,
            Duration::from_secs(matching.token_safety_margin_secs),
            matching.min_confidence,
        )?;
        let youtube = YouTubeSearch::new(credentials.youtube_api_key.clone(), timeout, matching.min_confidence)?;
        let corroborator = Corroborator::new(
            Arc::new(HttpPreviewFetcher::new(timeout)?),
            config.preprocess.clone(),
            config.features.clone(),
            matching.corroboration_threshold,
        );

        let mut builder = Self::builder(matching.clone())
            .platform(Arc::new(spotify))
            .platform(Arc::new(youtube))
            .platform(Arc::new(TikTokSearch))
            .platform(Arc::new(SoundCloudSearch))
            .corroborator(corroborator);
        if let Some(oracle) = oracle {
            builder = builder.oracle(oracle);
        }

        Ok(builder.build())
    }

    fn timeout(&self) -> Duration {
        Duration::from_secs(self.config.platform_timeout_secs)
    }

    /// Find published tracks matching the prepared segments and hints
    ///
    /// # Errors
    ///
    /// `ScanError::RateLimitExceeded` when the oracle asks to back off. Every
    /// other source failure is recovered and listed in the outcome.
    pub async fn find_matches(
        &self,
        segments: &[PreparedSegment],
        hints: &MetadataHints,
    ) -> Result<AggregateOutcome, ScanError> {
        let mut outcome = AggregateOutcome::default();

        let oracle_candidates = self.identify_segments(segments, &mut outcome).await?;
        outcome.queries = self.build_queries(hints, &oracle_candidates);
        let platform_candidates = self.search_platforms(&outcome.queries, &mut outcome.failures).await;

        let mut matches = dedupe(oracle_candidates.into_iter().chain(platform_candidates).collect());

        if let Some(corroborator) = &self.corroborator {
            corroborator.corroborate(&mut matches, segments).await;
            // Corroboration may pull a candidate under the floor
            matches.retain(|c| c.confidence >= self.config.min_confidence);
        }

        rank(&mut matches);
        outcome.matches = matches;

        log::info!(
            "Matching finished: {} candidate(s), {} query(ies), {} recovered failure(s)",
            outcome.matches.len(),
            outcome.queries.len(),
            outcome.failures.len()
        );

        Ok(outcome)
    }

    async fn identify_segments(
        &self,
        segments: &[PreparedSegment],
        outcome: &mut AggregateOutcome,
    ) -> Result<Vec<MatchCandidate>, ScanError> {
        let oracle = match &self.oracle {
            Some(oracle) => oracle,
            None => {
                log::debug!("No fingerprint oracle configured, skipping {} segment(s)", segments.len());
                return Ok(Vec::new());
            }
        };

        let timeout = self.timeout();
        let calls = segments.iter().map(|prepared| async move {
            let result = tokio::time::timeout(timeout, oracle.identify(&prepared.wav)).await;
            (prepared.segment.name.as_str(), result)
        });

        let mut candidates = Vec::new();
        for (name, result) in join_all(calls).await {
            let error = match result {
                Ok(Ok(matches)) => {
                    outcome.segments_identified += 1;
                    log::debug!("Oracle returned {} match(es) for {}", matches.len(), name);
                    candidates.extend(
                        matches
                            .into_iter()
                            .map(|m| m.into_candidate(name))
                            .filter(|c| c.confidence >= self.config.min_confidence),
                    );
                    continue;
                }
                Ok(Err(SearchError::RateLimited)) => {
                    log::warn!("Oracle rate limit hit on segment {}", name);
                    return Err(ScanError::RateLimitExceeded {
                        origin: MatchSource::Oracle,
                    });
                }
                Ok(Err(e)) => e,
                Err(_) => SearchError::Timeout,
            };

            log::warn!("Oracle failed for segment {}: {}", name, error);
            outcome.failures.push(SourceFailure {
                source: MatchSource::Oracle,
                context: name.to_string(),
                message: error.to_string(),
            });
        }

        Ok(candidates)
    }

    fn build_queries(&self, hints: &MetadataHints, oracle_candidates: &[MatchCandidate]) -> Vec<String> {
        let mut seen = HashSet::new();
        let mut queries = Vec::new();

        let from_oracle = oracle_candidates
            .iter()
            .map(|c| format!("{} {}", c.artist, c.title));

        for query in hints.query().into_iter().chain(from_oracle) {
            if queries.len() >= self.config.max_hint_queries {
                break;
            }
            let key = dedup_key(&query);
            if !key.is_empty() && seen.insert(key) {
                queries.push(query);
            }
        }

        queries
    }

    async fn search_platforms(&self, queries: &[String], failures: &mut Vec<SourceFailure>) -> Vec<MatchCandidate> {
        let timeout = self.timeout();
        let limit = self.config.search_limit;

        let calls = self.platforms.iter().flat_map(|platform| {
            queries.iter().map(move |text| async move {
                let query = SearchQuery::new(text.as_str(), limit);
                let result = match tokio::time::timeout(timeout, platform.search(&query)).await {
                    Ok(result) => result,
                    Err(_) => Err(SearchError::Timeout),
                };
                (platform.source(), text.as_str(), result)
            })
        });

        let mut candidates = Vec::new();
        for (source, text, result) in join_all(calls).await {
            match result {
                Ok(found) => {
                    log::debug!("{} returned {} candidate(s) for {:?}", source, found.len(), text);
                    candidates.extend(found.into_iter().filter(|c| c.confidence >= self.config.min_confidence));
                }
                Err(e) => {
                    match &e {
                        SearchError::NotConfigured(_) => log::debug!("{} skipped: {}", source, e),
                        _ => log::warn!("{} search failed for {:?}: {}", source, text, e),
                    }
                    failures.push(SourceFailure {
                        source,
                        context: text.to_string(),
                        message: e.to_string(),
                    });
                }
            }
        }

        candidates
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{FeatureConfig, PreprocessConfig};
    use crate::features::SegmentFeatures;
    use crate::io::encode_wav;
    use crate::matching::corroboration::PreviewFetcher;
    use crate::matching::oracle::OracleMatch;
    use crate::segmentation::{AudioSegment, Priority};
    use async_trait::async_trait;
    use std::sync::Mutex;

    struct FixedPlatform {
        source: MatchSource,
        results: Vec<MatchCandidate>,
        queries: Mutex<Vec<String>>,
    }

    impl FixedPlatform {
        fn new(source: MatchSource, results: Vec<MatchCandidate>) -> Self {
            Self {
                source,
                results,
                queries: Mutex::new(Vec::new()),
            }
        }
    }

    #[async_trait]
    impl PlatformSearch for FixedPlatform {
        fn source(&self) -> MatchSource {
            self.source
        }

        async fn search(&self, query: &SearchQuery) -> Result<Vec<MatchCandidate>, SearchError> {
            self.queries.lock().unwrap().push(query.text.clone());
            Ok(self.results.clone())
        }
    }

    struct FailingPlatform;

    #[async_trait]
    impl PlatformSearch for FailingPlatform {
        fn source(&self) -> MatchSource {
            MatchSource::YouTube
        }

        async fn search(&self, _query: &SearchQuery) -> Result<Vec<MatchCandidate>, SearchError> {
            Err(SearchError::Http("connection refused".to_string()))
        }
    }

    struct SlowPlatform;

    #[async_trait]
    impl PlatformSearch for SlowPlatform {
        fn source(&self) -> MatchSource {
            MatchSource::SoundCloud
        }

        async fn search(&self, _query: &SearchQuery) -> Result<Vec<MatchCandidate>, SearchError> {
            tokio::time::sleep(Duration::from_secs(3600)).await;
            Ok(vec![MatchCandidate::new("late", "x", MatchSource::SoundCloud, 99.0)])
        }
    }

    struct ScriptedOracle {
        result: fn() -> Result<Vec<OracleMatch>, SearchError>,
    }

    #[async_trait]
    impl FingerprintOracle for ScriptedOracle {
        async fn identify(&self, _wav: &[u8]) -> Result<Vec<OracleMatch>, SearchError> {
            (self.result)()
        }
    }

    fn spotify(title: &str, confidence: f32) -> MatchCandidate {
        MatchCandidate::new(title, "Artist", MatchSource::Spotify, confidence)
    }

    fn segment(name: &str) -> PreparedSegment {
        PreparedSegment {
            segment: AudioSegment {
                name: name.to_string(),
                start: 0,
                len: 44100,
                sample_rate: 44100,
                energy: 1.0,
                uniqueness: 1.0,
                priority: Priority::High,
            },
            wav: vec![0u8; 44],
            features: None,
        }
    }

    fn hints() -> MetadataHints {
        MetadataHints::new(Some("Night Drive"), Some("Kay Moss"))
    }

    #[tokio::test]
    async fn test_one_failing_platform_is_recovered() {
        let ok = FixedPlatform::new(
            MatchSource::Spotify,
            vec![spotify("One", 90.0), spotify("Two", 80.0), spotify("Three", 70.0)],
        );
        let aggregator = MatchAggregator::builder(MatchingConfig::default())
            .platform(Arc::new(ok))
            .platform(Arc::new(FailingPlatform))
            .build();

        let outcome = aggregator.find_matches(&[], &hints()).await.unwrap();

        assert_eq!(outcome.matches.len(), 3);
        assert_eq!(outcome.failures.len(), 1);
        assert_eq!(outcome.failures[0].source, MatchSource::YouTube);
        assert_eq!(outcome.failures[0].context, "Kay Moss Night Drive");
    }

    #[tokio::test]
    async fn test_dedupe_keeps_higher_confidence() {
        let a = FixedPlatform::new(MatchSource::Spotify, vec![spotify("Night Drive", 60.0)]);
        let b = FixedPlatform::new(
            MatchSource::YouTube,
            vec![MatchCandidate::new("Night Drive [Official Video]", "artist", MatchSource::YouTube, 85.0)],
        );
        let aggregator = MatchAggregator::builder(MatchingConfig::default())
            .platform(Arc::new(a))
            .platform(Arc::new(b))
            .build();

        let outcome = aggregator.find_matches(&[], &hints()).await.unwrap();

        assert_eq!(outcome.matches.len(), 1);
        assert_eq!(outcome.matches[0].confidence, 85.0);
        assert_eq!(outcome.matches[0].source, MatchSource::YouTube);
    }

    #[tokio::test]
    async fn test_results_ranked_and_filtered() {
        let platform = FixedPlatform::new(
            MatchSource::Spotify,
            vec![spotify("Low", 20.0), spotify("Mid", 65.0), spotify("High", 95.0)],
        );
        let aggregator = MatchAggregator::builder(MatchingConfig::default())
            .platform(Arc::new(platform))
            .build();

        let outcome = aggregator.find_matches(&[], &hints()).await.unwrap();
        let titles: Vec<&str> = outcome.matches.iter().map(|c| c.title.as_str()).collect();
        assert_eq!(titles, vec!["High", "Mid"]);
    }

    struct StaticFetcher {
        bytes: Vec<u8>,
    }

    #[async_trait]
    impl PreviewFetcher for StaticFetcher {
        async fn fetch(&self, _url: &str) -> Result<Vec<u8>, SearchError> {
            Ok(self.bytes.clone())
        }
    }

    #[tokio::test]
    async fn test_corroborated_candidate_below_floor_is_dropped() {
        let tone: Vec<f32> = (0..88200)
            .map(|i| (2.0 * std::f32::consts::PI * 330.0 * i as f32 / 44100.0).sin() * 0.5)
            .collect();
        let corroborator = Corroborator::new(
            Arc::new(StaticFetcher {
                bytes: encode_wav(&tone, 44100).unwrap(),
            }),
            PreprocessConfig::default(),
            FeatureConfig::default(),
            70.0,
        );

        // Nothing to compare against: every corroboration scores 0
        let mut reference = segment("FULL_TRACK");
        reference.features = Some(SegmentFeatures {
            bpm: None,
            pitch_semitones: 0.0,
            embedding: None,
            contour: Vec::new(),
        });

        let mut weak = spotify("Weak", 55.0);
        weak.preview_url = Some("https://p.scdn.co/weak.wav".to_string());
        let platform = FixedPlatform::new(MatchSource::Spotify, vec![weak, spotify("Kept", 60.0)]);
        let aggregator = MatchAggregator::builder(MatchingConfig::default())
            .platform(Arc::new(platform))
            .corroborator(corroborator)
            .build();

        let outcome = aggregator.find_matches(&[reference], &hints()).await.unwrap();
        let titles: Vec<&str> = outcome.matches.iter().map(|c| c.title.as_str()).collect();
        assert_eq!(titles, vec!["Kept"]);
    }

    #[tokio::test(start_paused = true)]
    async fn test_slow_platform_times_out() {
        let aggregator = MatchAggregator::builder(MatchingConfig::default())
            .platform(Arc::new(SlowPlatform))
            .platform(Arc::new(FixedPlatform::new(MatchSource::Spotify, vec![spotify("Fast", 75.0)])))
            .build();

        let outcome = aggregator.find_matches(&[], &hints()).await.unwrap();

        assert_eq!(outcome.matches.len(), 1);
        assert_eq!(outcome.matches[0].title, "Fast");
        assert_eq!(outcome.failures.len(), 1);
        assert_eq!(outcome.failures[0].source, MatchSource::SoundCloud);
        assert_eq!(outcome.failures[0].message, "Request timeout");
    }

    #[tokio::test]
    async fn test_oracle_results_seed_queries() {
        let oracle = ScriptedOracle {
            result: || {
                Ok(vec![
                    OracleMatch {
                        title: "Sampled".to_string(),
                        artist: "Rapper".to_string(),
                        album: None,
                        score: 88.0,
                        external_id: None,
                        release_date: None,
                    },
                    OracleMatch {
                        title: "Noise".to_string(),
                        artist: "Nobody".to_string(),
                        album: None,
                        score: 30.0,
                        external_id: None,
                        release_date: None,
                    },
                ])
            },
        };
        let platform = Arc::new(FixedPlatform::new(MatchSource::Spotify, Vec::new()));
        let aggregator = MatchAggregator::builder(MatchingConfig::default())
            .oracle(Arc::new(oracle))
            .platform(platform.clone())
            .build();

        let outcome = aggregator
            .find_matches(&[segment("FULL_TRACK"), segment("PEAK")], &MetadataHints::default())
            .await
            .unwrap();

        assert_eq!(outcome.segments_identified, 2);
        // Same oracle match from both segments collapses to one candidate
        assert_eq!(outcome.matches.len(), 1);
        assert_eq!(outcome.matches[0].segment_name.as_deref(), Some("FULL_TRACK"));
        assert_eq!(outcome.queries, vec!["Rapper Sampled".to_string()]);
        assert_eq!(*platform.queries.lock().unwrap(), vec!["Rapper Sampled".to_string()]);
    }

    #[tokio::test]
    async fn test_oracle_rate_limit_aborts() {
        let oracle = ScriptedOracle {
            result: || Err(SearchError::RateLimited),
        };
        let aggregator = MatchAggregator::builder(MatchingConfig::default())
            .oracle(Arc::new(oracle))
            .build();

        let err = aggregator
            .find_matches(&[segment("PEAK")], &MetadataHints::default())
            .await
            .unwrap_err();
        assert!(matches!(err, ScanError::RateLimitExceeded { origin: MatchSource::Oracle }));
        assert_eq!(err.to_string(), "Rate limit exceeded by oracle");
    }

    #[tokio::test]
    async fn test_oracle_failure_is_recorded() {
        let oracle = ScriptedOracle {
            result: || Err(SearchError::Api {
                status: 500,
                message: "boom".to_string(),
            }),
        };
        let aggregator = MatchAggregator::builder(MatchingConfig::default())
            .oracle(Arc::new(oracle))
            .build();

        let outcome = aggregator
            .find_matches(&[segment("MID")], &MetadataHints::default())
            .await
            .unwrap();
        assert_eq!(outcome.segments_identified, 0);
        assert_eq!(outcome.failures.len(), 1);
        assert_eq!(outcome.failures[0].context, "MID");
        assert!(outcome.queries.is_empty());
    }

    #[tokio::test]
    async fn test_unconfigured_platforms_do_not_fail_scan() {
        let config = ScanConfig::default();
        let aggregator = MatchAggregator::from_credentials(&PlatformCredentials::default(), None, &config).unwrap();

        let outcome = aggregator.find_matches(&[], &hints()).await.unwrap();
        assert!(outcome.matches.is_empty());
        let failed: Vec<MatchSource> = outcome.failures.iter().map(|f| f.source).collect();
        assert_eq!(failed, vec![MatchSource::Spotify, MatchSource::YouTube]);
    }
}
