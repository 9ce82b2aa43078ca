//! # scout-search
//!
//! Candidate discovery and page content extraction for the scout pipeline.
//!
//! ## Design
//!
//! - Queries DuckDuckGo, Bing and Wikipedia concurrently and merges results
//!   by weighted positional score, with cross-backend boosting
//! - Per-backend circuit breaker skips sources that keep failing
//! - Fetches pages directly, falling back to relay proxies
//! - Extracts title, description, main text and metadata from HTML
//! - Batches fetches in fixed-size chunks with cooperative cancellation
//!
//! ## Security
//!
//! - No API keys or secrets
//! - No network listeners; this is a library, not a server
//! - Search queries are logged only at trace level

pub mod backend;
pub mod backends;
pub mod circuit_breaker;
pub mod config;
pub mod content;
pub mod discovery;
pub mod error;
pub mod fetcher;
pub mod http;
pub mod types;
pub mod url_normalize;

use async_trait::async_trait;
use tokio_util::sync::CancellationToken;

pub use backend::DiscoveryBackend;
pub use config::{DiscoveryConfig, FetchOptions, FetcherConfig};
pub use discovery::Discovery;
pub use error::{ContentError, ContentErrorReason, Result, SearchError};
pub use fetcher::ContentFetcher;
pub use types::{
    ContentType, DiscoverySource, FetchOutcome, FetchProgress, FetchedContent, Suggestion,
};

/// Where the pipeline gets candidates and page content from.
///
/// [`WebSource`] is the real implementation; tests substitute stubs.
#[async_trait]
pub trait ContentSource: Send + Sync {
    /// Discover up to `max_results` candidate URLs for `query`.
    async fn discover(&self, query: &str, max_results: usize) -> Result<Vec<Suggestion>>;

    /// Fetch and extract a single page.
    async fn fetch(&self, url: &str, opts: &FetchOptions) -> FetchOutcome;

    /// Fetch `urls` in fixed-size chunks of `opts.max_concurrent`.
    ///
    /// Fetches within a chunk run concurrently; per-item failures are
    /// returned in place. Outcomes are in input order. `on_item` is called
    /// once per finished item.
    ///
    /// # Errors
    ///
    /// Returns [`SearchError::Cancelled`] if `cancel` is signalled before a
    /// chunk starts. Outcomes of already-finished chunks are discarded.
    async fn fetch_many(
        &self,
        urls: &[String],
        opts: &FetchOptions,
        cancel: &CancellationToken,
        on_item: &(dyn Fn(FetchProgress) + Send + Sync),
    ) -> Result<Vec<FetchOutcome>> {
        let total = urls.len();
        let mut outcomes = Vec::with_capacity(total);

        for chunk in urls.chunks(opts.max_concurrent.max(1)) {
            if cancel.is_cancelled() {
                return Err(SearchError::Cancelled);
            }
            let results = futures::future::join_all(chunk.iter().map(|url| self.fetch(url, opts))).await;
            for (url, outcome) in chunk.iter().zip(results) {
                on_item(FetchProgress {
                    completed: outcomes.len() + 1,
                    total,
                    url: url.clone(),
                    failed: outcome.is_err(),
                });
                outcomes.push(outcome);
            }
        }

        Ok(outcomes)
    }
}

/// Live web source: backend discovery plus direct/proxied page fetching.
pub struct WebSource {
    discovery: Discovery,
    fetcher: ContentFetcher,
}

impl WebSource {
    /// Build from discovery and fetcher configuration.
    ///
    /// # Errors
    ///
    /// Returns [`SearchError::Config`] if either config is invalid.
    pub fn from_config(discovery: &DiscoveryConfig, fetcher: &FetcherConfig) -> Result<Self> {
        Ok(Self::new(Discovery::from_config(discovery)?, ContentFetcher::new(fetcher)?))
    }

    /// Compose from already-built parts.
    pub fn new(discovery: Discovery, fetcher: ContentFetcher) -> Self {
        Self { discovery, fetcher }
    }

    /// The discovery component (for health reporting).
    pub fn discovery(&self) -> &Discovery {
        &self.discovery
    }
}

#[async_trait]
impl ContentSource for WebSource {
    async fn discover(&self, query: &str, max_results: usize) -> Result<Vec<Suggestion>> {
        self.discovery.discover(query, max_results).await
    }

    async fn fetch(&self, url: &str, opts: &FetchOptions) -> FetchOutcome {
        self.fetcher.fetch(url, opts).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Mutex;

    /// Records how many fetches are in flight at once.
    #[derive(Default)]
    struct CountingSource {
        in_flight: AtomicUsize,
        peak: AtomicUsize,
    }

    #[async_trait]
    impl ContentSource for CountingSource {
        async fn discover(&self, _query: &str, _max: usize) -> Result<Vec<Suggestion>> {
            Ok(vec![])
        }

        async fn fetch(&self, url: &str, _opts: &FetchOptions) -> FetchOutcome {
            let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
            self.peak.fetch_max(now, Ordering::SeqCst);
            tokio::task::yield_now().await;
            self.in_flight.fetch_sub(1, Ordering::SeqCst);
            if url.contains("bad") {
                Err(ContentError::new(url, ContentErrorReason::Timeout, "slow"))
            } else {
                Ok(FetchedContent {
                    url: url.to_owned(),
                    title: String::new(),
                    description: String::new(),
                    body_text: "text".into(),
                    domain: types::domain_of(url),
                    content_type: ContentType::Webpage,
                    word_count: 1,
                    has_images: false,
                    has_videos: false,
                    author: None,
                    publish_date: None,
                    language: None,
                })
            }
        }
    }

    fn urls(n: usize) -> Vec<String> {
        (0..n)
            .map(|i| {
                if i == 2 {
                    "https://bad.example/".to_string()
                } else {
                    format!("https://site{i}.example/")
                }
            })
            .collect()
    }

    #[tokio::test]
    async fn fetch_many_is_bounded_and_ordered() {
        let source = CountingSource::default();
        let opts = FetchOptions {
            max_concurrent: 2,
            proxy_only: false,
        };
        let seen = Mutex::new(Vec::new());
        let input = urls(5);

        let outcomes = source
            .fetch_many(&input, &opts, &CancellationToken::new(), &|p| {
                if let Ok(mut seen) = seen.lock() {
                    seen.push((p.completed, p.failed));
                }
            })
            .await
            .expect("batch");

        assert_eq!(outcomes.len(), 5);
        assert!(outcomes[2].is_err());
        assert_eq!(outcomes[4].as_ref().map(|c| c.url.as_str()).ok(), Some("https://site4.example/"));
        assert!(source.peak.load(Ordering::SeqCst) <= 2);

        let seen = seen.into_inner().expect("progress");
        assert_eq!(seen.iter().map(|(c, _)| *c).collect::<Vec<_>>(), vec![1, 2, 3, 4, 5]);
        assert_eq!(seen.iter().filter(|(_, failed)| *failed).count(), 1);
    }

    #[tokio::test]
    async fn fetch_many_honours_cancellation() {
        let source = CountingSource::default();
        let cancel = CancellationToken::new();
        cancel.cancel();
        let err = source
            .fetch_many(&urls(3), &FetchOptions::default(), &cancel, &|_| {})
            .await
            .unwrap_err();
        assert!(matches!(err, SearchError::Cancelled));
        assert_eq!(source.peak.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn zero_batch_size_still_progresses() {
        let source = CountingSource::default();
        let opts = FetchOptions {
            max_concurrent: 0,
            proxy_only: false,
        };
        let outcomes = source
            .fetch_many(&urls(2), &opts, &CancellationToken::new(), &|_| {})
            .await
            .expect("batch");
        assert_eq!(outcomes.len(), 2);
    }
}
