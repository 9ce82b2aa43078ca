//! Shared fixtures for the integration tests.

#![allow(dead_code)]

use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;

use scout::llm::{GatewayConfig, ProviderConfig, ProviderKind, RateLimit};
use scout::store::MemoryStore;
use scout::{ContentSource, ScoutConfig};
use scout_search::{
    ContentError, ContentErrorReason, ContentType, FetchOptions, FetchOutcome, FetchedContent,
    SearchError, Suggestion,
};

/// Scripted content source that counts its calls.
#[derive(Default)]
pub struct StubSource {
    suggestions: Vec<Suggestion>,
    failures: HashMap<String, ContentErrorReason>,
    discover_delay: Option<Duration>,
    fetch_delay: Option<Duration>,
    discover_error: bool,
    pub discover_calls: AtomicUsize,
    pub fetch_calls: AtomicUsize,
}

impl StubSource {
    pub fn new(suggestions: Vec<Suggestion>) -> Self {
        Self {
            suggestions,
            ..Self::default()
        }
    }

    pub fn failing(mut self, url: &str, reason: ContentErrorReason) -> Self {
        self.failures.insert(url.to_owned(), reason);
        self
    }

    pub fn slow_discovery(mut self, delay: Duration) -> Self {
        self.discover_delay = Some(delay);
        self
    }

    pub fn slow_fetch(mut self, delay: Duration) -> Self {
        self.fetch_delay = Some(delay);
        self
    }

    pub fn broken_discovery(mut self) -> Self {
        self.discover_error = true;
        self
    }

    pub fn discover_count(&self) -> usize {
        self.discover_calls.load(Ordering::SeqCst)
    }

    pub fn fetch_count(&self) -> usize {
        self.fetch_calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl ContentSource for StubSource {
    async fn discover(
        &self,
        _query: &str,
        max_results: usize,
    ) -> scout_search::Result<Vec<Suggestion>> {
        self.discover_calls.fetch_add(1, Ordering::SeqCst);
        if let Some(delay) = self.discover_delay {
            tokio::time::sleep(delay).await;
        }
        if self.discover_error {
            return Err(SearchError::DiscoveryFailed("every backend failed".into()));
        }
        Ok(self.suggestions.iter().take(max_results).cloned().collect())
    }

    async fn fetch(&self, url: &str, _opts: &FetchOptions) -> FetchOutcome {
        self.fetch_calls.fetch_add(1, Ordering::SeqCst);
        if let Some(delay) = self.fetch_delay {
            tokio::time::sleep(delay).await;
        }
        if let Some(reason) = self.failures.get(url) {
            return Err(ContentError::new(url, *reason, "stubbed failure").exhausted());
        }
        let title = self
            .suggestions
            .iter()
            .find(|s| s.url == url)
            .map(|s| s.title.clone())
            .unwrap_or_default();
        Ok(page(url, &title))
    }
}

/// A well-formed article about Rust ownership.
pub fn page(url: &str, title: &str) -> FetchedContent {
    let body = "Rust ownership model: every value has a single owner. ".repeat(40);
    FetchedContent {
        url: url.to_owned(),
        title: title.to_owned(),
        description: "How the borrow checker enforces ownership".into(),
        word_count: body.split_whitespace().count(),
        body_text: body,
        domain: scout_search::types::domain_of(url),
        content_type: ContentType::Article,
        has_images: false,
        has_videos: false,
        author: Some("Ferris".into()),
        publish_date: None,
        language: Some("en".into()),
    }
}

/// Five ownership-themed suggestions with descending hints.
pub fn ownership_suggestions() -> Vec<Suggestion> {
    [
        ("https://doc.rust-lang.org/book/ch04-01-what-is-ownership.html", "What is Ownership?", 0.95),
        ("https://blog.rust-lang.org/ownership-explained", "Ownership explained", 0.85),
        ("https://stackoverflow.com/questions/rust-ownership", "Rust ownership question", 0.75),
        ("https://www.reddit.com/r/rust/comments/ownership", "Ownership thread", 0.65),
        ("https://medium.com/rust-ownership-model", "The Rust ownership model", 0.55),
    ]
    .into_iter()
    .map(|(url, title, hint)| {
        Suggestion::new(url, title, format!("{title} snippet"), "DuckDuckGo").with_hint(hint)
    })
    .collect()
}

/// Provider config of `kind` served from `base_url`.
pub fn provider(name: &str, kind: ProviderKind, base_url: &str, model: &str) -> ProviderConfig {
    ProviderConfig {
        name: name.to_owned(),
        kind,
        base_url: base_url.to_owned(),
        models: vec![model.to_owned()],
        default_model: None,
        rate_limit: RateLimit {
            requests_per_minute: 60,
            tokens_per_minute: 100_000,
        },
    }
}

/// Gateway config over `providers`, falling back in the given order.
pub fn gateway_config(providers: Vec<ProviderConfig>) -> GatewayConfig {
    GatewayConfig {
        active_provider: providers.first().map(|p| p.name.clone()),
        fallback_order: providers.iter().map(|p| p.name.clone()).collect(),
        request_timeout_secs: 5,
        providers,
    }
}

/// Defaults with no inter-item analysis delay.
pub fn test_config() -> ScoutConfig {
    let mut config = ScoutConfig::default();
    config.analysis.inter_item_delay_ms = 0;
    config
}

/// Shared in-memory store, optionally holding one credential.
pub fn memory_store(credential: Option<(&str, &str)>) -> MemoryStore {
    match credential {
        Some((provider, key)) => MemoryStore::new().with_credential(provider, key),
        None => MemoryStore::new(),
    }
}

pub fn arc<T>(value: T) -> Arc<T> {
    Arc::new(value)
}
