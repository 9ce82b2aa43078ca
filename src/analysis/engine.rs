//! LLM relevance scoring with caching, batching and metrics.

use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

use moka::future::Cache;
use serde::{Deserialize, Serialize};
use tokio_util::sync::CancellationToken;
use tracing::Instrument;

use scout_search::FetchedContent;

use super::metrics::{AnalysisMetrics, MetricsWindow};
use super::parse::parse_analysis;
use super::prompt::{SYSTEM_PROMPT, build_user_prompt};
use super::AnalysisResult;
use crate::llm::spans::SPAN_ANALYSIS_ITEM;
use crate::llm::{LlmError, LlmRequest, Message, ProviderGateway};
use crate::pipeline::ranking::{SearchResult, sort_results};
use crate::pipeline::query::normalize_prompt;

/// Upper bound on cached analyses.
const MAX_CACHE_ENTRIES: u64 = 1_000;

/// Analysis settings, the `[analysis]` section of the config file.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AnalysisConfig {
    /// Page text sent to the model, in characters.
    pub max_content_chars: usize,
    /// Lifetime of cached analyses.
    pub cache_ttl_secs: u64,
    /// Pause between items of a batch.
    pub inter_item_delay_ms: u64,
    /// Completion token cap per analysis.
    pub max_tokens: u32,
    /// Sampling temperature.
    pub temperature: f32,
}

impl Default for AnalysisConfig {
    fn default() -> Self {
        Self {
            max_content_chars: 4_000,
            cache_ttl_secs: 3_600,
            inter_item_delay_ms: 200,
            max_tokens: 500,
            temperature: 0.1,
        }
    }
}

/// Per-call analysis options.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AnalysisOptions {
    /// Send to this provider only (disables fallback).
    pub provider: Option<String>,
    /// Model override.
    pub model: Option<String>,
    /// Consult and populate the analysis cache.
    pub use_cache: bool,
}

impl Default for AnalysisOptions {
    fn default() -> Self {
        Self {
            provider: None,
            model: None,
            use_cache: true,
        }
    }
}

/// Progress of a batch analysis.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AnalysisProgress {
    /// Items finished so far.
    pub completed: usize,
    /// Items in the batch.
    pub total: usize,
    /// URL that just finished.
    pub current_url: String,
    /// Items that failed so far.
    pub errors: usize,
}

type CacheKey = (String, String);

/// Scores page relevance through the provider gateway.
pub struct AnalysisEngine {
    gateway: Arc<ProviderGateway>,
    config: AnalysisConfig,
    cache: Cache<CacheKey, AnalysisResult>,
    metrics: Mutex<MetricsWindow>,
}

impl std::fmt::Debug for AnalysisEngine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AnalysisEngine")
            .field("config", &self.config)
            .field("cached", &self.cache.entry_count())
            .finish_non_exhaustive()
    }
}

impl AnalysisEngine {
    /// Engine sending requests through `gateway`.
    pub fn new(gateway: Arc<ProviderGateway>, config: AnalysisConfig) -> Self {
        let cache = Cache::builder()
            .max_capacity(MAX_CACHE_ENTRIES)
            .time_to_live(Duration::from_secs(config.cache_ttl_secs))
            .build();
        Self {
            gateway,
            config,
            cache,
            metrics: Mutex::new(MetricsWindow::default()),
        }
    }

    /// The gateway requests go through.
    pub fn gateway(&self) -> &ProviderGateway {
        &self.gateway
    }

    /// Score `content` against `query`.
    ///
    /// Never fails: unparseable output and gateway failures (no provider,
    /// rate limit, transport) both yield [`AnalysisResult::fallback`],
    /// which is not cached.
    pub async fn analyze(
        &self,
        content: &FetchedContent,
        query: &str,
        opts: &AnalysisOptions,
    ) -> AnalysisResult {
        let started = Instant::now();
        match self.try_analyze(content, query, opts).await {
            Ok(result) => result,
            Err(e) => {
                tracing::warn!(url = %content.url, error = %e, "analysis request failed, using fallback scores");
                let fallback = AnalysisResult::fallback();
                self.record(&fallback, started, false);
                fallback
            }
        }
    }

    /// Like [`analyze`](Self::analyze) but hands gateway failures back so
    /// batches can record them per item.
    async fn try_analyze(
        &self,
        content: &FetchedContent,
        query: &str,
        opts: &AnalysisOptions,
    ) -> Result<AnalysisResult, LlmError> {
        let key = (content.url.clone(), normalize_prompt(query));
        let started = Instant::now();

        if opts.use_cache {
            if let Some(hit) = self.cache.get(&key).await {
                tracing::debug!(url = %content.url, "analysis cache hit");
                self.record(&hit, started, true);
                return Ok(hit);
            }
        }

        let mut request = LlmRequest::new(vec![
            Message::system(SYSTEM_PROMPT),
            Message::user(build_user_prompt(
                content,
                query,
                self.config.max_content_chars,
            )),
        ])
        .with_max_tokens(self.config.max_tokens)
        .with_temperature(self.config.temperature);
        if let Some(model) = &opts.model {
            request = request.with_model(model.clone());
        }

        let span = tracing::debug_span!(SPAN_ANALYSIS_ITEM, url = %content.url);
        let response = self
            .gateway
            .request(&request, opts.provider.as_deref())
            .instrument(span)
            .await?;

        let result = match parse_analysis(&response.content) {
            Some(result) => {
                if opts.use_cache {
                    self.cache.insert(key, result.clone()).await;
                }
                result
            }
            None => {
                tracing::warn!(
                    url = %content.url,
                    provider = %response.provider,
                    "unparseable analysis reply, using fallback scores"
                );
                AnalysisResult::fallback()
            }
        };
        self.record(&result, started, false);
        Ok(result)
    }

    /// Score `contents` one after another, pausing between items.
    ///
    /// Outcomes are in input order; one failure never stops the batch.
    /// Once `cancel` fires the batch stops at once, abandoning any request
    /// in flight, so fewer outcomes than inputs come back.
    pub async fn analyze_batch(
        &self,
        contents: &[FetchedContent],
        query: &str,
        opts: &AnalysisOptions,
        cancel: &CancellationToken,
        on_progress: &(dyn Fn(AnalysisProgress) + Send + Sync),
    ) -> Vec<Result<AnalysisResult, LlmError>> {
        let total = contents.len();
        let delay = Duration::from_millis(self.config.inter_item_delay_ms);
        let mut outcomes = Vec::with_capacity(total);
        let mut errors = 0;

        for (i, content) in contents.iter().enumerate() {
            if cancel.is_cancelled() {
                break;
            }
            if i > 0 && !delay.is_zero() {
                tokio::select! {
                    () = cancel.cancelled() => break,
                    () = tokio::time::sleep(delay) => {}
                }
            }
            let outcome = tokio::select! {
                () = cancel.cancelled() => break,
                outcome = self.try_analyze(content, query, opts) => outcome,
            };
            if let Err(e) = &outcome {
                errors += 1;
                tracing::warn!(url = %content.url, error = %e, "analysis failed");
            }
            outcomes.push(outcome);
            on_progress(AnalysisProgress {
                completed: i + 1,
                total,
                current_url: content.url.clone(),
                errors,
            });
        }
        outcomes
    }

    /// Re-score `results` with the model and re-sort.
    ///
    /// Relevance becomes the higher of the heuristic and model scores;
    /// confidence becomes the model's. Items whose analysis failed are left
    /// unchanged.
    ///
    /// # Errors
    ///
    /// Returns the last failure if every item failed.
    ///
    /// A cancelled `cancel` ends the batch early; callers must check the
    /// token themselves before using the returned results.
    pub async fn enhance(
        &self,
        mut results: Vec<SearchResult>,
        query: &str,
        cancel: &CancellationToken,
    ) -> Result<Vec<SearchResult>, LlmError> {
        if results.is_empty() {
            return Ok(results);
        }
        let pseudo: Vec<FetchedContent> = results.iter().map(pseudo_content).collect();
        let outcomes = self
            .analyze_batch(&pseudo, query, &AnalysisOptions::default(), cancel, &|_: AnalysisProgress| {})
            .await;

        let mut last_error = None;
        let mut enhanced = 0;
        for (result, outcome) in results.iter_mut().zip(outcomes) {
            match outcome {
                Ok(analysis) => {
                    result.relevance_score = result.relevance_score.max(analysis.relevance_score);
                    result.confidence_score = analysis.confidence_score;
                    enhanced += 1;
                }
                Err(e) => last_error = Some(e),
            }
        }
        if enhanced == 0 {
            if let Some(e) = last_error {
                return Err(e);
            }
        }

        sort_results(&mut results);
        Ok(results)
    }

    /// Rolling metrics over the last samples.
    pub fn metrics(&self) -> AnalysisMetrics {
        self.metrics
            .lock()
            .map(|m| m.snapshot())
            .unwrap_or_default()
    }

    /// Drop every cached analysis.
    pub fn clear_cache(&self) {
        self.cache.invalidate_all();
    }

    fn record(&self, result: &AnalysisResult, started: Instant, cache_hit: bool) {
        let elapsed_ms = started.elapsed().as_secs_f64() * 1_000.0;
        if let Ok(mut metrics) = self.metrics.lock() {
            metrics.record(
                result.relevance_score,
                result.confidence_score,
                elapsed_ms,
                cache_hit,
            );
        }
    }
}

/// Minimal content built from an already-ranked result.
fn pseudo_content(result: &SearchResult) -> FetchedContent {
    FetchedContent {
        url: result.url.clone(),
        title: result.title.clone(),
        description: result.description.clone(),
        body_text: String::new(),
        domain: result.metadata.domain.clone(),
        content_type: result.metadata.content_type,
        word_count: 0,
        has_images: false,
        has_videos: false,
        author: None,
        publish_date: None,
        language: None,
    }
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used, clippy::expect_used)]

    use std::sync::atomic::{AtomicUsize, Ordering};

    use async_trait::async_trait;
    use chrono::Utc;
    use scout_search::ContentType;

    use super::*;
    use crate::llm::{
        GatewayConfig, LlmResponse, ProviderAdapter, ProviderConfig, ProviderFactory, TokenUsage,
    };
    use crate::pipeline::{LoadStatus, ResultMetadata};
    use crate::store::MemoryStore;

    /// Replies with `reply`, or fails with HTTP 503 when it is `None`.
    struct Canned {
        reply: Option<String>,
        calls: Arc<AtomicUsize>,
    }

    #[async_trait]
    impl ProviderAdapter for Canned {
        fn name(&self) -> &str {
            "openai"
        }

        async fn complete(&self, _request: &LlmRequest) -> Result<LlmResponse, LlmError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            match &self.reply {
                Some(content) => Ok(LlmResponse {
                    content: content.clone(),
                    usage: TokenUsage::new(50, 20),
                    finish_reason: Some("stop".into()),
                    model: "stub".into(),
                    provider: "openai".into(),
                }),
                None => Err(LlmError::Api {
                    provider: "openai".into(),
                    status: Some(503),
                    message: "overloaded".into(),
                    rate_limited: false,
                }),
            }
        }
    }

    struct CannedFactory {
        reply: Option<String>,
        calls: Arc<AtomicUsize>,
    }

    impl ProviderFactory for CannedFactory {
        fn create(
            &self,
            _config: &ProviderConfig,
            _api_key: &str,
        ) -> Result<Arc<dyn ProviderAdapter>, LlmError> {
            Ok(Arc::new(Canned {
                reply: self.reply.clone(),
                calls: Arc::clone(&self.calls),
            }))
        }
    }

    fn engine(reply: Option<&str>) -> (AnalysisEngine, Arc<AtomicUsize>) {
        let calls = Arc::new(AtomicUsize::new(0));
        let factory = CannedFactory {
            reply: reply.map(String::from),
            calls: Arc::clone(&calls),
        };
        let gateway = ProviderGateway::new(
            &GatewayConfig::default(),
            Arc::new(MemoryStore::new().with_credential("openai", "sk-test")),
            Arc::new(factory),
        )
        .unwrap();
        let config = AnalysisConfig {
            inter_item_delay_ms: 0,
            ..AnalysisConfig::default()
        };
        (AnalysisEngine::new(Arc::new(gateway), config), calls)
    }

    fn page(url: &str) -> FetchedContent {
        FetchedContent {
            url: url.into(),
            title: "Ownership".into(),
            description: "How ownership works".into(),
            body_text: "Each value has an owner.".into(),
            domain: "doc.rust-lang.org".into(),
            content_type: ContentType::Article,
            word_count: 5,
            has_images: false,
            has_videos: false,
            author: None,
            publish_date: None,
            language: None,
        }
    }

    fn result(url: &str, relevance: f64) -> SearchResult {
        SearchResult {
            id: crate::pipeline::ranking::result_id(url),
            url: url.into(),
            title: "Title".into(),
            description: "Description".into(),
            relevance_score: relevance,
            confidence_score: 0.5,
            timestamp: Utc::now(),
            metadata: ResultMetadata {
                domain: "example.com".into(),
                content_type: ContentType::Webpage,
                load_status: LoadStatus::Loaded,
            },
        }
    }

    const GOOD: &str = r#"Here you go: {"relevanceScore": 0.9, "confidenceScore": 0.8, "description": "Explains ownership"}"#;

    #[tokio::test]
    async fn analyze_parses_and_caches() {
        let (engine, calls) = engine(Some(GOOD));
        let opts = AnalysisOptions::default();
        let first = engine.analyze(&page("https://a.example"), "Rust ownership", &opts).await;
        let second = engine.analyze(&page("https://a.example"), "rust  OWNERSHIP", &opts).await;

        assert_eq!(first, second);
        assert!((first.relevance_score - 0.9).abs() < f64::EPSILON);
        assert_eq!(calls.load(Ordering::SeqCst), 1);

        let metrics = engine.metrics();
        assert_eq!(metrics.total_analyses, 2);
        assert!((metrics.cache_hit_rate - 0.5).abs() < 1e-9);
    }

    #[tokio::test]
    async fn malformed_output_falls_back() {
        let (engine, _) = engine(Some("I think it is quite relevant!"));
        let result = engine
            .analyze(&page("https://a.example"), "rust", &AnalysisOptions::default())
            .await;
        assert_eq!(result, AnalysisResult::fallback());
        assert_eq!(result.description, "Analysis failed - using fallback scoring");
    }

    #[tokio::test]
    async fn gateway_failure_degrades_to_uncached_fallback() {
        let (engine, calls) = engine(None);
        let opts = AnalysisOptions::default();
        let first = engine.analyze(&page("https://a.example"), "rust", &opts).await;
        let second = engine.analyze(&page("https://a.example"), "rust", &opts).await;

        assert_eq!(first, AnalysisResult::fallback());
        assert_eq!(second, AnalysisResult::fallback());
        assert_eq!(calls.load(Ordering::SeqCst), 2);
        assert_eq!(engine.metrics().total_analyses, 2);
    }

    #[tokio::test]
    async fn batch_reports_progress_in_order() {
        let (engine, _) = engine(None);
        let seen = Mutex::new(Vec::new());
        let pages = [page("https://a.example"), page("https://b.example")];
        let outcomes = engine
            .analyze_batch(&pages, "rust", &AnalysisOptions::default(), &CancellationToken::new(), &|p: AnalysisProgress| {
                seen.lock().unwrap().push((p.completed, p.errors));
            })
            .await;
        assert_eq!(outcomes.len(), 2);
        assert!(outcomes.iter().all(Result::is_err));
        assert_eq!(*seen.lock().unwrap(), [(1, 1), (2, 2)]);
    }

    #[tokio::test(start_paused = true)]
    async fn batch_pauses_between_items() {
        let (engine, _) = engine(Some(GOOD));
        let engine = AnalysisEngine {
            config: AnalysisConfig::default(),
            ..engine
        };
        let pages = [page("https://a.example"), page("https://b.example"), page("https://c.example")];
        let started = tokio::time::Instant::now();
        engine
            .analyze_batch(&pages, "rust", &AnalysisOptions::default(), &CancellationToken::new(), &|_: AnalysisProgress| {})
            .await;
        assert!(started.elapsed() >= Duration::from_millis(400));
    }

    #[tokio::test]
    async fn enhance_takes_max_relevance_and_resorts() {
        let (engine, _) = engine(Some(GOOD));
        let results = vec![result("https://a.example", 0.95), result("https://b.example", 0.2)];
        let enhanced = engine.enhance(results, "rust", &CancellationToken::new()).await.unwrap();

        assert_eq!(enhanced[0].url, "https://a.example");
        assert!((enhanced[0].relevance_score - 0.95).abs() < f64::EPSILON);
        assert!((enhanced[1].relevance_score - 0.9).abs() < f64::EPSILON);
        assert!(enhanced.iter().all(|r| (r.confidence_score - 0.8).abs() < f64::EPSILON));
    }

    #[tokio::test]
    async fn enhance_fails_only_when_every_item_fails() {
        let (engine, _) = engine(None);
        let live = CancellationToken::new();
        assert!(engine.enhance(vec![result("https://a.example", 0.5)], "rust", &live).await.is_err());
        assert!(engine.enhance(Vec::new(), "rust", &live).await.unwrap().is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn cancelled_batch_stops_before_the_next_item() {
        let (engine, calls) = engine(Some(GOOD));
        let engine = AnalysisEngine {
            config: AnalysisConfig::default(),
            ..engine
        };
        let pages = [page("https://a.example"), page("https://b.example"), page("https://c.example")];
        let cancel = CancellationToken::new();
        let outcomes = engine
            .analyze_batch(&pages, "rust", &AnalysisOptions::default(), &cancel, &|p: AnalysisProgress| {
                if p.completed == 1 {
                    cancel.cancel();
                }
            })
            .await;

        assert_eq!(outcomes.len(), 1);
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn pre_cancelled_batch_sends_nothing() {
        let (engine, calls) = engine(Some(GOOD));
        let cancel = CancellationToken::new();
        cancel.cancel();
        let outcomes = engine
            .analyze_batch(&[page("https://a.example")], "rust", &AnalysisOptions::default(), &cancel, &|_: AnalysisProgress| {})
            .await;
        assert!(outcomes.is_empty());
        assert_eq!(calls.load(Ordering::SeqCst), 0);
    }
}
