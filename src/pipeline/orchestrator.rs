//! Search orchestration: discover → scrape → rank → complete.
//!
//! Each call to [`SearchOrchestrator::run`] is one run, identified by the
//! query fingerprint and a fresh run id. Runs are registered in an
//! active-run table so [`SearchOrchestrator::cancel`] can reach them; a
//! cancelled run returns [`ScoutError::Cancelled`] and never partial
//! results.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tokio_util::sync::CancellationToken;
use tracing::Instrument;
use uuid::Uuid;

use scout_search::url_normalize::canonical_url;
use scout_search::{ContentSource, FetchOptions, FetchProgress, Suggestion};

use super::filters;
use super::progress::{Phase, ProgressCallback, ProgressReporter};
use super::query::SearchQuery;
use super::ranking::{SearchResult, query_terms, rank, sort_results};
use crate::analysis::AnalysisEngine;
use crate::cache::ResultCache;
use crate::error::{Result, ScoutError};
use crate::llm::spans::{SPAN_PIPELINE_PHASE, SPAN_PIPELINE_RUN};
use crate::store::{HistoryEntry, HistoryStore};

/// Pipeline settings, the `[pipeline]` section of the config file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PipelineConfig {
    /// Pages fetched concurrently per batch.
    pub max_concurrent_scrapes: usize,
    /// Lifetime of cached result sets.
    pub cache_ttl_secs: u64,
    /// Serve repeated queries from the result cache.
    pub use_cache: bool,
    /// Re-score results with the LLM after ranking.
    pub auto_analyze: bool,
    /// Query history entries kept.
    pub history_limit: usize,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            max_concurrent_scrapes: 3,
            cache_ttl_secs: 300,
            use_cache: true,
            auto_analyze: false,
            history_limit: crate::store::DEFAULT_HISTORY_LIMIT,
        }
    }
}

/// Per-run options.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SearchOptions {
    /// Serve from and store into the result cache.
    pub use_cache: bool,
    /// Lifetime of the cached result set.
    pub cache_ttl: Duration,
    /// Re-score results with the LLM after ranking.
    pub auto_analyze: bool,
    /// Pages fetched concurrently per batch.
    pub max_concurrent_scrapes: usize,
    /// Fetch pages through proxies only.
    pub proxy_only: bool,
}

impl Default for SearchOptions {
    fn default() -> Self {
        Self::from(&PipelineConfig::default())
    }
}

impl From<&PipelineConfig> for SearchOptions {
    fn from(config: &PipelineConfig) -> Self {
        Self {
            use_cache: config.use_cache,
            cache_ttl: Duration::from_secs(config.cache_ttl_secs),
            auto_analyze: config.auto_analyze,
            max_concurrent_scrapes: config.max_concurrent_scrapes,
            proxy_only: false,
        }
    }
}

/// Something that went wrong without failing the run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub enum PipelineWarning {
    /// Auto-analysis failed; results carry heuristic scores only.
    AnalysisFailed(String),
}

/// What a run produced.
#[derive(Debug, Clone, PartialEq)]
pub struct SearchOutcome {
    /// Results, sorted by descending relevance.
    pub results: Vec<SearchResult>,
    /// Whether the results came from the result cache.
    pub from_cache: bool,
    /// Recovered problems.
    pub warnings: Vec<PipelineWarning>,
}

#[derive(Debug)]
struct ActiveRun {
    run_id: Uuid,
    token: CancellationToken,
}

type RunTable = Mutex<HashMap<String, ActiveRun>>;

/// Removes a run's table entry when the run ends, unless a newer run with
/// the same fingerprint replaced it.
struct RunGuard<'a> {
    table: &'a RunTable,
    fingerprint: String,
    run_id: Uuid,
}

impl Drop for RunGuard<'_> {
    fn drop(&mut self) {
        if let Ok(mut table) = self.table.lock() {
            if table
                .get(&self.fingerprint)
                .is_some_and(|run| run.run_id == self.run_id)
            {
                table.remove(&self.fingerprint);
            }
        }
    }
}

/// Runs searches end to end.
pub struct SearchOrchestrator {
    source: Arc<dyn ContentSource>,
    cache: ResultCache,
    history: Arc<dyn HistoryStore>,
    analysis: Option<Arc<AnalysisEngine>>,
    active: RunTable,
}

impl std::fmt::Debug for SearchOrchestrator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SearchOrchestrator")
            .field("active_runs", &self.active_runs())
            .field("analysis", &self.analysis.is_some())
            .finish_non_exhaustive()
    }
}

impl SearchOrchestrator {
    /// Orchestrator over `source`, caching into `cache`.
    pub fn new(
        source: Arc<dyn ContentSource>,
        cache: ResultCache,
        history: Arc<dyn HistoryStore>,
    ) -> Self {
        Self {
            source,
            cache,
            history,
            analysis: None,
            active: Mutex::new(HashMap::new()),
        }
    }

    /// Enable auto-analysis through `engine`.
    pub fn with_analysis(mut self, engine: Arc<AnalysisEngine>) -> Self {
        self.analysis = Some(engine);
        self
    }

    /// Run `query` to completion.
    ///
    /// # Errors
    ///
    /// - [`ScoutError::InvalidQuery`] before any network activity.
    /// - [`ScoutError::Network`] when discovery fails outright.
    /// - [`ScoutError::Cancelled`] when [`cancel`](Self::cancel) was called.
    pub async fn run(
        &self,
        query: &SearchQuery,
        options: &SearchOptions,
        on_progress: ProgressCallback,
    ) -> Result<SearchOutcome> {
        query.validate().map_err(ScoutError::InvalidQuery)?;
        let fingerprint = query.fingerprint();
        let progress = ProgressReporter::new(on_progress);
        tracing::trace!(query = %query.prompt, %fingerprint, "search requested");

        if options.use_cache {
            if let Some(results) = self.cache.get(&fingerprint) {
                tracing::info!(%fingerprint, results = results.len(), "serving search from cache");
                progress.emit(
                    Phase::Complete,
                    100,
                    format!("Found {} results (cached)", results.len()),
                    None,
                );
                return Ok(SearchOutcome {
                    results,
                    from_cache: true,
                    warnings: Vec::new(),
                });
            }
        }

        let run_id = Uuid::new_v4();
        let token = CancellationToken::new();
        let _guard = self.register(&fingerprint, run_id, token.clone());

        let span = tracing::info_span!(SPAN_PIPELINE_RUN, %run_id, %fingerprint);
        let outcome = self
            .execute(query, options, &fingerprint, &token, &progress)
            .instrument(span)
            .await;
        match &outcome {
            Ok(o) => tracing::info!(%fingerprint, results = o.results.len(), "search finished"),
            Err(ScoutError::Cancelled) => tracing::info!(%fingerprint, "search cancelled"),
            Err(e) => tracing::error!(%fingerprint, error = %e, "search failed"),
        }
        outcome
    }

    /// Signal the newest in-flight run for `query`. Returns whether one
    /// was found.
    pub fn cancel(&self, query: &SearchQuery) -> bool {
        let fingerprint = query.fingerprint();
        let Ok(table) = self.active.lock() else {
            return false;
        };
        match table.get(&fingerprint) {
            Some(run) => {
                run.token.cancel();
                tracing::debug!(%fingerprint, run_id = %run.run_id, "cancellation requested");
                true
            }
            None => false,
        }
    }

    /// Signal every in-flight run.
    pub fn cancel_all(&self) {
        if let Ok(table) = self.active.lock() {
            for run in table.values() {
                run.token.cancel();
            }
        }
    }

    /// Number of runs in flight.
    pub fn active_runs(&self) -> usize {
        self.active.lock().map(|t| t.len()).unwrap_or(0)
    }

    /// Query history, oldest first.
    pub fn history(&self) -> Result<Vec<HistoryEntry>> {
        Ok(self.history.list()?)
    }

    /// Forget the query history.
    pub fn clear_history(&self) -> Result<()> {
        Ok(self.history.clear()?)
    }

    /// Drop every cached result set.
    pub fn clear_cache(&self) -> Result<()> {
        Ok(self.cache.clear()?)
    }

    fn register(&self, fingerprint: &str, run_id: Uuid, token: CancellationToken) -> RunGuard<'_> {
        if let Ok(mut table) = self.active.lock() {
            table.insert(fingerprint.to_owned(), ActiveRun { run_id, token });
        }
        RunGuard {
            table: &self.active,
            fingerprint: fingerprint.to_owned(),
            run_id,
        }
    }

    async fn execute(
        &self,
        query: &SearchQuery,
        options: &SearchOptions,
        fingerprint: &str,
        token: &CancellationToken,
        progress: &ProgressReporter,
    ) -> Result<SearchOutcome> {
        let ensure_live = || {
            if token.is_cancelled() {
                Err(ScoutError::Cancelled)
            } else {
                Ok(())
            }
        };

        // Discovering
        ensure_live()?;
        progress.emit(Phase::Discovering, 0, "Discovering sources", None);
        let suggestions = self
            .source
            .discover(&query.prompt, query.max_results)
            .instrument(tracing::debug_span!(SPAN_PIPELINE_PHASE, phase = %Phase::Discovering))
            .await?;
        let discovered = suggestions.len();
        let suggestions = dedupe(filters::apply(suggestions, &query.filters), query.max_results);
        tracing::debug!(discovered, kept = suggestions.len(), "discovery finished");
        progress.emit(
            Phase::Discovering,
            10,
            format!("Found {} candidate sources", suggestions.len()),
            None,
        );

        // Scraping
        ensure_live()?;
        let urls: Vec<String> = suggestions.iter().map(|s| s.url.clone()).collect();
        let fetch_opts = FetchOptions {
            max_concurrent: options.max_concurrent_scrapes.max(1),
            proxy_only: options.proxy_only,
        };
        progress.emit(Phase::Scraping, 10, "Fetching pages", None);
        let on_item = |item: FetchProgress| {
            let pct = 10 + 60 * item.completed / item.total.max(1);
            progress.emit(
                Phase::Scraping,
                u8::try_from(pct).unwrap_or(70),
                format!("Fetched {} of {}", item.completed, item.total),
                Some(item.url),
            );
        };
        let outcomes = self
            .source
            .fetch_many(&urls, &fetch_opts, token, &on_item)
            .instrument(tracing::debug_span!(SPAN_PIPELINE_PHASE, phase = %Phase::Scraping))
            .await?;
        let failed = outcomes.iter().filter(|o| o.is_err()).count();
        if failed > 0 {
            tracing::debug!(failed, total = outcomes.len(), "some pages could not be fetched");
        }

        // Ranking
        ensure_live()?;
        progress.emit(Phase::Ranking, 70, "Ranking results", None);
        let terms = query_terms(&query.prompt);
        let mut results: Vec<SearchResult> = suggestions
            .iter()
            .zip(&outcomes)
            .map(|(suggestion, outcome)| rank(suggestion, outcome, &terms))
            .collect();
        sort_results(&mut results);

        let mut warnings = Vec::new();
        if options.auto_analyze {
            progress.emit(Phase::Ranking, 80, "Analysing results", None);
            match self.enhance(results.clone(), &query.prompt, token).await {
                Ok(enhanced) => results = enhanced,
                Err(_) if token.is_cancelled() => return Err(ScoutError::Cancelled),
                Err(message) => {
                    tracing::warn!(error = %message, "auto-analysis failed, keeping heuristic scores");
                    warnings.push(PipelineWarning::AnalysisFailed(message));
                }
            }
        }
        ensure_live()?;
        progress.emit(Phase::Ranking, 95, "Finalising results", None);

        // Complete
        sort_results(&mut results);
        if !results.is_empty() {
            if let Err(e) = self.cache.set(fingerprint, &results, options.cache_ttl) {
                tracing::warn!(%fingerprint, error = %e, "failed to cache results");
            }
        }
        if let Err(e) = self.history.append(&query.prompt) {
            tracing::warn!(error = %e, "failed to record search history");
        }
        progress.emit(
            Phase::Complete,
            100,
            format!("Found {} results", results.len()),
            None,
        );

        Ok(SearchOutcome {
            results,
            from_cache: false,
            warnings,
        })
    }

    async fn enhance(
        &self,
        results: Vec<SearchResult>,
        prompt: &str,
        token: &CancellationToken,
    ) -> std::result::Result<Vec<SearchResult>, String> {
        let engine = self
            .analysis
            .as_ref()
            .ok_or_else(|| "no analysis engine configured".to_string())?;
        engine
            .enhance(results, prompt, token)
            .await
            .map_err(|e| e.to_string())
    }
}

/// Drop repeated URLs (by canonical form), keeping the first, and cap.
fn dedupe(suggestions: Vec<Suggestion>, max: usize) -> Vec<Suggestion> {
    let mut seen = std::collections::HashSet::new();
    suggestions
        .into_iter()
        .filter(|s| seen.insert(canonical_url(&s.url)))
        .take(max)
        .collect()
}
