//! Candidate discovery: concurrent backend fan-out, scoring and merge.
//!
//! Queries every enabled backend concurrently, scores each backend's
//! results by weight and position decay, deduplicates by canonical URL,
//! boosts URLs found by several backends, sorts and truncates.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use crate::backend::DiscoveryBackend;
use crate::backends::{BingBackend, DuckDuckGoBackend, WikipediaBackend};
use crate::circuit_breaker::{CircuitBreaker, CircuitState};
use crate::config::DiscoveryConfig;
use crate::error::SearchError;
use crate::http;
use crate::types::{DiscoverySource, Suggestion};
use crate::url_normalize::{canonical_url, is_fetchable};

/// Positional score: `weight / (1 + 0.1 * position)`.
pub fn position_score(weight: f64, position: usize) -> f64 {
    weight / (1.0 + position as f64 * 0.1)
}

/// Boost for a URL returned by `backend_count` distinct backends.
pub fn cross_backend_boost(score: f64, backend_count: usize) -> f64 {
    score * (1.0 + 0.15 * backend_count.saturating_sub(1) as f64)
}

/// Fan-out discovery over a set of backends.
pub struct Discovery {
    backends: Vec<Arc<dyn DiscoveryBackend>>,
    breaker: Mutex<CircuitBreaker>,
}

impl Discovery {
    /// Build the configured built-in backends sharing one HTTP client.
    ///
    /// # Errors
    ///
    /// Returns [`SearchError::Config`] for an invalid config or
    /// [`SearchError::Http`] if the client cannot be built.
    pub fn from_config(config: &DiscoveryConfig) -> Result<Self, SearchError> {
        config.validate()?;
        let client = http::build_client(
            http::ClientPurpose::Discovery,
            Duration::from_secs(config.timeout_secs),
            config.user_agent.as_deref(),
        )?;

        let backends = config
            .backends
            .iter()
            .map(|source| -> Arc<dyn DiscoveryBackend> {
                match source {
                    DiscoverySource::DuckDuckGo => {
                        Arc::new(DuckDuckGoBackend::new(client.clone(), config.safe_search))
                    }
                    DiscoverySource::Bing => {
                        Arc::new(BingBackend::new(client.clone(), config.safe_search))
                    }
                    DiscoverySource::Wikipedia => Arc::new(WikipediaBackend::new(client.clone())),
                }
            })
            .collect();

        Ok(Self::with_backends(
            backends,
            config.failure_threshold,
            Duration::from_secs(config.cooldown_secs),
        ))
    }

    /// Build from explicit backends (used for custom sources and tests).
    pub fn with_backends(
        backends: Vec<Arc<dyn DiscoveryBackend>>,
        failure_threshold: u32,
        cooldown: Duration,
    ) -> Self {
        Self {
            backends,
            breaker: Mutex::new(CircuitBreaker::new(failure_threshold, cooldown)),
        }
    }

    /// Circuit state of every backend that has been queried.
    pub fn backend_health(&self) -> Vec<(String, CircuitState)> {
        self.breaker
            .lock()
            .map(|b| b.health_report().into_iter().map(|(n, s, _)| (n, s)).collect())
            .unwrap_or_default()
    }

    /// Discover up to `max_results` candidates for `query`.
    ///
    /// # Errors
    ///
    /// Returns [`SearchError::DiscoveryFailed`] only if every attempted
    /// backend failed, or if every backend is cooling down.
    pub async fn discover(&self, query: &str, max_results: usize) -> Result<Vec<Suggestion>, SearchError> {
        let active: Vec<Arc<dyn DiscoveryBackend>> = {
            let mut breaker = self
                .breaker
                .lock()
                .map_err(|_| SearchError::DiscoveryFailed("circuit breaker lock poisoned".into()))?;
            self.backends
                .iter()
                .filter(|b| {
                    let attempt = breaker.should_attempt(b.name());
                    if !attempt {
                        tracing::debug!(backend = b.name(), "skipping backend with open circuit");
                    }
                    attempt
                })
                .cloned()
                .collect()
        };

        if active.is_empty() {
            return Err(SearchError::DiscoveryFailed(
                "no discovery backend available (all circuits open)".into(),
            ));
        }

        let futures = active.iter().map(|backend| {
            let backend = Arc::clone(backend);
            async move {
                let outcome = backend.discover(query, max_results).await;
                (backend, outcome)
            }
        });
        let outcomes = futures::future::join_all(futures).await;

        let mut scored: Vec<Suggestion> = Vec::new();
        let mut errors: Vec<String> = Vec::new();
        {
            let mut breaker = self
                .breaker
                .lock()
                .map_err(|_| SearchError::DiscoveryFailed("circuit breaker lock poisoned".into()))?;
            for (backend, outcome) in outcomes {
                match outcome {
                    Ok(results) => {
                        breaker.record_success(backend.name());
                        tracing::debug!(backend = backend.name(), count = results.len(), "backend returned results");
                        let weight = backend.weight();
                        scored.extend(results.into_iter().enumerate().map(|(pos, s)| {
                            let score = position_score(weight, pos);
                            s.with_hint(score)
                        }));
                    }
                    Err(err) => {
                        breaker.record_failure(backend.name());
                        tracing::warn!(backend = backend.name(), error = %err, "discovery backend failed");
                        errors.push(format!("{}: {err}", backend.name()));
                    }
                }
            }
        }

        if scored.is_empty() && errors.len() == active.len() {
            return Err(SearchError::DiscoveryFailed(errors.join("; ")));
        }

        Ok(merge(scored, max_results))
    }
}

/// Dedupe by canonical URL, boost cross-backend hits, sort and truncate.
///
/// Non-fetchable URLs are dropped. Ties are broken by URL so the order
/// is deterministic.
pub fn merge(suggestions: Vec<Suggestion>, max_results: usize) -> Vec<Suggestion> {
    let mut groups: HashMap<String, (Suggestion, Vec<String>)> = HashMap::new();

    for suggestion in suggestions.into_iter().filter(|s| is_fetchable(&s.url)) {
        let key = canonical_url(&suggestion.url);
        groups
            .entry(key)
            .and_modify(|(best, sources)| {
                if !sources.contains(&suggestion.source) {
                    sources.push(suggestion.source.clone());
                }
                if suggestion.relevance_hint > best.relevance_hint {
                    *best = suggestion.clone();
                }
            })
            .or_insert_with(|| {
                let sources = vec![suggestion.source.clone()];
                (suggestion, sources)
            });
    }

    let mut merged: Vec<Suggestion> = groups
        .into_values()
        .map(|(best, sources)| {
            let boosted = cross_backend_boost(best.relevance_hint, sources.len());
            best.with_hint(boosted)
        })
        .collect();

    merged.sort_by(|a, b| {
        b.relevance_hint
            .partial_cmp(&a.relevance_hint)
            .unwrap_or(std::cmp::Ordering::Equal)
            .then_with(|| a.url.cmp(&b.url))
    });
    merged.truncate(max_results);
    merged
}
