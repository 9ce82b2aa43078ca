//! Scout: LLM-ranked web search.
//!
//! A query goes through four phases:
//! discover candidate URLs → fetch and extract pages → rank → complete.
//!
//! # Architecture
//!
//! - **Discovery and fetching** live in the `scout-search` crate behind the
//!   [`ContentSource`] trait
//! - **Ranking** scores pages heuristically ([`pipeline::ranking`]) and,
//!   optionally, with an LLM ([`analysis::AnalysisEngine`])
//! - **LLM access** goes through [`llm::ProviderGateway`], which rate-limits
//!   each provider and falls back once on retryable failures
//! - **Caching** keeps finished result sets by query fingerprint
//!   ([`cache::ResultCache`])
//!
//! [`Scout`] wires all of these together from a [`ScoutConfig`].

pub mod analysis;
pub mod cache;
pub mod config;
pub mod error;
pub mod llm;
pub mod logging;
pub mod pipeline;
pub mod store;

use std::sync::Arc;

pub use scout_search::ContentSource;

pub use config::ScoutConfig;
pub use error::{Result, ScoutError};
pub use pipeline::{
    ProgressCallback, ProgressEvent, SearchOptions, SearchOutcome, SearchQuery, SearchResult,
};

use analysis::AnalysisEngine;
use cache::ResultCache;
use llm::{HttpProviderFactory, ProviderFactory, ProviderGateway};
use pipeline::SearchOrchestrator;
use store::{
    CredentialStore, EnvCredentialStore, HistoryStore, KeyValueStore, KeyringCredentialStore,
    MemoryStore, SqliteStore,
};

/// Persistence collaborators injected into [`Scout`].
#[derive(Clone)]
pub struct Stores {
    /// Backs the result cache.
    pub values: Arc<dyn KeyValueStore>,
    /// Records submitted queries.
    pub history: Arc<dyn HistoryStore>,
    /// Resolves provider API keys.
    pub credentials: Arc<dyn CredentialStore>,
}

impl Stores {
    /// Stores described by `config.storage`.
    ///
    /// # Errors
    ///
    /// Returns [`ScoutError::Storage`] if the SQLite database cannot be
    /// opened.
    pub fn from_config(config: &ScoutConfig) -> Result<Self> {
        let limit = config.pipeline.history_limit;
        let credentials: Arc<dyn CredentialStore> = if config.storage.use_keyring {
            Arc::new(KeyringCredentialStore::new())
        } else {
            Arc::new(EnvCredentialStore)
        };

        match &config.storage.sqlite_path {
            Some(path) => {
                let db = Arc::new(SqliteStore::open(path)?.with_history_limit(limit));
                Ok(Self {
                    values: Arc::clone(&db) as Arc<dyn KeyValueStore>,
                    history: db,
                    credentials,
                })
            }
            None => {
                let memory = Arc::new(MemoryStore::new().with_history_limit(limit));
                Ok(Self {
                    values: Arc::clone(&memory) as Arc<dyn KeyValueStore>,
                    history: memory,
                    credentials,
                })
            }
        }
    }

    /// Everything in one in-process [`MemoryStore`].
    pub fn in_memory(store: MemoryStore) -> Self {
        let store = Arc::new(store);
        Self {
            values: Arc::clone(&store) as Arc<dyn KeyValueStore>,
            history: Arc::clone(&store) as Arc<dyn HistoryStore>,
            credentials: store,
        }
    }
}

/// Composition root: one instance of every component.
pub struct Scout {
    config: ScoutConfig,
    gateway: Arc<ProviderGateway>,
    analysis: Arc<AnalysisEngine>,
    orchestrator: SearchOrchestrator,
}

impl std::fmt::Debug for Scout {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Scout")
            .field("gateway", &self.gateway)
            .field("orchestrator", &self.orchestrator)
            .finish_non_exhaustive()
    }
}

impl Scout {
    /// Build with the live web source, HTTP providers and the stores named
    /// in `config`.
    ///
    /// # Errors
    ///
    /// Returns an error if the config is invalid or a store cannot be
    /// opened.
    pub fn from_config(config: ScoutConfig) -> Result<Self> {
        config.validate()?;
        let source = scout_search::WebSource::from_config(&config.discovery, &config.fetcher)?;
        let stores = Stores::from_config(&config)?;
        Self::with_parts(
            config,
            Arc::new(source),
            stores,
            Arc::new(HttpProviderFactory::default()),
        )
    }

    /// Build from explicit collaborators.
    ///
    /// # Errors
    ///
    /// Returns an error if the config is invalid.
    pub fn with_parts(
        config: ScoutConfig,
        source: Arc<dyn ContentSource>,
        stores: Stores,
        factory: Arc<dyn ProviderFactory>,
    ) -> Result<Self> {
        config.validate()?;
        let gateway = Arc::new(ProviderGateway::new(
            &config.llm,
            stores.credentials,
            factory,
        )?);
        let analysis = Arc::new(AnalysisEngine::new(
            Arc::clone(&gateway),
            config.analysis.clone(),
        ));
        let orchestrator = SearchOrchestrator::new(
            source,
            ResultCache::new(stores.values),
            stores.history,
        )
        .with_analysis(Arc::clone(&analysis));

        Ok(Self {
            config,
            gateway,
            analysis,
            orchestrator,
        })
    }

    /// Run `query` with the configured pipeline options.
    ///
    /// # Errors
    ///
    /// See [`SearchOrchestrator::run`].
    pub async fn search(
        &self,
        query: &SearchQuery,
        on_progress: ProgressCallback,
    ) -> Result<SearchOutcome> {
        let options = SearchOptions::from(&self.config.pipeline);
        self.orchestrator.run(query, &options, on_progress).await
    }

    /// Run `query` with explicit options.
    ///
    /// # Errors
    ///
    /// See [`SearchOrchestrator::run`].
    pub async fn search_with(
        &self,
        query: &SearchQuery,
        options: &SearchOptions,
        on_progress: ProgressCallback,
    ) -> Result<SearchOutcome> {
        self.orchestrator.run(query, options, on_progress).await
    }

    /// Cancel the in-flight run for `query`.
    pub fn cancel(&self, query: &SearchQuery) -> bool {
        self.orchestrator.cancel(query)
    }

    /// Active configuration.
    pub fn config(&self) -> &ScoutConfig {
        &self.config
    }

    /// The search orchestrator.
    pub fn orchestrator(&self) -> &SearchOrchestrator {
        &self.orchestrator
    }

    /// The analysis engine.
    pub fn analysis(&self) -> &AnalysisEngine {
        &self.analysis
    }

    /// The provider gateway.
    pub fn gateway(&self) -> &ProviderGateway {
        &self.gateway
    }
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used, clippy::expect_used)]

    use super::*;

    #[test]
    fn memory_stores_share_one_backend() {
        let mut config = ScoutConfig::default();
        config.pipeline.history_limit = 1;
        let stores = Stores::from_config(&config).unwrap();

        stores.history.append("first").unwrap();
        stores.history.append("second").unwrap();
        let history = stores.history.list().unwrap();
        assert_eq!(history.len(), 1);
        assert_eq!(history[0].query, "second");

        stores.values.set("k", b"v", None).unwrap();
        assert_eq!(stores.values.get("k").unwrap().as_deref(), Some(&b"v"[..]));
    }

    #[test]
    fn in_memory_exposes_seeded_credentials() {
        let stores = Stores::in_memory(MemoryStore::new().with_credential("groq", "gsk-1"));
        assert_eq!(stores.credentials.get("groq").as_deref(), Some("gsk-1"));
        assert!(stores.credentials.get("openai").is_none());
    }
}
