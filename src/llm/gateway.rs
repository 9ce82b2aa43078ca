//! Provider gateway: one request contract over every configured backend.
//!
//! The gateway owns the provider registry, a per-provider [`RateLimiter`],
//! and a cache of adapter instances. A request goes to an explicitly named
//! provider, or to the active provider. When the active provider fails with
//! a retryable error, the gateway retries exactly once against the first
//! provider in fallback order that has credentials and budget left.
//!
//! # Example
//!
//! ```no_run
//! use std::sync::Arc;
//! use scout::llm::{GatewayConfig, HttpProviderFactory, LlmRequest, Message, ProviderGateway};
//! use scout::store::EnvCredentialStore;
//!
//! # async fn run() -> Result<(), scout::llm::LlmError> {
//! let gateway = ProviderGateway::new(
//!     &GatewayConfig::default(),
//!     Arc::new(EnvCredentialStore),
//!     Arc::new(HttpProviderFactory::default()),
//! )?;
//! let reply = gateway
//!     .request(&LlmRequest::new(vec![Message::user("Hello")]), None)
//!     .await?;
//! println!("{} answered: {}", reply.provider, reply.content);
//! # Ok(())
//! # }
//! ```

use std::collections::HashMap;
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tracing::Instrument;

use super::error::LlmError;
use super::provider::{ProviderAdapter, ProviderFactory};
use super::rate_limit::RateLimiter;
use super::spans::SPAN_LLM_REQUEST;
use super::types::{LlmRequest, LlmResponse, ProviderConfig, default_providers};
use crate::store::CredentialStore;

/// Characters of the credential that participate in the instance cache key.
const KEY_PREFIX_LEN: usize = 8;

/// Gateway settings, the `[llm]` section of the config file.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GatewayConfig {
    /// Provider used when a request names none. `None` selects the first
    /// credentialed provider in `fallback_order`.
    pub active_provider: Option<String>,
    /// Preference order for fallback (and for picking the active provider).
    pub fallback_order: Vec<String>,
    /// Per-request timeout in seconds.
    pub request_timeout_secs: u64,
    /// Provider registry.
    pub providers: Vec<ProviderConfig>,
}

impl Default for GatewayConfig {
    fn default() -> Self {
        Self {
            active_provider: None,
            fallback_order: ["openai", "anthropic", "gemini", "groq"]
                .into_iter()
                .map(String::from)
                .collect(),
            request_timeout_secs: 30,
            providers: default_providers(),
        }
    }
}

impl GatewayConfig {
    /// Check the registry and that every referenced provider exists.
    pub fn validate(&self) -> Result<(), LlmError> {
        if self.providers.is_empty() {
            return Err(LlmError::Config("at least one provider is required".into()));
        }
        if self.request_timeout_secs == 0 {
            return Err(LlmError::Config(
                "request_timeout_secs must be greater than 0".into(),
            ));
        }
        for provider in &self.providers {
            provider.validate()?;
        }
        let known = |name: &str| self.providers.iter().any(|p| p.name == name);
        if let Some(active) = self.active_provider.as_deref().filter(|a| !known(a)) {
            return Err(LlmError::Config(format!(
                "active provider '{active}' is not configured"
            )));
        }
        if let Some(unknown) = self.fallback_order.iter().find(|n| !known(n)) {
            return Err(LlmError::Config(format!(
                "fallback provider '{unknown}' is not configured"
            )));
        }
        Ok(())
    }
}

/// Point-in-time view of one provider.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ProviderStatus {
    /// Provider name.
    pub name: String,
    /// Whether a credential is stored.
    pub has_credentials: bool,
    /// Requests used in the current window.
    pub requests_used: u32,
    /// Tokens used in the current window.
    pub tokens_used: u64,
    /// Whether the next request would be refused locally.
    pub rate_limited: bool,
}

type InstanceKey = (String, String);

/// Multi-provider LLM gateway.
pub struct ProviderGateway {
    providers: HashMap<String, ProviderConfig>,
    /// Registry names in configuration order, for stable status output.
    names: Vec<String>,
    fallback_order: Vec<String>,
    active_provider: Option<String>,
    request_timeout: Duration,
    credentials: Arc<dyn CredentialStore>,
    factory: Arc<dyn ProviderFactory>,
    instances: Mutex<HashMap<InstanceKey, Arc<dyn ProviderAdapter>>>,
    limiter: RateLimiter,
    fallbacks: AtomicU32,
}

impl std::fmt::Debug for ProviderGateway {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ProviderGateway")
            .field("providers", &self.names)
            .field("fallback_order", &self.fallback_order)
            .field("active_provider", &self.active_provider)
            .field("request_timeout", &self.request_timeout)
            .finish_non_exhaustive()
    }
}

impl ProviderGateway {
    /// Build a gateway from `config`.
    ///
    /// # Errors
    ///
    /// Returns [`LlmError::Config`] if the config does not validate.
    pub fn new(
        config: &GatewayConfig,
        credentials: Arc<dyn CredentialStore>,
        factory: Arc<dyn ProviderFactory>,
    ) -> Result<Self, LlmError> {
        config.validate()?;
        Ok(Self {
            providers: config
                .providers
                .iter()
                .map(|p| (p.name.clone(), p.clone()))
                .collect(),
            names: config.providers.iter().map(|p| p.name.clone()).collect(),
            fallback_order: config.fallback_order.clone(),
            active_provider: config.active_provider.clone(),
            request_timeout: Duration::from_secs(config.request_timeout_secs),
            credentials,
            factory,
            instances: Mutex::new(HashMap::new()),
            limiter: RateLimiter::new(),
            fallbacks: AtomicU32::new(0),
        })
    }

    /// Provider a request without an explicit target goes to.
    ///
    /// The configured active provider, else the first provider in fallback
    /// order with credentials, else the first in fallback order.
    pub fn active_provider(&self) -> Option<String> {
        if let Some(active) = &self.active_provider {
            return Some(active.clone());
        }
        self.fallback_order
            .iter()
            .find(|name| self.credentials.get(name).is_some())
            .or_else(|| self.fallback_order.first())
            .or_else(|| self.names.first())
            .cloned()
    }

    /// Whether any provider has a credential stored.
    pub fn has_credentials(&self) -> bool {
        self.names.iter().any(|n| self.credentials.get(n).is_some())
    }

    /// Number of fallbacks taken since construction.
    pub fn fallback_count(&self) -> u32 {
        self.fallbacks.load(Ordering::Relaxed)
    }

    /// Send `request` to `provider`, or to the active provider with one
    /// fallback on retryable failure.
    ///
    /// Naming a provider disables fallback.
    pub async fn request(
        &self,
        request: &LlmRequest,
        provider: Option<&str>,
    ) -> Result<LlmResponse, LlmError> {
        let primary = match provider {
            Some(name) => name.to_owned(),
            None => self.active_provider().ok_or_else(|| LlmError::Unavailable {
                provider: "none".into(),
                reason: "no providers configured".into(),
            })?,
        };

        let err = match self.dispatch(&primary, request).await {
            Ok(response) => return Ok(response),
            Err(err) => err,
        };
        if provider.is_some() || !err.is_retryable() {
            return Err(err);
        }
        let Some(fallback) = self.fallback_for(&primary) else {
            tracing::debug!(provider = %primary, "no fallback provider available");
            return Err(err);
        };

        tracing::warn!(
            from = %primary,
            to = %fallback,
            error = %err,
            "provider failed, falling back"
        );
        self.fallbacks.fetch_add(1, Ordering::Relaxed);
        self.dispatch(&fallback, request).await
    }

    /// Minimal live request against `provider`. Never errors.
    pub async fn validate(&self, provider: &str) -> bool {
        let Some(config) = self.providers.get(provider) else {
            return false;
        };
        let adapter = match self.adapter(config) {
            Ok(adapter) => adapter,
            Err(e) => {
                tracing::debug!(provider, error = %e, "cannot validate provider");
                return false;
            }
        };
        tokio::time::timeout(self.request_timeout, adapter.validate())
            .await
            .unwrap_or(false)
    }

    /// Credential presence and window usage per provider.
    pub fn status(&self) -> Vec<ProviderStatus> {
        self.names
            .iter()
            .filter_map(|name| self.providers.get(name))
            .map(|config| {
                let window = self.limiter.snapshot(&config.name);
                ProviderStatus {
                    name: config.name.clone(),
                    has_credentials: self.credentials.get(&config.name).is_some(),
                    requests_used: window.map_or(0, |w| w.requests_used),
                    tokens_used: window.map_or(0, |w| w.tokens_used),
                    rate_limited: self.limiter.is_limited(&config.name, &config.rate_limit),
                }
            })
            .collect()
    }

    async fn dispatch(&self, name: &str, request: &LlmRequest) -> Result<LlmResponse, LlmError> {
        let config = self.providers.get(name).ok_or_else(|| LlmError::Unavailable {
            provider: name.to_owned(),
            reason: "provider is not configured".into(),
        })?;
        self.limiter.check(name, &config.rate_limit)?;
        let adapter = self.adapter(config)?;

        let span = tracing::info_span!(
            SPAN_LLM_REQUEST,
            provider = name,
            model = config.model_for(request)
        );
        let response = tokio::time::timeout(self.request_timeout, adapter.complete(request))
            .instrument(span)
            .await
            .map_err(|_| LlmError::Timeout {
                provider: name.to_owned(),
                secs: self.request_timeout.as_secs(),
            })??;

        self.limiter.record(name, response.usage.total_tokens);
        tracing::debug!(
            provider = name,
            tokens = response.usage.total_tokens,
            "provider request succeeded"
        );
        Ok(response)
    }

    fn adapter(&self, config: &ProviderConfig) -> Result<Arc<dyn ProviderAdapter>, LlmError> {
        let key = self
            .credentials
            .get(&config.name)
            .ok_or_else(|| LlmError::Unavailable {
                provider: config.name.clone(),
                reason: "no credentials stored".into(),
            })?;
        let cache_key = (
            config.name.clone(),
            key.chars().take(KEY_PREFIX_LEN).collect::<String>(),
        );

        let mut instances = self
            .instances
            .lock()
            .map_err(|_| LlmError::Config("provider cache lock poisoned".into()))?;
        if let Some(adapter) = instances.get(&cache_key) {
            return Ok(Arc::clone(adapter));
        }
        let adapter = self.factory.create(config, &key)?;
        instances.insert(cache_key, Arc::clone(&adapter));
        Ok(adapter)
    }

    fn fallback_for(&self, failed: &str) -> Option<String> {
        self.fallback_order
            .iter()
            .filter(|name| name.as_str() != failed)
            .find(|name| {
                self.providers.get(name.as_str()).is_some_and(|config| {
                    self.credentials.get(name).is_some()
                        && !self.limiter.is_limited(name, &config.rate_limit)
                })
            })
            .cloned()
    }
}
