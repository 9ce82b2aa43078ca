//! Discovery and fetcher configuration with sensible defaults.
//!
//! [`DiscoveryConfig`] controls which backends are queried and how, and
//! [`FetcherConfig`] controls page fetching, the fallback proxy list and
//! extraction limits. Both deserialize with per-field defaults so they can
//! be embedded in a larger TOML config file.

use serde::{Deserialize, Serialize};

use crate::error::SearchError;
use crate::types::DiscoverySource;

/// Fallback relay endpoints tried in order when a direct fetch fails.
///
/// `{url}` is replaced with the percent-encoded target URL.
pub const DEFAULT_PROXIES: &[&str] = &[
    "https://api.allorigins.win/raw?url={url}",
    "https://corsproxy.io/?url={url}",
    "https://api.codetabs.com/v1/proxy?quest={url}",
];

/// Configuration for candidate discovery.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DiscoveryConfig {
    /// Which backends to query. Queried concurrently; results are merged.
    pub backends: Vec<DiscoverySource>,
    /// Per-backend HTTP request timeout in seconds.
    pub timeout_secs: u64,
    /// Whether to request safe search filtering where supported.
    pub safe_search: bool,
    /// Custom User-Agent string. If `None`, a built-in browser UA is rotated.
    pub user_agent: Option<String>,
    /// Consecutive failures before a backend is temporarily skipped.
    pub failure_threshold: u32,
    /// Seconds a tripped backend is skipped before a probe is allowed.
    pub cooldown_secs: u64,
}

impl Default for DiscoveryConfig {
    fn default() -> Self {
        Self {
            backends: DiscoverySource::all().to_vec(),
            timeout_secs: 8,
            safe_search: true,
            user_agent: None,
            failure_threshold: 3,
            cooldown_secs: 60,
        }
    }
}

impl DiscoveryConfig {
    /// Validates this configuration.
    pub fn validate(&self) -> Result<(), SearchError> {
        if self.backends.is_empty() {
            return Err(SearchError::Config(
                "at least one discovery backend must be enabled".into(),
            ));
        }
        if self.timeout_secs == 0 {
            return Err(SearchError::Config(
                "discovery timeout_secs must be greater than 0".into(),
            ));
        }
        Ok(())
    }
}

/// Configuration for page fetching and extraction.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct FetcherConfig {
    /// Per-fetch timeout in seconds, applied to the direct fetch and each proxy attempt.
    pub timeout_secs: u64,
    /// Maximum characters of body text kept after extraction.
    pub max_content_length: usize,
    /// Fallback proxy templates containing a `{url}` placeholder.
    pub proxies: Vec<String>,
    /// Custom User-Agent string. If `None`, a built-in browser UA is rotated.
    pub user_agent: Option<String>,
}

impl Default for FetcherConfig {
    fn default() -> Self {
        Self {
            timeout_secs: 10,
            max_content_length: 10_000,
            proxies: DEFAULT_PROXIES.iter().map(|p| (*p).to_owned()).collect(),
            user_agent: None,
        }
    }
}

impl FetcherConfig {
    /// Validates this configuration.
    ///
    /// Checks:
    /// - `timeout_secs` must be greater than 0
    /// - `max_content_length` must be greater than 0
    /// - every proxy template must contain `{url}`
    pub fn validate(&self) -> Result<(), SearchError> {
        if self.timeout_secs == 0 {
            return Err(SearchError::Config(
                "fetcher timeout_secs must be greater than 0".into(),
            ));
        }
        if self.max_content_length == 0 {
            return Err(SearchError::Config(
                "max_content_length must be greater than 0".into(),
            ));
        }
        if let Some(bad) = self.proxies.iter().find(|p| !p.contains("{url}")) {
            return Err(SearchError::Config(format!(
                "proxy template {bad:?} is missing the {{url}} placeholder"
            )));
        }
        Ok(())
    }
}

/// Per-call options for [`crate::ContentSource::fetch_many`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FetchOptions {
    /// Batch size: the bound on concurrently outstanding fetches.
    pub max_concurrent: usize,
    /// Skip the direct request and go straight to the proxies.
    pub proxy_only: bool,
}

impl Default for FetchOptions {
    fn default() -> Self {
        Self {
            max_concurrent: 3,
            proxy_only: false,
        }
    }
}
