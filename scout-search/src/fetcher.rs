//! Page fetching with proxy fallback.
//!
//! A fetch first goes direct. If that fails, the configured relay proxies
//! are tried in order, starting from the one that last succeeded, until
//! one returns extractable HTML.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use url::form_urlencoded;

use crate::config::{FetchOptions, FetcherConfig};
use crate::content;
use crate::error::{
    classify_reqwest_error, classify_status, ContentError, ContentErrorReason, SearchError,
};
use crate::http;
use crate::types::FetchedContent;
use crate::url_normalize::is_fetchable;

/// Fetches pages and extracts their content.
pub struct ContentFetcher {
    client: reqwest::Client,
    proxies: Vec<String>,
    timeout: Duration,
    max_content_length: usize,
    last_good_proxy: AtomicUsize,
}

impl ContentFetcher {
    /// Build a fetcher from configuration.
    ///
    /// # Errors
    ///
    /// Returns [`SearchError::Config`] for invalid configuration or
    /// [`SearchError::Http`] if the client cannot be built.
    pub fn new(config: &FetcherConfig) -> Result<Self, SearchError> {
        config.validate()?;
        let timeout = Duration::from_secs(config.timeout_secs);
        let client = http::build_client(
            http::ClientPurpose::Pages,
            timeout,
            config.user_agent.as_deref(),
        )?;
        Ok(Self {
            client,
            proxies: config.proxies.clone(),
            timeout,
            max_content_length: config.max_content_length,
            last_good_proxy: AtomicUsize::new(0),
        })
    }

    /// Index of the proxy the next fallback sequence starts from.
    pub fn preferred_proxy(&self) -> usize {
        self.last_good_proxy.load(Ordering::Relaxed)
    }

    /// Fetch `url` and extract its content.
    ///
    /// # Errors
    ///
    /// Returns a [`ContentError`] classified by the last failure. When the
    /// direct request and every proxy failed, `all_proxies_failed` is set.
    pub async fn fetch(&self, url: &str, opts: &FetchOptions) -> Result<FetchedContent, ContentError> {
        if !is_fetchable(url) {
            return Err(ContentError::new(
                url,
                ContentErrorReason::Invalid,
                "URL must be absolute http(s) with a host",
            ));
        }

        let mut last_error = None;

        if !opts.proxy_only {
            match self.fetch_via(url, url).await {
                Ok(page) => return Ok(page),
                Err(err) => {
                    tracing::debug!(url, reason = %err.reason, "direct fetch failed, trying proxies");
                    last_error = Some(err);
                }
            }
        }

        let count = self.proxies.len();
        let start = self.preferred_proxy() % count.max(1);
        for offset in 0..count {
            let index = (start + offset) % count;
            let proxied = proxy_url(&self.proxies[index], url);
            match self.fetch_via(&proxied, url).await {
                Ok(page) => {
                    self.last_good_proxy.store(index, Ordering::Relaxed);
                    tracing::debug!(url, proxy = index, "fetched via proxy");
                    return Ok(page);
                }
                Err(err) => {
                    tracing::debug!(url, proxy = index, reason = %err.reason, "proxy fetch failed");
                    last_error = Some(err);
                }
            }
        }

        let err = last_error.unwrap_or_else(|| {
            ContentError::new(url, ContentErrorReason::Invalid, "no fetch route configured")
        });
        tracing::warn!(url, reason = %err.reason, error = %err.message, "all fetch routes failed");
        Err(err.exhausted())
    }

    /// Request `request_url` and extract the body as the content of `target`.
    async fn fetch_via(&self, request_url: &str, target: &str) -> Result<FetchedContent, ContentError> {
        let request = async {
            let response = self
                .client
                .get(request_url)
                .header("Accept", "text/html,application/xhtml+xml")
                .send()
                .await
                .map_err(|e| ContentError::new(target, classify_reqwest_error(&e), e.to_string()))?;

            let status = response.status();
            if !status.is_success() {
                return Err(ContentError::new(
                    target,
                    classify_status(status.as_u16()),
                    format!("HTTP {status}"),
                ));
            }

            if let Some(kind) = response
                .headers()
                .get(reqwest::header::CONTENT_TYPE)
                .and_then(|v| v.to_str().ok())
            {
                if !is_html(kind) {
                    return Err(ContentError::new(
                        target,
                        ContentErrorReason::Invalid,
                        format!("unsupported content type {kind}"),
                    ));
                }
            }

            let body = response
                .text()
                .await
                .map_err(|e| ContentError::new(target, classify_reqwest_error(&e), e.to_string()))?;
            content::extract(&body, target, self.max_content_length)
        };

        tokio::time::timeout(self.timeout, request)
            .await
            .map_err(|_| {
                ContentError::new(
                    target,
                    ContentErrorReason::Timeout,
                    format!("timed out after {}s", self.timeout.as_secs()),
                )
            })?
    }
}

fn is_html(content_type: &str) -> bool {
    let lower = content_type.to_ascii_lowercase();
    lower.contains("text/html") || lower.contains("application/xhtml")
}

/// Substitute the percent-encoded `target` into a proxy template.
pub fn proxy_url(template: &str, target: &str) -> String {
    let encoded: String = form_urlencoded::byte_serialize(target.as_bytes()).collect();
    template.replace("{url}", &encoded)
}
