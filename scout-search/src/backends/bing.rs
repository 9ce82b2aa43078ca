//! Bing backend, a fallback with a different index.
//!
//! Result links are sometimes wrapped in `bing.com/ck/a` redirects that
//! carry the target as base64 in the `u` parameter (prefixed `a1`).

use async_trait::async_trait;
use base64::Engine as _;
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use scraper::Html;
use url::Url;

use super::{read_body, selector};
use crate::backend::DiscoveryBackend;
use crate::error::SearchError;
use crate::types::{DiscoverySource, Suggestion};

const DEFAULT_BASE_URL: &str = "https://www.bing.com";

/// Bing HTML scraper.
pub struct BingBackend {
    client: reqwest::Client,
    base_url: String,
    safe_search: bool,
}

impl BingBackend {
    /// Create a backend that sends requests through `client`.
    pub fn new(client: reqwest::Client, safe_search: bool) -> Self {
        Self {
            client,
            base_url: DEFAULT_BASE_URL.to_owned(),
            safe_search,
        }
    }

    /// Override the endpoint origin (used by tests).
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into().trim_end_matches('/').to_owned();
        self
    }
}

#[async_trait]
impl DiscoveryBackend for BingBackend {
    fn name(&self) -> &str {
        DiscoverySource::Bing.name()
    }

    fn weight(&self) -> f64 {
        DiscoverySource::Bing.weight()
    }

    async fn discover(&self, query: &str, limit: usize) -> Result<Vec<Suggestion>, SearchError> {
        tracing::trace!(query, "Bing discovery");

        let safe = if self.safe_search { "Strict" } else { "Off" };
        let response = self
            .client
            .get(format!("{}/search", self.base_url))
            .query(&[("q", query), ("setlang", "en"), ("safeSearch", safe)])
            .header("Accept", "text/html")
            .header("Accept-Language", "en-US,en;q=0.9")
            .send()
            .await;
        let html = read_body(self.name(), response).await?;

        tracing::trace!(bytes = html.len(), "Bing response received");
        parse_bing_html(&html, limit)
    }
}

/// Resolve a Bing `ck/a` redirect to its target, if it is one.
fn unwrap_redirect(href: &str) -> String {
    let Ok(parsed) = Url::parse(href) else {
        return href.to_string();
    };
    if !parsed.host_str().is_some_and(|h| h.ends_with("bing.com")) || !parsed.path().starts_with("/ck/") {
        return href.to_string();
    }
    parsed
        .query_pairs()
        .find(|(k, _)| k == "u")
        .and_then(|(_, v)| v.strip_prefix("a1").and_then(decode_base64_url))
        .unwrap_or_else(|| href.to_string())
}

/// Decode URL-safe base64 (padding optional) into a UTF-8 string.
fn decode_base64_url(input: &str) -> Option<String> {
    let bytes = URL_SAFE_NO_PAD.decode(input.trim_end_matches('=')).ok()?;
    String::from_utf8(bytes).ok()
}

/// Parse a Bing HTML result page (`li.b_algo` containers).
pub(crate) fn parse_bing_html(html: &str, limit: usize) -> Result<Vec<Suggestion>, SearchError> {
    let document = Html::parse_document(html);
    let result_sel = selector("li.b_algo")?;
    let title_sel = selector("h2")?;
    let link_sel = selector("a")?;
    let snippet_sel = selector(".b_caption p, .b_lineclamp2")?;

    let mut results = Vec::new();
    for element in document.select(&result_sel) {
        if results.len() >= limit {
            break;
        }
        let Some(title_el) = element.select(&title_sel).next() else {
            continue;
        };
        let title = title_el.text().collect::<String>().trim().to_string();
        if title.is_empty() {
            continue;
        }
        let Some(href) = title_el
            .select(&link_sel)
            .next()
            .and_then(|a| a.value().attr("href"))
            .filter(|h| !h.is_empty())
        else {
            continue;
        };
        let snippet = element
            .select(&snippet_sel)
            .next()
            .map(|el| el.text().collect::<String>().trim().to_string())
            .unwrap_or_default();

        results.push(Suggestion::new(
            unwrap_redirect(href),
            title,
            snippet,
            DiscoverySource::Bing.name(),
        ));
    }

    tracing::debug!(count = results.len(), "Bing results parsed");
    Ok(results)
}
