//! DuckDuckGo backend, the most scraper-tolerant source.
//!
//! Uses the HTML-only endpoint at `https://html.duckduckgo.com/html/`,
//! which requires no JavaScript.

use async_trait::async_trait;
use scraper::Html;
use url::Url;

use super::{read_body, selector};
use crate::backend::DiscoveryBackend;
use crate::error::SearchError;
use crate::types::{DiscoverySource, Suggestion};

const DEFAULT_BASE_URL: &str = "https://html.duckduckgo.com";

/// DuckDuckGo HTML scraper.
pub struct DuckDuckGoBackend {
    client: reqwest::Client,
    base_url: String,
    safe_search: bool,
}

impl DuckDuckGoBackend {
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
impl DiscoveryBackend for DuckDuckGoBackend {
    fn name(&self) -> &str {
        DiscoverySource::DuckDuckGo.name()
    }

    fn weight(&self) -> f64 {
        DiscoverySource::DuckDuckGo.weight()
    }

    async fn discover(&self, query: &str, limit: usize) -> Result<Vec<Suggestion>, SearchError> {
        tracing::trace!(query, "DuckDuckGo discovery");

        let mut params = vec![("q", query)];
        if self.safe_search {
            params.push(("kp", "1"));
        }

        let response = self
            .client
            .post(format!("{}/html/", self.base_url))
            .form(&params)
            .header("Accept-Language", "en-US,en;q=0.9")
            .send()
            .await;
        let html = read_body(self.name(), response).await?;

        tracing::trace!(bytes = html.len(), "DuckDuckGo response received");
        parse_duckduckgo_html(&html, limit)
    }
}

/// Target of a result link, unwrapping `/l/?uddg=` redirects.
///
/// Protocol-relative links are taken as https.
fn result_target(href: &str) -> Option<String> {
    let absolute = match href.strip_prefix("//") {
        Some(rest) => format!("https://{rest}"),
        None => href.to_owned(),
    };
    let link = Url::parse(&absolute).ok()?;
    let is_redirect = link
        .host_str()
        .is_some_and(|h| h.trim_start_matches("www.") == "duckduckgo.com")
        && link.path().starts_with("/l/");
    if !is_redirect {
        return Some(absolute);
    }
    link.query_pairs()
        .find_map(|(key, value)| (key == "uddg").then(|| value.into_owned()))
}

/// Parse a DuckDuckGo HTML result page. Ads are skipped.
pub(crate) fn parse_duckduckgo_html(html: &str, limit: usize) -> Result<Vec<Suggestion>, SearchError> {
    let document = Html::parse_document(html);
    let result_sel = selector(
        ".result.results_links.results_links_deep:not(.result--ad), .web-result:not(.result--ad)",
    )?;
    let title_sel = selector(".result__a")?;
    let snippet_sel = selector(".result__snippet")?;

    let mut results = Vec::new();
    for element in document.select(&result_sel) {
        if results.len() >= limit {
            break;
        }
        let Some(anchor) = element.select(&title_sel).next() else {
            continue;
        };
        let title = collapse_text(anchor.text());
        let target = anchor.value().attr("href").and_then(result_target);
        let (Some(url), false) = (target, title.is_empty()) else {
            continue;
        };
        let snippet = element
            .select(&snippet_sel)
            .next()
            .map(|el| collapse_text(el.text()))
            .unwrap_or_default();

        results.push(Suggestion::new(url, title, snippet, DiscoverySource::DuckDuckGo.name()));
    }

    tracing::debug!(count = results.len(), "DuckDuckGo results parsed");
    Ok(results)
}

/// Join text nodes and squeeze runs of whitespace.
fn collapse_text<'a>(parts: impl Iterator<Item = &'a str>) -> String {
    parts
        .flat_map(str::split_whitespace)
        .collect::<Vec<_>>()
        .join(" ")
}
