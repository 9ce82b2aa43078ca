//! Wikipedia backend using the OpenSearch JSON API.
//!
//! The response is a four-element array:
//! `[query, [titles], [descriptions], [urls]]`.

use async_trait::async_trait;
use serde_json::Value;

use super::read_body;
use crate::backend::DiscoveryBackend;
use crate::error::SearchError;
use crate::types::{DiscoverySource, Suggestion};

const DEFAULT_BASE_URL: &str = "https://en.wikipedia.org";

/// Wikipedia OpenSearch client.
pub struct WikipediaBackend {
    client: reqwest::Client,
    base_url: String,
}

impl WikipediaBackend {
    /// Create a backend that sends requests through `client`.
    pub fn new(client: reqwest::Client) -> Self {
        Self {
            client,
            base_url: DEFAULT_BASE_URL.to_owned(),
        }
    }

    /// Override the endpoint origin (used by tests).
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into().trim_end_matches('/').to_owned();
        self
    }
}

#[async_trait]
impl DiscoveryBackend for WikipediaBackend {
    fn name(&self) -> &str {
        DiscoverySource::Wikipedia.name()
    }

    fn weight(&self) -> f64 {
        DiscoverySource::Wikipedia.weight()
    }

    async fn discover(&self, query: &str, limit: usize) -> Result<Vec<Suggestion>, SearchError> {
        tracing::trace!(query, "Wikipedia discovery");

        let limit_param = limit.clamp(1, 50).to_string();
        let response = self
            .client
            .get(format!("{}/w/api.php", self.base_url))
            .query(&[
                ("action", "opensearch"),
                ("search", query),
                ("limit", limit_param.as_str()),
                ("namespace", "0"),
                ("format", "json"),
            ])
            .header("Accept", "application/json")
            .send()
            .await;
        let body = read_body(self.name(), response).await?;

        parse_opensearch_json(&body, limit)
    }
}

/// Parse an OpenSearch response body.
pub(crate) fn parse_opensearch_json(body: &str, limit: usize) -> Result<Vec<Suggestion>, SearchError> {
    let value: Value = serde_json::from_str(body)
        .map_err(|e| SearchError::Parse(format!("Wikipedia response is not JSON: {e}")))?;

    let Some(parts) = value.as_array().filter(|a| a.len() >= 4) else {
        return Err(SearchError::Parse(
            "Wikipedia response is not an OpenSearch array".into(),
        ));
    };
    let column = |i: usize| -> Vec<&str> {
        parts[i]
            .as_array()
            .map(|items| items.iter().map(|v| v.as_str().unwrap_or_default()).collect())
            .unwrap_or_default()
    };
    let titles = column(1);
    let descriptions = column(2);
    let urls = column(3);

    let results: Vec<Suggestion> = titles
        .iter()
        .zip(urls.iter())
        .enumerate()
        .filter(|(_, (title, url))| !title.is_empty() && !url.is_empty())
        .take(limit)
        .map(|(i, (title, url))| {
            let snippet = descriptions.get(i).copied().unwrap_or_default();
            Suggestion::new(*url, *title, snippet, DiscoverySource::Wikipedia.name())
        })
        .collect();

    tracing::debug!(count = results.len(), "Wikipedia results parsed");
    Ok(results)
}
