//! Discovery backend implementations.
//!
//! Each backend scrapes or queries one public search surface and turns
//! the response into [`crate::Suggestion`] values.

mod bing;
mod duckduckgo;
mod wikipedia;

pub use bing::BingBackend;
pub use duckduckgo::DuckDuckGoBackend;
pub use wikipedia::WikipediaBackend;

use scraper::Selector;

use crate::error::SearchError;

/// Compile a CSS selector, mapping failure to [`SearchError::Parse`].
pub(crate) fn selector(css: &str) -> Result<Selector, SearchError> {
    Selector::parse(css).map_err(|e| SearchError::Parse(format!("invalid selector {css:?}: {e:?}")))
}

/// Read a response body, failing on non-success status.
pub(crate) async fn read_body(
    backend: &str,
    response: Result<reqwest::Response, reqwest::Error>,
) -> Result<String, SearchError> {
    let response = response
        .map_err(|e| {
            if e.is_timeout() {
                SearchError::Timeout(format!("{backend} request timed out"))
            } else {
                SearchError::Http(format!("{backend} request failed: {e}"))
            }
        })?
        .error_for_status()
        .map_err(|e| SearchError::Http(format!("{backend} HTTP error: {e}")))?;

    response
        .text()
        .await
        .map_err(|e| SearchError::Http(format!("{backend} response read failed: {e}")))
}
