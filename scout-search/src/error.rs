//! Error types for the scout-search crate.
//!
//! Discovery and batch-level failures use [`SearchError`]. Failures of a
//! single page fetch are reported per item as [`ContentError`] so a batch
//! never rejects because one page could not be loaded.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Errors that can occur during discovery or batch fetching.
#[derive(Debug, thiserror::Error)]
pub enum SearchError {
    /// Every enabled discovery backend failed to return results.
    #[error("discovery failed: {0}")]
    DiscoveryFailed(String),

    /// An operation timed out before any backend responded.
    #[error("search timed out: {0}")]
    Timeout(String),

    /// An HTTP request to a backend failed.
    #[error("HTTP error: {0}")]
    Http(String),

    /// Failed to parse a backend response.
    #[error("parse error: {0}")]
    Parse(String),

    /// Invalid discovery or fetcher configuration.
    #[error("config error: {0}")]
    Config(String),

    /// The caller cancelled the operation.
    #[error("operation cancelled")]
    Cancelled,
}

/// Convenience type alias for scout-search results.
pub type Result<T> = std::result::Result<T, SearchError>;

/// Why a page could not be fetched or extracted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ContentErrorReason {
    /// The request did not complete within the fetch timeout.
    Timeout,
    /// The origin refused the connection (transport, TLS or redirect refusal).
    Cors,
    /// The origin answered but denied access (401, 403, 429, 451).
    Blocked,
    /// Malformed URL, non-HTML response, error status or nothing extractable.
    Invalid,
}

impl ContentErrorReason {
    /// Stable lowercase name of this reason.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Timeout => "timeout",
            Self::Cors => "cors",
            Self::Blocked => "blocked",
            Self::Invalid => "invalid",
        }
    }
}

impl fmt::Display for ContentErrorReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A single page could not be fetched or extracted.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("content error ({reason}) for {url}: {message}")]
pub struct ContentError {
    /// The URL that failed.
    pub url: String,
    /// Classified failure reason.
    pub reason: ContentErrorReason,
    /// Human-readable detail from the underlying failure.
    pub message: String,
    /// True when the direct fetch and every fallback proxy failed.
    pub all_proxies_failed: bool,
}

impl ContentError {
    /// Create a content error for `url`.
    pub fn new(url: impl Into<String>, reason: ContentErrorReason, message: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            reason,
            message: message.into(),
            all_proxies_failed: false,
        }
    }

    /// Mark this error as the final outcome after exhausting every proxy.
    pub fn exhausted(mut self) -> Self {
        self.all_proxies_failed = true;
        self
    }
}

/// Classify a `reqwest` transport error into a [`ContentErrorReason`].
pub fn classify_reqwest_error(err: &reqwest::Error) -> ContentErrorReason {
    if err.is_timeout() {
        return ContentErrorReason::Timeout;
    }
    if let Some(status) = err.status() {
        return classify_status(status.as_u16());
    }
    if err.is_builder() {
        return ContentErrorReason::Invalid;
    }
    if err.is_connect() || err.is_redirect() || err.is_request() {
        return ContentErrorReason::Cors;
    }
    classify_message(&err.to_string())
}

/// Classify an HTTP error status into a [`ContentErrorReason`].
pub fn classify_status(status: u16) -> ContentErrorReason {
    match status {
        401 | 403 | 429 | 451 => ContentErrorReason::Blocked,
        408 | 504 => ContentErrorReason::Timeout,
        _ => ContentErrorReason::Invalid,
    }
}

/// Best-effort classification from a free-form failure message.
pub fn classify_message(message: &str) -> ContentErrorReason {
    let lower = message.to_lowercase();
    if lower.contains("timed out") || lower.contains("timeout") || lower.contains("abort") {
        ContentErrorReason::Timeout
    } else if lower.contains("cors") || lower.contains("cross-origin") || lower.contains("connection refused") {
        ContentErrorReason::Cors
    } else if lower.contains("forbidden") || lower.contains("blocked") || lower.contains("denied") {
        ContentErrorReason::Blocked
    } else {
        ContentErrorReason::Invalid
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_discovery_failed() {
        let err = SearchError::DiscoveryFailed("DuckDuckGo: HTTP error".into());
        assert_eq!(err.to_string(), "discovery failed: DuckDuckGo: HTTP error");
    }

    #[test]
    fn display_cancelled() {
        assert_eq!(SearchError::Cancelled.to_string(), "operation cancelled");
    }

    #[test]
    fn display_config() {
        let err = SearchError::Config("max_results must be > 0".into());
        assert_eq!(err.to_string(), "config error: max_results must be > 0");
    }

    #[test]
    fn content_error_display_includes_reason_and_url() {
        let err = ContentError::new("https://a.com", ContentErrorReason::Blocked, "HTTP 403");
        let text = err.to_string();
        assert!(text.contains("blocked"));
        assert!(text.contains("https://a.com"));
        assert!(!err.all_proxies_failed);
        assert!(err.exhausted().all_proxies_failed);
    }

    #[test]
    fn status_classification() {
        assert_eq!(classify_status(403), ContentErrorReason::Blocked);
        assert_eq!(classify_status(429), ContentErrorReason::Blocked);
        assert_eq!(classify_status(504), ContentErrorReason::Timeout);
        assert_eq!(classify_status(404), ContentErrorReason::Invalid);
        assert_eq!(classify_status(500), ContentErrorReason::Invalid);
    }

    #[test]
    fn message_classification() {
        assert_eq!(classify_message("request timed out"), ContentErrorReason::Timeout);
        assert_eq!(classify_message("The operation was aborted"), ContentErrorReason::Timeout);
        assert_eq!(classify_message("blocked by CORS policy"), ContentErrorReason::Cors);
        assert_eq!(classify_message("403 Forbidden"), ContentErrorReason::Blocked);
        assert_eq!(classify_message("something odd"), ContentErrorReason::Invalid);
    }

    #[test]
    fn reason_serde_is_lowercase() {
        let json = serde_json::to_string(&ContentErrorReason::Cors).expect("serialize");
        assert_eq!(json, "\"cors\"");
    }

    #[test]
    fn error_is_send_sync() {
        fn assert_send_sync<T: Send + Sync>() {}
        assert_send_sync::<SearchError>();
        assert_send_sync::<ContentError>();
    }
}
