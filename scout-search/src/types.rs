//! Core types for discovered candidates and extracted page content.

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::error::ContentError;

/// A candidate URL returned by discovery, before it has been fetched.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Suggestion {
    /// The candidate URL.
    pub url: String,
    /// Title reported by the discovery backend.
    pub title: String,
    /// Snippet reported by the discovery backend.
    pub snippet: String,
    /// Host of `url`, without a leading `www.`.
    pub domain: String,
    /// Provisional relevance in `[0, 1]` derived from backend rank and weight.
    pub relevance_hint: f64,
    /// Which backend produced this suggestion.
    pub source: String,
}

impl Suggestion {
    /// Build a suggestion, deriving `domain` from `url`.
    pub fn new(
        url: impl Into<String>,
        title: impl Into<String>,
        snippet: impl Into<String>,
        source: impl Into<String>,
    ) -> Self {
        let url = url.into();
        let domain = domain_of(&url);
        Self {
            url,
            title: title.into(),
            snippet: snippet.into(),
            domain,
            relevance_hint: 0.0,
            source: source.into(),
        }
    }

    /// Set the relevance hint, clamped into `[0, 1]`.
    pub fn with_hint(mut self, hint: f64) -> Self {
        self.relevance_hint = clamp_unit(hint);
        self
    }
}

/// Discovery backends that ship with scout-search.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum DiscoverySource {
    /// DuckDuckGo HTML endpoint.
    DuckDuckGo,
    /// Bing HTML results page.
    Bing,
    /// Wikipedia OpenSearch JSON API.
    Wikipedia,
}

impl DiscoverySource {
    /// Returns the human-readable name of this backend.
    pub fn name(&self) -> &'static str {
        match self {
            Self::DuckDuckGo => "DuckDuckGo",
            Self::Bing => "Bing",
            Self::Wikipedia => "Wikipedia",
        }
    }

    /// Ranking weight for results from this backend.
    pub fn weight(&self) -> f64 {
        match self {
            Self::DuckDuckGo => 1.0,
            Self::Bing => 0.9,
            Self::Wikipedia => 0.8,
        }
    }

    /// Returns all available backend variants.
    pub fn all() -> &'static [DiscoverySource] {
        &[Self::DuckDuckGo, Self::Bing, Self::Wikipedia]
    }
}

impl fmt::Display for DiscoverySource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Coarse classification of a fetched page.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ContentType {
    /// Editorial content: blog posts, news, `og:type=article`.
    Article,
    /// Video pages.
    Video,
    /// Downloadable documents and papers.
    Document,
    /// Anything else.
    #[default]
    Webpage,
}

impl ContentType {
    /// Stable lowercase name.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Article => "article",
            Self::Video => "video",
            Self::Document => "document",
            Self::Webpage => "webpage",
        }
    }
}

impl fmt::Display for ContentType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Structured content extracted from a fetched page.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FetchedContent {
    /// The URL that was fetched.
    pub url: String,
    /// Page title from the first non-empty title source.
    pub title: String,
    /// Page description from meta tags, empty if none.
    pub description: String,
    /// Cleaned main-content text, bounded by the fetcher's length cap.
    pub body_text: String,
    /// Host of `url`, without a leading `www.`.
    pub domain: String,
    /// Coarse page classification.
    pub content_type: ContentType,
    /// Number of whitespace-separated words in `body_text`.
    pub word_count: usize,
    /// Whether the main content contains `<img>` elements.
    pub has_images: bool,
    /// Whether the page embeds video.
    pub has_videos: bool,
    /// Author from meta tags or bylines.
    pub author: Option<String>,
    /// Publication date as found in the page.
    pub publish_date: Option<String>,
    /// Declared document language.
    pub language: Option<String>,
}

/// Outcome of fetching one URL inside a batch.
pub type FetchOutcome = std::result::Result<FetchedContent, ContentError>;

/// Emitted once per finished item during a batch fetch.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FetchProgress {
    /// Items finished so far, including this one.
    pub completed: usize,
    /// Items in the whole batch.
    pub total: usize,
    /// The URL that just finished.
    pub url: String,
    /// Whether this item failed.
    pub failed: bool,
}

/// Host of a URL without a leading `www.`; empty when unparseable.
pub fn domain_of(raw: &str) -> String {
    url::Url::parse(raw)
        .ok()
        .and_then(|u| u.host_str().map(|h| h.trim_start_matches("www.").to_lowercase()))
        .unwrap_or_default()
}

fn clamp_unit(value: f64) -> f64 {
    if value.is_nan() {
        0.0
    } else {
        value.clamp(0.0, 1.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn suggestion_derives_domain() {
        let s = Suggestion::new("https://www.Example.com/a", "A", "snippet", "Bing");
        assert_eq!(s.domain, "example.com");
        assert_eq!(s.source, "Bing");
        assert!(s.relevance_hint.abs() < f64::EPSILON);
    }

    #[test]
    fn hint_is_clamped() {
        let high = Suggestion::new("https://a.com", "", "", "x").with_hint(1.7);
        let low = Suggestion::new("https://a.com", "", "", "x").with_hint(-0.2);
        let nan = Suggestion::new("https://a.com", "", "", "x").with_hint(f64::NAN);
        assert!((high.relevance_hint - 1.0).abs() < f64::EPSILON);
        assert!(low.relevance_hint.abs() < f64::EPSILON);
        assert!(nan.relevance_hint.abs() < f64::EPSILON);
    }

    #[test]
    fn domain_of_unparseable_is_empty() {
        assert_eq!(domain_of("not a url"), "");
        assert_eq!(domain_of("https://docs.rs/tokio"), "docs.rs");
    }

    #[test]
    fn discovery_source_display_and_weight() {
        assert_eq!(DiscoverySource::DuckDuckGo.to_string(), "DuckDuckGo");
        assert_eq!(DiscoverySource::all().len(), 3);
        assert!(DiscoverySource::DuckDuckGo.weight() > DiscoverySource::Wikipedia.weight());
    }

    #[test]
    fn content_type_serde_is_lowercase() {
        let json = serde_json::to_string(&ContentType::Article).expect("serialize");
        assert_eq!(json, "\"article\"");
        assert_eq!(ContentType::default(), ContentType::Webpage);
    }
}
