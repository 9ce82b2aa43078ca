//! Heuristic scoring of fetched candidates into [`SearchResult`]s.
//!
//! - Fetch failure: relevance `0.5 × hint`, confidence `0.3`.
//! - Success: relevance `0.4 × term overlap + 0.4 × hint + 0.2 × quality`,
//!   confidence `0.5 + 0.4 × quality`.
//!
//! Quality rewards length (up to 300 words) and the presence of title,
//! description, author and publication date.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

use scout_search::url_normalize::canonical_url;
use scout_search::{ContentType, FetchOutcome, Suggestion};

/// Whether the page behind a result could be loaded.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LoadStatus {
    /// Fetched and extracted.
    Loaded,
    /// Fetch or extraction failed; scores come from discovery only.
    Error,
}

/// Descriptive data attached to a result.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResultMetadata {
    /// Host without `www.`.
    pub domain: String,
    /// Page classification; `Webpage` when the fetch failed.
    pub content_type: ContentType,
    /// Fetch outcome.
    pub load_status: LoadStatus,
}

/// One ranked search result.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SearchResult {
    /// Stable hash of the normalised URL.
    pub id: String,
    /// Result URL.
    pub url: String,
    /// Display title.
    pub title: String,
    /// Display description.
    pub description: String,
    /// Relevance in `[0, 1]`.
    pub relevance_score: f64,
    /// Confidence in `relevance_score`, in `[0, 1]`.
    pub confidence_score: f64,
    /// When the result was produced.
    pub timestamp: DateTime<Utc>,
    /// Descriptive data.
    pub metadata: ResultMetadata,
}

/// Stable result id: first 16 hex chars of SHA-256 over the canonical URL.
pub fn result_id(url: &str) -> String {
    let digest = Sha256::digest(canonical_url(url).as_bytes());
    format!("{digest:x}").chars().take(16).collect()
}

/// Lowercased query terms longer than two characters.
pub fn query_terms(prompt: &str) -> Vec<String> {
    prompt
        .split(|c: char| !c.is_alphanumeric())
        .filter(|t| t.chars().count() > 2)
        .map(str::to_lowercase)
        .collect()
}

/// Fraction of `terms` found in `text` (case-insensitive).
pub fn term_overlap(terms: &[String], text: &str) -> f64 {
    if terms.is_empty() {
        return 0.0;
    }
    let text = text.to_lowercase();
    let hits = terms.iter().filter(|t| text.contains(t.as_str())).count();
    hits as f64 / terms.len() as f64
}

/// Content quality in `[0, 1]`.
pub fn quality_score(content: &scout_search::FetchedContent) -> f64 {
    let flag = |present: bool, weight: f64| if present { weight } else { 0.0 };
    let length = (content.word_count as f64 / 300.0).min(1.0);
    0.3 * length
        + flag(!content.title.trim().is_empty(), 0.2)
        + flag(!content.description.trim().is_empty(), 0.2)
        + flag(content.author.is_some(), 0.15)
        + flag(content.publish_date.is_some(), 0.15)
}

fn clamp_unit(value: f64) -> f64 {
    if value.is_nan() { 0.0 } else { value.clamp(0.0, 1.0) }
}

/// Fold a suggestion and its fetch outcome into a result.
pub fn rank(suggestion: &Suggestion, outcome: &FetchOutcome, terms: &[String]) -> SearchResult {
    let timestamp = Utc::now();
    match outcome {
        Err(_) => SearchResult {
            id: result_id(&suggestion.url),
            url: suggestion.url.clone(),
            title: suggestion.title.clone(),
            description: suggestion.snippet.clone(),
            relevance_score: clamp_unit(0.5 * suggestion.relevance_hint),
            confidence_score: 0.3,
            timestamp,
            metadata: ResultMetadata {
                domain: suggestion.domain.clone(),
                content_type: ContentType::Webpage,
                load_status: LoadStatus::Error,
            },
        },
        Ok(content) => {
            let haystack = format!(
                "{} {} {}",
                content.title, content.description, content.body_text
            );
            let quality = quality_score(content);
            let relevance = 0.4 * term_overlap(terms, &haystack)
                + 0.4 * suggestion.relevance_hint
                + 0.2 * quality;

            let title = if content.title.trim().is_empty() {
                suggestion.title.clone()
            } else {
                content.title.clone()
            };
            let description = if content.description.trim().is_empty() {
                suggestion.snippet.clone()
            } else {
                content.description.clone()
            };

            SearchResult {
                id: result_id(&suggestion.url),
                url: suggestion.url.clone(),
                title,
                description,
                relevance_score: clamp_unit(relevance),
                confidence_score: clamp_unit(0.5 + 0.4 * quality),
                timestamp,
                metadata: ResultMetadata {
                    domain: if content.domain.is_empty() {
                        suggestion.domain.clone()
                    } else {
                        content.domain.clone()
                    },
                    content_type: content.content_type,
                    load_status: LoadStatus::Loaded,
                },
            }
        }
    }
}

/// Sort descending by relevance, ties broken by URL.
pub fn sort_results(results: &mut [SearchResult]) {
    results.sort_by(|a, b| {
        b.relevance_score
            .total_cmp(&a.relevance_score)
            .then_with(|| a.url.cmp(&b.url))
    });
}

#[cfg(test)]
mod tests {
    use scout_search::{ContentError, ContentErrorReason, FetchedContent};

    use super::*;

    fn content(words: usize) -> FetchedContent {
        FetchedContent {
            url: "https://doc.rust-lang.org/book/ch04".into(),
            title: "Understanding Ownership".into(),
            description: "Rust ownership model explained".into(),
            body_text: "word ".repeat(words),
            domain: "doc.rust-lang.org".into(),
            content_type: ContentType::Article,
            word_count: words,
            has_images: false,
            has_videos: false,
            author: None,
            publish_date: None,
            language: Some("en".into()),
        }
    }

    fn suggestion(hint: f64) -> Suggestion {
        Suggestion::new("https://doc.rust-lang.org/book/ch04", "Ch 4", "snippet", "Bing")
            .with_hint(hint)
    }

    #[test]
    fn terms_skip_short_words() {
        assert_eq!(query_terms("Is the Rust ownership model ok?"), ["the", "rust", "ownership", "model"]);
    }

    #[test]
    fn overlap_fraction() {
        let terms = query_terms("rust ownership model");
        assert!((term_overlap(&terms, "The Rust book") - 1.0 / 3.0).abs() < 1e-9);
        assert!(term_overlap(&[], "anything").abs() < f64::EPSILON);
    }

    #[test]
    fn quality_weights() {
        let mut c = content(600);
        assert!((quality_score(&c) - 0.7).abs() < 1e-9);
        c.author = Some("Steve".into());
        c.publish_date = Some("2024-01-01".into());
        assert!((quality_score(&c) - 1.0).abs() < 1e-9);
        c.word_count = 150;
        assert!((quality_score(&c) - 0.85).abs() < 1e-9);
    }

    #[test]
    fn failed_fetch_is_discounted() {
        let outcome: FetchOutcome = Err(ContentError::new(
            "https://doc.rust-lang.org/book/ch04",
            ContentErrorReason::Timeout,
            "timed out",
        ));
        let result = rank(&suggestion(0.8), &outcome, &query_terms("rust ownership"));
        assert_eq!(result.metadata.load_status, LoadStatus::Error);
        assert!((result.relevance_score - 0.4).abs() < 1e-9);
        assert!((result.confidence_score - 0.3).abs() < 1e-9);
        assert_eq!(result.title, "Ch 4");
    }

    #[test]
    fn loaded_result_scores() {
        let terms = query_terms("rust ownership model");
        let result = rank(&suggestion(1.0), &Ok(content(300)), &terms);
        // overlap 1.0, hint 1.0, quality 0.7
        assert!((result.relevance_score - (0.4 + 0.4 + 0.14)).abs() < 1e-9);
        assert!((result.confidence_score - 0.78).abs() < 1e-9);
        assert_eq!(result.title, "Understanding Ownership");
        assert_eq!(result.metadata.content_type, ContentType::Article);
    }

    #[test]
    fn ids_are_stable_across_url_spellings() {
        assert_eq!(result_id("https://Example.com/a/"), result_id("https://example.com/a"));
        assert_ne!(result_id("https://example.com/a"), result_id("https://example.com/b"));
    }

    #[test]
    fn sorting_is_deterministic() {
        let mut a = rank(&suggestion(0.5), &Ok(content(10)), &[]);
        a.url = "https://b.example".into();
        let mut b = a.clone();
        b.url = "https://a.example".into();
        let mut c = a.clone();
        c.relevance_score = 0.99;
        let mut results = vec![a, b, c];
        sort_results(&mut results);
        let urls: Vec<&str> = results.iter().map(|r| r.url.as_str()).collect();
        assert_eq!(urls[1..], ["https://a.example", "https://b.example"]);
        assert!((results[0].relevance_score - 0.99).abs() < f64::EPSILON);
    }
}
