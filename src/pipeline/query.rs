//! Search queries: validation and fingerprinting.

use std::fmt;

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

/// Longest accepted prompt, in characters.
pub const MAX_PROMPT_CHARS: usize = 1000;

/// Accepted range for [`SearchQuery::max_results`].
pub const MAX_RESULTS_RANGE: std::ops::RangeInclusive<usize> = 1..=50;

/// Content type filters understood by the URL heuristic.
pub const KNOWN_CONTENT_TYPES: &[&str] = &[
    "article",
    "video",
    "documentation",
    "research",
    "forum",
    "code",
];

/// Optional narrowing of discovered candidates.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct QueryFilters {
    /// Allowed domains; subdomains of an allowed domain pass too.
    pub domains: Vec<String>,
    /// Allowed content types, from [`KNOWN_CONTENT_TYPES`].
    pub content_types: Vec<String>,
}

/// What the user asked for.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SearchQuery {
    /// Natural-language prompt.
    pub prompt: String,
    /// Result cap, 1 to 50.
    pub max_results: usize,
    /// Optional filters.
    #[serde(default)]
    pub filters: QueryFilters,
}

/// One validation failure.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FieldError {
    /// Offending field.
    pub field: String,
    /// What is wrong with it.
    pub message: String,
}

impl FieldError {
    /// Create a field error.
    pub fn new(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            message: message.into(),
        }
    }
}

impl fmt::Display for FieldError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.field, self.message)
    }
}

impl SearchQuery {
    /// Query with no filters.
    pub fn new(prompt: impl Into<String>, max_results: usize) -> Self {
        Self {
            prompt: prompt.into(),
            max_results,
            filters: QueryFilters::default(),
        }
    }

    /// Restrict results to `domains`.
    pub fn with_domains<I, S>(mut self, domains: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.filters.domains = domains.into_iter().map(Into::into).collect();
        self
    }

    /// Restrict results to `content_types`.
    pub fn with_content_types<I, S>(mut self, content_types: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.filters.content_types = content_types.into_iter().map(Into::into).collect();
        self
    }

    /// Check every field, collecting all violations.
    pub fn validate(&self) -> Result<(), Vec<FieldError>> {
        let mut errors = Vec::new();

        let prompt = self.prompt.trim();
        if prompt.is_empty() {
            errors.push(FieldError::new("prompt", "must not be empty"));
        } else if prompt.chars().count() > MAX_PROMPT_CHARS {
            errors.push(FieldError::new(
                "prompt",
                format!("must be at most {MAX_PROMPT_CHARS} characters"),
            ));
        }

        if !MAX_RESULTS_RANGE.contains(&self.max_results) {
            errors.push(FieldError::new(
                "max_results",
                format!(
                    "must be between {} and {}",
                    MAX_RESULTS_RANGE.start(),
                    MAX_RESULTS_RANGE.end()
                ),
            ));
        }

        for domain in &self.filters.domains {
            if let Err(reason) = check_domain(domain) {
                errors.push(FieldError::new("filters.domains", format!("{domain:?} {reason}")));
            }
        }

        for content_type in &self.filters.content_types {
            let normalized = content_type.trim().to_lowercase();
            if !KNOWN_CONTENT_TYPES.contains(&normalized.as_str()) {
                errors.push(FieldError::new(
                    "filters.content_types",
                    format!(
                        "{content_type:?} is not one of {}",
                        KNOWN_CONTENT_TYPES.join(", ")
                    ),
                ));
            }
        }

        if errors.is_empty() { Ok(()) } else { Err(errors) }
    }

    /// Stable identity of this query for caching and cancellation.
    ///
    /// SHA-256 (hex) over the normalised prompt, the result cap and the
    /// sorted, lowercased filters. Case, surrounding whitespace, repeated
    /// whitespace and filter order do not change the fingerprint.
    pub fn fingerprint(&self) -> String {
        let prompt = normalize_prompt(&self.prompt);
        let domains = sorted_lower(&self.filters.domains);
        let content_types = sorted_lower(&self.filters.content_types);

        let mut hasher = Sha256::new();
        hasher.update(prompt.as_bytes());
        hasher.update(b"\n");
        hasher.update(self.max_results.to_string().as_bytes());
        hasher.update(b"\n");
        hasher.update(domains.join(",").as_bytes());
        hasher.update(b"\n");
        hasher.update(content_types.join(",").as_bytes());
        format!("{:x}", hasher.finalize())
    }
}

/// Trimmed, lowercased prompt with whitespace runs collapsed.
pub fn normalize_prompt(prompt: &str) -> String {
    prompt
        .split_whitespace()
        .map(str::to_lowercase)
        .collect::<Vec<_>>()
        .join(" ")
}

fn sorted_lower(values: &[String]) -> Vec<String> {
    let mut out: Vec<String> = values.iter().map(|v| v.trim().to_lowercase()).collect();
    out.sort();
    out.dedup();
    out
}

fn check_domain(raw: &str) -> Result<(), &'static str> {
    let domain = raw.trim().to_lowercase();
    if domain.contains("://") {
        return Err("must not include a scheme");
    }
    if domain.contains('/') {
        return Err("must not include a path");
    }
    if !domain.contains('.') {
        return Err("must contain a dot");
    }
    let labels_ok = domain.split('.').all(|label| {
        !label.is_empty()
            && !label.starts_with('-')
            && !label.ends_with('-')
            && label
                .chars()
                .all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || c == '-')
    });
    if labels_ok {
        Ok(())
    } else {
        Err("is not a valid domain name")
    }
}
