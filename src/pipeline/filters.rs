//! Domain and content-type filtering of discovered candidates.

use scout_search::Suggestion;

use super::query::QueryFilters;

/// URL keywords that indicate each known content type.
const CONTENT_KEYWORDS: &[(&str, &[&str])] = &[
    ("article", &["article", "blog", "news", "post"]),
    ("video", &["video", "watch", "youtube", "vimeo"]),
    ("documentation", &["doc", "docs", "documentation", "guide", "manual", "reference"]),
    ("research", &["research", "paper", "pdf", "arxiv", "journal"]),
    ("forum", &["forum", "discussion", "thread", "community", "questions"]),
    ("code", &["code", "repository", "repo", "github", "gitlab", "src"]),
];

/// Keep suggestions that pass both filters. Empty lists pass everything.
pub fn apply(suggestions: Vec<Suggestion>, filters: &QueryFilters) -> Vec<Suggestion> {
    suggestions
        .into_iter()
        .filter(|s| domain_allowed(&s.domain, &filters.domains))
        .filter(|s| content_type_matches(&s.url, &filters.content_types))
        .collect()
}

/// `domain` equals, or is a subdomain of, an allowed domain.
pub fn domain_allowed(domain: &str, allowed: &[String]) -> bool {
    if allowed.is_empty() {
        return true;
    }
    let domain = domain.trim_start_matches("www.").to_lowercase();
    allowed.iter().any(|a| {
        let a = a.trim().trim_start_matches("www.").to_lowercase();
        domain == a
            || domain
                .strip_suffix(a.as_str())
                .is_some_and(|prefix| prefix.ends_with('.'))
    })
}

/// The URL contains a keyword for at least one of `types`.
pub fn content_type_matches(url: &str, types: &[String]) -> bool {
    if types.is_empty() {
        return true;
    }
    let haystack = url
        .split_once("://")
        .map_or(url, |(_, rest)| rest)
        .to_lowercase();
    types.iter().any(|t| {
        let t = t.trim().to_lowercase();
        CONTENT_KEYWORDS
            .iter()
            .find(|(name, _)| *name == t)
            .is_some_and(|(_, keywords)| keywords.iter().any(|k| contains_word(&haystack, k)))
    })
}

/// `keyword` appears in `haystack` delimited by non-alphanumerics.
fn contains_word(haystack: &str, keyword: &str) -> bool {
    haystack
        .split(|c: char| !c.is_ascii_alphanumeric())
        .any(|segment| segment == keyword)
}
