//! URL canonicalisation for suggestion deduplication.
//!
//! Equivalent pages that differ only in query-parameter order, tracking
//! parameters, fragments, default ports, a `www.` prefix or a trailing
//! slash compare equal after [`canonical_url`].

use url::Url;

/// Query parameters dropped during canonicalisation.
const TRACKING_PARAMS: &[&str] = &[
    "utm_source",
    "utm_medium",
    "utm_campaign",
    "utm_term",
    "utm_content",
    "fbclid",
    "gclid",
    "msclkid",
    "mc_cid",
    "mc_eid",
    "ref",
    "ref_src",
    "si",
];

/// Canonicalise a URL for equality comparison.
///
/// 1. Drop the fragment.
/// 2. Drop default ports (`:80` for HTTP, `:443` for HTTPS).
/// 3. Strip tracking parameters and sort the rest by key, then value.
/// 4. Fold a leading `www.` in the host.
/// 5. Drop a trailing slash unless the path is exactly `/`.
///
/// Scheme and host are lowercased by the parser. Unparseable input is
/// returned trimmed but otherwise unchanged.
///
/// # Examples
///
/// ```
/// use scout_search::url_normalize::canonical_url;
///
/// let a = canonical_url("https://WWW.Example.com/docs/?b=2&a=1&utm_source=x#top");
/// let b = canonical_url("https://example.com/docs?a=1&b=2");
/// assert_eq!(a, b);
/// ```
pub fn canonical_url(raw: &str) -> String {
    let trimmed = raw.trim();
    let Ok(mut parsed) = Url::parse(trimmed) else {
        return trimmed.to_string();
    };

    parsed.set_fragment(None);

    if matches!(
        (parsed.scheme(), parsed.port()),
        ("http", Some(80)) | ("https", Some(443))
    ) {
        let _ = parsed.set_port(None);
    }

    let mut params: Vec<(String, String)> = parsed
        .query_pairs()
        .filter(|(key, _)| !TRACKING_PARAMS.contains(&key.to_lowercase().as_str()))
        .map(|(k, v)| (k.into_owned(), v.into_owned()))
        .collect();
    params.sort();
    if params.is_empty() {
        parsed.set_query(None);
    } else {
        parsed.query_pairs_mut().clear().extend_pairs(params);
    }

    if let Some(host) = parsed.host_str().and_then(|h| h.strip_prefix("www.")) {
        let host = host.to_owned();
        let _ = parsed.set_host(Some(&host));
    }

    let path = parsed.path().to_string();
    if path.len() > 1 && path.ends_with('/') {
        parsed.set_path(path.trim_end_matches('/'));
    }

    parsed.to_string()
}

/// Returns true if `raw` is an absolute `http`/`https` URL with a host.
pub fn is_fetchable(raw: &str) -> bool {
    Url::parse(raw.trim())
        .map(|u| matches!(u.scheme(), "http" | "https") && u.host_str().is_some_and(|h| !h.is_empty()))
        .unwrap_or(false)
}
