//! HTTP clients for discovery and page fetching.
//!
//! Both kinds of client keep cookies (consent interstitials), cap redirects
//! and present a browser User-Agent picked once per client. Page clients
//! additionally ask for HTML in English first.

use std::time::Duration;

use rand::seq::SliceRandom;
use reqwest::header::{ACCEPT, ACCEPT_LANGUAGE, HeaderMap, HeaderValue};

use crate::error::SearchError;

/// Desktop browser identities a client may present.
const BROWSER_AGENTS: &[&str] = &[
    "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/126.0.0.0 Safari/537.36",
    "Mozilla/5.0 (Macintosh; Intel Mac OS X 14_5) AppleWebKit/605.1.15 (KHTML, like Gecko) Version/17.5 Safari/605.1.15",
    "Mozilla/5.0 (X11; Linux x86_64; rv:127.0) Gecko/20100101 Firefox/127.0",
    "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/126.0.0.0 Safari/537.36 Edg/126.0.0.0",
];

const MAX_REDIRECTS: usize = 8;

/// What a client is used for.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ClientPurpose {
    /// Search backend requests (HTML result pages and JSON APIs).
    Discovery,
    /// Fetching candidate pages for extraction.
    Pages,
}

impl ClientPurpose {
    fn headers(self) -> HeaderMap {
        let mut headers = HeaderMap::new();
        if self == Self::Pages {
            headers.insert(
                ACCEPT,
                HeaderValue::from_static("text/html,application/xhtml+xml;q=0.9,*/*;q=0.5"),
            );
            headers.insert(ACCEPT_LANGUAGE, HeaderValue::from_static("en-US,en;q=0.8"));
        }
        headers
    }
}

/// Build a client for `purpose` with a whole-request `timeout`.
///
/// `user_agent` overrides the randomly chosen browser identity.
///
/// # Errors
///
/// Returns [`SearchError::Http`] if the client cannot be constructed.
pub fn build_client(
    purpose: ClientPurpose,
    timeout: Duration,
    user_agent: Option<&str>,
) -> Result<reqwest::Client, SearchError> {
    let agent = user_agent.map_or_else(|| pick_user_agent().to_owned(), str::to_owned);

    reqwest::Client::builder()
        .cookie_store(true)
        .timeout(timeout)
        .user_agent(agent)
        .default_headers(purpose.headers())
        .redirect(reqwest::redirect::Policy::limited(MAX_REDIRECTS))
        .build()
        .map_err(|e| SearchError::Http(format!("cannot build {purpose:?} client: {e}")))
}

/// One of the built-in browser identities, chosen at random.
pub fn pick_user_agent() -> &'static str {
    BROWSER_AGENTS
        .choose(&mut rand::thread_rng())
        .copied()
        .unwrap_or(BROWSER_AGENTS[0])
}
