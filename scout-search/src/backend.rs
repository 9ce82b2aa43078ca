//! Trait definition for pluggable discovery backends.
//!
//! Each backend (DuckDuckGo, Bing, Wikipedia) implements
//! [`DiscoveryBackend`] so [`crate::Discovery`] can fan out to all of
//! them concurrently and merge what comes back.

use async_trait::async_trait;

use crate::error::SearchError;
use crate::types::Suggestion;

/// A source of candidate URLs for a query.
///
/// Implementors handle their own request construction and response
/// parsing. Returned suggestions are in backend rank order; relevance
/// hints are assigned later by the merge step, so implementors may leave
/// them at zero.
///
/// All implementations must be `Send + Sync` for concurrent fan-out.
#[async_trait]
pub trait DiscoveryBackend: Send + Sync {
    /// Human-readable backend name, also used as the circuit-breaker key.
    fn name(&self) -> &str;

    /// Ranking weight applied to this backend's positional scores.
    fn weight(&self) -> f64 {
        1.0
    }

    /// Return up to `limit` candidates for `query`.
    ///
    /// # Errors
    ///
    /// Returns [`SearchError`] if the request fails or the response
    /// cannot be parsed.
    async fn discover(&self, query: &str, limit: usize) -> Result<Vec<Suggestion>, SearchError>;
}
