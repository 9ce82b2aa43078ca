//! Fingerprint-keyed cache of finished result sets.
//!
//! Entries are JSON [`CacheEntry`] records in a [`KeyValueStore`]. Expiry is
//! checked on read; expired and undecodable entries are removed when seen.

use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use serde::{Deserialize, Serialize};

use crate::pipeline::SearchResult;
use crate::store::{KeyValueStore, StoreError};

/// Namespace for result-set keys in the shared store.
const KEY_PREFIX: &str = "results:";

/// Default lifetime of a cached result set.
pub const DEFAULT_TTL: Duration = Duration::from_secs(300);

/// Stored form of one cached result set.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CacheEntry {
    /// The cached results.
    pub payload: Vec<SearchResult>,
    /// Creation time, epoch milliseconds.
    pub created_at_ms: i64,
    /// Lifetime in milliseconds.
    pub ttl_ms: u64,
}

impl CacheEntry {
    /// Whether the entry has outlived its TTL at `now_ms`.
    pub fn is_expired(&self, now_ms: i64) -> bool {
        let age = now_ms.saturating_sub(self.created_at_ms);
        age > i64::try_from(self.ttl_ms).unwrap_or(i64::MAX)
    }
}

/// TTL cache from query fingerprint to result set.
#[derive(Clone)]
pub struct ResultCache {
    store: Arc<dyn KeyValueStore>,
}

impl std::fmt::Debug for ResultCache {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ResultCache").finish_non_exhaustive()
    }
}

impl ResultCache {
    /// Cache on top of `store`.
    pub fn new(store: Arc<dyn KeyValueStore>) -> Self {
        Self { store }
    }

    fn key(fingerprint: &str) -> String {
        format!("{KEY_PREFIX}{fingerprint}")
    }

    /// Live results for `fingerprint`.
    ///
    /// Store failures are logged and reported as a miss.
    pub fn get(&self, fingerprint: &str) -> Option<Vec<SearchResult>> {
        let key = Self::key(fingerprint);
        let bytes = match self.store.get(&key) {
            Ok(bytes) => bytes?,
            Err(e) => {
                tracing::warn!(fingerprint, error = %e, "result cache read failed");
                return None;
            }
        };

        let entry: CacheEntry = match serde_json::from_slice(&bytes) {
            Ok(entry) => entry,
            Err(e) => {
                tracing::warn!(fingerprint, error = %e, "dropping undecodable cache entry");
                self.evict(&key);
                return None;
            }
        };
        if entry.is_expired(Utc::now().timestamp_millis()) {
            tracing::debug!(fingerprint, "cache entry expired");
            self.evict(&key);
            return None;
        }
        Some(entry.payload)
    }

    /// Store `results` under `fingerprint` for `ttl`, replacing any entry.
    pub fn set(
        &self,
        fingerprint: &str,
        results: &[SearchResult],
        ttl: Duration,
    ) -> Result<(), StoreError> {
        let entry = CacheEntry {
            payload: results.to_vec(),
            created_at_ms: Utc::now().timestamp_millis(),
            ttl_ms: u64::try_from(ttl.as_millis()).unwrap_or(u64::MAX),
        };
        let bytes = serde_json::to_vec(&entry)?;
        self.store.set(&Self::key(fingerprint), &bytes, Some(ttl))
    }

    /// Drop every cached result set.
    pub fn clear(&self) -> Result<(), StoreError> {
        self.store.clear()
    }

    fn evict(&self, key: &str) {
        if let Err(e) = self.store.remove(key) {
            tracing::warn!(key, error = %e, "failed to evict cache entry");
        }
    }
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used)]

    use super::*;
    use crate::pipeline::{LoadStatus, ResultMetadata};
    use crate::store::MemoryStore;
    use scout_search::ContentType;

    fn result(url: &str, score: f64) -> SearchResult {
        SearchResult {
            id: crate::pipeline::ranking::result_id(url),
            url: url.into(),
            title: "t".into(),
            description: "d".into(),
            relevance_score: score,
            confidence_score: 0.5,
            timestamp: Utc::now(),
            metadata: ResultMetadata {
                domain: "example.com".into(),
                content_type: ContentType::Webpage,
                load_status: LoadStatus::Loaded,
            },
        }
    }

    fn cache() -> (ResultCache, Arc<MemoryStore>) {
        let store = Arc::new(MemoryStore::new());
        (ResultCache::new(Arc::clone(&store) as Arc<dyn KeyValueStore>), store)
    }

    #[test]
    fn set_then_get() {
        let (cache, _) = cache();
        let results = vec![result("https://example.com/a", 0.9), result("https://example.com/b", 0.3)];
        cache.set("fp", &results, DEFAULT_TTL).unwrap();
        assert_eq!(cache.get("fp").unwrap(), results);
        assert!(cache.get("other").is_none());
    }

    #[test]
    fn expired_entries_are_removed_on_read() {
        let (cache, store) = cache();
        let entry = CacheEntry {
            payload: vec![result("https://example.com/a", 0.9)],
            created_at_ms: Utc::now().timestamp_millis() - 10_000,
            ttl_ms: 1_000,
        };
        let bytes = serde_json::to_vec(&entry).unwrap();
        KeyValueStore::set(store.as_ref(), "results:fp", &bytes, None).unwrap();

        assert!(cache.get("fp").is_none());
        assert!(KeyValueStore::get(store.as_ref(), "results:fp").unwrap().is_none());
    }

    #[test]
    fn undecodable_entries_are_removed() {
        let (cache, store) = cache();
        KeyValueStore::set(store.as_ref(), "results:fp", b"not json", None).unwrap();
        assert!(cache.get("fp").is_none());
        assert!(KeyValueStore::get(store.as_ref(), "results:fp").unwrap().is_none());
    }

    #[test]
    fn clear_drops_everything() {
        let (cache, _) = cache();
        cache.set("a", &[result("https://example.com/a", 0.5)], DEFAULT_TTL).unwrap();
        cache.clear().unwrap();
        assert!(cache.get("a").is_none());
    }

    #[test]
    fn expiry_boundary() {
        let entry = CacheEntry {
            payload: vec![],
            created_at_ms: 1_000,
            ttl_ms: 500,
        };
        assert!(!entry.is_expired(1_500));
        assert!(entry.is_expired(1_501));
    }
}
