//! Persistence collaborators.
//!
//! The pipeline only ever talks to the traits in this module:
//!
//! - [`KeyValueStore`] backs the result cache.
//! - [`HistoryStore`] records submitted queries.
//! - [`CredentialStore`] resolves provider API keys.
//!
//! All traits are synchronous and `Send + Sync`; implementations guard their
//! state with a [`std::sync::Mutex`] and never block on I/O across an
//! `.await` in the caller.

pub mod credentials;
pub mod memory;
mod schema;
pub mod sqlite;

use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

pub use credentials::{EnvCredentialStore, KeyringCredentialStore};
pub use memory::MemoryStore;
pub use sqlite::SqliteStore;

/// Default number of history entries kept.
pub const DEFAULT_HISTORY_LIMIT: usize = 50;

/// Errors raised by persistence backends.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    /// SQLite failure.
    #[error("sqlite error: {0}")]
    Sqlite(#[from] rusqlite::Error),

    /// Filesystem failure.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Value could not be encoded or decoded.
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// OS keychain failure.
    #[error("keyring error: {0}")]
    Keyring(String),

    /// A store mutex was poisoned by a panicking writer.
    #[error("store lock poisoned: {0}")]
    LockPoisoned(&'static str),

    /// The backend does not support this operation.
    #[error("{0} is read-only")]
    ReadOnly(&'static str),
}

/// Byte-oriented key/value storage with optional expiry.
pub trait KeyValueStore: Send + Sync {
    /// Value stored under `key`, unless absent or expired.
    fn get(&self, key: &str) -> Result<Option<Vec<u8>>, StoreError>;

    /// Store `value` under `key`, replacing any previous value.
    fn set(&self, key: &str, value: &[u8], ttl: Option<Duration>) -> Result<(), StoreError>;

    /// Delete `key`. Missing keys are not an error.
    fn remove(&self, key: &str) -> Result<(), StoreError>;

    /// Delete every key.
    fn clear(&self) -> Result<(), StoreError>;
}

/// One submitted query.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HistoryEntry {
    /// Prompt as the user typed it.
    pub query: String,
    /// When it was (last) submitted.
    pub timestamp: DateTime<Utc>,
}

/// Bounded, de-duplicated query history, oldest first.
pub trait HistoryStore: Send + Sync {
    /// Record `query`. Re-submitting a query moves it to the end; the
    /// oldest entries are dropped beyond the store's limit.
    fn append(&self, query: &str) -> Result<(), StoreError>;

    /// All entries, oldest first.
    fn list(&self) -> Result<Vec<HistoryEntry>, StoreError>;

    /// Forget everything.
    fn clear(&self) -> Result<(), StoreError>;
}

/// Provider API keys, keyed by provider name.
pub trait CredentialStore: Send + Sync {
    /// Key for `provider`, if one is stored.
    fn get(&self, provider: &str) -> Option<String>;

    /// Store `key` for `provider`.
    fn set(&self, provider: &str, key: &str) -> Result<(), StoreError>;

    /// Forget the key for `provider`. Missing keys are not an error.
    fn remove(&self, provider: &str) -> Result<(), StoreError>;
}
