//! In-process store implementing every persistence trait.

use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard};
use std::time::{Duration, Instant};

use chrono::Utc;

use super::{
    CredentialStore, DEFAULT_HISTORY_LIMIT, HistoryEntry, HistoryStore, KeyValueStore, StoreError,
};

#[derive(Debug)]
struct Slot {
    value: Vec<u8>,
    expires_at: Option<Instant>,
}

/// Volatile store for tests and sessions without a database.
#[derive(Debug)]
pub struct MemoryStore {
    values: Mutex<HashMap<String, Slot>>,
    history: Mutex<Vec<HistoryEntry>>,
    credentials: Mutex<HashMap<String, String>>,
    history_limit: usize,
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

impl MemoryStore {
    /// Empty store keeping [`DEFAULT_HISTORY_LIMIT`] history entries.
    pub fn new() -> Self {
        Self {
            values: Mutex::new(HashMap::new()),
            history: Mutex::new(Vec::new()),
            credentials: Mutex::new(HashMap::new()),
            history_limit: DEFAULT_HISTORY_LIMIT,
        }
    }

    /// Keep at most `limit` history entries.
    pub fn with_history_limit(mut self, limit: usize) -> Self {
        self.history_limit = limit;
        self
    }

    /// Seed a credential.
    pub fn with_credential(self, provider: &str, key: &str) -> Self {
        if let Ok(mut creds) = self.credentials.lock() {
            creds.insert(provider.to_owned(), key.to_owned());
        }
        self
    }
}

fn lock<'a, T>(mutex: &'a Mutex<T>, what: &'static str) -> Result<MutexGuard<'a, T>, StoreError> {
    mutex.lock().map_err(|_| StoreError::LockPoisoned(what))
}

impl KeyValueStore for MemoryStore {
    fn get(&self, key: &str) -> Result<Option<Vec<u8>>, StoreError> {
        let mut values = lock(&self.values, "values")?;
        let expired = match values.get(key) {
            None => return Ok(None),
            Some(slot) => slot.expires_at.is_some_and(|at| Instant::now() >= at),
        };
        if expired {
            values.remove(key);
            return Ok(None);
        }
        Ok(values.get(key).map(|slot| slot.value.clone()))
    }

    fn set(&self, key: &str, value: &[u8], ttl: Option<Duration>) -> Result<(), StoreError> {
        let slot = Slot {
            value: value.to_vec(),
            expires_at: ttl.map(|ttl| Instant::now() + ttl),
        };
        lock(&self.values, "values")?.insert(key.to_owned(), slot);
        Ok(())
    }

    fn remove(&self, key: &str) -> Result<(), StoreError> {
        lock(&self.values, "values")?.remove(key);
        Ok(())
    }

    fn clear(&self) -> Result<(), StoreError> {
        lock(&self.values, "values")?.clear();
        Ok(())
    }
}

impl HistoryStore for MemoryStore {
    fn append(&self, query: &str) -> Result<(), StoreError> {
        let mut history = lock(&self.history, "history")?;
        history.retain(|entry| entry.query != query);
        history.push(HistoryEntry {
            query: query.to_owned(),
            timestamp: Utc::now(),
        });
        let excess = history.len().saturating_sub(self.history_limit);
        history.drain(..excess);
        Ok(())
    }

    fn list(&self) -> Result<Vec<HistoryEntry>, StoreError> {
        Ok(lock(&self.history, "history")?.clone())
    }

    fn clear(&self) -> Result<(), StoreError> {
        lock(&self.history, "history")?.clear();
        Ok(())
    }
}

impl CredentialStore for MemoryStore {
    fn get(&self, provider: &str) -> Option<String> {
        self.credentials.lock().ok()?.get(provider).cloned()
    }

    fn set(&self, provider: &str, key: &str) -> Result<(), StoreError> {
        lock(&self.credentials, "credentials")?.insert(provider.to_owned(), key.to_owned());
        Ok(())
    }

    fn remove(&self, provider: &str) -> Result<(), StoreError> {
        lock(&self.credentials, "credentials")?.remove(provider);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used)]

    use super::*;

    #[test]
    fn values_roundtrip_and_expire() {
        let store = MemoryStore::new();
        KeyValueStore::set(&store, "a", b"1", None).unwrap();
        KeyValueStore::set(&store, "b", b"2", Some(Duration::ZERO)).unwrap();
        assert_eq!(KeyValueStore::get(&store, "a").unwrap().as_deref(), Some(&b"1"[..]));
        assert!(KeyValueStore::get(&store, "b").unwrap().is_none());

        KeyValueStore::remove(&store, "a").unwrap();
        assert!(KeyValueStore::get(&store, "a").unwrap().is_none());
    }

    #[test]
    fn history_moves_repeats_to_end_and_is_bounded() {
        let store = MemoryStore::new().with_history_limit(2);
        store.append("one").unwrap();
        store.append("two").unwrap();
        store.append("one").unwrap();
        let queries: Vec<String> = store.list().unwrap().into_iter().map(|e| e.query).collect();
        assert_eq!(queries, ["two", "one"]);

        store.append("three").unwrap();
        let queries: Vec<String> = store.list().unwrap().into_iter().map(|e| e.query).collect();
        assert_eq!(queries, ["one", "three"]);

        HistoryStore::clear(&store).unwrap();
        assert!(store.list().unwrap().is_empty());
    }

    #[test]
    fn credentials() {
        let store = MemoryStore::new().with_credential("openai", "sk-1");
        assert_eq!(CredentialStore::get(&store, "openai").as_deref(), Some("sk-1"));
        CredentialStore::remove(&store, "openai").unwrap();
        assert!(CredentialStore::get(&store, "openai").is_none());
    }
}
