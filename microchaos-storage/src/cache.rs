//! In-process TTL cache for the fast storage layer

use parking_lot::RwLock;
use serde_json::Value as JsonValue;
use std::collections::HashMap;
use std::time::{Duration, Instant};

#[derive(Debug, Clone)]
struct Entry {
    value: JsonValue,
    expires_at: Instant,
}

impl Entry {
    fn is_expired(&self) -> bool {
        Instant::now() > self.expires_at
    }
}

/// Expiring key/value cache.
///
/// Expired entries are dropped lazily on access; there is no background
/// sweeper because a load-test run holds at most a handful of entries.
#[derive(Debug, Default)]
pub struct TtlValueCache {
    store: RwLock<HashMap<String, Entry>>,
}

impl TtlValueCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn put(&self, key: &str, value: JsonValue, ttl: Duration) {
        let mut store = self.store.write();
        store.insert(
            key.to_string(),
            Entry {
                value,
                expires_at: Instant::now() + ttl,
            },
        );
    }

    pub fn get(&self, key: &str) -> Option<JsonValue> {
        let mut store = self.store.write();
        match store.get(key) {
            Some(entry) if entry.is_expired() => {
                store.remove(key);
                None
            }
            Some(entry) => Some(entry.value.clone()),
            None => None,
        }
    }

    pub fn contains(&self, key: &str) -> bool {
        self.get(key).is_some()
    }

    pub fn remove(&self, key: &str) -> bool {
        self.store.write().remove(key).is_some()
    }

    pub fn len(&self) -> usize {
        let store = self.store.read();
        store.values().filter(|e| !e.is_expired()).count()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
