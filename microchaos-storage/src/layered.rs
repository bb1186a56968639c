//! Layered baseline storage: TTL cache over JSON files

use crate::cache::TtlValueCache;
use crate::file::FileStore;
use crate::keys::sanitize_key;
use crate::storage::{BaselineStorage, DEFAULT_TTL};
use async_trait::async_trait;
use serde_json::Value as JsonValue;
use std::path::PathBuf;
use std::time::Duration;

/// [`BaselineStorage`] backed by an in-process TTL cache over a durable
/// file store. Saves always write the file so a later process can read
/// the baseline; the cache only short-circuits reads within this
/// process. A save followed by a get on the same instance returns the
/// saved value even when the file write soft-failed.
pub struct LayeredBaselineStorage {
    cache: TtlValueCache,
    files: FileStore,
}

impl LayeredBaselineStorage {
    pub fn new(dir: impl Into<PathBuf>, namespace: impl Into<String>) -> Self {
        Self {
            cache: TtlValueCache::new(),
            files: FileStore::new(dir, namespace),
        }
    }
}

#[async_trait]
impl BaselineStorage for LayeredBaselineStorage {
    async fn save(&self, key: &str, data: &JsonValue, ttl: Option<Duration>) -> bool {
        let ttl = ttl.unwrap_or(DEFAULT_TTL);
        let key = sanitize_key(key);
        self.cache.put(&key, data.clone(), ttl);
        self.files.save(&key, data, ttl).await
    }

    async fn get(&self, key: &str) -> Option<JsonValue> {
        let key = sanitize_key(key);
        if let Some(value) = self.cache.get(&key) {
            return Some(value);
        }
        self.files.get(&key).await
    }

    async fn exists(&self, key: &str) -> bool {
        self.get(key).await.is_some()
    }

    async fn delete(&self, key: &str) -> bool {
        let key = sanitize_key(key);
        let cached = self.cache.remove(&key);
        let filed = self.files.delete(&key).await;
        cached || filed
    }
}
