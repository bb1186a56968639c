//! Durable JSON file store

use crate::keys::sanitize_key;
use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;
use std::path::{Path, PathBuf};
use std::time::{Duration, SystemTime, UNIX_EPOCH};
use tracing::{debug, warn};

/// On-disk envelope around a stored value. Expiry is wall-clock so a
/// baseline saved by one run can expire for a later process.
#[derive(Debug, Serialize, Deserialize)]
struct StoredEntry {
    value: JsonValue,
    expires_at_secs: u64,
}

/// JSON-file-per-key store under a single directory.
///
/// File names are `<namespace>_<sanitized-key>.json`. All failures are
/// soft: a missing or corrupt file reads as absent, and write errors
/// log a warning and report `false`.
#[derive(Debug, Clone)]
pub struct FileStore {
    dir: PathBuf,
    namespace: String,
}

impl FileStore {
    pub fn new(dir: impl Into<PathBuf>, namespace: impl Into<String>) -> Self {
        Self {
            dir: dir.into(),
            namespace: namespace.into(),
        }
    }

    fn path_for(&self, key: &str) -> PathBuf {
        self.dir
            .join(format!("{}_{}.json", self.namespace, sanitize_key(key)))
    }

    fn now_secs() -> u64 {
        SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_secs())
            .unwrap_or(0)
    }

    pub async fn save(&self, key: &str, data: &JsonValue, ttl: Duration) -> bool {
        let entry = StoredEntry {
            value: data.clone(),
            expires_at_secs: Self::now_secs().saturating_add(ttl.as_secs()),
        };
        let json = match serde_json::to_string_pretty(&entry) {
            Ok(json) => json,
            Err(e) => {
                warn!(key, error = %e, "failed to serialize stored entry");
                return false;
            }
        };
        if let Err(e) = tokio::fs::create_dir_all(&self.dir).await {
            warn!(dir = %self.dir.display(), error = %e, "failed to create storage directory");
            return false;
        }
        let path = self.path_for(key);
        match tokio::fs::write(&path, json).await {
            Ok(()) => {
                debug!(key, path = %path.display(), "saved entry");
                true
            }
            Err(e) => {
                warn!(key, path = %path.display(), error = %e, "failed to write entry");
                false
            }
        }
    }

    pub async fn get(&self, key: &str) -> Option<JsonValue> {
        let path = self.path_for(key);
        let raw = tokio::fs::read_to_string(&path).await.ok()?;
        let entry: StoredEntry = match serde_json::from_str(&raw) {
            Ok(entry) => entry,
            Err(e) => {
                warn!(key, path = %path.display(), error = %e, "ignoring corrupt entry");
                return None;
            }
        };
        if Self::now_secs() > entry.expires_at_secs {
            let _ = tokio::fs::remove_file(&path).await;
            return None;
        }
        Some(entry.value)
    }

    pub async fn exists(&self, key: &str) -> bool {
        self.get(key).await.is_some()
    }

    pub async fn delete(&self, key: &str) -> bool {
        tokio::fs::remove_file(self.path_for(key)).await.is_ok()
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[tokio::test]
    async fn test_save_and_get() {
        let dir = tempfile::tempdir().unwrap();
        let store = FileStore::new(dir.path(), "microchaos_baseline");
        assert!(
            store
                .save("Checkout Flow", &json!({"avg": 0.42}), Duration::from_secs(60))
                .await
        );
        assert_eq!(store.get("Checkout Flow").await, Some(json!({"avg": 0.42})));
        assert!(store.exists("Checkout Flow").await);
    }

    #[tokio::test]
    async fn test_absent_key_is_none() {
        let dir = tempfile::tempdir().unwrap();
        let store = FileStore::new(dir.path(), "microchaos_baseline");
        assert_eq!(store.get("nope").await, None);
        assert!(!store.exists("nope").await);
    }

    #[tokio::test]
    async fn test_expired_entry_reads_as_absent() {
        let dir = tempfile::tempdir().unwrap();
        let store = FileStore::new(dir.path(), "microchaos_baseline");
        assert!(store.save("old", &json!(1), Duration::from_secs(0)).await);
        tokio::time::sleep(Duration::from_millis(1100)).await;
        assert_eq!(store.get("old").await, None);
    }

    #[tokio::test]
    async fn test_corrupt_file_reads_as_absent() {
        let dir = tempfile::tempdir().unwrap();
        let store = FileStore::new(dir.path(), "microchaos_baseline");
        tokio::fs::write(dir.path().join("microchaos_baseline_bad.json"), "{not json")
            .await
            .unwrap();
        assert_eq!(store.get("bad").await, None);
    }

    #[tokio::test]
    async fn test_delete() {
        let dir = tempfile::tempdir().unwrap();
        let store = FileStore::new(dir.path(), "microchaos_baseline");
        store.save("k", &json!(1), Duration::from_secs(60)).await;
        assert!(store.delete("k").await);
        assert!(!store.delete("k").await);
    }
}
