//! Core storage trait

use async_trait::async_trait;
use serde_json::Value as JsonValue;
use std::time::Duration;

/// Default time-to-live for stored entries: 30 days
pub const DEFAULT_TTL: Duration = Duration::from_secs(30 * 24 * 60 * 60);

/// Named-value storage for baselines and threshold profiles.
///
/// Keys are free-form; implementations sanitize them to a safe
/// identifier alphabet before use. `get` returning `None` is the normal
/// absent case; `save`/`delete` report soft failure as `false` and
/// never panic or unwind the orchestration loop.
#[async_trait]
pub trait BaselineStorage: Send + Sync {
    /// Store a value under `key`. `None` TTL means [`DEFAULT_TTL`].
    async fn save(&self, key: &str, data: &JsonValue, ttl: Option<Duration>) -> bool;

    /// Retrieve a value by `key`; `None` when absent or expired.
    async fn get(&self, key: &str) -> Option<JsonValue>;

    /// Whether a value exists under `key`.
    async fn exists(&self, key: &str) -> bool;

    /// Remove a value; `true` when something was deleted.
    async fn delete(&self, key: &str) -> bool;
}
