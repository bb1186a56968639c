//! Cache flushing between bursts

use async_trait::async_trait;
use tracing::debug;

/// Invoked before each burst when `--flush-between` is set. The target
/// platform decides what flushing means (page cache purge, object
/// cache reset); the engine only sequences it.
#[async_trait]
pub trait CacheFlusher: Send + Sync {
    async fn flush(&self);
}

/// Default flusher for targets with nothing to flush.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoopFlusher;

#[async_trait]
impl CacheFlusher for NoopFlusher {
    async fn flush(&self) {
        debug!("flush requested, no flusher configured");
    }
}
