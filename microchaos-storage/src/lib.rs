//! Baseline storage for MicroChaos
//!
//! Saved summaries (performance baselines, resource baselines,
//! calibrated threshold profiles) are keyed by sanitized names and kept
//! in a fast in-process TTL cache layered over a durable JSON file
//! fallback. Absence is a normal outcome, not an error, and write
//! failures are soft.

pub mod cache;
pub mod file;
pub mod keys;
pub mod layered;
pub mod storage;

pub use cache::TtlValueCache;
pub use file::FileStore;
pub use keys::sanitize_key;
pub use layered::LayeredBaselineStorage;
pub use storage::{BaselineStorage, DEFAULT_TTL};
