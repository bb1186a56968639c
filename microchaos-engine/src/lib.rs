//! Load test orchestration for MicroChaos
//!
//! Wires configuration, the request generator, reporting, resource
//! monitoring, thresholds and baselines into one run. Collaborators
//! (session provider, cache flusher, logger) are injected traits so
//! the engine stays independent of any particular target platform.

pub mod auth;
pub mod error;
pub mod flush;
pub mod monitoring;
pub mod orchestrator;

pub use auth::{AuthError, BasicAuthProvider, SessionProvider};
pub use error::{EngineError, EngineResult};
pub use flush::{CacheFlusher, NoopFlusher};
pub use monitoring::{MonitoringSink, MONITORING_LOG_PREFIX};
pub use orchestrator::{LoadTestOrchestrator, RunOutcome};
