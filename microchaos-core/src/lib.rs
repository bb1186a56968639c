//! Core measurement and analysis for MicroChaos
//!
//! Everything downstream of a fired request lives here: per-request
//! results, the reporting engine that turns them into summaries and
//! baseline comparisons, the resource monitor, the cache header
//! analyzer, the threshold engine and execution metrics. All output
//! goes through an injected [`Logger`] so the core stays free of
//! terminal concerns.

pub mod cache;
pub mod error;
pub mod logger;
pub mod metrics;
pub mod reporting;
pub mod resource;
pub mod result;
pub mod thresholds;

mod util;

pub use cache::{CacheAnalyzer, CacheHeaderTally, CACHE_HEADERS};
pub use error::{CoreError, CoreResult};
pub use logger::{LogLevel, Logger, NoopLogger, RecordingLogger};
pub use metrics::{format_duration, format_large_number, ExecutionMetrics};
pub use reporting::{pct_change, BaselineComparison, ExportFormat, ReportingEngine, Summary};
pub use resource::{
    GrowthPattern, MetricStats, MetricTrend, ResourceMonitor, ResourceSample, ResourceSummary,
    TrendReport,
};
pub use result::{RequestResult, StatusOutcome};
pub use thresholds::{
    parse_memory_limit, MetricKind, Severity, ThresholdBand, ThresholdEngine, ThresholdProfile,
};
