//! Threshold classification and auto-calibration
//!
//! Profiles are plain data owned by the engine instance; nothing here
//! is global. The CLI decides which profile name a run classifies
//! against and whether a finished run calibrates and persists one.

use crate::reporting::Summary;
use crate::resource::ResourceSummary;
use crate::util::round_dp;
use microchaos_storage::BaselineStorage;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use tracing::debug;

/// Fallback memory ceiling when no limit is configured.
pub const DEFAULT_MEMORY_LIMIT_MB: f64 = 128.0;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MetricKind {
    ResponseTime,
    MemoryUsage,
    ErrorRate,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Severity {
    Good,
    Warn,
    Critical,
}

impl Severity {
    pub fn label(&self) -> &'static str {
        match self {
            Severity::Good => "good",
            Severity::Warn => "warning",
            Severity::Critical => "critical",
        }
    }
}

/// Ascending boundaries for one metric.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ThresholdBand {
    pub good: f64,
    pub warn: f64,
    pub critical: f64,
}

impl ThresholdBand {
    pub fn classify(&self, value: f64) -> Severity {
        if value <= self.good {
            Severity::Good
        } else if value <= self.warn {
            Severity::Warn
        } else {
            Severity::Critical
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ThresholdProfile {
    /// Seconds.
    pub response_time: ThresholdBand,
    /// Percent of the process memory ceiling.
    pub memory_usage: ThresholdBand,
    /// Percent of requests.
    pub error_rate: ThresholdBand,
}

impl Default for ThresholdProfile {
    fn default() -> Self {
        Self {
            response_time: ThresholdBand {
                good: 1.0,
                warn: 2.0,
                critical: 3.0,
            },
            memory_usage: ThresholdBand {
                good: 50.0,
                warn: 70.0,
                critical: 85.0,
            },
            error_rate: ThresholdBand {
                good: 1.0,
                warn: 5.0,
                critical: 10.0,
            },
        }
    }
}

/// Parse a human memory limit ("128M", "1G", "262144K", plain bytes)
/// into MB. Unlimited or unparseable falls back to 128 MB.
pub fn parse_memory_limit(limit: Option<&str>) -> f64 {
    let Some(limit) = limit else {
        return DEFAULT_MEMORY_LIMIT_MB;
    };
    let limit = limit.trim();
    if limit.is_empty() || limit == "-1" {
        return DEFAULT_MEMORY_LIMIT_MB;
    }
    let (number, factor_to_mb) = match limit.chars().last() {
        Some('k') | Some('K') => (&limit[..limit.len() - 1], 1.0 / 1024.0),
        Some('m') | Some('M') => (&limit[..limit.len() - 1], 1.0),
        Some('g') | Some('G') => (&limit[..limit.len() - 1], 1024.0),
        _ => (limit, 1.0 / (1024.0 * 1024.0)),
    };
    match number.parse::<f64>() {
        Ok(n) if n > 0.0 => n * factor_to_mb,
        _ => DEFAULT_MEMORY_LIMIT_MB,
    }
}

/// Owns named profiles and classifies metric values against them.
#[derive(Debug, Default)]
pub struct ThresholdEngine {
    profiles: HashMap<String, ThresholdProfile>,
}

impl ThresholdEngine {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn profile(&self, name: &str) -> Option<&ThresholdProfile> {
        self.profiles.get(name)
    }

    pub fn insert(&mut self, name: &str, profile: ThresholdProfile) {
        self.profiles.insert(name.to_string(), profile);
    }

    /// Classify against the named profile, falling back to defaults
    /// when the profile is unknown.
    pub fn classify(&self, value: f64, kind: MetricKind, profile: &str) -> Severity {
        let profile = self
            .profiles
            .get(profile)
            .copied()
            .unwrap_or_default();
        let band = match kind {
            MetricKind::ResponseTime => profile.response_time,
            MetricKind::MemoryUsage => profile.memory_usage,
            MetricKind::ErrorRate => profile.error_rate,
        };
        band.classify(value)
    }

    /// Derive a profile from a finished run: each band is the observed
    /// base value at x1.0 / x1.5 / x2.0. The calibrated profile
    /// replaces any in-process profile under the same name.
    pub fn calibrate(
        &mut self,
        summary: &Summary,
        resource: Option<&ResourceSummary>,
        memory_limit_mb: f64,
        profile_name: &str,
    ) -> ThresholdProfile {
        let band = |base: f64, places: u32| ThresholdBand {
            good: round_dp(base, places),
            warn: round_dp(base * 1.5, places),
            critical: round_dp(base * 2.0, places),
        };

        let response_time = band(summary.avg_time, 2);
        // a perfect run still deserves a nonzero error budget
        let error_rate = band(summary.error_rate.max(0.5), 1);
        let memory_usage = match resource {
            Some(resource) if memory_limit_mb > 0.0 => {
                band(resource.memory_mb.avg / memory_limit_mb * 100.0, 1)
            }
            _ => ThresholdProfile::default().memory_usage,
        };

        let profile = ThresholdProfile {
            response_time,
            memory_usage,
            error_rate,
        };
        debug!(profile_name, ?profile, "calibrated threshold profile");
        self.profiles.insert(profile_name.to_string(), profile);
        profile
    }

    pub async fn persist(&self, storage: &dyn BaselineStorage, profile_name: &str) -> bool {
        let Some(profile) = self.profiles.get(profile_name) else {
            return false;
        };
        match serde_json::to_value(profile) {
            Ok(value) => storage.save(profile_name, &value, None).await,
            Err(_) => false,
        }
    }

    /// Load a persisted profile into the engine. `false` when absent,
    /// which is a normal outcome the caller warns about.
    pub async fn load(&mut self, storage: &dyn BaselineStorage, profile_name: &str) -> bool {
        let Some(value) = storage.get(profile_name).await else {
            return false;
        };
        match serde_json::from_value::<ThresholdProfile>(value) {
            Ok(profile) => {
                self.profiles.insert(profile_name.to_string(), profile);
                true
            }
            Err(_) => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::resource::MetricStats;

    fn summary_with(avg_time: f64, error_rate: f64) -> Summary {
        Summary {
            avg_time,
            error_rate,
            ..Summary::empty()
        }
    }

    #[test]
    fn test_default_classification_boundaries() {
        let engine = ThresholdEngine::new();
        assert_eq!(
            engine.classify(1.0, MetricKind::ResponseTime, "default"),
            Severity::Good
        );
        assert_eq!(
            engine.classify(2.0, MetricKind::ResponseTime, "default"),
            Severity::Warn
        );
        assert_eq!(
            engine.classify(2.01, MetricKind::ResponseTime, "default"),
            Severity::Critical
        );
        assert_eq!(
            engine.classify(99.0, MetricKind::ErrorRate, "default"),
            Severity::Critical
        );
    }

    #[test]
    fn test_unknown_profile_falls_back_to_defaults() {
        let engine = ThresholdEngine::new();
        assert_eq!(
            engine.classify(0.5, MetricKind::ErrorRate, "never-saved"),
            Severity::Good
        );
    }

    #[test]
    fn test_parse_memory_limit_suffixes() {
        assert_eq!(parse_memory_limit(Some("128M")), 128.0);
        assert_eq!(parse_memory_limit(Some("1G")), 1024.0);
        assert_eq!(parse_memory_limit(Some("2048K")), 2.0);
        assert_eq!(parse_memory_limit(Some("1048576")), 1.0);
    }

    #[test]
    fn test_parse_memory_limit_fallbacks() {
        assert_eq!(parse_memory_limit(None), 128.0);
        assert_eq!(parse_memory_limit(Some("-1")), 128.0);
        assert_eq!(parse_memory_limit(Some("banana")), 128.0);
        assert_eq!(parse_memory_limit(Some("")), 128.0);
    }

    #[test]
    fn test_calibration_multipliers_and_rounding() {
        let mut engine = ThresholdEngine::new();
        let profile = engine.calibrate(&summary_with(0.333, 2.0), None, 128.0, "tuned");
        assert_eq!(profile.response_time.good, 0.33);
        assert_eq!(profile.response_time.warn, 0.5);
        assert_eq!(profile.response_time.critical, 0.67);
        assert_eq!(profile.error_rate.good, 2.0);
        assert_eq!(profile.error_rate.warn, 3.0);
        assert_eq!(profile.error_rate.critical, 4.0);
        // no resource summary keeps the default memory band
        assert_eq!(profile.memory_usage.good, 50.0);
        // the calibrated profile is immediately live for classification
        assert_eq!(
            engine.classify(0.4, MetricKind::ResponseTime, "tuned"),
            Severity::Warn
        );
    }

    #[test]
    fn test_calibration_error_floor() {
        let mut engine = ThresholdEngine::new();
        let profile = engine.calibrate(&summary_with(0.2, 0.0), None, 128.0, "clean");
        assert_eq!(profile.error_rate.good, 0.5);
        assert_eq!(profile.error_rate.warn, 0.8);
        assert_eq!(profile.error_rate.critical, 1.0);
    }

    #[test]
    fn test_calibration_memory_band_from_resources() {
        let stats = MetricStats {
            avg: 64.0,
            median: 64.0,
            min: 60.0,
            max: 70.0,
        };
        let resource = ResourceSummary {
            samples: 5,
            memory_mb: stats,
            peak_memory_mb: stats,
            user_time: stats,
            system_time: stats,
        };
        let mut engine = ThresholdEngine::new();
        let profile =
            engine.calibrate(&summary_with(0.2, 1.0), Some(&resource), 128.0, "mem");
        assert_eq!(profile.memory_usage.good, 50.0);
        assert_eq!(profile.memory_usage.warn, 75.0);
        assert_eq!(profile.memory_usage.critical, 100.0);
    }

    #[tokio::test]
    async fn test_persist_and_load_roundtrip() {
        let dir = tempfile::tempdir().unwrap();
        let storage =
            microchaos_storage::LayeredBaselineStorage::new(dir.path(), "microchaos_thresholds");
        let mut engine = ThresholdEngine::new();
        engine.calibrate(&summary_with(0.4, 1.0), None, 128.0, "tuned");
        assert!(engine.persist(&storage, "tuned").await);

        let mut fresh = ThresholdEngine::new();
        assert!(fresh.load(&storage, "tuned").await);
        assert_eq!(fresh.profile("tuned"), engine.profile("tuned"));
    }

    #[tokio::test]
    async fn test_load_absent_profile_is_false() {
        let dir = tempfile::tempdir().unwrap();
        let storage =
            microchaos_storage::LayeredBaselineStorage::new(dir.path(), "microchaos_thresholds");
        let mut engine = ThresholdEngine::new();
        assert!(!engine.load(&storage, "missing").await);
    }
}
