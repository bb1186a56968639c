//! Per-run test configuration

use crate::body::BodySource;
use crate::endpoint::RotationMode;
use crate::error::ConfigResult;
use crate::method::HttpMethod;
use crate::validation::{validate_positive, validate_required_string, Validatable};
use url::Url;

/// Authentication requested for the run
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AuthSpec {
    /// One named user; lookup failure is fatal
    Single(String),
    /// Several named users simulating distinct sessions; individual
    /// failures are skipped, total failure degrades to unauthenticated
    Multi(Vec<String>),
}

/// Immutable per-run configuration.
///
/// Built once from CLI flags, validated, then handed to the
/// orchestrator. Duration takes precedence over count when both are
/// set.
#[derive(Debug, Clone)]
pub struct TestConfig {
    /// Root URL of the application under test
    pub base_url: Url,
    /// Endpoint slugs to rotate over (at least one after normalization)
    pub endpoints: Vec<String>,
    /// Total request budget (count mode)
    pub count: u64,
    /// Test duration in minutes (duration mode; wins over count)
    pub duration: Option<f64>,
    /// Concurrent requests per burst
    pub burst: u64,
    /// Configured inter-burst delay in seconds (jittered at runtime)
    pub delay: u64,
    pub method: HttpMethod,
    pub body: Option<BodySource>,
    /// Sequential warm-up pass over every endpoint before the loop
    pub warm_cache: bool,
    /// Invoke the cache-flush collaborator before each burst
    pub flush_between: bool,
    /// Grow burst concurrency from 1 up to `burst`
    pub rampup: bool,
    pub auth: Option<AuthSpec>,
    /// Extra cookies as (name, value) pairs, merged into the session
    pub custom_cookies: Vec<(String, String)>,
    /// Extra headers as (name, value) pairs, sent on every request
    pub custom_headers: Vec<(String, String)>,
    /// Fixed User-Agent; None rotates through a built-in pool
    pub user_agent: Option<String>,
    pub rotation_mode: RotationMode,
    pub resource_logging: bool,
    pub resource_trends: bool,
    pub collect_cache_headers: bool,
    /// Calibrate thresholds from this run and persist under
    /// `threshold_profile`
    pub auto_thresholds: bool,
    pub threshold_profile: String,
    /// Load a previously calibrated profile for display
    pub use_thresholds: Option<String>,
    pub monitoring_integration: bool,
    pub monitoring_test_id: Option<String>,
    pub save_baseline: Option<String>,
    pub compare_baseline: Option<String>,
    /// Append one line per request to this file
    pub log_path: Option<std::path::PathBuf>,
    /// Process memory ceiling for memory-percentage thresholds
    /// (human-readable, e.g. "512M"); None falls back to 128 MB
    pub memory_limit: Option<String>,
}

impl TestConfig {
    /// Minimal config against a base URL, mirroring the CLI defaults:
    /// home endpoint, 100 requests, bursts of 10, 2s delay, GET.
    pub fn new(base_url: Url) -> Self {
        Self {
            base_url,
            endpoints: vec!["home".to_string()],
            count: 100,
            duration: None,
            burst: 10,
            delay: 2,
            method: HttpMethod::Get,
            body: None,
            warm_cache: false,
            flush_between: false,
            rampup: false,
            auth: None,
            custom_cookies: Vec::new(),
            custom_headers: Vec::new(),
            user_agent: None,
            rotation_mode: RotationMode::Serial,
            resource_logging: false,
            resource_trends: false,
            collect_cache_headers: false,
            auto_thresholds: false,
            threshold_profile: "default".to_string(),
            use_thresholds: None,
            monitoring_integration: false,
            monitoring_test_id: None,
            save_baseline: None,
            compare_baseline: None,
            log_path: None,
            memory_limit: None,
        }
    }

    /// Whether the run is bounded by wall-clock rather than count
    pub fn run_by_duration(&self) -> bool {
        self.duration.is_some()
    }
}

impl Validatable for TestConfig {
    fn validate(&self) -> ConfigResult<()> {
        let domain = self.domain_name();

        if self.endpoints.is_empty() {
            return Err(self.validation_error("at least one endpoint is required"));
        }
        for slug in &self.endpoints {
            validate_required_string(slug, "endpoint", domain)?;
        }

        validate_positive(self.burst, "burst", domain)?;

        match self.duration {
            Some(minutes) => {
                if minutes < 0.0 {
                    return Err(self.validation_error("duration cannot be negative"));
                }
            }
            None => validate_positive(self.count, "count", domain)?,
        }

        validate_required_string(&self.threshold_profile, "threshold_profile", domain)?;

        if let Some(AuthSpec::Multi(users)) = &self.auth {
            if users.is_empty() {
                return Err(self.validation_error("multi-auth requires at least one user"));
            }
        }

        Ok(())
    }

    fn domain_name(&self) -> &'static str {
        "loadtest"
    }
}

/// Split a comma-separated list of `name=value` pairs, as used by the
/// `--header` and `--cookie` flags.
pub fn parse_pair_list(raw: &str) -> Vec<(String, String)> {
    raw.split(',')
        .filter_map(|pair| {
            let pair = pair.trim();
            let (name, value) = pair.split_once('=')?;
            let name = name.trim();
            if name.is_empty() {
                return None;
            }
            Some((name.to_string(), value.trim().to_string()))
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config() -> TestConfig {
        TestConfig::new(Url::parse("https://staging.example.com").unwrap())
    }

    #[test]
    fn test_defaults_validate() {
        assert!(config().validate().is_ok());
    }

    #[test]
    fn test_zero_count_rejected_in_count_mode() {
        let mut cfg = config();
        cfg.count = 0;
        assert!(cfg.validate().is_err());

        // Duration mode does not care about count
        cfg.duration = Some(1.0);
        assert!(cfg.validate().is_ok());
    }

    #[test]
    fn test_zero_duration_allowed() {
        // Degenerate but well-defined: the loop exits on its first check
        let mut cfg = config();
        cfg.duration = Some(0.0);
        assert!(cfg.validate().is_ok());
        assert!(cfg.run_by_duration());
    }

    #[test]
    fn test_zero_burst_rejected() {
        let mut cfg = config();
        cfg.burst = 0;
        assert!(cfg.validate().is_err());
    }

    #[test]
    fn test_parse_pair_list() {
        let pairs = parse_pair_list("X-Test=1, Authorization = Bearer abc");
        assert_eq!(
            pairs,
            vec![
                ("X-Test".to_string(), "1".to_string()),
                ("Authorization".to_string(), "Bearer abc".to_string()),
            ]
        );
        assert!(parse_pair_list("novalue").is_empty());
    }
}
