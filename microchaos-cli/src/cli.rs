//! Command line definition and config assembly

use clap::{Args, Parser, Subcommand};
use microchaos_config::{
    parse_pair_list, AuthSpec, BodySource, HttpMethod, RotationMode, TestConfig,
};
use std::path::PathBuf;
use url::Url;

#[derive(Debug, Parser)]
#[command(name = "microchaos", version, about = "Internal HTTP load testing tool")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Debug, Subcommand)]
pub enum Commands {
    /// Fire bursts of requests at a target application and report
    Loadtest(Box<LoadtestArgs>),
}

#[derive(Debug, Args)]
pub struct LoadtestArgs {
    /// Root URL of the application under test
    #[arg(long)]
    pub base_url: Url,

    /// Endpoint to hit: home|shop|cart|checkout|custom:<path>; repeatable
    #[arg(long = "endpoint")]
    pub endpoint: Vec<String>,

    /// Comma-separated endpoint list, merged with --endpoint
    #[arg(long)]
    pub endpoints: Option<String>,

    /// Total number of requests (count mode)
    #[arg(long, default_value_t = 100)]
    pub count: u64,

    /// Run for this many minutes instead of a fixed count
    #[arg(long)]
    pub duration: Option<f64>,

    /// Concurrent requests per burst
    #[arg(long, default_value_t = 10)]
    pub burst: u64,

    /// Base delay between bursts in seconds (jittered at runtime)
    #[arg(long, default_value_t = 2)]
    pub delay: u64,

    #[arg(long, default_value = "GET")]
    pub method: HttpMethod,

    /// Request body: inline string or file:<path>
    #[arg(long)]
    pub body: Option<String>,

    /// Hit every endpoint once before the loop starts
    #[arg(long)]
    pub warm_cache: bool,

    /// Invoke the cache flusher before each burst
    #[arg(long)]
    pub flush_between: bool,

    /// Grow burst concurrency from 1 up to --burst
    #[arg(long)]
    pub rampup: bool,

    /// How endpoints are assigned to burst slots
    #[arg(long, default_value = "serial")]
    pub rotation_mode: RotationMode,

    /// Authenticate as one user (user or user@host)
    #[arg(long, conflicts_with = "multi_auth")]
    pub auth: Option<String>,

    /// Comma-separated users simulating distinct sessions
    #[arg(long)]
    pub multi_auth: Option<String>,

    /// Password for session setup; falls back to MICROCHAOS_AUTH_PASSWORD
    #[arg(long)]
    pub auth_password: Option<String>,

    /// Extra cookies as name=value, comma-separated
    #[arg(long)]
    pub cookie: Option<String>,

    /// Extra headers as name=value, comma-separated
    #[arg(long)]
    pub header: Option<String>,

    /// Fixed User-Agent instead of the rotating built-in pool
    #[arg(long)]
    pub user_agent: Option<String>,

    /// Sample process resource usage once per burst
    #[arg(long)]
    pub resource_logging: bool,

    /// Track resource trends over the run (implies --resource-logging)
    #[arg(long)]
    pub resource_trends: bool,

    /// Tally cache-related response headers
    #[arg(long)]
    pub cache_headers: bool,

    /// Calibrate thresholds from this run and persist them
    #[arg(long)]
    pub auto_thresholds: bool,

    /// Profile name for calibration
    #[arg(long, default_value = "default")]
    pub threshold_profile: String,

    /// Classify results against a saved threshold profile
    #[arg(long)]
    pub use_thresholds: Option<String>,

    /// Emit machine-parseable monitoring event lines
    #[arg(long)]
    pub monitoring_integration: bool,

    /// Monitoring test id (generated when omitted)
    #[arg(long)]
    pub monitoring_test_id: Option<String>,

    /// Save this run's summary as a named baseline
    #[arg(long)]
    pub save_baseline: Option<String>,

    /// Compare this run against a named baseline
    #[arg(long)]
    pub compare_baseline: Option<String>,

    /// Append one line per request to this file
    #[arg(long)]
    pub log_to: Option<PathBuf>,

    /// Process memory ceiling for memory thresholds, e.g. 512M
    #[arg(long)]
    pub memory_limit: Option<String>,

    /// Where baselines and threshold profiles are stored
    #[arg(long)]
    pub storage_dir: Option<PathBuf>,
}

impl LoadtestArgs {
    /// Merge the flag surface into a [`TestConfig`].
    pub fn to_config(&self) -> TestConfig {
        let mut endpoints = self.endpoint.clone();
        if let Some(list) = &self.endpoints {
            endpoints.extend(
                list.split(',')
                    .map(|s| s.trim().to_string())
                    .filter(|s| !s.is_empty()),
            );
        }
        if endpoints.is_empty() {
            endpoints.push("home".to_string());
        }

        let auth = if let Some(user) = &self.auth {
            Some(AuthSpec::Single(user.clone()))
        } else {
            self.multi_auth.as_ref().map(|list| {
                AuthSpec::Multi(
                    list.split(',')
                        .map(|s| s.trim().to_string())
                        .filter(|s| !s.is_empty())
                        .collect(),
                )
            })
        };

        let mut config = TestConfig::new(self.base_url.clone());
        config.endpoints = endpoints;
        config.count = self.count;
        config.duration = self.duration;
        config.burst = self.burst;
        config.delay = self.delay;
        config.method = self.method;
        config.body = self.body.as_deref().map(BodySource::parse);
        config.warm_cache = self.warm_cache;
        config.flush_between = self.flush_between;
        config.rampup = self.rampup;
        config.rotation_mode = self.rotation_mode;
        config.auth = auth;
        config.custom_cookies = self.cookie.as_deref().map(parse_pair_list).unwrap_or_default();
        config.custom_headers = self.header.as_deref().map(parse_pair_list).unwrap_or_default();
        config.user_agent = self.user_agent.clone();
        config.resource_logging = self.resource_logging || self.resource_trends;
        config.resource_trends = self.resource_trends;
        config.collect_cache_headers = self.cache_headers;
        config.auto_thresholds = self.auto_thresholds;
        config.threshold_profile = self.threshold_profile.clone();
        config.use_thresholds = self.use_thresholds.clone();
        config.monitoring_integration = self.monitoring_integration;
        config.monitoring_test_id = self.monitoring_test_id.clone();
        config.save_baseline = self.save_baseline.clone();
        config.compare_baseline = self.compare_baseline.clone();
        config.log_path = self.log_to.clone();
        config.memory_limit = self.memory_limit.clone();
        config
    }

    /// Storage location for baselines and profiles, defaulting to the
    /// platform data directory.
    pub fn storage_dir(&self) -> PathBuf {
        self.storage_dir.clone().unwrap_or_else(|| {
            dirs::data_dir()
                .unwrap_or_else(std::env::temp_dir)
                .join("microchaos")
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::Parser;

    fn parse(args: &[&str]) -> LoadtestArgs {
        let mut full = vec!["microchaos", "loadtest"];
        full.extend_from_slice(args);
        match Cli::try_parse_from(full).unwrap().command {
            Commands::Loadtest(args) => *args,
        }
    }

    #[test]
    fn test_defaults_match_config_defaults() {
        let args = parse(&["--base-url", "https://staging.example.com"]);
        let config = args.to_config();
        assert_eq!(config.endpoints, vec!["home".to_string()]);
        assert_eq!(config.count, 100);
        assert_eq!(config.burst, 10);
        assert_eq!(config.delay, 2);
        assert_eq!(config.method, HttpMethod::Get);
        assert_eq!(config.rotation_mode, RotationMode::Serial);
        assert!(config.auth.is_none());
        assert!(!config.run_by_duration());
    }

    #[test]
    fn test_endpoint_merging() {
        let args = parse(&[
            "--base-url",
            "https://staging.example.com",
            "--endpoint",
            "shop",
            "--endpoints",
            "cart, checkout",
        ]);
        assert_eq!(
            args.to_config().endpoints,
            vec!["shop".to_string(), "cart".to_string(), "checkout".to_string()]
        );
    }

    #[test]
    fn test_duration_and_rotation_flags() {
        let args = parse(&[
            "--base-url",
            "https://staging.example.com",
            "--duration",
            "2.5",
            "--rotation-mode",
            "random",
        ]);
        let config = args.to_config();
        assert_eq!(config.duration, Some(2.5));
        assert!(config.run_by_duration());
        assert_eq!(config.rotation_mode, RotationMode::Random);
    }

    #[test]
    fn test_multi_auth_parsing() {
        let args = parse(&[
            "--base-url",
            "https://staging.example.com",
            "--multi-auth",
            "alice@example.com, bob@example.com",
        ]);
        assert_eq!(
            args.to_config().auth,
            Some(AuthSpec::Multi(vec![
                "alice@example.com".to_string(),
                "bob@example.com".to_string(),
            ]))
        );
    }

    #[test]
    fn test_auth_conflicts_with_multi_auth() {
        let result = Cli::try_parse_from([
            "microchaos",
            "loadtest",
            "--base-url",
            "https://staging.example.com",
            "--auth",
            "admin",
            "--multi-auth",
            "a,b",
        ]);
        assert!(result.is_err());
    }

    #[test]
    fn test_header_and_cookie_pairs() {
        let args = parse(&[
            "--base-url",
            "https://staging.example.com",
            "--header",
            "X-Test=1",
            "--cookie",
            "test_group=b,seen_banner=1",
        ]);
        let config = args.to_config();
        assert_eq!(config.custom_headers, vec![("X-Test".to_string(), "1".to_string())]);
        assert_eq!(config.custom_cookies.len(), 2);
    }

    #[test]
    fn test_resource_trends_implies_logging() {
        let args = parse(&[
            "--base-url",
            "https://staging.example.com",
            "--resource-trends",
        ]);
        let config = args.to_config();
        assert!(config.resource_logging);
        assert!(config.resource_trends);
    }

    #[test]
    fn test_monitoring_flags() {
        let args = parse(&[
            "--base-url",
            "https://staging.example.com",
            "--monitoring-integration",
            "--monitoring-test-id",
            "nightly-42",
        ]);
        let config = args.to_config();
        assert!(config.monitoring_integration);
        assert_eq!(config.monitoring_test_id.as_deref(), Some("nightly-42"));
    }

    #[test]
    fn test_invalid_method_rejected() {
        let result = Cli::try_parse_from([
            "microchaos",
            "loadtest",
            "--base-url",
            "https://staging.example.com",
            "--method",
            "FETCH",
        ]);
        assert!(result.is_err());
    }

    #[test]
    fn test_body_file_prefix() {
        let args = parse(&[
            "--base-url",
            "https://staging.example.com",
            "--method",
            "POST",
            "--body",
            "file:/tmp/payload.json",
        ]);
        assert!(matches!(args.to_config().body, Some(BodySource::File(_))));
    }
}
