//! The load test orchestrator
//!
//! Drives a whole run: validate and resolve configuration, establish
//! sessions, optionally warm the cache, then loop bursts until the
//! count budget or wall-clock window is spent, and finally report,
//! calibrate and persist.

use crate::auth::SessionProvider;
use crate::error::EngineResult;
use crate::flush::CacheFlusher;
use crate::monitoring::MonitoringSink;
use microchaos_config::{resolve_endpoint, AuthSpec, Endpoint, RotationMode, TestConfig, Validatable};
use microchaos_core::{
    format_duration, parse_memory_limit, pct_change, CacheAnalyzer, ExecutionMetrics, Logger,
    NoopLogger, ReportingEngine, ResourceMonitor, Summary, ThresholdEngine,
};
use microchaos_http::{Cookies, GeneratorConfig, RequestGenerator};
use microchaos_storage::LayeredBaselineStorage;
use rand::Rng;
use serde_json::json;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{debug, warn};
use url::Url;

const PERFORMANCE_NAMESPACE: &str = "microchaos_baseline";
const RESOURCE_NAMESPACE: &str = "microchaos_resource_baseline";
const THRESHOLD_NAMESPACE: &str = "microchaos_thresholds";

/// What a finished run looked like, for the caller's closing output.
#[derive(Debug, Clone)]
pub struct RunOutcome {
    pub completed: u64,
    pub run_by_duration: bool,
    /// Wall-clock minutes actually spent, duration mode only.
    pub actual_minutes: Option<f64>,
    pub summary: Summary,
}

pub struct LoadTestOrchestrator {
    config: TestConfig,
    logger: Arc<dyn Logger>,
    storage_dir: PathBuf,
    session_provider: Option<Arc<dyn SessionProvider>>,
    flusher: Option<Arc<dyn CacheFlusher>>,
}

impl LoadTestOrchestrator {
    pub fn new(config: TestConfig) -> Self {
        Self {
            config,
            logger: Arc::new(NoopLogger),
            storage_dir: std::env::temp_dir().join("microchaos"),
            session_provider: None,
            flusher: None,
        }
    }

    pub fn with_logger(mut self, logger: Arc<dyn Logger>) -> Self {
        self.logger = logger;
        self
    }

    pub fn with_storage_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.storage_dir = dir.into();
        self
    }

    pub fn with_session_provider(mut self, provider: Arc<dyn SessionProvider>) -> Self {
        self.session_provider = Some(provider);
        self
    }

    pub fn with_flusher(mut self, flusher: Arc<dyn CacheFlusher>) -> Self {
        self.flusher = Some(flusher);
        self
    }

    /// Run the whole test. Configuration problems are the only fatal
    /// errors; once the loop starts, failures only move the error rate.
    pub async fn execute(&self) -> EngineResult<RunOutcome> {
        let logger = self.logger.as_ref();

        debug!(phase = "configuring");
        self.config.validate()?;
        let body = match &self.config.body {
            Some(source) => Some(source.resolve()?),
            None => None,
        };

        debug!(phase = "resolving_endpoints");
        let endpoints: Vec<Endpoint> = self
            .config
            .endpoints
            .iter()
            .map(|slug| resolve_endpoint(&self.config.base_url, slug))
            .collect::<Result<_, _>>()?;

        debug!(phase = "setting_up_auth");
        let cookies = self.establish_sessions().await?;

        let generator = RequestGenerator::new(GeneratorConfig {
            method: self.config.method,
            body,
            custom_headers: self.config.custom_headers.clone(),
            user_agent: self.config.user_agent.clone(),
            cookies,
            collect_cache_headers: self.config.collect_cache_headers,
            log_path: self.config.log_path.clone(),
        })?;

        let sink = MonitoringSink::new(
            self.config.monitoring_integration,
            self.config.monitoring_test_id.clone(),
        );
        sink.test_start(json!({
            "endpoints": self.config.endpoints,
            "body": self.config.body.as_ref().map(|b| b.preview()),
            "count": self.config.count,
            "duration_minutes": self.config.duration,
            "burst": self.config.burst,
            "delay": self.config.delay,
            "method": self.config.method.as_str(),
            "rotation_mode": self.config.rotation_mode.to_string(),
        }));

        let threshold_storage = LayeredBaselineStorage::new(&self.storage_dir, THRESHOLD_NAMESPACE);
        let mut thresholds = ThresholdEngine::new();
        if let Some(profile) = &self.config.use_thresholds {
            if thresholds.load(&threshold_storage, profile).await {
                logger.log(&format!("Using threshold profile '{profile}'"));
            } else {
                logger.warning(&format!(
                    "Threshold profile '{profile}' not found, using defaults"
                ));
            }
        }

        if self.config.warm_cache {
            debug!(phase = "warming_cache");
            logger.log(&format!(
                "Warming cache across {} endpoint(s)...",
                endpoints.len()
            ));
            for endpoint in &endpoints {
                generator.fire_request(&endpoint.url, logger).await;
            }
        }

        debug!(phase = "running");
        let mut resource_monitor = self
            .config
            .resource_logging
            .then(|| ResourceMonitor::new(self.config.resource_trends));
        let mut reporting = ReportingEngine::new();
        let mut analyzer = CacheAnalyzer::new();

        let started_at = chrono::Utc::now();
        let start_instant = Instant::now();
        let duration_limit_secs = self.config.duration.map(|minutes| minutes * 60.0);
        let mut completed: u64 = 0;
        let mut ramp_level: u64 = 1;
        let mut rotation_index: usize = 0;
        let mut burst_number: u64 = 0;

        loop {
            match duration_limit_secs {
                Some(limit) => {
                    if start_instant.elapsed().as_secs_f64() >= limit {
                        break;
                    }
                }
                None => {
                    if completed >= self.config.count {
                        break;
                    }
                }
            }

            if let Some(monitor) = &mut resource_monitor {
                let sample = monitor.sample();
                sink.resource_snapshot(&sample);
            }

            let mut size = self.config.burst;
            if self.config.rampup {
                size = ramp_level.min(self.config.burst);
                ramp_level = (ramp_level + 1).min(self.config.burst);
            }
            if duration_limit_secs.is_none() {
                size = size.min(self.config.count - completed);
            }

            if self.config.flush_between {
                match &self.flusher {
                    Some(flusher) => flusher.flush().await,
                    None => debug!("flush requested but no flusher configured"),
                }
            }

            let urls = self.select_urls(&endpoints, size, &mut rotation_index);
            let results = generator.fire_batch(&urls, logger).await;
            for result in &results {
                sink.request(result);
            }
            reporting.add_results(results);
            analyzer.absorb(generator.drain_cache_tally());

            completed += size;
            burst_number += 1;
            sink.burst_complete(burst_number, size, completed);

            if let Some(limit) = duration_limit_secs {
                let elapsed = start_instant.elapsed().as_secs_f64();
                let percent = (elapsed / limit * 100.0).min(100.0);
                logger.log(&format!(
                    "Time elapsed: {} ({percent:.0}% complete, {completed} requests sent)",
                    format_duration(elapsed),
                ));
            }

            let final_burst = duration_limit_secs.is_none() && completed >= self.config.count;
            if !final_burst && self.config.delay > 0 {
                // uniform jitter in [0.5x, 1.5x] of the configured
                // delay, truncated to whole seconds
                let hundredths = rand::rng()
                    .random_range(self.config.delay * 50..=self.config.delay * 150);
                let secs = hundredths / 100;
                if secs > 0 {
                    tokio::time::sleep(Duration::from_secs(secs)).await;
                }
            }
        }

        debug!(phase = "reporting");
        let finished_at = chrono::Utc::now();
        let metrics = ExecutionMetrics::compute(started_at, finished_at, completed as usize);
        let summary = reporting.generate_summary();

        let performance_storage =
            LayeredBaselineStorage::new(&self.storage_dir, PERFORMANCE_NAMESPACE);
        let resource_storage = LayeredBaselineStorage::new(&self.storage_dir, RESOURCE_NAMESPACE);

        let memory_limit_mb = parse_memory_limit(self.config.memory_limit.as_deref());
        let threshold_display = self
            .config
            .use_thresholds
            .as_deref()
            .map(|profile| (&thresholds, profile));
        reporting.report(logger, &summary, threshold_display);

        if let Some(name) = &self.config.compare_baseline {
            match reporting.get_baseline(&performance_storage, name).await {
                Some(baseline) => {
                    let comparison = reporting.compare(&summary, &baseline);
                    reporting.report_comparison(logger, name, &comparison);
                }
                None => logger.warning(&format!("No saved baseline named '{name}'")),
            }
        }

        if self.config.collect_cache_headers {
            match analyzer.generate_report(completed as usize) {
                Some(report) => analyzer.report(logger, &report),
                None => logger.log("No cache headers observed"),
            }
        }

        let resource_summary = resource_monitor
            .as_ref()
            .and_then(|monitor| monitor.generate_summary());
        if let (Some(monitor), Some(resource_summary)) =
            (&resource_monitor, resource_summary.as_ref())
        {
            monitor.report(logger, resource_summary, threshold_display, memory_limit_mb);
            if let Some(trends) = monitor.analyze_trends() {
                monitor.report_trends(logger, &trends);
            }
            if let Some(name) = &self.config.compare_baseline {
                if let Some(baseline) = monitor.get_baseline(&resource_storage, name).await {
                    logger.log(&format!(
                        "  Memory vs baseline '{name}': avg {:+.1}% | max {:+.1}%",
                        pct_change(resource_summary.memory_mb.avg, baseline.memory_mb.avg),
                        pct_change(resource_summary.memory_mb.max, baseline.memory_mb.max),
                    ));
                }
            }
        }

        metrics.report(logger);

        if self.config.auto_thresholds && summary.count > 0 {
            thresholds.calibrate(
                &summary,
                resource_summary.as_ref(),
                memory_limit_mb,
                &self.config.threshold_profile,
            );
            if thresholds
                .persist(&threshold_storage, &self.config.threshold_profile)
                .await
            {
                logger.success(&format!(
                    "Calibrated threshold profile '{}' saved",
                    self.config.threshold_profile
                ));
            } else {
                logger.warning("Failed to save calibrated threshold profile");
            }
        }

        if let Some(name) = &self.config.save_baseline {
            if reporting
                .save_baseline(&performance_storage, name, &summary)
                .await
            {
                logger.success(&format!("Performance baseline '{name}' saved"));
            } else {
                logger.warning(&format!("Failed to save performance baseline '{name}'"));
            }
            if let (Some(monitor), Some(resource_summary)) =
                (&resource_monitor, resource_summary.as_ref())
            {
                if monitor
                    .save_baseline(&resource_storage, name, resource_summary)
                    .await
                {
                    logger.success(&format!("Resource baseline '{name}' saved"));
                }
            }
        }

        sink.metric("requests_per_second", metrics.requests_per_second);
        sink.metric("error_rate", summary.error_rate);
        sink.test_complete(&summary, &metrics);
        debug!(phase = "done");

        let run_by_duration = self.config.run_by_duration();
        Ok(RunOutcome {
            completed,
            run_by_duration,
            actual_minutes: run_by_duration
                .then(|| (start_instant.elapsed().as_secs_f64() / 60.0 * 100.0).round() / 100.0),
            summary,
        })
    }

    /// One URL per burst slot. Serial rotation keeps its index across
    /// bursts; random picks per slot with replacement.
    fn select_urls(
        &self,
        endpoints: &[Endpoint],
        size: u64,
        rotation_index: &mut usize,
    ) -> Vec<Url> {
        (0..size)
            .map(|_| match self.config.rotation_mode {
                RotationMode::Serial => {
                    let url = endpoints[*rotation_index % endpoints.len()].url.clone();
                    *rotation_index += 1;
                    url
                }
                RotationMode::Random => {
                    endpoints[rand::rng().random_range(0..endpoints.len())].url.clone()
                }
            })
            .collect()
    }

    /// Resolve the auth spec into a cookie jar, merging custom cookies.
    async fn establish_sessions(&self) -> EngineResult<Option<Cookies>> {
        let logger = self.logger.as_ref();
        let mut cookies = match (&self.config.auth, &self.session_provider) {
            (None, _) => None,
            (Some(_), None) => {
                logger.warning("Auth requested but no session provider configured; continuing unauthenticated");
                None
            }
            (Some(AuthSpec::Single(user)), Some(provider)) => {
                let set = provider.session_for(user).await?;
                logger.log(&format!("Authenticated as {user}"));
                Some(Cookies::Single(set))
            }
            (Some(AuthSpec::Multi(users)), Some(provider)) => {
                let mut sessions = Vec::new();
                for user in users {
                    match provider.session_for(user).await {
                        Ok(set) => sessions.push(set),
                        Err(e) => {
                            warn!(user, error = %e, "session setup failed");
                            logger.warning(&format!("Skipping user '{user}': {e}"));
                        }
                    }
                }
                if sessions.is_empty() {
                    logger.warning("No sessions established; continuing unauthenticated");
                    None
                } else {
                    logger.log(&format!("Established {} session(s)", sessions.len()));
                    Some(Cookies::MultiSession(sessions))
                }
            }
        };

        if !self.config.custom_cookies.is_empty() {
            cookies
                .get_or_insert_with(|| Cookies::Single(Vec::new()))
                .merge_custom(&self.config.custom_cookies);
        }
        Ok(cookies)
    }
}
