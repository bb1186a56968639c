//! Reporting engine: summaries, baselines, export
//!
//! Collects [`RequestResult`]s in arrival order and turns them into a
//! run summary, a baseline comparison, or a JSON/CSV export file.

use crate::error::{CoreError, CoreResult};
use crate::logger::Logger;
use crate::result::RequestResult;
use crate::thresholds::{MetricKind, ThresholdEngine};
use crate::util::{lower_median, round_dp};
use microchaos_storage::BaselineStorage;
use serde::{Deserialize, Serialize};
use serde_json::json;
use std::path::{Path, PathBuf};
use tracing::debug;

/// Aggregate view of a finished (or in-flight) run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Summary {
    pub count: usize,
    /// HTTP 200 responses with a clean payload.
    pub success: usize,
    /// Responses with a status other than 200, transport failures included.
    pub http_errors: usize,
    /// Total protocol-level errors across all response bodies.
    pub payload_errors: u64,
    /// Requests whose body carried at least one protocol-level error.
    pub requests_with_payload_errors: usize,
    /// Percent of requests that failed at either level, one decimal.
    pub error_rate: f64,
    pub avg_time: f64,
    pub median_time: f64,
    pub min_time: f64,
    pub max_time: f64,
}

impl Summary {
    pub fn empty() -> Self {
        Self {
            count: 0,
            success: 0,
            http_errors: 0,
            payload_errors: 0,
            requests_with_payload_errors: 0,
            error_rate: 0.0,
            avg_time: 0.0,
            median_time: 0.0,
            min_time: 0.0,
            max_time: 0.0,
        }
    }
}

/// Percent deltas against a saved baseline. Lower is better for timing.
#[derive(Debug, Clone, PartialEq)]
pub struct BaselineComparison {
    pub avg_change_pct: f64,
    pub median_change_pct: f64,
    pub error_rate_change_pct: f64,
}

/// Percent change of `current` against `baseline`; zero baseline yields 0.
pub fn pct_change(current: f64, baseline: f64) -> f64 {
    if baseline == 0.0 {
        return 0.0;
    }
    round_dp((current - baseline) / baseline * 100.0, 1)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExportFormat {
    Json,
    Csv,
}

/// Append-only collector and analyzer for request results.
#[derive(Debug, Default)]
pub struct ReportingEngine {
    results: Vec<RequestResult>,
}

impl ReportingEngine {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_result(&mut self, result: RequestResult) {
        self.results.push(result);
    }

    pub fn add_results(&mut self, results: impl IntoIterator<Item = RequestResult>) {
        self.results.extend(results);
    }

    pub fn results(&self) -> &[RequestResult] {
        &self.results
    }

    pub fn count(&self) -> usize {
        self.results.len()
    }

    pub fn generate_summary(&self) -> Summary {
        if self.results.is_empty() {
            return Summary::empty();
        }
        let count = self.results.len();
        let success = self.results.iter().filter(|r| r.is_success()).count();
        let http_errors = self
            .results
            .iter()
            .filter(|r| !r.code.is_http_success())
            .count();
        let payload_errors: u64 = self.results.iter().map(|r| u64::from(r.payload_errors)).sum();
        let requests_with_payload_errors =
            self.results.iter().filter(|r| r.payload_errors > 0).count();

        let mut times: Vec<f64> = self.results.iter().map(|r| r.time).collect();
        times.sort_by(|a, b| a.total_cmp(b));

        let error_rate = round_dp(
            (http_errors + requests_with_payload_errors) as f64 / count as f64 * 100.0,
            1,
        );

        Summary {
            count,
            success,
            http_errors,
            payload_errors,
            requests_with_payload_errors,
            error_rate,
            avg_time: round_dp(times.iter().sum::<f64>() / count as f64, 4),
            median_time: lower_median(&times),
            min_time: times[0],
            max_time: times[count - 1],
        }
    }

    /// Render the summary through the logger, classifying timing and
    /// error rate against a threshold profile when one is in use.
    pub fn report(
        &self,
        logger: &dyn Logger,
        summary: &Summary,
        thresholds: Option<(&ThresholdEngine, &str)>,
    ) {
        logger.log("Load Test Summary:");
        logger.log(&format!(
            "  Requests: {} | Success: {} | HTTP errors: {} | Payload errors: {} (in {} requests)",
            summary.count,
            summary.success,
            summary.http_errors,
            summary.payload_errors,
            summary.requests_with_payload_errors,
        ));
        let (error_tag, avg_tag) = match thresholds {
            Some((engine, profile)) => (
                format!(
                    " ({})",
                    engine
                        .classify(summary.error_rate, MetricKind::ErrorRate, profile)
                        .label()
                ),
                format!(
                    " ({})",
                    engine
                        .classify(summary.avg_time, MetricKind::ResponseTime, profile)
                        .label()
                ),
            ),
            None => (String::new(), String::new()),
        };
        logger.log(&format!("  Error rate: {:.1}%{error_tag}", summary.error_rate));
        logger.log(&format!(
            "  Avg time: {:.4}s{avg_tag} | Median: {:.4}s | Min: {:.4}s | Max: {:.4}s",
            summary.avg_time, summary.median_time, summary.min_time, summary.max_time,
        ));
    }

    pub fn compare(&self, current: &Summary, baseline: &Summary) -> BaselineComparison {
        BaselineComparison {
            avg_change_pct: pct_change(current.avg_time, baseline.avg_time),
            median_change_pct: pct_change(current.median_time, baseline.median_time),
            error_rate_change_pct: pct_change(current.error_rate, baseline.error_rate),
        }
    }

    /// Render a baseline comparison with directional indicators.
    pub fn report_comparison(
        &self,
        logger: &dyn Logger,
        name: &str,
        comparison: &BaselineComparison,
    ) {
        fn arrow(change: f64) -> &'static str {
            // timing and error rate are lower-is-better
            if change > 0.0 {
                "↑"
            } else if change < 0.0 {
                "↓"
            } else {
                "="
            }
        }
        logger.log(&format!("Comparison against baseline '{name}':"));
        logger.log(&format!(
            "  Avg time: {} {:+.1}% | Median: {} {:+.1}% | Error rate: {} {:+.1}%",
            arrow(comparison.avg_change_pct),
            comparison.avg_change_pct,
            arrow(comparison.median_change_pct),
            comparison.median_change_pct,
            arrow(comparison.error_rate_change_pct),
            comparison.error_rate_change_pct,
        ));
    }

    pub async fn save_baseline(
        &self,
        storage: &dyn BaselineStorage,
        name: &str,
        summary: &Summary,
    ) -> bool {
        match serde_json::to_value(summary) {
            Ok(value) => storage.save(name, &value, None).await,
            Err(_) => false,
        }
    }

    pub async fn get_baseline(&self, storage: &dyn BaselineStorage, name: &str) -> Option<Summary> {
        let value = storage.get(name).await?;
        serde_json::from_value(value).ok()
    }

    /// Write the collected results to `path`. Export failure is soft at
    /// the orchestration layer; this returns the error for the caller
    /// to log.
    pub fn export(&self, format: ExportFormat, path: &Path) -> CoreResult<PathBuf> {
        let body = match format {
            ExportFormat::Json => serde_json::to_string_pretty(&json!({
                "summary": self.generate_summary(),
                "results": self.results,
            }))?,
            ExportFormat::Csv => {
                let mut out = String::from("\"Time (s)\",\"Status Code\"\n");
                for result in &self.results {
                    out.push_str(&format!("{},{}\n", result.time, result.code.code_str()));
                }
                out
            }
        };
        std::fs::write(path, body).map_err(|source| CoreError::ExportWrite {
            path: path.to_path_buf(),
            source,
        })?;
        debug!(path = %path.display(), "exported results");
        Ok(path.to_path_buf())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::result::StatusOutcome;

    fn result(time: f64, code: StatusOutcome, payload_errors: u32) -> RequestResult {
        RequestResult::new(time, code, payload_errors, "http://localhost/")
    }

    #[test]
    fn test_empty_summary_is_all_zero() {
        let engine = ReportingEngine::new();
        assert_eq!(engine.generate_summary(), Summary::empty());
    }

    #[test]
    fn test_summary_counts_and_error_rate() {
        let mut engine = ReportingEngine::new();
        engine.add_results([
            result(0.2, StatusOutcome::Http(200), 0),
            result(0.4, StatusOutcome::Http(200), 3),
            result(0.6, StatusOutcome::Http(500), 0),
            result(0.8, StatusOutcome::TransportError, 0),
        ]);
        let summary = engine.generate_summary();
        assert_eq!(summary.count, 4);
        assert_eq!(summary.success, 1);
        assert_eq!(summary.http_errors, 2);
        assert_eq!(summary.payload_errors, 3);
        assert_eq!(summary.requests_with_payload_errors, 1);
        // (2 http + 1 payload-carrying) / 4 * 100
        assert_eq!(summary.error_rate, 75.0);
    }

    #[test]
    fn test_median_uses_lower_middle() {
        let mut engine = ReportingEngine::new();
        engine.add_results([
            result(0.4, StatusOutcome::Http(200), 0),
            result(0.1, StatusOutcome::Http(200), 0),
            result(0.3, StatusOutcome::Http(200), 0),
            result(0.2, StatusOutcome::Http(200), 0),
        ]);
        let summary = engine.generate_summary();
        assert_eq!(summary.median_time, 0.3);
        assert_eq!(summary.min_time, 0.1);
        assert_eq!(summary.max_time, 0.4);
        assert_eq!(summary.avg_time, 0.25);
    }

    #[test]
    fn test_pct_change_zero_baseline_guard() {
        assert_eq!(pct_change(0.5, 0.0), 0.0);
        assert_eq!(pct_change(0.6, 0.4), 50.0);
        assert_eq!(pct_change(0.3, 0.4), -25.0);
    }

    #[test]
    fn test_csv_export_two_columns() {
        let mut engine = ReportingEngine::new();
        engine.add_results([
            result(0.25, StatusOutcome::Http(200), 0),
            result(0.5, StatusOutcome::TransportError, 0),
        ]);
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("results.csv");
        engine.export(ExportFormat::Csv, &path).unwrap();
        let body = std::fs::read_to_string(&path).unwrap();
        assert_eq!(
            body,
            "\"Time (s)\",\"Status Code\"\n0.25,200\n0.5,ERROR\n"
        );
    }

    #[test]
    fn test_json_export_contains_summary_and_results() {
        let mut engine = ReportingEngine::new();
        engine.add_result(result(0.25, StatusOutcome::Http(200), 0));
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("results.json");
        engine.export(ExportFormat::Json, &path).unwrap();
        let body: serde_json::Value =
            serde_json::from_str(&std::fs::read_to_string(&path).unwrap()).unwrap();
        assert_eq!(body["summary"]["count"], 1);
        assert_eq!(body["results"][0]["code"], 200);
    }

    #[test]
    fn test_export_unwritable_path_is_err_not_panic() {
        let engine = ReportingEngine::new();
        let err = engine.export(
            ExportFormat::Json,
            Path::new("/nonexistent-dir/results.json"),
        );
        assert!(err.is_err());
    }

    #[tokio::test]
    async fn test_baseline_roundtrip_through_storage() {
        let dir = tempfile::tempdir().unwrap();
        let storage =
            microchaos_storage::LayeredBaselineStorage::new(dir.path(), "microchaos_baseline");
        let mut engine = ReportingEngine::new();
        engine.add_result(result(0.25, StatusOutcome::Http(200), 0));
        let summary = engine.generate_summary();
        assert!(engine.save_baseline(&storage, "release", &summary).await);
        let loaded = engine.get_baseline(&storage, "release").await.unwrap();
        assert_eq!(loaded, summary);
    }
}
