//! Execution metrics and human formatting helpers

use crate::logger::Logger;
use crate::util::round_dp;
use chrono::{DateTime, Utc};
use serde::Serialize;

/// Wall-clock throughput figures for a finished run.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct ExecutionMetrics {
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
    pub completed: usize,
    pub duration_secs: f64,
    pub requests_per_second: f64,
    /// Extrapolated capacity figures, truncated to whole requests.
    pub per_hour: u64,
    pub per_day: u64,
    pub per_month: u64,
}

impl ExecutionMetrics {
    pub fn compute(started_at: DateTime<Utc>, finished_at: DateTime<Utc>, completed: usize) -> Self {
        let duration_secs = round_dp(
            (finished_at - started_at).num_milliseconds() as f64 / 1000.0,
            2,
        );
        let rps = if duration_secs > 0.0 {
            round_dp(completed as f64 / duration_secs, 2)
        } else {
            0.0
        };
        Self {
            started_at,
            finished_at,
            completed,
            duration_secs,
            requests_per_second: rps,
            per_hour: (rps * 3600.0) as u64,
            per_day: (rps * 86400.0) as u64,
            per_month: (rps * 2_592_000.0) as u64,
        }
    }

    pub fn human_duration(&self) -> String {
        format_duration(self.duration_secs)
    }

    pub fn report(&self, logger: &dyn Logger) {
        logger.log("Execution Metrics:");
        logger.log(&format!(
            "  Duration: {} | Throughput: {:.2} req/s",
            self.human_duration(),
            self.requests_per_second,
        ));
        logger.log(&format!(
            "  Approximate capacity: {}/hour, {}/day, {}/month",
            format_large_number(self.per_hour),
            format_large_number(self.per_day),
            format_large_number(self.per_month),
        ));
    }
}

/// "5m 15s" above a minute, "45s" below.
pub fn format_duration(secs: f64) -> String {
    let whole = secs as u64;
    if whole >= 60 {
        format!("{}m {}s", whole / 60, whole % 60)
    } else {
        format!("{whole}s")
    }
}

/// Compact K/M/B rendering with one decimal, trailing ".0" dropped.
pub fn format_large_number(n: u64) -> String {
    fn scaled(n: u64, divisor: f64, suffix: char) -> String {
        let value = (n as f64 / divisor * 10.0).round() / 10.0;
        let rendered = format!("{value:.1}");
        let rendered = rendered.strip_suffix(".0").unwrap_or(&rendered);
        format!("{rendered}{suffix}")
    }
    if n >= 1_000_000_000 {
        scaled(n, 1e9, 'B')
    } else if n >= 1_000_000 {
        scaled(n, 1e6, 'M')
    } else if n >= 1_000 {
        scaled(n, 1e3, 'K')
    } else {
        n.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeDelta;

    #[test]
    fn test_compute_throughput_and_capacity() {
        let start = Utc::now();
        let end = start + TimeDelta::seconds(20);
        let metrics = ExecutionMetrics::compute(start, end, 100);
        assert_eq!(metrics.duration_secs, 20.0);
        assert_eq!(metrics.requests_per_second, 5.0);
        assert_eq!(metrics.per_hour, 18_000);
        assert_eq!(metrics.per_day, 432_000);
        assert_eq!(metrics.per_month, 12_960_000);
    }

    #[test]
    fn test_zero_duration_yields_zero_throughput() {
        let now = Utc::now();
        let metrics = ExecutionMetrics::compute(now, now, 10);
        assert_eq!(metrics.requests_per_second, 0.0);
        assert_eq!(metrics.per_hour, 0);
    }

    #[test]
    fn test_format_duration() {
        assert_eq!(format_duration(45.0), "45s");
        assert_eq!(format_duration(315.0), "5m 15s");
        assert_eq!(format_duration(60.0), "1m 0s");
    }

    #[test]
    fn test_format_large_number() {
        assert_eq!(format_large_number(950), "950");
        assert_eq!(format_large_number(1_500), "1.5K");
        assert_eq!(format_large_number(1_000_000), "1M");
        assert_eq!(format_large_number(12_960_000), "13M");
        assert_eq!(format_large_number(2_500_000_000), "2.5B");
    }
}
