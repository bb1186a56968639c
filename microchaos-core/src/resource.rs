//! Process resource monitoring and trend analysis
//!
//! Samples the test process itself (current RSS via sysinfo, peak RSS
//! and CPU time via getrusage) once per burst, summarizes the series
//! and, with enough samples, fits a least-squares slope and names the
//! growth pattern.

use crate::logger::Logger;
use crate::thresholds::{MetricKind, ThresholdEngine};
use crate::util::{lower_median, round_dp};
use microchaos_storage::BaselineStorage;
use nix::sys::resource::{getrusage, UsageWho};
use serde::{Deserialize, Serialize};
use std::time::Instant;
use sysinfo::{Pid, ProcessesToUpdate, System};
use tracing::debug;

/// Point-in-time resource reading.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ResourceSample {
    pub timestamp: i64,
    /// Seconds since monitoring started.
    pub elapsed: f64,
    pub memory_mb: f64,
    pub peak_memory_mb: f64,
    pub user_time: f64,
    pub system_time: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct MetricStats {
    pub avg: f64,
    pub median: f64,
    pub min: f64,
    pub max: f64,
}

impl MetricStats {
    fn from_values(values: &[f64]) -> Self {
        let mut sorted = values.to_vec();
        sorted.sort_by(|a, b| a.total_cmp(b));
        Self {
            avg: round_dp(sorted.iter().sum::<f64>() / sorted.len() as f64, 2),
            median: lower_median(&sorted),
            min: sorted[0],
            max: sorted[sorted.len() - 1],
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ResourceSummary {
    pub samples: usize,
    pub memory_mb: MetricStats,
    pub peak_memory_mb: MetricStats,
    pub user_time: MetricStats,
    pub system_time: MetricStats,
}

/// Shape of a metric over the run, from 4-segment averaging.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GrowthPattern {
    ContinuousGrowth,
    ModerateGrowth,
    Stabilizing,
    Fluctuating,
    InsufficientData,
}

impl GrowthPattern {
    pub fn label(&self) -> &'static str {
        match self {
            GrowthPattern::ContinuousGrowth => "continuous growth",
            GrowthPattern::ModerateGrowth => "moderate growth",
            GrowthPattern::Stabilizing => "stabilizing",
            GrowthPattern::Fluctuating => "fluctuating",
            GrowthPattern::InsufficientData => "insufficient data",
        }
    }

    /// Continuous growth across a whole run reads as a potential leak.
    pub fn is_potential_leak(&self) -> bool {
        matches!(self, GrowthPattern::ContinuousGrowth)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct MetricTrend {
    /// Least-squares slope in metric units per second.
    pub slope_per_second: f64,
    pub pattern: GrowthPattern,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TrendReport {
    pub samples: usize,
    pub memory: MetricTrend,
    pub peak_memory: MetricTrend,
    pub user_time: MetricTrend,
}

/// Ordinary least squares slope over (x, y) pairs.
fn ols_slope(points: &[(f64, f64)]) -> f64 {
    let n = points.len() as f64;
    let sum_x: f64 = points.iter().map(|(x, _)| x).sum();
    let sum_y: f64 = points.iter().map(|(_, y)| y).sum();
    let sum_xy: f64 = points.iter().map(|(x, y)| x * y).sum();
    let sum_xx: f64 = points.iter().map(|(x, _)| x * x).sum();
    let denominator = n * sum_xx - sum_x * sum_x;
    if denominator == 0.0 {
        return 0.0;
    }
    (n * sum_xy - sum_x * sum_y) / denominator
}

/// Segment-average growth classification. Needs 5+ points for a
/// meaningful shape.
fn classify_growth(values: &[f64]) -> GrowthPattern {
    if values.len() < 5 {
        return GrowthPattern::InsufficientData;
    }
    let chunk = values.len().div_ceil(4);
    let segment_avgs: Vec<f64> = values
        .chunks(chunk)
        .map(|seg| seg.iter().sum::<f64>() / seg.len() as f64)
        .collect();

    let increasing = segment_avgs.windows(2).all(|w| w[1] > w[0]);
    let first = segment_avgs[0];
    let last = segment_avgs[segment_avgs.len() - 1];

    if increasing {
        let total_increase = if first > 0.0 {
            (last - first) / first * 100.0
        } else {
            0.0
        };
        if total_increase > 50.0 {
            GrowthPattern::ContinuousGrowth
        } else {
            GrowthPattern::ModerateGrowth
        }
    } else {
        let prev = segment_avgs[segment_avgs.len() - 2];
        let settled = prev != 0.0 && ((last - prev) / prev * 100.0).abs() < 5.0;
        if settled {
            GrowthPattern::Stabilizing
        } else {
            GrowthPattern::Fluctuating
        }
    }
}

/// Samples and analyzes the current process's resource usage.
pub struct ResourceMonitor {
    samples: Vec<ResourceSample>,
    track_trends: bool,
    started: Instant,
    system: System,
    pid: Option<Pid>,
}

impl ResourceMonitor {
    pub fn new(track_trends: bool) -> Self {
        Self {
            samples: Vec::new(),
            track_trends,
            started: Instant::now(),
            system: System::new(),
            pid: sysinfo::get_current_pid().ok(),
        }
    }

    pub fn samples(&self) -> &[ResourceSample] {
        &self.samples
    }

    fn current_rss_mb(&mut self) -> f64 {
        let Some(pid) = self.pid else { return 0.0 };
        self.system
            .refresh_processes(ProcessesToUpdate::Some(&[pid]), true);
        match self.system.process(pid) {
            Some(process) => round_dp(process.memory() as f64 / (1024.0 * 1024.0), 2),
            None => 0.0,
        }
    }

    /// Take one reading and append it to the series.
    pub fn sample(&mut self) -> ResourceSample {
        let memory_mb = self.current_rss_mb();
        let (peak_memory_mb, user_time, system_time) = match getrusage(UsageWho::RUSAGE_SELF) {
            Ok(usage) => {
                // ru_maxrss is kilobytes on Linux
                let peak = round_dp(usage.max_rss() as f64 / 1024.0, 2);
                let user = usage.user_time();
                let system = usage.system_time();
                (
                    peak,
                    round_dp(user.tv_sec() as f64 + user.tv_usec() as f64 / 1e6, 2),
                    round_dp(system.tv_sec() as f64 + system.tv_usec() as f64 / 1e6, 2),
                )
            }
            Err(_) => (0.0, 0.0, 0.0),
        };
        let sample = ResourceSample {
            timestamp: chrono::Utc::now().timestamp(),
            elapsed: round_dp(self.started.elapsed().as_secs_f64(), 2),
            memory_mb,
            peak_memory_mb,
            user_time,
            system_time,
        };
        debug!(?sample, "resource sample");
        self.samples.push(sample);
        sample
    }

    #[cfg(test)]
    pub(crate) fn push_sample(&mut self, sample: ResourceSample) {
        self.samples.push(sample);
    }

    pub fn generate_summary(&self) -> Option<ResourceSummary> {
        if self.samples.is_empty() {
            return None;
        }
        let collect = |f: fn(&ResourceSample) -> f64| -> Vec<f64> {
            self.samples.iter().map(f).collect()
        };
        Some(ResourceSummary {
            samples: self.samples.len(),
            memory_mb: MetricStats::from_values(&collect(|s| s.memory_mb)),
            peak_memory_mb: MetricStats::from_values(&collect(|s| s.peak_memory_mb)),
            user_time: MetricStats::from_values(&collect(|s| s.user_time)),
            system_time: MetricStats::from_values(&collect(|s| s.system_time)),
        })
    }

    /// Trend analysis over the sampled series. `None` unless trend
    /// tracking was enabled and at least 3 samples exist.
    pub fn analyze_trends(&self) -> Option<TrendReport> {
        if !self.track_trends || self.samples.len() < 3 {
            return None;
        }
        let mut ordered = self.samples.clone();
        ordered.sort_by(|a, b| a.elapsed.total_cmp(&b.elapsed));

        let trend = |f: fn(&ResourceSample) -> f64| -> MetricTrend {
            let points: Vec<(f64, f64)> = ordered.iter().map(|s| (s.elapsed, f(s))).collect();
            let values: Vec<f64> = points.iter().map(|(_, y)| *y).collect();
            MetricTrend {
                slope_per_second: round_dp(ols_slope(&points), 4),
                pattern: classify_growth(&values),
            }
        };
        Some(TrendReport {
            samples: ordered.len(),
            memory: trend(|s| s.memory_mb),
            peak_memory: trend(|s| s.peak_memory_mb),
            user_time: trend(|s| s.user_time),
        })
    }

    /// Render the summary through the logger, classifying average
    /// memory (as a percentage of `memory_limit_mb`) against a
    /// threshold profile when one is in use.
    pub fn report(
        &self,
        logger: &dyn Logger,
        summary: &ResourceSummary,
        thresholds: Option<(&ThresholdEngine, &str)>,
        memory_limit_mb: f64,
    ) {
        logger.log(&format!("Resource Usage ({} samples):", summary.samples));
        let memory_tag = match thresholds {
            Some((engine, profile)) if memory_limit_mb > 0.0 => {
                let percent = summary.memory_mb.avg / memory_limit_mb * 100.0;
                format!(
                    " ({})",
                    engine
                        .classify(percent, MetricKind::MemoryUsage, profile)
                        .label()
                )
            }
            _ => String::new(),
        };
        logger.log(&format!(
            "  Memory: avg {:.2} MB | median {:.2} MB | min {:.2} MB | max {:.2} MB{memory_tag}",
            summary.memory_mb.avg,
            summary.memory_mb.median,
            summary.memory_mb.min,
            summary.memory_mb.max,
        ));
        logger.log(&format!(
            "  Peak memory: avg {:.2} MB | max {:.2} MB",
            summary.peak_memory_mb.avg, summary.peak_memory_mb.max,
        ));
        logger.log(&format!(
            "  CPU time: user avg {:.2}s max {:.2}s | system avg {:.2}s max {:.2}s",
            summary.user_time.avg,
            summary.user_time.max,
            summary.system_time.avg,
            summary.system_time.max,
        ));
    }

    pub fn report_trends(&self, logger: &dyn Logger, trends: &TrendReport) {
        logger.log(&format!(
            "Resource Trends ({} samples):",
            trends.samples
        ));
        logger.log(&format!(
            "  Memory: {:+.4} MB/s ({})",
            trends.memory.slope_per_second,
            trends.memory.pattern.label(),
        ));
        logger.log(&format!(
            "  Peak memory: {:+.4} MB/s ({})",
            trends.peak_memory.slope_per_second,
            trends.peak_memory.pattern.label(),
        ));
        logger.log(&format!(
            "  User CPU: {:+.4} s/s ({})",
            trends.user_time.slope_per_second,
            trends.user_time.pattern.label(),
        ));
        if trends.memory.pattern.is_potential_leak() {
            logger.warning("Memory grew continuously across the run; potential leak");
        }
    }

    pub async fn save_baseline(
        &self,
        storage: &dyn BaselineStorage,
        name: &str,
        summary: &ResourceSummary,
    ) -> bool {
        match serde_json::to_value(summary) {
            Ok(value) => storage.save(name, &value, None).await,
            Err(_) => false,
        }
    }

    pub async fn get_baseline(
        &self,
        storage: &dyn BaselineStorage,
        name: &str,
    ) -> Option<ResourceSummary> {
        let value = storage.get(name).await?;
        serde_json::from_value(value).ok()
    }
}
