//! Cache behavior analysis from response headers

use crate::logger::Logger;
use crate::util::round_dp;
use serde::Serialize;
use std::collections::BTreeMap;

/// Headers worth tallying, lowercased. Covers the common page-cache
/// and CDN hit markers plus origin `age`.
pub const CACHE_HEADERS: [&str; 5] = ["x-ac", "x-nananana", "x-cache", "age", "x-cache-hits"];

/// header name -> observed value -> occurrence count
pub type CacheHeaderTally = BTreeMap<String, BTreeMap<String, u64>>;

#[derive(Debug, Clone, Serialize)]
pub struct HeaderValueStat {
    pub value: String,
    pub count: u64,
    /// Percent of this header's own total, one decimal.
    pub percent: f64,
}

#[derive(Debug, Clone, Serialize)]
pub struct HeaderReport {
    pub header: String,
    pub total: u64,
    pub values: Vec<HeaderValueStat>,
}

#[derive(Debug, Clone, Serialize)]
pub struct CacheReport {
    pub total_requests: usize,
    pub headers: Vec<HeaderReport>,
    /// Count-weighted average of numeric `age` values, when seen.
    pub average_age: Option<f64>,
}

/// Accumulates cache header counts across the whole run.
#[derive(Debug, Default)]
pub struct CacheAnalyzer {
    tally: CacheHeaderTally,
}

impl CacheAnalyzer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record one observed header. Unlisted headers are ignored.
    pub fn collect(&mut self, header: &str, value: &str) {
        let header = header.to_ascii_lowercase();
        if !CACHE_HEADERS.contains(&header.as_str()) {
            return;
        }
        *self
            .tally
            .entry(header)
            .or_default()
            .entry(value.to_string())
            .or_insert(0) += 1;
    }

    /// Merge a tally drained from the request generator.
    pub fn absorb(&mut self, tally: CacheHeaderTally) {
        for (header, values) in tally {
            let bucket = self.tally.entry(header).or_default();
            for (value, count) in values {
                *bucket.entry(value).or_insert(0) += count;
            }
        }
    }

    pub fn is_empty(&self) -> bool {
        self.tally.is_empty()
    }

    pub fn generate_report(&self, total_requests: usize) -> Option<CacheReport> {
        if self.tally.is_empty() {
            return None;
        }
        let headers: Vec<HeaderReport> = self
            .tally
            .iter()
            .map(|(header, values)| {
                let total: u64 = values.values().sum();
                let values = values
                    .iter()
                    .map(|(value, count)| HeaderValueStat {
                        value: value.clone(),
                        count: *count,
                        percent: round_dp(*count as f64 / total as f64 * 100.0, 1),
                    })
                    .collect();
                HeaderReport {
                    header: header.clone(),
                    total,
                    values,
                }
            })
            .collect();

        let average_age = self.tally.get("age").and_then(|values| {
            let mut weighted = 0.0;
            let mut count = 0u64;
            for (value, n) in values {
                if let Ok(age) = value.parse::<f64>() {
                    weighted += age * *n as f64;
                    count += n;
                }
            }
            (count > 0).then(|| round_dp(weighted / count as f64, 1))
        });

        Some(CacheReport {
            total_requests,
            headers,
            average_age,
        })
    }

    pub fn report(&self, logger: &dyn Logger, report: &CacheReport) {
        logger.log(&format!(
            "Cache Headers ({} requests):",
            report.total_requests
        ));
        for header in &report.headers {
            logger.log(&format!("  {}:", header.header));
            for stat in &header.values {
                logger.log(&format!(
                    "    {} = {} ({:.1}%)",
                    stat.value, stat.count, stat.percent
                ));
            }
        }
        if let Some(avg_age) = report.average_age {
            logger.log(&format!("  Average age: {avg_age:.1}s"));
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_unlisted_headers_ignored() {
        let mut analyzer = CacheAnalyzer::new();
        analyzer.collect("content-type", "text/html");
        analyzer.collect("x-powered-by", "php");
        assert!(analyzer.is_empty());
        assert!(analyzer.generate_report(2).is_none());
    }

    #[test]
    fn test_case_insensitive_capture_and_percentages() {
        let mut analyzer = CacheAnalyzer::new();
        analyzer.collect("X-Cache", "HIT");
        analyzer.collect("x-cache", "HIT");
        analyzer.collect("x-cache", "HIT");
        analyzer.collect("X-CACHE", "MISS");
        let report = analyzer.generate_report(4).unwrap();
        let x_cache = &report.headers[0];
        assert_eq!(x_cache.header, "x-cache");
        assert_eq!(x_cache.total, 4);
        let hit = x_cache.values.iter().find(|v| v.value == "HIT").unwrap();
        let miss = x_cache.values.iter().find(|v| v.value == "MISS").unwrap();
        assert_eq!(hit.percent, 75.0);
        assert_eq!(miss.percent, 25.0);
        assert_eq!(hit.percent + miss.percent, 100.0);
    }

    #[test]
    fn test_weighted_average_age() {
        let mut analyzer = CacheAnalyzer::new();
        analyzer.collect("age", "10");
        analyzer.collect("age", "10");
        analyzer.collect("age", "40");
        let report = analyzer.generate_report(3).unwrap();
        assert_eq!(report.average_age, Some(20.0));
    }

    #[test]
    fn test_absorb_merges_counts() {
        let mut analyzer = CacheAnalyzer::new();
        analyzer.collect("x-ac", "HIT");

        let mut drained: CacheHeaderTally = BTreeMap::new();
        drained
            .entry("x-ac".to_string())
            .or_default()
            .insert("HIT".to_string(), 4);
        analyzer.absorb(drained);

        let report = analyzer.generate_report(5).unwrap();
        assert_eq!(report.headers[0].values[0].count, 5);
    }
}
