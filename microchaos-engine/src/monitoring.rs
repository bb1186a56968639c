//! Monitoring integration
//!
//! Emits machine-parseable event lines so an external collector can
//! follow a run from logs alone. Lines are fire-and-forget; nothing in
//! the run depends on anyone consuming them.

use microchaos_core::{ExecutionMetrics, RequestResult, ResourceSample, Summary};
use serde_json::{json, Value as JsonValue};
use tracing::info;
use uuid::Uuid;

/// Line prefix collectors grep for.
pub const MONITORING_LOG_PREFIX: &str = "MICROCHAOS_METRICS";

/// Serializes run events as `MICROCHAOS_METRICS|<event>|<json>` lines.
pub struct MonitoringSink {
    enabled: bool,
    test_id: String,
}

impl MonitoringSink {
    pub fn new(enabled: bool, explicit_id: Option<String>) -> Self {
        let test_id =
            explicit_id.unwrap_or_else(|| format!("mc_{}", Uuid::new_v4().simple()));
        Self { enabled, test_id }
    }

    pub fn test_id(&self) -> &str {
        &self.test_id
    }

    fn emit(&self, event: &str, mut data: JsonValue) {
        if !self.enabled {
            return;
        }
        if let Some(object) = data.as_object_mut() {
            object.insert("test_id".to_string(), json!(self.test_id));
            object.insert(
                "timestamp".to_string(),
                json!(chrono::Utc::now().timestamp()),
            );
        }
        info!(target: "microchaos::monitoring", "{MONITORING_LOG_PREFIX}|{event}|{data}");
    }

    pub fn test_start(&self, config_summary: JsonValue) {
        self.emit("test_start", config_summary);
    }

    pub fn request(&self, result: &RequestResult) {
        self.emit(
            "request",
            json!({
                "time": result.time,
                "code": result.code,
                "payload_errors": result.payload_errors,
                "url": result.url,
            }),
        );
    }

    pub fn resource_snapshot(&self, sample: &ResourceSample) {
        self.emit(
            "resource_snapshot",
            serde_json::to_value(sample).unwrap_or_else(|_| json!({})),
        );
    }

    pub fn burst_complete(&self, burst_number: u64, requests: u64, completed: u64) {
        self.emit(
            "burst_complete",
            json!({
                "burst": burst_number,
                "requests": requests,
                "completed": completed,
            }),
        );
    }

    pub fn test_complete(&self, summary: &Summary, metrics: &ExecutionMetrics) {
        self.emit(
            "test_complete",
            json!({
                "summary": summary,
                "metrics": metrics,
            }),
        );
    }

    pub fn metric(&self, name: &str, value: f64) {
        self.emit("metric", json!({ "name": name, "value": value }));
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_generated_id_has_prefix() {
        let sink = MonitoringSink::new(true, None);
        assert!(sink.test_id().starts_with("mc_"));
        assert!(sink.test_id().len() > 3);
    }

    #[test]
    fn test_explicit_id_preserved() {
        let sink = MonitoringSink::new(true, Some("nightly-42".to_string()));
        assert_eq!(sink.test_id(), "nightly-42");
    }
}
