//! Per-request outcome record

use crate::util::round_dp;
use serde::ser::Serializer;
use serde::Serialize;

/// What came back for a single request.
///
/// Transport failures (DNS, connect, timeout) are a sentinel rather
/// than an error: a refused connection is a data point in a load test,
/// not a reason to stop one.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StatusOutcome {
    Http(u16),
    TransportError,
}

impl StatusOutcome {
    pub fn is_http_success(&self) -> bool {
        matches!(self, StatusOutcome::Http(200))
    }

    /// Display form used in echo lines and CSV export.
    pub fn code_str(&self) -> String {
        match self {
            StatusOutcome::Http(code) => code.to_string(),
            StatusOutcome::TransportError => "ERROR".to_string(),
        }
    }
}

impl Serialize for StatusOutcome {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            StatusOutcome::Http(code) => serializer.serialize_u16(*code),
            StatusOutcome::TransportError => serializer.serialize_str("ERROR"),
        }
    }
}

/// One fired request. Immutable once constructed.
#[derive(Debug, Clone, Serialize)]
pub struct RequestResult {
    /// Elapsed seconds from this request's own dispatch point.
    pub time: f64,
    pub code: StatusOutcome,
    /// Protocol-level errors reported inside a successful response body.
    pub payload_errors: u32,
    pub url: String,
}

impl RequestResult {
    pub fn new(elapsed_secs: f64, code: StatusOutcome, payload_errors: u32, url: impl Into<String>) -> Self {
        Self {
            time: round_dp(elapsed_secs, 4),
            code,
            payload_errors,
            url: url.into(),
        }
    }

    /// Success means HTTP 200 with a clean payload.
    pub fn is_success(&self) -> bool {
        self.code.is_http_success() && self.payload_errors == 0
    }
}
