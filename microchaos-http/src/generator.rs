//! The request generator
//!
//! Owns one `reqwest::Client` for the whole run so bursts share
//! connections. Every outcome, transport failures included, comes back
//! as a [`RequestResult`]; the generator never fails a burst.

use crate::cookies::Cookies;
use crate::error::{HttpError, HttpResult};
use futures::future::join_all;
use microchaos_config::HttpMethod;
use microchaos_core::cache::{CacheHeaderTally, CACHE_HEADERS};
use microchaos_core::{Logger, RequestResult, StatusOutcome};
use parking_lot::Mutex;
use rand::prelude::IndexedRandom;
use std::io::Write;
use std::path::PathBuf;
use std::time::{Duration, Instant};
use tracing::{debug, warn};
use url::Url;

const REQUEST_TIMEOUT: Duration = Duration::from_secs(10);

/// Rotated per request so cache layers see varied clients.
const USER_AGENTS: [&str; 5] = [
    "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/124.0.0.0 Safari/537.36",
    "Mozilla/5.0 (Macintosh; Intel Mac OS X 10_15_7) AppleWebKit/605.1.15 (KHTML, like Gecko) Version/17.4 Safari/605.1.15",
    "Mozilla/5.0 (X11; Linux x86_64; rv:125.0) Gecko/20100101 Firefox/125.0",
    "Mozilla/5.0 (iPhone; CPU iPhone OS 17_4 like Mac OS X) AppleWebKit/605.1.15 (KHTML, like Gecko) Mobile/15E148",
    "Mozilla/5.0 (Linux; Android 14; Pixel 8) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/124.0.0.0 Mobile Safari/537.36",
];

/// Everything the generator needs beyond the URL of each request.
#[derive(Debug, Default)]
pub struct GeneratorConfig {
    pub method: HttpMethod,
    /// Resolved body string; file sources are read before this point.
    pub body: Option<String>,
    pub custom_headers: Vec<(String, String)>,
    /// Fixed User-Agent; None rotates through the built-in pool.
    pub user_agent: Option<String>,
    pub cookies: Option<Cookies>,
    pub collect_cache_headers: bool,
    /// Append one line per request to this file.
    pub log_path: Option<PathBuf>,
}

pub struct RequestGenerator {
    client: reqwest::Client,
    config: GeneratorConfig,
    cache_tally: Mutex<CacheHeaderTally>,
    last_cache_headers: Mutex<Vec<(String, String)>>,
}

fn to_reqwest_method(method: HttpMethod) -> reqwest::Method {
    match method {
        HttpMethod::Get => reqwest::Method::GET,
        HttpMethod::Post => reqwest::Method::POST,
        HttpMethod::Put => reqwest::Method::PUT,
        HttpMethod::Patch => reqwest::Method::PATCH,
        HttpMethod::Delete => reqwest::Method::DELETE,
        HttpMethod::Head => reqwest::Method::HEAD,
        HttpMethod::Options => reqwest::Method::OPTIONS,
    }
}

fn method_takes_body(method: HttpMethod) -> bool {
    matches!(
        method,
        HttpMethod::Post | HttpMethod::Put | HttpMethod::Patch
    )
}

/// Protocol-level errors inside a successful response: a JSON body with
/// a top-level `errors` array counts each entry.
fn count_payload_errors(body: &str) -> u32 {
    serde_json::from_str::<serde_json::Value>(body)
        .ok()
        .and_then(|v| v.get("errors").and_then(|e| e.as_array().map(|a| a.len() as u32)))
        .unwrap_or(0)
}

impl RequestGenerator {
    pub fn new(config: GeneratorConfig) -> HttpResult<Self> {
        let client = reqwest::Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .build()
            .map_err(HttpError::ClientBuild)?;
        Ok(Self {
            client,
            config,
            cache_tally: Mutex::new(CacheHeaderTally::new()),
            last_cache_headers: Mutex::new(Vec::new()),
        })
    }

    /// Fire one request and time it from this call's own dispatch
    /// point. Transport failures come back as the `ERROR` sentinel.
    pub async fn fire_request(&self, url: &Url, logger: &dyn Logger) -> RequestResult {
        let started = Instant::now();
        let mut request = self
            .client
            .request(to_reqwest_method(self.config.method), url.clone());

        match &self.config.user_agent {
            Some(agent) => request = request.header(reqwest::header::USER_AGENT, agent),
            None => {
                if let Some(agent) = USER_AGENTS.choose(&mut rand::rng()) {
                    request = request.header(reqwest::header::USER_AGENT, *agent);
                }
            }
        }
        for (name, value) in &self.config.custom_headers {
            request = request.header(name, value);
        }
        if let Some(cookies) = &self.config.cookies {
            let set = cookies.select();
            if !set.is_empty() {
                request = request.header(reqwest::header::COOKIE, Cookies::header_value(set));
            }
        }
        if let Some(body) = &self.config.body {
            if method_takes_body(self.config.method) {
                if serde_json::from_str::<serde_json::Value>(body).is_ok() {
                    request = request.header(reqwest::header::CONTENT_TYPE, "application/json");
                }
                request = request.body(body.clone());
            }
        }

        match request.send().await {
            Ok(response) => {
                let status = response.status().as_u16();
                let captured = self.capture_cache_headers(&response);
                let payload_errors = if status == 200 {
                    match response.text().await {
                        Ok(body) => count_payload_errors(&body),
                        Err(_) => 0,
                    }
                } else {
                    0
                };
                let result =
                    RequestResult::new(started.elapsed().as_secs_f64(), StatusOutcome::Http(status), payload_errors, url.as_str());
                self.echo(logger, &result, &captured);
                result
            }
            Err(e) => {
                debug!(url = %url, error = %e, "transport failure");
                let result = RequestResult::new(
                    started.elapsed().as_secs_f64(),
                    StatusOutcome::TransportError,
                    0,
                    url.as_str(),
                );
                self.echo(logger, &result, &[]);
                result
            }
        }
    }

    /// Fire one burst fully concurrently over the shared client, one
    /// request per URL slot. Each request times itself from its own
    /// dispatch point, so per-request figures include fan-out stagger.
    pub async fn fire_batch(&self, urls: &[Url], logger: &dyn Logger) -> Vec<RequestResult> {
        join_all(urls.iter().map(|url| self.fire_request(url, logger))).await
    }

    fn capture_cache_headers(&self, response: &reqwest::Response) -> Vec<(String, String)> {
        if !self.config.collect_cache_headers {
            return Vec::new();
        }
        let mut captured = Vec::new();
        for name in CACHE_HEADERS {
            if let Some(value) = response.headers().get(name) {
                if let Ok(value) = value.to_str() {
                    captured.push((name.to_string(), value.to_string()));
                }
            }
        }
        if !captured.is_empty() {
            let mut tally = self.cache_tally.lock();
            for (name, value) in &captured {
                *tally
                    .entry(name.clone())
                    .or_default()
                    .entry(value.clone())
                    .or_insert(0) += 1;
            }
            *self.last_cache_headers.lock() = captured.clone();
        }
        captured
    }

    fn echo(&self, logger: &dyn Logger, result: &RequestResult, cache_headers: &[(String, String)]) {
        let suffix = if cache_headers.is_empty() {
            String::new()
        } else {
            let rendered: Vec<String> = cache_headers
                .iter()
                .map(|(name, value)| format!("{name}: {value}"))
                .collect();
            format!(" [{}]", rendered.join(", "))
        };
        let line = format!("-> {} in {:.2}s{}", result.code.code_str(), result.time, suffix);
        logger.log(&line);
        if let Some(path) = &self.config.log_path {
            let appended = std::fs::OpenOptions::new()
                .create(true)
                .append(true)
                .open(path)
                .and_then(|mut file| writeln!(file, "{line}"));
            if let Err(e) = appended {
                warn!(path = %path.display(), error = %e, "failed to append request log");
            }
        }
    }

    /// Take the accumulated cache header tally, leaving it empty.
    pub fn drain_cache_tally(&self) -> CacheHeaderTally {
        std::mem::take(&mut self.cache_tally.lock())
    }

    /// Cache headers observed on the most recent captured response.
    pub fn last_cache_headers(&self) -> Vec<(String, String)> {
        self.last_cache_headers.lock().clone()
    }
}
