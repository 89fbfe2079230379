//! # Prometheus Metrics
//!
//! HTTP-level metrics (request counts, latency, errors) are recorded by
//! [`metrics_middleware`]. Registry gauges (claims stored, root version,
//! signing key mode) are refreshed on each `/metrics` scrape (pull model).

use std::sync::Arc;
use std::time::Instant;

use axum::extract::{MatchedPath, Request};
use axum::http::Method;
use axum::middleware::Next;
use axum::response::Response;
use prometheus::core::Collector;
use prometheus::{Encoder, Gauge, HistogramOpts, HistogramVec, IntCounterVec, Opts, Registry, TextEncoder};

/// Shared metrics state backed by a Prometheus registry.
#[derive(Clone)]
pub struct ApiMetrics {
    inner: Arc<Inner>,
}

struct Inner {
    registry: Registry,

    http_requests_total: IntCounterVec,
    http_request_duration_seconds: HistogramVec,
    http_errors_total: IntCounterVec,

    claims_total: Gauge,
    root_version: Gauge,
    signing_key_ephemeral: Gauge,
}

impl std::fmt::Debug for ApiMetrics {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ApiMetrics")
            .field("requests", &self.requests())
            .field("errors", &self.errors())
            .finish()
    }
}

impl ApiMetrics {
    /// Create and register every metric in a fresh registry.
    pub fn new() -> Result<Self, prometheus::Error> {
        let registry = Registry::new();

        let http_requests_total = IntCounterVec::new(
            Opts::new("claimsrv_http_requests_total", "Total HTTP requests"),
            &["method", "path", "status"],
        )?;
        let http_request_duration_seconds = HistogramVec::new(
            HistogramOpts::new(
                "claimsrv_http_request_duration_seconds",
                "HTTP request duration in seconds",
            )
            .buckets(vec![
                0.001, 0.005, 0.01, 0.025, 0.05, 0.1, 0.25, 0.5, 1.0, 2.5, 5.0,
            ]),
            &["method", "path"],
        )?;
        let http_errors_total = IntCounterVec::new(
            Opts::new("claimsrv_http_errors_total", "Total HTTP errors (4xx and 5xx)"),
            &["method", "path", "status"],
        )?;
        let claims_total = Gauge::new("claimsrv_claims_total", "Claims stored in the registry")?;
        let root_version = Gauge::new("claimsrv_root_version", "Latest published root version")?;
        let signing_key_ephemeral = Gauge::new(
            "claimsrv_signing_key_ephemeral",
            "Whether the root signing key is ephemeral (1=ephemeral, 0=configured)",
        )?;

        registry.register(Box::new(http_requests_total.clone()))?;
        registry.register(Box::new(http_request_duration_seconds.clone()))?;
        registry.register(Box::new(http_errors_total.clone()))?;
        registry.register(Box::new(claims_total.clone()))?;
        registry.register(Box::new(root_version.clone()))?;
        registry.register(Box::new(signing_key_ephemeral.clone()))?;

        Ok(Self {
            inner: Arc::new(Inner {
                registry,
                http_requests_total,
                http_request_duration_seconds,
                http_errors_total,
                claims_total,
                root_version,
                signing_key_ephemeral,
            }),
        })
    }

    /// Total request count across all labels.
    pub fn requests(&self) -> u64 {
        sum_counter(&self.inner.http_requests_total)
    }

    /// Total error count across all labels.
    pub fn errors(&self) -> u64 {
        sum_counter(&self.inner.http_errors_total)
    }

    fn record_request(&self, method: &str, path: &str, status: u16, duration_secs: f64) {
        let status_str = status.to_string();
        self.inner
            .http_requests_total
            .with_label_values(&[method, path, &status_str])
            .inc();
        self.inner
            .http_request_duration_seconds
            .with_label_values(&[method, path])
            .observe(duration_secs);
        if status >= 400 {
            self.inner
                .http_errors_total
                .with_label_values(&[method, path, &status_str])
                .inc();
        }
    }

    /// Refresh the registry gauges before a scrape.
    pub fn set_registry_state(&self, claims: usize, version: u64, key_ephemeral: bool) {
        self.inner.claims_total.set(claims as f64);
        self.inner.root_version.set(version as f64);
        self.inner
            .signing_key_ephemeral
            .set(if key_ephemeral { 1.0 } else { 0.0 });
    }

    /// Gather all metrics in Prometheus text format.
    pub fn gather_and_encode(&self) -> Result<String, String> {
        let encoder = TextEncoder::new();
        let families = self.inner.registry.gather();
        let mut buffer = Vec::new();
        encoder
            .encode(&families, &mut buffer)
            .map_err(|e| format!("failed to encode metrics: {e}"))?;
        String::from_utf8(buffer).map_err(|e| format!("metrics encoding produced invalid UTF-8: {e}"))
    }
}

fn sum_counter(counter: &IntCounterVec) -> u64 {
    counter
        .collect()
        .iter()
        .flat_map(|mf| mf.get_metric())
        .map(|m| m.get_counter().get_value() as u64)
        .sum()
}

/// `path` label for requests that matched no route.
const UNMATCHED_PATH: &str = "unmatched";

/// Route template the request matched, e.g. `/claims/{handle}/proof`.
///
/// Labels come only from the router's own templates, so client-chosen
/// path text never creates a series.
fn path_label(request: &Request) -> String {
    request
        .extensions()
        .get::<MatchedPath>()
        .map_or_else(|| UNMATCHED_PATH.to_string(), |p| p.as_str().to_string())
}

/// `method` label; extension methods share one series.
fn method_label(method: &Method) -> &'static str {
    match method.as_str() {
        "GET" => "GET",
        "POST" => "POST",
        "PUT" => "PUT",
        "DELETE" => "DELETE",
        "HEAD" => "HEAD",
        "OPTIONS" => "OPTIONS",
        "PATCH" => "PATCH",
        _ => "OTHER",
    }
}

/// Middleware that records HTTP request metrics.
///
/// Must be installed with `Router::layer` so it runs after routing and
/// sees [`MatchedPath`].
pub async fn metrics_middleware(request: Request, next: Next) -> Response {
    let metrics = request.extensions().get::<ApiMetrics>().cloned();
    let method = method_label(request.method());
    let path = path_label(&request);
    let start = Instant::now();

    let response = next.run(request).await;

    if let Some(m) = metrics {
        m.record_request(
            method,
            &path,
            response.status().as_u16(),
            start.elapsed().as_secs_f64(),
        );
    }
    response
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn starts_at_zero() {
        let m = ApiMetrics::new().unwrap();
        assert_eq!(m.requests(), 0);
        assert_eq!(m.errors(), 0);
    }

    #[test]
    fn errors_count_only_4xx_and_5xx() {
        let m = ApiMetrics::new().unwrap();
        m.record_request("GET", "/root", 200, 0.001);
        m.record_request("POST", "/claims", 201, 0.002);
        m.record_request("GET", "/claims/{handle}", 404, 0.001);
        m.record_request("POST", "/claims", 500, 0.1);
        assert_eq!(m.requests(), 4);
        assert_eq!(m.errors(), 2);
    }

    #[test]
    fn unmatched_requests_share_one_path_label() {
        let request = axum::http::Request::builder()
            .uri("/claims/0x1234/whatever")
            .body(axum::body::Body::empty())
            .unwrap();
        assert_eq!(path_label(&request), UNMATCHED_PATH);
    }

    #[test]
    fn extension_methods_share_one_label() {
        assert_eq!(method_label(&Method::GET), "GET");
        assert_eq!(method_label(&Method::from_bytes(b"BREW").unwrap()), "OTHER");
    }

    #[test]
    fn encode_contains_metric_names() {
        let m = ApiMetrics::new().unwrap();
        m.record_request("GET", "/root", 200, 0.001);
        m.set_registry_state(3, 3, true);
        let text = m.gather_and_encode().unwrap();
        assert!(text.contains("claimsrv_http_requests_total"));
        assert!(text.contains("claimsrv_claims_total 3"));
        assert!(text.contains("claimsrv_root_version 3"));
        assert!(text.contains("claimsrv_signing_key_ephemeral 1"));
    }
}
