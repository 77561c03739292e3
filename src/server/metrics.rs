//! Request metrics and access logging.
//!
//! Metrics live in a registry owned by [`HttpMetrics`], created once at
//! startup and shared through the router state.

use std::sync::Arc;
use std::time::Instant;

use axum::{
    extract::{MatchedPath, Request, State},
    middleware::Next,
    response::Response,
};
use prometheus::{
    Encoder, HistogramOpts, HistogramVec, IntCounterVec, Opts, Registry, TextEncoder,
};
use tracing::info;

/// Labels shared by every HTTP metric.
const LABELS: &[&str] = &["method", "route", "status_code"];

/// Paths excluded from the access log.
const QUIET_PATHS: &[&str] = &["/healthz", "/livez"];

/// Request counters and latency histograms.
pub struct HttpMetrics {
    registry: Registry,
    requests_total: IntCounterVec,
    request_duration: HistogramVec,
}

impl HttpMetrics {
    /// Create the metric families and register them in a fresh registry.
    pub fn new() -> Result<Self, prometheus::Error> {
        let registry = Registry::new();

        let requests_total = IntCounterVec::new(
            Opts::new("http_requests_total", "Total number of HTTP requests"),
            LABELS,
        )?;
        let request_duration = HistogramVec::new(
            HistogramOpts::new(
                "http_request_duration_seconds",
                "Duration of HTTP requests in seconds",
            ),
            LABELS,
        )?;

        registry.register(Box::new(requests_total.clone()))?;
        registry.register(Box::new(request_duration.clone()))?;

        #[cfg(target_os = "linux")]
        registry.register(Box::new(
            prometheus::process_collector::ProcessCollector::for_self(),
        ))?;

        Ok(Self {
            registry,
            requests_total,
            request_duration,
        })
    }

    /// Record one finished request.
    pub fn observe(&self, method: &str, route: &str, status: u16, seconds: f64) {
        let status = status.to_string();
        let labels = [method, route, status.as_str()];
        self.requests_total.with_label_values(&labels).inc();
        self.request_duration
            .with_label_values(&labels)
            .observe(seconds);
    }

    /// Total requests recorded so far, across all label sets.
    pub fn total_requests(&self) -> u64 {
        self.registry
            .gather()
            .iter()
            .filter(|family| family.get_name() == "http_requests_total")
            .flat_map(|family| family.get_metric())
            .map(|metric| metric.get_counter().get_value() as u64)
            .sum()
    }

    /// Render all metrics in the text exposition format.
    pub fn render(&self) -> Result<String, prometheus::Error> {
        let encoder = TextEncoder::new();
        let mut buffer = Vec::new();
        encoder.encode(&self.registry.gather(), &mut buffer)?;
        String::from_utf8(buffer).map_err(|e| prometheus::Error::Msg(e.to_string()))
    }

    /// Content type of [`HttpMetrics::render`] output.
    pub fn content_type(&self) -> &'static str {
        prometheus::TEXT_FORMAT
    }
}

/// Route label for requests that matched no route.
pub const UNMATCHED_ROUTE: &str = "<unmatched>";

/// Middleware recording metrics and an access-log line for every request.
pub async fn track_metrics(
    State(metrics): State<Arc<HttpMetrics>>,
    request: Request,
    next: Next,
) -> Response {
    let path = request.uri().path().to_string();
    if path == "/metrics" {
        return next.run(request).await;
    }

    let method = request.method().to_string();
    let route = request
        .extensions()
        .get::<MatchedPath>()
        .map(|p| p.as_str().to_string())
        .unwrap_or_else(|| UNMATCHED_ROUTE.to_string());

    let start = Instant::now();
    let response = next.run(request).await;
    let elapsed = start.elapsed();
    let status = response.status().as_u16();

    metrics.observe(&method, &route, status, elapsed.as_secs_f64());

    if !QUIET_PATHS.contains(&path.as_str()) {
        let length = response
            .headers()
            .get(http::header::CONTENT_LENGTH)
            .and_then(|v| v.to_str().ok())
            .unwrap_or("-");
        info!(
            method = %method,
            path = %path,
            status,
            elapsed_ms = elapsed.as_millis() as u64,
            bytes = length,
            "request completed"
        );
    }

    response
}
