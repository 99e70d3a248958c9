//! Prometheus metrics collection for bovespa-api.
//!
//! Exposed on a separate HTTP port (`server.metrics_port`) for scraping.
//!
//! - `api_http_requests_total{route,status}` - Requests by matched route and status
//! - `api_http_request_duration_seconds{route}` - Request latency histogram
//! - `api_users_registered_total` - Successful registrations
//! - `api_login_failures_total` - Rejected logins
//! - `api_auth_rejected_total{reason}` - Rejected bearer tokens by reason
//! - `api_upstream_errors_total{source}` - Failed upstream market data calls

use prometheus::{
    Encoder, HistogramOpts, HistogramVec, IntCounter, IntCounterVec, Opts, Registry, TextEncoder,
};
use std::sync::OnceLock;

/// Global Prometheus registry for all metrics.
pub static REGISTRY: OnceLock<Registry> = OnceLock::new();

pub fn registry() -> &'static Registry {
    REGISTRY.get_or_init(Registry::new)
}

// ========================================================================
// Counters (monotonic increasing)
// ========================================================================

pub static HTTP_REQUESTS: OnceLock<IntCounterVec> = OnceLock::new();

pub static USERS_REGISTERED: OnceLock<IntCounter> = OnceLock::new();

pub static LOGIN_FAILURES: OnceLock<IntCounter> = OnceLock::new();

pub static AUTH_REJECTED: OnceLock<IntCounterVec> = OnceLock::new();

pub static UPSTREAM_ERRORS: OnceLock<IntCounterVec> = OnceLock::new();

// ========================================================================
// Histograms
// ========================================================================

pub static HTTP_LATENCY: OnceLock<HistogramVec> = OnceLock::new();

/// Initialize the Prometheus metrics registry.
///
/// Must be called once at server startup before any metrics are recorded.
/// Recording before `init` is a no-op.
pub fn init() {
    let r = registry();

    macro_rules! register {
        ($metric:ident, $init:expr) => {
            match $init {
                Ok(m) => {
                    if let Err(e) = r.register(Box::new(m.clone())) {
                        tracing::warn!(error = %e, concat!("Failed to register metric ", stringify!($metric)));
                    }
                    let _ = $metric.set(m);
                }
                Err(e) => {
                    tracing::warn!(error = %e, concat!("Failed to create metric ", stringify!($metric)));
                }
            }
        };
    }

    register!(HTTP_REQUESTS, IntCounterVec::new(Opts::new("api_http_requests_total", "HTTP requests by route and status"), &["route", "status"]));
    register!(HTTP_LATENCY, HistogramVec::new(
        HistogramOpts::new("api_http_request_duration_seconds", "HTTP request latency by route")
            .buckets(vec![0.001, 0.005, 0.01, 0.05, 0.1, 0.25, 0.5, 1.0, 2.5, 5.0]),
        &["route"]));
    register!(USERS_REGISTERED, IntCounter::new("api_users_registered_total", "Successful user registrations"));
    register!(LOGIN_FAILURES, IntCounter::new("api_login_failures_total", "Rejected login attempts"));
    register!(AUTH_REJECTED, IntCounterVec::new(Opts::new("api_auth_rejected_total", "Rejected bearer tokens by reason"), &["reason"]));
    register!(UPSTREAM_ERRORS, IntCounterVec::new(Opts::new("api_upstream_errors_total", "Failed upstream calls by source"), &["source"]));
}

/// Gather all metrics and encode them in Prometheus text format.
pub fn gather_metrics() -> String {
    let encoder = TextEncoder::new();
    let metric_families = registry().gather();
    let mut buffer = vec![];
    if let Err(e) = encoder.encode(&metric_families, &mut buffer) {
        tracing::error!(error = %e, "Failed to encode Prometheus metrics");
        return String::new();
    }
    match String::from_utf8(buffer) {
        Ok(s) => s,
        Err(e) => {
            tracing::error!(error = %e, "Prometheus metrics were not valid UTF-8");
            String::new()
        }
    }
}

// ============================================================================
// Helper functions for metric updates
// ============================================================================

/// Record a finished HTTP request.
#[inline]
pub fn record_request(route: &str, status: u16, duration_secs: f64) {
    if let Some(c) = HTTP_REQUESTS.get() {
        c.with_label_values(&[route, &status.to_string()]).inc();
    }
    if let Some(h) = HTTP_LATENCY.get() {
        h.with_label_values(&[route]).observe(duration_secs);
    }
}

#[inline]
pub fn record_registration() {
    if let Some(c) = USERS_REGISTERED.get() {
        c.inc();
    }
}

#[inline]
pub fn record_login_failure() {
    if let Some(c) = LOGIN_FAILURES.get() {
        c.inc();
    }
}

/// Record a rejected bearer token.
#[inline]
pub fn record_auth_rejected(reason: &str) {
    if let Some(c) = AUTH_REJECTED.get() {
        c.with_label_values(&[reason]).inc();
    }
}

/// Record a failed upstream call (`market`, `exchange`).
#[inline]
pub fn record_upstream_error(source: &str) {
    if let Some(c) = UPSTREAM_ERRORS.get() {
        c.with_label_values(&[source]).inc();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_metrics_lifecycle() {
        init();

        record_request("/login", 200, 0.002);
        record_auth_rejected("expired");
        record_upstream_error("market");

        let output = gather_metrics();
        assert!(output.contains("api_http_requests_total"));
        assert!(output.contains("api_auth_rejected_total"));
        assert!(output.contains("api_upstream_errors_total"));
    }
}
