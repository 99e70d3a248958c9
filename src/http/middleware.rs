//! Request middleware: CORS, request tracing and credential rate limiting.

use crate::error::ApiError;
use crate::state::AppState;
use crate::telemetry::{RequestTimer, spans};
use axum::body::Body;
use axum::extract::{ConnectInfo, MatchedPath, Request, State};
use axum::http::{HeaderMap, HeaderValue, Method, StatusCode, header};
use axum::middleware::Next;
use axum::response::{IntoResponse, Response};
use std::net::SocketAddr;
use tracing::{Instrument, debug, info, warn};

const REQUEST_ID: &str = "x-request-id";

/// Longest client-supplied request id that is propagated as-is.
const MAX_REQUEST_ID_LEN: usize = 128;

const ALLOWED_METHODS: &str = "GET, POST, PUT, PATCH, DELETE, OPTIONS";

/// Preflight cache lifetime in seconds.
const PREFLIGHT_MAX_AGE: &str = "600";

/// Attach a request id, open a span and record latency per matched route.
pub async fn request_tracing(request: Request, next: Next) -> Response {
    let request_id = request_id(request.headers());
    let route = request
        .extensions()
        .get::<MatchedPath>()
        .map(|p| p.as_str().to_string())
        .unwrap_or_else(|| "unmatched".to_string());
    let span = spans::request(&request_id, request.method().as_str(), &route);

    let timer = RequestTimer::new(route);
    let mut response = next.run(request).instrument(span.clone()).await;
    let status = response.status();
    let latency_ms = timer.finish(status.as_u16());

    span.in_scope(|| {
        if status.is_server_error() {
            warn!(status = status.as_u16(), latency_ms, "Request finished");
        } else {
            info!(status = status.as_u16(), latency_ms, "Request finished");
        }
    });

    if let Ok(value) = HeaderValue::from_str(&request_id) {
        response.headers_mut().insert(REQUEST_ID, value);
    }
    response
}

fn request_id(headers: &HeaderMap) -> String {
    headers
        .get(REQUEST_ID)
        .and_then(|v| v.to_str().ok())
        .map(str::trim)
        .filter(|id| !id.is_empty() && id.len() <= MAX_REQUEST_ID_LEN)
        .map(str::to_string)
        .unwrap_or_else(|| uuid::Uuid::new_v4().to_string())
}

/// Cross-origin handling.
///
/// Allowed origins are echoed back with credentials allowed; preflight
/// requests are answered here without reaching the router.
pub async fn cors(State(state): State<AppState>, request: Request, next: Next) -> Response {
    let origin = request.headers().get(header::ORIGIN).cloned();
    let allowed = origin
        .as_ref()
        .and_then(|o| o.to_str().ok())
        .is_some_and(|o| origin_allowed(&state.cors.allowed_origins, o));

    let is_preflight = request.method() == Method::OPTIONS
        && origin.is_some()
        && request
            .headers()
            .contains_key(header::ACCESS_CONTROL_REQUEST_METHOD);

    if is_preflight {
        if !allowed {
            debug!(origin = ?origin, "Rejected CORS preflight");
            return (StatusCode::BAD_REQUEST, "Disallowed CORS origin").into_response();
        }
        let requested_headers = request
            .headers()
            .get(header::ACCESS_CONTROL_REQUEST_HEADERS)
            .cloned();
        let mut response = StatusCode::OK.into_response();
        let headers = response.headers_mut();
        headers.insert(
            header::ACCESS_CONTROL_ALLOW_METHODS,
            HeaderValue::from_static(ALLOWED_METHODS),
        );
        if let Some(requested) = requested_headers {
            headers.insert(header::ACCESS_CONTROL_ALLOW_HEADERS, requested);
        }
        headers.insert(
            header::ACCESS_CONTROL_MAX_AGE,
            HeaderValue::from_static(PREFLIGHT_MAX_AGE),
        );
        allow_origin(headers, origin);
        return response;
    }

    let mut response = next.run(request).await;
    if allowed {
        allow_origin(response.headers_mut(), origin);
    }
    response
}

fn origin_allowed(allowed: &[String], origin: &str) -> bool {
    allowed.iter().any(|a| a == "*" || a == origin)
}

fn allow_origin(headers: &mut HeaderMap, origin: Option<HeaderValue>) {
    if let Some(origin) = origin {
        headers.insert(header::ACCESS_CONTROL_ALLOW_ORIGIN, origin);
        headers.insert(
            header::ACCESS_CONTROL_ALLOW_CREDENTIALS,
            HeaderValue::from_static("true"),
        );
        headers.append(header::VARY, HeaderValue::from_static("Origin"));
    }
}

/// Per-IP limit on the credential endpoints.
pub async fn rate_limit(
    State(state): State<AppState>,
    connect_info: Option<ConnectInfo<SocketAddr>>,
    request: Request<Body>,
    next: Next,
) -> Response {
    if let Some(ConnectInfo(addr)) = connect_info
        && !state.limiter.check(addr.ip())
    {
        return ApiError::RateLimited.into_response();
    }
    next.run(request).await
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_request_id_propagation() {
        let mut headers = HeaderMap::new();
        headers.insert(REQUEST_ID, HeaderValue::from_static("abc-123"));
        assert_eq!(request_id(&headers), "abc-123");

        headers.insert(REQUEST_ID, HeaderValue::from_static("   "));
        assert!(uuid::Uuid::parse_str(&request_id(&headers)).is_ok());

        let long = "x".repeat(MAX_REQUEST_ID_LEN + 1);
        headers.insert(REQUEST_ID, HeaderValue::from_str(&long).unwrap());
        assert_ne!(request_id(&headers), long);
    }

    #[test]
    fn test_origin_allowed() {
        let any = vec!["*".to_string()];
        assert!(origin_allowed(&any, "http://a.example"));

        let listed = vec!["http://a.example".to_string()];
        assert!(origin_allowed(&listed, "http://a.example"));
        assert!(!origin_allowed(&listed, "http://b.example"));
        assert!(!origin_allowed(&[], "http://a.example"));
    }
}
