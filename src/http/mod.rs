//! HTTP API.
//!
//! Routes:
//! - `POST /registrar`, `POST /login`: credential endpoints, rate limited per IP
//! - `GET /consultar`, `GET /cambio`: market data, bearer token required
//! - `GET /health-check`: liveness plus a store ping
//!
//! Layers, outermost first: request tracing and metrics, CORS.
//! Prometheus metrics are served by [`metrics_server`] on their own port.

mod extract;
mod handlers;
pub mod metrics_server;
mod middleware;

pub use extract::ValidJson;

use crate::error::ApiError;
use crate::state::AppState;
use axum::Router;
use axum::middleware::{from_fn, from_fn_with_state};
use axum::routing::{get, post};
use std::net::SocketAddr;
use tokio::net::TcpListener;

/// Build the application router.
pub fn router(state: AppState) -> Router {
    let credentials = Router::new()
        .route("/registrar", post(handlers::register))
        .route("/login", post(handlers::login))
        .route_layer(from_fn_with_state(state.clone(), middleware::rate_limit));

    Router::new()
        .merge(credentials)
        .route("/consultar", get(handlers::consultar))
        .route("/cambio", get(handlers::cambio))
        .route("/health-check", get(handlers::health_check))
        .fallback(not_found)
        .layer(from_fn_with_state(state.clone(), middleware::cors))
        .layer(from_fn(middleware::request_tracing))
        .with_state(state)
}

async fn not_found() -> ApiError {
    ApiError::NotFound
}

/// Serve the API until `shutdown` resolves, then drain in-flight requests.
pub async fn serve<F>(listener: TcpListener, state: AppState, shutdown: F) -> std::io::Result<()>
where
    F: std::future::Future<Output = ()> + Send + 'static,
{
    let app = router(state);
    axum::serve(listener, app.into_make_service_with_connect_info::<SocketAddr>())
        .with_graceful_shutdown(shutdown)
        .await
}
