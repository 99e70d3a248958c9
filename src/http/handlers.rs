//! Route handlers.

use super::ValidJson;
use crate::auth::{AuthUser, LoginRequest, RegisterRequest, TokenResponse};
use crate::error::ApiResult;
use crate::market::{DailyBar, ExchangeRate};
use crate::state::AppState;
use axum::Json;
use axum::extract::State;
use axum::http::StatusCode;
use serde::Serialize;
use std::sync::LazyLock;
use tracing::{debug, warn};

static HOSTNAME: LazyLock<String> = LazyLock::new(|| {
    std::env::var("HOSTNAME")
        .ok()
        .filter(|h| !h.is_empty())
        .or_else(|| {
            std::fs::read_to_string("/etc/hostname")
                .ok()
                .map(|h| h.trim().to_string())
                .filter(|h| !h.is_empty())
        })
        .unwrap_or_else(|| "localhost".to_string())
});

/// `POST /registrar`
pub async fn register(
    State(state): State<AppState>,
    ValidJson(req): ValidJson<RegisterRequest>,
) -> ApiResult<Json<TokenResponse>> {
    state.auth.register(&req).await.map(Json)
}

/// `POST /login`
pub async fn login(
    State(state): State<AppState>,
    ValidJson(req): ValidJson<LoginRequest>,
) -> ApiResult<Json<TokenResponse>> {
    state.auth.login(&req).await.map(Json)
}

/// `GET /consultar`
pub async fn consultar(
    State(state): State<AppState>,
    AuthUser(user): AuthUser,
) -> ApiResult<Json<Vec<DailyBar>>> {
    let bars = state.market.daily_bars().await?;
    debug!(user_id = user.id, provider = state.market.name(), bars = bars.len(), "Served market data");
    Ok(Json(bars))
}

/// `GET /cambio`
pub async fn cambio(
    State(state): State<AppState>,
    AuthUser(user): AuthUser,
) -> ApiResult<Json<ExchangeRate>> {
    let rate = state.exchange.usd_brl().await?;
    debug!(user_id = user.id, rate = rate.rate, "Served exchange rate");
    Ok(Json(rate))
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct HealthCheck {
    status_code: u16,
    timestamp: String,
    hostname: String,
}

/// `GET /health-check`
///
/// 503 when the user store does not answer a ping.
pub async fn health_check(State(state): State<AppState>) -> (StatusCode, Json<HealthCheck>) {
    let status = match state.users.ping().await {
        Ok(()) => StatusCode::OK,
        Err(e) => {
            warn!(error = %e, "Health check: user store unreachable");
            StatusCode::SERVICE_UNAVAILABLE
        }
    };
    let body = HealthCheck {
        status_code: status.as_u16(),
        timestamp: chrono::Utc::now()
            .naive_utc()
            .format("%Y-%m-%dT%H:%M:%S%.6f")
            .to_string(),
        hostname: HOSTNAME.clone(),
    };
    (status, Json(body))
}
