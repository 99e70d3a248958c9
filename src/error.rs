//! Unified error handling for bovespa-api.
//!
//! This module provides the error type every handler returns, with HTTP
//! status mapping, client-visible detail messages and metric labeling.
//! Error bodies have the shape `{"detail": "<message>"}`.

use crate::db::DbError;
use crate::market::UpstreamError;
use crate::security::password::PasswordError;
use axum::Json;
use axum::http::{HeaderValue, StatusCode, header};
use axum::response::{IntoResponse, Response};
use serde_json::json;
use thiserror::Error;

/// Detail returned for every rejected bearer token.
pub const INVALID_CREDENTIALS_DETAIL: &str = "Could not validate credentials";

/// Errors that can occur during request handling.
#[derive(Debug, Error)]
pub enum ApiError {
    #[error("validation failed: {0}")]
    Validation(String),

    #[error("email already registered")]
    EmailTaken,

    #[error("wrong email or password")]
    InvalidCredentials,

    /// Bearer token missing or rejected; the label says why.
    #[error("credentials rejected: {0}")]
    Forbidden(&'static str),

    #[error("too many attempts")]
    RateLimited,

    #[error("not found")]
    NotFound,

    #[error("upstream error: {0}")]
    Upstream(#[from] UpstreamError),

    #[error("database error: {0}")]
    Database(#[from] DbError),

    #[error("password hashing error: {0}")]
    Password(#[from] PasswordError),

    #[error("internal error: {0}")]
    Internal(String),
}

impl ApiError {
    /// Get a static error code string for metrics labeling.
    #[inline]
    pub fn error_code(&self) -> &'static str {
        match self {
            Self::Validation(_) => "validation",
            Self::EmailTaken => "email_taken",
            Self::InvalidCredentials => "invalid_credentials",
            Self::Forbidden(_) => "forbidden",
            Self::RateLimited => "rate_limited",
            Self::NotFound => "not_found",
            Self::Upstream(_) => "upstream",
            Self::Database(_) => "database",
            Self::Password(_) => "password",
            Self::Internal(_) => "internal",
        }
    }

    pub fn status(&self) -> StatusCode {
        match self {
            Self::Validation(_) => StatusCode::UNPROCESSABLE_ENTITY,
            Self::EmailTaken => StatusCode::CONFLICT,
            Self::InvalidCredentials => StatusCode::UNAUTHORIZED,
            Self::Forbidden(_) => StatusCode::FORBIDDEN,
            Self::RateLimited => StatusCode::TOO_MANY_REQUESTS,
            Self::NotFound => StatusCode::NOT_FOUND,
            Self::Upstream(_) => StatusCode::BAD_GATEWAY,
            Self::Database(_) | Self::Password(_) | Self::Internal(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }

    /// Message shown to the client.
    ///
    /// Internal causes are logged, never echoed.
    pub fn detail(&self) -> String {
        match self {
            Self::Validation(msg) => msg.clone(),
            Self::EmailTaken => "Email já registrado".to_string(),
            Self::InvalidCredentials => "Email ou senha incorretos".to_string(),
            Self::Forbidden(_) => INVALID_CREDENTIALS_DETAIL.to_string(),
            Self::RateLimited => "Muitas tentativas, tente novamente mais tarde".to_string(),
            Self::NotFound => "Not Found".to_string(),
            Self::Upstream(_) => "Falha ao consultar dados externos".to_string(),
            Self::Database(_) | Self::Password(_) | Self::Internal(_) => {
                "Internal Server Error".to_string()
            }
        }
    }

    /// Level this error is logged at, if any.
    ///
    /// Upstream failures are the remote side's fault and only warn.
    pub fn log_level(&self) -> Option<tracing::Level> {
        match self {
            Self::Upstream(_) => Some(tracing::Level::WARN),
            _ if self.status().is_server_error() => Some(tracing::Level::ERROR),
            _ => None,
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        match self.log_level() {
            Some(tracing::Level::WARN) => {
                tracing::warn!(error = %self, "Upstream request failed");
            }
            Some(_) => {
                tracing::error!(error = %self, code = self.error_code(), "Request failed");
            }
            None => {}
        }

        let mut response = (status, Json(json!({ "detail": self.detail() }))).into_response();
        match self {
            Self::InvalidCredentials | Self::Forbidden(_) => {
                response
                    .headers_mut()
                    .insert(header::WWW_AUTHENTICATE, HeaderValue::from_static("Bearer"));
            }
            Self::RateLimited => {
                response
                    .headers_mut()
                    .insert(header::RETRY_AFTER, HeaderValue::from_static("60"));
            }
            _ => {}
        }
        response
    }
}

/// Result type for request handlers.
pub type ApiResult<T> = Result<T, ApiError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_codes() {
        assert_eq!(ApiError::EmailTaken.error_code(), "email_taken");
        assert_eq!(ApiError::Forbidden("missing").error_code(), "forbidden");
        assert_eq!(ApiError::Internal("x".into()).error_code(), "internal");
    }

    #[test]
    fn test_status_mapping() {
        assert_eq!(ApiError::EmailTaken.status(), StatusCode::CONFLICT);
        assert_eq!(ApiError::InvalidCredentials.status(), StatusCode::UNAUTHORIZED);
        assert_eq!(ApiError::Forbidden("expired").status(), StatusCode::FORBIDDEN);
        assert_eq!(
            ApiError::Validation("x".into()).status(),
            StatusCode::UNPROCESSABLE_ENTITY
        );
    }

    #[test]
    fn test_upstream_failures_only_warn() {
        let upstream = ApiError::Upstream(UpstreamError::Status(503));
        assert_eq!(upstream.status(), StatusCode::BAD_GATEWAY);
        assert_eq!(upstream.log_level(), Some(tracing::Level::WARN));
        assert_eq!(
            ApiError::Internal("x".into()).log_level(),
            Some(tracing::Level::ERROR)
        );
        assert_eq!(ApiError::NotFound.log_level(), None);
    }

    #[test]
    fn test_internal_detail_is_generic() {
        let err = ApiError::Internal("pool exhausted at 10.0.0.3".into());
        assert_eq!(err.detail(), "Internal Server Error");
    }

    #[test]
    fn test_auth_errors_carry_www_authenticate() {
        let response = ApiError::InvalidCredentials.into_response();
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
        assert_eq!(response.headers()[header::WWW_AUTHENTICATE], "Bearer");

        let response = ApiError::Forbidden("missing").into_response();
        assert_eq!(response.headers()[header::WWW_AUTHENTICATE], "Bearer");

        let response = ApiError::EmailTaken.into_response();
        assert!(response.headers().get(header::WWW_AUTHENTICATE).is_none());
    }
}
