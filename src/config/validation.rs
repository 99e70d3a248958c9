//! Configuration validation.
//!
//! Validates configuration at startup to catch common errors early.

use super::{Config, DatabaseBackend, MarketProviderKind};
use crate::auth::token::Algorithm;
use thiserror::Error;

/// Longest accepted token lifetime: ten years.
pub const MAX_TOKEN_EXPIRE_MINUTES: i64 = 10 * 365 * 24 * 60;

/// Validation errors for configuration.
#[derive(Debug, Error)]
pub enum ValidationError {
    #[error("server.port must not be 0")]
    InvalidPort,
    #[error("auth.algorithm must be one of HS256, HS384, HS512, got '{0}'")]
    UnsupportedAlgorithm(String),
    #[error("auth.access_token_expire_minutes must be positive, got {0}")]
    InvalidTokenExpiry(i64),
    #[error("auth.access_token_expire_minutes must be at most {MAX_TOKEN_EXPIRE_MINUTES}, got {0}")]
    TokenExpiryTooLong(i64),
    #[error("database.max_connections must be at least 1")]
    InvalidPoolSize,
    #[error("database.url must start with postgres:// or postgresql://")]
    InvalidDatabaseUrl,
    #[error("market.url is required when market.provider = \"http\"")]
    MissingMarketUrl,
    #[error("security.auth_attempts_per_minute and security.auth_burst must be positive")]
    InvalidRateLimit,
    #[error("cors.allowed_origins must not be empty")]
    EmptyCorsOrigins,
}

/// Validate a configuration, returning all errors found.
pub fn validate(config: &Config) -> Result<(), Vec<ValidationError>> {
    let mut errors = Vec::new();

    if config.server.port == 0 {
        errors.push(ValidationError::InvalidPort);
    }

    if config.auth.algorithm.parse::<Algorithm>().is_err() {
        errors.push(ValidationError::UnsupportedAlgorithm(
            config.auth.algorithm.clone(),
        ));
    }
    let expiry = config.auth.access_token_expire_minutes;
    if expiry <= 0 {
        errors.push(ValidationError::InvalidTokenExpiry(expiry));
    } else if expiry > MAX_TOKEN_EXPIRE_MINUTES {
        errors.push(ValidationError::TokenExpiryTooLong(expiry));
    }

    if config.database.backend == DatabaseBackend::Postgres {
        if config.database.max_connections == 0 {
            errors.push(ValidationError::InvalidPoolSize);
        }
        let url = config.database.connection_url();
        if !(url.starts_with("postgres://") || url.starts_with("postgresql://")) {
            errors.push(ValidationError::InvalidDatabaseUrl);
        }
    }

    if config.market.provider == MarketProviderKind::Http
        && config.market.url.as_deref().is_none_or(str::is_empty)
    {
        errors.push(ValidationError::MissingMarketUrl);
    }

    if config.security.auth_attempts_per_minute == 0 || config.security.auth_burst == 0 {
        errors.push(ValidationError::InvalidRateLimit);
    }

    if config.cors.allowed_origins.is_empty() {
        errors.push(ValidationError::EmptyCorsOrigins);
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}
