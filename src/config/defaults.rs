//! Default value functions for configuration.
//!
//! Separated into its own module for clarity and reuse.

use rand::Rng;
use rand::distributions::Alphanumeric;
use std::net::{IpAddr, Ipv4Addr};

// =============================================================================
// Server Defaults
// =============================================================================

pub fn default_server_name() -> String {
    "bovespa-api".to_string()
}

pub fn default_host() -> IpAddr {
    IpAddr::V4(Ipv4Addr::UNSPECIFIED)
}

pub fn default_port() -> u16 {
    8000
}

pub fn default_metrics_port() -> u16 {
    9090
}

// =============================================================================
// Database Defaults
// =============================================================================

pub fn default_db_user() -> String {
    "projeto".to_string()
}

pub fn default_db_password() -> String {
    "projeto123".to_string()
}

pub fn default_db_host() -> String {
    "db".to_string()
}

pub fn default_db_port() -> u16 {
    5432
}

pub fn default_db_name() -> String {
    "projeto".to_string()
}

pub fn default_max_connections() -> u32 {
    10
}

pub fn default_acquire_timeout() -> u64 {
    5
}

pub fn default_idle_timeout() -> u64 {
    60
}

pub fn default_connect_retries() -> u32 {
    10
}

pub fn default_retry_interval() -> u64 {
    2
}

// =============================================================================
// Auth Defaults
// =============================================================================

pub fn default_algorithm() -> String {
    "HS256".to_string()
}

pub fn default_token_expiry() -> i64 {
    30
}

pub fn ephemeral_jwt_secret() -> String {
    let secret: String = rand::thread_rng()
        .sample_iter(&Alphanumeric)
        .take(48)
        .map(char::from)
        .collect();
    tracing::warn!(
        "No jwt_secret configured - using ephemeral random secret. \
         Issued tokens will NOT survive a restart. \
         Set JWT_SECRET_KEY or [auth].jwt_secret for production use."
    );
    secret
}

// =============================================================================
// Market Defaults
// =============================================================================

pub fn default_market_cache_ttl() -> u64 {
    300
}

pub fn default_market_timeout() -> u64 {
    5
}

pub fn default_exchange_url() -> String {
    "https://economia.awesomeapi.com.br/json/last/USD-BRL".to_string()
}

// =============================================================================
// Rate Limit Defaults
// =============================================================================

pub fn default_auth_attempts_per_minute() -> u32 {
    30
}

pub fn default_auth_burst() -> u32 {
    10
}

// =============================================================================
// CORS / Logging Defaults
// =============================================================================

pub fn default_allowed_origins() -> Vec<String> {
    vec!["*".to_string()]
}

pub fn default_log_level() -> String {
    "info".to_string()
}
