//! Core configuration types and loading.

use serde::Deserialize;
use std::net::{IpAddr, SocketAddr};
use std::path::Path;
use thiserror::Error;

use super::defaults::*;

/// Configuration errors.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config file: {0}")]
    Io(#[from] std::io::Error),
    #[error("failed to parse config: {0}")]
    Parse(#[from] toml::de::Error),
    #[error("invalid value for {var}: {value}")]
    InvalidEnv { var: &'static str, value: String },
}

/// Service configuration.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct Config {
    /// HTTP listener settings.
    #[serde(default)]
    pub server: ServerConfig,
    /// User store settings.
    #[serde(default)]
    pub database: DatabaseConfig,
    /// Token signing settings.
    #[serde(default)]
    pub auth: AuthConfig,
    /// Market data upstreams.
    #[serde(default)]
    pub market: MarketConfig,
    /// Brute-force protection for the credential endpoints.
    #[serde(default)]
    pub security: SecurityConfig,
    /// Cross-origin settings.
    #[serde(default)]
    pub cors: CorsConfig,
    /// Log output settings.
    #[serde(default)]
    pub logging: LoggingConfig,
}

impl Config {
    /// Load configuration from a TOML file.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path)?;
        let config: Config = toml::from_str(&content)?;
        Ok(config)
    }

    /// Load configuration from a TOML file, falling back to defaults when the
    /// file does not exist.
    ///
    /// Containers are usually configured purely through the environment, so
    /// a missing file is not an error. A file that exists but fails to parse
    /// still is.
    pub fn load_or_default<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        match Self::load(&path) {
            Ok(config) => Ok(config),
            Err(ConfigError::Io(e)) if e.kind() == std::io::ErrorKind::NotFound => {
                Ok(Self::default())
            }
            Err(e) => Err(e),
        }
    }
}

/// HTTP listener configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    /// Service name reported in logs.
    #[serde(default = "default_server_name")]
    pub name: String,
    /// Address to bind to (default: 0.0.0.0).
    #[serde(default = "default_host")]
    pub host: IpAddr,
    /// API port (default: 8000).
    #[serde(default = "default_port")]
    pub port: u16,
    /// Prometheus metrics HTTP port (default: 9090, 0 disables).
    #[serde(default = "default_metrics_port")]
    pub metrics_port: u16,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            name: default_server_name(),
            host: default_host(),
            port: default_port(),
            metrics_port: default_metrics_port(),
        }
    }
}

impl ServerConfig {
    /// Socket address the API listens on.
    pub fn bind_addr(&self) -> SocketAddr {
        SocketAddr::new(self.host, self.port)
    }
}

/// Which user store implementation to run against.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DatabaseBackend {
    /// PostgreSQL through a sqlx pool.
    #[default]
    Postgres,
    /// Process-local store; data is lost on restart.
    Memory,
}

/// Database configuration.
///
/// Either `url` is set, or the URL is assembled from the individual parts.
#[derive(Debug, Clone, Deserialize)]
pub struct DatabaseConfig {
    #[serde(default)]
    pub backend: DatabaseBackend,
    /// Full connection URL; takes precedence over the individual parts.
    #[serde(default)]
    pub url: Option<String>,
    #[serde(default = "default_db_user")]
    pub user: String,
    #[serde(default = "default_db_password")]
    pub password: String,
    #[serde(default = "default_db_host")]
    pub host: String,
    #[serde(default = "default_db_port")]
    pub port: u16,
    #[serde(default = "default_db_name")]
    pub name: String,
    /// Pool size (default: 10).
    #[serde(default = "default_max_connections")]
    pub max_connections: u32,
    /// Seconds to wait for a pooled connection (default: 5).
    #[serde(default = "default_acquire_timeout")]
    pub acquire_timeout_secs: u64,
    /// Seconds an idle connection is kept (default: 60).
    #[serde(default = "default_idle_timeout")]
    pub idle_timeout_secs: u64,
    /// Attempts for the initial connection before giving up (default: 10).
    #[serde(default = "default_connect_retries")]
    pub connect_retries: u32,
    /// Seconds between initial connection attempts (default: 2).
    #[serde(default = "default_retry_interval")]
    pub retry_interval_secs: u64,
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            backend: DatabaseBackend::default(),
            url: None,
            user: default_db_user(),
            password: default_db_password(),
            host: default_db_host(),
            port: default_db_port(),
            name: default_db_name(),
            max_connections: default_max_connections(),
            acquire_timeout_secs: default_acquire_timeout(),
            idle_timeout_secs: default_idle_timeout(),
            connect_retries: default_connect_retries(),
            retry_interval_secs: default_retry_interval(),
        }
    }
}

impl DatabaseConfig {
    /// Connection URL for the Postgres pool.
    pub fn connection_url(&self) -> String {
        match &self.url {
            Some(url) => url.clone(),
            None => format!(
                "postgresql://{}:{}@{}:{}/{}",
                self.user, self.password, self.host, self.port, self.name
            ),
        }
    }

    /// Connection URL with the password masked, for logging.
    pub fn redacted_url(&self) -> String {
        let url = self.connection_url();
        let Some((scheme, rest)) = url.split_once("://") else {
            return url;
        };
        match rest.rsplit_once('@') {
            Some((userinfo, host)) => {
                let user = userinfo.split(':').next().unwrap_or_default();
                format!("{scheme}://{user}:***@{host}")
            }
            None => url,
        }
    }
}

/// Token signing configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct AuthConfig {
    /// HMAC secret for signing tokens.
    ///
    /// When unset, an ephemeral random secret is generated at startup and
    /// issued tokens do not survive a restart.
    #[serde(default)]
    pub jwt_secret: Option<String>,
    /// Signing algorithm: HS256, HS384 or HS512 (default: HS256).
    #[serde(default = "default_algorithm")]
    pub algorithm: String,
    /// Token lifetime in minutes (default: 30).
    #[serde(default = "default_token_expiry")]
    pub access_token_expire_minutes: i64,
}

impl Default for AuthConfig {
    fn default() -> Self {
        Self {
            jwt_secret: None,
            algorithm: default_algorithm(),
            access_token_expire_minutes: default_token_expiry(),
        }
    }
}

impl AuthConfig {
    /// Return the configured secret, generating an ephemeral one if unset.
    pub fn resolve_secret(&mut self) -> &str {
        self.jwt_secret.get_or_insert_with(ephemeral_jwt_secret)
    }
}

/// Which market data source backs `/consultar`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MarketProviderKind {
    /// Built-in Bovespa daily series.
    #[default]
    Static,
    /// Proxy an upstream JSON endpoint.
    Http,
}

/// Market data configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct MarketConfig {
    #[serde(default)]
    pub provider: MarketProviderKind,
    /// Upstream daily series URL (required for the http provider).
    #[serde(default)]
    pub url: Option<String>,
    /// Seconds a fetched series is served from cache (default: 300).
    #[serde(default = "default_market_cache_ttl")]
    pub cache_ttl_secs: u64,
    /// Upstream request timeout in seconds (default: 5).
    #[serde(default = "default_market_timeout")]
    pub timeout_secs: u64,
    /// USD-BRL quote endpoint.
    #[serde(default = "default_exchange_url")]
    pub exchange_url: String,
}

impl Default for MarketConfig {
    fn default() -> Self {
        Self {
            provider: MarketProviderKind::default(),
            url: None,
            cache_ttl_secs: default_market_cache_ttl(),
            timeout_secs: default_market_timeout(),
            exchange_url: default_exchange_url(),
        }
    }
}

/// Rate limiting for `/registrar` and `/login`.
#[derive(Debug, Clone, Deserialize)]
pub struct SecurityConfig {
    /// Sustained attempts per minute per client IP (default: 30).
    #[serde(default = "default_auth_attempts_per_minute")]
    pub auth_attempts_per_minute: u32,
    /// Burst allowance per client IP (default: 10).
    #[serde(default = "default_auth_burst")]
    pub auth_burst: u32,
}

impl Default for SecurityConfig {
    fn default() -> Self {
        Self {
            auth_attempts_per_minute: default_auth_attempts_per_minute(),
            auth_burst: default_auth_burst(),
        }
    }
}

/// Cross-origin configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct CorsConfig {
    /// Allowed origins; `"*"` allows any origin.
    #[serde(default = "default_allowed_origins")]
    pub allowed_origins: Vec<String>,
}

impl Default for CorsConfig {
    fn default() -> Self {
        Self {
            allowed_origins: default_allowed_origins(),
        }
    }
}

/// Log output format.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    #[default]
    Pretty,
    Json,
}

/// Logging configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct LoggingConfig {
    #[serde(default)]
    pub format: LogFormat,
    /// Default filter when `RUST_LOG` is unset (default: "info").
    #[serde(default = "default_log_level")]
    pub level: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            format: LogFormat::default(),
            level: default_log_level(),
        }
    }
}
