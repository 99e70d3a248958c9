//! Environment variable overrides.
//!
//! The container image is configured through the environment, so every
//! setting the Compose manifest passes in is read here and layered on top of
//! the TOML file.

use super::types::{Config, ConfigError, LogFormat, MarketProviderKind};
use std::str::FromStr;

impl Config {
    /// Overlay settings from the process environment.
    pub fn apply_process_env(&mut self) -> Result<(), ConfigError> {
        self.apply_env(|key| std::env::var(key).ok())
    }

    /// Overlay settings from an arbitrary variable lookup.
    ///
    /// `DATABASE_URL` wins over the individual `DB_*` parts because it is
    /// used verbatim as the connection URL.
    pub fn apply_env<F>(&mut self, lookup: F) -> Result<(), ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        if let Some(v) = get("HOST") {
            self.server.host = parse("HOST", &v)?;
        }
        if let Some(v) = get("PORT") {
            self.server.port = parse("PORT", &v)?;
        }
        if let Some(v) = get("METRICS_PORT") {
            self.server.metrics_port = parse("METRICS_PORT", &v)?;
        }

        if let Some(v) = get("DATABASE_URL") {
            self.database.url = Some(v);
        }
        if let Some(v) = get("DB_USER") {
            self.database.user = v;
        }
        if let Some(v) = get("DB_PASSWORD") {
            self.database.password = v;
        }
        if let Some(v) = get("DB_HOST") {
            self.database.host = v;
        }
        if let Some(v) = get("DB_PORT") {
            self.database.port = parse("DB_PORT", &v)?;
        }
        if let Some(v) = get("DB_NAME") {
            self.database.name = v;
        }

        if let Some(v) = get("JWT_SECRET_KEY").or_else(|| get("SECRET_KEY")) {
            self.auth.jwt_secret = Some(v);
        }
        if let Some(v) = get("ALGORITHM") {
            self.auth.algorithm = v.trim().to_ascii_uppercase();
        }
        if let Some(v) = get("ACCESS_TOKEN_EXPIRE_MINUTES") {
            self.auth.access_token_expire_minutes = parse("ACCESS_TOKEN_EXPIRE_MINUTES", &v)?;
        }

        if let Some(v) = get("MARKET_DATA_URL") {
            self.market.url = Some(v);
            self.market.provider = MarketProviderKind::Http;
        }
        if let Some(v) = get("EXCHANGE_RATE_URL") {
            self.market.exchange_url = v;
        }

        if let Some(v) = get("LOG_FORMAT") {
            self.logging.format = match v.trim().to_ascii_lowercase().as_str() {
                "json" => LogFormat::Json,
                "pretty" | "text" => LogFormat::Pretty,
                _ => {
                    return Err(ConfigError::InvalidEnv {
                        var: "LOG_FORMAT",
                        value: v,
                    });
                }
            };
        }
        if get("DEBUG").is_some_and(|v| is_truthy(&v)) {
            self.logging.level = "debug".to_string();
        }

        Ok(())
    }
}

fn parse<T: FromStr>(var: &'static str, value: &str) -> Result<T, ConfigError> {
    value.trim().parse().map_err(|_| ConfigError::InvalidEnv {
        var,
        value: value.to_string(),
    })
}

fn is_truthy(value: &str) -> bool {
    matches!(
        value.trim().to_ascii_lowercase().as_str(),
        "1" | "true" | "yes" | "on"
    )
}
