//! Shared application state.
//!
//! One [`AppState`] is built at startup and cloned into every request
//! handler. Every field is behind an `Arc`, so cloning is cheap.

use crate::auth::token::TokenError;
use crate::auth::{Algorithm, AuthService, TokenIssuer};
use crate::config::{Config, CorsConfig};
use crate::db::UserStore;
use crate::market::{self, ExchangeRateClient, MarketDataProvider};
use crate::security::AuthRateLimiter;
use std::sync::Arc;
use std::time::Duration;

#[derive(Clone)]
pub struct AppState {
    pub users: Arc<dyn UserStore>,
    pub auth: Arc<AuthService>,
    pub market: Arc<dyn MarketDataProvider>,
    pub exchange: Arc<ExchangeRateClient>,
    pub limiter: Arc<AuthRateLimiter>,
    pub cors: Arc<CorsConfig>,
}

impl AppState {
    /// Wire every service from configuration.
    ///
    /// The JWT secret must already be resolved; an unset secret is
    /// [`TokenError::InvalidKey`].
    pub fn new(config: &Config, users: Arc<dyn UserStore>) -> Result<Self, TokenError> {
        let algorithm: Algorithm = config.auth.algorithm.parse()?;
        let secret = config.auth.jwt_secret.as_deref().ok_or(TokenError::InvalidKey)?;
        let tokens = TokenIssuer::new(secret, algorithm, config.auth.access_token_expire_minutes);

        Ok(Self {
            auth: Arc::new(AuthService::new(Arc::clone(&users), tokens)),
            users,
            market: market::build_provider(&config.market),
            exchange: Arc::new(ExchangeRateClient::new(
                &config.market.exchange_url,
                Duration::from_secs(config.market.timeout_secs),
            )),
            limiter: Arc::new(AuthRateLimiter::new(&config.security)),
            cors: Arc::new(config.cors.clone()),
        })
    }
}
