//! Market data sources.
//!
//! `/consultar` is served by a [`MarketDataProvider`]; which one is chosen by
//! `market.provider`:
//! - [`StaticBovespaProvider`]: built-in Ibovespa daily series
//! - [`HttpMarketProvider`]: proxy of an upstream JSON endpoint with a TTL cache
//!
//! `/cambio` is served by the [`ExchangeRateClient`].

mod bovespa;
mod exchange;
mod proxy;

pub use bovespa::StaticBovespaProvider;
pub use exchange::{ExchangeRate, ExchangeRateClient};
pub use proxy::HttpMarketProvider;

use crate::config::{MarketConfig, MarketProviderKind};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;

/// User agent sent to every upstream.
const USER_AGENT: &str = concat!("bovespa-api/", env!("CARGO_PKG_VERSION"));

/// Upstream call errors.
#[derive(Debug, Error)]
pub enum UpstreamError {
    #[error("request failed: {0}")]
    Request(#[from] reqwest::Error),
    #[error("upstream returned status {0}")]
    Status(u16),
    #[error("unexpected payload: {0}")]
    Payload(String),
}

/// One trading day of the index.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DailyBar {
    #[serde(rename = "Date")]
    pub date: String,
    #[serde(rename = "Open")]
    pub open: f64,
    #[serde(rename = "High")]
    pub high: f64,
    #[serde(rename = "Low")]
    pub low: f64,
    #[serde(rename = "Close")]
    pub close: f64,
    #[serde(rename = "Volume")]
    pub volume: u64,
}

/// Source of the daily series returned by `/consultar`.
#[async_trait]
pub trait MarketDataProvider: Send + Sync {
    /// Short name for logs and metrics.
    fn name(&self) -> &'static str;

    /// Daily bars, oldest first.
    async fn daily_bars(&self) -> Result<Vec<DailyBar>, UpstreamError>;
}

/// Build the provider selected by configuration.
pub fn build_provider(config: &MarketConfig) -> Arc<dyn MarketDataProvider> {
    match (config.provider, config.url.as_deref()) {
        (MarketProviderKind::Http, Some(url)) => Arc::new(HttpMarketProvider::new(
            url,
            Duration::from_secs(config.timeout_secs),
            Duration::from_secs(config.cache_ttl_secs),
        )),
        _ => Arc::new(StaticBovespaProvider),
    }
}

/// Shared HTTP client for upstream calls.
pub(crate) fn http_client(timeout: Duration) -> reqwest::Client {
    reqwest::Client::builder()
        .timeout(timeout)
        .user_agent(USER_AGENT)
        .build()
        .unwrap_or_else(|_| reqwest::Client::new())
}
