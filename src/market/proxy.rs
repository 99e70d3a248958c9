//! Upstream market data proxy.
//!
//! Fetches the daily series from `market.url` and caches it for
//! `market.cache_ttl_secs`. When the upstream fails and an expired copy is
//! still held, the expired copy is served instead of an error.

use super::{DailyBar, MarketDataProvider, UpstreamError};
use crate::metrics;
use async_trait::async_trait;
use parking_lot::RwLock;
use std::time::{Duration, Instant};
use tracing::{debug, warn};

/// Cached series with fetch time.
#[derive(Debug, Clone)]
struct CachedSeries {
    bars: Vec<DailyBar>,
    fetched_at: Instant,
}

/// Market data provider backed by an upstream JSON endpoint.
pub struct HttpMarketProvider {
    url: String,
    client: reqwest::Client,
    ttl: Duration,
    cache: RwLock<Option<CachedSeries>>,
}

impl HttpMarketProvider {
    pub fn new(url: &str, timeout: Duration, ttl: Duration) -> Self {
        Self {
            url: url.to_string(),
            client: super::http_client(timeout),
            ttl,
            cache: RwLock::new(None),
        }
    }

    fn fresh_cached(&self) -> Option<Vec<DailyBar>> {
        let cache = self.cache.read();
        cache
            .as_ref()
            .filter(|c| c.fetched_at.elapsed() < self.ttl)
            .map(|c| c.bars.clone())
    }

    async fn fetch(&self) -> Result<Vec<DailyBar>, UpstreamError> {
        let response = self.client.get(&self.url).send().await?;
        let status = response.status();
        if !status.is_success() {
            return Err(UpstreamError::Status(status.as_u16()));
        }
        let bars: Vec<DailyBar> = response
            .json()
            .await
            .map_err(|e| UpstreamError::Payload(e.to_string()))?;
        Ok(bars)
    }
}

#[async_trait]
impl MarketDataProvider for HttpMarketProvider {
    fn name(&self) -> &'static str {
        "http"
    }

    async fn daily_bars(&self) -> Result<Vec<DailyBar>, UpstreamError> {
        if let Some(bars) = self.fresh_cached() {
            debug!(url = %self.url, "Market data cache hit");
            return Ok(bars);
        }

        match self.fetch().await {
            Ok(bars) => {
                debug!(url = %self.url, count = bars.len(), "Market data fetched");
                *self.cache.write() = Some(CachedSeries {
                    bars: bars.clone(),
                    fetched_at: Instant::now(),
                });
                Ok(bars)
            }
            Err(e) => {
                metrics::record_upstream_error("market");
                let stale = self.cache.read().as_ref().map(|c| c.bars.clone());
                match stale {
                    Some(bars) => {
                        warn!(url = %self.url, error = %e, "Upstream failed, serving stale market data");
                        Ok(bars)
                    }
                    None => Err(e),
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::StatusCode;
    use axum::response::IntoResponse;
    use axum::{Json, Router, routing::get};
    use std::sync::Arc;
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn bar(date: &str) -> DailyBar {
        DailyBar {
            date: date.into(),
            open: 1.0,
            high: 2.0,
            low: 0.5,
            close: 1.5,
            volume: 10,
        }
    }

    /// Upstream that answers the first `ok_responses` calls, then fails.
    async fn spawn_upstream(ok_responses: usize) -> (String, Arc<AtomicUsize>) {
        let hits = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&hits);
        let app = Router::new().route(
            "/bars",
            get(move || {
                let counter = Arc::clone(&counter);
                async move {
                    let n = counter.fetch_add(1, Ordering::SeqCst);
                    if n < ok_responses {
                        Json(vec![bar("2024-09-05"), bar("2024-09-06")]).into_response()
                    } else {
                        StatusCode::SERVICE_UNAVAILABLE.into_response()
                    }
                }
            }),
        );
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            let _ = axum::serve(listener, app).await;
        });
        (format!("http://{addr}/bars"), hits)
    }

    #[tokio::test]
    async fn test_fetch_and_cache() {
        let (url, hits) = spawn_upstream(usize::MAX).await;
        let provider =
            HttpMarketProvider::new(&url, Duration::from_secs(2), Duration::from_secs(60));

        let bars = provider.daily_bars().await.unwrap();
        assert_eq!(bars.len(), 2);
        let again = provider.daily_bars().await.unwrap();
        assert_eq!(again, bars);
        assert_eq!(hits.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_stale_cache_on_upstream_failure() {
        let (url, hits) = spawn_upstream(1).await;
        let provider = HttpMarketProvider::new(&url, Duration::from_secs(2), Duration::ZERO);

        let first = provider.daily_bars().await.unwrap();
        let second = provider.daily_bars().await.unwrap();
        assert_eq!(first, second);
        assert_eq!(hits.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_error_without_cache() {
        let (url, _) = spawn_upstream(0).await;
        let provider =
            HttpMarketProvider::new(&url, Duration::from_secs(2), Duration::from_secs(60));
        let err = provider.daily_bars().await.unwrap_err();
        assert!(matches!(err, UpstreamError::Status(503)));
    }
}
