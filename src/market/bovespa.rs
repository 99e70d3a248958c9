//! Built-in Ibovespa daily series.

use super::{DailyBar, MarketDataProvider, UpstreamError};
use async_trait::async_trait;

/// (date, open, high, low, close, volume)
const SERIES: [(&str, f64, f64, f64, f64, u64); 8] = [
    ("2024-09-05", 136112.0, 136656.0, 135959.0, 136502.0, 7528700),
    ("2024-09-06", 136508.0, 136653.0, 134476.0, 134572.0, 7563300),
    ("2024-09-09", 134574.0, 135250.0, 134399.0, 134737.0, 6587600),
    ("2024-09-10", 134738.0, 134738.0, 133754.0, 134320.0, 8253500),
    ("2024-09-11", 134319.0, 135087.0, 133757.0, 134677.0, 7947300),
    ("2024-09-12", 134677.0, 134777.0, 133591.0, 134029.0, 7004900),
    ("2024-09-13", 134031.0, 135879.0, 134031.0, 134882.0, 8866000),
    ("2024-09-16", 134885.0, 135715.0, 134870.0, 135118.0, 6707000),
];

/// Serves a fixed series without touching the network.
#[derive(Debug, Clone, Copy, Default)]
pub struct StaticBovespaProvider;

#[async_trait]
impl MarketDataProvider for StaticBovespaProvider {
    fn name(&self) -> &'static str {
        "static"
    }

    async fn daily_bars(&self) -> Result<Vec<DailyBar>, UpstreamError> {
        Ok(SERIES
            .iter()
            .map(|&(date, open, high, low, close, volume)| DailyBar {
                date: date.to_string(),
                open,
                high,
                low,
                close,
                volume,
            })
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_series_is_ordered_and_consistent() {
        let bars = StaticBovespaProvider.daily_bars().await.unwrap();
        assert_eq!(bars.len(), 8);
        assert_eq!(bars[0].date, "2024-09-05");
        assert_eq!(bars[7].date, "2024-09-16");

        assert!(bars.windows(2).all(|w| w[0].date < w[1].date));
        for bar in &bars {
            assert!(bar.low <= bar.open && bar.open <= bar.high, "{}", bar.date);
            assert!(bar.low <= bar.close && bar.close <= bar.high, "{}", bar.date);
            assert!(bar.volume > 0);
        }
    }
}
