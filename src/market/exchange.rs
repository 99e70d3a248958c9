//! USD-BRL exchange rate client.
//!
//! Reads the AwesomeAPI "last quote" payload:
//! `{"USDBRL": {"bid": "5.4321", "create_date": "2024-09-16 17:59:59", ...}}`.

use super::UpstreamError;
use crate::metrics;
use serde::Serialize;
use serde_json::Value;
use std::time::Duration;

/// Latest USD→BRL quote.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ExchangeRate {
    pub date: String,
    pub rate: f64,
}

/// Client for the exchange rate upstream.
#[derive(Debug, Clone)]
pub struct ExchangeRateClient {
    url: String,
    client: reqwest::Client,
}

impl ExchangeRateClient {
    pub fn new(url: &str, timeout: Duration) -> Self {
        Self {
            url: url.to_string(),
            client: super::http_client(timeout),
        }
    }

    /// Fetch the latest quote.
    pub async fn usd_brl(&self) -> Result<ExchangeRate, UpstreamError> {
        let result = self.fetch().await;
        if result.is_err() {
            metrics::record_upstream_error("exchange");
        }
        result
    }

    async fn fetch(&self) -> Result<ExchangeRate, UpstreamError> {
        let response = self.client.get(&self.url).send().await?;
        let status = response.status();
        if !status.is_success() {
            return Err(UpstreamError::Status(status.as_u16()));
        }
        let body: Value = response
            .json()
            .await
            .map_err(|e| UpstreamError::Payload(e.to_string()))?;
        parse_quote(&body)
    }
}

/// Extract the quote from an AwesomeAPI payload.
///
/// A payload without a `USDBRL` object yields rate 0 stamped with the current
/// time; a `bid` that is present but not numeric is an error.
pub fn parse_quote(body: &Value) -> Result<ExchangeRate, UpstreamError> {
    let quote = body.get("USDBRL").and_then(Value::as_object);

    let date = quote
        .and_then(|q| q.get("create_date"))
        .and_then(Value::as_str)
        .map(str::to_string)
        .unwrap_or_else(|| chrono::Utc::now().to_rfc3339());

    let rate = match quote.and_then(|q| q.get("bid")) {
        None | Some(Value::Null) => 0.0,
        Some(Value::Number(n)) => n
            .as_f64()
            .ok_or_else(|| UpstreamError::Payload(format!("bid out of range: {n}")))?,
        Some(Value::String(s)) => s
            .trim()
            .parse()
            .map_err(|_| UpstreamError::Payload(format!("bid is not a number: {s:?}")))?,
        Some(other) => {
            return Err(UpstreamError::Payload(format!("unexpected bid: {other}")));
        }
    };

    Ok(ExchangeRate { date, rate })
}
