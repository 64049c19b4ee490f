use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, TimeZone, Utc};
use reqwest::Client;
use serde::de::IgnoredAny;
use serde::Deserialize;
use tracing::debug;

use common::{Candle, Error, MarketDataSource, Result, Symbol, Timeframe};

const BASE_URL: &str = "https://api.binance.com";

/// Binance caps one klines request at 1000 rows.
const MAX_KLINES: usize = 1000;

/// REST client for Binance public market data. No API key is needed.
pub struct BinanceClient {
    base_url: String,
    http: Client,
}

impl BinanceClient {
    pub fn new(request_timeout: Duration) -> Result<Self> {
        Self::with_base_url(BASE_URL, request_timeout)
    }

    pub fn with_base_url(base_url: impl Into<String>, request_timeout: Duration) -> Result<Self> {
        let http = Client::builder()
            .use_rustls_tls()
            .timeout(request_timeout)
            .build()
            .map_err(|e| Error::Http(format!("failed to build HTTP client: {e}")))?;
        Ok(Self {
            base_url: base_url.into(),
            http,
        })
    }

    async fn get_klines(&self, pair: &str, interval: &str, limit: usize) -> Result<String> {
        let url = format!("{}/api/v3/klines", self.base_url);
        let limit = limit.clamp(1, MAX_KLINES).to_string();

        let resp = self
            .http
            .get(&url)
            .query(&[("symbol", pair), ("interval", interval), ("limit", limit.as_str())])
            .send()
            .await
            .map_err(|e| Error::DataFetch(format!("{pair} {interval}: {e}")))?;

        let status = resp.status();
        let body = resp
            .text()
            .await
            .map_err(|e| Error::DataFetch(format!("{pair} {interval}: {e}")))?;

        if !status.is_success() {
            return Err(Error::DataFetch(format!("{pair} {interval}: HTTP {status}: {body}")));
        }
        Ok(body)
    }
}

#[async_trait]
impl MarketDataSource for BinanceClient {
    async fn fetch_candles(
        &self,
        symbol: &Symbol,
        timeframe: Timeframe,
        limit: usize,
    ) -> Result<Vec<Candle>> {
        let pair = symbol.exchange_pair();
        debug!(pair = %pair, interval = timeframe.interval(), limit, "Fetching klines");
        let body = self.get_klines(&pair, timeframe.interval(), limit).await?;
        parse_klines(&body).map_err(|e| Error::DataFetch(format!("{pair} {timeframe}: {e}")))
    }
}

// ─── Response types ───────────────────────────────────────────────────────────

/// One klines row: `[open_time, open, high, low, close, volume, close_time,
/// quote_volume, trades, taker_base_volume, taker_quote_volume, unused]`.
/// Prices arrive as strings.
#[derive(Deserialize)]
#[allow(dead_code)]
struct KlineRow(
    i64,
    String,
    String,
    String,
    String,
    String,
    IgnoredAny,
    IgnoredAny,
    IgnoredAny,
    IgnoredAny,
    IgnoredAny,
    IgnoredAny,
);

impl KlineRow {
    fn into_candle(self) -> std::result::Result<Candle, String> {
        let KlineRow(open_time, open, high, low, close, volume, ..) = self;
        let timestamp: DateTime<Utc> = Utc
            .timestamp_millis_opt(open_time)
            .single()
            .ok_or_else(|| format!("invalid open time {open_time}"))?;

        Ok(Candle {
            timestamp,
            open: price(&open, "open")?,
            high: price(&high, "high")?,
            low: price(&low, "low")?,
            close: price(&close, "close")?,
            volume: price(&volume, "volume")?,
        })
    }
}

fn price(raw: &str, field: &str) -> std::result::Result<f64, String> {
    raw.parse::<f64>()
        .map_err(|_| format!("non-numeric {field} {raw:?}"))
}

/// Rows come back oldest first.
fn parse_klines(body: &str) -> std::result::Result<Vec<Candle>, String> {
    let rows: Vec<KlineRow> =
        serde_json::from_str(body).map_err(|e| format!("invalid klines payload: {e}"))?;
    rows.into_iter().map(KlineRow::into_candle).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE: &str = r#"[
        [1499040000000, "0.01634790", "0.80000000", "0.01575800", "0.01577100",
         "148976.11427815", 1499644799999, "2434.19055334", 308, "1756.87402397",
         "28.46694368", "0"],
        [1499040060000, "0.01577100", "0.01600000", "0.01570000", "0.01590000",
         "100.5", 1499644859999, "1.0", 3, "0.5", "0.1", "0"]
    ]"#;

    #[test]
    fn parses_kline_rows_oldest_first() {
        let candles = parse_klines(SAMPLE).unwrap();
        assert_eq!(candles.len(), 2);
        assert_eq!(candles[0].timestamp.timestamp_millis(), 1499040000000);
        assert_eq!(candles[0].open, 0.0163479);
        assert_eq!(candles[0].high, 0.8);
        assert_eq!(candles[0].low, 0.015758);
        assert_eq!(candles[0].close, 0.015771);
        assert_eq!(candles[1].volume, 100.5);
        assert!(candles[0].timestamp < candles[1].timestamp);
    }

    #[test]
    fn rejects_non_numeric_prices() {
        let body = r#"[[1499040000000, "abc", "1", "1", "1", "1", 0, "0", 0, "0", "0", "0"]]"#;
        assert!(parse_klines(body).unwrap_err().contains("open"));
    }

    #[test]
    fn rejects_truncated_rows() {
        let body = r#"[[1499040000000, "1", "1", "1", "1"]]"#;
        assert!(parse_klines(body).unwrap_err().contains("invalid klines payload"));
    }

    #[test]
    fn rejects_error_objects() {
        let body = r#"{"code": -1121, "msg": "Invalid symbol."}"#;
        assert!(parse_klines(body).is_err());
    }

    #[test]
    fn empty_array_is_empty_series() {
        assert!(parse_klines("[]").unwrap().is_empty());
    }
}
