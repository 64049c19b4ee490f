use async_trait::async_trait;

use crate::{Candle, ChartImage, ChartSet, ChatTarget, Result, Symbol, Timeframe};

/// Source of OHLCV candles.
///
/// `BinanceClient` implements this against the public REST API.
/// Implementations return candles oldest first and map every failure
/// to `Error::DataFetch`.
#[async_trait]
pub trait MarketDataSource: Send + Sync {
    /// Fetch the most recent `limit` candles for `symbol` at `timeframe`.
    async fn fetch_candles(
        &self,
        symbol: &Symbol,
        timeframe: Timeframe,
        limit: usize,
    ) -> Result<Vec<Candle>>;
}

/// Turns a candle series into an image the classifier can look at.
pub trait ChartRenderer: Send + Sync {
    fn render(&self, symbol: &Symbol, timeframe: Timeframe, candles: &[Candle])
        -> Result<ChartImage>;
}

/// Hosted multimodal model: instruction plus four charts in, free text out.
#[async_trait]
pub trait VisionClassifier: Send + Sync {
    async fn classify(&self, prompt: &str, charts: &ChartSet) -> Result<String>;
}

/// Chat transport. The `Dispatcher` in `crates/engine` is its only caller,
/// for both signals and the heartbeat ping.
#[async_trait]
pub trait Notifier: Send + Sync {
    async fn send_sticker(&self, channel: &ChatTarget, sticker_id: &str) -> Result<()>;

    async fn send_message(&self, channel: &ChatTarget, text: &str) -> Result<()>;
}
