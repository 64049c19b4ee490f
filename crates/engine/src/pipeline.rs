use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use tracing::debug;

use common::{
    ChartRenderer, ChartSet, Error, MarketDataSource, Result, Symbol, Timeframe, TradeDecision,
    VisionClassifier,
};
use strategy::{parse_signal, PacingConfig, CLASSIFIER_PROMPT};

/// Fetch → render × 4 → classify → parse for a single symbol.
///
/// Every failure comes back as a typed `Error`; the orchestrator decides what
/// each kind means.
pub struct SignalPipeline {
    source: Arc<dyn MarketDataSource>,
    renderer: Arc<dyn ChartRenderer>,
    classifier: Arc<dyn VisionClassifier>,
    chart_candles: usize,
    fetch_timeout: Duration,
    classify_timeout: Duration,
}

impl SignalPipeline {
    pub fn new(
        source: Arc<dyn MarketDataSource>,
        renderer: Arc<dyn ChartRenderer>,
        classifier: Arc<dyn VisionClassifier>,
        pacing: &PacingConfig,
    ) -> Self {
        Self {
            source,
            renderer,
            classifier,
            chart_candles: pacing.chart_candles,
            fetch_timeout: pacing.fetch_timeout(),
            classify_timeout: pacing.classify_timeout(),
        }
    }

    pub async fn evaluate(&self, symbol: &Symbol) -> Result<TradeDecision> {
        let charts = self.capture(symbol).await?;

        let raw = bounded(
            self.classify_timeout,
            format!("classification of {symbol}"),
            self.classifier.classify(CLASSIFIER_PROMPT, &charts),
        )
        .await?;
        debug!(pair = %symbol, response = %raw, "Classifier response");

        parse_signal(&raw)
    }

    /// One chart per timeframe, in analysis order.
    async fn capture(&self, symbol: &Symbol) -> Result<ChartSet> {
        let captured_at = Utc::now();
        let mut charts = Vec::with_capacity(Timeframe::ANALYSIS_ORDER.len());

        for timeframe in Timeframe::ANALYSIS_ORDER {
            let candles = bounded(
                self.fetch_timeout,
                format!("{timeframe} candles for {symbol}"),
                self.source.fetch_candles(symbol, timeframe, self.chart_candles),
            )
            .await?;
            if candles.is_empty() {
                return Err(Error::DataFetch(format!(
                    "no {timeframe} candles returned for {symbol}"
                )));
            }
            charts.push(self.renderer.render(symbol, timeframe, &candles)?);
        }

        let charts = charts
            .try_into()
            .map_err(|_| Error::Render(format!("incomplete chart set for {symbol}")))?;
        ChartSet::new(symbol.clone(), captured_at, charts)
    }
}

async fn bounded<T>(
    limit: Duration,
    what: String,
    fut: impl Future<Output = Result<T>>,
) -> Result<T> {
    tokio::time::timeout(limit, fut)
        .await
        .map_err(|_| Error::Timeout {
            what,
            secs: limit.as_secs(),
        })?
}
