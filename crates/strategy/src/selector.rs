use std::time::Duration;

use tracing::{debug, info, warn};

use common::{Error, MarketDataSource, Result, Symbol, Timeframe};

use crate::config::{SelectionConfig, SelectionPolicy};
use crate::indicators::WickSweepIndicator;

/// Chooses which symbols are analyzed in a cycle.
pub struct CandidateSelector {
    config: SelectionConfig,
    indicator: WickSweepIndicator,
    fetch_timeout: Duration,
}

impl CandidateSelector {
    pub fn new(config: SelectionConfig, fetch_timeout: Duration) -> Self {
        Self {
            config,
            indicator: WickSweepIndicator::default(),
            fetch_timeout,
        }
    }

    pub fn policy(&self) -> SelectionPolicy {
        self.config.policy
    }

    /// Symbols candidates are drawn from, in scan order.
    pub fn watchlist(&self) -> &[Symbol] {
        &self.config.symbols
    }

    /// Append `symbol` unless it is already listed. Returns whether it was added.
    pub fn add_symbol(&mut self, symbol: Symbol) -> bool {
        if self.config.symbols.contains(&symbol) {
            return false;
        }
        info!(pair = %symbol, "Symbol added to watchlist");
        self.config.symbols.push(symbol);
        true
    }

    /// Returns whether `symbol` was listed.
    pub fn remove_symbol(&mut self, symbol: &Symbol) -> bool {
        let before = self.config.symbols.len();
        self.config.symbols.retain(|s| s != symbol);
        let removed = self.config.symbols.len() < before;
        if removed {
            info!(pair = %symbol, "Symbol removed from watchlist");
        }
        removed
    }

    /// Ordered candidates for this cycle, at most `max_candidates` long.
    pub async fn select(&self, source: &dyn MarketDataSource) -> Vec<Symbol> {
        let candidates = match self.config.policy {
            SelectionPolicy::Static => self
                .config
                .symbols
                .iter()
                .take(self.config.max_candidates)
                .cloned()
                .collect(),
            SelectionPolicy::Heuristic => self.scan_for_sweeps(source).await,
        };
        info!(
            policy = ?self.config.policy,
            count = candidates.len(),
            candidates = ?candidates.iter().map(ToString::to_string).collect::<Vec<_>>(),
            "Candidates selected"
        );
        candidates
    }

    async fn scan_for_sweeps(&self, source: &dyn MarketDataSource) -> Vec<Symbol> {
        info!(universe = self.config.symbols.len(), "Scanning market for sweeps");
        let mut candidates = Vec::new();

        for symbol in &self.config.symbols {
            if candidates.len() >= self.config.max_candidates {
                break;
            }
            match self.is_candidate(source, symbol).await {
                Ok(true) => {
                    info!(pair = %symbol, "Found candidate");
                    candidates.push(symbol.clone());
                }
                Ok(false) => debug!(pair = %symbol, "No sweep on latest 1h candle"),
                Err(e) => {
                    warn!(pair = %symbol, error = %e, "Skipping symbol in candidate scan");
                }
            }
        }
        candidates
    }

    async fn is_candidate(&self, source: &dyn MarketDataSource, symbol: &Symbol) -> Result<bool> {
        let fetch = source.fetch_candles(symbol, Timeframe::H1, self.config.lookback);
        let candles = tokio::time::timeout(self.fetch_timeout, fetch)
            .await
            .map_err(|_| Error::Timeout {
                what: format!("1h candles for {symbol}"),
                secs: self.fetch_timeout.as_secs(),
            })??;

        self.indicator
            .latest(&candles)
            .ok_or_else(|| Error::DataFetch(format!("no 1h candles returned for {symbol}")))
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use async_trait::async_trait;
    use chrono::Utc;
    use common::Candle;

    use super::*;

    /// Returns one canned 1h candle per base asset; unknown bases fail.
    struct CannedSource {
        candles: HashMap<String, Vec<Candle>>,
    }

    #[async_trait]
    impl MarketDataSource for CannedSource {
        async fn fetch_candles(
            &self,
            symbol: &Symbol,
            timeframe: Timeframe,
            _limit: usize,
        ) -> Result<Vec<Candle>> {
            assert_eq!(timeframe, Timeframe::H1);
            self.candles
                .get(symbol.base())
                .cloned()
                .ok_or_else(|| Error::DataFetch(format!("unknown symbol {symbol}")))
        }
    }

    fn sweep() -> Vec<Candle> {
        vec![candle(100.0, 110.0, 90.0, 100.0)]
    }

    fn trend() -> Vec<Candle> {
        vec![candle(100.0, 110.0, 100.0, 110.0)]
    }

    fn candle(open: f64, high: f64, low: f64, close: f64) -> Candle {
        Candle {
            timestamp: Utc::now(),
            open,
            high,
            low,
            close,
            volume: 1.0,
        }
    }

    fn symbols(list: &[&str]) -> Vec<Symbol> {
        list.iter().map(|s| s.parse().unwrap()).collect()
    }

    fn selector(policy: SelectionPolicy, universe: &[&str], max: usize) -> CandidateSelector {
        CandidateSelector::new(
            SelectionConfig {
                policy,
                max_candidates: max,
                lookback: 50,
                symbols: symbols(universe),
            },
            Duration::from_secs(5),
        )
    }

    #[tokio::test]
    async fn static_policy_returns_list_verbatim_up_to_cap() {
        let source = CannedSource { candles: HashMap::new() };
        let sel = selector(
            SelectionPolicy::Static,
            &["ETH/USDT", "BTC/USDT", "SOL/USDT"],
            2,
        );
        let picked = sel.select(&source).await;
        assert_eq!(picked, symbols(&["ETH/USDT", "BTC/USDT"]));
    }

    #[tokio::test]
    async fn heuristic_keeps_sweeps_in_scan_order_and_skips_failures() {
        let source = CannedSource {
            candles: HashMap::from([
                ("BTC".to_string(), trend()),
                ("ETH".to_string(), sweep()),
                ("XRP".to_string(), sweep()),
                ("ADA".to_string(), vec![]),
            ]),
        };
        let sel = selector(
            SelectionPolicy::Heuristic,
            &["BTC/USDT", "ETH/USDT", "NOPE/USDT", "ADA/USDT", "XRP/USDT"],
            5,
        );
        let picked = sel.select(&source).await;
        assert_eq!(picked, symbols(&["ETH/USDT", "XRP/USDT"]));
    }

    #[tokio::test]
    async fn watchlist_edits_apply_to_the_next_selection() {
        let source = CannedSource { candles: HashMap::new() };
        let mut sel = selector(SelectionPolicy::Static, &["BTC/USDT", "ETH/USDT"], 5);

        assert!(sel.add_symbol("SOL/USDT".parse().unwrap()));
        assert!(!sel.add_symbol("BTC/USDT".parse().unwrap()));
        assert!(sel.remove_symbol(&"BTC/USDT".parse().unwrap()));
        assert!(!sel.remove_symbol(&"XRP/USDT".parse().unwrap()));

        assert_eq!(sel.watchlist(), symbols(&["ETH/USDT", "SOL/USDT"]).as_slice());
        assert_eq!(sel.select(&source).await, symbols(&["ETH/USDT", "SOL/USDT"]));
    }

    #[tokio::test]
    async fn heuristic_stops_at_cap() {
        let source = CannedSource {
            candles: HashMap::from([
                ("A".to_string(), sweep()),
                ("B".to_string(), sweep()),
                ("C".to_string(), sweep()),
            ]),
        };
        let sel = selector(SelectionPolicy::Heuristic, &["A/USDT", "B/USDT", "C/USDT"], 2);
        let picked = sel.select(&source).await;
        assert_eq!(picked, symbols(&["A/USDT", "B/USDT"]));
    }
}
