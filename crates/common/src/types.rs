use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use crate::Error;

/// One OHLCV interval as returned by the exchange.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Candle {
    /// Open time of the interval.
    pub timestamp: DateTime<Utc>,
    pub open: f64,
    pub high: f64,
    pub low: f64,
    pub close: f64,
    pub volume: f64,
}

/// A market identifier in `BASE/QUOTE` form, e.g. `BTC/USDT`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Symbol {
    base: String,
    quote: String,
}

impl Symbol {
    pub fn new(base: &str, quote: &str) -> Result<Self, Error> {
        let base = base.trim();
        let quote = quote.trim();
        if base.is_empty() || quote.is_empty() {
            return Err(Error::Config(format!(
                "symbol needs both base and quote, got '{base}/{quote}'"
            )));
        }
        Ok(Self {
            base: base.to_uppercase(),
            quote: quote.to_uppercase(),
        })
    }

    pub fn base(&self) -> &str {
        &self.base
    }

    pub fn quote(&self) -> &str {
        &self.quote
    }

    /// Concatenated form used by the exchange REST API (`BTCUSDT`).
    pub fn exchange_pair(&self) -> String {
        format!("{}{}", self.base, self.quote)
    }

    /// Presentation form with the separator replaced by a space (`BTC USDT`).
    pub fn display_name(&self) -> String {
        format!("{} {}", self.base, self.quote)
    }
}

impl FromStr for Symbol {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let mut parts = s.split('/');
        match (parts.next(), parts.next(), parts.next()) {
            (Some(base), Some(quote), None) => Symbol::new(base, quote),
            _ => Err(Error::Config(format!(
                "symbol must look like BASE/QUOTE, got '{s}'"
            ))),
        }
    }
}

impl TryFrom<String> for Symbol {
    type Error = Error;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<Symbol> for String {
    fn from(symbol: Symbol) -> Self {
        symbol.to_string()
    }
}

impl fmt::Display for Symbol {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.base, self.quote)
    }
}

/// Candle interval used for one chart of the analysis set.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Timeframe {
    H4,
    H1,
    M15,
    M5,
}

impl Timeframe {
    /// Order in which charts are captured and handed to the classifier.
    pub const ANALYSIS_ORDER: [Timeframe; 4] =
        [Timeframe::H4, Timeframe::H1, Timeframe::M15, Timeframe::M5];

    /// Interval string understood by the exchange.
    pub fn interval(&self) -> &'static str {
        match self {
            Timeframe::H4 => "4h",
            Timeframe::H1 => "1h",
            Timeframe::M15 => "15m",
            Timeframe::M5 => "5m",
        }
    }
}

impl fmt::Display for Timeframe {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.interval())
    }
}

/// A rendered chart, opaque to everything except the classifier.
#[derive(Debug, Clone)]
pub struct ChartImage {
    pub timeframe: Timeframe,
    pub mime_type: &'static str,
    pub bytes: Vec<u8>,
}

/// The four charts of one symbol, in `Timeframe::ANALYSIS_ORDER`.
#[derive(Debug, Clone)]
pub struct ChartSet {
    pub symbol: Symbol,
    pub captured_at: DateTime<Utc>,
    charts: [ChartImage; 4],
}

impl ChartSet {
    /// Fails if the charts are not in analysis order.
    pub fn new(
        symbol: Symbol,
        captured_at: DateTime<Utc>,
        charts: [ChartImage; 4],
    ) -> Result<Self, Error> {
        let in_order = charts
            .iter()
            .zip(Timeframe::ANALYSIS_ORDER)
            .all(|(chart, tf)| chart.timeframe == tf);
        if !in_order {
            return Err(Error::Render(format!(
                "chart set for {symbol} is not in 4h/1h/15m/5m order"
            )));
        }
        Ok(Self {
            symbol,
            captured_at,
            charts,
        })
    }

    pub fn charts(&self) -> &[ChartImage; 4] {
        &self.charts
    }
}

/// Direction of an actionable decision.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum TradeSide {
    Buy,
    Sell,
}

impl fmt::Display for TradeSide {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TradeSide::Buy => write!(f, "BUY"),
            TradeSide::Sell => write!(f, "SELL"),
        }
    }
}

/// The three-way decision the classifier is asked for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Decision {
    Buy,
    Sell,
    Wait,
}

impl fmt::Display for Decision {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Decision::Buy => write!(f, "BUY"),
            Decision::Sell => write!(f, "SELL"),
            Decision::Wait => write!(f, "WAIT"),
        }
    }
}

/// Where a take-profit level came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TargetSource {
    /// Supplied by the classifier.
    Model,
    /// Synthesized from the entry by the fallback offsets.
    Default,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TakeProfit {
    pub price: f64,
    pub source: TargetSource,
}

/// A validated BUY or SELL setup. `entry` is always finite and positive.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TradeSetup {
    pub side: TradeSide,
    pub entry: f64,
    pub stop_loss: f64,
    pub take_profits: [TakeProfit; 4],
    pub reason: Option<String>,
}

impl TradeSetup {
    pub fn final_target(&self) -> f64 {
        self.take_profits[3].price
    }
}

/// Parsed classifier output.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum TradeDecision {
    Wait { reason: Option<String> },
    Trade(TradeSetup),
}

impl TradeDecision {
    pub fn decision(&self) -> Decision {
        match self {
            TradeDecision::Wait { .. } => Decision::Wait,
            TradeDecision::Trade(setup) => match setup.side {
                TradeSide::Buy => Decision::Buy,
                TradeSide::Sell => Decision::Sell,
            },
        }
    }

    pub fn reason(&self) -> Option<&str> {
        match self {
            TradeDecision::Wait { reason } => reason.as_deref(),
            TradeDecision::Trade(setup) => setup.reason.as_deref(),
        }
    }
}

/// Final text sent to the channel for one signal.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NotificationMessage(String);

impl NotificationMessage {
    pub fn new(text: impl Into<String>) -> Self {
        Self(text.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for NotificationMessage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Whether the scanner is currently looping over candidates.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum ScannerMode {
    #[default]
    Idle,
    Scanning,
}

impl fmt::Display for ScannerMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ScannerMode::Idle => write!(f, "idle"),
            ScannerMode::Scanning => write!(f, "scanning"),
        }
    }
}

/// Commands sent to the scanner via the command channel.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ScannerCommand {
    Start,
    Stop,
    /// Watchlist edits take effect from the next candidate selection.
    AddSymbol(Symbol),
    RemoveSymbol(Symbol),
}

/// Snapshot published by the scanner for status queries.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ScannerStatus {
    pub mode: ScannerMode,
    pub signals_today: u32,
    /// UTC date `signals_today` was counted on.
    pub signals_date: Option<NaiveDate>,
    pub daily_cap: u32,
    pub cycles_completed: u64,
    pub last_cycle_at: Option<DateTime<Utc>>,
    /// Symbols the selector draws candidates from, in scan order.
    pub watchlist: Vec<Symbol>,
}

impl ScannerStatus {
    /// Signals sent on `today`. A count published on an earlier date reads as 0.
    pub fn signals_on(&self, today: NaiveDate) -> u32 {
        if self.signals_date == Some(today) {
            self.signals_today
        } else {
            0
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn png(tf: Timeframe) -> ChartImage {
        ChartImage {
            timeframe: tf,
            mime_type: "image/png",
            bytes: vec![1, 2, 3],
        }
    }

    #[test]
    fn symbol_parses_and_normalizes_case() {
        let s: Symbol = "btc/usdt".parse().unwrap();
        assert_eq!(s.base(), "BTC");
        assert_eq!(s.quote(), "USDT");
        assert_eq!(s.to_string(), "BTC/USDT");
        assert_eq!(s.exchange_pair(), "BTCUSDT");
        assert_eq!(s.display_name(), "BTC USDT");
    }

    #[test]
    fn symbol_rejects_malformed_strings() {
        for bad in ["BTCUSDT", "BTC/", "/USDT", "A/B/C", ""] {
            assert!(bad.parse::<Symbol>().is_err(), "'{bad}' should be rejected");
        }
    }

    #[test]
    fn symbol_serializes_as_plain_string() {
        let s: Symbol = "ETH/USDT".parse().unwrap();
        let json = serde_json::to_string(&s).unwrap();
        assert_eq!(json, "\"ETH/USDT\"");
        let back: Symbol = serde_json::from_str(&json).unwrap();
        assert_eq!(back, s);
    }

    #[test]
    fn chart_set_requires_analysis_order() {
        let symbol: Symbol = "SOL/USDT".parse().unwrap();
        let ordered = Timeframe::ANALYSIS_ORDER.map(png);
        assert!(ChartSet::new(symbol.clone(), Utc::now(), ordered).is_ok());

        let shuffled = [
            png(Timeframe::H1),
            png(Timeframe::H4),
            png(Timeframe::M15),
            png(Timeframe::M5),
        ];
        assert!(ChartSet::new(symbol, Utc::now(), shuffled).is_err());
    }

    #[test]
    fn trade_decision_reports_three_way_decision() {
        let wait = TradeDecision::Wait { reason: None };
        assert_eq!(wait.decision(), Decision::Wait);

        let tp = TakeProfit { price: 1.0, source: TargetSource::Model };
        let sell = TradeDecision::Trade(TradeSetup {
            side: TradeSide::Sell,
            entry: 2.0,
            stop_loss: 2.1,
            take_profits: [tp; 4],
            reason: Some("sweep".into()),
        });
        assert_eq!(sell.decision(), Decision::Sell);
        assert_eq!(sell.reason(), Some("sweep"));
    }

    #[test]
    fn signal_count_from_an_earlier_day_reads_as_zero() {
        let day = NaiveDate::from_ymd_opt(2025, 3, 1).unwrap();
        let status = ScannerStatus {
            signals_today: 4,
            signals_date: Some(day),
            ..Default::default()
        };
        assert_eq!(status.signals_on(day), 4);
        assert_eq!(status.signals_on(day.succ_opt().unwrap()), 0);
        assert_eq!(ScannerStatus::default().signals_on(day), 0);
    }
}
