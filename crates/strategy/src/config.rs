use std::path::Path;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tracing::warn;

use common::{Error, Result, Symbol};

/// Top-level scanner config file (TOML). Every section and key is optional.
///
/// Example `config/scanner.toml`:
/// ```toml
/// [selection]
/// policy = "static"
/// max_candidates = 3
/// symbols = ["BTC/USDT", "ETH/USDT", "SOL/USDT"]
///
/// [pacing]
/// symbol_cooldown_secs = 30
/// cycle_interval_secs = 60
///
/// [signals]
/// daily_cap = 10
/// sticker_id = "CAACAgIAAxkBAAEB"
///
/// [run]
/// autostart = true
/// ```
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(default)]
pub struct ScannerFileConfig {
    pub selection: SelectionConfig,
    pub pacing: PacingConfig,
    pub signals: SignalConfig,
    pub run: RunConfig,
}

/// How candidates are chosen each cycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum SelectionPolicy {
    /// Scan the configured list verbatim.
    Static,
    /// Keep only symbols whose latest 1h candle is dominated by its wick.
    #[default]
    Heuristic,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct SelectionConfig {
    pub policy: SelectionPolicy,
    pub max_candidates: usize,
    /// Number of 1h candles fetched per symbol by the heuristic policy.
    pub lookback: usize,
    /// Watchlist for the static policy, universe for the heuristic one.
    pub symbols: Vec<Symbol>,
}

impl Default for SelectionConfig {
    fn default() -> Self {
        Self {
            policy: SelectionPolicy::default(),
            max_candidates: 5,
            lookback: 50,
            symbols: default_universe(),
        }
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct PacingConfig {
    pub symbol_cooldown_secs: u64,
    pub cycle_interval_secs: u64,
    pub sticker_delay_secs: u64,
    pub fetch_timeout_secs: u64,
    pub classify_timeout_secs: u64,
    /// Candles per chart.
    pub chart_candles: usize,
}

impl Default for PacingConfig {
    fn default() -> Self {
        Self {
            symbol_cooldown_secs: 30,
            cycle_interval_secs: 60,
            sticker_delay_secs: 5,
            fetch_timeout_secs: 15,
            classify_timeout_secs: 120,
            chart_candles: 100,
        }
    }
}

impl PacingConfig {
    pub fn symbol_cooldown(&self) -> Duration {
        Duration::from_secs(self.symbol_cooldown_secs)
    }

    pub fn cycle_interval(&self) -> Duration {
        Duration::from_secs(self.cycle_interval_secs)
    }

    pub fn sticker_delay(&self) -> Duration {
        Duration::from_secs(self.sticker_delay_secs)
    }

    pub fn fetch_timeout(&self) -> Duration {
        Duration::from_secs(self.fetch_timeout_secs)
    }

    pub fn classify_timeout(&self) -> Duration {
        Duration::from_secs(self.classify_timeout_secs)
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct SignalConfig {
    /// Maximum signals forwarded per UTC day.
    pub daily_cap: u32,
    /// Sticker sent ahead of each signal. `None` sends the text only.
    pub sticker_id: Option<String>,
    /// Send a short status message after every cycle.
    pub heartbeat: bool,
}

impl Default for SignalConfig {
    fn default() -> Self {
        Self {
            daily_cap: 10,
            sticker_id: None,
            heartbeat: false,
        }
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct RunConfig {
    /// Start scanning without waiting for /start.
    pub autostart: bool,
    /// Run one cycle and exit.
    pub single_pass: bool,
}

impl Default for RunConfig {
    fn default() -> Self {
        Self {
            autostart: true,
            single_pass: false,
        }
    }
}

impl ScannerFileConfig {
    pub fn from_toml(content: &str) -> Result<Self> {
        let cfg: Self = toml::from_str(content)
            .map_err(|e| Error::Config(format!("invalid scanner config: {e}")))?;
        cfg.validate()?;
        Ok(cfg)
    }

    /// Load from a TOML file. A missing file falls back to the defaults.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        match std::fs::read_to_string(path) {
            Ok(content) => Self::from_toml(&content).map_err(|e| {
                Error::Config(format!("failed to load '{}': {e}", path.display()))
            }),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                warn!(path = %path.display(), "Scanner config not found, using defaults");
                Ok(Self::default())
            }
            Err(e) => Err(e.into()),
        }
    }

    fn validate(&self) -> Result<()> {
        if self.selection.max_candidates == 0 {
            return Err(Error::Config("selection.max_candidates must be >= 1".into()));
        }
        if self.selection.lookback == 0 || self.pacing.chart_candles == 0 {
            return Err(Error::Config(
                "selection.lookback and pacing.chart_candles must be >= 1".into(),
            ));
        }
        if self.selection.symbols.is_empty() {
            return Err(Error::Config("selection.symbols must not be empty".into()));
        }
        Ok(())
    }
}

fn default_universe() -> Vec<Symbol> {
    [
        ("BTC", "USDT"),
        ("ETH", "USDT"),
        ("SOL", "USDT"),
        ("BNB", "USDT"),
        ("XRP", "USDT"),
        ("ADA", "USDT"),
        ("AVAX", "USDT"),
        ("DOGE", "USDT"),
        ("TRX", "USDT"),
        ("LINK", "USDT"),
        ("DOT", "USDT"),
        ("MATIC", "USDT"),
        ("LTC", "USDT"),
        ("BCH", "USDT"),
        ("UNI", "USDT"),
    ]
    .iter()
    .filter_map(|(base, quote)| Symbol::new(base, quote).ok())
    .collect()
}
