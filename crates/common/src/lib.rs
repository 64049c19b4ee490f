pub mod config;
pub mod error;
pub mod exchange;
pub mod types;

pub use config::{ChatTarget, Config};
pub use error::{Error, Result};
pub use exchange::{ChartRenderer, MarketDataSource, Notifier, VisionClassifier};
pub use types::*;
