use common::Candle;

/// Body and wick lengths of a single candle.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CandleAnatomy {
    /// `|close - open|`
    pub body: f64,
    /// Range outside the body: `(high - low) - body`.
    pub wick: f64,
}

impl CandleAnatomy {
    pub fn of(candle: &Candle) -> Self {
        let body = (candle.close - candle.open).abs();
        let wick = (candle.high - candle.low) - body;
        Self { body, wick }
    }
}

/// Flags candles whose wick dominates the body, a proxy for a liquidity sweep.
///
/// A candle with no body and a non-zero range always qualifies.
#[derive(Debug, Clone)]
pub struct WickSweepIndicator {
    /// Wick must be strictly greater than `body * ratio`.
    pub ratio: f64,
}

impl Default for WickSweepIndicator {
    fn default() -> Self {
        Self { ratio: 2.0 }
    }
}

impl WickSweepIndicator {
    pub fn new(ratio: f64) -> Self {
        assert!(ratio >= 0.0, "wick ratio must be non-negative");
        Self { ratio }
    }

    pub fn is_sweep(&self, candle: &Candle) -> bool {
        let anatomy = CandleAnatomy::of(candle);
        anatomy.wick > anatomy.body * self.ratio
    }

    /// Evaluate the most recent candle of a series (oldest first).
    /// Returns `None` for an empty series.
    pub fn latest(&self, candles: &[Candle]) -> Option<bool> {
        candles.last().map(|c| self.is_sweep(c))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

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

    #[test]
    fn doji_with_range_is_a_sweep() {
        let c = candle(100.0, 110.0, 90.0, 100.0);
        let a = CandleAnatomy::of(&c);
        assert_eq!(a.body, 0.0);
        assert_eq!(a.wick, 20.0);
        assert!(WickSweepIndicator::default().is_sweep(&c));
    }

    #[test]
    fn full_body_candle_is_not_a_sweep() {
        // body 10, wick 0
        let c = candle(100.0, 110.0, 100.0, 110.0);
        assert!(!WickSweepIndicator::default().is_sweep(&c));
    }

    #[test]
    fn threshold_is_strict() {
        // body 2, wick 4: wick == 2 * body, not greater
        let c = candle(100.0, 104.0, 98.0, 102.0);
        assert!(!WickSweepIndicator::default().is_sweep(&c));

        // body 2, wick 4.5
        let c = candle(100.0, 104.5, 98.0, 102.0);
        assert!(WickSweepIndicator::default().is_sweep(&c));
    }

    #[test]
    fn flat_candle_is_not_a_sweep() {
        let c = candle(100.0, 100.0, 100.0, 100.0);
        assert!(!WickSweepIndicator::default().is_sweep(&c));
    }

    #[test]
    fn latest_uses_last_candle_only() {
        let series = vec![
            candle(100.0, 110.0, 90.0, 100.0),
            candle(100.0, 110.0, 100.0, 110.0),
        ];
        assert_eq!(WickSweepIndicator::default().latest(&series), Some(false));
        assert_eq!(WickSweepIndicator::default().latest(&[]), None);
    }
}
