pub mod wick;

pub use wick::{CandleAnatomy, WickSweepIndicator};
