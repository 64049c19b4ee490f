pub mod manager;

pub use manager::{CapDecision, SignalCap};
