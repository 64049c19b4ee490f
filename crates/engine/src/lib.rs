pub mod binance;
pub mod chart;
pub mod dispatcher;
pub mod gemini;
pub mod lifecycle;
pub mod pipeline;
pub mod state;

pub use binance::BinanceClient;
pub use chart::CandleChartRenderer;
pub use dispatcher::{DispatchOutcome, Dispatcher};
pub use gemini::GeminiClassifier;
pub use lifecycle::{Collaborators, Scanner, ScannerHandle};
pub use pipeline::SignalPipeline;
pub use state::{DecisionLog, DecisionRecord, Outcome, SessionState};
