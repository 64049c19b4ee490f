pub mod config;
pub mod indicators;
pub mod parser;
pub mod prompt;
pub mod selector;

pub use config::{
    PacingConfig, RunConfig, ScannerFileConfig, SelectionConfig, SelectionPolicy, SignalConfig,
};
pub use parser::parse as parse_signal;
pub use prompt::CLASSIFIER_PROMPT;
pub use selector::CandidateSelector;
