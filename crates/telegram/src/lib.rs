pub mod commands;
pub mod format;
pub mod notifier;

pub use commands::{start_bot, BotDeps};
pub use format::{format_signal, leveraged_percent, risk_reward, LEVERAGE};
pub use notifier::TelegramNotifier;
