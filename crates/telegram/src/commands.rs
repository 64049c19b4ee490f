use std::sync::Arc;

use chrono::{NaiveDate, Utc};
use teloxide::{
    dispatching::UpdateHandler,
    prelude::*,
    utils::command::BotCommands,
};
use tokio::sync::{mpsc, RwLock};
use tracing::{info, warn};

use common::{ScannerCommand, ScannerMode, ScannerStatus, Symbol};

type HandlerResult = Result<(), Box<dyn std::error::Error + Send + Sync>>;

/// Dependencies injected into every handler via `dptree`.
#[derive(Clone)]
pub struct BotDeps {
    pub command_tx: mpsc::Sender<ScannerCommand>,
    pub status: Arc<RwLock<ScannerStatus>>,
    pub allowed_user_ids: Arc<Vec<i64>>,
}

/// Telegram bot commands exposed to the operator.
#[derive(BotCommands, Clone)]
#[command(rename_rule = "lowercase", description = "FusionBot commands:")]
pub enum Command {
    #[command(description = "Start scanning the market")]
    Start,
    #[command(description = "Stop after the current symbol")]
    Stop,
    #[command(description = "Show scanner status and today's signal count")]
    Status,
    #[command(description = "Add a symbol to the watchlist, e.g. /add BTC/USDT")]
    Add(String),
    #[command(description = "Remove a symbol from the watchlist")]
    Remove(String),
    #[command(description = "List the watchlist")]
    Coins,
}

/// Start the control bot in long-polling mode.
pub async fn start_bot(bot: Bot, deps: BotDeps) {
    let deps = Arc::new(deps);

    info!("Telegram control bot starting (long-polling)");

    Dispatcher::builder(bot, schema())
        .dependencies(dptree::deps![deps])
        .enable_ctrlc_handler()
        .build()
        .dispatch()
        .await;
}

fn schema() -> UpdateHandler<Box<dyn std::error::Error + Send + Sync>> {
    use dptree::case;

    let command_handler = teloxide::filter_command::<Command, _>()
        .branch(case![Command::Start].endpoint(handle_start))
        .branch(case![Command::Stop].endpoint(handle_stop))
        .branch(case![Command::Status].endpoint(handle_status))
        .branch(case![Command::Add(symbol)].endpoint(handle_add))
        .branch(case![Command::Remove(symbol)].endpoint(handle_remove))
        .branch(case![Command::Coins].endpoint(handle_coins));

    Update::filter_message()
        .filter_map(|msg: Message| msg.from().map(|u| u.id))
        .filter_async(auth_filter)
        .branch(command_handler)
}

/// Silently drop messages from users not in the allowed list.
async fn auth_filter(user_id: UserId, deps: Arc<BotDeps>) -> bool {
    let uid = user_id.0 as i64;
    let allowed = deps.allowed_user_ids.contains(&uid);
    if !allowed {
        warn!(user_id = uid, "Unauthorized Telegram access attempt");
    }
    allowed
}

async fn handle_start(bot: Bot, msg: Message, deps: Arc<BotDeps>) -> HandlerResult {
    let mode = deps.status.read().await.mode;
    if mode == ScannerMode::Scanning {
        bot.send_message(msg.chat.id, "Scanner is already running.").await?;
    } else {
        let reply = match deps.command_tx.send(ScannerCommand::Start).await {
            Ok(()) => "Scanner started.",
            Err(_) => "Scanner has exited. Restart the bot to scan again.",
        };
        bot.send_message(msg.chat.id, reply).await?;
    }
    Ok(())
}

async fn handle_stop(bot: Bot, msg: Message, deps: Arc<BotDeps>) -> HandlerResult {
    let mode = deps.status.read().await.mode;
    if mode == ScannerMode::Idle {
        bot.send_message(msg.chat.id, "Scanner is already stopped.").await?;
    } else {
        let reply = match deps.command_tx.send(ScannerCommand::Stop).await {
            Ok(()) => "Stopping. The symbol being analyzed will finish first.",
            Err(_) => "Scanner has exited.",
        };
        bot.send_message(msg.chat.id, reply).await?;
    }
    Ok(())
}

async fn handle_status(bot: Bot, msg: Message, deps: Arc<BotDeps>) -> HandlerResult {
    let status = deps.status.read().await.clone();
    bot.send_message(msg.chat.id, status_text(&status, Utc::now().date_naive())).await?;
    Ok(())
}

async fn handle_add(
    bot: Bot,
    msg: Message,
    deps: Arc<BotDeps>,
    symbol: String,
) -> HandlerResult {
    let watchlist = deps.status.read().await.watchlist.clone();
    let reply = match symbol.parse::<Symbol>() {
        Ok(symbol) if watchlist.contains(&symbol) => {
            format!("{symbol} is already on the watchlist.")
        }
        Ok(symbol) => {
            let cmd = ScannerCommand::AddSymbol(symbol.clone());
            edit_watchlist(&deps, cmd, &symbol, "added").await
        }
        Err(_) => "Usage: /add BASE/QUOTE, e.g. /add BTC/USDT".to_string(),
    };
    bot.send_message(msg.chat.id, reply).await?;
    Ok(())
}

async fn handle_remove(
    bot: Bot,
    msg: Message,
    deps: Arc<BotDeps>,
    symbol: String,
) -> HandlerResult {
    let watchlist = deps.status.read().await.watchlist.clone();
    let reply = match symbol.parse::<Symbol>() {
        Ok(symbol) if !watchlist.contains(&symbol) => {
            format!("{symbol} is not on the watchlist.")
        }
        Ok(symbol) => {
            let cmd = ScannerCommand::RemoveSymbol(symbol.clone());
            edit_watchlist(&deps, cmd, &symbol, "removed").await
        }
        Err(_) => "Usage: /remove BASE/QUOTE, e.g. /remove BTC/USDT".to_string(),
    };
    bot.send_message(msg.chat.id, reply).await?;
    Ok(())
}

async fn edit_watchlist(
    deps: &BotDeps,
    cmd: ScannerCommand,
    symbol: &Symbol,
    verb: &str,
) -> String {
    match deps.command_tx.send(cmd).await {
        Ok(()) => {
            info!(pair = %symbol, action = verb, "Watchlist edit requested");
            format!("{symbol} {verb}. Applies from the next cycle.")
        }
        Err(_) => "Scanner has exited.".to_string(),
    }
}

async fn handle_coins(bot: Bot, msg: Message, deps: Arc<BotDeps>) -> HandlerResult {
    let text = watchlist_text(&deps.status.read().await.watchlist);
    bot.send_message(msg.chat.id, text).await?;
    Ok(())
}

pub fn watchlist_text(watchlist: &[Symbol]) -> String {
    if watchlist.is_empty() {
        return "Watchlist is empty.".to_string();
    }
    let names: Vec<String> = watchlist.iter().map(ToString::to_string).collect();
    format!("Watchlist ({}):\n{}", watchlist.len(), names.join("\n"))
}

/// Status reply as of `today`, so a count from a previous UTC day shows as 0.
pub fn status_text(status: &ScannerStatus, today: NaiveDate) -> String {
    let last_cycle = status
        .last_cycle_at
        .map(|t| t.format("%Y-%m-%d %H:%M UTC").to_string())
        .unwrap_or_else(|| "never".to_string());
    format!(
        "FusionBot Status\n\
         Scanner: {}\n\
         Daily Signals: {}/{}\n\
         Cycles completed: {}\n\
         Last cycle: {last_cycle}",
        status.mode,
        status.signals_on(today),
        status.daily_cap,
        status.cycles_completed
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn status_text_shows_daily_signal_budget() {
        let last = Utc.with_ymd_and_hms(2025, 1, 2, 3, 4, 5).unwrap();
        let status = ScannerStatus {
            mode: ScannerMode::Scanning,
            signals_today: 3,
            signals_date: Some(last.date_naive()),
            daily_cap: 10,
            cycles_completed: 7,
            last_cycle_at: Some(last),
            watchlist: Vec::new(),
        };
        assert_eq!(
            status_text(&status, last.date_naive()),
            "FusionBot Status\n\
             Scanner: scanning\n\
             Daily Signals: 3/10\n\
             Cycles completed: 7\n\
             Last cycle: 2025-01-02 03:04 UTC"
        );
    }

    #[test]
    fn status_text_before_first_cycle() {
        let today = Utc::now().date_naive();
        let text = status_text(&ScannerStatus::default(), today);
        assert!(text.contains("Scanner: idle"));
        assert!(text.contains("Last cycle: never"));
    }

    #[test]
    fn status_text_resets_count_after_utc_midnight() {
        let yesterday = Utc.with_ymd_and_hms(2025, 1, 2, 23, 59, 0).unwrap();
        let status = ScannerStatus {
            signals_today: 10,
            signals_date: Some(yesterday.date_naive()),
            daily_cap: 10,
            ..Default::default()
        };
        let today = yesterday.date_naive().succ_opt().unwrap();
        assert!(status_text(&status, today).contains("Daily Signals: 0/10"));
        assert!(status_text(&status, yesterday.date_naive()).contains("Daily Signals: 10/10"));
    }

    #[test]
    fn watchlist_text_lists_symbols_in_order() {
        let list: Vec<Symbol> = ["ETH/USDT", "BTC/USDT"]
            .iter()
            .map(|s| s.parse().unwrap())
            .collect();
        assert_eq!(watchlist_text(&list), "Watchlist (2):\nETH/USDT\nBTC/USDT");
        assert_eq!(watchlist_text(&[]), "Watchlist is empty.");
    }
}
