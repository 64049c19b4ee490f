use std::sync::Arc;

use anyhow::Context;
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;

use common::{Config, ScannerCommand};
use engine::{BinanceClient, CandleChartRenderer, Collaborators, GeminiClassifier, Scanner};
use strategy::ScannerFileConfig;
use telegram_ctrl::{start_bot, BotDeps, TelegramNotifier};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // ── Logging ──────────────────────────────────────────────────────────────
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    // ── Config ────────────────────────────────────────────────────────────────
    let cfg = Config::from_env().context("invalid environment configuration")?;
    let scanner_cfg = ScannerFileConfig::load(&cfg.scanner_config_path)
        .with_context(|| format!("invalid scanner config {}", cfg.scanner_config_path))?;
    info!(
        model = %cfg.gemini_model,
        channel = %cfg.telegram_chat_id,
        policy = ?scanner_cfg.selection.policy,
        daily_cap = scanner_cfg.signals.daily_cap,
        "FusionBot starting"
    );

    // ── Collaborators ─────────────────────────────────────────────────────────
    let pacing = &scanner_cfg.pacing;
    let source = BinanceClient::new(pacing.fetch_timeout())?;
    let classifier = GeminiClassifier::new(
        cfg.gemini_api_key.clone(),
        cfg.gemini_model.clone(),
        pacing.classify_timeout(),
    )?;
    let notifier = TelegramNotifier::new(cfg.telegram_token.clone());
    let bot = notifier.bot().clone();

    // ── Scanner ───────────────────────────────────────────────────────────────
    let (scanner, handle) = Scanner::new(
        &scanner_cfg,
        cfg.telegram_chat_id.clone(),
        Collaborators {
            source: Arc::new(source),
            renderer: Arc::new(CandleChartRenderer::default()),
            classifier: Arc::new(classifier),
            notifier: Arc::new(notifier),
        },
    );
    let scanner_task = tokio::spawn(scanner.run());

    // ── Telegram control ──────────────────────────────────────────────────────
    if cfg.telegram_allowed_user_ids.is_empty() {
        warn!("TELEGRAM_ALLOWED_USER_IDS is empty, control bot disabled");
    } else {
        let deps = BotDeps {
            command_tx: handle.command_sender(),
            status: handle.shared_status(),
            allowed_user_ids: Arc::new(cfg.telegram_allowed_user_ids.clone()),
        };
        tokio::spawn(start_bot(bot, deps));
    }

    if scanner_cfg.run.autostart {
        handle.send(ScannerCommand::Start).await;
    } else {
        info!("Autostart disabled. Send /start to begin scanning.");
    }

    // Keep main alive
    info!("All subsystems started. Waiting for shutdown signal.");
    tokio::select! {
        res = scanner_task => match res {
            Ok(state) => info!(decisions = state.log.len(), "Scanner finished"),
            Err(e) => error!(error = %e, "Scanner task failed"),
        },
        res = tokio::signal::ctrl_c() => {
            res.context("failed to listen for shutdown signal")?;
            info!("Shutdown signal received. Exiting.");
        }
    }
    Ok(())
}
