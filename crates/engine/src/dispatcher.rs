use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use tracing::{error, info, warn};

use common::{ChatTarget, NotificationMessage, Notifier, Result, Symbol, TradeSetup};
use risk::{CapDecision, SignalCap};
use telegram_ctrl::format_signal;

/// What happened to one actionable signal.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DispatchOutcome {
    Sent,
    CapReached,
    Failed,
}

/// Forwards formatted signals to the channel.
///
/// This is the ONLY component that calls `Notifier` for signals. The daily
/// cap is checked here and counts delivered messages only.
pub struct Dispatcher {
    notifier: Arc<dyn Notifier>,
    channel: ChatTarget,
    sticker_id: Option<String>,
    sticker_delay: Duration,
}

impl Dispatcher {
    pub fn new(
        notifier: Arc<dyn Notifier>,
        channel: ChatTarget,
        sticker_id: Option<String>,
        sticker_delay: Duration,
    ) -> Self {
        Self {
            notifier,
            channel,
            sticker_id,
            sticker_delay,
        }
    }

    /// Sticker, pause, then text when `with_sticker` and a sticker is
    /// configured. A failed sticker is logged and the text is still sent.
    /// Only a failed text send is returned.
    pub async fn notify(&self, message: &NotificationMessage, with_sticker: bool) -> Result<()> {
        if let Some(sticker_id) = self.sticker_id.as_deref().filter(|_| with_sticker) {
            match self.notifier.send_sticker(&self.channel, sticker_id).await {
                Ok(()) => tokio::time::sleep(self.sticker_delay).await,
                Err(e) => warn!(channel = %self.channel, error = %e, "Sticker send failed"),
            }
        }
        self.notifier.send_message(&self.channel, message.as_str()).await
    }

    /// Gate on the cap, format and send one signal. Never returns an error;
    /// transport failures are logged and reported as `Failed`.
    pub async fn dispatch(
        &self,
        symbol: &Symbol,
        setup: &TradeSetup,
        cap: &mut SignalCap,
        now: DateTime<Utc>,
    ) -> DispatchOutcome {
        if let CapDecision::Exhausted { limit } = cap.check(now) {
            warn!(pair = %symbol, limit, "Daily signal cap reached, signal suppressed");
            return DispatchOutcome::CapReached;
        }

        let message = format_signal(symbol, setup);
        match self.notify(&message, true).await {
            Ok(()) => {
                cap.record(now);
                info!(
                    pair = %symbol,
                    side = %setup.side,
                    entry = setup.entry,
                    sent_today = cap.sent(now),
                    limit = cap.limit(),
                    "Signal dispatched"
                );
                DispatchOutcome::Sent
            }
            Err(e) => {
                error!(pair = %symbol, error = %e, "Signal dispatch failed");
                DispatchOutcome::Failed
            }
        }
    }

    /// Best-effort liveness message; failures only warn.
    pub async fn heartbeat(&self) {
        let message = NotificationMessage::new("I'm alive");
        if let Err(e) = self.notify(&message, false).await {
            warn!(error = %e, "Heartbeat send failed");
        }
    }
}
