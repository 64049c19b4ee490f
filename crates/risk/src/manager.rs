use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use tracing::info;

/// Outcome of asking the cap for room to send one more signal.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CapDecision {
    Allowed { remaining: u32 },
    Exhausted { limit: u32 },
}

/// Hard limit on forwarded signals per UTC day.
///
/// The Dispatcher checks `check` before sending and calls `record` only after
/// the message was delivered, so failed sends do not consume the budget.
/// The counter rolls over the first time it is touched on a new UTC date.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SignalCap {
    limit: u32,
    sent: u32,
    period: NaiveDate,
}

impl SignalCap {
    pub fn new(limit: u32, now: DateTime<Utc>) -> Self {
        Self {
            limit,
            sent: 0,
            period: now.date_naive(),
        }
    }

    pub fn limit(&self) -> u32 {
        self.limit
    }

    /// Signals forwarded in the period containing `now`.
    pub fn sent(&self, now: DateTime<Utc>) -> u32 {
        if now.date_naive() == self.period {
            self.sent
        } else {
            0
        }
    }

    pub fn check(&mut self, now: DateTime<Utc>) -> CapDecision {
        self.roll(now);
        if self.sent >= self.limit {
            CapDecision::Exhausted { limit: self.limit }
        } else {
            CapDecision::Allowed {
                remaining: self.limit - self.sent,
            }
        }
    }

    /// Count one delivered signal. Never exceeds the limit.
    pub fn record(&mut self, now: DateTime<Utc>) {
        self.roll(now);
        self.sent = (self.sent + 1).min(self.limit);
    }

    fn roll(&mut self, now: DateTime<Utc>) {
        let today = now.date_naive();
        if today != self.period {
            if self.sent > 0 {
                info!(
                    previous = %self.period,
                    sent = self.sent,
                    limit = self.limit,
                    "Daily signal counter reset"
                );
            }
            self.period = today;
            self.sent = 0;
        }
    }
}

// ─── Tests ────────────────────────────────────────────────────────────────────
