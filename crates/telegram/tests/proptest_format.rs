use common::{Symbol, TakeProfit, TargetSource, TradeSetup, TradeSide};
use proptest::prelude::*;
use telegram_ctrl::{format_signal, leveraged_percent, risk_reward};

proptest! {
    /// The leveraged percentage is a display figure and is never negative.
    #[test]
    fn leveraged_percent_is_non_negative(
        target in -1.0e9f64..1.0e9,
        entry in -1.0e9f64..1.0e9,
    ) {
        let pct = leveraged_percent(target, entry);
        prop_assert!(pct >= 0.0);
        prop_assert!(pct.is_finite());
    }

    #[test]
    fn zero_entry_yields_zero_percent(target in proptest::num::f64::ANY) {
        prop_assert_eq!(leveraged_percent(target, 0.0), 0.0);
    }

    #[test]
    fn stop_at_entry_yields_zero_rr(entry in 0.0001f64..1.0e6, tp4 in 0.0001f64..1.0e6) {
        prop_assert_eq!(risk_reward(entry, entry, tp4), 0.0);
    }

    /// Every rendered message carries all four targets and the stop line.
    #[test]
    fn message_always_has_every_line(
        buy in any::<bool>(),
        entry in 0.0001f64..100_000.0,
        offsets in proptest::array::uniform4(0.001f64..0.2),
    ) {
        let side = if buy { TradeSide::Buy } else { TradeSide::Sell };
        let dir = if buy { 1.0 } else { -1.0 };
        let setup = TradeSetup {
            side,
            entry,
            stop_loss: entry * (1.0 - dir * 0.02),
            take_profits: offsets.map(|o| TakeProfit {
                price: entry * (1.0 + dir * o),
                source: TargetSource::Default,
            }),
            reason: None,
        };
        let symbol: Symbol = "BTC/USDT".parse().unwrap();
        let text = format_signal(&symbol, &setup).to_string();

        for marker in ["1️⃣ ", "2️⃣ ", "3️⃣ ", "4️⃣ ", "⭕ Stop Loss ", "📝 RR 1:", "💥Entry "] {
            prop_assert!(text.contains(marker), "missing {marker}");
        }
        prop_assert!(text.starts_with("💎CRYPTO CAMPUS VIP💎\n"));
        prop_assert!(text.ends_with("⚠️ Margin Use 1%-5%(Trading Plan Use)"));
    }
}
