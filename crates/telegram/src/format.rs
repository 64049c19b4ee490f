use common::{NotificationMessage, Symbol, TradeSetup, TradeSide};

/// Leverage quoted in every signal. Display only.
pub const LEVERAGE: f64 = 50.0;

const HEADER: &str = "💎CRYPTO CAMPUS VIP💎";
const MARGIN_DISCLAIMER: &str = "⚠️ Margin Use 1%-5%(Trading Plan Use)";
const TARGET_MARKERS: [&str; 4] = ["1️⃣", "2️⃣", "3️⃣", "4️⃣"];

/// Build the channel message for a validated setup.
pub fn format_signal(symbol: &Symbol, setup: &TradeSetup) -> NotificationMessage {
    let entry = setup.entry;
    let marker = match setup.side {
        TradeSide::Sell => "🔴",
        TradeSide::Buy => "🟢",
    };
    let label = direction_label(setup.side);

    let targets: Vec<String> = TARGET_MARKERS
        .iter()
        .zip(&setup.take_profits)
        .map(|(digit, tp)| {
            format!(
                "{digit} {} ({:.1}%)",
                format_price(tp.price),
                leveraged_percent(tp.price, entry)
            )
        })
        .collect();

    let text = format!(
        "{HEADER}\n\n\
         🌑 {name}\n\n\
         {marker}{label}\n\n\
         🚀Isolated\n\
         📈Leverage {leverage}X\n\n\
         💥Entry {entry_price}\n\n\
         ✅Take Profit\n\n\
         {targets}\n\n\
         ⭕ Stop Loss {stop} ({stop_pct:.1}%)\n\n\
         📝 RR 1:{rr:.1}\n\n\
         {MARGIN_DISCLAIMER}",
        name = symbol.display_name(),
        leverage = LEVERAGE as u32,
        entry_price = format_price(entry),
        targets = targets.join("\n"),
        stop = format_price(setup.stop_loss),
        stop_pct = leveraged_percent(setup.stop_loss, entry),
        rr = risk_reward(entry, setup.stop_loss, setup.final_target()),
    );

    NotificationMessage::new(text)
}

pub fn direction_label(side: TradeSide) -> &'static str {
    match side {
        TradeSide::Sell => "Short",
        TradeSide::Buy => "Long",
    }
}

/// Price move to `target` as a percentage of `entry`, scaled by `LEVERAGE`,
/// rounded to one decimal. `0.0` when `entry` is zero; never negative.
pub fn leveraged_percent(target: f64, entry: f64) -> f64 {
    if entry == 0.0 {
        return 0.0;
    }
    let pct = (target - entry).abs() / entry.abs() * 100.0 * LEVERAGE;
    if pct.is_finite() {
        round1(pct)
    } else {
        0.0
    }
}

/// Distance to the final target over distance to the stop, rounded to one
/// decimal. `0.0` when the stop equals the entry.
pub fn risk_reward(entry: f64, stop_loss: f64, final_target: f64) -> f64 {
    let risk = (entry - stop_loss).abs();
    if risk == 0.0 {
        return 0.0;
    }
    let rr = (entry - final_target).abs() / risk;
    if rr.is_finite() {
        round1(rr)
    } else {
        0.0
    }
}

/// Up to eight decimals, trailing zeros trimmed: `100.0` → `100`, `0.52340` → `0.5234`.
pub fn format_price(price: f64) -> String {
    let s = format!("{price:.8}");
    let s = s.trim_end_matches('0').trim_end_matches('.');
    if s == "-0" {
        "0".to_string()
    } else {
        s.to_string()
    }
}

/// Halves go to the even digit: `2.25` → `2.2`, `0.75` → `0.8`.
fn round1(x: f64) -> f64 {
    (x * 10.0).round_ties_even() / 10.0
}

#[cfg(test)]
mod tests {
    use super::*;
    use common::{TakeProfit, TargetSource};

    fn setup(side: TradeSide, entry: f64, stop_loss: f64, tps: [f64; 4]) -> TradeSetup {
        TradeSetup {
            side,
            entry,
            stop_loss,
            take_profits: tps.map(|price| TakeProfit { price, source: TargetSource::Model }),
            reason: None,
        }
    }

    #[test]
    fn long_signal_renders_exact_template() {
        let symbol: Symbol = "BTC/USDT".parse().unwrap();
        let msg = format_signal(
            &symbol,
            &setup(TradeSide::Buy, 100.0, 98.0, [101.0, 102.0, 103.0, 104.0]),
        );

        let expected = "💎CRYPTO CAMPUS VIP💎

🌑 BTC USDT

🟢Long

🚀Isolated
📈Leverage 50X

💥Entry 100

✅Take Profit

1️⃣ 101 (50.0%)
2️⃣ 102 (100.0%)
3️⃣ 103 (150.0%)
4️⃣ 104 (200.0%)

⭕ Stop Loss 98 (100.0%)

📝 RR 1:2.0

⚠️ Margin Use 1%-5%(Trading Plan Use)";
        assert_eq!(msg.as_str(), expected);
    }

    #[test]
    fn short_signal_uses_short_label_and_red_marker() {
        let symbol: Symbol = "ETH/USDT".parse().unwrap();
        let msg = format_signal(
            &symbol,
            &setup(TradeSide::Sell, 2000.0, 2040.0, [1980.0, 1960.0, 1940.0, 1900.0]),
        );
        assert!(msg.as_str().contains("🌑 ETH USDT\n"));
        assert!(msg.as_str().contains("\n🔴Short\n"));
        assert!(msg.as_str().contains("1️⃣ 1980 (50.0%)"));
        assert!(msg.as_str().contains("⭕ Stop Loss 2040 (100.0%)"));
        assert!(msg.as_str().contains("📝 RR 1:2.5"));
    }

    #[test]
    fn leveraged_percent_scenario() {
        assert_eq!(leveraged_percent(101.0, 100.0), 50.0);
        assert_eq!(leveraged_percent(98.0, 100.0), 100.0);
    }

    #[test]
    fn leveraged_percent_guards_zero_entry() {
        assert_eq!(leveraged_percent(5.0, 0.0), 0.0);
        assert!(leveraged_percent(90.0, -100.0) >= 0.0);
    }

    #[test]
    fn risk_reward_scenario_and_guard() {
        assert_eq!(risk_reward(100.0, 98.0, 104.0), 2.0);
        assert_eq!(risk_reward(100.0, 100.0, 104.0), 0.0);
    }

    #[test]
    fn exact_halves_round_to_even() {
        assert_eq!(risk_reward(100.0, 99.0, 102.25), 2.2);
        assert_eq!(risk_reward(100.0, 99.0, 100.25), 0.2);
        assert_eq!(risk_reward(100.0, 99.0, 100.75), 0.8);
    }

    #[test]
    fn prices_trim_trailing_zeros() {
        assert_eq!(format_price(100.0), "100");
        assert_eq!(format_price(101.25), "101.25");
        assert_eq!(format_price(0.5234), "0.5234");
        assert_eq!(format_price(100.0 * 1.01), "101");
        assert_eq!(format_price(0.00001234), "0.00001234");
    }
}
