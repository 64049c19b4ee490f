use serde::Deserialize;
use serde_json::Value;

use common::{Error, Result, TakeProfit, TargetSource, TradeDecision, TradeSetup, TradeSide};

/// Fractional offsets from entry used when the model omits a take-profit.
pub const DEFAULT_TP_OFFSETS: [f64; 4] = [0.01, 0.02, 0.03, 0.04];

const FENCE: &str = "```";

/// Shape of the object the classifier is asked to emit. Numbers are kept as
/// raw JSON values so numeric strings can be coerced and bad values reported
/// as validation failures rather than decode failures.
#[derive(Debug, Deserialize)]
struct RawDecision {
    decision: Option<String>,
    #[serde(default)]
    entry: Option<Value>,
    #[serde(default)]
    stop_loss: Option<Value>,
    #[serde(default)]
    tp1: Option<Value>,
    #[serde(default)]
    tp2: Option<Value>,
    #[serde(default)]
    tp3: Option<Value>,
    #[serde(default)]
    tp4: Option<Value>,
    #[serde(default)]
    reason: Option<Value>,
}

/// Turns the classifier's free text into a `TradeDecision`.
///
/// `Error::Parse` means the text is not one JSON object with a known
/// `decision`; `Error::Validation` means an actionable decision carries
/// unusable prices. Callers treat both as WAIT.
pub fn parse(raw_text: &str) -> Result<TradeDecision> {
    let body = strip_fences(raw_text);
    let value: Value = serde_json::from_str(body)
        .map_err(|e| Error::Parse(format!("response is not valid JSON: {e}")))?;
    if !value.is_object() {
        return Err(Error::Parse("response JSON is not an object".into()));
    }
    let raw: RawDecision = serde_json::from_value(value)
        .map_err(|e| Error::Parse(format!("response is not a decision object: {e}")))?;

    let decision = raw
        .decision
        .as_deref()
        .ok_or_else(|| Error::Parse("missing 'decision' field".into()))?;
    let reason = raw.reason.as_ref().and_then(reason_text);

    let side = match normalize_decision(decision)? {
        None => return Ok(TradeDecision::Wait { reason }),
        Some(side) => side,
    };

    let entry = required_price("entry", raw.entry.as_ref())?;
    if entry <= 0.0 {
        return Err(Error::Validation(format!("entry must be positive, got {entry}")));
    }
    let stop_loss = required_price("stop_loss", raw.stop_loss.as_ref())?;

    let raw_targets = [&raw.tp1, &raw.tp2, &raw.tp3, &raw.tp4];
    let defaults = default_take_profits(side, entry);
    let mut take_profits = [TakeProfit { price: 0.0, source: TargetSource::Default }; 4];
    for (i, slot) in take_profits.iter_mut().enumerate() {
        *slot = match raw_targets[i].as_ref().filter(|v| !v.is_null()) {
            Some(value) => TakeProfit {
                price: coerce_price(&format!("tp{}", i + 1), value)?,
                source: TargetSource::Model,
            },
            None => TakeProfit {
                price: defaults[i],
                source: TargetSource::Default,
            },
        };
    }

    Ok(TradeDecision::Trade(TradeSetup {
        side,
        entry,
        stop_loss,
        take_profits,
        reason,
    }))
}

/// Take-profit levels synthesized from `entry` in the direction of the trade.
pub fn default_take_profits(side: TradeSide, entry: f64) -> [f64; 4] {
    DEFAULT_TP_OFFSETS.map(|offset| match side {
        TradeSide::Buy => entry * (1.0 + offset),
        TradeSide::Sell => entry * (1.0 - offset),
    })
}

/// Remove one leading fence (with optional language tag) and one trailing
/// fence, then trim.
fn strip_fences(raw: &str) -> &str {
    let mut text = raw.trim();
    if let Some(rest) = text.strip_prefix(FENCE) {
        // Drop an info string such as `json` up to the end of the line.
        let tag_len = rest
            .find(|c: char| !c.is_ascii_alphanumeric())
            .unwrap_or(rest.len());
        text = &rest[tag_len..];
    }
    if let Some(rest) = text.trim_end().strip_suffix(FENCE) {
        text = rest;
    }
    text.trim()
}

/// `None` is WAIT.
fn normalize_decision(decision: &str) -> Result<Option<TradeSide>> {
    match decision.trim().to_ascii_uppercase().as_str() {
        "BUY" | "BUY_LIMIT" => Ok(Some(TradeSide::Buy)),
        "SELL" | "SELL_LIMIT" => Ok(Some(TradeSide::Sell)),
        "WAIT" => Ok(None),
        other => Err(Error::Parse(format!("unknown decision '{other}'"))),
    }
}

fn required_price(field: &str, value: Option<&Value>) -> Result<f64> {
    match value.filter(|v| !v.is_null()) {
        Some(v) => coerce_price(field, v),
        None => Err(Error::Validation(format!("missing '{field}'"))),
    }
}

fn coerce_price(field: &str, value: &Value) -> Result<f64> {
    let number = match value {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse::<f64>().ok(),
        _ => None,
    };
    number
        .filter(|n| n.is_finite())
        .ok_or_else(|| Error::Validation(format!("'{field}' is not a number: {value}")))
}

fn reason_text(value: &Value) -> Option<String> {
    match value {
        Value::String(s) if !s.trim().is_empty() => Some(s.trim().to_string()),
        Value::Null | Value::String(_) => None,
        other => Some(other.to_string()),
    }
}
