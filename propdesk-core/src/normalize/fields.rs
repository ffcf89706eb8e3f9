//! Field lookup and value coercion over loosely-typed payloads.

use serde_json::{Map, Value};

pub(crate) const ID: &[&str] = &[
    "id", "ticket", "tradeid", "positionid", "position", "orderid", "order", "deal", "dealid",
];
pub(crate) const SYMBOL: &[&str] = &["symbol", "instrument", "ticker", "pair", "asset"];
pub(crate) const SIDE: &[&str] = &["side", "type", "direction", "action", "cmd"];
pub(crate) const VOLUME: &[&str] = &["volume", "lots", "lot", "size", "quantity", "qty"];
pub(crate) const OPEN_TIME: &[&str] = &[
    "opentime", "timeopen", "openedat", "entrytime", "opendate", "opentimestamp",
];
pub(crate) const CLOSE_TIME: &[&str] = &[
    "closetime", "timeclose", "closedat", "exittime", "closedate", "closetimestamp",
];
pub(crate) const PROFIT: &[&str] = &["profit", "pnl", "grossprofit", "realizedpnl", "result"];
pub(crate) const COMMISSION: &[&str] = &["commission", "commissions", "fee", "fees"];
pub(crate) const SWAP: &[&str] = &["swap", "swaps", "rollover", "storage", "financing"];

/// Lowercase and drop `_`, `-` and spaces so `open_time`, `openTime` and
/// `Open Time` all compare equal.
pub(crate) fn canonical_key(key: &str) -> String {
    key.chars()
        .filter(|c| !matches!(c, '_' | '-' | ' '))
        .flat_map(char::to_lowercase)
        .collect()
}

/// First non-null value whose key matches one of `aliases`.
///
/// Alias order wins over payload order, so a record carrying both `id` and
/// `ticket` always resolves to `id`.
pub(crate) fn lookup<'a>(obj: &'a Map<String, Value>, aliases: &[&str]) -> Option<&'a Value> {
    aliases.iter().find_map(|alias| {
        obj.iter()
            .find(|(key, value)| !value.is_null() && canonical_key(key) == *alias)
            .map(|(_, value)| value)
    })
}

/// Number or numeric string. Empty strings and non-numeric values are `None`.
pub(crate) fn as_f64(value: &Value) -> Option<f64> {
    let parsed = match value {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => {
            let trimmed = s.trim();
            if trimmed.is_empty() {
                return None;
            }
            trimmed.parse::<f64>().ok()
        }
        _ => None,
    };
    parsed.filter(|v| v.is_finite())
}

/// Amount fields default to zero when absent or unreadable.
pub(crate) fn amount(obj: &Map<String, Value>, aliases: &[&str]) -> f64 {
    lookup(obj, aliases).and_then(as_f64).unwrap_or(0.0)
}

/// Integral floats past this render in exponent form anyway; leave them be.
const MAX_INTEGRAL_ID: f64 = 1e15;

/// String or number rendered as a non-empty string.
///
/// Integral floats drop their fraction, so `1.0` reads as `"1"` just like the
/// same cell in a CSV export.
pub(crate) fn as_text(value: &Value) -> Option<String> {
    let text = match value {
        Value::String(s) => s.trim().to_string(),
        Value::Number(n) => match n.as_f64() {
            Some(f) if n.is_f64() && f.fract() == 0.0 && f.abs() < MAX_INTEGRAL_ID => {
                format!("{f:.0}")
            }
            _ => n.to_string(),
        },
        _ => return None,
    };
    if text.is_empty() {
        None
    } else {
        Some(text)
    }
}

/// True when a value carries nothing: null, empty/whitespace string, or zero
/// as a number or numeric string (MT4-style exports use `0` for "not closed
/// yet", and CSV cells arrive as strings).
pub(crate) fn is_blank(value: &Value) -> bool {
    match value {
        Value::Null => true,
        Value::String(s) if s.trim().is_empty() => true,
        Value::String(_) | Value::Number(_) => as_f64(value) == Some(0.0),
        _ => false,
    }
}
