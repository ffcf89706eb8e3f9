//! Trade normalizer — maps heterogeneous payloads onto [`TradeRecord`].
//!
//! Upstream sources disagree on field names (`ticket` vs `id`, `lots` vs
//! `volume`), casing, number encoding and timestamp format. This module is the
//! only place that accepts loosely-typed input: every record either comes out
//! as a canonical `TradeRecord` or is rejected with [`InvalidTradeRecord`].

mod fields;
pub mod time;

use serde::{Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;

use crate::domain::{TradeId, TradeRecord, TradeSide};
pub use time::parse_timestamp;

/// A trade as delivered by the data-access layer.
pub type RawTrade = Value;

/// Why a raw payload could not be normalized.
#[derive(Debug, Clone, PartialEq, Error, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum InvalidTradeRecord {
    #[error("trade payload is not an object")]
    NotAnObject,
    #[error("missing required field `{field}`")]
    MissingField { field: String },
    #[error("field `{field}` has an unusable value: {value}")]
    InvalidField { field: String, value: String },
    #[error("volume must be non-negative, got {volume}")]
    NegativeVolume { volume: f64 },
}

impl InvalidTradeRecord {
    fn missing(field: &str) -> Self {
        Self::MissingField { field: field.to_string() }
    }

    fn invalid(field: &str, value: &Value) -> Self {
        Self::InvalidField {
            field: field.to_string(),
            value: value.to_string(),
        }
    }
}

/// A payload dropped from the batch, with its position in the input.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RejectedTrade {
    pub index: usize,
    /// Identifier, when the payload had a readable one.
    pub id: Option<String>,
    pub error: InvalidTradeRecord,
}

/// Outcome of normalizing a batch. Accepted trades keep their input order.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct NormalizedBatch {
    pub trades: Vec<TradeRecord>,
    pub rejected: Vec<RejectedTrade>,
}

impl NormalizedBatch {
    /// True when no payload was rejected.
    pub fn is_complete(&self) -> bool {
        self.rejected.is_empty()
    }

    pub fn input_len(&self) -> usize {
        self.trades.len() + self.rejected.len()
    }
}

/// Normalize every payload, collecting rejects instead of stopping at the
/// first one. Whether a partial batch is usable is the caller's decision.
pub fn normalize_batch(raw: &[RawTrade]) -> NormalizedBatch {
    let mut batch = NormalizedBatch::default();
    for (index, payload) in raw.iter().enumerate() {
        match normalize_trade(payload) {
            Ok(trade) => batch.trades.push(trade),
            Err(error) => batch.rejected.push(RejectedTrade {
                index,
                id: raw_id(payload),
                error,
            }),
        }
    }
    batch
}

/// Normalize a single payload.
pub fn normalize_trade(raw: &RawTrade) -> Result<TradeRecord, InvalidTradeRecord> {
    let obj = raw.as_object().ok_or(InvalidTradeRecord::NotAnObject)?;

    let id_value = fields::lookup(obj, fields::ID).ok_or_else(|| InvalidTradeRecord::missing("id"))?;
    let id = fields::as_text(id_value).ok_or_else(|| InvalidTradeRecord::invalid("id", id_value))?;

    let symbol_value =
        fields::lookup(obj, fields::SYMBOL).ok_or_else(|| InvalidTradeRecord::missing("symbol"))?;
    let symbol = fields::as_text(symbol_value)
        .ok_or_else(|| InvalidTradeRecord::invalid("symbol", symbol_value))?;

    let volume_value =
        fields::lookup(obj, fields::VOLUME).ok_or_else(|| InvalidTradeRecord::missing("volume"))?;
    let volume = fields::as_f64(volume_value)
        .ok_or_else(|| InvalidTradeRecord::invalid("volume", volume_value))?;
    if volume < 0.0 {
        return Err(InvalidTradeRecord::NegativeVolume { volume });
    }

    let open_value = fields::lookup(obj, fields::OPEN_TIME)
        .filter(|v| !fields::is_blank(v))
        .ok_or_else(|| InvalidTradeRecord::missing("open_time"))?;
    let open_time =
        parse_timestamp(open_value).ok_or_else(|| InvalidTradeRecord::invalid("open_time", open_value))?;

    let close_time = match fields::lookup(obj, fields::CLOSE_TIME) {
        Some(value) if !fields::is_blank(value) => Some(
            parse_timestamp(value).ok_or_else(|| InvalidTradeRecord::invalid("close_time", value))?,
        ),
        _ => None,
    };
    if let Some(close) = close_time {
        if close < open_time {
            return Err(InvalidTradeRecord::InvalidField {
                field: "close_time".to_string(),
                value: format!(
                    "{} is before open time {}",
                    close.to_rfc3339(),
                    open_time.to_rfc3339()
                ),
            });
        }
    }

    let side = match fields::lookup(obj, fields::SIDE) {
        Some(value) => parse_side(value)?,
        None => TradeSide::Buy,
    };

    Ok(TradeRecord {
        id: TradeId::new(id),
        symbol,
        side,
        volume,
        open_time,
        close_time,
        profit: fields::amount(obj, fields::PROFIT),
        commission: fields::amount(obj, fields::COMMISSION),
        swap: fields::amount(obj, fields::SWAP),
    })
}

fn parse_side(value: &Value) -> Result<TradeSide, InvalidTradeRecord> {
    let text = match value {
        Value::String(s) => s.trim().to_ascii_lowercase(),
        Value::Number(n) => n.to_string(),
        _ => return Err(InvalidTradeRecord::invalid("side", value)),
    };
    match text.as_str() {
        "" | "buy" | "long" | "b" | "0" => Ok(TradeSide::Buy),
        "sell" | "short" | "s" | "1" => Ok(TradeSide::Sell),
        _ => Err(InvalidTradeRecord::invalid("side", value)),
    }
}

fn raw_id(raw: &RawTrade) -> Option<String> {
    raw.as_object()
        .and_then(|obj| fields::lookup(obj, fields::ID))
        .and_then(fields::as_text)
}
