//! TradeRecord — one closed or still-open position in canonical form.

use super::ids::TradeId;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Direction of the position.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TradeSide {
    Buy,
    Sell,
}

impl fmt::Display for TradeSide {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TradeSide::Buy => write!(f, "buy"),
            TradeSide::Sell => write!(f, "sell"),
        }
    }
}

/// A trade after normalization. Everything downstream of the normalizer
/// works on this shape only.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TradeRecord {
    pub id: TradeId,
    pub symbol: String,
    pub side: TradeSide,
    pub volume: f64,

    pub open_time: DateTime<Utc>,
    /// `None` while the position is still open.
    pub close_time: Option<DateTime<Utc>>,

    // ── PnL components (signed) ──
    pub profit: f64,
    pub commission: f64,
    pub swap: f64,
}

impl TradeRecord {
    /// Net P&L: profit + commission + swap.
    pub fn net_pnl(&self) -> f64 {
        self.profit + self.commission + self.swap
    }

    pub fn is_closed(&self) -> bool {
        self.close_time.is_some()
    }

    pub fn is_winner(&self) -> bool {
        self.net_pnl() > 0.0
    }

    pub fn is_loser(&self) -> bool {
        self.net_pnl() < 0.0
    }

    /// Timestamp of the last thing that happened to this trade.
    pub fn activity_time(&self) -> DateTime<Utc> {
        self.close_time.unwrap_or(self.open_time)
    }

    /// Seconds between open and close; `None` for open trades.
    pub fn holding_secs(&self) -> Option<i64> {
        self.close_time.map(|close| (close - self.open_time).num_seconds())
    }
}
