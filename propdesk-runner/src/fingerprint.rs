//! Snapshot fingerprints — BLAKE3 over everything an evaluation depends on.
//!
//! Two snapshots with the same fingerprint produce the same report, so the
//! fingerprint doubles as a memo key and as a provenance tag in exports.
//! Trades are hashed in canonical order, making the fingerprint independent
//! of the order the history arrived in.

use std::fmt;

use serde::{Deserialize, Serialize};

use propdesk_core::domain::{AccountParameters, TradeRecord, TradeSide};
use propdesk_core::engine::canonical_order;
use propdesk_core::EvaluationOptions;

/// Bumped whenever the hashed layout changes.
const FINGERPRINT_VERSION: u8 = 1;

/// Hex-encoded BLAKE3 digest of one evaluation snapshot.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SnapshotFingerprint(pub String);

impl SnapshotFingerprint {
    /// First 12 hex characters, for log lines and table cells.
    pub fn short(&self) -> &str {
        self.0.get(..12).unwrap_or(&self.0)
    }
}

impl fmt::Display for SnapshotFingerprint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Fingerprint account parameters, normalized trades and evaluation options.
pub fn fingerprint(
    account: &AccountParameters,
    trades: &[TradeRecord],
    options: &EvaluationOptions,
) -> SnapshotFingerprint {
    let mut hasher = blake3::Hasher::new();
    hasher.update(&[FINGERPRINT_VERSION]);

    hasher.update(&account.initial_balance.to_le_bytes());
    hasher.update(&account.profit_target_percent.to_le_bytes());
    hasher.update(&account.max_drawdown_percent.to_le_bytes());
    hasher.update(&account.daily_drawdown_percent.to_le_bytes());
    hasher.update(&account.min_trading_days.to_le_bytes());

    hasher.update(&options.evaluation_time.timestamp_micros().to_le_bytes());
    hasher.update(&options.calendar.offset_minutes().to_le_bytes());

    let mut sorted: Vec<&TradeRecord> = trades.iter().collect();
    sorted.sort_by(|a, b| canonical_order(a, b));

    hasher.update(&(sorted.len() as u64).to_le_bytes());
    for trade in sorted {
        hash_str(&mut hasher, trade.id.as_str());
        hash_str(&mut hasher, &trade.symbol);
        hasher.update(&[match trade.side {
            TradeSide::Buy => 0,
            TradeSide::Sell => 1,
        }]);
        hasher.update(&trade.volume.to_le_bytes());
        hasher.update(&trade.open_time.timestamp_micros().to_le_bytes());
        match trade.close_time {
            Some(close) => {
                hasher.update(&[1]);
                hasher.update(&close.timestamp_micros().to_le_bytes());
            }
            None => {
                hasher.update(&[0]);
            }
        }
        hasher.update(&trade.profit.to_le_bytes());
        hasher.update(&trade.commission.to_le_bytes());
        hasher.update(&trade.swap.to_le_bytes());
    }

    SnapshotFingerprint(hasher.finalize().to_hex().to_string())
}

/// Length-prefixed so adjacent strings cannot run together.
fn hash_str(hasher: &mut blake3::Hasher, s: &str) {
    hasher.update(&(s.len() as u64).to_le_bytes());
    hasher.update(s.as_bytes());
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, TimeZone, Utc};
    use propdesk_core::domain::TradeId;
    use propdesk_core::TradingCalendar;

    fn options() -> EvaluationOptions {
        EvaluationOptions::at(Utc.with_ymd_and_hms(2024, 5, 1, 0, 0, 0).unwrap())
    }

    fn make_trade(id: u64, profit: f64) -> TradeRecord {
        let open = Utc.with_ymd_and_hms(2024, 4, 2, 9, 0, 0).unwrap() + Duration::hours(id as i64);
        TradeRecord {
            id: TradeId::from(id),
            symbol: "EURUSD".into(),
            side: TradeSide::Buy,
            volume: 1.0,
            open_time: open,
            close_time: Some(open + Duration::minutes(5)),
            profit,
            commission: 0.0,
            swap: 0.0,
        }
    }

    #[test]
    fn deterministic_and_hex() {
        let trades = vec![make_trade(1, 10.0), make_trade(2, -5.0)];
        let a = fingerprint(&AccountParameters::default(), &trades, &options());
        let b = fingerprint(&AccountParameters::default(), &trades, &options());
        assert_eq!(a, b);
        assert_eq!(a.0.len(), 64);
        assert_eq!(a.short().len(), 12);
    }

    #[test]
    fn order_independent() {
        let trades = vec![make_trade(1, 10.0), make_trade(2, -5.0), make_trade(3, 1.0)];
        let mut reversed = trades.clone();
        reversed.reverse();
        assert_eq!(
            fingerprint(&AccountParameters::default(), &trades, &options()),
            fingerprint(&AccountParameters::default(), &reversed, &options()),
        );
    }

    #[test]
    fn changes_with_any_input() {
        let trades = vec![make_trade(1, 10.0)];
        let base = fingerprint(&AccountParameters::default(), &trades, &options());

        let other_trades = vec![make_trade(1, 10.5)];
        assert_ne!(base, fingerprint(&AccountParameters::default(), &other_trades, &options()));

        let params = AccountParameters {
            min_trading_days: 5,
            ..AccountParameters::default()
        };
        assert_ne!(base, fingerprint(&params, &trades, &options()));

        let shifted = options().with_calendar(TradingCalendar::with_offset_minutes(60).unwrap());
        assert_ne!(base, fingerprint(&AccountParameters::default(), &trades, &shifted));
    }
}
