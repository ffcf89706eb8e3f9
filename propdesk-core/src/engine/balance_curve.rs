//! Balance curve builder — realized balance after each closed trade.
//!
//! The curve is a pure fold over closed trades in canonical order, so the
//! same set of trades always yields the same curve regardless of how the
//! caller ordered them.

use std::cmp::Ordering;

use chrono::{DateTime, Utc};

use crate::domain::{BalanceCurve, BalancePoint, TradeRecord};

/// Canonical processing order: `(close_time, id)`.
///
/// Records sharing both keys (duplicate ids from a sloppy export) fall back to
/// comparing the remaining fields so the order never depends on input order.
pub fn canonical_order(a: &TradeRecord, b: &TradeRecord) -> Ordering {
    a.close_time
        .cmp(&b.close_time)
        .then_with(|| a.id.cmp(&b.id))
        .then_with(|| a.open_time.cmp(&b.open_time))
        .then_with(|| a.symbol.cmp(&b.symbol))
        .then_with(|| a.profit.total_cmp(&b.profit))
        .then_with(|| a.commission.total_cmp(&b.commission))
        .then_with(|| a.swap.total_cmp(&b.swap))
        .then_with(|| a.volume.total_cmp(&b.volume))
}

/// Closed trades sorted into canonical order. Open trades are dropped.
pub fn closed_in_order(trades: &[TradeRecord]) -> Vec<&TradeRecord> {
    let mut closed: Vec<&TradeRecord> = trades.iter().filter(|t| t.is_closed()).collect();
    closed.sort_by(|a, b| canonical_order(a, b));
    closed
}

/// Build the balance curve from unsorted trades.
///
/// `evaluation_time` stamps the single point of a curve with no closed trades.
pub fn build_balance_curve(
    initial_balance: f64,
    trades: &[TradeRecord],
    evaluation_time: DateTime<Utc>,
) -> BalanceCurve {
    build_from_ordered(initial_balance, &closed_in_order(trades), evaluation_time)
}

/// Build the balance curve from trades already in canonical order.
pub fn build_from_ordered(
    initial_balance: f64,
    ordered: &[&TradeRecord],
    evaluation_time: DateTime<Utc>,
) -> BalanceCurve {
    let start = ordered
        .first()
        .and_then(|t| t.close_time)
        .unwrap_or(evaluation_time);

    let mut curve = BalanceCurve::starting_at(BalancePoint::new(start, initial_balance));

    let mut running = initial_balance;
    for trade in ordered {
        // Open trades have no close time and never move the balance.
        let Some(close_time) = trade.close_time else {
            continue;
        };
        running += trade.net_pnl();
        curve.push(BalancePoint::new(close_time, running));
    }
    curve
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{TradeId, TradeSide};
    use chrono::TimeZone;

    fn ts(day: u32, hour: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 4, day, hour, 0, 0).unwrap()
    }

    fn trade(id: &str, close: Option<DateTime<Utc>>, profit: f64) -> TradeRecord {
        TradeRecord {
            id: TradeId::new(id),
            symbol: "US30".into(),
            side: TradeSide::Buy,
            volume: 1.0,
            open_time: ts(1, 0),
            close_time: close,
            profit,
            commission: -2.0,
            swap: 1.0,
        }
    }

    #[test]
    fn empty_history_yields_single_point_at_evaluation_time() {
        let curve = build_balance_curve(50_000.0, &[], ts(9, 12));
        assert_eq!(curve.points(), &[BalancePoint::new(ts(9, 12), 50_000.0)]);
    }

    #[test]
    fn open_trades_do_not_affect_curve() {
        let trades = vec![trade("1", Some(ts(2, 10)), 101.0), trade("2", None, 5_000.0)];
        let curve = build_balance_curve(1_000.0, &trades, ts(9, 0));
        assert_eq!(curve.len(), 2);
        assert_eq!(curve.final_balance(), 1_100.0);
    }

    #[test]
    fn leading_point_uses_first_close_time() {
        let trades = vec![trade("b", Some(ts(3, 10)), 11.0), trade("a", Some(ts(2, 10)), 21.0)];
        let curve = build_balance_curve(1_000.0, &trades, ts(9, 0));
        assert_eq!(curve.points()[0], BalancePoint::new(ts(2, 10), 1_000.0));
        assert_eq!(curve.balances(), vec![1_000.0, 1_020.0, 1_030.0]);
    }

    #[test]
    fn ties_are_broken_by_id_not_input_order() {
        let forward = vec![trade("x2", Some(ts(2, 10)), 501.0), trade("x1", Some(ts(2, 10)), -299.0)];
        let backward: Vec<TradeRecord> = forward.iter().rev().cloned().collect();
        let a = build_balance_curve(10_000.0, &forward, ts(9, 0));
        let b = build_balance_curve(10_000.0, &backward, ts(9, 0));
        assert_eq!(a, b);
        // x1 first: 10000 - 300 = 9700, then +500
        assert_eq!(a.balances(), vec![10_000.0, 9_700.0, 10_200.0]);
    }

    #[test]
    fn duplicate_ids_still_order_deterministically() {
        let forward = vec![trade("dup", Some(ts(2, 10)), 51.0), trade("dup", Some(ts(2, 10)), -49.0)];
        let backward: Vec<TradeRecord> = forward.iter().rev().cloned().collect();
        assert_eq!(
            build_balance_curve(0.5, &forward, ts(9, 0)),
            build_balance_curve(0.5, &backward, ts(9, 0))
        );
    }
}
