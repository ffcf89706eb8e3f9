//! Statistics aggregator — trade-level performance figures.
//!
//! Works directly on normalized closed trades; independent of the balance
//! curve. Every figure has an explicit fallback for empty inputs so nothing
//! here divides by zero.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::domain::TradeRecord;
use crate::engine::balance_curve::closed_in_order;

/// Aggregate statistics over all closed trades.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AggregateStats {
    pub total_trades: usize,
    pub winning_trades: usize,
    pub losing_trades: usize,
    /// Net exactly zero: counted in `total_trades` only.
    pub breakeven_trades: usize,
    pub win_rate: f64,
    pub loss_rate: f64,
    /// `+inf` when there are wins but no losses.
    #[serde(with = "unbounded_f64")]
    pub profit_factor: f64,
    pub expectancy: f64,
    pub average_win: f64,
    pub average_loss: f64,
    pub largest_win: f64,
    /// Absolute value of the worst losing trade.
    pub largest_loss: f64,
    pub total_volume: f64,

    pub gross_profit: f64,
    /// Absolute value of the summed losses.
    pub gross_loss: f64,
    pub net_profit: f64,
    pub total_commission: f64,
    pub total_swap: f64,
    pub max_consecutive_wins: usize,
    pub max_consecutive_losses: usize,
    pub average_holding_secs: f64,
}

/// Per-instrument breakdown.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SymbolStat {
    pub symbol: String,
    pub trades: usize,
    pub wins: usize,
    pub losses: usize,
    pub win_rate: f64,
    pub total_profit: f64,
    pub average_profit: f64,
    pub volume: f64,
}

/// Running sums shared by the aggregate and per-symbol figures.
#[derive(Debug, Default, Clone, Copy)]
struct Tally {
    trades: usize,
    wins: usize,
    losses: usize,
    gross_profit: f64,
    gross_loss: f64,
    largest_win: f64,
    largest_loss: f64,
    volume: f64,
}

impl Tally {
    fn add(&mut self, trade: &TradeRecord) {
        let net = trade.net_pnl();
        self.trades += 1;
        self.volume += trade.volume;
        if net > 0.0 {
            self.wins += 1;
            self.gross_profit += net;
            self.largest_win = self.largest_win.max(net);
        } else if net < 0.0 {
            self.losses += 1;
            self.gross_loss += net.abs();
            self.largest_loss = self.largest_loss.max(net.abs());
        }
    }

    fn net(&self) -> f64 {
        self.gross_profit - self.gross_loss
    }
}

impl AggregateStats {
    /// Compute from an unsorted history; open trades are ignored.
    pub fn compute(trades: &[TradeRecord]) -> Self {
        Self::from_ordered(&closed_in_order(trades))
    }

    /// Compute from closed trades already in canonical order. Streaks follow
    /// that order.
    pub fn from_ordered(trades: &[&TradeRecord]) -> Self {
        let mut tally = Tally::default();
        let mut total_commission = 0.0;
        let mut total_swap = 0.0;
        let mut holding_secs: i64 = 0;
        for trade in trades {
            tally.add(trade);
            total_commission += trade.commission;
            total_swap += trade.swap;
            holding_secs += trade.holding_secs().unwrap_or(0);
        }

        let average_holding_secs = if trades.is_empty() {
            0.0
        } else {
            holding_secs as f64 / trades.len() as f64
        };

        Self {
            total_trades: tally.trades,
            winning_trades: tally.wins,
            losing_trades: tally.losses,
            breakeven_trades: tally.trades - tally.wins - tally.losses,
            win_rate: rate(tally.wins, tally.trades),
            loss_rate: rate(tally.losses, tally.trades),
            profit_factor: profit_factor(tally.gross_profit, tally.gross_loss),
            expectancy: expectancy(tally.gross_profit, tally.gross_loss, tally.trades),
            average_win: average(tally.gross_profit, tally.wins),
            average_loss: average(tally.gross_loss, tally.losses),
            largest_win: tally.largest_win,
            largest_loss: tally.largest_loss,
            total_volume: tally.volume,
            gross_profit: tally.gross_profit,
            gross_loss: tally.gross_loss,
            net_profit: tally.net(),
            total_commission,
            total_swap,
            max_consecutive_wins: max_consecutive(trades, TradeRecord::is_winner),
            max_consecutive_losses: max_consecutive(trades, TradeRecord::is_loser),
            average_holding_secs,
        }
    }
}

/// Per-symbol statistics, most-traded first (ties by symbol name).
pub fn symbol_breakdown(trades: &[&TradeRecord]) -> Vec<SymbolStat> {
    let mut by_symbol: BTreeMap<&str, Tally> = BTreeMap::new();
    for trade in trades {
        by_symbol.entry(trade.symbol.as_str()).or_default().add(trade);
    }

    let mut stats: Vec<SymbolStat> = by_symbol
        .into_iter()
        .map(|(symbol, tally)| SymbolStat {
            symbol: symbol.to_string(),
            trades: tally.trades,
            wins: tally.wins,
            losses: tally.losses,
            win_rate: rate(tally.wins, tally.trades),
            total_profit: tally.net(),
            average_profit: average(tally.net(), tally.trades),
            volume: tally.volume,
        })
        .collect();
    // Stable sort keeps the BTreeMap's alphabetical order among equal counts.
    stats.sort_by(|a, b| b.trades.cmp(&a.trades));
    stats
}

// ─── Individual metric functions ────────────────────────────────────

/// `count / total` as a percentage; 0 when `total` is 0.
pub fn rate(count: usize, total: usize) -> f64 {
    if total == 0 {
        return 0.0;
    }
    count as f64 / total as f64 * 100.0
}

/// Gross profit over gross loss (both non-negative).
///
/// `+inf` for wins without losses, 0 when both are zero.
pub fn profit_factor(gross_profit: f64, gross_loss: f64) -> f64 {
    if gross_loss > 0.0 {
        gross_profit / gross_loss
    } else if gross_profit > 0.0 {
        f64::INFINITY
    } else {
        0.0
    }
}

/// Average net result per trade; 0 with no trades.
pub fn expectancy(gross_profit: f64, gross_loss: f64, total_trades: usize) -> f64 {
    if total_trades == 0 {
        return 0.0;
    }
    (gross_profit - gross_loss) / total_trades as f64
}

fn average(sum: f64, count: usize) -> f64 {
    if count == 0 {
        return 0.0;
    }
    sum / count as f64
}

fn max_consecutive(trades: &[&TradeRecord], pred: fn(&TradeRecord) -> bool) -> usize {
    let mut max_streak = 0;
    let mut current = 0;
    for trade in trades {
        if pred(trade) {
            current += 1;
            max_streak = max_streak.max(current);
        } else {
            current = 0;
        }
    }
    max_streak
}

/// JSON has no infinity; write `+inf` as the string `"inf"`.
mod unbounded_f64 {
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(value: &f64, serializer: S) -> Result<S::Ok, S::Error> {
        if value.is_infinite() && value.is_sign_positive() {
            serializer.serialize_str("inf")
        } else {
            serializer.serialize_f64(*value)
        }
    }

    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Repr {
        Number(f64),
        Text(String),
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<f64, D::Error> {
        match Repr::deserialize(deserializer)? {
            Repr::Number(v) => Ok(v),
            Repr::Text(s) if s == "inf" => Ok(f64::INFINITY),
            Repr::Text(s) => Err(serde::de::Error::custom(format!("expected number or \"inf\", got {s:?}"))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{TradeId, TradeSide};
    use chrono::{Duration, TimeZone, Utc};

    fn make_trade(id: u64, symbol: &str, net: f64) -> TradeRecord {
        let open = Utc.with_ymd_and_hms(2024, 1, 2, 9, 0, 0).unwrap() + Duration::hours(id as i64);
        TradeRecord {
            id: TradeId::from(id),
            symbol: symbol.into(),
            side: TradeSide::Buy,
            volume: 1.0,
            open_time: open,
            close_time: Some(open + Duration::minutes(30)),
            profit: net,
            commission: 0.0,
            swap: 0.0,
        }
    }

    fn trades(nets: &[f64]) -> Vec<TradeRecord> {
        nets.iter()
            .enumerate()
            .map(|(i, &n)| make_trade(i as u64 + 10, "EURUSD", n))
            .collect()
    }

    // ── Profit factor ──

    #[test]
    fn profit_factor_mixed() {
        let s = AggregateStats::compute(&trades(&[500.0, -200.0, 300.0]));
        assert!((s.profit_factor - 4.0).abs() < 1e-10);
    }

    #[test]
    fn profit_factor_all_winners_is_infinite() {
        let s = AggregateStats::compute(&trades(&[500.0, 300.0]));
        assert!(s.profit_factor.is_infinite() && s.profit_factor > 0.0);
    }

    #[test]
    fn profit_factor_all_losers_is_zero() {
        let s = AggregateStats::compute(&trades(&[-500.0, -300.0]));
        assert_eq!(s.profit_factor, 0.0);
    }

    #[test]
    fn profit_factor_nothing_is_zero() {
        assert_eq!(profit_factor(0.0, 0.0), 0.0);
    }

    // ── Rates and averages ──

    #[test]
    fn breakeven_counts_toward_total_only() {
        let s = AggregateStats::compute(&trades(&[100.0, -50.0, 0.0, 0.0]));
        assert_eq!(s.total_trades, 4);
        assert_eq!(s.winning_trades, 1);
        assert_eq!(s.losing_trades, 1);
        assert_eq!(s.breakeven_trades, 2);
        assert_eq!(s.win_rate, 25.0);
        assert_eq!(s.loss_rate, 25.0);
        assert!(s.win_rate + s.loss_rate < 100.0);
    }

    #[test]
    fn averages_and_extremes() {
        let s = AggregateStats::compute(&trades(&[100.0, 300.0, -50.0, -150.0]));
        assert_eq!(s.average_win, 200.0);
        assert_eq!(s.average_loss, 100.0);
        assert_eq!(s.largest_win, 300.0);
        assert_eq!(s.largest_loss, 150.0);
        assert_eq!(s.expectancy, 50.0);
        assert_eq!(s.gross_profit, 400.0);
        assert_eq!(s.gross_loss, 200.0);
        assert_eq!(s.net_profit, 200.0);
        assert_eq!(s.total_volume, 4.0);
    }

    #[test]
    fn empty_history_is_all_zero() {
        let s = AggregateStats::compute(&[]);
        assert_eq!(s.total_trades, 0);
        assert_eq!(s.win_rate, 0.0);
        assert_eq!(s.loss_rate, 0.0);
        assert_eq!(s.profit_factor, 0.0);
        assert_eq!(s.expectancy, 0.0);
        assert_eq!(s.average_win, 0.0);
        assert_eq!(s.largest_loss, 0.0);
        assert_eq!(s.average_holding_secs, 0.0);
    }

    #[test]
    fn open_trades_are_ignored() {
        let mut history = trades(&[100.0]);
        let mut open = make_trade(99, "EURUSD", 1_000.0);
        open.close_time = None;
        history.push(open);
        let s = AggregateStats::compute(&history);
        assert_eq!(s.total_trades, 1);
        assert_eq!(s.net_profit, 100.0);
    }

    #[test]
    fn net_includes_costs() {
        let mut t = make_trade(1, "EURUSD", 10.0);
        t.commission = -7.0;
        t.swap = -4.0;
        let s = AggregateStats::compute(&[t]);
        assert_eq!(s.losing_trades, 1);
        assert_eq!(s.largest_loss, 1.0);
        assert_eq!(s.total_commission, -7.0);
        assert_eq!(s.total_swap, -4.0);
    }

    #[test]
    fn streaks_follow_close_order() {
        let s = AggregateStats::compute(&trades(&[10.0, 20.0, 30.0, -5.0, 10.0, -1.0, -2.0]));
        assert_eq!(s.max_consecutive_wins, 3);
        assert_eq!(s.max_consecutive_losses, 2);
    }

    #[test]
    fn holding_time_average() {
        let s = AggregateStats::compute(&trades(&[1.0, 2.0]));
        assert_eq!(s.average_holding_secs, 1800.0);
    }

    // ── Per symbol ──

    #[test]
    fn symbol_breakdown_sorted_by_trade_count() {
        let history = vec![
            make_trade(1, "GBPUSD", 50.0),
            make_trade(2, "XAUUSD", -20.0),
            make_trade(3, "XAUUSD", 80.0),
            make_trade(4, "AUDUSD", 10.0),
            make_trade(5, "XAUUSD", 0.0),
        ];
        let ordered = closed_in_order(&history);
        let stats = symbol_breakdown(&ordered);
        let names: Vec<&str> = stats.iter().map(|s| s.symbol.as_str()).collect();
        assert_eq!(names, vec!["XAUUSD", "AUDUSD", "GBPUSD"]);

        let gold = &stats[0];
        assert_eq!(gold.trades, 3);
        assert_eq!(gold.wins, 1);
        assert_eq!(gold.losses, 1);
        assert!((gold.win_rate - 100.0 / 3.0).abs() < 1e-10);
        assert_eq!(gold.total_profit, 60.0);
        assert_eq!(gold.average_profit, 20.0);
    }

    // ── Serialization ──

    #[test]
    fn infinite_profit_factor_serializes_as_inf() {
        let s = AggregateStats::compute(&trades(&[5.0]));
        let json = serde_json::to_value(&s).unwrap();
        assert_eq!(json["profit_factor"], serde_json::json!("inf"));
        let back: AggregateStats = serde_json::from_value(json).unwrap();
        assert!(back.profit_factor.is_infinite());
    }
}
