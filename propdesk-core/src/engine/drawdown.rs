//! Drawdown tracker — peak-to-trough and per-trading-day drawdown.
//!
//! Works on the realized balance curve. Peak balance starts at the leading
//! (initial) point and only ever rises, so every drawdown is measured from
//! the highest balance seen so far.

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use crate::calendar::TradingCalendar;
use crate::domain::{BalanceCurve, TradeRecord};

/// One point of the underwater series.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct DrawdownPoint {
    pub timestamp: DateTime<Utc>,
    pub balance: f64,
    pub peak_balance: f64,
    pub drawdown_amount: f64,
}

/// Balance movement within one trading day.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct DailyBucket {
    pub date: NaiveDate,
    /// Running balance immediately before the day's first closed trade.
    pub starting_balance: f64,
    pub ending_balance: f64,
    /// Lowest balance reached that day, counting the starting balance.
    pub min_balance: f64,
    pub drawdown_amount: f64,
    pub net_pnl: f64,
    pub trades: usize,
}

/// Headline drawdown figures for one evaluation.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct DrawdownSummary {
    pub max_drawdown_amount: f64,
    /// `max_drawdown_amount` relative to the peak in force at the trough.
    pub max_drawdown_percent: f64,
    /// When the maximum drawdown was reached; `None` if there was none.
    pub max_drawdown_at: Option<DateTime<Utc>>,
    /// Highest balance over the whole curve.
    pub peak_balance: f64,
    /// Trading day of the most recent activity, open trades included.
    pub trading_day: Option<NaiveDate>,
    pub daily_starting_balance: f64,
    pub daily_drawdown_amount: f64,
    /// Largest single-day drawdown across the whole history.
    pub worst_daily_drawdown_amount: f64,
}

/// Everything the tracker derives from a curve.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DrawdownAnalysis {
    pub summary: DrawdownSummary,
    pub points: Vec<DrawdownPoint>,
    pub daily: Vec<DailyBucket>,
}

impl DrawdownAnalysis {
    /// Distinct trading days with at least one closed trade.
    pub fn trading_days(&self) -> usize {
        self.daily.len()
    }
}

/// Run the full drawdown analysis.
///
/// `trades` is the complete normalized history (open trades included); it is
/// only consulted to find the most recent day of activity.
pub fn track_drawdown(
    curve: &BalanceCurve,
    trades: &[TradeRecord],
    calendar: &TradingCalendar,
) -> DrawdownAnalysis {
    let points = drawdown_curve(curve);
    let daily = daily_buckets(curve, calendar);

    let (max_drawdown_amount, max_drawdown_percent, max_drawdown_at) = max_drawdown(&points);
    let peak_balance = points.last().map_or(curve.initial_balance(), |p| p.peak_balance);

    let trading_day = trades
        .iter()
        .map(|t| calendar.trading_day(t.activity_time()))
        .max();

    let (daily_starting_balance, daily_drawdown_amount) =
        match trading_day.and_then(|day| daily.iter().find(|b| b.date == day)) {
            Some(bucket) => (bucket.starting_balance, bucket.drawdown_amount),
            // Nothing closed that day yet: the day starts at the current balance.
            None => (curve.final_balance(), 0.0),
        };

    let worst_daily_drawdown_amount = daily
        .iter()
        .map(|b| b.drawdown_amount)
        .fold(0.0_f64, f64::max);

    DrawdownAnalysis {
        summary: DrawdownSummary {
            max_drawdown_amount,
            max_drawdown_percent,
            max_drawdown_at,
            peak_balance,
            trading_day,
            daily_starting_balance,
            daily_drawdown_amount,
            worst_daily_drawdown_amount,
        },
        points,
        daily,
    }
}

/// Underwater series: running peak and distance below it at each point.
pub fn drawdown_curve(curve: &BalanceCurve) -> Vec<DrawdownPoint> {
    let mut peak = curve.initial_balance();
    curve
        .points()
        .iter()
        .map(|p| {
            if p.balance > peak {
                peak = p.balance;
            }
            DrawdownPoint {
                timestamp: p.timestamp,
                balance: p.balance,
                peak_balance: peak,
                drawdown_amount: peak - p.balance,
            }
        })
        .collect()
}

/// Largest drawdown amount, its percentage of the peak at that point, and
/// when it happened. The earliest point wins ties.
fn max_drawdown(points: &[DrawdownPoint]) -> (f64, f64, Option<DateTime<Utc>>) {
    let mut worst: Option<&DrawdownPoint> = None;
    for p in points {
        if p.drawdown_amount > worst.map_or(0.0, |w| w.drawdown_amount) {
            worst = Some(p);
        }
    }
    match worst {
        Some(p) => {
            let pct = if p.peak_balance > 0.0 {
                p.drawdown_amount / p.peak_balance * 100.0
            } else {
                0.0
            };
            (p.drawdown_amount, pct, Some(p.timestamp))
        }
        None => (0.0, 0.0, None),
    }
}

/// Group the curve's trade points by trading day.
///
/// Points are in close-time order, so each day's points are contiguous and
/// the point just before a day's first trade carries its starting balance.
pub fn daily_buckets(curve: &BalanceCurve, calendar: &TradingCalendar) -> Vec<DailyBucket> {
    let points = curve.points();
    let mut buckets: Vec<DailyBucket> = Vec::new();

    for i in 1..points.len() {
        let date = calendar.trading_day(points[i].timestamp);
        let balance = points[i].balance;

        match buckets.last_mut() {
            Some(bucket) if bucket.date == date => {
                bucket.ending_balance = balance;
                bucket.min_balance = bucket.min_balance.min(balance);
                bucket.trades += 1;
            }
            _ => {
                let start = points[i - 1].balance;
                buckets.push(DailyBucket {
                    date,
                    starting_balance: start,
                    ending_balance: balance,
                    min_balance: start.min(balance),
                    drawdown_amount: 0.0,
                    net_pnl: 0.0,
                    trades: 1,
                });
            }
        }
    }

    for bucket in &mut buckets {
        bucket.drawdown_amount = (bucket.starting_balance - bucket.min_balance).max(0.0);
        bucket.net_pnl = bucket.ending_balance - bucket.starting_balance;
    }
    buckets
}
