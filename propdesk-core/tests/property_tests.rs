//! Property tests for evaluation invariants.
//!
//! Uses proptest to verify:
//! 1. Balance conservation — final minus initial equals the summed net P&L
//! 2. Curve length — one leading point plus one per closed trade
//! 3. Peak monotonicity — the running peak never falls, drawdown never negative
//! 4. Order independence — shuffled input yields the same report
//! 5. Rate bounds — win rate plus loss rate never exceeds 100

use chrono::{DateTime, Duration, TimeZone, Utc};
use proptest::prelude::*;

use propdesk_core::domain::{AccountParameters, TradeId, TradeRecord, TradeSide};
use propdesk_core::engine::{build_balance_curve, drawdown_curve};
use propdesk_core::stats::AggregateStats;
use propdesk_core::{evaluate_records, EvaluationOptions};

// ── Strategies (proptest) ────────────────────────────────────────────

fn epoch() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap()
}

fn arb_amount() -> impl Strategy<Value = f64> {
    (-5_000.0..5_000.0_f64).prop_map(|a| (a * 100.0).round() / 100.0)
}

fn arb_trade() -> impl Strategy<Value = TradeRecord> {
    (
        0u32..10_000,
        0i64..(30 * 24 * 60),
        prop::option::weighted(0.9, 0i64..(3 * 24 * 60)),
        arb_amount(),
        (-20.0..0.0_f64),
        prop_oneof![Just(TradeSide::Buy), Just(TradeSide::Sell)],
    )
        .prop_map(|(id, open_min, hold_min, profit, commission, side)| {
            let open_time = epoch() + Duration::minutes(open_min);
            TradeRecord {
                id: TradeId::from(u64::from(id)),
                symbol: if id % 3 == 0 { "XAUUSD".into() } else { "EURUSD".into() },
                side,
                volume: 1.0,
                open_time,
                close_time: hold_min.map(|m| open_time + Duration::minutes(m)),
                profit,
                commission,
                swap: 0.0,
            }
        })
}

fn arb_history() -> impl Strategy<Value = Vec<TradeRecord>> {
    prop::collection::vec(arb_trade(), 0..60)
}

// ── 1. Balance conservation ──────────────────────────────────────────

proptest! {
    #[test]
    fn final_balance_matches_net_sum(trades in arb_history()) {
        let curve = build_balance_curve(100_000.0, &trades, epoch());
        let net: f64 = trades.iter().filter(|t| t.is_closed()).map(TradeRecord::net_pnl).sum();
        prop_assert!((curve.final_balance() - curve.initial_balance() - net).abs() < 1e-6);
    }
}

// ── 2. Curve length ──────────────────────────────────────────────────

proptest! {
    #[test]
    fn curve_has_one_point_per_closed_trade(trades in arb_history()) {
        let curve = build_balance_curve(50_000.0, &trades, epoch());
        let closed = trades.iter().filter(|t| t.is_closed()).count();
        prop_assert_eq!(curve.len(), closed + 1);
        prop_assert_eq!(curve.points()[0].balance, 50_000.0);
    }
}

// ── 3. Peak monotonicity ─────────────────────────────────────────────

proptest! {
    #[test]
    fn peak_never_decreases(trades in arb_history()) {
        let curve = build_balance_curve(100_000.0, &trades, epoch());
        let points = drawdown_curve(&curve);
        for pair in points.windows(2) {
            prop_assert!(pair[1].peak_balance >= pair[0].peak_balance);
        }
        for p in &points {
            prop_assert!(p.drawdown_amount >= 0.0);
            prop_assert!(p.peak_balance >= p.balance);
        }
    }

    #[test]
    fn max_drawdown_is_non_negative(trades in arb_history()) {
        let report = evaluate_records(
            &AccountParameters::default(),
            &trades,
            &EvaluationOptions::at(epoch()),
        ).unwrap();
        prop_assert!(report.drawdown.max_drawdown_amount >= 0.0);
        prop_assert!(report.drawdown.daily_drawdown_amount >= 0.0);
        prop_assert!(report.drawdown.worst_daily_drawdown_amount >= report.drawdown.daily_drawdown_amount);
    }
}

// ── 4. Order independence ────────────────────────────────────────────

proptest! {
    #[test]
    fn shuffled_input_gives_same_report(
        trades in arb_history(),
        rotation in 0usize..60,
    ) {
        let options = EvaluationOptions::at(epoch());
        let params = AccountParameters::default();

        let mut scrambled = trades.clone();
        scrambled.reverse();
        if !scrambled.is_empty() {
            let k = rotation % scrambled.len();
            scrambled.rotate_left(k);
        }

        let a = evaluate_records(&params, &trades, &options).unwrap();
        let b = evaluate_records(&params, &scrambled, &options).unwrap();
        prop_assert_eq!(a.balance_curve, b.balance_curve);
        prop_assert_eq!(a.drawdown, b.drawdown);
        prop_assert_eq!(a.objectives, b.objectives);
        prop_assert_eq!(a.symbol_stats, b.symbol_stats);
    }
}

// ── 5. Rate bounds ───────────────────────────────────────────────────

proptest! {
    #[test]
    fn win_and_loss_rates_bounded(trades in arb_history()) {
        let stats = AggregateStats::compute(&trades);
        prop_assert!(stats.win_rate + stats.loss_rate <= 100.0 + 1e-9);
        if stats.breakeven_trades > 0 {
            prop_assert!(stats.win_rate + stats.loss_rate < 100.0);
        }
        prop_assert!(stats.profit_factor >= 0.0);
    }
}
