//! Single-call evaluation of one account snapshot.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use super::balance_curve::{build_from_ordered, closed_in_order};
use super::drawdown::{track_drawdown, DailyBucket, DrawdownPoint, DrawdownSummary};
use super::objectives::{evaluate_objectives, ChallengeOutcome, Objective, ObjectiveKind};
use crate::calendar::TradingCalendar;
use crate::domain::{AccountParameters, BalanceCurve, ParameterError, TradeRecord};
use crate::normalize::{normalize_batch, RawTrade, RejectedTrade};
use crate::stats::{symbol_breakdown, AggregateStats, SymbolStat};

#[derive(Debug, Error)]
pub enum EngineError {
    #[error("invalid account parameters: {0}")]
    InvalidParameters(#[from] ParameterError),
}

/// One account's rule parameters plus its raw trade history.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EvaluationRequest {
    pub account: AccountParameters,
    pub trades: Vec<RawTrade>,
}

/// Context the engine cannot infer from the trades themselves.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct EvaluationOptions {
    /// Timestamp given to the leading curve point when nothing has closed.
    pub evaluation_time: DateTime<Utc>,
    #[serde(default)]
    pub calendar: TradingCalendar,
}

impl EvaluationOptions {
    pub fn at(evaluation_time: DateTime<Utc>) -> Self {
        Self {
            evaluation_time,
            calendar: TradingCalendar::utc(),
        }
    }

    pub fn with_calendar(mut self, calendar: TradingCalendar) -> Self {
        self.calendar = calendar;
        self
    }
}

/// Immutable result bundle for one snapshot.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EvaluationReport {
    pub balance_curve: BalanceCurve,
    pub drawdown: DrawdownSummary,
    pub drawdown_curve: Vec<DrawdownPoint>,
    pub daily: Vec<DailyBucket>,
    pub objectives: Vec<Objective>,
    pub outcome: ChallengeOutcome,
    pub stats: AggregateStats,
    pub symbol_stats: Vec<SymbolStat>,
    /// Raw records the normalizer dropped.
    pub rejected: Vec<RejectedTrade>,
}

impl EvaluationReport {
    pub fn final_balance(&self) -> f64 {
        self.balance_curve.final_balance()
    }

    pub fn objective(&self, kind: ObjectiveKind) -> Option<&Objective> {
        self.objectives.iter().find(|o| o.kind == kind)
    }
}

/// Normalize the raw history and evaluate it.
///
/// Malformed records do not fail the call; they are listed in
/// `EvaluationReport::rejected` and left out of every figure.
pub fn evaluate(
    request: &EvaluationRequest,
    options: &EvaluationOptions,
) -> Result<EvaluationReport, EngineError> {
    request.account.validate()?;
    let batch = normalize_batch(&request.trades);
    let mut report = evaluate_records(&request.account, &batch.trades, options)?;
    report.rejected = batch.rejected;
    Ok(report)
}

/// Evaluate an already-normalized history.
pub fn evaluate_records(
    account: &AccountParameters,
    trades: &[TradeRecord],
    options: &EvaluationOptions,
) -> Result<EvaluationReport, EngineError> {
    account.validate()?;

    let ordered = closed_in_order(trades);
    let curve = build_from_ordered(account.initial_balance, &ordered, options.evaluation_time);
    let drawdown = track_drawdown(&curve, trades, &options.calendar);
    let objectives = evaluate_objectives(account, &curve, &drawdown);
    let outcome = ChallengeOutcome::from_objectives(&objectives);
    let stats = AggregateStats::from_ordered(&ordered);
    let symbol_stats = symbol_breakdown(&ordered);

    Ok(EvaluationReport {
        balance_curve: curve,
        drawdown: drawdown.summary,
        drawdown_curve: drawdown.points,
        daily: drawdown.daily,
        objectives,
        outcome,
        stats,
        symbol_stats,
        rejected: Vec::new(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::objectives::ObjectiveStatus;
    use chrono::TimeZone;
    use serde_json::json;

    fn options() -> EvaluationOptions {
        EvaluationOptions::at(Utc.with_ymd_and_hms(2024, 6, 1, 0, 0, 0).unwrap())
    }

    #[test]
    fn rejects_invalid_parameters() {
        let request = EvaluationRequest {
            account: AccountParameters {
                initial_balance: 0.0,
                ..AccountParameters::default()
            },
            trades: vec![],
        };
        let err = evaluate(&request, &options()).unwrap_err();
        assert!(matches!(
            err,
            EngineError::InvalidParameters(ParameterError::InitialBalance(_))
        ));
    }

    #[test]
    fn malformed_records_are_reported_not_fatal() {
        let request = EvaluationRequest {
            account: AccountParameters::default(),
            trades: vec![
                json!({"id": 1, "symbol": "EURUSD", "volume": 1.0,
                       "open_time": "2024-05-01T09:00:00Z",
                       "close_time": "2024-05-01T10:00:00Z", "profit": 250.0}),
                json!({"id": 2, "symbol": "EURUSD", "open_time": "2024-05-01T09:00:00Z"}),
                json!("garbage"),
            ],
        };
        let report = evaluate(&request, &options()).unwrap();
        assert_eq!(report.stats.total_trades, 1);
        assert_eq!(report.final_balance(), 100_250.0);
        let indices: Vec<usize> = report.rejected.iter().map(|r| r.index).collect();
        assert_eq!(indices, vec![1, 2]);
    }

    #[test]
    fn empty_history_uses_evaluation_time() {
        let opts = options();
        let report = evaluate_records(&AccountParameters::default(), &[], &opts).unwrap();
        assert_eq!(report.balance_curve.len(), 1);
        assert_eq!(report.balance_curve.points()[0].timestamp, opts.evaluation_time);
        assert_eq!(report.outcome, ChallengeOutcome::Active);
        let target = report.objective(ObjectiveKind::ProfitTarget).unwrap();
        assert_eq!(target.status, ObjectiveStatus::Pending);
    }

    #[test]
    fn report_serializes_to_json() {
        let report = evaluate_records(&AccountParameters::default(), &[], &options()).unwrap();
        let value = serde_json::to_value(&report).unwrap();
        assert!(value["balance_curve"].is_array());
        assert_eq!(value["outcome"], json!("active"));
        assert_eq!(value["objectives"].as_array().map(Vec::len), Some(4));
    }
}
