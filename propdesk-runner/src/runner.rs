//! Account evaluator — wires together loading, normalization, memo and engine.
//!
//! Two entry points:
//! - `Evaluator::evaluate()`: raw payloads already in memory. Used by the CLI
//!   demo and by callers that fetched trades themselves.
//! - `Evaluator::evaluate_file()`: loads a trade file first. Used by `batch`
//!   and `evaluate`.

use std::path::Path;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use propdesk_core::domain::{AccountId, AccountParameters};
use propdesk_core::normalize::{normalize_batch, RawTrade};
use propdesk_core::{evaluate_records, EngineError, EvaluationOptions, EvaluationReport};

use crate::config::{ConfigError, EvaluationSettings, PartialBatch};
use crate::data_loader::{load_trades, LoadError};
use crate::fingerprint::{fingerprint, SnapshotFingerprint};
use crate::memo::EvaluationMemo;

/// Errors from evaluating one account.
#[derive(Debug, Error)]
pub enum RunError {
    #[error("config error: {0}")]
    Config(#[from] ConfigError),
    #[error("load error: {0}")]
    Load(#[from] LoadError),
    #[error("engine error: {0}")]
    Engine(#[from] EngineError),
    #[error("account '{account}': {rejected} of {total} trade records rejected and partial batches are refused")]
    PartialBatch {
        account: AccountId,
        rejected: usize,
        total: usize,
    },
}

/// Current schema version for exported evaluations.
pub const SCHEMA_VERSION: u32 = 1;

/// Everything produced for one account.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AccountEvaluation {
    /// Schema version for forward-compatible deserialization.
    #[serde(default = "default_schema_version")]
    pub schema_version: u32,
    pub account_id: AccountId,
    pub account: AccountParameters,
    pub fingerprint: SnapshotFingerprint,
    pub evaluated_at: DateTime<Utc>,
    /// Served from the memo rather than recomputed.
    #[serde(default)]
    pub cached: bool,
    pub report: EvaluationReport,
}

fn default_schema_version() -> u32 {
    SCHEMA_VERSION
}

/// Evaluates accounts under one set of settings and one evaluation time.
#[derive(Debug)]
pub struct Evaluator {
    settings: EvaluationSettings,
    options: EvaluationOptions,
    memo: Option<EvaluationMemo>,
}

impl Evaluator {
    pub fn new(settings: EvaluationSettings, evaluation_time: DateTime<Utc>) -> Result<Self, ConfigError> {
        let calendar = settings.calendar()?;
        Ok(Self {
            settings,
            options: EvaluationOptions::at(evaluation_time).with_calendar(calendar),
            memo: None,
        })
    }

    /// Remember reports by snapshot fingerprint for the evaluator's lifetime.
    pub fn with_memo(mut self) -> Self {
        self.memo = Some(EvaluationMemo::new());
        self
    }

    pub fn settings(&self) -> &EvaluationSettings {
        &self.settings
    }

    pub fn options(&self) -> &EvaluationOptions {
        &self.options
    }

    pub fn memo(&self) -> Option<&EvaluationMemo> {
        self.memo.as_ref()
    }

    /// Load a trade file and evaluate it.
    pub fn evaluate_file(
        &self,
        account_id: &AccountId,
        account: &AccountParameters,
        path: &Path,
    ) -> Result<AccountEvaluation, RunError> {
        let raw = load_trades(path)?;
        tracing::debug!(account = %account_id, path = %path.display(), records = raw.len(), "Loaded trade file.");
        self.evaluate(account_id, account, &raw)
    }

    /// Normalize and evaluate raw payloads for one account.
    pub fn evaluate(
        &self,
        account_id: &AccountId,
        account: &AccountParameters,
        raw: &[RawTrade],
    ) -> Result<AccountEvaluation, RunError> {
        let batch = normalize_batch(raw);

        if !batch.is_complete() {
            for rejected in &batch.rejected {
                tracing::debug!(
                    account = %account_id,
                    index = rejected.index,
                    id = rejected.id.as_deref().unwrap_or("-"),
                    error = %rejected.error,
                    "Rejected trade record."
                );
            }
            tracing::warn!(
                account = %account_id,
                rejected = batch.rejected.len(),
                total = batch.input_len(),
                "Trade history normalized with rejected records."
            );
            if self.settings.partial_batch == PartialBatch::Reject {
                return Err(RunError::PartialBatch {
                    account: account_id.clone(),
                    rejected: batch.rejected.len(),
                    total: batch.input_len(),
                });
            }
        }

        let key = fingerprint(account, &batch.trades, &self.options);
        let compute = || evaluate_records(account, &batch.trades, &self.options);
        let (report, cached) = match &self.memo {
            Some(memo) => {
                let (shared, cached) = memo.get_or_try_insert(&key, compute)?;
                ((*shared).clone(), cached)
            }
            None => (compute()?, false),
        };

        let mut report = report;
        report.rejected = batch.rejected;

        tracing::debug!(
            account = %account_id,
            fingerprint = key.short(),
            cached,
            trades = report.stats.total_trades,
            outcome = %report.outcome,
            "Evaluated account."
        );

        Ok(AccountEvaluation {
            schema_version: SCHEMA_VERSION,
            account_id: account_id.clone(),
            account: *account,
            fingerprint: key,
            evaluated_at: self.options.evaluation_time,
            cached,
            report,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use serde_json::json;

    fn evaluator(policy: PartialBatch) -> Evaluator {
        let settings = EvaluationSettings {
            day_offset_minutes: 0,
            partial_batch: policy,
        };
        Evaluator::new(settings, Utc.with_ymd_and_hms(2024, 7, 1, 0, 0, 0).unwrap()).unwrap()
    }

    fn history() -> Vec<RawTrade> {
        vec![
            json!({"id": 1, "symbol": "EURUSD", "volume": 1, "open_time": "2024-06-03 09:00:00",
                   "close_time": "2024-06-03 11:00:00", "profit": 400}),
            json!({"id": 2, "symbol": "EURUSD", "volume": 1}),
        ]
    }

    #[test]
    fn accept_policy_reports_rejects() {
        let result = evaluator(PartialBatch::Accept)
            .evaluate(&AccountId::new("A"), &AccountParameters::default(), &history())
            .unwrap();
        assert_eq!(result.report.rejected.len(), 1);
        assert_eq!(result.report.final_balance(), 100_400.0);
        assert_eq!(result.schema_version, SCHEMA_VERSION);
        assert!(!result.cached);
    }

    #[test]
    fn reject_policy_refuses_partial_history() {
        let err = evaluator(PartialBatch::Reject)
            .evaluate(&AccountId::new("A"), &AccountParameters::default(), &history())
            .unwrap_err();
        assert!(matches!(err, RunError::PartialBatch { rejected: 1, total: 2, .. }));
    }

    #[test]
    fn memo_serves_repeat_snapshots() {
        let evaluator = evaluator(PartialBatch::Accept).with_memo();
        let params = AccountParameters::default();
        let first = evaluator.evaluate(&AccountId::new("A"), &params, &history()).unwrap();
        let second = evaluator.evaluate(&AccountId::new("B"), &params, &history()).unwrap();
        assert!(!first.cached);
        assert!(second.cached);
        assert_eq!(first.fingerprint, second.fingerprint);
        assert_eq!(first.report, second.report);
        assert_eq!(second.report.rejected.len(), 1);
    }

    #[test]
    fn invalid_parameters_surface_as_engine_error() {
        let params = AccountParameters {
            daily_drawdown_percent: f64::NAN,
            ..AccountParameters::default()
        };
        let err = evaluator(PartialBatch::Accept)
            .evaluate(&AccountId::new("A"), &params, &[])
            .unwrap_err();
        assert!(matches!(err, RunError::Engine(EngineError::InvalidParameters(_))));
    }
}
