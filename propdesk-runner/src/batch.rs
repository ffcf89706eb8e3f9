//! Batch evaluation of many accounts, optionally in parallel.
//!
//! Each account is loaded and evaluated independently; a failure is recorded
//! against that account and never stops the rest of the batch. Results come
//! back sorted by account id however rayon scheduled the work.

use std::path::Path;

use chrono::{DateTime, Utc};
use rayon::prelude::*;
use serde::Serialize;

use propdesk_core::domain::AccountId;
use propdesk_core::engine::ChallengeOutcome;

use crate::config::{AccountJob, BatchManifest};
use crate::runner::{AccountEvaluation, Evaluator, RunError};

/// Result for one account of a batch.
#[derive(Debug)]
pub struct BatchEntry {
    pub account_id: AccountId,
    pub result: Result<AccountEvaluation, RunError>,
}

/// One line of the batch summary table.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BatchSummaryRow {
    pub account_id: AccountId,
    /// `passed`, `failed`, `active`, or `error`.
    pub status: String,
    pub final_balance: Option<f64>,
    pub max_drawdown_amount: Option<f64>,
    pub total_trades: Option<usize>,
    pub rejected_records: Option<usize>,
    pub error: Option<String>,
}

/// All results of a batch run, sorted by account id.
#[derive(Debug, Default)]
pub struct BatchResults {
    pub entries: Vec<BatchEntry>,
}

impl BatchResults {
    fn new(mut entries: Vec<BatchEntry>) -> Self {
        entries.sort_by(|a, b| a.account_id.cmp(&b.account_id));
        Self { entries }
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn evaluations(&self) -> impl Iterator<Item = &AccountEvaluation> {
        self.entries.iter().filter_map(|e| e.result.as_ref().ok())
    }

    pub fn errors(&self) -> impl Iterator<Item = (&AccountId, &RunError)> {
        self.entries
            .iter()
            .filter_map(|e| e.result.as_ref().err().map(|err| (&e.account_id, err)))
    }

    pub fn count_outcome(&self, outcome: ChallengeOutcome) -> usize {
        self.evaluations().filter(|e| e.report.outcome == outcome).count()
    }

    pub fn summary_rows(&self) -> Vec<BatchSummaryRow> {
        self.entries
            .iter()
            .map(|entry| match &entry.result {
                Ok(eval) => BatchSummaryRow {
                    account_id: entry.account_id.clone(),
                    status: eval.report.outcome.to_string(),
                    final_balance: Some(eval.report.final_balance()),
                    max_drawdown_amount: Some(eval.report.drawdown.max_drawdown_amount),
                    total_trades: Some(eval.report.stats.total_trades),
                    rejected_records: Some(eval.report.rejected.len()),
                    error: None,
                },
                Err(err) => BatchSummaryRow {
                    account_id: entry.account_id.clone(),
                    status: "error".into(),
                    final_balance: None,
                    max_drawdown_amount: None,
                    total_trades: None,
                    rejected_records: None,
                    error: Some(err.to_string()),
                },
            })
            .collect()
    }
}

/// Batch executor.
///
/// Runs every job of a manifest through one `Evaluator`, optionally in parallel.
pub struct BatchRunner {
    evaluator: Evaluator,
    parallel: bool,
}

impl BatchRunner {
    pub fn new(evaluator: Evaluator) -> Self {
        Self {
            evaluator,
            parallel: true,
        }
    }

    /// Enables or disables parallel execution.
    pub fn with_parallelism(mut self, parallel: bool) -> Self {
        self.parallel = parallel;
        self
    }

    pub fn evaluator(&self) -> &Evaluator {
        &self.evaluator
    }

    pub fn run(&self, jobs: &[AccountJob]) -> BatchResults {
        tracing::info!(accounts = jobs.len(), parallel = self.parallel, "Starting batch evaluation.");

        let entries: Vec<BatchEntry> = if self.parallel {
            jobs.par_iter().map(|job| self.run_job(job)).collect()
        } else {
            jobs.iter().map(|job| self.run_job(job)).collect()
        };
        let results = BatchResults::new(entries);

        tracing::info!(
            accounts = results.len(),
            passed = results.count_outcome(ChallengeOutcome::Passed),
            failed = results.count_outcome(ChallengeOutcome::Failed),
            active = results.count_outcome(ChallengeOutcome::Active),
            errors = results.errors().count(),
            "Batch evaluation finished."
        );
        results
    }

    fn run_job(&self, job: &AccountJob) -> BatchEntry {
        let result = self
            .evaluator
            .evaluate_file(&job.id, &job.account, &job.trades_path);
        if let Err(err) = &result {
            tracing::warn!(account = %job.id, error = %err, "Account evaluation failed.");
        }
        BatchEntry {
            account_id: job.id.clone(),
            result,
        }
    }
}

/// Load a manifest and evaluate every account in it.
pub fn run_manifest(
    path: &Path,
    evaluation_time: DateTime<Utc>,
    parallel: bool,
) -> Result<BatchResults, RunError> {
    let manifest = BatchManifest::load(path)?;
    let jobs = manifest.jobs()?;
    let evaluator = Evaluator::new(manifest.evaluation, evaluation_time)?.with_memo();
    Ok(BatchRunner::new(evaluator).with_parallelism(parallel).run(&jobs))
}
