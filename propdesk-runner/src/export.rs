//! Reporting and export — JSON, CSV, and Markdown artifact generation.
//!
//! Provides three export formats for account evaluations:
//! - **JSON**: full round-trip serialization with schema versioning
//! - **CSV**: balance curve, daily buckets, objectives and per-symbol tables
//! - **Markdown**: human-readable single-account and batch summaries
//!
//! Persisted evaluations carry a `schema_version` field. Unknown versions
//! are rejected on load.

use std::path::{Path, PathBuf};

use anyhow::{bail, Context, Result};
use propdesk_core::engine::ObjectiveKind;
use propdesk_core::EvaluationReport;

use crate::batch::BatchResults;
use crate::runner::{AccountEvaluation, SCHEMA_VERSION};

// ─── JSON export ────────────────────────────────────────────────────

/// Serialize an `AccountEvaluation` to pretty JSON.
pub fn export_json(evaluation: &AccountEvaluation) -> Result<String> {
    serde_json::to_string_pretty(evaluation).context("failed to serialize evaluation to JSON")
}

/// Deserialize an `AccountEvaluation` from JSON, rejecting unknown schema versions.
pub fn import_json(json: &str) -> Result<AccountEvaluation> {
    let evaluation: AccountEvaluation =
        serde_json::from_str(json).context("failed to deserialize evaluation from JSON")?;
    if evaluation.schema_version > SCHEMA_VERSION {
        bail!(
            "unsupported schema version {} (max supported: {})",
            evaluation.schema_version,
            SCHEMA_VERSION
        );
    }
    Ok(evaluation)
}

// ─── CSV export ─────────────────────────────────────────────────────

/// Balance curve with its underwater columns.
///
/// Columns: timestamp, balance, peak_balance, drawdown_amount
pub fn export_balance_curve_csv(report: &EvaluationReport) -> Result<String> {
    let mut wtr = csv::Writer::from_writer(vec![]);
    wtr.write_record(["timestamp", "balance", "peak_balance", "drawdown_amount"])?;
    for p in &report.drawdown_curve {
        wtr.write_record([
            &p.timestamp.to_rfc3339(),
            &format!("{:.2}", p.balance),
            &format!("{:.2}", p.peak_balance),
            &format!("{:.2}", p.drawdown_amount),
        ])?;
    }
    finish(wtr)
}

/// One row per trading day.
pub fn export_daily_csv(report: &EvaluationReport) -> Result<String> {
    let mut wtr = csv::Writer::from_writer(vec![]);
    wtr.write_record([
        "date",
        "starting_balance",
        "ending_balance",
        "min_balance",
        "drawdown_amount",
        "net_pnl",
        "trades",
    ])?;
    for d in &report.daily {
        wtr.write_record([
            &d.date.to_string(),
            &format!("{:.2}", d.starting_balance),
            &format!("{:.2}", d.ending_balance),
            &format!("{:.2}", d.min_balance),
            &format!("{:.2}", d.drawdown_amount),
            &format!("{:.2}", d.net_pnl),
            &d.trades.to_string(),
        ])?;
    }
    finish(wtr)
}

pub fn export_objectives_csv(report: &EvaluationReport) -> Result<String> {
    let mut wtr = csv::Writer::from_writer(vec![]);
    wtr.write_record(["objective", "threshold", "target", "current", "status", "progress_percent"])?;
    for o in &report.objectives {
        wtr.write_record([
            &o.kind.to_string(),
            &format!("{}", o.threshold),
            &format!("{:.2}", o.target),
            &format!("{:.2}", o.current),
            &o.status.to_string(),
            &format!("{:.1}", o.progress_percent()),
        ])?;
    }
    finish(wtr)
}

pub fn export_symbol_stats_csv(report: &EvaluationReport) -> Result<String> {
    let mut wtr = csv::Writer::from_writer(vec![]);
    wtr.write_record([
        "symbol",
        "trades",
        "wins",
        "losses",
        "win_rate",
        "total_profit",
        "average_profit",
        "volume",
    ])?;
    for s in &report.symbol_stats {
        wtr.write_record([
            &s.symbol,
            &s.trades.to_string(),
            &s.wins.to_string(),
            &s.losses.to_string(),
            &format!("{:.2}", s.win_rate),
            &format!("{:.2}", s.total_profit),
            &format!("{:.2}", s.average_profit),
            &format!("{}", s.volume),
        ])?;
    }
    finish(wtr)
}

/// One row per account of a batch, errors included.
pub fn export_batch_summary_csv(results: &BatchResults) -> Result<String> {
    let mut wtr = csv::Writer::from_writer(vec![]);
    for row in results.summary_rows() {
        wtr.serialize(row)?;
    }
    finish(wtr)
}

fn finish(wtr: csv::Writer<Vec<u8>>) -> Result<String> {
    let data = wtr.into_inner().context("failed to flush CSV writer")?;
    String::from_utf8(data).context("CSV output is not valid UTF-8")
}

// ─── Artifact bundle ────────────────────────────────────────────────

/// Write the four CSV tables of one evaluation into `dir`.
///
/// Creates `balance_curve.csv`, `daily.csv`, `objectives.csv` and
/// `symbols.csv`, returning their paths.
pub fn write_csv_tables(report: &EvaluationReport, dir: &Path) -> Result<Vec<PathBuf>> {
    std::fs::create_dir_all(dir)
        .with_context(|| format!("failed to create output dir: {}", dir.display()))?;
    let tables = [
        ("balance_curve.csv", export_balance_curve_csv(report)?),
        ("daily.csv", export_daily_csv(report)?),
        ("objectives.csv", export_objectives_csv(report)?),
        ("symbols.csv", export_symbol_stats_csv(report)?),
    ];
    let mut written = Vec::with_capacity(tables.len());
    for (name, body) in tables {
        let path = dir.join(name);
        std::fs::write(&path, body).with_context(|| format!("failed to write {}", path.display()))?;
        written.push(path);
    }
    Ok(written)
}

/// Write every evaluation of a batch as `<account>.json`, plus `summary.csv`
/// and `summary.md`.
pub fn save_batch(results: &BatchResults, dir: &Path) -> Result<PathBuf> {
    std::fs::create_dir_all(dir)
        .with_context(|| format!("failed to create output dir: {}", dir.display()))?;
    for evaluation in results.evaluations() {
        let path = dir.join(format!("{}.json", file_stem(&evaluation.account_id.0)));
        std::fs::write(&path, export_json(evaluation)?)
            .with_context(|| format!("failed to write {}", path.display()))?;
    }
    std::fs::write(dir.join("summary.csv"), export_batch_summary_csv(results)?)?;
    std::fs::write(dir.join("summary.md"), generate_batch_report(results))?;
    Ok(dir.to_path_buf())
}

/// Load an evaluation written by `save_batch` or `export_json`.
pub fn load_evaluation(path: &Path) -> Result<AccountEvaluation> {
    let json = std::fs::read_to_string(path)
        .with_context(|| format!("failed to read {}", path.display()))?;
    import_json(&json)
}

/// Account ids come from back-office data; keep file names tame.
fn file_stem(id: &str) -> String {
    id.chars()
        .map(|c| if c.is_ascii_alphanumeric() || c == '-' || c == '_' { c } else { '_' })
        .collect()
}

// ─── Markdown reports ───────────────────────────────────────────────

/// Generate a Markdown report for one account.
pub fn generate_report(evaluation: &AccountEvaluation) -> String {
    let report = &evaluation.report;
    let params = &evaluation.account;
    let mut md = String::with_capacity(2048);

    md.push_str(&format!("# Challenge Report: {}\n\n", evaluation.account_id));

    // Metadata
    md.push_str("## Account\n\n");
    md.push_str("| Field | Value |\n");
    md.push_str("| --- | --- |\n");
    md.push_str(&format!("| Initial Balance | {:.2} |\n", params.initial_balance));
    md.push_str(&format!("| Final Balance | {:.2} |\n", report.final_balance()));
    md.push_str(&format!("| Peak Balance | {:.2} |\n", report.drawdown.peak_balance));
    md.push_str(&format!("| Outcome | **{}** |\n", report.outcome));
    md.push_str(&format!("| Evaluated At | {} |\n", evaluation.evaluated_at.to_rfc3339()));
    md.push_str(&format!("| Fingerprint | `{}` |\n", evaluation.fingerprint.short()));
    md.push('\n');

    // Objectives
    md.push_str("## Objectives\n\n");
    md.push_str("| Objective | Rule | Target | Current | Status |\n");
    md.push_str("| --- | ---: | ---: | ---: | --- |\n");
    for o in &report.objectives {
        let rule = if o.kind == ObjectiveKind::MinTradingDays {
            format!("{} days", o.threshold)
        } else {
            format!("{}%", o.threshold)
        };
        md.push_str(&format!(
            "| {} | {} | {:.2} | {:.2} | {} |\n",
            o.kind, rule, o.target, o.current, o.status
        ));
    }
    md.push('\n');

    // Drawdown
    let dd = &report.drawdown;
    md.push_str("## Drawdown\n\n");
    md.push_str("| Metric | Value |\n");
    md.push_str("| --- | --- |\n");
    md.push_str(&format!(
        "| Max Drawdown | {:.2} ({:.2}%) |\n",
        dd.max_drawdown_amount, dd.max_drawdown_percent
    ));
    if let Some(day) = dd.trading_day {
        md.push_str(&format!("| Current Trading Day | {day} |\n"));
    }
    md.push_str(&format!("| Day Start Balance | {:.2} |\n", dd.daily_starting_balance));
    md.push_str(&format!("| Daily Drawdown | {:.2} |\n", dd.daily_drawdown_amount));
    md.push_str(&format!("| Worst Daily Drawdown | {:.2} |\n", dd.worst_daily_drawdown_amount));
    md.push_str(&format!("| Trading Days | {} |\n", report.daily.len()));
    md.push('\n');

    // Statistics
    let s = &report.stats;
    md.push_str("## Trade Statistics\n\n");
    md.push_str("| Metric | Value |\n");
    md.push_str("| --- | --- |\n");
    md.push_str(&format!(
        "| Trades | {} ({} won, {} lost, {} flat) |\n",
        s.total_trades, s.winning_trades, s.losing_trades, s.breakeven_trades
    ));
    md.push_str(&format!("| Win Rate | {:.1}% |\n", s.win_rate));
    md.push_str(&format!("| Profit Factor | {} |\n", format_ratio(s.profit_factor)));
    md.push_str(&format!("| Expectancy | {:.2} |\n", s.expectancy));
    md.push_str(&format!("| Average Win | {:.2} |\n", s.average_win));
    md.push_str(&format!("| Average Loss | {:.2} |\n", s.average_loss));
    md.push_str(&format!("| Largest Win | {:.2} |\n", s.largest_win));
    md.push_str(&format!("| Largest Loss | {:.2} |\n", s.largest_loss));
    md.push_str(&format!("| Net Profit | {:.2} |\n", s.net_profit));
    md.push_str(&format!(
        "| Costs (commission / swap) | {:.2} / {:.2} |\n",
        s.total_commission, s.total_swap
    ));
    md.push_str(&format!("| Max Consecutive Wins | {} |\n", s.max_consecutive_wins));
    md.push_str(&format!("| Max Consecutive Losses | {} |\n", s.max_consecutive_losses));
    md.push_str(&format!("| Volume | {} |\n", s.total_volume));
    md.push('\n');

    // Per symbol
    if !report.symbol_stats.is_empty() {
        md.push_str("## Instruments\n\n");
        md.push_str("| Symbol | Trades | Win Rate | Net Profit | Avg Profit |\n");
        md.push_str("| --- | ---: | ---: | ---: | ---: |\n");
        for sym in &report.symbol_stats {
            md.push_str(&format!(
                "| {} | {} | {:.1}% | {:.2} | {:.2} |\n",
                sym.symbol, sym.trades, sym.win_rate, sym.total_profit, sym.average_profit
            ));
        }
        md.push('\n');
    }

    // Data quality
    if !report.rejected.is_empty() {
        md.push_str("## Rejected Records\n\n");
        for r in &report.rejected {
            md.push_str(&format!(
                "- #{} (id {}): {}\n",
                r.index,
                r.id.as_deref().unwrap_or("?"),
                r.error
            ));
        }
        md.push('\n');
    }

    md
}

/// Generate a Markdown summary table for a batch.
pub fn generate_batch_report(results: &BatchResults) -> String {
    let mut md = String::with_capacity(1024);
    md.push_str("# Batch Summary\n\n");
    md.push_str("| Account | Status | Final Balance | Max Drawdown | Trades | Rejected |\n");
    md.push_str("| --- | --- | ---: | ---: | ---: | ---: |\n");
    let rows = results.summary_rows();
    for row in &rows {
        md.push_str(&format!(
            "| {} | {} | {} | {} | {} | {} |\n",
            row.account_id,
            row.status,
            format_opt(row.final_balance),
            format_opt(row.max_drawdown_amount),
            row.total_trades.map_or("-".into(), |n| n.to_string()),
            row.rejected_records.map_or("-".into(), |n| n.to_string()),
        ));
    }
    let errors: Vec<_> = rows.iter().filter_map(|r| r.error.as_ref().map(|e| (&r.account_id, e))).collect();
    if !errors.is_empty() {
        md.push_str("\n## Errors\n\n");
        for (account, err) in errors {
            md.push_str(&format!("- **{account}**: {err}\n"));
        }
    }
    md
}

// ─── Helpers ────────────────────────────────────────────────────────

fn format_opt(v: Option<f64>) -> String {
    v.map_or("-".into(), |v| format!("{v:.2}"))
}

fn format_ratio(v: f64) -> String {
    if v.is_infinite() {
        "inf".into()
    } else {
        format!("{v:.2}")
    }
}
