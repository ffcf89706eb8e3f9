//! PropDesk CLI — evaluate challenge accounts from trade files.
//!
//! Commands:
//! - `evaluate` — evaluate one account from a challenge config and a trade file
//! - `batch` — evaluate every account of a batch manifest, in parallel
//! - `demo` — evaluate a synthetic account
//! - `validate` — normalize a trade file and report rejected records

use std::path::{Path, PathBuf};

use anyhow::{bail, Context, Result};
use chrono::{DateTime, Utc};
use clap::{Parser, Subcommand, ValueEnum};
use tracing_subscriber::prelude::*;

use propdesk_core::domain::{AccountId, AccountParameters};
use propdesk_core::normalize::normalize_batch;
use propdesk_runner::export::{
    export_json, generate_batch_report, generate_report, save_batch, write_csv_tables,
};
use propdesk_runner::{
    generate_trades, load_trades, run_manifest, AccountEvaluation, ChallengeConfig,
    EvaluationSettings, Evaluator, SyntheticOptions,
};

#[derive(Parser)]
#[command(
    name = "propdesk",
    about = "PropDesk CLI — challenge performance and rule evaluation"
)]
struct Cli {
    /// More log output (debug level).
    #[arg(short, long, global = true, conflicts_with = "quiet")]
    verbose: bool,

    /// Only warnings and errors on stderr.
    #[arg(short, long, global = true)]
    quiet: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Clone, Copy, ValueEnum)]
enum OutputFormat {
    Json,
    Markdown,
}

#[derive(Subcommand)]
enum Commands {
    /// Evaluate one account from a challenge config and a trade file.
    Evaluate {
        /// Challenge config (TOML with [account] and optional [evaluation]).
        #[arg(long)]
        config: PathBuf,

        /// Trade file (.json, .jsonl, .ndjson or .csv).
        #[arg(long)]
        trades: PathBuf,

        /// Account id used in reports. Defaults to the trade file name.
        #[arg(long)]
        account: Option<String>,

        /// Evaluation time (RFC 3339). Defaults to now.
        #[arg(long, value_parser = parse_as_of)]
        as_of: Option<DateTime<Utc>>,

        #[arg(long, value_enum, default_value_t = OutputFormat::Json)]
        format: OutputFormat,

        /// Write the report here instead of stdout.
        #[arg(long)]
        output: Option<PathBuf>,

        /// Also write balance curve, daily, objective and symbol tables as CSV.
        #[arg(long)]
        csv_dir: Option<PathBuf>,
    },
    /// Evaluate every account listed in a batch manifest.
    Batch {
        /// Batch manifest (TOML with [templates.*] and [[accounts]]).
        #[arg(long)]
        manifest: PathBuf,

        /// Evaluate accounts one at a time.
        #[arg(long, default_value_t = false)]
        sequential: bool,

        /// Evaluation time (RFC 3339). Defaults to now.
        #[arg(long, value_parser = parse_as_of)]
        as_of: Option<DateTime<Utc>>,

        /// Write per-account JSON plus summary.csv / summary.md here.
        #[arg(long)]
        output_dir: Option<PathBuf>,
    },
    /// Evaluate a synthetic account with default challenge rules.
    Demo {
        /// Seed for the synthetic history.
        #[arg(long, default_value_t = 42)]
        seed: u64,

        /// Number of trades to generate.
        #[arg(long, default_value_t = 60)]
        count: usize,

        #[arg(long, value_enum, default_value_t = OutputFormat::Markdown)]
        format: OutputFormat,
    },
    /// Normalize a trade file and report rejected records.
    Validate {
        #[arg(long)]
        trades: PathBuf,
    },
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.verbose, cli.quiet)?;

    match cli.command {
        Commands::Evaluate {
            config,
            trades,
            account,
            as_of,
            format,
            output,
            csv_dir,
        } => run_evaluate(&config, &trades, account, as_of, format, output, csv_dir),
        Commands::Batch {
            manifest,
            sequential,
            as_of,
            output_dir,
        } => run_batch(&manifest, sequential, as_of, output_dir),
        Commands::Demo { seed, count, format } => run_demo(seed, count, format),
        Commands::Validate { trades } => run_validate(&trades),
    }
}

/// Logs go to stderr so stdout stays machine-readable.
fn init_tracing(verbose: bool, quiet: bool) -> Result<()> {
    let level = if verbose {
        tracing::Level::DEBUG
    } else if quiet {
        tracing::Level::WARN
    } else {
        tracing::Level::INFO
    };
    let fmt_layer = tracing_subscriber::fmt::layer()
        .with_writer(std::io::stderr)
        .with_target(false)
        .with_filter(tracing_subscriber::filter::Targets::new().with_default(level));
    tracing_subscriber::registry()
        .with(fmt_layer)
        .try_init()
        .context("failed to install tracing subscriber")
}

fn parse_as_of(s: &str) -> std::result::Result<DateTime<Utc>, String> {
    DateTime::parse_from_rfc3339(s)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|e| format!("expected an RFC 3339 timestamp: {e}"))
}

#[allow(clippy::too_many_arguments)]
fn run_evaluate(
    config_path: &Path,
    trades_path: &Path,
    account: Option<String>,
    as_of: Option<DateTime<Utc>>,
    format: OutputFormat,
    output: Option<PathBuf>,
    csv_dir: Option<PathBuf>,
) -> Result<()> {
    let config = ChallengeConfig::load(config_path)?;
    let account_id = AccountId::new(account.unwrap_or_else(|| {
        trades_path
            .file_stem()
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_else(|| "account".into())
    }));

    let evaluator = Evaluator::new(config.evaluation, as_of.unwrap_or_else(Utc::now))?;
    let evaluation = evaluator.evaluate_file(&account_id, &config.account, trades_path)?;

    let body = render(&evaluation, format)?;
    match output {
        Some(path) => {
            std::fs::write(&path, body)
                .with_context(|| format!("failed to write {}", path.display()))?;
            tracing::info!(path = %path.display(), "Report written.");
        }
        None => println!("{body}"),
    }

    if let Some(dir) = csv_dir {
        let written = write_csv_tables(&evaluation.report, &dir)?;
        tracing::info!(dir = %dir.display(), files = written.len(), "CSV tables written.");
    }

    print_summary(&evaluation);
    Ok(())
}

fn run_batch(
    manifest: &Path,
    sequential: bool,
    as_of: Option<DateTime<Utc>>,
    output_dir: Option<PathBuf>,
) -> Result<()> {
    let results = run_manifest(manifest, as_of.unwrap_or_else(Utc::now), !sequential)?;

    println!("{}", generate_batch_report(&results));

    if let Some(dir) = output_dir {
        let dir = save_batch(&results, &dir)?;
        tracing::info!(dir = %dir.display(), "Batch artifacts written.");
    }

    let failed = results.errors().count();
    if failed > 0 {
        bail!("{failed} of {} account(s) could not be evaluated", results.len());
    }
    Ok(())
}

fn run_demo(seed: u64, count: usize, format: OutputFormat) -> Result<()> {
    let raw = generate_trades(&SyntheticOptions {
        seed,
        count,
        ..SyntheticOptions::default()
    });
    tracing::info!(seed, records = raw.len(), "Generated synthetic history.");

    let evaluator = Evaluator::new(EvaluationSettings::default(), Utc::now())?;
    let evaluation = evaluator.evaluate(
        &AccountId::new(format!("DEMO-{seed}")),
        &AccountParameters::default(),
        &raw,
    )?;
    println!("{}", render(&evaluation, format)?);
    print_summary(&evaluation);
    Ok(())
}

fn run_validate(trades_path: &Path) -> Result<()> {
    let raw = load_trades(trades_path)?;
    let batch = normalize_batch(&raw);

    let closed = batch.trades.iter().filter(|t| t.is_closed()).count();
    println!("Records:   {}", batch.input_len());
    println!(
        "Accepted:  {} ({} closed, {} open)",
        batch.trades.len(),
        closed,
        batch.trades.len() - closed
    );
    println!("Rejected:  {}", batch.rejected.len());
    for r in &batch.rejected {
        println!("  #{} (id {}): {}", r.index, r.id.as_deref().unwrap_or("?"), r.error);
    }

    if !batch.is_complete() {
        bail!("{} record(s) failed normalization", batch.rejected.len());
    }
    Ok(())
}

fn render(evaluation: &AccountEvaluation, format: OutputFormat) -> Result<String> {
    match format {
        OutputFormat::Json => export_json(evaluation),
        OutputFormat::Markdown => Ok(generate_report(evaluation)),
    }
}

/// One-glance verdict on stderr, next to the log lines.
fn print_summary(evaluation: &AccountEvaluation) {
    let report = &evaluation.report;
    eprintln!();
    eprintln!("=== {} ===", evaluation.account_id);
    eprintln!("Outcome:        {}", report.outcome);
    eprintln!("Final Balance:  {:.2}", report.final_balance());
    eprintln!(
        "Max Drawdown:   {:.2} ({:.2}%)",
        report.drawdown.max_drawdown_amount, report.drawdown.max_drawdown_percent
    );
    eprintln!("Trades:         {}", report.stats.total_trades);
    eprintln!("Win Rate:       {:.1}%", report.stats.win_rate);
    for o in &report.objectives {
        eprintln!("  {:<18}{}", o.kind.to_string(), o.status);
    }
    if !report.rejected.is_empty() {
        eprintln!("WARNING: {} record(s) rejected", report.rejected.len());
    }
    eprintln!();
}
