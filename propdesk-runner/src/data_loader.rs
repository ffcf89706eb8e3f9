//! Trade-file loading for the runner.
//!
//! Reads an account's raw trade history from disk without interpreting it;
//! field mapping and validation belong to the normalizer. Supported layouts:
//! 1. JSON array of trade objects
//! 2. JSON object wrapping that array under `trades`, `data`, `items` or `results`
//! 3. JSON Lines, one trade object per line
//! 4. CSV with a header row (every cell stays a string, empty cells become null)

use std::path::{Path, PathBuf};

use serde_json::{Map, Value};
use thiserror::Error;

use propdesk_core::normalize::RawTrade;

/// Keys under which paginated API dumps nest the trade array.
const ENVELOPE_KEYS: &[&str] = &["trades", "data", "items", "results"];

/// Errors from the trade loading layer.
#[derive(Debug, Error)]
pub enum LoadError {
    #[error("failed to read {path}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("{path}: invalid JSON: {source}")]
    Json {
        path: PathBuf,
        source: serde_json::Error,
    },

    #[error("{path}: invalid JSON on line {line}: {source}")]
    JsonLine {
        path: PathBuf,
        line: usize,
        source: serde_json::Error,
    },

    #[error("{path}: invalid CSV: {source}")]
    Csv { path: PathBuf, source: csv::Error },

    #[error("{path}: expected an array of trades, or an object wrapping one under trades/data/items/results")]
    NotAnArray { path: PathBuf },

    #[error("{path}: unsupported trade file extension (use .json, .jsonl, .ndjson or .csv)")]
    UnsupportedFormat { path: PathBuf },
}

/// On-disk layout of a trade file.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TradeFileFormat {
    Json,
    JsonLines,
    Csv,
}

impl TradeFileFormat {
    /// Infer the format from the file extension.
    pub fn from_path(path: &Path) -> Option<Self> {
        let ext = path.extension()?.to_str()?.to_ascii_lowercase();
        match ext.as_str() {
            "json" => Some(Self::Json),
            "jsonl" | "ndjson" => Some(Self::JsonLines),
            "csv" => Some(Self::Csv),
            _ => None,
        }
    }
}

/// Load raw trade payloads from a file, choosing the parser by extension.
pub fn load_trades(path: &Path) -> Result<Vec<RawTrade>, LoadError> {
    let format = TradeFileFormat::from_path(path).ok_or_else(|| LoadError::UnsupportedFormat {
        path: path.to_path_buf(),
    })?;
    let text = std::fs::read_to_string(path).map_err(|source| LoadError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    parse_trades(&text, format, path)
}

/// Parse trade payloads from text. `origin` only labels errors.
pub fn parse_trades(
    text: &str,
    format: TradeFileFormat,
    origin: &Path,
) -> Result<Vec<RawTrade>, LoadError> {
    match format {
        TradeFileFormat::Json => parse_json(text, origin),
        TradeFileFormat::JsonLines => parse_json_lines(text, origin),
        TradeFileFormat::Csv => parse_csv(text, origin),
    }
}

fn parse_json(text: &str, origin: &Path) -> Result<Vec<RawTrade>, LoadError> {
    let value: Value = serde_json::from_str(text).map_err(|source| LoadError::Json {
        path: origin.to_path_buf(),
        source,
    })?;
    unwrap_envelope(value).ok_or_else(|| LoadError::NotAnArray {
        path: origin.to_path_buf(),
    })
}

/// Accept a bare array or the first envelope key holding one.
fn unwrap_envelope(value: Value) -> Option<Vec<RawTrade>> {
    match value {
        Value::Array(items) => Some(items),
        Value::Object(mut obj) => ENVELOPE_KEYS.iter().find_map(|key| match obj.remove(*key) {
            Some(Value::Array(items)) => Some(items),
            _ => None,
        }),
        _ => None,
    }
}

fn parse_json_lines(text: &str, origin: &Path) -> Result<Vec<RawTrade>, LoadError> {
    text.lines()
        .enumerate()
        .filter(|(_, line)| !line.trim().is_empty())
        .map(|(i, line)| {
            serde_json::from_str(line).map_err(|source| LoadError::JsonLine {
                path: origin.to_path_buf(),
                line: i + 1,
                source,
            })
        })
        .collect()
}

fn parse_csv(text: &str, origin: &Path) -> Result<Vec<RawTrade>, LoadError> {
    let csv_err = |source| LoadError::Csv {
        path: origin.to_path_buf(),
        source,
    };

    let mut reader = csv::ReaderBuilder::new()
        .trim(csv::Trim::All)
        .flexible(true)
        .from_reader(text.as_bytes());
    let headers = reader.headers().map_err(csv_err)?.clone();

    let mut trades = Vec::new();
    for record in reader.records() {
        let record = record.map_err(csv_err)?;
        let obj: Map<String, Value> = headers
            .iter()
            .zip(record.iter())
            .map(|(key, cell)| {
                let value = if cell.is_empty() {
                    Value::Null
                } else {
                    Value::String(cell.to_string())
                };
                (key.to_string(), value)
            })
            .collect();
        trades.push(Value::Object(obj));
    }
    Ok(trades)
}
