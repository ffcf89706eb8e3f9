//! Challenge and batch configuration, loaded from TOML.

use std::collections::{BTreeMap, BTreeSet};
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use thiserror::Error;

use propdesk_core::domain::{AccountId, AccountParameters, ParameterError};
use propdesk_core::TradingCalendar;

/// Errors from loading or validating configuration files.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read {path}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("failed to parse {origin}: {source}")]
    Parse {
        origin: String,
        source: toml::de::Error,
    },
    #[error("{context}: {source}")]
    InvalidParameters {
        context: String,
        source: ParameterError,
    },
    #[error("day offset must be within ±1439 minutes, got {0}")]
    InvalidDayOffset(i32),
    #[error("account '{account}' references unknown template '{template}'")]
    UnknownTemplate { account: AccountId, template: String },
    #[error("account '{0}' is listed more than once")]
    DuplicateAccount(AccountId),
    #[error("manifest lists no accounts")]
    EmptyManifest,
}

/// What to do when the normalizer drops records from a history.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PartialBatch {
    /// Evaluate what normalized and report the rest.
    #[default]
    Accept,
    /// Refuse to evaluate an account with any rejected record.
    Reject,
}

/// `[evaluation]` section shared by challenge configs and batch manifests.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct EvaluationSettings {
    /// Server-day offset from UTC, in minutes.
    #[serde(default)]
    pub day_offset_minutes: i32,
    #[serde(default)]
    pub partial_batch: PartialBatch,
}

impl EvaluationSettings {
    pub fn calendar(&self) -> Result<TradingCalendar, ConfigError> {
        TradingCalendar::with_offset_minutes(self.day_offset_minutes)
            .ok_or(ConfigError::InvalidDayOffset(self.day_offset_minutes))
    }
}

/// A single-account challenge configuration.
///
/// ```toml
/// [account]
/// initial_balance = 100000.0
/// profit_target_percent = 10.0
/// max_drawdown_percent = 10.0
/// daily_drawdown_percent = 5.0
/// min_trading_days = 4
///
/// [evaluation]
/// day_offset_minutes = 120
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChallengeConfig {
    pub account: AccountParameters,
    #[serde(default)]
    pub evaluation: EvaluationSettings,
}

impl ChallengeConfig {
    pub fn from_toml_str(text: &str) -> Result<Self, ConfigError> {
        Self::parse(text, "challenge config")
    }

    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let text = read(path)?;
        Self::parse(&text, &path.display().to_string())
    }

    fn parse(text: &str, origin: &str) -> Result<Self, ConfigError> {
        let config: Self = toml::from_str(text).map_err(|source| ConfigError::Parse {
            origin: origin.to_string(),
            source,
        })?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        self.account
            .validate()
            .map_err(|source| ConfigError::InvalidParameters {
                context: "[account]".into(),
                source,
            })?;
        self.evaluation.calendar()?;
        Ok(())
    }
}

/// One `[[accounts]]` entry of a batch manifest.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AccountEntry {
    pub id: AccountId,
    pub template: String,
    /// Trade file, relative to the manifest's directory.
    pub trades: PathBuf,
}

/// An account ready to evaluate: template resolved, path absolute.
#[derive(Debug, Clone, PartialEq)]
pub struct AccountJob {
    pub id: AccountId,
    pub account: AccountParameters,
    pub trades_path: PathBuf,
}

/// Many accounts sharing a set of named parameter templates.
///
/// ```toml
/// [templates.phase1]
/// initial_balance = 50000.0
/// profit_target_percent = 8.0
/// max_drawdown_percent = 10.0
/// daily_drawdown_percent = 5.0
///
/// [[accounts]]
/// id = "ACC-1001"
/// template = "phase1"
/// trades = "trades/acc-1001.json"
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BatchManifest {
    #[serde(default)]
    pub evaluation: EvaluationSettings,
    #[serde(default)]
    pub templates: BTreeMap<String, AccountParameters>,
    #[serde(default)]
    pub accounts: Vec<AccountEntry>,
    /// Directory trade paths are resolved against.
    #[serde(skip)]
    pub base_dir: PathBuf,
}

impl BatchManifest {
    pub fn from_toml_str(text: &str, base_dir: impl Into<PathBuf>) -> Result<Self, ConfigError> {
        Self::parse(text, "batch manifest", base_dir.into())
    }

    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let text = read(path)?;
        let base_dir = path.parent().map(Path::to_path_buf).unwrap_or_default();
        Self::parse(&text, &path.display().to_string(), base_dir)
    }

    fn parse(text: &str, origin: &str, base_dir: PathBuf) -> Result<Self, ConfigError> {
        let mut manifest: Self = toml::from_str(text).map_err(|source| ConfigError::Parse {
            origin: origin.to_string(),
            source,
        })?;
        manifest.base_dir = base_dir;
        manifest.validate()?;
        Ok(manifest)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.accounts.is_empty() {
            return Err(ConfigError::EmptyManifest);
        }
        self.evaluation.calendar()?;
        for (name, params) in &self.templates {
            params
                .validate()
                .map_err(|source| ConfigError::InvalidParameters {
                    context: format!("[templates.{name}]"),
                    source,
                })?;
        }
        let mut seen = BTreeSet::new();
        for entry in &self.accounts {
            if !self.templates.contains_key(&entry.template) {
                return Err(ConfigError::UnknownTemplate {
                    account: entry.id.clone(),
                    template: entry.template.clone(),
                });
            }
            if !seen.insert(&entry.id) {
                return Err(ConfigError::DuplicateAccount(entry.id.clone()));
            }
        }
        Ok(())
    }

    /// Resolve templates and paths. Jobs come back sorted by account id.
    pub fn jobs(&self) -> Result<Vec<AccountJob>, ConfigError> {
        let mut jobs = self
            .accounts
            .iter()
            .map(|entry| {
                let account = self.templates.get(&entry.template).copied().ok_or_else(|| {
                    ConfigError::UnknownTemplate {
                        account: entry.id.clone(),
                        template: entry.template.clone(),
                    }
                })?;
                Ok(AccountJob {
                    id: entry.id.clone(),
                    account,
                    trades_path: self.base_dir.join(&entry.trades),
                })
            })
            .collect::<Result<Vec<_>, ConfigError>>()?;
        jobs.sort_by(|a, b| a.id.cmp(&b.id));
        Ok(jobs)
    }
}

fn read(path: &Path) -> Result<String, ConfigError> {
    std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
        path: path.to_path_buf(),
        source,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    const CHALLENGE: &str = r#"
        [account]
        initial_balance = 25000.0
        profit_target_percent = 8.0
        max_drawdown_percent = 12.0
        daily_drawdown_percent = 4.0
        min_trading_days = 3

        [evaluation]
        day_offset_minutes = 120
        partial_batch = "reject"
    "#;

    #[test]
    fn parses_challenge_config() {
        let config = ChallengeConfig::from_toml_str(CHALLENGE).unwrap();
        assert_eq!(config.account.initial_balance, 25_000.0);
        assert_eq!(config.account.min_trading_days, 3);
        assert_eq!(config.evaluation.partial_batch, PartialBatch::Reject);
        assert_eq!(config.evaluation.calendar().unwrap().offset_minutes(), 120);
    }

    #[test]
    fn evaluation_section_is_optional() {
        let config = ChallengeConfig::from_toml_str("[account]\ninitial_balance = 1000.0\n").unwrap();
        assert_eq!(config.evaluation, EvaluationSettings::default());
        assert_eq!(config.account.profit_target_percent, 0.0);
    }

    #[test]
    fn rejects_bad_parameters() {
        let err = ChallengeConfig::from_toml_str("[account]\ninitial_balance = -5.0\n").unwrap_err();
        assert!(matches!(err, ConfigError::InvalidParameters { .. }));
    }

    #[test]
    fn rejects_bad_offset() {
        let text = "[account]\ninitial_balance = 1000.0\n[evaluation]\nday_offset_minutes = 2000\n";
        let err = ChallengeConfig::from_toml_str(text).unwrap_err();
        assert!(matches!(err, ConfigError::InvalidDayOffset(2000)));
    }

    #[test]
    fn rejects_unknown_partial_policy() {
        let text = "[account]\ninitial_balance = 1000.0\n[evaluation]\npartial_batch = \"maybe\"\n";
        assert!(matches!(
            ChallengeConfig::from_toml_str(text).unwrap_err(),
            ConfigError::Parse { .. }
        ));
    }

    const MANIFEST: &str = r#"
        [templates.phase1]
        initial_balance = 50000.0
        profit_target_percent = 8.0

        [templates.phase2]
        initial_balance = 50000.0
        profit_target_percent = 5.0

        [[accounts]]
        id = "B-2"
        template = "phase2"
        trades = "b.json"

        [[accounts]]
        id = "A-1"
        template = "phase1"
        trades = "data/a.csv"
    "#;

    #[test]
    fn manifest_jobs_are_sorted_and_resolved() {
        let manifest = BatchManifest::from_toml_str(MANIFEST, "/srv/batch").unwrap();
        let jobs = manifest.jobs().unwrap();
        assert_eq!(jobs[0].id, AccountId::new("A-1"));
        assert_eq!(jobs[0].trades_path, PathBuf::from("/srv/batch/data/a.csv"));
        assert_eq!(jobs[0].account.profit_target_percent, 8.0);
        assert_eq!(jobs[1].id, AccountId::new("B-2"));
        assert_eq!(jobs[1].account.profit_target_percent, 5.0);
    }

    #[test]
    fn manifest_rejects_unknown_template() {
        let text = MANIFEST.replace("template = \"phase2\"", "template = \"phase3\"");
        let err = BatchManifest::from_toml_str(&text, ".").unwrap_err();
        assert!(matches!(err, ConfigError::UnknownTemplate { template, .. } if template == "phase3"));
    }

    #[test]
    fn manifest_rejects_duplicate_accounts() {
        let text = MANIFEST.replace("id = \"B-2\"", "id = \"A-1\"");
        let err = BatchManifest::from_toml_str(&text, ".").unwrap_err();
        assert!(matches!(err, ConfigError::DuplicateAccount(_)));
    }

    #[test]
    fn manifest_needs_accounts() {
        let err = BatchManifest::from_toml_str("[templates.x]\ninitial_balance = 1.0\n", ".").unwrap_err();
        assert!(matches!(err, ConfigError::EmptyManifest));
    }
}
