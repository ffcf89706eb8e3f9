//! PropDesk Runner — evaluation orchestration, batch runs, exports.
//!
//! This crate builds on `propdesk-core` to provide:
//! - Challenge configs and batch manifests (TOML)
//! - Trade-file loading (JSON, JSON Lines, CSV)
//! - Snapshot fingerprints and an in-memory report memo
//! - Single-account evaluator with partial-batch policy and tracing
//! - Parallel batch evaluation with per-account error isolation
//! - JSON / CSV / Markdown exports
//! - Deterministic synthetic trade histories

pub mod batch;
pub mod config;
pub mod data_loader;
pub mod export;
pub mod fingerprint;
pub mod memo;
pub mod runner;
pub mod synthetic;

pub use batch::{run_manifest, BatchEntry, BatchResults, BatchRunner, BatchSummaryRow};
pub use config::{
    AccountEntry, AccountJob, BatchManifest, ChallengeConfig, ConfigError, EvaluationSettings,
    PartialBatch,
};
pub use data_loader::{load_trades, parse_trades, LoadError, TradeFileFormat};
pub use fingerprint::{fingerprint, SnapshotFingerprint};
pub use memo::EvaluationMemo;
pub use runner::{AccountEvaluation, Evaluator, RunError, SCHEMA_VERSION};
pub use synthetic::{generate_trades, SyntheticOptions};

#[cfg(test)]
mod send_sync_checks {
    use super::*;

    fn assert_send<T: Send>() {}
    fn assert_sync<T: Sync>() {}

    #[test]
    fn evaluator_is_send_sync() {
        assert_send::<Evaluator>();
        assert_sync::<Evaluator>();
        assert_send::<EvaluationMemo>();
        assert_sync::<EvaluationMemo>();
    }

    #[test]
    fn results_are_send_sync() {
        assert_send::<AccountEvaluation>();
        assert_sync::<AccountEvaluation>();
        assert_send::<BatchResults>();
        assert_sync::<BatchResults>();
        assert_send::<RunError>();
        assert_sync::<RunError>();
    }

    #[test]
    fn config_types_are_send_sync() {
        assert_send::<ChallengeConfig>();
        assert_sync::<ChallengeConfig>();
        assert_send::<BatchManifest>();
        assert_sync::<BatchManifest>();
        assert_send::<AccountJob>();
        assert_sync::<AccountJob>();
    }
}
