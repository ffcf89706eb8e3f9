//! PropDesk Core — challenge performance and rule evaluation.
//!
//! This crate contains the evaluation engine:
//! - Domain types (trades, account parameters, balance curve, ids)
//! - Trade normalizer for loosely-typed broker payloads
//! - Balance curve builder and drawdown tracker
//! - Objective evaluator (profit target, drawdown limits, trading days)
//! - Statistics aggregator (win rate, profit factor, per-symbol breakdown)
//!
//! Everything here is synchronous and free of I/O. Callers hand in one
//! account snapshot and get back an immutable `EvaluationReport`.

pub mod calendar;
pub mod domain;
pub mod engine;
pub mod normalize;
pub mod stats;

pub use calendar::TradingCalendar;
pub use engine::{evaluate, evaluate_records, EngineError, EvaluationOptions, EvaluationReport, EvaluationRequest};
