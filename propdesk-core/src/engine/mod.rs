//! Evaluation engine — balance curve, drawdown, objectives.
//!
//! Each stage is a pure function of the previous one:
//!
//! 1. Closed trades are put in canonical order and folded into a balance curve
//! 2. The drawdown tracker walks the curve (overall peak and per trading day)
//! 3. The objective evaluator compares curve and drawdown against the rules
//!
//! `evaluate` wires the stages together with normalization and statistics.

pub mod balance_curve;
pub mod drawdown;
pub mod evaluate;
pub mod objectives;

pub use balance_curve::{build_balance_curve, build_from_ordered, canonical_order, closed_in_order};
pub use drawdown::{
    daily_buckets, drawdown_curve, track_drawdown, DailyBucket, DrawdownAnalysis, DrawdownPoint,
    DrawdownSummary,
};
pub use evaluate::{
    evaluate, evaluate_records, EngineError, EvaluationOptions, EvaluationReport,
    EvaluationRequest,
};
pub use objectives::{
    evaluate_objectives, ChallengeOutcome, Objective, ObjectiveKind, ObjectiveStatus,
    DRAWDOWN_WARNING_RATIO, EPSILON,
};
