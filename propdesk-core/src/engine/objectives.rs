//! Objective evaluator — one status machine per challenge rule.
//!
//! Each rule starts `Pending` and may move to `InProgress`, then to one of
//! the terminal states (`Completed` or `Failed`). A snapshot is evaluated in
//! full from its own inputs; nothing carries over between snapshots.

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::domain::{AccountParameters, BalanceCurve};
use crate::engine::drawdown::DrawdownAnalysis;

/// Tolerance for boundary comparisons against accumulated float sums.
pub const EPSILON: f64 = 1e-9;

/// Share of a drawdown limit past which the rule is flagged as at risk.
pub const DRAWDOWN_WARNING_RATIO: f64 = 0.8;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ObjectiveKind {
    ProfitTarget,
    MaxDrawdown,
    DailyDrawdown,
    MinTradingDays,
}

impl ObjectiveKind {
    /// Limits can only be breached; goals can only be reached.
    pub fn is_limit(self) -> bool {
        matches!(self, ObjectiveKind::MaxDrawdown | ObjectiveKind::DailyDrawdown)
    }
}

impl fmt::Display for ObjectiveKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            ObjectiveKind::ProfitTarget => "profit_target",
            ObjectiveKind::MaxDrawdown => "max_drawdown",
            ObjectiveKind::DailyDrawdown => "daily_drawdown",
            ObjectiveKind::MinTradingDays => "min_trading_days",
        };
        write!(f, "{label}")
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ObjectiveStatus {
    Pending,
    InProgress,
    Completed,
    Failed,
}

impl ObjectiveStatus {
    /// `Completed` and `Failed` are final for a snapshot.
    pub fn is_terminal(self) -> bool {
        matches!(self, ObjectiveStatus::Completed | ObjectiveStatus::Failed)
    }
}

impl fmt::Display for ObjectiveStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            ObjectiveStatus::Pending => "pending",
            ObjectiveStatus::InProgress => "in_progress",
            ObjectiveStatus::Completed => "completed",
            ObjectiveStatus::Failed => "failed",
        };
        write!(f, "{label}")
    }
}

/// Status of one rule for one snapshot.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Objective {
    pub kind: ObjectiveKind,
    /// Configured rule value: a percentage, or a day count.
    pub threshold: f64,
    pub target: f64,
    pub current: f64,
    pub status: ObjectiveStatus,
}

impl Objective {
    /// `current` as a share of `target`, clamped to 0..=100.
    ///
    /// A zero target reads as 100 once anything has happened, else 0.
    pub fn progress_percent(&self) -> f64 {
        if self.target <= 0.0 {
            return if self.current > 0.0 { 100.0 } else { 0.0 };
        }
        (self.current / self.target * 100.0).clamp(0.0, 100.0)
    }
}

/// Overall verdict across all objectives of a snapshot.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ChallengeOutcome {
    /// A limit was breached.
    Failed,
    /// Every goal completed with no limit breached.
    Passed,
    Active,
}

impl ChallengeOutcome {
    pub fn from_objectives(objectives: &[Objective]) -> Self {
        if objectives.iter().any(|o| o.status == ObjectiveStatus::Failed) {
            ChallengeOutcome::Failed
        } else if objectives
            .iter()
            .filter(|o| !o.kind.is_limit())
            .all(|o| o.status == ObjectiveStatus::Completed)
        {
            ChallengeOutcome::Passed
        } else {
            ChallengeOutcome::Active
        }
    }
}

impl fmt::Display for ChallengeOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            ChallengeOutcome::Failed => "failed",
            ChallengeOutcome::Passed => "passed",
            ChallengeOutcome::Active => "active",
        };
        write!(f, "{label}")
    }
}

/// Evaluate all four rules, in a fixed order.
pub fn evaluate_objectives(
    params: &AccountParameters,
    curve: &BalanceCurve,
    drawdown: &DrawdownAnalysis,
) -> Vec<Objective> {
    let initial = params.initial_balance;
    let summary = &drawdown.summary;
    vec![
        profit_target(params.profit_target_percent, initial, curve.final_balance()),
        drawdown_limit(
            ObjectiveKind::MaxDrawdown,
            params.max_drawdown_percent,
            initial,
            summary.max_drawdown_amount,
        ),
        drawdown_limit(
            ObjectiveKind::DailyDrawdown,
            params.daily_drawdown_percent,
            summary.daily_starting_balance,
            summary.daily_drawdown_amount,
        ),
        min_trading_days(params.min_trading_days, drawdown.trading_days()),
    ]
}

/// Profit target: completed once realized profit reaches `pct` of the
/// initial balance.
pub fn profit_target(pct: f64, initial_balance: f64, last_balance: f64) -> Objective {
    let target = initial_balance * pct / 100.0;
    let current = last_balance - initial_balance;
    let status = if current + EPSILON >= target {
        ObjectiveStatus::Completed
    } else if current > EPSILON {
        ObjectiveStatus::InProgress
    } else {
        ObjectiveStatus::Pending
    };
    Objective {
        kind: ObjectiveKind::ProfitTarget,
        threshold: pct,
        target,
        current,
        status,
    }
}

/// Drawdown limit relative to `base`: failed once `current` reaches the
/// limit. A zero limit tolerates no drawdown at all, but a flat account
/// is not in breach.
pub fn drawdown_limit(kind: ObjectiveKind, pct: f64, base: f64, current: f64) -> Objective {
    let target = base * pct / 100.0;
    let status = if current > EPSILON && current + EPSILON >= target {
        ObjectiveStatus::Failed
    } else if current > EPSILON && current > DRAWDOWN_WARNING_RATIO * target {
        ObjectiveStatus::InProgress
    } else {
        ObjectiveStatus::Pending
    };
    Objective {
        kind,
        threshold: pct,
        target,
        current,
        status,
    }
}

/// Minimum distinct trading days with a closed trade.
pub fn min_trading_days(required: u32, traded_days: usize) -> Objective {
    let current = traded_days as f64;
    let status = if required == 0 || traded_days >= required as usize {
        ObjectiveStatus::Completed
    } else if traded_days > 0 {
        ObjectiveStatus::InProgress
    } else {
        ObjectiveStatus::Pending
    };
    Objective {
        kind: ObjectiveKind::MinTradingDays,
        threshold: f64::from(required),
        target: f64::from(required),
        current,
        status,
    }
}
