//! Balance curve types.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// One point of the realized balance curve.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BalancePoint {
    pub timestamp: DateTime<Utc>,
    pub balance: f64,
}

impl BalancePoint {
    pub fn new(timestamp: DateTime<Utc>, balance: f64) -> Self {
        Self { timestamp, balance }
    }
}

/// Ordered balance curve: a leading point at the initial balance followed by
/// one point per closed trade. Never empty.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "Vec<BalancePoint>", into = "Vec<BalancePoint>")]
pub struct BalanceCurve {
    points: Vec<BalancePoint>,
}

impl BalanceCurve {
    /// Build a curve from its points. Returns `None` for an empty list.
    pub fn from_points(points: Vec<BalancePoint>) -> Option<Self> {
        if points.is_empty() {
            None
        } else {
            Some(Self { points })
        }
    }

    /// Curve holding only its leading point.
    pub(crate) fn starting_at(point: BalancePoint) -> Self {
        Self { points: vec![point] }
    }

    pub(crate) fn push(&mut self, point: BalancePoint) {
        self.points.push(point);
    }

    pub fn points(&self) -> &[BalancePoint] {
        &self.points
    }

    /// Points contributed by closed trades (everything after the leading point).
    pub fn trade_points(&self) -> &[BalancePoint] {
        &self.points[1..]
    }

    pub fn initial_balance(&self) -> f64 {
        self.points[0].balance
    }

    pub fn final_balance(&self) -> f64 {
        self.points[self.points.len() - 1].balance
    }

    pub fn len(&self) -> usize {
        self.points.len()
    }

    /// Always false; kept for API symmetry with slices.
    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    pub fn closed_trade_count(&self) -> usize {
        self.points.len() - 1
    }

    pub fn balances(&self) -> Vec<f64> {
        self.points.iter().map(|p| p.balance).collect()
    }
}

impl TryFrom<Vec<BalancePoint>> for BalanceCurve {
    type Error = &'static str;

    fn try_from(points: Vec<BalancePoint>) -> Result<Self, Self::Error> {
        Self::from_points(points).ok_or("balance curve must contain at least one point")
    }
}

impl From<BalanceCurve> for Vec<BalancePoint> {
    fn from(curve: BalanceCurve) -> Self {
        curve.points
    }
}
