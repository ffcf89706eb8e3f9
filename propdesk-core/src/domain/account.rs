//! Account rule parameters for one challenge phase.

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Rejected account parameters.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ParameterError {
    #[error("initial balance must be positive and finite, got {0}")]
    InitialBalance(f64),
    #[error("{field} must be a non-negative finite percentage, got {value}")]
    Percent { field: &'static str, value: f64 },
}

/// Evaluation inputs for one account. Percentages are whole numbers
/// (`10.0` means ten percent); zero is a meaningful value for every rule.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct AccountParameters {
    pub initial_balance: f64,
    #[serde(default)]
    pub profit_target_percent: f64,
    #[serde(default)]
    pub max_drawdown_percent: f64,
    #[serde(default)]
    pub daily_drawdown_percent: f64,
    #[serde(default)]
    pub min_trading_days: u32,
}

impl AccountParameters {
    pub fn validate(&self) -> Result<(), ParameterError> {
        if !(self.initial_balance.is_finite() && self.initial_balance > 0.0) {
            return Err(ParameterError::InitialBalance(self.initial_balance));
        }
        let percents = [
            ("profit_target_percent", self.profit_target_percent),
            ("max_drawdown_percent", self.max_drawdown_percent),
            ("daily_drawdown_percent", self.daily_drawdown_percent),
        ];
        for (field, value) in percents {
            if !(value.is_finite() && value >= 0.0) {
                return Err(ParameterError::Percent { field, value });
            }
        }
        Ok(())
    }
}

impl Default for AccountParameters {
    fn default() -> Self {
        Self {
            initial_balance: 100_000.0,
            profit_target_percent: 10.0,
            max_drawdown_percent: 10.0,
            daily_drawdown_percent: 5.0,
            min_trading_days: 0,
        }
    }
}
