//! Domain types for PropDesk

pub mod account;
pub mod curve;
pub mod ids;
pub mod trade;

pub use account::{AccountParameters, ParameterError};
pub use curve::{BalanceCurve, BalancePoint};
pub use ids::{AccountId, TradeId};
pub use trade::{TradeRecord, TradeSide};
