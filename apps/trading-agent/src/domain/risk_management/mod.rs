//! Risk Management Bounded Context
//!
//! Turns a trade signal into an order size bounded by the account's risk
//! budget.
//!
//! # Key Concepts
//!
//! - **Risk capital**: `deposit_value × risk_per_trade_pct`, the largest
//!   notional a single exposure-increasing order may carry
//! - **Position cap**: `deposit_value × max_position_pct`, the largest
//!   notional a position may reach
//! - **Reductions**: closing or shrinking a position is never blocked by
//!   the risk budget or the daily limits
//! - **Guards**: a kill switch and the trading session stop every order;
//!   concurrent-position, daily-trade and daily-loss limits stop new exposure

pub mod errors;
pub mod services;
pub mod value_objects;

pub use errors::SizingError;
pub use services::{RiskSizer, TradeGuard};
pub use value_objects::{
    DailyActivity, GuardRejection, NoActionReason, SessionHours, SizingDecision, SizingLimit,
    SizingRequest, TradeDecision, TradeIntent, TradeSignal, TradingLimits, TradingSession,
};
