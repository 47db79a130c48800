//! Risk Management Value Objects

mod sizing_decision;
mod trade_signal;
mod trading_limits;

pub use sizing_decision::{NoActionReason, SizingDecision, SizingLimit, TradeDecision};
pub use trade_signal::{SizingRequest, TradeIntent, TradeSignal};
pub use trading_limits::{
    DailyActivity, GuardRejection, SessionHours, TradingLimits, TradingSession,
};
