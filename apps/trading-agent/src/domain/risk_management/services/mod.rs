//! Risk Management Domain Services

mod risk_sizer;
mod trade_guard;

pub use risk_sizer::RiskSizer;
pub use trade_guard::TradeGuard;
