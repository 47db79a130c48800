//! Trade Guard
//!
//! Pure admission checks run before a signal is sized.
//!
//! | Check | Blocks |
//! |-------|--------|
//! | kill switch off | every order |
//! | outside session | every order |
//! | daily realized loss ≥ limit | new exposure |
//! | orders issued today ≥ limit | new exposure |
//! | open positions ≥ limit | opening a position from flat |

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;

use crate::domain::risk_management::value_objects::{
    DailyActivity, GuardRejection, TradeDecision, TradeIntent, TradingLimits, TradingSession,
};

/// Per-cycle guard state. Counts orders issued during the cycle on top of
/// the activity already recorded in the ledger.
#[derive(Debug, Clone)]
pub struct TradeGuard {
    limits: TradingLimits,
    activity: DailyActivity,
    open_positions: usize,
}

impl TradeGuard {
    /// Cycle-wide gate: the kill switch, then the session window.
    ///
    /// # Errors
    ///
    /// Returns the rejection that applies to every instrument this cycle.
    pub fn check_cycle(
        trading_enabled: bool,
        session: &TradingSession,
        now: DateTime<Utc>,
    ) -> Result<(), GuardRejection> {
        if !trading_enabled {
            return Err(GuardRejection::TradingDisabled);
        }
        if !session.is_open(now) {
            return Err(GuardRejection::OutsideSession);
        }
        Ok(())
    }

    /// Start a cycle's guard from the day's activity and the positions held.
    #[must_use]
    pub const fn new(limits: TradingLimits, activity: DailyActivity, open_positions: usize) -> Self {
        Self {
            limits,
            activity,
            open_positions,
        }
    }

    /// Check one intent against the account-wide limits.
    ///
    /// # Errors
    ///
    /// Returns the first limit the intent would breach. Intents that only
    /// reduce the held position are always admitted.
    pub fn admit(&self, intent: &TradeIntent, held: Decimal) -> Result<(), GuardRejection> {
        if !intent.increases_exposure(held) {
            return Ok(());
        }

        let loss = self.activity.loss();
        if loss >= self.limits.max_daily_loss {
            return Err(GuardRejection::DailyLoss {
                loss,
                limit: self.limits.max_daily_loss,
            });
        }

        if self.activity.trades >= self.limits.max_daily_trades {
            return Err(GuardRejection::DailyTrades {
                issued: self.activity.trades,
                limit: self.limits.max_daily_trades,
            });
        }

        if held.is_zero() && self.open_positions >= self.limits.max_concurrent_positions {
            return Err(GuardRejection::ConcurrentPositions {
                open: self.open_positions,
                limit: self.limits.max_concurrent_positions,
            });
        }

        Ok(())
    }

    /// Account for an order handed to the engine.
    pub fn record_issued(&mut self, decision: &TradeDecision, held: Decimal) {
        self.activity.trades = self.activity.trades.saturating_add(1);
        if held.is_zero() && !decision.reduces_exposure {
            self.open_positions += 1;
        }
    }

    /// Orders counted against today's limit so far.
    #[must_use]
    pub const fn trades_today(&self) -> u32 {
        self.activity.trades
    }
}
