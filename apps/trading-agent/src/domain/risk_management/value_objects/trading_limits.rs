//! Pre-trade guard inputs: account-wide limits, the trading session and
//! the day's activity.

use std::fmt;

use chrono::{DateTime, Datelike, Duration, FixedOffset, NaiveTime, TimeZone, Utc, Weekday};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::domain::shared::Money;

/// Account-wide limits on new exposure.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TradingLimits {
    /// Instruments that may hold a non-flat position at once.
    pub max_concurrent_positions: usize,
    /// Orders that may be issued per trading day.
    pub max_daily_trades: u32,
    /// Realized loss after which no new exposure is taken for the day.
    pub max_daily_loss: Money,
}

impl Default for TradingLimits {
    fn default() -> Self {
        Self {
            max_concurrent_positions: 3,
            max_daily_trades: 10,
            max_daily_loss: Money::new(Decimal::from(10_000)),
        }
    }
}

/// Intraday window in the session's local time, both ends inclusive.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SessionHours {
    /// First local time orders are admitted.
    pub open: NaiveTime,
    /// Last local time orders are admitted.
    pub close: NaiveTime,
}

/// When orders may be issued, and where the trading day starts.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TradingSession {
    /// Session time zone.
    pub offset: FixedOffset,
    /// Intraday window; `None` admits the whole day.
    pub hours: Option<SessionHours>,
    /// Days the session trades.
    pub days: Vec<Weekday>,
}

impl TradingSession {
    /// Every day, all day, with the trading day starting at midnight in `offset`.
    #[must_use]
    pub fn continuous(offset: FixedOffset) -> Self {
        Self {
            offset,
            hours: None,
            days: vec![
                Weekday::Mon,
                Weekday::Tue,
                Weekday::Wed,
                Weekday::Thu,
                Weekday::Fri,
                Weekday::Sat,
                Weekday::Sun,
            ],
        }
    }

    /// Returns true if orders may be issued at `at`.
    #[must_use]
    pub fn is_open(&self, at: DateTime<Utc>) -> bool {
        let local = at.with_timezone(&self.offset);
        if !self.days.contains(&local.weekday()) {
            return false;
        }
        self.hours.is_none_or(|hours| {
            let time = local.time();
            time >= hours.open && time <= hours.close
        })
    }

    /// Start of the trading day containing `at`.
    #[must_use]
    pub fn day_start(&self, at: DateTime<Utc>) -> DateTime<Utc> {
        let local_midnight = at
            .with_timezone(&self.offset)
            .date_naive()
            .and_time(NaiveTime::default());
        let utc_midnight =
            local_midnight - Duration::seconds(i64::from(self.offset.local_minus_utc()));
        Utc.from_utc_datetime(&utc_midnight)
    }
}

/// Orders and realized result since the start of the trading day.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct DailyActivity {
    /// Orders issued today that are still open or traded something.
    pub trades: u32,
    /// Realized profit (positive) or loss (negative) of today's fills.
    pub realized_pnl: Decimal,
}

impl DailyActivity {
    /// Realized loss as a positive amount, zero when in profit.
    #[must_use]
    pub fn loss(&self) -> Money {
        Money::new((-self.realized_pnl).max(Decimal::ZERO))
    }
}

/// Why a guard refused a decision.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GuardRejection {
    /// Trading is switched off for the account.
    TradingDisabled,
    /// Outside the trading session.
    OutsideSession,
    /// Opening another position would exceed the concurrent limit.
    ConcurrentPositions {
        /// Positions currently open.
        open: usize,
        /// Configured limit.
        limit: usize,
    },
    /// The day's order budget is spent.
    DailyTrades {
        /// Orders issued today.
        issued: u32,
        /// Configured limit.
        limit: u32,
    },
    /// The day's realized loss reached the limit.
    DailyLoss {
        /// Realized loss today.
        loss: Money,
        /// Configured limit.
        limit: Money,
    },
}

impl GuardRejection {
    /// Metrics label.
    #[must_use]
    pub const fn label(&self) -> &'static str {
        match self {
            Self::TradingDisabled => "kill_switch",
            Self::OutsideSession => "session",
            Self::ConcurrentPositions { .. } => "concurrent_positions",
            Self::DailyTrades { .. } => "daily_trades",
            Self::DailyLoss { .. } => "daily_loss",
        }
    }
}

impl fmt::Display for GuardRejection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::TradingDisabled => write!(f, "trading is disabled for the account"),
            Self::OutsideSession => write!(f, "outside trading session"),
            Self::ConcurrentPositions { open, limit } => {
                write!(f, "{open} positions open, limit {limit}")
            }
            Self::DailyTrades { issued, limit } => {
                write!(f, "{issued} orders issued today, limit {limit}")
            }
            Self::DailyLoss { loss, limit } => {
                write!(f, "realized loss {loss} today, limit {limit}")
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    fn msk() -> FixedOffset {
        FixedOffset::east_opt(3 * 3600).unwrap()
    }

    fn moex_session() -> TradingSession {
        TradingSession {
            offset: msk(),
            hours: Some(SessionHours {
                open: NaiveTime::from_hms_opt(10, 5, 0).unwrap(),
                close: NaiveTime::from_hms_opt(18, 40, 0).unwrap(),
            }),
            days: vec![
                Weekday::Mon,
                Weekday::Tue,
                Weekday::Wed,
                Weekday::Thu,
                Weekday::Fri,
            ],
        }
    }

    fn utc(y: i32, m: u32, d: u32, h: u32, min: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(y, m, d, h, min, 0).unwrap()
    }

    #[test]
    fn session_window_is_inclusive_in_local_time() {
        let session = moex_session();
        // 2026-03-02 is a Monday; MSK is UTC+3.
        assert!(!session.is_open(utc(2026, 3, 2, 7, 4)));
        assert!(session.is_open(utc(2026, 3, 2, 7, 5)));
        assert!(session.is_open(utc(2026, 3, 2, 15, 40)));
        assert!(!session.is_open(utc(2026, 3, 2, 15, 41)));
    }

    #[test]
    fn session_closed_on_weekends() {
        let session = moex_session();
        assert!(!session.is_open(utc(2026, 3, 7, 12, 0)));
        assert!(!session.is_open(utc(2026, 3, 8, 12, 0)));
    }

    #[test]
    fn continuous_session_never_closes() {
        let session = TradingSession::continuous(msk());
        assert!(session.is_open(utc(2026, 3, 8, 23, 59)));
        assert!(session.is_open(utc(2026, 3, 2, 0, 0)));
    }

    #[test]
    fn day_starts_at_local_midnight() {
        let session = moex_session();
        // 22:30 UTC Monday is already Tuesday 01:30 MSK.
        assert_eq!(session.day_start(utc(2026, 3, 2, 22, 30)), utc(2026, 3, 2, 21, 0));
        assert_eq!(session.day_start(utc(2026, 3, 2, 12, 0)), utc(2026, 3, 1, 21, 0));
    }

    #[test]
    fn loss_ignores_profit() {
        let profit = DailyActivity {
            trades: 2,
            realized_pnl: dec!(150),
        };
        assert_eq!(profit.loss(), Money::new(Decimal::ZERO));

        let loss = DailyActivity {
            trades: 2,
            realized_pnl: dec!(-150),
        };
        assert_eq!(loss.loss(), Money::new(dec!(150)));
    }

    #[test]
    fn rejection_labels_are_distinct() {
        let labels = [
            GuardRejection::TradingDisabled.label(),
            GuardRejection::OutsideSession.label(),
            GuardRejection::ConcurrentPositions { open: 3, limit: 3 }.label(),
            GuardRejection::DailyTrades { issued: 10, limit: 10 }.label(),
            GuardRejection::DailyLoss {
                loss: Money::new(dec!(1)),
                limit: Money::new(dec!(1)),
            }
            .label(),
        ];
        let unique: std::collections::HashSet<_> = labels.iter().collect();
        assert_eq!(unique.len(), labels.len());
    }
}
