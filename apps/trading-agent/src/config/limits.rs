//! Pre-trade guard configuration.

use std::str::FromStr;

use chrono::{FixedOffset, NaiveTime, Weekday};
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};

use super::ConfigError;
use crate::domain::risk_management::{SessionHours, TradingLimits, TradingSession};
use crate::domain::shared::Money;

/// Account-wide limits on new exposure.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LimitsConfig {
    /// Instruments that may hold a position at once.
    #[serde(default = "default_max_concurrent_positions")]
    pub max_concurrent_positions: usize,
    /// Orders per trading day.
    #[serde(default = "default_max_daily_trades")]
    pub max_daily_trades: u32,
    /// Realized loss per trading day after which new exposure stops.
    #[serde(default = "default_max_daily_loss")]
    pub max_daily_loss: Decimal,
}

impl Default for LimitsConfig {
    fn default() -> Self {
        Self {
            max_concurrent_positions: default_max_concurrent_positions(),
            max_daily_trades: default_max_daily_trades(),
            max_daily_loss: default_max_daily_loss(),
        }
    }
}

impl LimitsConfig {
    /// Domain limits.
    #[must_use]
    pub fn to_limits(&self) -> TradingLimits {
        TradingLimits {
            max_concurrent_positions: self.max_concurrent_positions,
            max_daily_trades: self.max_daily_trades,
            max_daily_loss: Money::new(self.max_daily_loss),
        }
    }

    pub(super) fn validate(&self) -> Result<(), ConfigError> {
        if self.max_concurrent_positions == 0 || self.max_daily_trades == 0 {
            return Err(ConfigError::ValidationError(
                "limits.max_concurrent_positions and max_daily_trades must be positive".to_string(),
            ));
        }
        if self.max_daily_loss <= Decimal::ZERO {
            return Err(ConfigError::ValidationError(
                "limits.max_daily_loss must be positive".to_string(),
            ));
        }
        Ok(())
    }
}

/// Trading session, in the exchange's local time.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionConfig {
    /// Offset of the session time zone from UTC, in minutes.
    #[serde(default = "default_utc_offset_minutes")]
    pub utc_offset_minutes: i32,
    /// First admitted local time, `HH:MM`. Absent with `close` for all day.
    #[serde(default = "default_open")]
    pub open: Option<String>,
    /// Last admitted local time, `HH:MM`.
    #[serde(default = "default_close")]
    pub close: Option<String>,
    /// Trading days (`mon` .. `sun`).
    #[serde(default = "default_days")]
    pub days: Vec<String>,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            utc_offset_minutes: default_utc_offset_minutes(),
            open: default_open(),
            close: default_close(),
            days: default_days(),
        }
    }
}

impl SessionConfig {
    /// Build the domain session.
    ///
    /// # Errors
    ///
    /// Returns `ValidationError` for an out-of-range offset, an unparsable
    /// time or weekday, only one of `open`/`close`, or `open` after `close`.
    pub fn to_session(&self) -> Result<TradingSession, ConfigError> {
        let offset = FixedOffset::east_opt(self.utc_offset_minutes.saturating_mul(60))
            .ok_or_else(|| {
                ConfigError::ValidationError(format!(
                    "session.utc_offset_minutes {} out of range",
                    self.utc_offset_minutes
                ))
            })?;

        let hours = match (&self.open, &self.close) {
            (None, None) => None,
            (Some(open), Some(close)) => {
                let hours = SessionHours {
                    open: parse_time("open", open)?,
                    close: parse_time("close", close)?,
                };
                if hours.open > hours.close {
                    return Err(ConfigError::ValidationError(format!(
                        "session.open {open} is after session.close {close}"
                    )));
                }
                Some(hours)
            }
            _ => {
                return Err(ConfigError::ValidationError(
                    "session.open and session.close must be set together".to_string(),
                ));
            }
        };

        let days = self
            .days
            .iter()
            .map(|day| {
                Weekday::from_str(day).map_err(|_| {
                    ConfigError::ValidationError(format!("session.days: unknown weekday '{day}'"))
                })
            })
            .collect::<Result<Vec<_>, _>>()?;

        Ok(TradingSession {
            offset,
            hours,
            days,
        })
    }
}

fn parse_time(field: &str, value: &str) -> Result<NaiveTime, ConfigError> {
    NaiveTime::parse_from_str(value, "%H:%M").map_err(|e| {
        ConfigError::ValidationError(format!("session.{field} '{value}' is not HH:MM: {e}"))
    })
}

const fn default_max_concurrent_positions() -> usize {
    3
}

const fn default_max_daily_trades() -> u32 {
    10
}

const fn default_max_daily_loss() -> Decimal {
    dec!(10000)
}

/// Moscow time.
const fn default_utc_offset_minutes() -> i32 {
    180
}

fn default_open() -> Option<String> {
    Some("10:05".to_string())
}

fn default_close() -> Option<String> {
    Some("18:40".to_string())
}

fn default_days() -> Vec<String> {
    ["mon", "tue", "wed", "thu", "fri"]
        .into_iter()
        .map(str::to_string)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_exchange_session() {
        let session = SessionConfig::default().to_session().unwrap();
        assert_eq!(session.offset.local_minus_utc(), 3 * 3600);
        assert_eq!(
            session.hours,
            Some(SessionHours {
                open: NaiveTime::from_hms_opt(10, 5, 0).unwrap(),
                close: NaiveTime::from_hms_opt(18, 40, 0).unwrap(),
            })
        );
        assert_eq!(session.days.len(), 5);
        assert!(!session.days.contains(&Weekday::Sat));

        let limits = LimitsConfig::default().to_limits();
        assert_eq!(limits, TradingLimits::default());
        assert_eq!(limits.max_daily_loss, Money::new(dec!(10000)));
    }

    #[test]
    fn all_day_session_has_no_hours() {
        let config = SessionConfig {
            open: None,
            close: None,
            ..SessionConfig::default()
        };
        assert!(config.to_session().unwrap().hours.is_none());
    }

    #[test]
    fn half_open_window_is_rejected() {
        let config = SessionConfig {
            close: None,
            ..SessionConfig::default()
        };
        assert!(matches!(
            config.to_session(),
            Err(ConfigError::ValidationError(_))
        ));
    }

    #[test]
    fn inverted_window_is_rejected() {
        let config = SessionConfig {
            open: Some("18:00".to_string()),
            close: Some("10:00".to_string()),
            ..SessionConfig::default()
        };
        assert!(config.to_session().is_err());
    }

    #[test]
    fn unknown_weekday_is_rejected() {
        let config = SessionConfig {
            days: vec!["mon".to_string(), "someday".to_string()],
            ..SessionConfig::default()
        };
        let err = config.to_session().unwrap_err();
        assert!(err.to_string().contains("someday"));
    }
}
