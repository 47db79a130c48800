//! Order side (buy or sell).

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Order side (buy or sell).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum OrderSide {
    /// Buy order.
    Buy,
    /// Sell order.
    Sell,
}

impl OrderSide {
    /// Returns the opposite side.
    #[must_use]
    pub const fn opposite(&self) -> Self {
        match self {
            Self::Buy => Self::Sell,
            Self::Sell => Self::Buy,
        }
    }

    /// Side that moves a position by `delta` (positive buys, negative sells).
    ///
    /// Returns `None` for a zero delta.
    #[must_use]
    pub fn for_delta(delta: Decimal) -> Option<Self> {
        if delta.is_zero() {
            None
        } else if delta.is_sign_positive() {
            Some(Self::Buy)
        } else {
            Some(Self::Sell)
        }
    }

    /// Apply the side's sign to an unsigned quantity.
    #[must_use]
    pub fn signed(&self, quantity: Decimal) -> Decimal {
        match self {
            Self::Buy => quantity.abs(),
            Self::Sell => -quantity.abs(),
        }
    }

    /// Stable storage representation.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Buy => "BUY",
            Self::Sell => "SELL",
        }
    }
}

impl fmt::Display for OrderSide {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for OrderSide {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "BUY" => Ok(Self::Buy),
            "SELL" => Ok(Self::Sell),
            other => Err(format!("unknown order side: {other}")),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn order_side_opposite() {
        assert_eq!(OrderSide::Buy.opposite(), OrderSide::Sell);
        assert_eq!(OrderSide::Sell.opposite(), OrderSide::Buy);
    }

    #[test]
    fn order_side_for_delta() {
        assert_eq!(OrderSide::for_delta(dec!(5)), Some(OrderSide::Buy));
        assert_eq!(OrderSide::for_delta(dec!(-5)), Some(OrderSide::Sell));
        assert_eq!(OrderSide::for_delta(Decimal::ZERO), None);
    }

    #[test]
    fn order_side_signed() {
        assert_eq!(OrderSide::Buy.signed(dec!(10)), dec!(10));
        assert_eq!(OrderSide::Sell.signed(dec!(10)), dec!(-10));
    }

    #[test]
    fn order_side_serde() {
        let json = serde_json::to_string(&OrderSide::Buy).unwrap();
        assert_eq!(json, "\"BUY\"");

        let parsed: OrderSide = serde_json::from_str("\"SELL\"").unwrap();
        assert_eq!(parsed, OrderSide::Sell);
        assert_eq!("SELL".parse::<OrderSide>().unwrap(), OrderSide::Sell);
    }
}
