//! Quantity value object for order quantities.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::fmt;
use std::ops::{Add, Sub};

use crate::domain::shared::DomainError;

/// An unsigned order quantity in instrument units.
///
/// Position quantities are signed and kept as plain `Decimal`; order
/// quantities are always positive and carry their direction in the side.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Quantity(Decimal);

impl Quantity {
    /// Create a new Quantity from a Decimal.
    #[must_use]
    pub const fn new(amount: Decimal) -> Self {
        Self(amount)
    }

    /// Create a Quantity from an integer.
    #[must_use]
    pub fn from_i64(amount: i64) -> Self {
        Self(Decimal::new(amount, 0))
    }

    /// Zero quantity.
    pub const ZERO: Self = Self(Decimal::ZERO);

    /// Get the inner Decimal value.
    #[must_use]
    pub const fn amount(&self) -> Decimal {
        self.0
    }

    /// Returns true if this quantity is positive.
    #[must_use]
    pub fn is_positive(&self) -> bool {
        self.0 > Decimal::ZERO
    }

    /// Returns true if this quantity is zero.
    #[must_use]
    pub fn is_zero(&self) -> bool {
        self.0 == Decimal::ZERO
    }

    /// Validate quantity for order submission.
    ///
    /// # Errors
    ///
    /// Returns error if quantity is zero or negative.
    pub fn validate_for_order(&self) -> Result<(), DomainError> {
        if self.0 <= Decimal::ZERO {
            return Err(DomainError::InvalidValue {
                field: "quantity".to_string(),
                message: "Order quantity must be positive".to_string(),
            });
        }
        Ok(())
    }

    /// Round down to a whole multiple of `lot_size` units.
    ///
    /// A lot size of zero is treated as one.
    #[must_use]
    pub fn round_down_to_lot(&self, lot_size: u32) -> Self {
        let lot = Decimal::from(lot_size.max(1));
        Self((self.0 / lot).floor() * lot)
    }
}

impl Default for Quantity {
    fn default() -> Self {
        Self::ZERO
    }
}

impl fmt::Display for Quantity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.0.fract().is_zero() {
            write!(f, "{}", self.0.trunc())
        } else {
            write!(f, "{:.4}", self.0)
        }
    }
}

impl PartialOrd for Quantity {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Quantity {
    fn cmp(&self, other: &Self) -> Ordering {
        self.0.cmp(&other.0)
    }
}

impl Add for Quantity {
    type Output = Self;

    fn add(self, rhs: Self) -> Self::Output {
        Self(self.0 + rhs.0)
    }
}

impl Sub for Quantity {
    type Output = Self;

    fn sub(self, rhs: Self) -> Self::Output {
        Self(self.0 - rhs.0)
    }
}

impl From<Decimal> for Quantity {
    fn from(value: Decimal) -> Self {
        Self(value)
    }
}

impl From<i64> for Quantity {
    fn from(value: i64) -> Self {
        Self::from_i64(value)
    }
}

impl From<Quantity> for Decimal {
    fn from(value: Quantity) -> Self {
        value.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;
    use test_case::test_case;

    #[test]
    fn quantity_display() {
        assert_eq!(format!("{}", Quantity::from_i64(100)), "100");
        assert_eq!(format!("{}", Quantity::new(dec!(100.5))), "100.5000");
    }

    #[test_case(dec!(157), 10, dec!(150) ; "partial lot dropped")]
    #[test_case(dec!(150), 10, dec!(150) ; "exact lots kept")]
    #[test_case(dec!(9), 10, dec!(0) ; "below one lot")]
    #[test_case(dec!(99.7), 1, dec!(99) ; "fractional units dropped")]
    #[test_case(dec!(42), 0, dec!(42) ; "zero lot treated as one")]
    fn round_down_to_lot(input: Decimal, lot: u32, expected: Decimal) {
        assert_eq!(Quantity::new(input).round_down_to_lot(lot).amount(), expected);
    }

    #[test]
    fn validate_for_order_rejects_non_positive() {
        assert!(Quantity::ZERO.validate_for_order().is_err());
        assert!(Quantity::from_i64(-5).validate_for_order().is_err());
        assert!(Quantity::from_i64(5).validate_for_order().is_ok());
    }
}
