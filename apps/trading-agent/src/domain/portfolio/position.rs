//! Signed position and the deltas that move it.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::domain::shared::{InstrumentId, Money};

/// A signed holding in one instrument. Negative quantity is a short.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Position {
    /// Instrument held.
    pub instrument_id: InstrumentId,
    /// Signed quantity.
    pub quantity: Decimal,
    /// Volume-weighted entry price of the open quantity.
    pub average_price: Decimal,
}

/// Confirmed change to a position produced by an order fill.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PositionDelta {
    /// Instrument affected.
    pub instrument_id: InstrumentId,
    /// Signed quantity change (buy positive, sell negative).
    pub quantity: Decimal,
    /// Fill price.
    pub price: Decimal,
}

impl Position {
    /// Create a position.
    #[must_use]
    pub const fn new(instrument_id: InstrumentId, quantity: Decimal, average_price: Decimal) -> Self {
        Self {
            instrument_id,
            quantity,
            average_price,
        }
    }

    /// An empty position.
    #[must_use]
    pub const fn flat(instrument_id: InstrumentId) -> Self {
        Self::new(instrument_id, Decimal::ZERO, Decimal::ZERO)
    }

    /// True when nothing is held.
    #[must_use]
    pub fn is_flat(&self) -> bool {
        self.quantity.is_zero()
    }

    /// Absolute exposure at `price`.
    #[must_use]
    pub fn notional(&self, price: Decimal) -> Money {
        Money::new(self.quantity.abs() * price)
    }

    /// Profit or loss realized by the part of `delta` that reduces this position.
    ///
    /// Zero when the fill only adds to the position.
    #[must_use]
    pub fn realized_pnl(&self, delta: &PositionDelta) -> Decimal {
        let current = self.quantity;
        if current.is_zero() || current.is_sign_positive() == delta.quantity.is_sign_positive() {
            return Decimal::ZERO;
        }
        let closed = delta.quantity.abs().min(current.abs());
        let per_unit = delta.price - self.average_price;
        if current.is_sign_positive() {
            closed * per_unit
        } else {
            -closed * per_unit
        }
    }

    /// Position after applying a confirmed fill.
    ///
    /// Adding to the position re-weights the average price, reducing keeps it,
    /// crossing zero restarts it at the fill price.
    #[must_use]
    pub fn apply(&self, delta: &PositionDelta) -> Self {
        let current = self.quantity;
        let next = current + delta.quantity;

        let average_price = if next.is_zero() {
            Decimal::ZERO
        } else if current.is_zero() || current.is_sign_positive() == delta.quantity.is_sign_positive() {
            let cost = current.abs() * self.average_price + delta.quantity.abs() * delta.price;
            cost / next.abs()
        } else if next.is_sign_positive() == current.is_sign_positive() {
            self.average_price
        } else {
            delta.price
        };

        Self {
            instrument_id: self.instrument_id.clone(),
            quantity: next,
            average_price,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    fn delta(quantity: Decimal, price: Decimal) -> PositionDelta {
        PositionDelta {
            instrument_id: InstrumentId::new("SBER"),
            quantity,
            price,
        }
    }

    #[test]
    fn open_from_flat() {
        let pos = Position::flat(InstrumentId::new("SBER")).apply(&delta(dec!(10), dec!(100)));
        assert_eq!(pos.quantity, dec!(10));
        assert_eq!(pos.average_price, dec!(100));
    }

    #[test]
    fn adding_reweights_average() {
        let pos = Position::new(InstrumentId::new("SBER"), dec!(10), dec!(100));
        let pos = pos.apply(&delta(dec!(10), dec!(110)));
        assert_eq!(pos.quantity, dec!(20));
        assert_eq!(pos.average_price, dec!(105));
    }

    #[test]
    fn reducing_keeps_average() {
        let pos = Position::new(InstrumentId::new("SBER"), dec!(20), dec!(105));
        let pos = pos.apply(&delta(dec!(-5), dec!(130)));
        assert_eq!(pos.quantity, dec!(15));
        assert_eq!(pos.average_price, dec!(105));
    }

    #[test]
    fn closing_resets_average() {
        let pos = Position::new(InstrumentId::new("SBER"), dec!(-8), dec!(50));
        let pos = pos.apply(&delta(dec!(8), dec!(45)));
        assert!(pos.is_flat());
        assert_eq!(pos.average_price, Decimal::ZERO);
    }

    #[test]
    fn short_adds_reweight() {
        let pos = Position::new(InstrumentId::new("SBER"), dec!(-10), dec!(100));
        let pos = pos.apply(&delta(dec!(-30), dec!(80)));
        assert_eq!(pos.quantity, dec!(-40));
        assert_eq!(pos.average_price, dec!(85));
    }

    #[test]
    fn realized_pnl_on_long_reduction() {
        let pos = Position::new(InstrumentId::new("SBER"), dec!(20), dec!(105));
        assert_eq!(pos.realized_pnl(&delta(dec!(-5), dec!(130))), dec!(125));
        assert_eq!(pos.realized_pnl(&delta(dec!(-20), dec!(100))), dec!(-100));
    }

    #[test]
    fn realized_pnl_on_short_cover_and_flip() {
        let pos = Position::new(InstrumentId::new("SBER"), dec!(-8), dec!(50));
        assert_eq!(pos.realized_pnl(&delta(dec!(8), dec!(45))), dec!(40));
        // Only the covered 8 realize; the extra 4 open a long.
        assert_eq!(pos.realized_pnl(&delta(dec!(12), dec!(55))), dec!(-40));
    }

    #[test]
    fn adding_realizes_nothing() {
        let flat = Position::flat(InstrumentId::new("SBER"));
        assert_eq!(flat.realized_pnl(&delta(dec!(10), dec!(100))), Decimal::ZERO);

        let long = Position::new(InstrumentId::new("SBER"), dec!(10), dec!(100));
        assert_eq!(long.realized_pnl(&delta(dec!(10), dec!(90))), Decimal::ZERO);
    }

    #[test]
    fn notional_uses_absolute_quantity() {
        let pos = Position::new(InstrumentId::new("SBER"), dec!(-10), dec!(100));
        assert_eq!(pos.notional(dec!(120)), Money::new(dec!(1200)));
    }
}
