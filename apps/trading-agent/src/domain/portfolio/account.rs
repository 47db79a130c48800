//! Account risk configuration.

use rust_decimal::Decimal;
use serde::Serialize;

use crate::domain::shared::{AccountId, DomainError, Money};

/// Immutable account snapshot used for one evaluation cycle.
///
/// Invariants (checked by [`Account::new`]):
/// - `deposit_value >= 0`
/// - `0 < risk_per_trade_pct <= 1`
/// - `0 < max_position_pct <= 1`
/// - `risk_per_trade_pct <= max_position_pct`
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Account {
    id: AccountId,
    deposit_value: Money,
    risk_per_trade_pct: Decimal,
    max_position_pct: Decimal,
}

impl Account {
    /// Build an account snapshot, validating the risk invariants.
    ///
    /// # Errors
    ///
    /// Returns `DomainError` if any invariant is violated.
    pub fn new(
        id: AccountId,
        deposit_value: Money,
        risk_per_trade_pct: Decimal,
        max_position_pct: Decimal,
    ) -> Result<Self, DomainError> {
        deposit_value.validate_as_deposit()?;
        validate_pct("risk_per_trade_pct", risk_per_trade_pct)?;
        validate_pct("max_position_pct", max_position_pct)?;

        if risk_per_trade_pct > max_position_pct {
            return Err(DomainError::InvariantViolation {
                aggregate: "Account".to_string(),
                invariant: "risk_per_trade_pct <= max_position_pct".to_string(),
                state: format!("risk={risk_per_trade_pct}, max={max_position_pct}"),
            });
        }

        Ok(Self {
            id,
            deposit_value,
            risk_per_trade_pct,
            max_position_pct,
        })
    }

    /// Account identifier.
    #[must_use]
    pub const fn id(&self) -> &AccountId {
        &self.id
    }

    /// Deposit value in base currency.
    #[must_use]
    pub const fn deposit_value(&self) -> Money {
        self.deposit_value
    }

    /// Fraction of the deposit that may be risked on one trade.
    #[must_use]
    pub const fn risk_per_trade_pct(&self) -> Decimal {
        self.risk_per_trade_pct
    }

    /// Fraction of the deposit one position may occupy.
    #[must_use]
    pub const fn max_position_pct(&self) -> Decimal {
        self.max_position_pct
    }

    /// Maximum notional of a single exposure-increasing order.
    #[must_use]
    pub fn risk_capital(&self) -> Money {
        self.deposit_value.fraction(self.risk_per_trade_pct)
    }

    /// Maximum notional of a single position.
    #[must_use]
    pub fn position_cap(&self) -> Money {
        self.deposit_value.fraction(self.max_position_pct)
    }
}

fn validate_pct(field: &str, value: Decimal) -> Result<(), DomainError> {
    if value <= Decimal::ZERO || value > Decimal::ONE {
        return Err(DomainError::InvalidValue {
            field: field.to_string(),
            message: format!("must be in (0, 1], got {value}"),
        });
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;
    use test_case::test_case;

    fn account(deposit: Decimal, risk: Decimal, max: Decimal) -> Result<Account, DomainError> {
        Account::new(AccountId::new("acc"), Money::new(deposit), risk, max)
    }

    #[test]
    fn account_limits() {
        let acc = account(dec!(1000000), dec!(0.01), dec!(0.25)).unwrap();
        assert_eq!(acc.risk_capital(), Money::new(dec!(10000)));
        assert_eq!(acc.position_cap(), Money::new(dec!(250000)));
    }

    #[test_case(dec!(0), dec!(0.25) ; "zero risk")]
    #[test_case(dec!(0.01), dec!(1.5) ; "max above one")]
    #[test_case(dec!(-0.01), dec!(0.25) ; "negative risk")]
    #[test_case(dec!(0.3), dec!(0.25) ; "risk above max")]
    fn invalid_percentages_rejected(risk: Decimal, max: Decimal) {
        assert!(account(dec!(1000), risk, max).is_err());
    }

    #[test]
    fn risk_equal_to_max_is_allowed() {
        assert!(account(dec!(1000), dec!(0.25), dec!(0.25)).is_ok());
    }

    #[test]
    fn zero_deposit_allowed_negative_rejected() {
        assert!(account(dec!(0), dec!(0.01), dec!(0.25)).is_ok());
        assert!(account(dec!(-1), dec!(0.01), dec!(0.25)).is_err());
    }
}
