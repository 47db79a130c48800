//! Account configuration.

use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};

use crate::domain::portfolio::Account;
use crate::domain::shared::{AccountId, DomainError, Money};

/// Account risk configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AccountConfig {
    /// Account identifier.
    #[serde(default = "default_account_id")]
    pub id: String,
    /// Deposit value the risk budget is computed from.
    pub deposit_value: Decimal,
    /// Fraction of the deposit risked per trade.
    #[serde(default = "default_risk_per_trade_pct")]
    pub risk_per_trade_pct: Decimal,
    /// Maximum fraction of the deposit held in one instrument.
    #[serde(default = "default_max_position_pct")]
    pub max_position_pct: Decimal,
}

impl AccountConfig {
    /// Build the domain account.
    ///
    /// # Errors
    ///
    /// Returns an error if the percentages or deposit are out of range.
    pub fn to_account(&self) -> Result<Account, DomainError> {
        Account::new(
            AccountId::new(self.id.clone()),
            Money::new(self.deposit_value),
            self.risk_per_trade_pct,
            self.max_position_pct,
        )
    }
}

fn default_account_id() -> String {
    "main".to_string()
}

const fn default_risk_per_trade_pct() -> Decimal {
    dec!(0.01)
}

const fn default_max_position_pct() -> Decimal {
    dec!(0.25)
}
