//! Sizing output.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::domain::order_execution::OrderSide;
use crate::domain::shared::{InstrumentId, Money, Quantity};

/// Result of sizing one signal.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum SizingDecision {
    /// Nothing to do this cycle.
    NoAction(NoActionReason),
    /// Place an order.
    Trade(TradeDecision),
}

impl SizingDecision {
    /// The trade, if any.
    #[must_use]
    pub const fn trade(&self) -> Option<&TradeDecision> {
        match self {
            Self::Trade(trade) => Some(trade),
            Self::NoAction(_) => None,
        }
    }
}

/// Why the sizer declined to trade.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NoActionReason {
    /// Signal asked for no change.
    Hold,
    /// Account has no deposit to size against.
    ZeroDeposit,
    /// Position already at or above the cap; increases are blocked.
    AtPositionCap,
    /// Allowed quantity rounds down to zero lots.
    BelowLotSize,
    /// Close requested with nothing held.
    NoPosition,
    /// Signal requested a zero or negative quantity.
    NonPositiveRequest,
}

impl NoActionReason {
    /// Metrics and log label.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Hold => "hold",
            Self::ZeroDeposit => "zero_deposit",
            Self::AtPositionCap => "at_position_cap",
            Self::BelowLotSize => "below_lot_size",
            Self::NoPosition => "no_position",
            Self::NonPositiveRequest => "non_positive_request",
        }
    }
}

impl fmt::Display for NoActionReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Which bound determined the proposed quantity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SizingLimit {
    /// The signal's own requested quantity.
    Requested,
    /// Risk capital per trade.
    RiskCapital,
    /// Remaining headroom under the position cap.
    PositionCap,
    /// Size of the position being reduced.
    PositionSize,
}

/// A sized order proposal.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TradeDecision {
    /// Instrument to trade.
    pub instrument_id: InstrumentId,
    /// Order side.
    pub side: OrderSide,
    /// Unsigned order quantity.
    pub quantity: Quantity,
    /// Price the decision was sized at.
    pub price: Decimal,
    /// True when the order shrinks an existing position.
    pub reduces_exposure: bool,
    /// Bound that set the quantity.
    pub limited_by: SizingLimit,
}

impl TradeDecision {
    /// Signed position delta the decision proposes.
    #[must_use]
    pub fn signed_quantity(&self) -> Decimal {
        self.side.signed(self.quantity.amount())
    }

    /// Notional of the order at the sizing price.
    #[must_use]
    pub fn notional(&self) -> Money {
        Money::new(self.quantity.amount() * self.price)
    }
}
