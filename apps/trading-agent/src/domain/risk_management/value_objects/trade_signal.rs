//! Sizing inputs.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::domain::portfolio::{Account, Position};
use crate::domain::shared::InstrumentId;

/// What a signal wants done with an instrument.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "action", rename_all = "snake_case")]
pub enum TradeIntent {
    /// Increase a long or reduce a short.
    Buy {
        /// Requested units; `None` sizes to the limit.
        #[serde(default)]
        quantity: Option<Decimal>,
    },
    /// Increase a short or reduce a long.
    Sell {
        /// Requested units; `None` sizes to the limit.
        #[serde(default)]
        quantity: Option<Decimal>,
    },
    /// Flatten the position.
    Close,
    /// Leave the position alone.
    Hold,
}

impl TradeIntent {
    /// Returns true if acting on the intent can grow the position held.
    ///
    /// Buying into a short or selling out of a long only reduces, since
    /// reductions never flip the sign of a position.
    #[must_use]
    pub fn increases_exposure(&self, held: Decimal) -> bool {
        match self {
            Self::Buy { .. } => held >= Decimal::ZERO,
            Self::Sell { .. } => held <= Decimal::ZERO,
            Self::Close | Self::Hold => false,
        }
    }
}

/// Evaluated signal for one instrument at the current price.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TradeSignal {
    /// Instrument the signal refers to.
    pub instrument_id: InstrumentId,
    /// Current market price.
    pub price: Decimal,
    /// Desired action.
    pub intent: TradeIntent,
}

/// Everything the sizer looks at for one decision.
#[derive(Debug, Clone, Copy)]
pub struct SizingRequest<'a> {
    /// Account snapshot for the cycle.
    pub account: &'a Account,
    /// Signal being sized.
    pub signal: &'a TradeSignal,
    /// Current position, if any.
    pub position: Option<&'a Position>,
    /// Instrument lot size (units per lot).
    pub lot_size: u32,
}
