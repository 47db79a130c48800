//! Tracked instrument configuration.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::application::ports::TrackedInstrument;
use crate::domain::risk_management::TradeIntent;

/// One instrument the agent evaluates.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InstrumentConfig {
    /// Instrument identifier.
    pub id: String,
    /// Units per lot.
    #[serde(default = "default_lot_size")]
    pub lot_size: u32,
    /// Reference price used for sizing and paper fills.
    pub price: Decimal,
    /// Desired action.
    #[serde(default = "default_signal")]
    pub signal: TradeIntent,
}

impl InstrumentConfig {
    /// Instrument as seen by the cycle.
    #[must_use]
    pub fn tracked(&self) -> TrackedInstrument {
        TrackedInstrument::new(self.id.clone(), self.lot_size)
    }
}

const fn default_lot_size() -> u32 {
    1
}

const fn default_signal() -> TradeIntent {
    TradeIntent::Hold
}
