//! Signal Port (Driven Port)
//!
//! Supplies the current price and desired action for each tracked
//! instrument. Strategy logic lives behind this port.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::domain::risk_management::TradeSignal;
use crate::domain::shared::InstrumentId;

/// Instrument the agent evaluates every cycle.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TrackedInstrument {
    /// Instrument identifier.
    pub instrument_id: InstrumentId,
    /// Units per lot; orders are whole lots.
    pub lot_size: u32,
}

impl TrackedInstrument {
    /// Create a tracked instrument.
    #[must_use]
    pub fn new(instrument_id: impl Into<InstrumentId>, lot_size: u32) -> Self {
        Self {
            instrument_id: instrument_id.into(),
            lot_size,
        }
    }
}

/// Signal source error.
#[derive(Debug, Clone, thiserror::Error)]
pub enum SignalError {
    /// Source could not produce a signal.
    #[error("Signal unavailable for {instrument_id}: {message}")]
    Unavailable {
        /// Instrument concerned.
        instrument_id: String,
        /// Error details.
        message: String,
    },
}

/// Port for trade signals.
#[async_trait]
pub trait SignalPort: Send + Sync {
    /// Evaluate one instrument. `None` means no opinion this cycle.
    async fn evaluate(
        &self,
        instrument: &TrackedInstrument,
    ) -> Result<Option<TradeSignal>, SignalError>;
}
