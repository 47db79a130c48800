//! Sizing errors.

use std::fmt;

use crate::domain::shared::InstrumentId;

/// Errors raised by the risk sizer.
///
/// Each one aborts the decision for a single instrument only.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SizingError {
    /// Price input is unusable (zero, negative, or out of arithmetic range).
    InvalidMarketData {
        /// Instrument whose data was bad.
        instrument_id: InstrumentId,
        /// Offending price.
        price: String,
        /// What was wrong.
        message: String,
    },
}

impl fmt::Display for SizingError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::InvalidMarketData {
                instrument_id,
                price,
                message,
            } => write!(
                f,
                "Invalid market data for {instrument_id} (price {price}): {message}"
            ),
        }
    }
}

impl std::error::Error for SizingError {}
