//! Signals served from configuration.

use std::collections::{HashMap, HashSet};

use async_trait::async_trait;
use parking_lot::RwLock;
use rust_decimal::Decimal;

use crate::application::ports::{SignalError, SignalPort, TrackedInstrument};
use crate::domain::risk_management::{TradeIntent, TradeSignal};
use crate::domain::shared::InstrumentId;

/// Static price and intent per instrument.
///
/// Intents can be replaced at runtime, which tests use to script a sequence
/// of cycles.
#[derive(Debug, Default)]
pub struct ConfiguredSignals {
    signals: RwLock<HashMap<InstrumentId, TradeSignal>>,
    unavailable: RwLock<HashSet<InstrumentId>>,
}

impl ConfiguredSignals {
    /// Create an empty signal source.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a signal source from `(instrument, price, intent)` entries.
    #[must_use]
    pub fn from_entries(entries: impl IntoIterator<Item = (InstrumentId, Decimal, TradeIntent)>) -> Self {
        let signals = entries
            .into_iter()
            .map(|(instrument_id, price, intent)| {
                (
                    instrument_id.clone(),
                    TradeSignal {
                        instrument_id,
                        price,
                        intent,
                    },
                )
            })
            .collect();
        Self {
            signals: RwLock::new(signals),
            unavailable: RwLock::new(HashSet::new()),
        }
    }

    /// Set or replace the signal for an instrument.
    pub fn set(&self, instrument_id: impl Into<InstrumentId>, price: Decimal, intent: TradeIntent) {
        let instrument_id = instrument_id.into();
        self.signals.write().insert(
            instrument_id.clone(),
            TradeSignal {
                instrument_id,
                price,
                intent,
            },
        );
    }

    /// Make evaluation of an instrument fail.
    pub fn set_unavailable(&self, instrument_id: impl Into<InstrumentId>, unavailable: bool) {
        let instrument_id = instrument_id.into();
        let mut set = self.unavailable.write();
        if unavailable {
            set.insert(instrument_id);
        } else {
            set.remove(&instrument_id);
        }
    }
}

#[async_trait]
impl SignalPort for ConfiguredSignals {
    async fn evaluate(
        &self,
        instrument: &TrackedInstrument,
    ) -> Result<Option<TradeSignal>, SignalError> {
        if self.unavailable.read().contains(&instrument.instrument_id) {
            return Err(SignalError::Unavailable {
                instrument_id: instrument.instrument_id.to_string(),
                message: "signal source marked unavailable".to_string(),
            });
        }

        Ok(self
            .signals
            .read()
            .get(&instrument.instrument_id)
            .filter(|s| s.intent != TradeIntent::Hold)
            .cloned())
    }
}
