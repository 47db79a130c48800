//! Open Order Table
//!
//! Keyed table of the single open order allowed per instrument. Entries
//! are claimed before an order reaches the broker and released only by
//! the task that drives the order to its ledger write.

use std::collections::HashMap;

use parking_lot::Mutex;

use crate::domain::shared::{InstrumentId, OrderId};

/// Instrument to open-order mapping.
#[derive(Debug, Default)]
pub struct OpenOrderTable {
    entries: Mutex<HashMap<InstrumentId, OrderId>>,
}

impl OpenOrderTable {
    /// Create an empty table.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Claim the instrument for `order_id`.
    ///
    /// # Errors
    ///
    /// Returns the id of the order already holding the instrument.
    pub fn try_claim(&self, instrument_id: &InstrumentId, order_id: &OrderId) -> Result<(), OrderId> {
        let mut entries = self.entries.lock();
        if let Some(existing) = entries.get(instrument_id) {
            return Err(existing.clone());
        }
        entries.insert(instrument_id.clone(), order_id.clone());
        Ok(())
    }

    /// Release the instrument if `order_id` still holds it.
    ///
    /// Returns true when an entry was removed.
    pub fn release(&self, instrument_id: &InstrumentId, order_id: &OrderId) -> bool {
        let mut entries = self.entries.lock();
        if entries.get(instrument_id) == Some(order_id) {
            entries.remove(instrument_id);
            true
        } else {
            false
        }
    }

    /// Order currently holding the instrument.
    #[must_use]
    pub fn holder(&self, instrument_id: &InstrumentId) -> Option<OrderId> {
        self.entries.lock().get(instrument_id).cloned()
    }

    /// Returns true if the instrument has an open order.
    #[must_use]
    pub fn is_claimed(&self, instrument_id: &InstrumentId) -> bool {
        self.entries.lock().contains_key(instrument_id)
    }

    /// Returns true if some instrument is held by `order_id`.
    #[must_use]
    pub fn is_tracking(&self, order_id: &OrderId) -> bool {
        self.entries.lock().values().any(|held| held == order_id)
    }

    /// Number of open orders.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.lock().len()
    }

    /// Returns true if no instrument has an open order.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.lock().is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn second_claim_is_refused() {
        let table = OpenOrderTable::new();
        let sber = InstrumentId::new("SBER");

        assert!(table.try_claim(&sber, &OrderId::new("o-1")).is_ok());
        assert_eq!(
            table.try_claim(&sber, &OrderId::new("o-2")),
            Err(OrderId::new("o-1"))
        );
        assert!(table.is_claimed(&sber));
        assert!(table.is_tracking(&OrderId::new("o-1")));
        assert_eq!(table.len(), 1);
    }

    #[test]
    fn release_requires_holder() {
        let table = OpenOrderTable::new();
        let sber = InstrumentId::new("SBER");
        table.try_claim(&sber, &OrderId::new("o-1")).unwrap();

        assert!(!table.release(&sber, &OrderId::new("o-2")));
        assert_eq!(table.holder(&sber), Some(OrderId::new("o-1")));

        assert!(table.release(&sber, &OrderId::new("o-1")));
        assert!(table.is_empty());
        assert!(table.try_claim(&sber, &OrderId::new("o-3")).is_ok());
    }

    #[test]
    fn instruments_are_independent() {
        let table = OpenOrderTable::new();
        table
            .try_claim(&InstrumentId::new("SBER"), &OrderId::new("o-1"))
            .unwrap();
        assert!(
            table
                .try_claim(&InstrumentId::new("GAZP"), &OrderId::new("o-2"))
                .is_ok()
        );
        assert_eq!(table.len(), 2);
    }
}
