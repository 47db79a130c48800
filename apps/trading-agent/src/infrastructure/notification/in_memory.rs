//! Notifier that keeps notifications in memory.

use async_trait::async_trait;
use parking_lot::Mutex;

use crate::application::ports::{Notification, NotificationError, NotificationPort};

/// Captures notifications for inspection. Can be switched to fail delivery.
#[derive(Debug, Default)]
pub struct InMemoryNotifier {
    sent: Mutex<Vec<Notification>>,
    failing: Mutex<bool>,
}

impl InMemoryNotifier {
    /// Create an empty notifier.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Make every delivery fail.
    pub fn set_failing(&self, failing: bool) {
        *self.failing.lock() = failing;
    }

    /// Notifications delivered so far.
    #[must_use]
    pub fn sent(&self) -> Vec<Notification> {
        self.sent.lock().clone()
    }

    /// Notifications of one kind.
    #[must_use]
    pub fn sent_of_kind(&self, kind: &str) -> Vec<Notification> {
        self.sent
            .lock()
            .iter()
            .filter(|n| n.kind() == kind)
            .cloned()
            .collect()
    }

    /// Forget delivered notifications.
    pub fn clear(&self) {
        self.sent.lock().clear();
    }
}

#[async_trait]
impl NotificationPort for InMemoryNotifier {
    async fn notify(&self, notification: Notification) -> Result<(), NotificationError> {
        if *self.failing.lock() {
            return Err(NotificationError::DeliveryFailed {
                message: "notifier marked failing".to_string(),
            });
        }
        self.sent.lock().push(notification);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::application::ports::PositionDrift;
    use crate::domain::shared::InstrumentId;
    use rust_decimal::Decimal;

    fn drift() -> Notification {
        Notification::PositionDrift(PositionDrift {
            instrument_id: InstrumentId::new("GAZP"),
            ledger_quantity: Decimal::ZERO,
            broker_quantity: Decimal::ONE,
        })
    }

    #[tokio::test]
    async fn captures_notifications() {
        let notifier = InMemoryNotifier::new();
        notifier.notify(drift()).await.unwrap();

        assert_eq!(notifier.sent().len(), 1);
        assert_eq!(notifier.sent_of_kind("position_drift").len(), 1);
        assert!(notifier.sent_of_kind("run_closed").is_empty());

        notifier.clear();
        assert!(notifier.sent().is_empty());
    }

    #[tokio::test]
    async fn failing_notifier_drops_delivery() {
        let notifier = InMemoryNotifier::new();
        notifier.set_failing(true);

        assert!(matches!(
            notifier.notify(drift()).await,
            Err(NotificationError::DeliveryFailed { .. })
        ));
        assert!(notifier.sent().is_empty());
    }
}
