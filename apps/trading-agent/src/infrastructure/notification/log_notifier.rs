//! Notifier that writes notifications to the log.

use async_trait::async_trait;

use crate::application::ports::{Notification, NotificationError, NotificationPort};

/// Emits every notification as a structured `tracing` event.
#[derive(Debug, Clone, Default)]
pub struct LogNotifier;

impl LogNotifier {
    /// Create a new log notifier.
    #[must_use]
    pub const fn new() -> Self {
        Self
    }
}

#[async_trait]
impl NotificationPort for LogNotifier {
    async fn notify(&self, notification: Notification) -> Result<(), NotificationError> {
        let payload = serde_json::to_string(&notification).map_err(|e| {
            NotificationError::SerializationError {
                message: e.to_string(),
            }
        })?;

        match &notification {
            Notification::RunClosed(summary) => tracing::info!(
                target: "trading_agent::notification",
                kind = notification.kind(),
                run_id = %summary.run_id,
                outcome = %summary.outcome,
                %payload,
                "Run closed"
            ),
            Notification::OrderFailed(failure) => tracing::error!(
                target: "trading_agent::notification",
                kind = notification.kind(),
                order_id = %failure.order_id,
                instrument = %failure.instrument_id,
                %payload,
                "Order failed"
            ),
            Notification::OrderLost(lost) => tracing::error!(
                target: "trading_agent::notification",
                kind = notification.kind(),
                order_id = %lost.order_id,
                instrument = %lost.instrument_id,
                %payload,
                "Order lost by broker"
            ),
            Notification::PositionDrift(drift) => tracing::warn!(
                target: "trading_agent::notification",
                kind = notification.kind(),
                instrument = %drift.instrument_id,
                %payload,
                "Position drift"
            ),
        }
        Ok(())
    }
}
