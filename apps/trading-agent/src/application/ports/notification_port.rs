//! Notification Port (Driven Port)
//!
//! Outbound alerting. Every closed run, every failed or lost order and
//! every detected position drift produces one notification.

use async_trait::async_trait;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::domain::order_execution::{Order, OrderSide};
use crate::domain::run_history::{RunOutcome, RunRecord};
use crate::domain::shared::{InstrumentId, OrderId, Quantity, RunId, Timestamp};

/// Summary emitted when a run closes.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RunSummary {
    /// Run identifier.
    pub run_id: RunId,
    /// How the run ended.
    pub outcome: RunOutcome,
    /// Orders issued by the run.
    pub order_count: usize,
    /// Orders left open.
    pub carryover_count: usize,
    /// Run start.
    pub started_at: Timestamp,
    /// Run end.
    pub ended_at: Timestamp,
    /// Abort explanation.
    pub abort_reason: Option<String>,
}

impl RunSummary {
    /// Summarize a closed record; `None` while the record is open.
    #[must_use]
    pub fn from_record(record: &RunRecord) -> Option<Self> {
        Some(Self {
            run_id: record.id().clone(),
            outcome: record.outcome()?,
            order_count: record.decisions().len(),
            carryover_count: record.carryover().len(),
            started_at: record.started_at(),
            ended_at: record.ended_at()?,
            abort_reason: record.abort_reason().map(str::to_string),
        })
    }
}

/// Details of an order that exhausted its submission budget.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderFailure {
    /// Failed order.
    pub order_id: OrderId,
    /// Instrument.
    pub instrument_id: InstrumentId,
    /// Side.
    pub side: OrderSide,
    /// Quantity.
    pub quantity: Quantity,
    /// Submission attempts made.
    pub attempts: u32,
    /// Last error.
    pub reason: String,
}

impl OrderFailure {
    /// Describe a failed order.
    #[must_use]
    pub fn from_order(order: &Order) -> Self {
        Self {
            order_id: order.id().clone(),
            instrument_id: order.instrument_id().clone(),
            side: order.side(),
            quantity: order.quantity(),
            attempts: order.submit_attempts(),
            reason: order.status_reason().unwrap_or("unknown").to_string(),
        }
    }
}

/// Ledger and broker disagree about a position.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PositionDrift {
    /// Instrument.
    pub instrument_id: InstrumentId,
    /// Quantity in the ledger.
    pub ledger_quantity: Decimal,
    /// Quantity at the broker.
    pub broker_quantity: Decimal,
}

/// Outbound notification.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Notification {
    /// A run closed.
    RunClosed(RunSummary),
    /// An order failed.
    OrderFailed(OrderFailure),
    /// A carried-over submitted order is unknown to the broker.
    OrderLost(OrderFailure),
    /// Position mismatch detected.
    PositionDrift(PositionDrift),
}

impl Notification {
    /// Metrics label.
    #[must_use]
    pub const fn kind(&self) -> &'static str {
        match self {
            Self::RunClosed(_) => "run_closed",
            Self::OrderFailed(_) => "order_failed",
            Self::OrderLost(_) => "order_lost",
            Self::PositionDrift(_) => "position_drift",
        }
    }
}

/// Notification delivery error.
#[derive(Debug, Clone, thiserror::Error)]
pub enum NotificationError {
    /// Delivery failed.
    #[error("Notification delivery failed: {message}")]
    DeliveryFailed {
        /// Error details.
        message: String,
    },

    /// Serialization error.
    #[error("Notification serialization error: {message}")]
    SerializationError {
        /// Error details.
        message: String,
    },
}

/// Port for outbound notifications.
#[async_trait]
pub trait NotificationPort: Send + Sync {
    /// Deliver one notification.
    async fn notify(&self, notification: Notification) -> Result<(), NotificationError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn summary_requires_closed_record() {
        let mut record = RunRecord::open();
        assert!(RunSummary::from_record(&record).is_none());

        record.record_decision(OrderId::new("o-1"));
        record
            .close(RunOutcome::Aborted, vec![OrderId::new("o-1")], Some("shutdown".to_string()))
            .unwrap();

        let summary = RunSummary::from_record(&record).unwrap();
        assert_eq!(summary.outcome, RunOutcome::Aborted);
        assert_eq!(summary.order_count, 1);
        assert_eq!(summary.carryover_count, 1);
        assert_eq!(summary.abort_reason.as_deref(), Some("shutdown"));
    }

    #[test]
    fn notification_serializes_with_kind_tag() {
        let drift = Notification::PositionDrift(PositionDrift {
            instrument_id: InstrumentId::new("LKOH"),
            ledger_quantity: Decimal::ONE,
            broker_quantity: Decimal::TWO,
        });
        let json = serde_json::to_value(&drift).unwrap();
        assert_eq!(json["kind"], "position_drift");
        assert_eq!(drift.kind(), "position_drift");
    }
}
