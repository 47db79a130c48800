//! Order Aggregate Root
//!
//! An Order is created `Pending` with an id generated before any broker call,
//! is driven through its lifecycle by broker responses, and reaches a
//! terminal status exactly once.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::domain::order_execution::errors::OrderError;
use crate::domain::order_execution::services::OrderStateMachine;
use crate::domain::order_execution::value_objects::{ExecutionReport, OrderSide, OrderStatus};
use crate::domain::portfolio::PositionDelta;
use crate::domain::shared::{InstrumentId, OrderId, Quantity, RunId, Timestamp};

/// Command to create a new order.
#[derive(Debug, Clone)]
pub struct CreateOrderCommand {
    /// Cycle that produced the decision.
    pub run_id: RunId,
    /// Instrument to trade.
    pub instrument_id: InstrumentId,
    /// Order side.
    pub side: OrderSide,
    /// Quantity to trade.
    pub quantity: Quantity,
    /// Price the decision was sized at.
    pub reference_price: Decimal,
}

/// Parameters for reconstituting an Order from storage.
#[derive(Debug, Clone)]
pub struct ReconstitutedOrderParams {
    /// Order identifier.
    pub id: OrderId,
    /// Cycle that produced the order.
    pub run_id: RunId,
    /// Instrument traded.
    pub instrument_id: InstrumentId,
    /// Order side.
    pub side: OrderSide,
    /// Total quantity.
    pub quantity: Quantity,
    /// Decision price.
    pub reference_price: Decimal,
    /// Current status.
    pub status: OrderStatus,
    /// Submission attempts made so far.
    pub submit_attempts: u32,
    /// Cumulative fill.
    pub filled_quantity: Decimal,
    /// Average fill price.
    pub average_fill_price: Option<Decimal>,
    /// Last status explanation.
    pub status_reason: Option<String>,
    /// Creation timestamp.
    pub created_at: Timestamp,
    /// Last update timestamp.
    pub updated_at: Timestamp,
    /// Terminal timestamp.
    pub terminal_at: Option<Timestamp>,
}

/// Order Aggregate Root.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Order {
    id: OrderId,
    run_id: RunId,
    instrument_id: InstrumentId,
    side: OrderSide,
    quantity: Quantity,
    reference_price: Decimal,
    status: OrderStatus,
    submit_attempts: u32,
    filled_quantity: Decimal,
    average_fill_price: Option<Decimal>,
    status_reason: Option<String>,
    created_at: Timestamp,
    updated_at: Timestamp,
    terminal_at: Option<Timestamp>,
}

impl Order {
    /// Create a new `Pending` order with a freshly generated id.
    ///
    /// # Errors
    ///
    /// Returns error if the quantity is not positive.
    pub fn new(cmd: CreateOrderCommand) -> Result<Self, OrderError> {
        cmd.quantity
            .validate_for_order()
            .map_err(|e| OrderError::InvalidParameters {
                field: "quantity".to_string(),
                message: e.to_string(),
            })?;

        let now = Timestamp::now();
        Ok(Self {
            id: OrderId::generate(),
            run_id: cmd.run_id,
            instrument_id: cmd.instrument_id,
            side: cmd.side,
            quantity: cmd.quantity,
            reference_price: cmd.reference_price,
            status: OrderStatus::Pending,
            submit_attempts: 0,
            filled_quantity: Decimal::ZERO,
            average_fill_price: None,
            status_reason: None,
            created_at: now,
            updated_at: now,
            terminal_at: None,
        })
    }

    /// Rebuild an order from persisted state.
    #[must_use]
    pub fn reconstitute(params: ReconstitutedOrderParams) -> Self {
        Self {
            id: params.id,
            run_id: params.run_id,
            instrument_id: params.instrument_id,
            side: params.side,
            quantity: params.quantity,
            reference_price: params.reference_price,
            status: params.status,
            submit_attempts: params.submit_attempts,
            filled_quantity: params.filled_quantity,
            average_fill_price: params.average_fill_price,
            status_reason: params.status_reason,
            created_at: params.created_at,
            updated_at: params.updated_at,
            terminal_at: params.terminal_at,
        }
    }

    // ========================================================================
    // Getters
    // ========================================================================

    /// Order id (the idempotency key).
    #[must_use]
    pub const fn id(&self) -> &OrderId {
        &self.id
    }

    /// Cycle that produced the order.
    #[must_use]
    pub const fn run_id(&self) -> &RunId {
        &self.run_id
    }

    /// Instrument traded.
    #[must_use]
    pub const fn instrument_id(&self) -> &InstrumentId {
        &self.instrument_id
    }

    /// Order side.
    #[must_use]
    pub const fn side(&self) -> OrderSide {
        self.side
    }

    /// Ordered quantity.
    #[must_use]
    pub const fn quantity(&self) -> Quantity {
        self.quantity
    }

    /// Price the decision was sized at.
    #[must_use]
    pub const fn reference_price(&self) -> Decimal {
        self.reference_price
    }

    /// Current status.
    #[must_use]
    pub const fn status(&self) -> OrderStatus {
        self.status
    }

    /// Number of submission attempts made.
    #[must_use]
    pub const fn submit_attempts(&self) -> u32 {
        self.submit_attempts
    }

    /// Cumulative filled quantity.
    #[must_use]
    pub const fn filled_quantity(&self) -> Decimal {
        self.filled_quantity
    }

    /// Average fill price.
    #[must_use]
    pub const fn average_fill_price(&self) -> Option<Decimal> {
        self.average_fill_price
    }

    /// Last status explanation.
    #[must_use]
    pub fn status_reason(&self) -> Option<&str> {
        self.status_reason.as_deref()
    }

    /// Creation timestamp.
    #[must_use]
    pub const fn created_at(&self) -> Timestamp {
        self.created_at
    }

    /// Last update timestamp.
    #[must_use]
    pub const fn updated_at(&self) -> Timestamp {
        self.updated_at
    }

    /// Terminal timestamp, set once.
    #[must_use]
    pub const fn terminal_at(&self) -> Option<Timestamp> {
        self.terminal_at
    }

    /// Returns true if the order reached a terminal status.
    #[must_use]
    pub const fn is_terminal(&self) -> bool {
        self.status.is_terminal()
    }

    // ========================================================================
    // Lifecycle
    // ========================================================================

    /// Count one submission attempt and return the new total.
    pub const fn record_submit_attempt(&mut self) -> u32 {
        self.submit_attempts += 1;
        self.submit_attempts
    }

    /// Broker accepted the order.
    ///
    /// # Errors
    ///
    /// Returns error unless the order is `Pending`.
    pub fn mark_submitted(&mut self) -> Result<(), OrderError> {
        self.transition(OrderStatus::Submitted, None)
    }

    /// Broker refused the order.
    ///
    /// # Errors
    ///
    /// Returns error if the order is already terminal.
    pub fn reject(&mut self, reason: impl Into<String>) -> Result<(), OrderError> {
        self.transition(OrderStatus::Rejected, Some(reason.into()))
    }

    /// Submission never got a definitive answer within the retry budget.
    ///
    /// # Errors
    ///
    /// Returns error unless the order is `Pending`.
    pub fn fail(&mut self, reason: impl Into<String>) -> Result<(), OrderError> {
        self.transition(OrderStatus::Failed, Some(reason.into()))
    }

    /// Fold a broker report into the order.
    ///
    /// Returns `true` when this call moved the order to a terminal status.
    /// A report repeating the current terminal status is accepted and ignored.
    /// A cancel with a non-zero fill is recorded as `PartiallyFilled`.
    ///
    /// # Errors
    ///
    /// Returns error if the report contradicts the order's state.
    pub fn apply_report(&mut self, report: &ExecutionReport) -> Result<bool, OrderError> {
        let target = match report.status {
            OrderStatus::Pending => return Ok(false),
            OrderStatus::Cancelled if report.filled_quantity > Decimal::ZERO => {
                OrderStatus::PartiallyFilled
            }
            OrderStatus::Failed => OrderStatus::Rejected,
            other => other,
        };

        if self.status == target {
            return Ok(false);
        }

        if target == OrderStatus::Submitted {
            self.mark_submitted()?;
            return Ok(false);
        }

        // The broker knows the order, so it was accepted even if the ack was lost.
        if self.status == OrderStatus::Pending && target != OrderStatus::Rejected {
            self.mark_submitted()?;
        }

        self.record_fill(report, target)?;
        self.transition(target, report.reason.clone())?;
        Ok(true)
    }

    /// Position change implied by the order's confirmed fill.
    #[must_use]
    pub fn position_delta(&self) -> Option<PositionDelta> {
        let price = self.average_fill_price?;
        if self.filled_quantity <= Decimal::ZERO {
            return None;
        }
        Some(PositionDelta {
            instrument_id: self.instrument_id.clone(),
            quantity: self.side.signed(self.filled_quantity),
            price,
        })
    }

    fn record_fill(&mut self, report: &ExecutionReport, target: OrderStatus) -> Result<(), OrderError> {
        let quantity = self.quantity.amount();
        let filled = if target == OrderStatus::Filled && report.filled_quantity.is_zero() {
            quantity
        } else {
            report.filled_quantity
        };

        if filled > quantity {
            return Err(OrderError::FillExceedsQuantity {
                filled: filled.to_string(),
                quantity: quantity.to_string(),
            });
        }

        if filled > Decimal::ZERO && report.average_fill_price.is_none() {
            return Err(OrderError::InvalidParameters {
                field: "average_fill_price".to_string(),
                message: format!("fill of {filled} reported without a price"),
            });
        }

        self.filled_quantity = filled;
        self.average_fill_price = report.average_fill_price.filter(|_| filled > Decimal::ZERO);
        Ok(())
    }

    fn transition(&mut self, to: OrderStatus, reason: Option<String>) -> Result<(), OrderError> {
        OrderStateMachine::validate_transition(self.status, to)?;
        let now = Timestamp::now();
        self.status = to;
        self.updated_at = now;
        if reason.is_some() {
            self.status_reason = reason;
        }
        if to.is_terminal() {
            self.terminal_at = Some(now);
        }
        Ok(())
    }
}
