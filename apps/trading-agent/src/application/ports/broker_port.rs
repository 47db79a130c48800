//! Broker Port (Driven Port)
//!
//! Interface to the brokerage. Submission is idempotent by the agent's
//! order id: resubmitting an id the broker already holds returns the
//! original acknowledgement and never creates a second order.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::domain::order_execution::{ExecutionReport, Order, OrderSide};
use crate::domain::portfolio::Position;
use crate::domain::shared::{AccountId, InstrumentId, OrderId, Quantity};

/// Request to submit an order to the broker.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SubmitOrderRequest {
    /// Agent order id, used by the broker as the idempotency key.
    pub order_id: OrderId,
    /// Instrument to trade.
    pub instrument_id: InstrumentId,
    /// Order side.
    pub side: OrderSide,
    /// Quantity.
    pub quantity: Quantity,
}

impl SubmitOrderRequest {
    /// Build the request for an order. Every retry builds the same request.
    #[must_use]
    pub fn for_order(order: &Order) -> Self {
        Self {
            order_id: order.id().clone(),
            instrument_id: order.instrument_id().clone(),
            side: order.side(),
            quantity: order.quantity(),
        }
    }
}

/// Definitive broker answer to a submission.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum SubmitAck {
    /// Order accepted and working.
    Accepted,
    /// Order refused.
    Rejected {
        /// Rejection reason.
        reason: String,
    },
}

/// Broker port error.
///
/// None of these is a definitive answer about an order; see
/// [`BrokerError::is_retryable`].
#[derive(Debug, Clone, thiserror::Error)]
pub enum BrokerError {
    /// Call timed out without a response.
    #[error("Broker timeout during {operation}")]
    Timeout {
        /// Operation that timed out.
        operation: String,
    },

    /// Connection error.
    #[error("Broker connection error: {message}")]
    ConnectionError {
        /// Error details.
        message: String,
    },

    /// Rate limited.
    #[error("Rate limited by broker")]
    RateLimited,

    /// Broker has no record of the order.
    #[error("Order not found at broker: {order_id}")]
    OrderNotFound {
        /// The missing order ID.
        order_id: String,
    },

    /// Unknown error.
    #[error("Broker error: {message}")]
    Unknown {
        /// Error details.
        message: String,
    },
}

impl BrokerError {
    /// Transient failures worth retrying with the same order id.
    #[must_use]
    pub const fn is_retryable(&self) -> bool {
        matches!(
            self,
            Self::Timeout { .. } | Self::ConnectionError { .. } | Self::RateLimited
        )
    }
}

/// Port for broker interactions.
#[async_trait]
pub trait BrokerPort: Send + Sync {
    /// Submit an order. Idempotent by `request.order_id`.
    async fn submit_order(&self, request: SubmitOrderRequest) -> Result<SubmitAck, BrokerError>;

    /// Current broker view of an order.
    async fn query_order(&self, order_id: &OrderId) -> Result<ExecutionReport, BrokerError>;

    /// All positions held in the account.
    async fn positions(&self, account_id: &AccountId) -> Result<Vec<Position>, BrokerError>;
}
