//! Broker-side view of an order.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use super::OrderStatus;
use crate::domain::shared::OrderId;

/// Order state as reported by the broker on query.
///
/// `status` is `Submitted` while the order is still working. A broker reports
/// `PartiallyFilled` only once the order has stopped working.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExecutionReport {
    /// Agent order id the report refers to.
    pub order_id: OrderId,
    /// Broker status.
    pub status: OrderStatus,
    /// Cumulative filled quantity.
    pub filled_quantity: Decimal,
    /// Average price of the filled quantity.
    pub average_fill_price: Option<Decimal>,
    /// Broker-supplied explanation (rejections, cancels).
    pub reason: Option<String>,
}

impl ExecutionReport {
    /// Report for an order still working at the broker.
    #[must_use]
    pub const fn working(order_id: OrderId) -> Self {
        Self {
            order_id,
            status: OrderStatus::Submitted,
            filled_quantity: Decimal::ZERO,
            average_fill_price: None,
            reason: None,
        }
    }

    /// Report for a complete fill.
    #[must_use]
    pub const fn filled(order_id: OrderId, quantity: Decimal, price: Decimal) -> Self {
        Self {
            order_id,
            status: OrderStatus::Filled,
            filled_quantity: quantity,
            average_fill_price: Some(price),
            reason: None,
        }
    }

    /// Report for an order that stopped working with a partial fill.
    #[must_use]
    pub const fn partially_filled(order_id: OrderId, quantity: Decimal, price: Decimal) -> Self {
        Self {
            order_id,
            status: OrderStatus::PartiallyFilled,
            filled_quantity: quantity,
            average_fill_price: Some(price),
            reason: None,
        }
    }

    /// Report for a cancelled order.
    #[must_use]
    pub fn cancelled(order_id: OrderId, reason: impl Into<String>) -> Self {
        Self {
            order_id,
            status: OrderStatus::Cancelled,
            filled_quantity: Decimal::ZERO,
            average_fill_price: None,
            reason: Some(reason.into()),
        }
    }

    /// Report for a broker rejection.
    #[must_use]
    pub fn rejected(order_id: OrderId, reason: impl Into<String>) -> Self {
        Self {
            order_id,
            status: OrderStatus::Rejected,
            filled_quantity: Decimal::ZERO,
            average_fill_price: None,
            reason: Some(reason.into()),
        }
    }

    /// Returns true if the broker has stopped working the order.
    #[must_use]
    pub const fn is_final(&self) -> bool {
        self.status.is_terminal()
    }
}
