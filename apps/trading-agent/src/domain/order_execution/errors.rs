//! Order execution errors.

use std::fmt;

use super::value_objects::OrderStatus;

/// Errors that can occur in order execution.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OrderError {
    /// Invalid state transition attempted.
    InvalidStateTransition {
        /// Current order status.
        from: OrderStatus,
        /// Attempted status.
        to: OrderStatus,
        /// Reason for failure.
        reason: String,
    },

    /// Reported fill is larger than the order.
    FillExceedsQuantity {
        /// Reported cumulative fill.
        filled: String,
        /// Order quantity.
        quantity: String,
    },

    /// Invalid order parameters.
    InvalidParameters {
        /// Field with invalid value.
        field: String,
        /// Error message.
        message: String,
    },
}

impl fmt::Display for OrderError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::InvalidStateTransition { from, to, reason } => {
                write!(
                    f,
                    "Invalid order state transition: {from} -> {to}: {reason}"
                )
            }
            Self::FillExceedsQuantity { filled, quantity } => {
                write!(f, "Reported fill {filled} exceeds order quantity {quantity}")
            }
            Self::InvalidParameters { field, message } => {
                write!(f, "Invalid order parameter '{field}': {message}")
            }
        }
    }
}

impl std::error::Error for OrderError {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn invalid_transition_display() {
        let err = OrderError::InvalidStateTransition {
            from: OrderStatus::Filled,
            to: OrderStatus::Cancelled,
            reason: "already terminal".to_string(),
        };
        let msg = err.to_string();
        assert!(msg.contains("FILLED"));
        assert!(msg.contains("CANCELLED"));
    }

    #[test]
    fn fill_exceeds_display() {
        let err = OrderError::FillExceedsQuantity {
            filled: "120".to_string(),
            quantity: "100".to_string(),
        };
        assert!(err.to_string().contains("120"));
    }
}
