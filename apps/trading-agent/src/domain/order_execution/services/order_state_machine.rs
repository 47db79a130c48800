//! Order State Machine Service
//!
//! Validates order status transitions.

use crate::domain::order_execution::errors::OrderError;
use crate::domain::order_execution::value_objects::OrderStatus;

/// Order State Machine for validating transitions.
///
/// Terminal statuses have no outgoing transitions, which is what makes the
/// terminal transition happen exactly once.
pub struct OrderStateMachine;

impl OrderStateMachine {
    /// Check if a state transition is valid.
    #[must_use]
    pub const fn is_valid_transition(from: OrderStatus, to: OrderStatus) -> bool {
        matches!(
            (from, to),
            // From Pending
            (OrderStatus::Pending, OrderStatus::Submitted)
                | (OrderStatus::Pending, OrderStatus::Rejected)
                | (OrderStatus::Pending, OrderStatus::Failed)
                // From Submitted
                | (OrderStatus::Submitted, OrderStatus::Filled)
                | (OrderStatus::Submitted, OrderStatus::PartiallyFilled)
                | (OrderStatus::Submitted, OrderStatus::Rejected)
                | (OrderStatus::Submitted, OrderStatus::Cancelled)
        )
    }

    /// Validate a state transition.
    ///
    /// # Errors
    ///
    /// Returns error if the transition is invalid.
    pub fn validate_transition(from: OrderStatus, to: OrderStatus) -> Result<(), OrderError> {
        if Self::is_valid_transition(from, to) {
            Ok(())
        } else {
            Err(OrderError::InvalidStateTransition {
                from,
                to,
                reason: Self::transition_error_reason(from, to),
            })
        }
    }

    /// Get a human-readable reason for an invalid transition.
    #[must_use]
    pub fn transition_error_reason(from: OrderStatus, to: OrderStatus) -> String {
        if from.is_terminal() {
            format!("Order is already {from}, cannot transition to {to}")
        } else if from == OrderStatus::Submitted && to == OrderStatus::Failed {
            "Accepted orders are never failed by the agent".to_string()
        } else {
            format!("Invalid transition from {from} to {to}")
        }
    }

    /// Get all valid next states from a given state.
    #[must_use]
    pub fn valid_next_states(from: OrderStatus) -> Vec<OrderStatus> {
        OrderStatus::ALL
            .into_iter()
            .filter(|to| Self::is_valid_transition(from, *to))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn pending_transitions() {
        assert_eq!(
            OrderStateMachine::valid_next_states(OrderStatus::Pending),
            vec![
                OrderStatus::Submitted,
                OrderStatus::Rejected,
                OrderStatus::Failed
            ]
        );
    }

    #[test]
    fn submitted_transitions() {
        let next = OrderStateMachine::valid_next_states(OrderStatus::Submitted);
        assert_eq!(next.len(), 4);
        assert!(!next.contains(&OrderStatus::Failed));
        assert!(!next.contains(&OrderStatus::Pending));
    }

    #[test]
    fn terminal_states_have_no_exit() {
        for status in OrderStatus::ALL.into_iter().filter(OrderStatus::is_terminal) {
            assert!(OrderStateMachine::valid_next_states(status).is_empty());
        }
    }

    #[test]
    fn submitted_to_failed_is_refused() {
        let err = OrderStateMachine::validate_transition(OrderStatus::Submitted, OrderStatus::Failed)
            .unwrap_err();
        assert!(err.to_string().contains("never failed"));
    }

    #[test]
    fn pending_cannot_fill_directly() {
        assert!(!OrderStateMachine::is_valid_transition(
            OrderStatus::Pending,
            OrderStatus::Filled
        ));
    }
}
