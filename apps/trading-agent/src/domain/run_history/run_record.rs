//! Run record aggregate.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::domain::shared::{DomainError, OrderId, RunId, Timestamp};

/// How a cycle ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum RunOutcome {
    /// Every order issued by the cycle reached a terminal status in time.
    Completed,
    /// Some orders were still open at the cycle deadline.
    PartiallyCompleted,
    /// Interrupted by shutdown or a cycle-level failure.
    Aborted,
}

impl RunOutcome {
    /// Stable storage and metrics label.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Completed => "COMPLETED",
            Self::PartiallyCompleted => "PARTIALLY_COMPLETED",
            Self::Aborted => "ABORTED",
        }
    }
}

impl fmt::Display for RunOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for RunOutcome {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "COMPLETED" => Ok(Self::Completed),
            "PARTIALLY_COMPLETED" => Ok(Self::PartiallyCompleted),
            "ABORTED" => Ok(Self::Aborted),
            other => Err(format!("unknown run outcome: {other}")),
        }
    }
}

/// Record of one evaluation cycle.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RunRecord {
    id: RunId,
    started_at: Timestamp,
    ended_at: Option<Timestamp>,
    decisions: Vec<OrderId>,
    outcome: Option<RunOutcome>,
    carryover: Vec<OrderId>,
    abort_reason: Option<String>,
}

impl RunRecord {
    /// Open a new record starting now.
    #[must_use]
    pub fn open() -> Self {
        Self {
            id: RunId::generate(),
            started_at: Timestamp::now(),
            ended_at: None,
            decisions: Vec::new(),
            outcome: None,
            carryover: Vec::new(),
            abort_reason: None,
        }
    }

    /// Run identifier.
    #[must_use]
    pub const fn id(&self) -> &RunId {
        &self.id
    }

    /// Cycle start.
    #[must_use]
    pub const fn started_at(&self) -> Timestamp {
        self.started_at
    }

    /// Cycle end, once closed.
    #[must_use]
    pub const fn ended_at(&self) -> Option<Timestamp> {
        self.ended_at
    }

    /// Orders issued by the cycle, in issue order.
    #[must_use]
    pub fn decisions(&self) -> &[OrderId] {
        &self.decisions
    }

    /// Outcome, once closed.
    #[must_use]
    pub const fn outcome(&self) -> Option<RunOutcome> {
        self.outcome
    }

    /// Orders left open when the cycle closed.
    #[must_use]
    pub fn carryover(&self) -> &[OrderId] {
        &self.carryover
    }

    /// Why the cycle aborted, if it did.
    #[must_use]
    pub fn abort_reason(&self) -> Option<&str> {
        self.abort_reason.as_deref()
    }

    /// Returns true once the record has been closed.
    #[must_use]
    pub const fn is_closed(&self) -> bool {
        self.outcome.is_some()
    }

    /// Append an issued order.
    pub fn record_decision(&mut self, order_id: OrderId) {
        self.decisions.push(order_id);
    }

    /// Close the record.
    ///
    /// # Errors
    ///
    /// Returns error if the record is already closed.
    pub fn close(
        &mut self,
        outcome: RunOutcome,
        carryover: Vec<OrderId>,
        abort_reason: Option<String>,
    ) -> Result<(), DomainError> {
        if let Some(existing) = self.outcome {
            return Err(DomainError::InvariantViolation {
                aggregate: "RunRecord".to_string(),
                invariant: "closed exactly once".to_string(),
                state: format!("already closed as {existing}"),
            });
        }
        self.outcome = Some(outcome);
        self.ended_at = Some(Timestamp::now());
        self.carryover = carryover;
        self.abort_reason = abort_reason;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn record_closes_once() {
        let mut record = RunRecord::open();
        record.record_decision(OrderId::new("a"));
        record.record_decision(OrderId::new("b"));
        assert!(!record.is_closed());

        record
            .close(RunOutcome::PartiallyCompleted, vec![OrderId::new("b")], None)
            .unwrap();
        assert_eq!(record.outcome(), Some(RunOutcome::PartiallyCompleted));
        assert_eq!(record.decisions(), &[OrderId::new("a"), OrderId::new("b")]);
        assert_eq!(record.carryover(), &[OrderId::new("b")]);
        assert!(record.ended_at().unwrap() >= record.started_at());

        assert!(record.close(RunOutcome::Completed, vec![], None).is_err());
        assert_eq!(record.outcome(), Some(RunOutcome::PartiallyCompleted));
    }

    #[test]
    fn outcome_labels_parse() {
        for outcome in [
            RunOutcome::Completed,
            RunOutcome::PartiallyCompleted,
            RunOutcome::Aborted,
        ] {
            assert_eq!(outcome.as_str().parse::<RunOutcome>().unwrap(), outcome);
        }
    }
}
