//! Application Ports (Driven)
//!
//! Interfaces for the external systems the agent depends on.

mod broker_port;
mod ledger_port;
mod notification_port;
mod signal_port;

pub use broker_port::{BrokerError, BrokerPort, SubmitAck, SubmitOrderRequest};
pub use ledger_port::{
    LedgerError, LedgerPort, LedgerSnapshot, TerminalWrite, TerminalWriteOutcome,
    VersionedPosition,
};
pub use notification_port::{
    Notification, NotificationError, NotificationPort, OrderFailure,
    PositionDrift, RunSummary,
};
pub use signal_port::{SignalError, SignalPort, TrackedInstrument};
