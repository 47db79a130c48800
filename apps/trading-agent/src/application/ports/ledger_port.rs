//! Ledger Port (Driven Port)
//!
//! Durable source of truth for the account, positions, orders and run
//! history. Positions change only through [`LedgerPort::record_terminal`],
//! which writes an order's terminal state and its position delta as one
//! atomic unit.

use std::collections::HashMap;

use async_trait::async_trait;

use crate::domain::order_execution::Order;
use crate::domain::portfolio::{Account, Position, PositionDelta};
use crate::domain::risk_management::DailyActivity;
use crate::domain::run_history::RunRecord;
use crate::domain::shared::{AccountId, InstrumentId, Timestamp};

/// Consistent read of everything a cycle sizes against.
#[derive(Debug, Clone)]
pub struct LedgerSnapshot {
    /// Account configuration.
    pub account: Account,
    /// Positions by instrument. Flat instruments may be absent.
    pub positions: HashMap<InstrumentId, Position>,
    /// Orders not yet terminal in the ledger.
    pub open_orders: Vec<Order>,
    /// Account kill switch; no order is issued while false.
    pub trading_enabled: bool,
}

impl LedgerSnapshot {
    /// Position for an instrument, if any.
    #[must_use]
    pub fn position(&self, instrument_id: &InstrumentId) -> Option<&Position> {
        self.positions.get(instrument_id)
    }

    /// Instruments holding a non-flat position.
    #[must_use]
    pub fn open_position_count(&self) -> usize {
        self.positions.values().filter(|p| !p.is_flat()).count()
    }
}

/// Position together with its optimistic-concurrency version.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VersionedPosition {
    /// Current position (flat if never traded).
    pub position: Position,
    /// Version observed; bumped on every write.
    pub version: u64,
}

/// Terminal order write with the position change it implies.
#[derive(Debug, Clone)]
pub struct TerminalWrite {
    /// Order in its terminal state.
    pub order: Order,
    /// Position change confirmed by the order's fill.
    pub delta: Option<PositionDelta>,
    /// Position version the delta was computed against.
    pub expected_version: u64,
}

/// Result of a terminal write.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TerminalWriteOutcome {
    /// Order state and position written.
    Applied {
        /// Position after the write.
        position: Position,
        /// New position version.
        version: u64,
    },
    /// The order was already terminal in the ledger; nothing changed.
    AlreadyRecorded,
}

/// Ledger errors.
#[derive(Debug, Clone, thiserror::Error)]
pub enum LedgerError {
    /// Store could not be reached.
    #[error("Ledger unavailable: {message}")]
    Unavailable {
        /// Error details.
        message: String,
    },

    /// Position changed since it was read.
    #[error("Ledger write conflict on {instrument_id}: expected version {expected}, found {actual}")]
    WriteConflict {
        /// Instrument whose position moved.
        instrument_id: String,
        /// Version the writer expected.
        expected: u64,
        /// Version in the store.
        actual: u64,
    },

    /// Account has never been stored.
    #[error("Account not found in ledger: {account_id}")]
    AccountNotFound {
        /// Missing account.
        account_id: String,
    },

    /// Write refused because the order's state does not allow it.
    #[error("Invalid order state for {order_id}: {message}")]
    InvalidOrderState {
        /// Order concerned.
        order_id: String,
        /// Details.
        message: String,
    },

    /// Stored data could not be decoded.
    #[error("Ledger data integrity error: {0}")]
    Integrity(String),
}

impl LedgerError {
    /// Returns true for an optimistic-concurrency conflict.
    #[must_use]
    pub const fn is_conflict(&self) -> bool {
        matches!(self, Self::WriteConflict { .. })
    }
}

/// Port for ledger interactions.
#[async_trait]
pub trait LedgerPort: Send + Sync {
    /// Create or replace the account configuration.
    ///
    /// Leaves the account's kill switch as stored; new accounts start enabled.
    async fn upsert_account(&self, account: &Account) -> Result<(), LedgerError>;

    /// Flip the account's kill switch.
    async fn set_trading_enabled(
        &self,
        account_id: &AccountId,
        enabled: bool,
    ) -> Result<(), LedgerError>;

    /// Account, positions and open orders, read together.
    async fn snapshot(&self, account_id: &AccountId) -> Result<LedgerSnapshot, LedgerError>;

    /// Current position and version for one instrument.
    async fn position(&self, instrument_id: &InstrumentId)
    -> Result<VersionedPosition, LedgerError>;

    /// Persist non-terminal order progress. Never overwrites a terminal order.
    async fn save_order(&self, order: &Order) -> Result<(), LedgerError>;

    /// Atomically record an order's terminal state and apply its delta.
    ///
    /// Idempotent by order id; fails with `WriteConflict` if the position
    /// version moved.
    async fn record_terminal(&self, write: TerminalWrite)
    -> Result<TerminalWriteOutcome, LedgerError>;

    /// Orders issued since `since` that are open or traded, and the profit
    /// realized by terminal writes since then.
    async fn daily_activity(&self, since: Timestamp) -> Result<DailyActivity, LedgerError>;

    /// Persist a newly opened run.
    async fn open_run(&self, record: &RunRecord) -> Result<(), LedgerError>;

    /// Persist a closed run.
    async fn close_run(&self, record: &RunRecord) -> Result<(), LedgerError>;
}
