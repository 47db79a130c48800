//! In-memory ledger.
//!
//! Used for paper trading and tests. Every write takes the single state
//! lock, so a terminal write and its position delta are applied together.
//! Failure hooks let tests simulate conflicts and outages.

use std::collections::{HashMap, HashSet};

use async_trait::async_trait;
use parking_lot::RwLock;
use rust_decimal::Decimal;

use crate::application::ports::{
    LedgerError, LedgerPort, LedgerSnapshot, TerminalWrite, TerminalWriteOutcome,
    VersionedPosition,
};
use crate::domain::order_execution::Order;
use crate::domain::portfolio::{Account, Position};
use crate::domain::risk_management::DailyActivity;
use crate::domain::run_history::RunRecord;
use crate::domain::shared::{AccountId, InstrumentId, OrderId, RunId, Timestamp};

#[derive(Debug, Clone)]
struct StoredPosition {
    position: Position,
    version: u64,
    mutations: u32,
}

#[derive(Debug, Default)]
struct LedgerState {
    accounts: HashMap<AccountId, Account>,
    trading_disabled: HashSet<AccountId>,
    positions: HashMap<InstrumentId, StoredPosition>,
    orders: HashMap<OrderId, Order>,
    realized_pnl: HashMap<OrderId, Decimal>,
    runs: Vec<RunRecord>,
    injected_conflicts: HashMap<InstrumentId, u32>,
    unavailable: bool,
    reject_terminal_writes: bool,
}

impl LedgerState {
    fn ensure_available(&self) -> Result<(), LedgerError> {
        if self.unavailable {
            return Err(LedgerError::Unavailable {
                message: "in-memory ledger marked unavailable".to_string(),
            });
        }
        Ok(())
    }

    fn upsert_run(&mut self, record: &RunRecord) {
        match self.runs.iter_mut().find(|r| r.id() == record.id()) {
            Some(existing) => *existing = record.clone(),
            None => self.runs.push(record.clone()),
        }
    }
}

/// In-memory implementation of [`LedgerPort`].
#[derive(Debug, Default)]
pub struct InMemoryLedger {
    state: RwLock<LedgerState>,
}

impl InMemoryLedger {
    /// Create an empty ledger.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a ledger holding `account`.
    #[must_use]
    pub fn with_account(account: Account) -> Self {
        let ledger = Self::new();
        ledger
            .state
            .write()
            .accounts
            .insert(account.id().clone(), account);
        ledger
    }

    // ========================================================================
    // Test setup
    // ========================================================================

    /// Seed a position at version 0.
    pub fn seed_position(&self, position: Position) {
        self.state.write().positions.insert(
            position.instrument_id.clone(),
            StoredPosition {
                position,
                version: 0,
                mutations: 0,
            },
        );
    }

    /// Seed an order as if an earlier process had written it.
    pub fn seed_order(&self, order: Order) {
        self.state.write().orders.insert(order.id().clone(), order);
    }

    /// Make the next `count` terminal writes on `instrument_id` conflict.
    pub fn inject_conflicts(&self, instrument_id: &InstrumentId, count: u32) {
        self.state
            .write()
            .injected_conflicts
            .insert(instrument_id.clone(), count);
    }

    /// Fail every call as if the store were unreachable.
    pub fn set_unavailable(&self, unavailable: bool) {
        self.state.write().unavailable = unavailable;
    }

    /// Fail terminal writes only.
    pub fn set_reject_terminal_writes(&self, reject: bool) {
        self.state.write().reject_terminal_writes = reject;
    }

    // ========================================================================
    // Inspection
    // ========================================================================

    /// Stored order.
    #[must_use]
    pub fn order(&self, order_id: &OrderId) -> Option<Order> {
        self.state.read().orders.get(order_id).cloned()
    }

    /// All stored orders for an instrument.
    #[must_use]
    pub fn orders_for(&self, instrument_id: &InstrumentId) -> Vec<Order> {
        let mut orders: Vec<Order> = self
            .state
            .read()
            .orders
            .values()
            .filter(|o| o.instrument_id() == instrument_id)
            .cloned()
            .collect();
        orders.sort_by_key(Order::created_at);
        orders
    }

    /// Stored position, if the instrument was ever traded or seeded.
    #[must_use]
    pub fn stored_position(&self, instrument_id: &InstrumentId) -> Option<Position> {
        self.state
            .read()
            .positions
            .get(instrument_id)
            .map(|stored| stored.position.clone())
    }

    /// Profit realized by an order's terminal write.
    #[must_use]
    pub fn realized_pnl(&self, order_id: &OrderId) -> Option<Decimal> {
        self.state.read().realized_pnl.get(order_id).copied()
    }

    /// Number of times a position was changed by a terminal write.
    #[must_use]
    pub fn position_mutations(&self, instrument_id: &InstrumentId) -> u32 {
        self.state
            .read()
            .positions
            .get(instrument_id)
            .map_or(0, |stored| stored.mutations)
    }

    /// Stored run record.
    #[must_use]
    pub fn run(&self, run_id: &RunId) -> Option<RunRecord> {
        self.state.read().runs.iter().find(|r| r.id() == run_id).cloned()
    }

    /// All run records in open order.
    #[must_use]
    pub fn runs(&self) -> Vec<RunRecord> {
        self.state.read().runs.clone()
    }
}

#[async_trait]
impl LedgerPort for InMemoryLedger {
    async fn upsert_account(&self, account: &Account) -> Result<(), LedgerError> {
        let mut state = self.state.write();
        state.ensure_available()?;
        state.accounts.insert(account.id().clone(), account.clone());
        Ok(())
    }

    async fn set_trading_enabled(
        &self,
        account_id: &AccountId,
        enabled: bool,
    ) -> Result<(), LedgerError> {
        let mut state = self.state.write();
        state.ensure_available()?;
        if !state.accounts.contains_key(account_id) {
            return Err(LedgerError::AccountNotFound {
                account_id: account_id.to_string(),
            });
        }
        if enabled {
            state.trading_disabled.remove(account_id);
        } else {
            state.trading_disabled.insert(account_id.clone());
        }
        Ok(())
    }

    async fn snapshot(&self, account_id: &AccountId) -> Result<LedgerSnapshot, LedgerError> {
        let state = self.state.read();
        state.ensure_available()?;

        let account = state
            .accounts
            .get(account_id)
            .cloned()
            .ok_or_else(|| LedgerError::AccountNotFound {
                account_id: account_id.to_string(),
            })?;

        let positions = state
            .positions
            .iter()
            .filter(|(_, stored)| !stored.position.is_flat())
            .map(|(id, stored)| (id.clone(), stored.position.clone()))
            .collect();

        let mut open_orders: Vec<Order> = state
            .orders
            .values()
            .filter(|o| !o.is_terminal())
            .cloned()
            .collect();
        open_orders.sort_by_key(Order::created_at);

        Ok(LedgerSnapshot {
            trading_enabled: !state.trading_disabled.contains(account_id),
            account,
            positions,
            open_orders,
        })
    }

    async fn position(
        &self,
        instrument_id: &InstrumentId,
    ) -> Result<VersionedPosition, LedgerError> {
        let state = self.state.read();
        state.ensure_available()?;

        Ok(state.positions.get(instrument_id).map_or_else(
            || VersionedPosition {
                position: Position::flat(instrument_id.clone()),
                version: 0,
            },
            |stored| VersionedPosition {
                position: stored.position.clone(),
                version: stored.version,
            },
        ))
    }

    async fn save_order(&self, order: &Order) -> Result<(), LedgerError> {
        let mut state = self.state.write();
        state.ensure_available()?;

        if order.is_terminal() {
            return Err(LedgerError::InvalidOrderState {
                order_id: order.id().to_string(),
                message: "terminal orders are written with record_terminal".to_string(),
            });
        }
        if state.orders.get(order.id()).is_some_and(Order::is_terminal) {
            return Err(LedgerError::InvalidOrderState {
                order_id: order.id().to_string(),
                message: "order already terminal".to_string(),
            });
        }

        state.orders.insert(order.id().clone(), order.clone());
        Ok(())
    }

    async fn record_terminal(
        &self,
        write: TerminalWrite,
    ) -> Result<TerminalWriteOutcome, LedgerError> {
        let mut state = self.state.write();
        state.ensure_available()?;

        let order = write.order;
        if state.reject_terminal_writes {
            return Err(LedgerError::Unavailable {
                message: "terminal writes rejected".to_string(),
            });
        }
        if !order.is_terminal() {
            return Err(LedgerError::InvalidOrderState {
                order_id: order.id().to_string(),
                message: format!("status {} is not terminal", order.status()),
            });
        }
        if state.orders.get(order.id()).is_some_and(Order::is_terminal) {
            return Ok(TerminalWriteOutcome::AlreadyRecorded);
        }

        let instrument_id = order.instrument_id().clone();
        let (current, version) = state.positions.get(&instrument_id).map_or_else(
            || (Position::flat(instrument_id.clone()), 0),
            |stored| (stored.position.clone(), stored.version),
        );

        if let Some(remaining) = state.injected_conflicts.get_mut(&instrument_id) {
            if *remaining > 0 {
                *remaining -= 1;
                return Err(LedgerError::WriteConflict {
                    instrument_id: instrument_id.to_string(),
                    expected: write.expected_version,
                    actual: version + 1,
                });
            }
        }

        if version != write.expected_version {
            return Err(LedgerError::WriteConflict {
                instrument_id: instrument_id.to_string(),
                expected: write.expected_version,
                actual: version,
            });
        }

        let realized = write
            .delta
            .as_ref()
            .map_or(Decimal::ZERO, |delta| current.realized_pnl(delta));

        let (position, version) = match &write.delta {
            Some(delta) => {
                let next = current.apply(delta);
                let stored = state
                    .positions
                    .entry(instrument_id)
                    .or_insert_with_key(|id| StoredPosition {
                        position: Position::flat(id.clone()),
                        version: 0,
                        mutations: 0,
                    });
                stored.position = next.clone();
                stored.version += 1;
                stored.mutations += 1;
                (next, stored.version)
            }
            None => (current, version),
        };

        state.realized_pnl.insert(order.id().clone(), realized);
        state.orders.insert(order.id().clone(), order);
        Ok(TerminalWriteOutcome::Applied { position, version })
    }

    async fn daily_activity(&self, since: Timestamp) -> Result<DailyActivity, LedgerError> {
        let state = self.state.read();
        state.ensure_available()?;

        let trades = state
            .orders
            .values()
            .filter(|o| o.created_at() >= since)
            .filter(|o| !o.is_terminal() || o.filled_quantity() > Decimal::ZERO)
            .count();
        let realized_pnl = state
            .orders
            .values()
            .filter(|o| o.terminal_at().is_some_and(|at| at >= since))
            .filter_map(|o| state.realized_pnl.get(o.id()))
            .sum();

        Ok(DailyActivity {
            trades: u32::try_from(trades).unwrap_or(u32::MAX),
            realized_pnl,
        })
    }

    async fn open_run(&self, record: &RunRecord) -> Result<(), LedgerError> {
        let mut state = self.state.write();
        state.ensure_available()?;
        state.upsert_run(record);
        Ok(())
    }

    async fn close_run(&self, record: &RunRecord) -> Result<(), LedgerError> {
        let mut state = self.state.write();
        state.ensure_available()?;
        state.upsert_run(record);
        Ok(())
    }
}
