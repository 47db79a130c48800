//! Execution Engine
//!
//! Drives each sized decision from a `Pending` order to a terminal status
//! recorded in the ledger:
//!
//! ```text
//! Pending ──submit──► Submitted ──poll──► Filled | PartiallyFilled | Rejected | Cancelled
//!    │
//!    ├──rejected──► Rejected
//!    └──retry budget spent──► Failed
//! ```
//!
//! Every order is driven by its own spawned task. The task owns the order
//! and publishes status changes through a watch channel handed back to the
//! caller as an [`OrderTicket`]. At most one order per instrument is open at
//! a time; the claim is taken before the order reaches the broker and
//! released after the terminal ledger write.

use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use std::time::{Duration, Instant};

use tokio::sync::{Mutex as AsyncMutex, watch};
use tokio::time::{self, MissedTickBehavior};
use tokio_util::sync::CancellationToken;
use tokio_util::task::TaskTracker;
use tracing::Instrument;

use super::open_order_table::OpenOrderTable;
use super::retry_policy::{BrokerRetryPolicy, ExponentialBackoffCalculator};
use crate::application::ports::{
    BrokerError, BrokerPort, LedgerError, LedgerPort, Notification, NotificationPort,
    OrderFailure, PositionDrift, SubmitAck, SubmitOrderRequest, TerminalWrite,
    TerminalWriteOutcome,
};
use crate::domain::order_execution::{
    CreateOrderCommand, ExecutionReport, Order, OrderError, OrderStatus,
};
use crate::domain::portfolio::Position;
use crate::domain::risk_management::TradeDecision;
use crate::domain::shared::{AccountId, InstrumentId, OrderId, RunId};
use crate::observability::metrics;

// ============================================================================
// Settings
// ============================================================================

/// Execution tuning.
#[derive(Debug, Clone)]
pub struct ExecutionSettings {
    /// Submission retry policy.
    pub retry: BrokerRetryPolicy,
    /// Upper bound on a single broker call.
    pub broker_timeout: Duration,
    /// Interval between status queries for a submitted order.
    pub status_poll_interval: Duration,
    /// Immediate retries after a ledger version conflict.
    pub ledger_conflict_retries: u32,
}

impl Default for ExecutionSettings {
    fn default() -> Self {
        Self {
            retry: BrokerRetryPolicy::default(),
            broker_timeout: Duration::from_secs(10),
            status_poll_interval: Duration::from_millis(500),
            ledger_conflict_retries: 5,
        }
    }
}

// ============================================================================
// Errors and results
// ============================================================================

/// Errors returned when handing a decision to the engine.
#[derive(Debug, thiserror::Error)]
pub enum ExecutionError {
    /// The instrument already has a non-terminal order.
    #[error("Instrument {instrument_id} already has open order {order_id}")]
    OpenOrderExists {
        /// Instrument concerned.
        instrument_id: String,
        /// Order holding the instrument.
        order_id: String,
    },

    /// New submissions are no longer admitted.
    #[error("Order admission stopped by shutdown")]
    ShutdownInterrupt,

    /// The order could not be built from the decision.
    #[error("Invalid order: {0}")]
    Order(#[from] OrderError),

    /// The pending order could not be persisted.
    #[error(transparent)]
    Ledger(#[from] LedgerError),
}

/// Handle to an order being driven by the engine.
#[derive(Debug)]
pub struct OrderTicket {
    order_id: OrderId,
    instrument_id: InstrumentId,
    status: watch::Receiver<OrderStatus>,
}

impl OrderTicket {
    /// Order identifier.
    #[must_use]
    pub const fn order_id(&self) -> &OrderId {
        &self.order_id
    }

    /// Instrument the order trades.
    #[must_use]
    pub const fn instrument_id(&self) -> &InstrumentId {
        &self.instrument_id
    }

    /// Latest published status.
    #[must_use]
    pub fn status(&self) -> OrderStatus {
        *self.status.borrow()
    }

    /// Returns true once the terminal status is recorded in the ledger.
    #[must_use]
    pub fn is_resolved(&self) -> bool {
        self.status().is_terminal()
    }

    /// Wait until the order's terminal status is recorded.
    ///
    /// Returns `None` if the driving task stopped first, which leaves the
    /// order open in the ledger for the next cycle's reconciliation.
    pub async fn wait_terminal(&mut self) -> Option<OrderStatus> {
        self.status
            .wait_for(OrderStatus::is_terminal)
            .await
            .ok()
            .map(|status| *status)
    }
}

/// What carryover reconciliation did.
#[derive(Debug, Clone, Default)]
pub struct CarryoverReport {
    /// Orders whose terminal status was recorded.
    pub settled: Vec<OrderId>,
    /// Orders still working at the broker, now tracked again.
    pub resumed: Vec<OrderId>,
    /// Instruments that must not receive a new decision this cycle.
    pub blocked: HashSet<InstrumentId>,
}

impl CarryoverReport {
    /// Returns true if reconciliation changed positions or order states.
    #[must_use]
    pub fn wrote_ledger(&self) -> bool {
        !self.settled.is_empty()
    }
}

enum SubmitOutcome {
    Accepted,
    Rejected(String),
    Exhausted(String),
    Halted,
}

/// Serializes terminal writes per instrument.
#[derive(Debug, Default)]
struct InstrumentLocks {
    locks: parking_lot::Mutex<HashMap<InstrumentId, Arc<AsyncMutex<()>>>>,
}

impl InstrumentLocks {
    fn lock_for(&self, instrument_id: &InstrumentId) -> Arc<AsyncMutex<()>> {
        Arc::clone(self.locks.lock().entry(instrument_id.clone()).or_default())
    }
}

// ============================================================================
// Engine
// ============================================================================

/// Order execution engine.
pub struct ExecutionEngine<B, L, N>
where
    B: BrokerPort,
    L: LedgerPort,
    N: NotificationPort,
{
    broker: Arc<B>,
    ledger: Arc<L>,
    notifier: Arc<N>,
    settings: Arc<ExecutionSettings>,
    open_orders: Arc<OpenOrderTable>,
    instrument_locks: Arc<InstrumentLocks>,
    halt: CancellationToken,
    tasks: TaskTracker,
}

impl<B, L, N> Clone for ExecutionEngine<B, L, N>
where
    B: BrokerPort,
    L: LedgerPort,
    N: NotificationPort,
{
    fn clone(&self) -> Self {
        Self {
            broker: Arc::clone(&self.broker),
            ledger: Arc::clone(&self.ledger),
            notifier: Arc::clone(&self.notifier),
            settings: Arc::clone(&self.settings),
            open_orders: Arc::clone(&self.open_orders),
            instrument_locks: Arc::clone(&self.instrument_locks),
            halt: self.halt.clone(),
            tasks: self.tasks.clone(),
        }
    }
}

impl<B, L, N> ExecutionEngine<B, L, N>
where
    B: BrokerPort + 'static,
    L: LedgerPort + 'static,
    N: NotificationPort + 'static,
{
    /// Create a new engine.
    pub fn new(broker: Arc<B>, ledger: Arc<L>, notifier: Arc<N>, settings: ExecutionSettings) -> Self {
        Self {
            broker,
            ledger,
            notifier,
            settings: Arc::new(settings),
            open_orders: Arc::new(OpenOrderTable::new()),
            instrument_locks: Arc::new(InstrumentLocks::default()),
            halt: CancellationToken::new(),
            tasks: TaskTracker::new(),
        }
    }

    /// Returns true if the instrument has a non-terminal order.
    #[must_use]
    pub fn has_open_order(&self, instrument_id: &InstrumentId) -> bool {
        self.open_orders.is_claimed(instrument_id)
    }

    /// Number of orders currently driven by the engine.
    #[must_use]
    pub fn open_order_count(&self) -> usize {
        self.open_orders.len()
    }

    /// Turn a sized decision into an order and start driving it.
    ///
    /// # Errors
    ///
    /// Fails without contacting the broker if the instrument already has an
    /// open order, admission has stopped, or the pending order cannot be
    /// persisted.
    pub async fn submit(
        &self,
        decision: &TradeDecision,
        run_id: &RunId,
    ) -> Result<OrderTicket, ExecutionError> {
        if self.halt.is_cancelled() {
            return Err(ExecutionError::ShutdownInterrupt);
        }

        let order = Order::new(CreateOrderCommand {
            run_id: run_id.clone(),
            instrument_id: decision.instrument_id.clone(),
            side: decision.side,
            quantity: decision.quantity,
            reference_price: decision.price,
        })?;

        if let Err(existing) = self.open_orders.try_claim(order.instrument_id(), order.id()) {
            metrics::record_decision_suppressed(order.instrument_id().as_str());
            return Err(ExecutionError::OpenOrderExists {
                instrument_id: order.instrument_id().to_string(),
                order_id: existing.to_string(),
            });
        }

        if let Err(e) = self.ledger.save_order(&order).await {
            self.open_orders.release(order.instrument_id(), order.id());
            metrics::record_ledger_failure("save_order");
            return Err(e.into());
        }
        metrics::update_open_orders(self.open_orders.len());

        let (tx, rx) = watch::channel(OrderStatus::Pending);
        let ticket = OrderTicket {
            order_id: order.id().clone(),
            instrument_id: order.instrument_id().clone(),
            status: rx,
        };

        tracing::info!(
            order_id = %order.id(),
            instrument = %order.instrument_id(),
            side = %order.side(),
            quantity = %order.quantity(),
            "Order created"
        );

        let span = tracing::info_span!(
            "order",
            order_id = %order.id(),
            instrument = %order.instrument_id()
        );
        let engine = self.clone();
        self.tasks
            .spawn(async move { engine.drive_submission(order, tx).await }.instrument(span));

        Ok(ticket)
    }

    /// Resolve non-terminal orders found in the ledger that no live task drives.
    ///
    /// Must run before any decision for the affected instruments.
    pub async fn reconcile_carryover(&self, open_orders: &[Order]) -> CarryoverReport {
        let mut report = CarryoverReport::default();

        for stored in open_orders {
            let instrument_id = stored.instrument_id().clone();

            if self.open_orders.is_tracking(stored.id()) {
                continue;
            }
            if let Err(holder) = self.open_orders.try_claim(&instrument_id, stored.id()) {
                tracing::warn!(
                    order_id = %stored.id(),
                    holder = %holder,
                    instrument = %instrument_id,
                    "Second open order for instrument in ledger"
                );
                report.blocked.insert(instrument_id);
                continue;
            }

            let mut order = stored.clone();
            match self.query(order.id()).await {
                Ok(broker_view) => match order.apply_report(&broker_view) {
                    Ok(true) => {
                        if self.settle(&order).await {
                            report.settled.push(order.id().clone());
                        } else {
                            report.blocked.insert(instrument_id);
                        }
                    }
                    Ok(false) => {
                        self.resume(order);
                        report.resumed.push(stored.id().clone());
                        report.blocked.insert(instrument_id);
                    }
                    Err(e) => {
                        tracing::warn!(
                            order_id = %order.id(),
                            error = %e,
                            "Broker report contradicts carried-over order"
                        );
                        self.open_orders.release(&instrument_id, order.id());
                        report.blocked.insert(instrument_id);
                    }
                },
                Err(BrokerError::OrderNotFound { .. }) if order.status() == OrderStatus::Pending => {
                    let failed = order.fail("never reached the broker").is_ok();
                    if failed && self.settle(&order).await {
                        report.settled.push(order.id().clone());
                    } else {
                        self.open_orders.release(&instrument_id, order.id());
                        report.blocked.insert(instrument_id);
                    }
                }
                Err(BrokerError::OrderNotFound { .. }) => {
                    // Accepted once, now gone: nothing filled that the broker can show.
                    tracing::error!(
                        order_id = %order.id(),
                        instrument = %instrument_id,
                        "Submitted order unknown to broker, settling as cancelled"
                    );
                    let lost = ExecutionReport::cancelled(order.id().clone(), "unknown to broker");
                    let cancelled = matches!(order.apply_report(&lost), Ok(true));
                    if cancelled && self.settle(&order).await {
                        metrics::record_order_lost(instrument_id.as_str());
                        self.notify(Notification::OrderLost(OrderFailure::from_order(&order)))
                            .await;
                        report.settled.push(order.id().clone());
                    } else {
                        self.open_orders.release(&instrument_id, order.id());
                        report.blocked.insert(instrument_id);
                    }
                }
                Err(e) => {
                    tracing::warn!(
                        order_id = %order.id(),
                        status = %order.status(),
                        error = %e,
                        "Carried-over order unresolved, instrument blocked this cycle"
                    );
                    self.open_orders.release(&instrument_id, order.id());
                    report.blocked.insert(instrument_id);
                }
            }
        }

        metrics::update_open_orders(self.open_orders.len());
        report
    }

    /// Compare ledger positions with the broker's and notify differences.
    ///
    /// Instruments with an open order are skipped. Nothing is written.
    pub async fn check_position_drift(
        &self,
        account_id: &AccountId,
        ledger_positions: &HashMap<InstrumentId, Position>,
    ) -> Vec<PositionDrift> {
        let broker_positions =
            match time::timeout(self.settings.broker_timeout, self.broker.positions(account_id))
                .await
            {
                Ok(Ok(positions)) => positions,
                Ok(Err(e)) => {
                    tracing::warn!(error = %e, "Broker positions unavailable, drift check skipped");
                    return Vec::new();
                }
                Err(_) => {
                    tracing::warn!("Broker positions query timed out, drift check skipped");
                    return Vec::new();
                }
            };

        let broker_quantities: HashMap<InstrumentId, _> = broker_positions
            .into_iter()
            .map(|p| (p.instrument_id, p.quantity))
            .collect();

        let instruments: HashSet<&InstrumentId> = ledger_positions
            .keys()
            .chain(broker_quantities.keys())
            .collect();

        let mut drifts = Vec::new();
        for instrument_id in instruments {
            if self.open_orders.is_claimed(instrument_id) {
                continue;
            }
            let snapshot_quantity = ledger_positions
                .get(instrument_id)
                .map(|p| p.quantity)
                .unwrap_or_default();
            let broker_quantity = broker_quantities
                .get(instrument_id)
                .copied()
                .unwrap_or_default();
            if snapshot_quantity == broker_quantity {
                continue;
            }

            // The snapshot may predate a settlement; confirm against the current row.
            let ledger_quantity = match self.ledger.position(instrument_id).await {
                Ok(current) => current.position.quantity,
                Err(e) => {
                    tracing::warn!(
                        instrument = %instrument_id,
                        error = %e,
                        "Ledger position unavailable, drift check skipped for instrument"
                    );
                    continue;
                }
            };
            if ledger_quantity == broker_quantity || self.open_orders.is_claimed(instrument_id) {
                continue;
            }

            tracing::warn!(
                instrument = %instrument_id,
                %ledger_quantity,
                %broker_quantity,
                "Position drift between ledger and broker"
            );
            metrics::record_position_drift(instrument_id.as_str());
            let drift = PositionDrift {
                instrument_id: instrument_id.clone(),
                ledger_quantity,
                broker_quantity,
            };
            self.notify(Notification::PositionDrift(drift.clone())).await;
            drifts.push(drift);
        }
        drifts
    }

    /// Stop all order tasks and wait for them to exit.
    ///
    /// Orders left non-terminal stay open in the ledger.
    pub async fn shutdown(&self) {
        self.halt.cancel();
        self.tasks.close();
        self.tasks.wait().await;
        tracing::info!(
            open_orders = self.open_orders.len(),
            "Execution engine stopped"
        );
    }

    // ========================================================================
    // Order tasks
    // ========================================================================

    async fn drive_submission(self, mut order: Order, tx: watch::Sender<OrderStatus>) {
        match self.submit_with_retry(&mut order).await {
            SubmitOutcome::Accepted => {
                if let Err(e) = order.mark_submitted() {
                    tracing::error!(error = %e, "Accepted order in unexpected state");
                }
                self.persist_progress(&order).await;
                tx.send_replace(order.status());
                self.track_until_terminal(order, tx).await;
            }
            SubmitOutcome::Rejected(reason) => {
                tracing::info!(%reason, "Order rejected by broker");
                if let Err(e) = order.reject(reason) {
                    tracing::error!(error = %e, "Could not mark order rejected");
                }
                self.finish(&order, &tx).await;
            }
            SubmitOutcome::Exhausted(reason) => self.resolve_exhausted(order, reason, tx).await,
            SubmitOutcome::Halted => {
                tracing::info!("Submission stopped; order stays pending for reconciliation");
                self.open_orders.release(order.instrument_id(), order.id());
            }
        }
    }

    async fn submit_with_retry(&self, order: &mut Order) -> SubmitOutcome {
        let request = SubmitOrderRequest::for_order(order);
        let mut backoff = ExponentialBackoffCalculator::new(&self.settings.retry);

        loop {
            let attempt = order.record_submit_attempt();
            let started = Instant::now();

            let result = tokio::select! {
                biased;
                () = self.halt.cancelled() => return SubmitOutcome::Halted,
                result = time::timeout(
                    self.settings.broker_timeout,
                    self.broker.submit_order(request.clone()),
                ) => result,
            };
            let latency = started.elapsed().as_secs_f64();

            let error = match result {
                Ok(Ok(SubmitAck::Accepted)) => {
                    metrics::record_submit_attempt("accepted", latency);
                    tracing::info!(attempt, "Order accepted by broker");
                    return SubmitOutcome::Accepted;
                }
                Ok(Ok(SubmitAck::Rejected { reason })) => {
                    metrics::record_submit_attempt("rejected", latency);
                    return SubmitOutcome::Rejected(reason);
                }
                Ok(Err(e)) => {
                    metrics::record_submit_attempt("error", latency);
                    e
                }
                Err(_) => {
                    metrics::record_submit_attempt("timeout", latency);
                    BrokerError::Timeout {
                        operation: "submit_order".to_string(),
                    }
                }
            };

            if !error.is_retryable() {
                return SubmitOutcome::Exhausted(error.to_string());
            }

            let Some(delay) = backoff.next_backoff() else {
                return SubmitOutcome::Exhausted(format!("{error} (after {attempt} attempts)"));
            };

            tracing::warn!(
                attempt,
                delay_ms = delay.as_millis() as u64,
                error = %error,
                "Submission failed, retrying with the same order id"
            );

            tokio::select! {
                biased;
                () = self.halt.cancelled() => return SubmitOutcome::Halted,
                () = time::sleep(delay) => {}
            }
        }
    }

    /// A lost acknowledgement may hide an accepted order, so ask once
    /// before declaring the order failed.
    async fn resolve_exhausted(
        &self,
        mut order: Order,
        reason: String,
        tx: watch::Sender<OrderStatus>,
    ) {
        if let Ok(broker_view) = self.query(order.id()).await {
            match order.apply_report(&broker_view) {
                Ok(true) => {
                    self.finish(&order, &tx).await;
                    return;
                }
                Ok(false) => {
                    if order.status() == OrderStatus::Pending {
                        let _ = order.mark_submitted();
                    }
                    tracing::info!("Broker holds the order despite failed submission calls");
                    self.persist_progress(&order).await;
                    tx.send_replace(order.status());
                    self.track_until_terminal(order, tx).await;
                    return;
                }
                Err(e) => tracing::warn!(error = %e, "Ignoring inconsistent execution report"),
            }
        }

        tracing::error!(%reason, attempts = order.submit_attempts(), "Order failed");
        if let Err(e) = order.fail(reason) {
            tracing::error!(error = %e, "Could not mark order failed");
        }
        self.finish(&order, &tx).await;
    }

    fn resume(&self, mut order: Order) {
        if order.status() == OrderStatus::Pending {
            let _ = order.mark_submitted();
        }
        let (tx, _rx) = watch::channel(order.status());
        let span = tracing::info_span!(
            "order",
            order_id = %order.id(),
            instrument = %order.instrument_id()
        );
        tracing::info!(order_id = %order.id(), "Resuming status tracking for carried-over order");

        let engine = self.clone();
        self.tasks.spawn(
            async move {
                engine.persist_progress(&order).await;
                engine.track_until_terminal(order, tx).await;
            }
            .instrument(span),
        );
    }

    /// Poll the broker until the order is terminal. Never cancels the order.
    async fn track_until_terminal(&self, mut order: Order, tx: watch::Sender<OrderStatus>) {
        let mut ticker = time::interval(self.settings.status_poll_interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            tokio::select! {
                biased;
                () = self.halt.cancelled() => {
                    tracing::info!("Status tracking stopped; order stays open for reconciliation");
                    self.open_orders.release(order.instrument_id(), order.id());
                    return;
                }
                _ = ticker.tick() => {}
            }

            match self.query(order.id()).await {
                Ok(broker_view) => match order.apply_report(&broker_view) {
                    Ok(true) => break,
                    Ok(false) => {}
                    Err(e) => tracing::warn!(error = %e, "Ignoring inconsistent execution report"),
                },
                Err(e) => tracing::warn!(error = %e, "Order status query failed, will retry"),
            }
        }

        self.finish(&order, &tx).await;
    }

    async fn finish(&self, order: &Order, tx: &watch::Sender<OrderStatus>) {
        if self.settle(order).await {
            tx.send_replace(order.status());
        }
    }

    /// Write the terminal state and release the instrument.
    ///
    /// Returns false if the ledger write failed; the order then stays open
    /// in the ledger and is picked up by the next reconciliation.
    async fn settle(&self, order: &Order) -> bool {
        let lock = self.instrument_locks.lock_for(order.instrument_id());
        let result = {
            let _guard = lock.lock().await;
            self.record_terminal(order).await
        };

        self.open_orders.release(order.instrument_id(), order.id());
        metrics::update_open_orders(self.open_orders.len());

        match result {
            Ok(TerminalWriteOutcome::Applied { position, version }) => {
                tracing::info!(
                    order_id = %order.id(),
                    status = %order.status(),
                    filled = %order.filled_quantity(),
                    position = %position.quantity,
                    version,
                    "Order terminal state recorded"
                );
                metrics::record_order_terminal(order.status().as_str(), order.instrument_id().as_str());
                if order.status() == OrderStatus::Failed {
                    self.notify(Notification::OrderFailed(OrderFailure::from_order(order)))
                        .await;
                }
                true
            }
            Ok(TerminalWriteOutcome::AlreadyRecorded) => {
                tracing::debug!(order_id = %order.id(), "Terminal state already recorded");
                true
            }
            Err(e) => {
                tracing::error!(
                    order_id = %order.id(),
                    status = %order.status(),
                    error = %e,
                    "Terminal ledger write failed; order left open for reconciliation"
                );
                metrics::record_ledger_failure("record_terminal");
                false
            }
        }
    }

    async fn record_terminal(&self, order: &Order) -> Result<TerminalWriteOutcome, LedgerError> {
        let delta = order.position_delta();
        let mut conflicts = 0;

        loop {
            let current = self.ledger.position(order.instrument_id()).await?;
            let write = TerminalWrite {
                order: order.clone(),
                delta: delta.clone(),
                expected_version: current.version,
            };

            match self.ledger.record_terminal(write).await {
                Err(e) if e.is_conflict() && conflicts < self.settings.ledger_conflict_retries => {
                    conflicts += 1;
                    metrics::record_ledger_conflict(order.instrument_id().as_str());
                    tracing::debug!(conflicts, error = %e, "Position moved, re-reading");
                }
                other => return other,
            }
        }
    }

    async fn persist_progress(&self, order: &Order) {
        if let Err(e) = self.ledger.save_order(order).await {
            metrics::record_ledger_failure("save_order");
            tracing::warn!(order_id = %order.id(), error = %e, "Could not persist order progress");
        }
    }

    async fn query(&self, order_id: &OrderId) -> Result<ExecutionReport, BrokerError> {
        time::timeout(self.settings.broker_timeout, self.broker.query_order(order_id))
            .await
            .unwrap_or_else(|_| {
                Err(BrokerError::Timeout {
                    operation: "query_order".to_string(),
                })
            })
    }

    async fn notify(&self, notification: Notification) {
        let kind = notification.kind();
        if let Err(e) = self.notifier.notify(notification).await {
            metrics::record_notification_failure(kind);
            tracing::warn!(kind, error = %e, "Notification delivery failed");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn ticket_reports_terminal_status() {
        let (tx, rx) = watch::channel(OrderStatus::Pending);
        let mut ticket = OrderTicket {
            order_id: OrderId::new("o-1"),
            instrument_id: InstrumentId::new("SBER"),
            status: rx,
        };
        assert!(!ticket.is_resolved());

        tx.send_replace(OrderStatus::Submitted);
        tx.send_replace(OrderStatus::Filled);
        drop(tx);

        assert_eq!(ticket.wait_terminal().await, Some(OrderStatus::Filled));
        assert!(ticket.is_resolved());
    }

    #[tokio::test]
    async fn ticket_without_terminal_status_is_unresolved() {
        let (tx, rx) = watch::channel(OrderStatus::Pending);
        let mut ticket = OrderTicket {
            order_id: OrderId::new("o-1"),
            instrument_id: InstrumentId::new("SBER"),
            status: rx,
        };

        tx.send_replace(OrderStatus::Submitted);
        drop(tx);

        assert_eq!(ticket.wait_terminal().await, None);
        assert_eq!(ticket.status(), OrderStatus::Submitted);
    }

    #[test]
    fn carryover_report_tracks_writes() {
        let mut report = CarryoverReport::default();
        assert!(!report.wrote_ledger());
        report.settled.push(OrderId::new("o-1"));
        assert!(report.wrote_ledger());
    }

    #[tokio::test]
    async fn instrument_locks_are_shared_per_instrument() {
        let locks = InstrumentLocks::default();
        let first = locks.lock_for(&InstrumentId::new("SBER"));
        let second = locks.lock_for(&InstrumentId::new("SBER"));
        let other = locks.lock_for(&InstrumentId::new("GAZP"));

        let _guard = first.lock().await;
        assert!(second.try_lock().is_err());
        assert!(other.try_lock().is_ok());
    }
}
