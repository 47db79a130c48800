//! Run Cycle Use Case
//!
//! One evaluation-and-execution pass:
//!
//! 1. Open the run record
//! 2. Read the ledger snapshot and reconcile carried-over orders
//! 3. Apply the kill switch and session gate, then load the day's activity
//! 4. Guard, size and hand every tracked instrument's trade to the engine
//! 5. Await terminal states until the deadline (or the shutdown grace window)
//! 6. Close the run record and notify

use std::sync::Arc;
use std::time::{Duration, Instant};

use async_trait::async_trait;
use chrono::Utc;
use futures::future::join_all;
use rust_decimal::Decimal;
use tokio::time;
use tokio_util::sync::CancellationToken;
use tracing::Instrument;

use crate::application::ports::{
    BrokerPort, LedgerPort, LedgerSnapshot, Notification, NotificationPort, RunSummary,
    SignalPort, TrackedInstrument,
};
use crate::application::services::{
    CycleRunner, ExecutionEngine, ExecutionError, OrderTicket,
};
use crate::domain::risk_management::{
    GuardRejection, RiskSizer, SizingDecision, SizingRequest, TradeGuard, TradingLimits,
    TradingSession,
};
use crate::domain::run_history::{RunOutcome, RunRecord};
use crate::domain::shared::{AccountId, InstrumentId, OrderId, Timestamp};
use crate::observability::metrics;

/// Cycle configuration.
#[derive(Debug, Clone)]
pub struct CycleSettings {
    /// Account the cycle trades.
    pub account_id: AccountId,
    /// Instruments evaluated every cycle, in order.
    pub instruments: Vec<TrackedInstrument>,
    /// Time allowed for issued orders to reach a terminal status.
    pub deadline: Duration,
    /// Time granted to open orders once shutdown is requested.
    pub shutdown_grace: Duration,
    /// Compare ledger and broker positions at cycle start.
    pub check_drift: bool,
    /// Account-wide limits on new exposure.
    pub limits: TradingLimits,
    /// When orders may be issued; also fixes the start of the trading day.
    pub session: TradingSession,
}

/// Result of one cycle.
#[derive(Debug, Clone)]
pub struct CycleReport {
    /// Closed run record.
    pub record: RunRecord,
    /// Instruments skipped because an order was still open.
    pub suppressed: Vec<InstrumentId>,
    /// Instruments refused by a pre-trade guard.
    pub gated: Vec<(InstrumentId, GuardRejection)>,
    /// Instruments whose evaluation failed.
    pub failed: Vec<InstrumentId>,
}

impl CycleReport {
    /// Cycle outcome.
    #[must_use]
    pub fn outcome(&self) -> RunOutcome {
        self.record.outcome().unwrap_or(RunOutcome::Aborted)
    }
}

enum WaitEnd {
    Resolved,
    Deadline,
    Shutdown,
}

/// Use case running a single cycle.
pub struct RunCycleUseCase<B, L, N, S>
where
    B: BrokerPort,
    L: LedgerPort,
    N: NotificationPort,
    S: SignalPort,
{
    engine: ExecutionEngine<B, L, N>,
    ledger: Arc<L>,
    signals: Arc<S>,
    notifier: Arc<N>,
    settings: CycleSettings,
}

impl<B, L, N, S> RunCycleUseCase<B, L, N, S>
where
    B: BrokerPort + 'static,
    L: LedgerPort + 'static,
    N: NotificationPort + 'static,
    S: SignalPort + 'static,
{
    /// Create a new RunCycleUseCase.
    pub const fn new(
        engine: ExecutionEngine<B, L, N>,
        ledger: Arc<L>,
        signals: Arc<S>,
        notifier: Arc<N>,
        settings: CycleSettings,
    ) -> Self {
        Self {
            engine,
            ledger,
            signals,
            notifier,
            settings,
        }
    }

    /// Engine driving this use case's orders.
    pub const fn engine(&self) -> &ExecutionEngine<B, L, N> {
        &self.engine
    }

    /// Execute one cycle.
    ///
    /// `shutdown` stops admission of new orders; orders already issued get
    /// the grace window before the run is closed.
    pub async fn execute(&self, shutdown: CancellationToken) -> CycleReport {
        let record = RunRecord::open();
        let span = tracing::info_span!("cycle", run_id = %record.id());
        self.execute_inner(record, shutdown).instrument(span).await
    }

    async fn execute_inner(&self, record: RunRecord, shutdown: CancellationToken) -> CycleReport {
        let started = Instant::now();
        let deadline = time::Instant::now() + self.settings.deadline;
        let mut report = CycleReport {
            record,
            suppressed: Vec::new(),
            gated: Vec::new(),
            failed: Vec::new(),
        };

        tracing::info!(instruments = self.settings.instruments.len(), "Cycle started");

        if let Err(e) = self.ledger.open_run(&report.record).await {
            metrics::record_ledger_failure("open_run");
            let reason = format!("run record could not be opened: {e}");
            return self.close(report, RunOutcome::Aborted, Vec::new(), Some(reason), started).await;
        }

        let snapshot = match self.load_snapshot().await {
            Ok(snapshot) => snapshot,
            Err(reason) => {
                return self.close(report, RunOutcome::Aborted, Vec::new(), Some(reason), started).await;
            }
        };

        if shutdown.is_cancelled() {
            let reason = "shutdown requested before evaluation".to_string();
            return self.close(report, RunOutcome::Aborted, Vec::new(), Some(reason), started).await;
        }

        let carryover = self.engine.reconcile_carryover(&snapshot.open_orders).await;
        if !carryover.settled.is_empty() || !carryover.resumed.is_empty() {
            tracing::info!(
                settled = carryover.settled.len(),
                resumed = carryover.resumed.len(),
                blocked = carryover.blocked.len(),
                "Carried-over orders reconciled"
            );
        }

        // Positions may have moved while settling carried-over orders.
        let snapshot = if carryover.wrote_ledger() {
            match self.load_snapshot().await {
                Ok(snapshot) => snapshot,
                Err(reason) => {
                    return self.close(report, RunOutcome::Aborted, Vec::new(), Some(reason), started).await;
                }
            }
        } else {
            snapshot
        };

        if self.settings.check_drift {
            self.engine
                .check_position_drift(&self.settings.account_id, &snapshot.positions)
                .await;
        }

        let now = Utc::now();
        if let Err(rejection) =
            TradeGuard::check_cycle(snapshot.trading_enabled, &self.settings.session, now)
        {
            tracing::warn!(reason = %rejection, "No orders this cycle");
            for instrument in &self.settings.instruments {
                metrics::record_trade_gated(rejection.label(), instrument.instrument_id.as_str());
                report
                    .gated
                    .push((instrument.instrument_id.clone(), rejection.clone()));
            }
            return self.close(report, RunOutcome::Completed, Vec::new(), None, started).await;
        }

        let day_start = Timestamp::new(self.settings.session.day_start(now));
        let mut guard = match self.ledger.daily_activity(day_start).await {
            Ok(activity) => {
                tracing::debug!(
                    trades = activity.trades,
                    realized_pnl = %activity.realized_pnl,
                    open_positions = snapshot.open_position_count(),
                    "Daily activity loaded"
                );
                TradeGuard::new(
                    self.settings.limits.clone(),
                    activity,
                    snapshot.open_position_count(),
                )
            }
            Err(e) => {
                metrics::record_ledger_failure("daily_activity");
                let reason = format!("daily activity unavailable: {e}");
                return self.close(report, RunOutcome::Aborted, Vec::new(), Some(reason), started).await;
            }
        };

        let mut tickets = Vec::new();
        let mut admission_cut = false;

        for instrument in &self.settings.instruments {
            let instrument_id = &instrument.instrument_id;

            if shutdown.is_cancelled() {
                admission_cut = true;
                break;
            }

            if carryover.blocked.contains(instrument_id) || self.engine.has_open_order(instrument_id) {
                tracing::info!(instrument = %instrument_id, "Decision suppressed, order still open");
                metrics::record_decision_suppressed(instrument_id.as_str());
                report.suppressed.push(instrument_id.clone());
                continue;
            }

            let evaluated = tokio::select! {
                biased;
                () = shutdown.cancelled() => {
                    admission_cut = true;
                    break;
                }
                evaluated = self.signals.evaluate(instrument) => evaluated,
            };

            let signal = match evaluated {
                Ok(Some(signal)) => signal,
                Ok(None) => continue,
                Err(e) => {
                    tracing::warn!(instrument = %instrument_id, error = %e, "Signal unavailable");
                    report.failed.push(instrument_id.clone());
                    continue;
                }
            };

            let position = snapshot.position(instrument_id);
            let held = position.map_or(Decimal::ZERO, |p| p.quantity);
            if let Err(rejection) = guard.admit(&signal.intent, held) {
                tracing::info!(instrument = %instrument_id, reason = %rejection, "Decision gated");
                metrics::record_trade_gated(rejection.label(), instrument_id.as_str());
                report.gated.push((instrument_id.clone(), rejection));
                continue;
            }

            let request = SizingRequest {
                account: &snapshot.account,
                signal: &signal,
                position,
                lot_size: instrument.lot_size,
            };
            let decision = match RiskSizer::size(&request) {
                Ok(SizingDecision::Trade(decision)) => decision,
                Ok(SizingDecision::NoAction(reason)) => {
                    tracing::debug!(instrument = %instrument_id, %reason, "No action");
                    continue;
                }
                Err(e) => {
                    tracing::warn!(instrument = %instrument_id, error = %e, "Sizing failed");
                    report.failed.push(instrument_id.clone());
                    continue;
                }
            };

            tracing::info!(
                instrument = %instrument_id,
                side = %decision.side,
                quantity = %decision.quantity,
                price = %decision.price,
                limited_by = ?decision.limited_by,
                "Trade decided"
            );

            match self.engine.submit(&decision, report.record.id()).await {
                Ok(ticket) => {
                    guard.record_issued(&decision, held);
                    report.record.record_decision(ticket.order_id().clone());
                    tickets.push(ticket);
                }
                Err(ExecutionError::OpenOrderExists { order_id, .. }) => {
                    tracing::info!(instrument = %instrument_id, %order_id, "Decision suppressed");
                    report.suppressed.push(instrument_id.clone());
                }
                Err(ExecutionError::ShutdownInterrupt) => {
                    admission_cut = true;
                    break;
                }
                Err(e) => {
                    tracing::warn!(instrument = %instrument_id, error = %e, "Order not issued");
                    report.failed.push(instrument_id.clone());
                }
            }
        }

        tracing::debug!(
            issued = tickets.len(),
            trades_today = guard.trades_today(),
            gated = report.gated.len(),
            "Admission finished"
        );

        let end = if admission_cut {
            WaitEnd::Shutdown
        } else {
            tokio::select! {
                biased;
                () = wait_all(&mut tickets) => WaitEnd::Resolved,
                () = shutdown.cancelled() => WaitEnd::Shutdown,
                () = time::sleep_until(deadline) => WaitEnd::Deadline,
            }
        };

        if matches!(end, WaitEnd::Shutdown) && tickets.iter().any(|t| !t.is_resolved()) {
            tracing::info!(
                grace_secs = self.settings.shutdown_grace.as_secs(),
                "Shutdown requested, waiting for open orders"
            );
            if time::timeout(self.settings.shutdown_grace, wait_all(&mut tickets))
                .await
                .is_err()
            {
                tracing::warn!("Shutdown grace window elapsed with orders still open");
            }
        }

        let pending: Vec<OrderId> = tickets
            .iter()
            .filter(|t| !t.is_resolved())
            .map(|t| t.order_id().clone())
            .collect();

        let (outcome, reason) = match end {
            WaitEnd::Shutdown if !pending.is_empty() => (
                RunOutcome::Aborted,
                Some(format!(
                    "shutdown grace window elapsed with {} open orders",
                    pending.len()
                )),
            ),
            WaitEnd::Shutdown if admission_cut => (
                RunOutcome::Aborted,
                Some("shutdown before all instruments were evaluated".to_string()),
            ),
            _ if !pending.is_empty() => (RunOutcome::PartiallyCompleted, None),
            WaitEnd::Deadline | WaitEnd::Resolved | WaitEnd::Shutdown => (RunOutcome::Completed, None),
        };

        self.close(report, outcome, pending, reason, started).await
    }

    async fn load_snapshot(&self) -> Result<LedgerSnapshot, String> {
        self.ledger
            .snapshot(&self.settings.account_id)
            .await
            .map_err(|e| {
                metrics::record_ledger_failure("snapshot");
                format!("ledger snapshot unavailable: {e}")
            })
    }

    async fn close(
        &self,
        mut report: CycleReport,
        outcome: RunOutcome,
        carryover: Vec<OrderId>,
        reason: Option<String>,
        started: Instant,
    ) -> CycleReport {
        if let Err(e) = report.record.close(outcome, carryover, reason) {
            tracing::error!(error = %e, "Run record already closed");
        }

        if let Err(e) = self.ledger.close_run(&report.record).await {
            metrics::record_ledger_failure("close_run");
            tracing::warn!(error = %e, "Could not persist closed run record");
        }

        if let Some(summary) = RunSummary::from_record(&report.record) {
            let notification = Notification::RunClosed(summary);
            let kind = notification.kind();
            if let Err(e) = self.notifier.notify(notification).await {
                metrics::record_notification_failure(kind);
                tracing::warn!(error = %e, "Run notification failed");
            }
        }

        metrics::record_cycle_closed(outcome.as_str(), started.elapsed().as_secs_f64());

        let record = &report.record;
        match outcome {
            RunOutcome::Completed => tracing::info!(
                %outcome,
                orders = record.decisions().len(),
                "Cycle closed"
            ),
            RunOutcome::PartiallyCompleted | RunOutcome::Aborted => tracing::warn!(
                %outcome,
                orders = record.decisions().len(),
                carryover = record.carryover().len(),
                reason = record.abort_reason().unwrap_or(""),
                "Cycle closed"
            ),
        }

        report
    }
}

#[async_trait]
impl<B, L, N, S> CycleRunner for RunCycleUseCase<B, L, N, S>
where
    B: BrokerPort + 'static,
    L: LedgerPort + 'static,
    N: NotificationPort + 'static,
    S: SignalPort + 'static,
{
    async fn run_cycle(&self, shutdown: CancellationToken) -> CycleReport {
        self.execute(shutdown).await
    }
}

async fn wait_all(tickets: &mut [OrderTicket]) {
    join_all(tickets.iter_mut().map(|ticket| ticket.wait_terminal())).await;
}
