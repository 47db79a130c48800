//! Paper broker.
//!
//! Simulated brokerage for paper trading and tests. Orders are keyed by the
//! agent's order id, so a resubmission returns the original acknowledgement.
//! A working order fills at the instrument's configured price on the first
//! status query after the fill delay.
//!
//! Fault hooks simulate transient outages, lost acknowledgements, rejections
//! and orders that never finish.

use std::collections::{HashMap, HashSet, VecDeque};
use std::time::Duration;

use async_trait::async_trait;
use parking_lot::Mutex;
use rust_decimal::Decimal;
use tokio::time::Instant;
use tracing::debug;

use crate::application::ports::{BrokerError, BrokerPort, SubmitAck, SubmitOrderRequest};
use crate::domain::order_execution::ExecutionReport;
use crate::domain::portfolio::{Position, PositionDelta};
use crate::domain::shared::{AccountId, InstrumentId, OrderId};

/// Paper broker settings.
#[derive(Debug, Clone, Default)]
pub struct PaperBrokerConfig {
    /// Time an accepted order stays working before it fills.
    pub fill_delay: Duration,
    /// Fill price per instrument.
    pub prices: HashMap<InstrumentId, Decimal>,
}

#[derive(Debug, Clone)]
enum PaperOrderState {
    Working,
    Done(ExecutionReport),
}

#[derive(Debug, Clone)]
struct PaperOrder {
    request: SubmitOrderRequest,
    ack: SubmitAck,
    accepted_at: Instant,
    state: PaperOrderState,
}

#[derive(Debug, Default)]
struct Faults {
    /// Errors returned by upcoming submissions before the order is recorded.
    submit_errors: VecDeque<BrokerError>,
    /// Upcoming submissions that are recorded but answered with a timeout.
    lost_acks: u32,
    /// Errors returned by upcoming status queries.
    query_errors: VecDeque<BrokerError>,
    /// Instruments whose orders never fill.
    held: HashSet<InstrumentId>,
    /// Instruments whose submissions are rejected.
    rejected: HashMap<InstrumentId, String>,
    /// Instruments whose orders stop with only this quantity filled.
    partial: HashMap<InstrumentId, Decimal>,
}

#[derive(Debug, Default)]
struct PaperState {
    orders: HashMap<OrderId, PaperOrder>,
    positions: HashMap<InstrumentId, Position>,
    submit_calls: u32,
    faults: Faults,
}

/// Simulated broker implementing [`BrokerPort`].
#[derive(Debug)]
pub struct PaperBroker {
    fill_delay: Duration,
    prices: Mutex<HashMap<InstrumentId, Decimal>>,
    state: Mutex<PaperState>,
}

impl Default for PaperBroker {
    fn default() -> Self {
        Self::new(PaperBrokerConfig::default())
    }
}

impl PaperBroker {
    /// Create a paper broker.
    #[must_use]
    pub fn new(config: PaperBrokerConfig) -> Self {
        Self {
            fill_delay: config.fill_delay,
            prices: Mutex::new(config.prices),
            state: Mutex::new(PaperState::default()),
        }
    }

    /// Set the fill price for an instrument.
    pub fn set_price(&self, instrument_id: impl Into<InstrumentId>, price: Decimal) {
        self.prices.lock().insert(instrument_id.into(), price);
    }

    /// Seed a broker-side position.
    pub fn seed_position(&self, position: Position) {
        self.state
            .lock()
            .positions
            .insert(position.instrument_id.clone(), position);
    }

    // ========================================================================
    // Fault injection
    // ========================================================================

    /// Fail the next submissions with `error`, before the order is recorded.
    pub fn fail_next_submits(&self, count: u32, error: BrokerError) {
        let mut state = self.state.lock();
        for _ in 0..count {
            state.faults.submit_errors.push_back(error.clone());
        }
    }

    /// Record the next `count` submissions but answer them with a timeout.
    pub fn lose_next_acks(&self, count: u32) {
        self.state.lock().faults.lost_acks += count;
    }

    /// Fail the next status queries with `error`.
    pub fn fail_next_queries(&self, count: u32, error: BrokerError) {
        let mut state = self.state.lock();
        for _ in 0..count {
            state.faults.query_errors.push_back(error.clone());
        }
    }

    /// Keep orders on `instrument_id` working until released.
    pub fn hold_fills(&self, instrument_id: impl Into<InstrumentId>) {
        self.state.lock().faults.held.insert(instrument_id.into());
    }

    /// Let held orders on `instrument_id` fill.
    pub fn release_fills(&self, instrument_id: &InstrumentId) {
        self.state.lock().faults.held.remove(instrument_id);
    }

    /// Reject every submission on `instrument_id`.
    pub fn reject_instrument(&self, instrument_id: impl Into<InstrumentId>, reason: impl Into<String>) {
        self.state
            .lock()
            .faults
            .rejected
            .insert(instrument_id.into(), reason.into());
    }

    /// Stop orders on `instrument_id` after filling only `quantity`.
    pub fn partially_fill(&self, instrument_id: impl Into<InstrumentId>, quantity: Decimal) {
        self.state
            .lock()
            .faults
            .partial
            .insert(instrument_id.into(), quantity);
    }

    // ========================================================================
    // Inspection
    // ========================================================================

    /// Number of `submit_order` calls received.
    #[must_use]
    pub fn submit_calls(&self) -> u32 {
        self.state.lock().submit_calls
    }

    /// Number of distinct orders the broker holds.
    #[must_use]
    pub fn order_count(&self) -> usize {
        self.state.lock().orders.len()
    }

    /// Broker-side position.
    #[must_use]
    pub fn position(&self, instrument_id: &InstrumentId) -> Option<Position> {
        self.state.lock().positions.get(instrument_id).cloned()
    }

    fn price_for(&self, instrument_id: &InstrumentId) -> Option<Decimal> {
        self.prices.lock().get(instrument_id).copied()
    }
}

impl PaperState {
    /// Settle a working order whose fill delay has elapsed.
    fn advance(&mut self, order_id: &OrderId, price: Option<Decimal>, fill_delay: Duration) {
        let Some(order) = self.orders.get(order_id) else {
            return;
        };
        if !matches!(order.state, PaperOrderState::Working)
            || order.accepted_at.elapsed() < fill_delay
            || self.faults.held.contains(&order.request.instrument_id)
        {
            return;
        }

        let request = order.request.clone();
        let report = match price {
            None => ExecutionReport::cancelled(order_id.clone(), "no market price"),
            Some(price) => match self.faults.partial.get(&request.instrument_id).copied() {
                Some(filled) if filled > Decimal::ZERO && filled < request.quantity.amount() => {
                    ExecutionReport::partially_filled(order_id.clone(), filled, price)
                }
                Some(_) => ExecutionReport::cancelled(order_id.clone(), "cancelled unfilled"),
                None => ExecutionReport::filled(order_id.clone(), request.quantity.amount(), price),
            },
        };

        if let Some(price) = report.average_fill_price {
            let delta = PositionDelta {
                instrument_id: request.instrument_id.clone(),
                quantity: request.side.signed(report.filled_quantity),
                price,
            };
            let position = self
                .positions
                .entry(request.instrument_id.clone())
                .or_insert_with(|| Position::flat(request.instrument_id.clone()));
            *position = position.apply(&delta);
        }

        debug!(order_id = %order_id, status = %report.status, "Paper order finished");
        if let Some(order) = self.orders.get_mut(order_id) {
            order.state = PaperOrderState::Done(report);
        }
    }
}

#[async_trait]
impl BrokerPort for PaperBroker {
    async fn submit_order(&self, request: SubmitOrderRequest) -> Result<SubmitAck, BrokerError> {
        let mut state = self.state.lock();
        state.submit_calls += 1;

        if let Some(error) = state.faults.submit_errors.pop_front() {
            return Err(error);
        }

        if let Some(existing) = state.orders.get(&request.order_id) {
            debug!(order_id = %request.order_id, "Duplicate submission, returning original ack");
            return Ok(existing.ack.clone());
        }

        let ack = match state.faults.rejected.get(&request.instrument_id) {
            Some(reason) => SubmitAck::Rejected {
                reason: reason.clone(),
            },
            None => SubmitAck::Accepted,
        };
        let order_state = match &ack {
            SubmitAck::Accepted => PaperOrderState::Working,
            SubmitAck::Rejected { reason } => {
                PaperOrderState::Done(ExecutionReport::rejected(request.order_id.clone(), reason.clone()))
            }
        };

        let order_id = request.order_id.clone();
        state.orders.insert(
            order_id.clone(),
            PaperOrder {
                request,
                ack: ack.clone(),
                accepted_at: Instant::now(),
                state: order_state,
            },
        );

        if state.faults.lost_acks > 0 {
            state.faults.lost_acks -= 1;
            debug!(order_id = %order_id, "Paper order recorded, acknowledgement dropped");
            return Err(BrokerError::Timeout {
                operation: "submit_order".to_string(),
            });
        }

        Ok(ack)
    }

    async fn query_order(&self, order_id: &OrderId) -> Result<ExecutionReport, BrokerError> {
        let price = {
            let state = self.state.lock();
            state
                .orders
                .get(order_id)
                .and_then(|o| self.price_for(&o.request.instrument_id))
        };

        let mut state = self.state.lock();
        if let Some(error) = state.faults.query_errors.pop_front() {
            return Err(error);
        }

        state.advance(order_id, price, self.fill_delay);

        let order = state
            .orders
            .get(order_id)
            .ok_or_else(|| BrokerError::OrderNotFound {
                order_id: order_id.to_string(),
            })?;
        Ok(match &order.state {
            PaperOrderState::Working => ExecutionReport::working(order_id.clone()),
            PaperOrderState::Done(report) => report.clone(),
        })
    }

    async fn positions(&self, _account_id: &AccountId) -> Result<Vec<Position>, BrokerError> {
        let state = self.state.lock();
        let mut positions: Vec<Position> = state
            .positions
            .values()
            .filter(|p| !p.is_flat())
            .cloned()
            .collect();
        positions.sort_by(|a, b| a.instrument_id.cmp(&b.instrument_id));
        Ok(positions)
    }
}
