//! Shared fixtures for integration tests.

#![allow(dead_code, clippy::expect_used, clippy::unwrap_used)]

use std::sync::Arc;
use std::time::Duration;

use chrono::FixedOffset;
use rust_decimal::Decimal;
use rust_decimal_macros::dec;

use trading_agent::application::ports::TrackedInstrument;
use trading_agent::application::services::{BrokerRetryPolicy, ExecutionEngine, ExecutionSettings};
use trading_agent::application::use_cases::{CycleSettings, RunCycleUseCase};
use trading_agent::domain::order_execution::OrderSide;
use trading_agent::domain::portfolio::Account;
use trading_agent::domain::risk_management::{
    SizingLimit, TradeDecision, TradeIntent, TradingLimits, TradingSession,
};
use trading_agent::domain::shared::{AccountId, InstrumentId, Money, Quantity};
use trading_agent::infrastructure::broker::{PaperBroker, PaperBrokerConfig};
use trading_agent::infrastructure::notification::InMemoryNotifier;
use trading_agent::infrastructure::persistence::InMemoryLedger;
use trading_agent::infrastructure::signals::ConfiguredSignals;

pub type TestEngine = ExecutionEngine<PaperBroker, InMemoryLedger, InMemoryNotifier>;
pub type TestCycle = RunCycleUseCase<PaperBroker, InMemoryLedger, InMemoryNotifier, ConfiguredSignals>;

pub const ACCOUNT: &str = "acc-1";

/// Deposit 1,000,000; risk 1% per trade; 25% position cap.
pub fn account() -> Account {
    Account::new(
        AccountId::new(ACCOUNT),
        Money::new(dec!(1_000_000)),
        dec!(0.01),
        dec!(0.25),
    )
    .expect("valid account")
}

/// Short delays so paused-clock tests advance quickly.
pub fn fast_settings() -> ExecutionSettings {
    ExecutionSettings {
        retry: BrokerRetryPolicy::new(
            3,
            Duration::from_millis(100),
            Duration::from_secs(1),
            2.0,
            0.0,
        ),
        broker_timeout: Duration::from_secs(2),
        status_poll_interval: Duration::from_millis(50),
        ledger_conflict_retries: 5,
    }
}

/// A buy decision priced at 100.
pub fn buy(instrument: &str, quantity: i64) -> TradeDecision {
    TradeDecision {
        instrument_id: InstrumentId::new(instrument),
        side: OrderSide::Buy,
        quantity: Quantity::from_i64(quantity),
        price: dec!(100),
        reduces_exposure: false,
        limited_by: SizingLimit::Requested,
    }
}

/// Everything a cycle needs, wired against in-memory adapters.
pub struct Harness {
    pub broker: Arc<PaperBroker>,
    pub ledger: Arc<InMemoryLedger>,
    pub notifier: Arc<InMemoryNotifier>,
    pub signals: Arc<ConfiguredSignals>,
    pub engine: TestEngine,
}

impl Harness {
    pub fn new() -> Self {
        Self::with_broker(PaperBrokerConfig::default())
    }

    pub fn with_broker(config: PaperBrokerConfig) -> Self {
        let broker = Arc::new(PaperBroker::new(config));
        let ledger = Arc::new(InMemoryLedger::with_account(account()));
        let notifier = Arc::new(InMemoryNotifier::new());
        let signals = Arc::new(ConfiguredSignals::new());
        let engine = ExecutionEngine::new(
            Arc::clone(&broker),
            Arc::clone(&ledger),
            Arc::clone(&notifier),
            fast_settings(),
        );
        Self {
            broker,
            ledger,
            notifier,
            signals,
            engine,
        }
    }

    /// Buy signal at `price` with a matching paper fill price.
    pub fn track_buy(&self, instrument: &str, price: Decimal) {
        self.broker.set_price(instrument, price);
        self.signals
            .set(instrument, price, TradeIntent::Buy { quantity: None });
    }

    /// Cycle over `instruments` with lot size 1, default limits and an
    /// always-open session.
    pub fn cycle(&self, instruments: &[&str], deadline: Duration, grace: Duration) -> TestCycle {
        self.cycle_with(settings(instruments, deadline, grace))
    }

    pub fn cycle_with(&self, settings: CycleSettings) -> TestCycle {
        RunCycleUseCase::new(
            self.engine.clone(),
            Arc::clone(&self.ledger),
            Arc::clone(&self.signals),
            Arc::clone(&self.notifier),
            settings,
        )
    }
}

pub fn always_open() -> TradingSession {
    TradingSession::continuous(FixedOffset::east_opt(0).unwrap())
}

pub fn settings(instruments: &[&str], deadline: Duration, grace: Duration) -> CycleSettings {
    CycleSettings {
        account_id: AccountId::new(ACCOUNT),
        instruments: instruments
            .iter()
            .map(|id| TrackedInstrument::new(*id, 1))
            .collect(),
        deadline,
        shutdown_grace: grace,
        check_drift: true,
        limits: TradingLimits::default(),
        session: always_open(),
    }
}
