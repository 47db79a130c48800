// Allow unwrap/expect in tests - tests should panic on unexpected errors
// Allow test-specific patterns and pedantic lints in test code
#![cfg_attr(
    test,
    allow(
        clippy::unwrap_used,
        clippy::expect_used,
        clippy::float_cmp,
        clippy::significant_drop_tightening,
        clippy::too_many_lines,
        clippy::match_same_arms,
        clippy::needless_pass_by_value,
        clippy::needless_collect,
        clippy::option_if_let_else,
        clippy::default_trait_access,
        clippy::items_after_statements,
        clippy::or_fun_call
    )
)]

//! Trading Agent - Decision and Execution Core
//!
//! Periodically sizes positions against an explicit risk budget and drives
//! the resulting orders to a single terminal state, keeping the ledger in
//! step with confirmed broker effects only.
//!
//! # Architecture (Clean Architecture + DDD + Hexagonal)
//!
//! ## Layers (inside → outside)
//!
//! - **Domain**: Core business logic with no I/O
//!   - `portfolio`: Account risk configuration and signed positions
//!   - `risk_management`: Risk-bounded position sizing (`RiskSizer`)
//!   - `order_execution`: Order aggregate and status lifecycle
//!   - `run_history`: Per-cycle run records
//!
//! - **Application**: Orchestration
//!   - `ports`: `BrokerPort`, `LedgerPort`, `NotificationPort`, `SignalPort`
//!   - `services`: `ExecutionEngine`, `Scheduler`, retry policy, open-order table
//!   - `use_cases`: `RunCycleUseCase`
//!
//! - **Infrastructure**: Adapters
//!   - `broker`: Paper broker
//!   - `persistence`: In-memory and PostgreSQL ledgers
//!   - `notification`: Log and in-memory notifiers
//!   - `signals`: Configuration-driven signals
//!
//! - **Config** and **Observability**: YAML configuration, tracing and
//!   Prometheus metrics.

#![forbid(unsafe_code)]
#![warn(missing_docs)]
#![warn(clippy::pedantic)]

// =============================================================================
// Clean Architecture Layers
// =============================================================================

/// Domain layer - Core business logic with no external dependencies.
pub mod domain;

/// Application layer - Use cases, services and port definitions.
pub mod application;

/// Infrastructure layer - Adapters and external integrations.
pub mod infrastructure;

/// Configuration loading and validation.
pub mod config;

/// Logging and metrics.
pub mod observability;

// =============================================================================
// Re-exports
// =============================================================================

// Domain re-exports
pub use domain::order_execution::{Order, OrderSide, OrderStatus};
pub use domain::portfolio::{Account, Position};
pub use domain::risk_management::{RiskSizer, SizingDecision, TradeDecision, TradeIntent, TradeSignal};
pub use domain::run_history::{RunOutcome, RunRecord};
pub use domain::shared::{AccountId, InstrumentId, Money, OrderId, Quantity, RunId, Timestamp};

// Application re-exports
pub use application::ports::{
    BrokerError, BrokerPort, LedgerError, LedgerPort, NotificationPort, SignalPort,
    TrackedInstrument,
};
pub use application::services::{
    ExecutionEngine, ExecutionSettings, ScheduleMode, Scheduler, SchedulerReport,
};
pub use application::use_cases::{CycleReport, CycleSettings, RunCycleUseCase};

// Infrastructure re-exports
pub use infrastructure::broker::PaperBroker;
pub use infrastructure::notification::{InMemoryNotifier, LogNotifier};
pub use infrastructure::persistence::{InMemoryLedger, PostgresLedger};
pub use infrastructure::signals::ConfiguredSignals;
