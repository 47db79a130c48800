//! Application Services
//!
//! Long-lived coordinators: the execution engine that drives orders to a
//! terminal state and the scheduler that fires evaluation cycles.

mod execution_engine;
mod open_order_table;
mod retry_policy;
mod scheduler;

pub use execution_engine::{
    CarryoverReport, ExecutionEngine, ExecutionError, ExecutionSettings, OrderTicket,
};
pub use open_order_table::OpenOrderTable;
pub use retry_policy::{BrokerRetryPolicy, ExponentialBackoffCalculator};
pub use scheduler::{CycleRunner, ScheduleMode, Scheduler, SchedulerReport};
