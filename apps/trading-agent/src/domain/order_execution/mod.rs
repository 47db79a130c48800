//! Order Execution Bounded Context
//!
//! Order lifecycle from creation to a single terminal state.
//!
//! # Key Concepts
//!
//! - **Order Aggregate**: carries its own pre-generated id, reused verbatim
//!   as the broker idempotency key on every submission attempt
//! - **State Machine**: `Pending → Submitted → {Filled | PartiallyFilled |
//!   Rejected | Cancelled}`, `Pending → {Rejected | Failed}`
//! - **Execution Reports**: broker status snapshots folded into the aggregate

pub mod aggregate;
pub mod errors;
pub mod services;
pub mod value_objects;

pub use aggregate::{CreateOrderCommand, Order, ReconstitutedOrderParams};
pub use errors::OrderError;
pub use services::OrderStateMachine;
pub use value_objects::{ExecutionReport, OrderSide, OrderStatus};
