//! Domain Layer
//!
//! The innermost layer containing business logic with zero infrastructure dependencies.
//! This layer defines:
//!
//! - **Aggregates**: Consistency boundaries with invariants
//! - **Value Objects**: Immutable domain types with equality by value
//! - **Domain Services**: Stateless business logic
//!
//! # Bounded Contexts
//!
//! - [`portfolio`]: Account risk configuration and signed positions
//! - [`risk_management`]: Risk-bounded position sizing
//! - [`order_execution`]: Order lifecycle and status transitions
//! - [`run_history`]: Per-cycle run records

pub mod order_execution;
pub mod portfolio;
pub mod risk_management;
pub mod run_history;
pub mod shared;
