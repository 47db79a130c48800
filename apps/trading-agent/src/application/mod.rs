//! Application Layer
//!
//! The application layer orchestrates domain logic through use cases.
//! It defines:
//!
//! - **Ports**: Interfaces for the broker, ledger, signal source and notifier
//! - **Services**: The execution engine and the cycle scheduler
//! - **Use Cases**: The single evaluation-and-execution cycle

pub mod ports;
pub mod services;
pub mod use_cases;
