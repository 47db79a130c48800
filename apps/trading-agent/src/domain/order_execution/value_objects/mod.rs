//! Order Execution Value Objects
//!
//! Immutable types for order management.

mod execution_report;
mod order_side;
mod order_status;

pub use execution_report::ExecutionReport;
pub use order_side::OrderSide;
pub use order_status::OrderStatus;
