//! Observability module for metrics and logging.
//!
//! Structured logging through `tracing` and Prometheus metrics export.

mod logging;
pub mod metrics;

pub use self::logging::{LoggingConfig, LoggingError, init_logging};
pub use self::metrics::{MetricsConfig, MetricsError, init_metrics};
