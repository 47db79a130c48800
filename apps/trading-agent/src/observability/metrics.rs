//! Prometheus metrics for the trading agent.
//!
//! Covers order submission and settlement, ledger conflicts, cycle
//! outcomes and scheduler tick handling. Every recorder is a no-op until
//! [`init_metrics`] installs the exporter.
//!
//! # Example
//!
//! ```ignore
//! use trading_agent::observability::{init_metrics, MetricsConfig};
//!
//! let config = MetricsConfig::with_addr("0.0.0.0:9090".parse()?);
//! init_metrics(&config)?;
//!
//! record_cycle_closed("completed", 1.5);
//! ```

use metrics::{counter, gauge, histogram};
use metrics_exporter_prometheus::PrometheusBuilder;
use std::net::SocketAddr;

/// Configuration for the metrics exporter.
#[derive(Debug, Clone)]
pub struct MetricsConfig {
    /// Address to bind the metrics HTTP listener.
    pub listen_addr: SocketAddr,
    /// Histogram buckets for durations (in seconds).
    pub duration_buckets: Vec<f64>,
}

impl MetricsConfig {
    /// Create a metrics configuration listening on `addr`.
    #[must_use]
    pub fn with_addr(addr: SocketAddr) -> Self {
        Self {
            listen_addr: addr,
            // Broker round trips through full cycles: 5ms to 5min.
            duration_buckets: vec![
                0.005, 0.025, 0.1, 0.5, 1.0, 2.5, 5.0, 10.0, 30.0, 60.0, 120.0, 300.0,
            ],
        }
    }
}

/// Initialize the Prometheus metrics exporter.
///
/// This starts an HTTP server that exposes metrics at `/metrics`.
///
/// # Errors
///
/// Returns an error if the metrics exporter fails to start (e.g., port already in use).
pub fn init_metrics(config: &MetricsConfig) -> Result<(), MetricsError> {
    PrometheusBuilder::new()
        .with_http_listener(config.listen_addr)
        .set_buckets(&config.duration_buckets)
        .map_err(|e| MetricsError::Configuration(e.to_string()))?
        .install()
        .map_err(|e| MetricsError::Installation(e.to_string()))?;

    tracing::info!(
        addr = %config.listen_addr,
        "Prometheus metrics exporter started"
    );

    Ok(())
}

/// Error type for metrics operations.
#[derive(Debug, thiserror::Error)]
pub enum MetricsError {
    /// Failed to configure metrics exporter.
    #[error("metrics configuration error: {0}")]
    Configuration(String),
    /// Failed to install metrics exporter.
    #[error("metrics installation error: {0}")]
    Installation(String),
}

// ============================================================================
// Order Execution Metrics
// ============================================================================

/// Record one submission attempt.
///
/// # Arguments
///
/// * `result` - `accepted`, `rejected`, `timeout` or `error`
/// * `latency_seconds` - Time from submit to response in seconds
pub fn record_submit_attempt(result: &str, latency_seconds: f64) {
    counter!(
        "order_submit_attempts_total",
        "result" => result.to_string()
    )
    .increment(1);

    histogram!("order_submit_latency_seconds").record(latency_seconds);
}

/// Record an order reaching its terminal status in the ledger.
pub fn record_order_terminal(status: &str, instrument: &str) {
    counter!(
        "orders_terminal_total",
        "status" => status.to_string(),
        "instrument" => instrument.to_string()
    )
    .increment(1);
}

/// Record a carried-over order the broker no longer knows.
pub fn record_order_lost(instrument: &str) {
    counter!(
        "orders_lost_total",
        "instrument" => instrument.to_string()
    )
    .increment(1);
}

/// Record a decision refused by a pre-trade guard.
///
/// # Arguments
///
/// * `guard` - `kill_switch`, `session`, `concurrent_positions`, `daily_trades` or `daily_loss`
pub fn record_trade_gated(guard: &str, instrument: &str) {
    counter!(
        "decisions_gated_total",
        "guard" => guard.to_string(),
        "instrument" => instrument.to_string()
    )
    .increment(1);
}

/// Record a decision suppressed because the instrument has an open order.
pub fn record_decision_suppressed(instrument: &str) {
    counter!(
        "decisions_suppressed_total",
        "instrument" => instrument.to_string()
    )
    .increment(1);
}

/// Update the number of open orders.
#[allow(clippy::cast_precision_loss)]
pub fn update_open_orders(count: usize) {
    gauge!("open_orders").set(count as f64);
}

/// Record a ledger version conflict during a terminal write.
pub fn record_ledger_conflict(instrument: &str) {
    counter!(
        "ledger_write_conflicts_total",
        "instrument" => instrument.to_string()
    )
    .increment(1);
}

/// Record a ledger write that failed outright.
pub fn record_ledger_failure(operation: &str) {
    counter!(
        "ledger_failures_total",
        "operation" => operation.to_string()
    )
    .increment(1);
}

// ============================================================================
// Cycle Metrics
// ============================================================================

/// Record a closed cycle.
///
/// # Arguments
///
/// * `outcome` - `completed`, `partially_completed` or `aborted`
/// * `duration_seconds` - Wall time from open to close
pub fn record_cycle_closed(outcome: &str, duration_seconds: f64) {
    counter!(
        "cycles_total",
        "outcome" => outcome.to_string()
    )
    .increment(1);

    histogram!(
        "cycle_duration_seconds",
        "outcome" => outcome.to_string()
    )
    .record(duration_seconds);
}

/// Record a scheduler trigger dropped because a cycle was running.
pub fn record_tick_skipped(trigger: &str) {
    counter!(
        "scheduler_ticks_skipped_total",
        "trigger" => trigger.to_string()
    )
    .increment(1);
}

/// Record a notification that could not be delivered.
pub fn record_notification_failure(kind: &str) {
    counter!(
        "notification_failures_total",
        "kind" => kind.to_string()
    )
    .increment(1);
}

/// Record a position mismatch between ledger and broker.
pub fn record_position_drift(instrument: &str) {
    counter!(
        "position_drift_total",
        "instrument" => instrument.to_string()
    )
    .increment(1);
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_with_addr() {
        let addr: SocketAddr = "127.0.0.1:8080".parse().unwrap();
        let config = MetricsConfig::with_addr(addr);
        assert_eq!(config.listen_addr.port(), 8080);
        assert!(config.duration_buckets.windows(2).all(|w| w[0] < w[1]));
    }

    #[test]
    fn test_recorders_without_exporter() {
        // No recorder installed; calls must be harmless.
        record_submit_attempt("accepted", 0.015);
        record_order_terminal("FILLED", "SBER");
        record_decision_suppressed("SBER");
        update_open_orders(2);
        record_ledger_conflict("SBER");
        record_ledger_failure("record_terminal");
        record_cycle_closed("completed", 1.2);
        record_tick_skipped("interval");
        record_notification_failure("run_closed");
        record_position_drift("SBER");
        record_order_lost("GAZP");
        record_trade_gated("daily_trades", "SBER");
    }
}
