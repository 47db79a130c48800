//! Order execution configuration.

use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::application::services::{BrokerRetryPolicy, ExecutionSettings};

/// Submission retry and tracking settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExecutionConfig {
    /// Total submission attempts per order, including the first.
    #[serde(default = "default_max_attempts")]
    pub max_attempts: u32,
    /// Delay before the first retry in milliseconds.
    #[serde(default = "default_initial_backoff_ms")]
    pub initial_backoff_ms: u64,
    /// Maximum delay between attempts in milliseconds.
    #[serde(default = "default_max_backoff_ms")]
    pub max_backoff_ms: u64,
    /// Backoff growth factor.
    #[serde(default = "default_backoff_multiplier")]
    pub backoff_multiplier: f64,
    /// Random jitter applied to each delay (0.0 disables it).
    #[serde(default)]
    pub jitter_factor: f64,
    /// Upper bound on a single broker call in milliseconds.
    #[serde(default = "default_submit_timeout_ms")]
    pub submit_timeout_ms: u64,
    /// Interval between status queries in milliseconds.
    #[serde(default = "default_status_poll_interval_ms")]
    pub status_poll_interval_ms: u64,
    /// Immediate retries after a ledger version conflict.
    #[serde(default = "default_ledger_conflict_retries")]
    pub ledger_conflict_retries: u32,
}

impl Default for ExecutionConfig {
    fn default() -> Self {
        Self {
            max_attempts: default_max_attempts(),
            initial_backoff_ms: default_initial_backoff_ms(),
            max_backoff_ms: default_max_backoff_ms(),
            backoff_multiplier: default_backoff_multiplier(),
            jitter_factor: 0.0,
            submit_timeout_ms: default_submit_timeout_ms(),
            status_poll_interval_ms: default_status_poll_interval_ms(),
            ledger_conflict_retries: default_ledger_conflict_retries(),
        }
    }
}

impl ExecutionConfig {
    /// Engine settings.
    #[must_use]
    pub const fn to_settings(&self) -> ExecutionSettings {
        ExecutionSettings {
            retry: BrokerRetryPolicy::new(
                self.max_attempts,
                Duration::from_millis(self.initial_backoff_ms),
                Duration::from_millis(self.max_backoff_ms),
                self.backoff_multiplier,
                self.jitter_factor,
            ),
            broker_timeout: Duration::from_millis(self.submit_timeout_ms),
            status_poll_interval: Duration::from_millis(self.status_poll_interval_ms),
            ledger_conflict_retries: self.ledger_conflict_retries,
        }
    }
}

const fn default_max_attempts() -> u32 {
    3
}

const fn default_initial_backoff_ms() -> u64 {
    1_000
}

const fn default_max_backoff_ms() -> u64 {
    30_000
}

const fn default_backoff_multiplier() -> f64 {
    2.0
}

const fn default_submit_timeout_ms() -> u64 {
    10_000
}

const fn default_status_poll_interval_ms() -> u64 {
    500
}

const fn default_ledger_conflict_retries() -> u32 {
    5
}
