//! Observability configuration for logging and metrics.

use serde::{Deserialize, Serialize};

use crate::observability::LoggingConfig;

/// Observability configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ObservabilityConfig {
    /// Log level for the agent's own targets.
    #[serde(default = "default_log_level")]
    pub log_level: String,
    /// Emit JSON log lines.
    #[serde(default)]
    pub json: bool,
    /// Prometheus listener address; metrics are not exported when absent.
    #[serde(default)]
    pub metrics_addr: Option<String>,
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            log_level: default_log_level(),
            json: false,
            metrics_addr: None,
        }
    }
}

impl ObservabilityConfig {
    /// Logging settings.
    #[must_use]
    pub fn logging(&self) -> LoggingConfig {
        LoggingConfig {
            level: self.log_level.clone(),
            json: self.json,
        }
    }
}

fn default_log_level() -> String {
    "info".to_string()
}
