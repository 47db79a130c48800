//! Broker configuration.

use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Paper broker settings.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct BrokerConfig {
    /// Milliseconds an accepted order stays working before it fills.
    #[serde(default)]
    pub fill_delay_ms: u64,
}

impl BrokerConfig {
    /// Fill delay.
    #[must_use]
    pub const fn fill_delay(&self) -> Duration {
        Duration::from_millis(self.fill_delay_ms)
    }
}
