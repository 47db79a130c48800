//! Ledger persistence configuration.

use serde::{Deserialize, Serialize};

/// Ledger storage backend.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum LedgerBackend {
    /// Process-local ledger, lost on exit.
    #[default]
    Memory,
    /// PostgreSQL ledger.
    Postgres,
}

/// Ledger persistence configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PersistenceConfig {
    /// Storage backend.
    #[serde(default)]
    pub backend: LedgerBackend,
    /// Connection string for the PostgreSQL backend.
    #[serde(default)]
    pub database_url: Option<String>,
    /// Maximum pooled connections.
    #[serde(default = "default_max_connections")]
    pub max_connections: u32,
}

impl Default for PersistenceConfig {
    fn default() -> Self {
        Self {
            backend: LedgerBackend::default(),
            database_url: None,
            max_connections: default_max_connections(),
        }
    }
}

const fn default_max_connections() -> u32 {
    5
}
