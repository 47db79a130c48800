//! Persistence Adapters
//!
//! Ledger implementations: in-memory for paper trading and tests,
//! PostgreSQL for durable runs.

pub mod in_memory;
pub mod postgres;

pub use in_memory::InMemoryLedger;
pub use postgres::PostgresLedger;
