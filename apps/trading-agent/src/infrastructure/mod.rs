//! Infrastructure Layer
//!
//! Adapters implementing the ports defined in the application layer:
//!
//! - `broker/`: paper broker used for dry runs and tests
//! - `persistence/`: ledgers (in-memory, PostgreSQL)
//! - `notification/`: log and in-memory notifiers
//! - `signals/`: configuration-driven signal source

pub mod broker;
pub mod notification;
pub mod persistence;
pub mod signals;
