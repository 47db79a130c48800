//! Broker Adapters
//!
//! Implementations of `BrokerPort`.

pub mod paper;

pub use paper::{PaperBroker, PaperBrokerConfig};
