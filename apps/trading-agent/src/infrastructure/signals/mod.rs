//! Signal Adapters

pub mod configured;

pub use configured::ConfiguredSignals;
