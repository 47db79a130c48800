//! Application Use Cases
//!
//! Use cases orchestrate domain logic to fulfill application requirements.

mod run_cycle;

pub use run_cycle::{CycleReport, CycleSettings, RunCycleUseCase};
