//! Scheduler configuration.

use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::application::services::ScheduleMode;

/// How cycles are triggered.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum SchedulerMode {
    /// Fire a cycle every `interval_secs`.
    #[default]
    Periodic,
    /// Run a single cycle and exit.
    OneShot,
}

/// Scheduler configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SchedulerConfig {
    /// Trigger mode.
    #[serde(default)]
    pub mode: SchedulerMode,
    /// Seconds between cycle starts in periodic mode.
    #[serde(default = "default_interval_secs")]
    pub interval_secs: u64,
    /// Run the first periodic cycle immediately.
    #[serde(default = "default_true")]
    pub run_on_start: bool,
    /// Seconds a cycle waits for its orders to reach a terminal status.
    #[serde(default = "default_cycle_deadline_secs")]
    pub cycle_deadline_secs: u64,
    /// Seconds granted to open orders after shutdown is requested.
    #[serde(default = "default_shutdown_grace_secs")]
    pub shutdown_grace_secs: u64,
    /// Compare ledger and broker positions at the start of every cycle.
    #[serde(default = "default_true")]
    pub check_drift: bool,
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self {
            mode: SchedulerMode::default(),
            interval_secs: default_interval_secs(),
            run_on_start: true,
            cycle_deadline_secs: default_cycle_deadline_secs(),
            shutdown_grace_secs: default_shutdown_grace_secs(),
            check_drift: true,
        }
    }
}

impl SchedulerConfig {
    /// Scheduler mode.
    #[must_use]
    pub const fn schedule_mode(&self) -> ScheduleMode {
        match self.mode {
            SchedulerMode::OneShot => ScheduleMode::OneShot,
            SchedulerMode::Periodic => ScheduleMode::Periodic {
                interval: Duration::from_secs(self.interval_secs),
                run_on_start: self.run_on_start,
            },
        }
    }

    /// Per-cycle deadline.
    #[must_use]
    pub const fn cycle_deadline(&self) -> Duration {
        Duration::from_secs(self.cycle_deadline_secs)
    }

    /// Shutdown grace window.
    #[must_use]
    pub const fn shutdown_grace(&self) -> Duration {
        Duration::from_secs(self.shutdown_grace_secs)
    }
}

const fn default_true() -> bool {
    true
}

const fn default_interval_secs() -> u64 {
    300
}

const fn default_cycle_deadline_secs() -> u64 {
    30
}

const fn default_shutdown_grace_secs() -> u64 {
    60
}
