//! Scheduler
//!
//! Fires evaluation cycles, one at a time. A trigger that arrives while a
//! cycle is still running is dropped, never queued. On shutdown no new
//! cycle starts and the in-flight one is awaited; the cycle itself bounds
//! that wait with its grace window.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio::time::{self, MissedTickBehavior};
use tokio_util::sync::CancellationToken;

use crate::application::use_cases::CycleReport;
use crate::domain::run_history::RunOutcome;
use crate::observability::metrics;

/// Something that runs one evaluation cycle.
#[async_trait]
pub trait CycleRunner: Send + Sync + 'static {
    /// Run a cycle to completion. `shutdown` cuts admission of new work.
    async fn run_cycle(&self, shutdown: CancellationToken) -> CycleReport;
}

/// How cycles are fired.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScheduleMode {
    /// Run exactly one cycle.
    OneShot,
    /// Run a cycle every `interval`.
    Periodic {
        /// Time between cycle starts.
        interval: Duration,
        /// Fire the first cycle immediately instead of after one interval.
        run_on_start: bool,
    },
}

/// What the scheduler did before stopping.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SchedulerReport {
    /// Cycles that ran to completion.
    pub cycles_run: u32,
    /// Triggers dropped because a cycle was running.
    pub ticks_skipped: u32,
    /// Outcome of the most recent cycle.
    pub last_outcome: Option<RunOutcome>,
}

#[derive(Debug, Clone, Copy)]
enum Trigger {
    Interval,
    RunNow,
}

impl Trigger {
    const fn as_str(self) -> &'static str {
        match self {
            Self::Interval => "interval",
            Self::RunNow => "run_now",
        }
    }
}

/// Cycle scheduler.
pub struct Scheduler<R: CycleRunner> {
    runner: Arc<R>,
    mode: ScheduleMode,
}

impl<R: CycleRunner> Scheduler<R> {
    /// Create a new scheduler.
    pub const fn new(runner: Arc<R>, mode: ScheduleMode) -> Self {
        Self { runner, mode }
    }

    /// Run until the mode is exhausted or `shutdown` fires.
    ///
    /// `run_now` carries on-demand cycle requests in periodic mode.
    pub async fn run(
        &self,
        shutdown: CancellationToken,
        run_now: mpsc::Receiver<()>,
    ) -> SchedulerReport {
        match self.mode {
            ScheduleMode::OneShot => self.run_once(shutdown).await,
            ScheduleMode::Periodic {
                interval,
                run_on_start,
            } => {
                self.run_periodic(interval, run_on_start, shutdown, run_now)
                    .await
            }
        }
    }

    /// Run a single cycle.
    pub async fn run_once(&self, shutdown: CancellationToken) -> SchedulerReport {
        let mut report = SchedulerReport::default();
        if shutdown.is_cancelled() {
            tracing::info!("Shutdown requested before the cycle started");
            return report;
        }

        let cycle = self.runner.run_cycle(shutdown).await;
        report.cycles_run = 1;
        report.last_outcome = Some(cycle.outcome());
        report
    }

    async fn run_periodic(
        &self,
        interval: Duration,
        run_on_start: bool,
        shutdown: CancellationToken,
        mut run_now: mpsc::Receiver<()>,
    ) -> SchedulerReport {
        let start = if run_on_start {
            time::Instant::now()
        } else {
            time::Instant::now() + interval
        };
        let mut ticker = time::interval_at(start, interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

        let mut report = SchedulerReport::default();
        let mut in_flight: Option<JoinHandle<CycleReport>> = None;
        let mut run_now_open = true;

        tracing::info!(
            interval_secs = interval.as_secs(),
            run_on_start,
            "Periodic scheduler started"
        );

        loop {
            let trigger = tokio::select! {
                biased;
                () = shutdown.cancelled() => break,
                _ = ticker.tick() => Trigger::Interval,
                request = run_now.recv(), if run_now_open => match request {
                    Some(()) => Trigger::RunNow,
                    None => {
                        run_now_open = false;
                        continue;
                    }
                },
            };

            if in_flight.as_ref().is_some_and(|handle| !handle.is_finished()) {
                report.ticks_skipped += 1;
                metrics::record_tick_skipped(trigger.as_str());
                tracing::info!(trigger = trigger.as_str(), "Cycle still running, trigger skipped");
                continue;
            }

            if let Some(handle) = in_flight.take() {
                Self::collect(handle.await, &mut report);
            }

            tracing::debug!(trigger = trigger.as_str(), "Starting cycle");
            let runner = Arc::clone(&self.runner);
            let token = shutdown.clone();
            in_flight = Some(tokio::spawn(async move { runner.run_cycle(token).await }));
        }

        if let Some(handle) = in_flight.take() {
            tracing::info!("Shutdown requested, waiting for in-flight cycle");
            Self::collect(handle.await, &mut report);
        }

        tracing::info!(
            cycles = report.cycles_run,
            skipped = report.ticks_skipped,
            "Periodic scheduler stopped"
        );
        report
    }

    fn collect(result: Result<CycleReport, tokio::task::JoinError>, report: &mut SchedulerReport) {
        match result {
            Ok(cycle) => {
                report.cycles_run += 1;
                report.last_outcome = Some(cycle.outcome());
            }
            Err(e) => {
                tracing::error!(error = %e, "Cycle task failed");
            }
        }
    }
}
