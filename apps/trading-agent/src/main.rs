//! Trading Agent Binary
//!
//! Runs evaluation cycles against the paper broker until stopped.
//!
//! # Usage
//!
//! ```bash
//! cargo run --bin trading-agent -- --config config.yaml
//! cargo run --bin trading-agent -- --config config.yaml --once
//! cargo run --bin trading-agent -- --config config.yaml --disable-trading
//! ```
//!
//! # Environment Variables
//!
//! - `AGENT_CONFIG`: Config file path when `--config` is absent (default: config.yaml)
//! - `RUST_LOG`: Overrides the configured log level
//!
//! # Signals
//!
//! - `SIGINT`/`SIGTERM`: stop admitting work, let open orders finish within the grace window
//! - `SIGUSR1`: run a cycle now (periodic mode)

use std::collections::HashMap;
use std::net::SocketAddr;
use std::process::ExitCode;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result, bail};
use clap::Parser;
use tokio::signal;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

use trading_agent::application::ports::LedgerPort;
use trading_agent::application::services::{
    ExecutionEngine, ScheduleMode, Scheduler, SchedulerReport,
};
use trading_agent::application::use_cases::{CycleSettings, RunCycleUseCase};
use trading_agent::config::{Config, LedgerBackend, load_config};
use trading_agent::domain::run_history::RunOutcome;
use trading_agent::domain::shared::InstrumentId;
use trading_agent::infrastructure::broker::{PaperBroker, PaperBrokerConfig};
use trading_agent::infrastructure::notification::LogNotifier;
use trading_agent::infrastructure::persistence::{InMemoryLedger, PostgresLedger};
use trading_agent::infrastructure::signals::ConfiguredSignals;
use trading_agent::observability::{MetricsConfig, init_logging, init_metrics};

/// Upper bound on waiting for order drivers after the scheduler stops.
const SHUTDOWN_TIMEOUT: Duration = Duration::from_secs(30);

#[derive(Parser, Debug)]
#[command(name = "trading-agent")]
#[command(version)]
#[command(about = "Risk-bounded trading agent against a paper broker", long_about = None)]
struct CliArgs {
    /// Config file path (default: config.yaml)
    #[arg(short, long, env = "AGENT_CONFIG")]
    config: Option<String>,

    /// Run a single cycle and exit
    #[arg(long)]
    once: bool,

    /// Switch trading off for the configured account and exit
    #[arg(long, conflicts_with_all = ["once", "enable_trading"])]
    disable_trading: bool,

    /// Switch trading back on for the configured account and exit
    #[arg(long, conflicts_with = "once")]
    enable_trading: bool,
}

impl CliArgs {
    /// Kill switch change requested on the command line.
    const fn trading_switch(&self) -> Option<bool> {
        match (self.disable_trading, self.enable_trading) {
            (true, _) => Some(false),
            (false, true) => Some(true),
            (false, false) => None,
        }
    }
}

#[tokio::main]
async fn main() -> Result<ExitCode> {
    load_dotenv();

    let args = CliArgs::parse();
    let config = load_config(args.config.as_deref())
        .with_context(|| format!("loading {}", args.config.as_deref().unwrap_or("config.yaml")))?;

    init_logging(&config.observability.logging()).context("initializing logging")?;

    if let Some(addr) = &config.observability.metrics_addr {
        let addr: SocketAddr = addr.parse().context("parsing metrics address")?;
        init_metrics(&MetricsConfig::with_addr(addr)).context("starting metrics exporter")?;
    }

    let mode = if args.once {
        ScheduleMode::OneShot
    } else {
        config.scheduler.schedule_mode()
    };

    tracing::info!(
        account = %config.account.id,
        instruments = config.instruments.len(),
        backend = ?config.persistence.backend,
        mode = ?mode,
        "Starting trading agent"
    );

    let shutdown = CancellationToken::new();
    let (run_now_tx, run_now_rx) = mpsc::channel(1);
    tokio::spawn(shutdown_signal(shutdown.clone()));
    tokio::spawn(run_now_signal(run_now_tx));

    let report = match config.persistence.backend {
        LedgerBackend::Memory => {
            let ledger = Arc::new(InMemoryLedger::new());
            run_agent(&config, mode, args.trading_switch(), ledger, shutdown, run_now_rx).await?
        }
        LedgerBackend::Postgres => {
            let Some(url) = config.persistence.database_url.as_deref() else {
                bail!("persistence.database_url is required for the postgres backend");
            };
            let ledger = PostgresLedger::connect(url, config.persistence.max_connections)
                .await
                .context("connecting to the ledger database")?;
            ledger.ensure_schema().await.context("creating ledger schema")?;
            let switch = args.trading_switch();
            run_agent(&config, mode, switch, Arc::new(ledger), shutdown, run_now_rx).await?
        }
    };

    tracing::info!(
        cycles = report.cycles_run,
        skipped = report.ticks_skipped,
        last_outcome = ?report.last_outcome,
        "Trading agent stopped"
    );

    Ok(match report.last_outcome {
        Some(RunOutcome::Aborted) => ExitCode::from(2),
        _ => ExitCode::SUCCESS,
    })
}

/// Wire adapters around `ledger` and run the scheduler until it stops.
///
/// With `trading_switch` set, only the account's kill switch is written.
async fn run_agent<L: LedgerPort + 'static>(
    config: &Config,
    mode: ScheduleMode,
    trading_switch: Option<bool>,
    ledger: Arc<L>,
    shutdown: CancellationToken,
    run_now: mpsc::Receiver<()>,
) -> Result<SchedulerReport> {
    let account = config
        .account
        .to_account()
        .context("building account from configuration")?;
    ledger
        .upsert_account(&account)
        .await
        .context("writing account to the ledger")?;

    if let Some(enabled) = trading_switch {
        ledger
            .set_trading_enabled(account.id(), enabled)
            .await
            .context("writing the kill switch")?;
        tracing::info!(account = %account.id(), enabled, "Trading switch updated");
        return Ok(SchedulerReport::default());
    }

    let session = config
        .session
        .to_session()
        .context("building trading session from configuration")?;

    let prices: HashMap<InstrumentId, _> = config
        .instruments
        .iter()
        .map(|i| (InstrumentId::new(i.id.clone()), i.price))
        .collect();
    let broker = Arc::new(PaperBroker::new(PaperBrokerConfig {
        fill_delay: config.broker.fill_delay(),
        prices,
    }));
    let signals = Arc::new(ConfiguredSignals::from_entries(config.instruments.iter().map(
        |i| (InstrumentId::new(i.id.clone()), i.price, i.signal),
    )));
    let notifier = Arc::new(LogNotifier::new());

    let engine = ExecutionEngine::new(
        broker,
        Arc::clone(&ledger),
        Arc::clone(&notifier),
        config.execution.to_settings(),
    );
    let cycle = Arc::new(RunCycleUseCase::new(
        engine.clone(),
        ledger,
        signals,
        notifier,
        CycleSettings {
            account_id: account.id().clone(),
            instruments: config.tracked_instruments(),
            deadline: config.scheduler.cycle_deadline(),
            shutdown_grace: config.scheduler.shutdown_grace(),
            check_drift: config.scheduler.check_drift,
            limits: config.limits.to_limits(),
            session,
        },
    ));

    let scheduler = Scheduler::new(cycle, mode);
    let report = scheduler.run(shutdown, run_now).await;

    if tokio::time::timeout(SHUTDOWN_TIMEOUT, engine.shutdown())
        .await
        .is_err()
    {
        tracing::warn!(
            timeout_secs = SHUTDOWN_TIMEOUT.as_secs(),
            open_orders = engine.open_order_count(),
            "Order drivers did not stop in time"
        );
    }

    Ok(report)
}

/// Load .env file from current directory or any ancestor directory.
fn load_dotenv() {
    if dotenvy::dotenv().is_ok() {
        return;
    }

    if let Ok(cwd) = std::env::current_dir() {
        let mut dir = cwd.as_path();
        while let Some(parent) = dir.parent() {
            let env_path = parent.join(".env");
            if env_path.exists() {
                let _ = dotenvy::from_path(&env_path);
                return;
            }
            dir = parent;
        }
    }
}

/// Cancel `shutdown` on SIGINT or SIGTERM.
///
/// # Panics
///
/// Panics if signal handlers cannot be installed; a process that cannot
/// hear termination signals must not start trading.
#[allow(clippy::expect_used)]
async fn shutdown_signal(shutdown: CancellationToken) {
    let ctrl_c = async {
        signal::ctrl_c()
            .await
            .expect("signal handler installation is critical for graceful shutdown");
    };

    #[cfg(unix)]
    let terminate = async {
        signal::unix::signal(signal::unix::SignalKind::terminate())
            .expect("SIGTERM handler installation is critical for graceful shutdown")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => {
            tracing::info!("Received Ctrl+C, initiating shutdown");
        }
        () = terminate => {
            tracing::info!("Received SIGTERM, initiating shutdown");
        }
    }

    shutdown.cancel();
}

/// Forward SIGUSR1 as an on-demand cycle request.
async fn run_now_signal(run_now: mpsc::Sender<()>) {
    #[cfg(unix)]
    {
        let mut user1 = match signal::unix::signal(signal::unix::SignalKind::user_defined1()) {
            Ok(stream) => stream,
            Err(e) => {
                tracing::warn!(error = %e, "SIGUSR1 handler unavailable, on-demand cycles disabled");
                return;
            }
        };
        while user1.recv().await.is_some() {
            tracing::info!("Received SIGUSR1, requesting cycle");
            if run_now.try_send(()).is_err() {
                tracing::debug!("Cycle request already pending");
            }
        }
    }

    #[cfg(not(unix))]
    {
        let _run_now = run_now;
        std::future::pending::<()>().await;
    }
}
