//! Configuration module for the trading agent.
//!
//! Loads a YAML file, interpolates environment variables and validates the
//! result before any adapter is built.
//!
//! # Usage
//!
//! ```rust,ignore
//! use trading_agent::config::load_config;
//!
//! // Load from default path (config.yaml)
//! let config = load_config(None)?;
//!
//! // Load from custom path
//! let config = load_config(Some("deploy/agent.yaml"))?;
//! println!("deadline: {:?}", config.scheduler.cycle_deadline());
//! ```

mod account;
mod broker;
mod execution;
mod instruments;
mod limits;
mod observability;
mod persistence;
mod scheduler;

use std::collections::HashSet;

use serde::{Deserialize, Serialize};
use thiserror::Error;

pub use account::AccountConfig;
pub use broker::BrokerConfig;
pub use execution::ExecutionConfig;
pub use instruments::InstrumentConfig;
pub use limits::{LimitsConfig, SessionConfig};
pub use observability::ObservabilityConfig;
pub use persistence::{LedgerBackend, PersistenceConfig};
pub use scheduler::{SchedulerConfig, SchedulerMode};

use crate::application::ports::TrackedInstrument;

/// Configuration errors.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// Failed to read configuration file.
    #[error("Failed to read config file '{path}': {source}")]
    ReadError {
        /// Path to the config file.
        path: String,
        /// The underlying IO error.
        source: std::io::Error,
    },

    /// Failed to parse YAML configuration.
    #[error("Failed to parse config YAML: {0}")]
    ParseError(#[from] serde_yaml_bw::Error),

    /// Configuration validation failed.
    #[error("Config validation failed: {0}")]
    ValidationError(String),

    /// Missing required environment variable.
    #[error("Missing required environment variable: {0}")]
    MissingEnvVar(String),
}

/// Root configuration structure.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Account risk configuration.
    pub account: AccountConfig,
    /// Cycle scheduling.
    #[serde(default)]
    pub scheduler: SchedulerConfig,
    /// Order submission and tracking.
    #[serde(default)]
    pub execution: ExecutionConfig,
    /// Paper broker.
    #[serde(default)]
    pub broker: BrokerConfig,
    /// Account-wide pre-trade limits.
    #[serde(default)]
    pub limits: LimitsConfig,
    /// Trading session the guards admit orders in.
    #[serde(default)]
    pub session: SessionConfig,
    /// Ledger storage.
    #[serde(default)]
    pub persistence: PersistenceConfig,
    /// Logging and metrics.
    #[serde(default)]
    pub observability: ObservabilityConfig,
    /// Instruments evaluated every cycle.
    #[serde(default)]
    pub instruments: Vec<InstrumentConfig>,
}

impl Config {
    /// Instruments in evaluation order.
    #[must_use]
    pub fn tracked_instruments(&self) -> Vec<TrackedInstrument> {
        self.instruments.iter().map(InstrumentConfig::tracked).collect()
    }
}

// ============================================
// Configuration Loading
// ============================================

/// Load configuration from a YAML file with environment variable interpolation.
///
/// # Arguments
///
/// * `path` - Optional path to the config file. Defaults to "config.yaml".
///
/// # Errors
///
/// Returns a `ConfigError` if the file cannot be read, parsed, or validated.
pub fn load_config(path: Option<&str>) -> Result<Config, ConfigError> {
    let path = path.unwrap_or("config.yaml");

    let contents = std::fs::read_to_string(path).map_err(|e| ConfigError::ReadError {
        path: path.to_string(),
        source: e,
    })?;

    load_config_from_string(&contents)
}

/// Load configuration from a YAML string (useful for testing).
///
/// # Errors
///
/// Returns a `ConfigError` if the YAML cannot be parsed or validated.
pub fn load_config_from_string(yaml: &str) -> Result<Config, ConfigError> {
    let interpolated = interpolate_env_vars(yaml);
    let config: Config = serde_yaml_bw::from_str(&interpolated)?;
    validate_config(&config)?;
    Ok(config)
}

/// Interpolate environment variables in a string.
///
/// Supports both `${VAR}` and `${VAR:-default}` syntax.
#[allow(clippy::expect_used)] // Regex is compile-time constant; expect() is safe here
fn interpolate_env_vars(input: &str) -> String {
    use std::sync::OnceLock;

    static ENV_VAR_REGEX: OnceLock<regex::Regex> = OnceLock::new();

    let re = ENV_VAR_REGEX.get_or_init(|| {
        regex::Regex::new(r"\$\{([A-Za-z_][A-Za-z0-9_]*)(?::-([^}]*))?\}")
            .expect("env var regex is valid")
    });

    re.replace_all(input, |cap: &regex::Captures<'_>| {
        let default_value = cap.get(2).map(|m| m.as_str());
        match std::env::var(&cap[1]) {
            Ok(v) if !v.is_empty() => v,
            _ => default_value.map_or_else(String::new, str::to_string),
        }
    })
    .into_owned()
}

/// Validate configuration values.
fn validate_config(config: &Config) -> Result<(), ConfigError> {
    config
        .account
        .to_account()
        .map_err(|e| ConfigError::ValidationError(format!("account: {e}")))?;

    let scheduler = &config.scheduler;
    if scheduler.mode == SchedulerMode::Periodic && scheduler.interval_secs == 0 {
        return Err(ConfigError::ValidationError(
            "scheduler.interval_secs must be positive".to_string(),
        ));
    }
    if scheduler.cycle_deadline_secs == 0 {
        return Err(ConfigError::ValidationError(
            "scheduler.cycle_deadline_secs must be positive".to_string(),
        ));
    }

    let execution = &config.execution;
    if execution.max_attempts == 0 {
        return Err(ConfigError::ValidationError(
            "execution.max_attempts must be at least 1".to_string(),
        ));
    }
    if execution.backoff_multiplier < 1.0 {
        return Err(ConfigError::ValidationError(
            "execution.backoff_multiplier must be at least 1.0".to_string(),
        ));
    }
    if !(0.0..=1.0).contains(&execution.jitter_factor) {
        return Err(ConfigError::ValidationError(
            "execution.jitter_factor must be between 0.0 and 1.0".to_string(),
        ));
    }
    if execution.submit_timeout_ms == 0 || execution.status_poll_interval_ms == 0 {
        return Err(ConfigError::ValidationError(
            "execution.submit_timeout_ms and status_poll_interval_ms must be positive".to_string(),
        ));
    }

    if config.persistence.backend == LedgerBackend::Postgres
        && config
            .persistence
            .database_url
            .as_deref()
            .is_none_or(str::is_empty)
    {
        return Err(ConfigError::MissingEnvVar(
            "persistence.database_url is required for the postgres backend".to_string(),
        ));
    }

    if let Some(addr) = &config.observability.metrics_addr {
        addr.parse::<std::net::SocketAddr>().map_err(|e| {
            ConfigError::ValidationError(format!("observability.metrics_addr '{addr}': {e}"))
        })?;
    }

    config.limits.validate()?;
    config.session.to_session()?;

    let mut seen = HashSet::new();
    for instrument in &config.instruments {
        if instrument.id.trim().is_empty() {
            return Err(ConfigError::ValidationError(
                "instrument id must not be empty".to_string(),
            ));
        }
        if !seen.insert(instrument.id.as_str()) {
            return Err(ConfigError::ValidationError(format!(
                "instrument '{}' listed twice",
                instrument.id
            )));
        }
        if instrument.lot_size == 0 {
            return Err(ConfigError::ValidationError(format!(
                "instrument '{}': lot_size must be at least 1",
                instrument.id
            )));
        }
        if instrument.price <= rust_decimal::Decimal::ZERO {
            return Err(ConfigError::ValidationError(format!(
                "instrument '{}': price must be positive",
                instrument.id
            )));
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::application::services::ScheduleMode;
    use crate::domain::risk_management::TradeIntent;
    use rust_decimal_macros::dec;
    use std::time::Duration;
    use test_case::test_case;

    const MINIMAL: &str = r"
account:
  deposit_value: 1000000
";

    #[test]
    fn test_load_minimal_config() {
        let config = match load_config_from_string(MINIMAL) {
            Ok(c) => c,
            Err(e) => panic!("should load minimal config: {e}"),
        };

        assert_eq!(config.account.id, "main");
        assert_eq!(config.account.risk_per_trade_pct, dec!(0.01));
        assert_eq!(config.account.max_position_pct, dec!(0.25));
        assert_eq!(config.scheduler.mode, SchedulerMode::Periodic);
        assert_eq!(config.scheduler.cycle_deadline(), Duration::from_secs(30));
        assert_eq!(config.scheduler.shutdown_grace(), Duration::from_secs(60));
        assert_eq!(config.execution.max_attempts, 3);
        assert_eq!(config.persistence.backend, LedgerBackend::Memory);
        assert_eq!(config.limits.max_daily_trades, 10);
        assert_eq!(config.session.open.as_deref(), Some("10:05"));
        assert!(config.instruments.is_empty());
    }

    #[test]
    fn test_execution_settings_from_defaults() {
        let settings = ExecutionConfig::default().to_settings();
        assert_eq!(settings.retry.max_attempts, 3);
        assert_eq!(settings.retry.initial_backoff, Duration::from_secs(1));
        assert_eq!(settings.status_poll_interval, Duration::from_millis(500));
        assert_eq!(settings.ledger_conflict_retries, 5);
    }

    #[test]
    fn test_env_var_with_default_when_missing() {
        let input = "url: ${TRADING_AGENT_TEST_NONEXISTENT_VAR:-postgres://localhost/agent}";
        assert_eq!(interpolate_env_vars(input), "url: postgres://localhost/agent");
    }

    #[test]
    fn test_env_var_without_default_becomes_empty() {
        let input = "url: ${TRADING_AGENT_TEST_UNLIKELY_TO_EXIST}";
        assert_eq!(interpolate_env_vars(input), "url: ");
    }

    #[test]
    #[expect(clippy::literal_string_with_formatting_args)] // ${...} is env var syntax, not format args
    fn test_env_var_uses_existing() {
        let input = "path: ${PATH:-default}";
        let result = interpolate_env_vars(input);
        assert_ne!(result, "path: default");
        assert!(result.starts_with("path: "));
    }

    #[test]
    fn test_full_config_parse() {
        let yaml = r#"
account:
  id: "broker-1"
  deposit_value: 500000
  risk_per_trade_pct: 0.02
  max_position_pct: 0.1

scheduler:
  mode: one_shot
  cycle_deadline_secs: 45
  shutdown_grace_secs: 90

execution:
  max_attempts: 5
  initial_backoff_ms: 200
  submit_timeout_ms: 2000

broker:
  fill_delay_ms: 250

observability:
  log_level: debug
  json: true
  metrics_addr: "127.0.0.1:9100"

instruments:
  - id: SBER
    lot_size: 10
    price: 250.5
    signal:
      action: buy
      quantity: 100
  - id: GAZP
    price: 160
    signal:
      action: close
  - id: LKOH
    price: 7000
"#;

        let config = match load_config_from_string(yaml) {
            Ok(c) => c,
            Err(e) => panic!("should load full config: {e}"),
        };

        assert_eq!(config.account.to_account().unwrap().id().as_str(), "broker-1");
        assert_eq!(config.scheduler.schedule_mode(), ScheduleMode::OneShot);
        assert_eq!(config.scheduler.shutdown_grace(), Duration::from_secs(90));
        assert_eq!(config.execution.to_settings().retry.max_attempts, 5);
        assert_eq!(config.broker.fill_delay(), Duration::from_millis(250));
        assert!(config.observability.logging().json);

        assert_eq!(config.instruments.len(), 3);
        assert_eq!(config.instruments[0].lot_size, 10);
        assert_eq!(
            config.instruments[0].signal,
            TradeIntent::Buy {
                quantity: Some(dec!(100))
            }
        );
        assert_eq!(config.instruments[1].signal, TradeIntent::Close);
        assert_eq!(config.instruments[2].signal, TradeIntent::Hold);
        assert_eq!(config.instruments[2].lot_size, 1);

        let tracked = config.tracked_instruments();
        assert_eq!(tracked[0].instrument_id.as_str(), "SBER");
    }

    #[test_case("account:\n  deposit_value: 1000\n  risk_per_trade_pct: 1.5\n", "account" ; "risk above one")]
    #[test_case("account:\n  deposit_value: 1000\nexecution:\n  max_attempts: 0\n", "max_attempts" ; "zero attempts")]
    #[test_case("account:\n  deposit_value: 1000\nscheduler:\n  interval_secs: 0\n", "interval_secs" ; "zero interval")]
    #[test_case("account:\n  deposit_value: 1000\ninstruments:\n  - id: SBER\n    price: 1\n  - id: SBER\n    price: 2\n", "twice" ; "duplicate instrument")]
    #[test_case("account:\n  deposit_value: 1000\ninstruments:\n  - id: SBER\n    price: 1\n    lot_size: 0\n", "lot_size" ; "zero lot size")]
    #[test_case("account:\n  deposit_value: 1000\npersistence:\n  backend: postgres\n", "database_url" ; "postgres without url")]
    #[test_case("account:\n  deposit_value: 1000\nobservability:\n  metrics_addr: nowhere\n", "metrics_addr" ; "bad metrics address")]
    #[test_case("account:\n  deposit_value: 1000\nlimits:\n  max_daily_trades: 0\n", "max_daily_trades" ; "zero daily trades")]
    #[test_case("account:\n  deposit_value: 1000\nlimits:\n  max_daily_loss: -5\n", "max_daily_loss" ; "negative daily loss")]
    #[test_case("account:\n  deposit_value: 1000\nsession:\n  open: \"25:00\"\n", "session.open" ; "bad session time")]
    #[test_case("account:\n  deposit_value: 1000\nsession:\n  utc_offset_minutes: 2000\n", "utc_offset_minutes" ; "offset out of range")]
    fn test_validation_rejects(yaml: &str, needle: &str) {
        let Err(err) = load_config_from_string(yaml) else {
            panic!("expected validation error containing {needle}");
        };
        assert!(err.to_string().contains(needle), "{err}");
    }

    #[test]
    fn test_missing_account_is_parse_error() {
        let result = load_config_from_string("scheduler:\n  mode: one_shot\n");
        assert!(matches!(result, Err(ConfigError::ParseError(_))));
    }
}
