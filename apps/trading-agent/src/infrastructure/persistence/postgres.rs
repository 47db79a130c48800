//! PostgreSQL ledger.
//!
//! Positions carry a version column used for optimistic concurrency. A
//! terminal write locks the order row, checks the version and upserts the
//! position and the order inside one transaction.

use std::collections::HashMap;
use std::str::FromStr;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use sqlx::postgres::{PgPoolOptions, PgRow};
use sqlx::{PgPool, Postgres, Row, Transaction};
use tracing::{debug, info};

use crate::application::ports::{
    LedgerError, LedgerPort, LedgerSnapshot, TerminalWrite, TerminalWriteOutcome,
    VersionedPosition,
};
use crate::domain::order_execution::{Order, OrderSide, OrderStatus, ReconstitutedOrderParams};
use crate::domain::portfolio::{Account, Position};
use crate::domain::risk_management::DailyActivity;
use crate::domain::run_history::RunRecord;
use crate::domain::shared::{AccountId, InstrumentId, Money, OrderId, Quantity, RunId, Timestamp};

const SCHEMA: [&str; 7] = [
    r"
    CREATE TABLE IF NOT EXISTS agent_accounts (
        account_id TEXT PRIMARY KEY,
        deposit_value NUMERIC NOT NULL,
        risk_per_trade_pct NUMERIC NOT NULL,
        max_position_pct NUMERIC NOT NULL,
        trading_enabled BOOLEAN NOT NULL DEFAULT TRUE,
        updated_at TIMESTAMPTZ NOT NULL DEFAULT NOW()
    )
    ",
    r"
    CREATE TABLE IF NOT EXISTS agent_positions (
        instrument_id TEXT PRIMARY KEY,
        quantity NUMERIC NOT NULL,
        average_price NUMERIC NOT NULL,
        version BIGINT NOT NULL,
        updated_at TIMESTAMPTZ NOT NULL DEFAULT NOW()
    )
    ",
    r"
    CREATE TABLE IF NOT EXISTS agent_orders (
        order_id TEXT PRIMARY KEY,
        run_id TEXT NOT NULL,
        instrument_id TEXT NOT NULL,
        side TEXT NOT NULL,
        quantity NUMERIC NOT NULL,
        reference_price NUMERIC NOT NULL,
        status TEXT NOT NULL,
        submit_attempts INTEGER NOT NULL,
        filled_quantity NUMERIC NOT NULL,
        average_fill_price NUMERIC,
        status_reason TEXT,
        realized_pnl NUMERIC NOT NULL DEFAULT 0,
        created_at TIMESTAMPTZ NOT NULL,
        updated_at TIMESTAMPTZ NOT NULL,
        terminal_at TIMESTAMPTZ
    )
    ",
    r"
    CREATE TABLE IF NOT EXISTS agent_runs (
        run_id TEXT PRIMARY KEY,
        started_at TIMESTAMPTZ NOT NULL,
        ended_at TIMESTAMPTZ,
        decisions TEXT[] NOT NULL,
        outcome TEXT,
        carryover TEXT[] NOT NULL,
        abort_reason TEXT
    )
    ",
    "ALTER TABLE agent_accounts ADD COLUMN IF NOT EXISTS trading_enabled BOOLEAN NOT NULL DEFAULT TRUE",
    "ALTER TABLE agent_orders ADD COLUMN IF NOT EXISTS realized_pnl NUMERIC NOT NULL DEFAULT 0",
    "CREATE INDEX IF NOT EXISTS agent_orders_created_at_idx ON agent_orders (created_at)",
];

const UPSERT_ORDER: &str = r"
    INSERT INTO agent_orders (
        order_id, run_id, instrument_id, side, quantity, reference_price,
        status, submit_attempts, filled_quantity, average_fill_price,
        status_reason, created_at, updated_at, terminal_at
    ) VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14)
    ON CONFLICT (order_id) DO UPDATE SET
        status = EXCLUDED.status,
        submit_attempts = EXCLUDED.submit_attempts,
        filled_quantity = EXCLUDED.filled_quantity,
        average_fill_price = EXCLUDED.average_fill_price,
        status_reason = EXCLUDED.status_reason,
        updated_at = EXCLUDED.updated_at,
        terminal_at = EXCLUDED.terminal_at
    WHERE agent_orders.status IN ('PENDING', 'SUBMITTED')
";

const UPSERT_RUN: &str = r"
    INSERT INTO agent_runs (
        run_id, started_at, ended_at, decisions, outcome, carryover, abort_reason
    ) VALUES ($1, $2, $3, $4, $5, $6, $7)
    ON CONFLICT (run_id) DO UPDATE SET
        ended_at = EXCLUDED.ended_at,
        decisions = EXCLUDED.decisions,
        outcome = EXCLUDED.outcome,
        carryover = EXCLUDED.carryover,
        abort_reason = EXCLUDED.abort_reason
";

impl From<sqlx::Error> for LedgerError {
    fn from(err: sqlx::Error) -> Self {
        Self::Unavailable {
            message: err.to_string(),
        }
    }
}

/// PostgreSQL implementation of [`LedgerPort`].
#[derive(Debug, Clone)]
pub struct PostgresLedger {
    pool: PgPool,
}

impl PostgresLedger {
    /// Connect with a bounded pool.
    ///
    /// # Errors
    ///
    /// Returns an error if the database cannot be reached.
    pub async fn connect(database_url: &str, max_connections: u32) -> Result<Self, LedgerError> {
        let pool = PgPoolOptions::new()
            .max_connections(max_connections)
            .connect(database_url)
            .await?;

        info!(max_connections, "PostgreSQL ledger pool initialized");
        Ok(Self { pool })
    }

    /// Create the ledger tables if they do not exist.
    ///
    /// # Errors
    ///
    /// Returns an error if any statement fails.
    pub async fn ensure_schema(&self) -> Result<(), LedgerError> {
        for statement in SCHEMA {
            sqlx::query(statement).execute(&self.pool).await?;
        }
        debug!("Ledger schema ensured");
        Ok(())
    }

    async fn write_order<'c>(
        tx: &mut Transaction<'c, Postgres>,
        order: &Order,
    ) -> Result<u64, LedgerError> {
        let result = sqlx::query(UPSERT_ORDER)
            .bind(order.id().as_str())
            .bind(order.run_id().as_str())
            .bind(order.instrument_id().as_str())
            .bind(order.side().as_str())
            .bind(order.quantity().amount())
            .bind(order.reference_price())
            .bind(order.status().as_str())
            .bind(i32::try_from(order.submit_attempts()).unwrap_or(i32::MAX))
            .bind(order.filled_quantity())
            .bind(order.average_fill_price())
            .bind(order.status_reason())
            .bind(order.created_at().as_datetime())
            .bind(order.updated_at().as_datetime())
            .bind(order.terminal_at().map(|t| t.as_datetime()))
            .execute(&mut **tx)
            .await?;
        Ok(result.rows_affected())
    }
}

#[async_trait]
impl LedgerPort for PostgresLedger {
    async fn upsert_account(&self, account: &Account) -> Result<(), LedgerError> {
        sqlx::query(
            r"
            INSERT INTO agent_accounts (
                account_id, deposit_value, risk_per_trade_pct, max_position_pct, updated_at
            ) VALUES ($1, $2, $3, $4, NOW())
            ON CONFLICT (account_id) DO UPDATE SET
                deposit_value = EXCLUDED.deposit_value,
                risk_per_trade_pct = EXCLUDED.risk_per_trade_pct,
                max_position_pct = EXCLUDED.max_position_pct,
                updated_at = NOW()
            ",
        )
        .bind(account.id().as_str())
        .bind(account.deposit_value().amount())
        .bind(account.risk_per_trade_pct())
        .bind(account.max_position_pct())
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn set_trading_enabled(
        &self,
        account_id: &AccountId,
        enabled: bool,
    ) -> Result<(), LedgerError> {
        let updated = sqlx::query(
            "UPDATE agent_accounts SET trading_enabled = $2, updated_at = NOW() WHERE account_id = $1",
        )
        .bind(account_id.as_str())
        .bind(enabled)
        .execute(&self.pool)
        .await?;

        if updated.rows_affected() == 0 {
            return Err(LedgerError::AccountNotFound {
                account_id: account_id.to_string(),
            });
        }
        info!(account = %account_id, enabled, "Trading switch updated");
        Ok(())
    }

    async fn snapshot(&self, account_id: &AccountId) -> Result<LedgerSnapshot, LedgerError> {
        let mut tx = self.pool.begin().await?;
        sqlx::query("SET TRANSACTION ISOLATION LEVEL REPEATABLE READ READ ONLY")
            .execute(&mut *tx)
            .await?;

        let account_row = sqlx::query(
            "SELECT account_id, deposit_value, risk_per_trade_pct, max_position_pct, trading_enabled FROM agent_accounts WHERE account_id = $1",
        )
        .bind(account_id.as_str())
        .fetch_optional(&mut *tx)
        .await?
        .ok_or_else(|| LedgerError::AccountNotFound {
            account_id: account_id.to_string(),
        })?;
        let account = row_to_account(&account_row)?;
        let trading_enabled = column::<bool>(&account_row, "trading_enabled")?;

        let position_rows = sqlx::query(
            "SELECT instrument_id, quantity, average_price FROM agent_positions WHERE quantity <> 0",
        )
        .fetch_all(&mut *tx)
        .await?;
        let mut positions = HashMap::with_capacity(position_rows.len());
        for row in &position_rows {
            let position = row_to_position(row)?;
            positions.insert(position.instrument_id.clone(), position);
        }

        let order_rows = sqlx::query(
            "SELECT * FROM agent_orders WHERE status IN ('PENDING', 'SUBMITTED') ORDER BY created_at",
        )
        .fetch_all(&mut *tx)
        .await?;
        let open_orders = order_rows
            .iter()
            .map(row_to_order)
            .collect::<Result<Vec<_>, _>>()?;

        tx.commit().await?;

        debug!(
            positions = positions.len(),
            open_orders = open_orders.len(),
            "Ledger snapshot loaded"
        );
        Ok(LedgerSnapshot {
            account,
            positions,
            open_orders,
            trading_enabled,
        })
    }

    async fn position(
        &self,
        instrument_id: &InstrumentId,
    ) -> Result<VersionedPosition, LedgerError> {
        let row = sqlx::query(
            "SELECT instrument_id, quantity, average_price, version FROM agent_positions WHERE instrument_id = $1",
        )
        .bind(instrument_id.as_str())
        .fetch_optional(&self.pool)
        .await?;

        match row {
            Some(row) => Ok(VersionedPosition {
                position: row_to_position(&row)?,
                version: row_version(&row)?,
            }),
            None => Ok(VersionedPosition {
                position: Position::flat(instrument_id.clone()),
                version: 0,
            }),
        }
    }

    async fn save_order(&self, order: &Order) -> Result<(), LedgerError> {
        if order.is_terminal() {
            return Err(LedgerError::InvalidOrderState {
                order_id: order.id().to_string(),
                message: "terminal orders are written with record_terminal".to_string(),
            });
        }

        let mut tx = self.pool.begin().await?;
        let written = Self::write_order(&mut tx, order).await?;
        tx.commit().await?;

        if written == 0 {
            return Err(LedgerError::InvalidOrderState {
                order_id: order.id().to_string(),
                message: "order already terminal".to_string(),
            });
        }
        Ok(())
    }

    async fn record_terminal(
        &self,
        write: TerminalWrite,
    ) -> Result<TerminalWriteOutcome, LedgerError> {
        let order = write.order;
        if !order.is_terminal() {
            return Err(LedgerError::InvalidOrderState {
                order_id: order.id().to_string(),
                message: format!("status {} is not terminal", order.status()),
            });
        }

        let mut tx = self.pool.begin().await?;

        let stored_status: Option<String> =
            sqlx::query_scalar("SELECT status FROM agent_orders WHERE order_id = $1 FOR UPDATE")
                .bind(order.id().as_str())
                .fetch_optional(&mut *tx)
                .await?;
        if let Some(status) = stored_status {
            if parse_status(&status)?.is_terminal() {
                tx.rollback().await?;
                return Ok(TerminalWriteOutcome::AlreadyRecorded);
            }
        }

        let instrument_id = order.instrument_id();
        let current = sqlx::query(
            "SELECT instrument_id, quantity, average_price, version FROM agent_positions WHERE instrument_id = $1 FOR UPDATE",
        )
        .bind(instrument_id.as_str())
        .fetch_optional(&mut *tx)
        .await?;
        let (position, version) = match &current {
            Some(row) => (row_to_position(row)?, row_version(row)?),
            None => (Position::flat(instrument_id.clone()), 0),
        };

        if version != write.expected_version {
            tx.rollback().await?;
            return Err(LedgerError::WriteConflict {
                instrument_id: instrument_id.to_string(),
                expected: write.expected_version,
                actual: version,
            });
        }

        let realized = write
            .delta
            .as_ref()
            .map_or(Decimal::ZERO, |delta| position.realized_pnl(delta));

        let (position, version) = match &write.delta {
            Some(delta) => {
                let next = position.apply(delta);
                let next_version = version + 1;
                let updated = sqlx::query(
                    r"
                    INSERT INTO agent_positions (instrument_id, quantity, average_price, version, updated_at)
                    VALUES ($1, $2, $3, $4, NOW())
                    ON CONFLICT (instrument_id) DO UPDATE SET
                        quantity = EXCLUDED.quantity,
                        average_price = EXCLUDED.average_price,
                        version = EXCLUDED.version,
                        updated_at = NOW()
                    WHERE agent_positions.version = $5
                    ",
                )
                .bind(instrument_id.as_str())
                .bind(next.quantity)
                .bind(next.average_price)
                .bind(to_db_version(next_version)?)
                .bind(to_db_version(version)?)
                .execute(&mut *tx)
                .await?;

                if updated.rows_affected() == 0 {
                    tx.rollback().await?;
                    return Err(LedgerError::WriteConflict {
                        instrument_id: instrument_id.to_string(),
                        expected: write.expected_version,
                        actual: version + 1,
                    });
                }
                (next, next_version)
            }
            None => (position, version),
        };

        Self::write_order(&mut tx, &order).await?;
        sqlx::query("UPDATE agent_orders SET realized_pnl = $2 WHERE order_id = $1")
            .bind(order.id().as_str())
            .bind(realized)
            .execute(&mut *tx)
            .await?;
        tx.commit().await?;

        debug!(
            order_id = %order.id(),
            status = %order.status(),
            version,
            "Terminal order recorded"
        );
        Ok(TerminalWriteOutcome::Applied { position, version })
    }

    async fn daily_activity(&self, since: Timestamp) -> Result<DailyActivity, LedgerError> {
        let row = sqlx::query(
            r"
            SELECT
                (SELECT COUNT(*) FROM agent_orders
                  WHERE created_at >= $1
                    AND (status IN ('PENDING', 'SUBMITTED') OR filled_quantity > 0)) AS trades,
                (SELECT COALESCE(SUM(realized_pnl), 0) FROM agent_orders
                  WHERE terminal_at >= $1) AS realized_pnl
            ",
        )
        .bind(since.as_datetime())
        .fetch_one(&self.pool)
        .await?;

        let trades = column::<i64>(&row, "trades")?;
        Ok(DailyActivity {
            trades: u32::try_from(trades).unwrap_or(u32::MAX),
            realized_pnl: column::<Decimal>(&row, "realized_pnl")?,
        })
    }

    async fn open_run(&self, record: &RunRecord) -> Result<(), LedgerError> {
        upsert_run(&self.pool, record).await
    }

    async fn close_run(&self, record: &RunRecord) -> Result<(), LedgerError> {
        upsert_run(&self.pool, record).await
    }
}

async fn upsert_run(pool: &PgPool, record: &RunRecord) -> Result<(), LedgerError> {
    let decisions: Vec<String> = record.decisions().iter().map(ToString::to_string).collect();
    let carryover: Vec<String> = record.carryover().iter().map(ToString::to_string).collect();

    sqlx::query(UPSERT_RUN)
        .bind(record.id().as_str())
        .bind(record.started_at().as_datetime())
        .bind(record.ended_at().map(|t| t.as_datetime()))
        .bind(decisions)
        .bind(record.outcome().map(|o| o.as_str()))
        .bind(carryover)
        .bind(record.abort_reason())
        .execute(pool)
        .await?;
    Ok(())
}

// ============================================================================
// Row mapping
// ============================================================================

fn column<'r, T>(row: &'r PgRow, name: &str) -> Result<T, LedgerError>
where
    T: sqlx::Decode<'r, Postgres> + sqlx::Type<Postgres>,
{
    row.try_get::<T, _>(name)
        .map_err(|e| LedgerError::Integrity(format!("{name}: {e}")))
}

fn row_to_account(row: &PgRow) -> Result<Account, LedgerError> {
    Account::new(
        AccountId::new(column::<String>(row, "account_id")?),
        Money::new(column::<Decimal>(row, "deposit_value")?),
        column::<Decimal>(row, "risk_per_trade_pct")?,
        column::<Decimal>(row, "max_position_pct")?,
    )
    .map_err(|e| LedgerError::Integrity(e.to_string()))
}

fn row_to_position(row: &PgRow) -> Result<Position, LedgerError> {
    Ok(Position::new(
        InstrumentId::new(column::<String>(row, "instrument_id")?),
        column::<Decimal>(row, "quantity")?,
        column::<Decimal>(row, "average_price")?,
    ))
}

fn row_version(row: &PgRow) -> Result<u64, LedgerError> {
    let version = column::<i64>(row, "version")?;
    u64::try_from(version).map_err(|_| LedgerError::Integrity(format!("negative version {version}")))
}

fn to_db_version(version: u64) -> Result<i64, LedgerError> {
    i64::try_from(version).map_err(|_| LedgerError::Integrity(format!("version {version} overflows")))
}

fn parse_status(s: &str) -> Result<OrderStatus, LedgerError> {
    OrderStatus::from_str(s).map_err(LedgerError::Integrity)
}

fn row_to_order(row: &PgRow) -> Result<Order, LedgerError> {
    let side = OrderSide::from_str(&column::<String>(row, "side")?).map_err(LedgerError::Integrity)?;
    let status = parse_status(&column::<String>(row, "status")?)?;
    let attempts = column::<i32>(row, "submit_attempts")?;

    Ok(Order::reconstitute(ReconstitutedOrderParams {
        id: OrderId::new(column::<String>(row, "order_id")?),
        run_id: RunId::new(column::<String>(row, "run_id")?),
        instrument_id: InstrumentId::new(column::<String>(row, "instrument_id")?),
        side,
        quantity: Quantity::new(column::<Decimal>(row, "quantity")?),
        reference_price: column::<Decimal>(row, "reference_price")?,
        status,
        submit_attempts: u32::try_from(attempts).unwrap_or(0),
        filled_quantity: column::<Decimal>(row, "filled_quantity")?,
        average_fill_price: column::<Option<Decimal>>(row, "average_fill_price")?,
        status_reason: column::<Option<String>>(row, "status_reason")?,
        created_at: Timestamp::new(column::<DateTime<Utc>>(row, "created_at")?),
        updated_at: Timestamp::new(column::<DateTime<Utc>>(row, "updated_at")?),
        terminal_at: column::<Option<DateTime<Utc>>>(row, "terminal_at")?.map(Timestamp::new),
    }))
}
