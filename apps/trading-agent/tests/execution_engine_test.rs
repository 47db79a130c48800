//! Execution engine integration tests.
//!
//! Drive single orders through the paper broker and the in-memory ledger,
//! with injected broker and ledger faults.

#![allow(clippy::expect_used, clippy::unwrap_used)]

mod common;

use std::collections::HashMap;
use std::time::Duration;

use rust_decimal_macros::dec;

use common::{Harness, buy};
use trading_agent::application::ports::BrokerError;
use trading_agent::application::services::ExecutionError;
use trading_agent::domain::order_execution::OrderStatus;
use trading_agent::domain::portfolio::Position;
use trading_agent::domain::shared::{AccountId, InstrumentId, RunId};

fn sber() -> InstrumentId {
    InstrumentId::new("SBER")
}

// ============================================
// Submission
// ============================================

#[tokio::test(start_paused = true)]
async fn test_fill_updates_ledger_position() {
    let harness = Harness::new();
    harness.broker.set_price("SBER", dec!(100));

    let mut ticket = harness.engine.submit(&buy("SBER", 100), &RunId::generate()).await.unwrap();
    assert_eq!(ticket.wait_terminal().await, Some(OrderStatus::Filled));

    let position = harness.ledger.stored_position(&sber()).unwrap();
    assert_eq!(position.quantity, dec!(100));
    assert_eq!(position.average_price, dec!(100));
    assert_eq!(harness.ledger.position_mutations(&sber()), 1);
    assert!(!harness.engine.has_open_order(&sber()));
}

#[tokio::test(start_paused = true)]
async fn test_lost_ack_retry_creates_single_order() {
    let harness = Harness::new();
    harness.broker.set_price("SBER", dec!(100));
    harness.broker.lose_next_acks(1);

    let mut ticket = harness.engine.submit(&buy("SBER", 50), &RunId::generate()).await.unwrap();
    assert_eq!(ticket.wait_terminal().await, Some(OrderStatus::Filled));

    assert_eq!(harness.broker.submit_calls(), 2);
    assert_eq!(harness.broker.order_count(), 1);
    assert_eq!(harness.ledger.position_mutations(&sber()), 1);
    assert_eq!(
        harness.broker.position(&sber()).unwrap().quantity,
        harness.ledger.stored_position(&sber()).unwrap().quantity
    );

    let stored = harness.ledger.order(ticket.order_id()).unwrap();
    assert_eq!(stored.submit_attempts(), 2);
}

#[tokio::test(start_paused = true)]
async fn test_exhausted_retries_fail_order_and_notify() {
    let harness = Harness::new();
    harness.broker.set_price("SBER", dec!(100));
    harness.broker.fail_next_submits(
        3,
        BrokerError::ConnectionError {
            message: "connection reset".to_string(),
        },
    );

    let mut ticket = harness.engine.submit(&buy("SBER", 10), &RunId::generate()).await.unwrap();
    assert_eq!(ticket.wait_terminal().await, Some(OrderStatus::Failed));

    let stored = harness.ledger.order(ticket.order_id()).unwrap();
    assert_eq!(stored.status(), OrderStatus::Failed);
    assert_eq!(stored.submit_attempts(), 3);
    assert_eq!(harness.ledger.position_mutations(&sber()), 0);
    assert_eq!(harness.notifier.sent_of_kind("order_failed").len(), 1);
    assert!(!harness.engine.has_open_order(&sber()));
}

#[tokio::test(start_paused = true)]
async fn test_exhausted_submission_found_at_broker_is_tracked() {
    let harness = Harness::new();
    harness.broker.set_price("SBER", dec!(100));
    // Two attempts fail outright; the last reaches the broker but its ack is lost.
    harness.broker.fail_next_submits(
        2,
        BrokerError::ConnectionError {
            message: "connection reset".to_string(),
        },
    );
    harness.broker.lose_next_acks(1);

    let mut ticket = harness.engine.submit(&buy("SBER", 10), &RunId::generate()).await.unwrap();
    assert_eq!(ticket.wait_terminal().await, Some(OrderStatus::Filled));

    assert_eq!(harness.broker.submit_calls(), 3);
    assert_eq!(harness.broker.order_count(), 1);
    assert_eq!(harness.ledger.position_mutations(&sber()), 1);
    assert!(harness.notifier.sent_of_kind("order_failed").is_empty());
}

#[tokio::test(start_paused = true)]
async fn test_non_retryable_error_fails_immediately() {
    let harness = Harness::new();
    harness.broker.fail_next_submits(
        1,
        BrokerError::Unknown {
            message: "account disabled".to_string(),
        },
    );

    let mut ticket = harness.engine.submit(&buy("SBER", 10), &RunId::generate()).await.unwrap();
    assert_eq!(ticket.wait_terminal().await, Some(OrderStatus::Failed));
    assert_eq!(harness.broker.submit_calls(), 1);
}

#[tokio::test(start_paused = true)]
async fn test_rejection_is_terminal_without_position_change() {
    let harness = Harness::new();
    harness.broker.set_price("SBER", dec!(100));
    harness.broker.reject_instrument("SBER", "insufficient buying power");

    let mut ticket = harness.engine.submit(&buy("SBER", 10), &RunId::generate()).await.unwrap();
    assert_eq!(ticket.wait_terminal().await, Some(OrderStatus::Rejected));

    let stored = harness.ledger.order(ticket.order_id()).unwrap();
    assert_eq!(stored.status_reason(), Some("insufficient buying power"));
    assert!(harness.ledger.stored_position(&sber()).is_none());
    assert_eq!(harness.broker.submit_calls(), 1);
}

#[tokio::test(start_paused = true)]
async fn test_partial_fill_is_terminal() {
    let harness = Harness::new();
    harness.broker.set_price("SBER", dec!(100));
    harness.broker.partially_fill("SBER", dec!(40));

    let mut ticket = harness.engine.submit(&buy("SBER", 100), &RunId::generate()).await.unwrap();
    assert_eq!(ticket.wait_terminal().await, Some(OrderStatus::PartiallyFilled));
    assert_eq!(harness.ledger.stored_position(&sber()).unwrap().quantity, dec!(40));
}

// ============================================
// Open-order table
// ============================================

#[tokio::test(start_paused = true)]
async fn test_second_decision_for_open_instrument_is_refused() {
    let harness = Harness::new();
    harness.broker.set_price("SBER", dec!(100));
    harness.broker.hold_fills("SBER");

    let run_id = RunId::generate();
    let first = harness.engine.submit(&buy("SBER", 10), &run_id).await.unwrap();
    let second = harness.engine.submit(&buy("SBER", 20), &run_id).await;

    match second {
        Err(ExecutionError::OpenOrderExists { order_id, .. }) => {
            assert_eq!(order_id, first.order_id().to_string());
        }
        other => panic!("expected OpenOrderExists, got {other:?}"),
    }

    tokio::time::sleep(Duration::from_secs(1)).await;
    assert_eq!(harness.broker.order_count(), 1);
    assert_eq!(harness.ledger.orders_for(&sber()).len(), 1);
}

#[tokio::test(start_paused = true)]
async fn test_instrument_released_after_terminal_write() {
    let harness = Harness::new();
    harness.broker.set_price("SBER", dec!(100));

    let run_id = RunId::generate();
    let mut first = harness.engine.submit(&buy("SBER", 10), &run_id).await.unwrap();
    first.wait_terminal().await;

    let mut second = harness.engine.submit(&buy("SBER", 10), &run_id).await.unwrap();
    assert_eq!(second.wait_terminal().await, Some(OrderStatus::Filled));
    assert_eq!(harness.ledger.stored_position(&sber()).unwrap().quantity, dec!(20));
    assert_eq!(harness.ledger.position_mutations(&sber()), 2);
}

// ============================================
// Ledger writes
// ============================================

#[tokio::test(start_paused = true)]
async fn test_ledger_conflicts_are_retried() {
    let harness = Harness::new();
    harness.broker.set_price("SBER", dec!(100));
    harness.ledger.inject_conflicts(&sber(), 2);

    let mut ticket = harness.engine.submit(&buy("SBER", 10), &RunId::generate()).await.unwrap();
    assert_eq!(ticket.wait_terminal().await, Some(OrderStatus::Filled));
    assert_eq!(harness.ledger.position_mutations(&sber()), 1);
}

#[tokio::test(start_paused = true)]
async fn test_failed_terminal_write_leaves_order_open() {
    let harness = Harness::new();
    harness.broker.set_price("SBER", dec!(100));
    harness.ledger.set_reject_terminal_writes(true);

    let mut ticket = harness.engine.submit(&buy("SBER", 10), &RunId::generate()).await.unwrap();
    assert_eq!(ticket.wait_terminal().await, None);

    let stored = harness.ledger.order(ticket.order_id()).unwrap();
    assert!(!stored.is_terminal());
    assert!(!harness.engine.has_open_order(&sber()));
}

#[tokio::test(start_paused = true)]
async fn test_concurrent_instruments_settle_independently() {
    let harness = Harness::new();
    let run_id = RunId::generate();
    let mut tickets = Vec::new();
    for instrument in ["SBER", "GAZP", "LKOH", "MGNT"] {
        harness.broker.set_price(instrument, dec!(100));
        tickets.push(harness.engine.submit(&buy(instrument, 10), &run_id).await.unwrap());
    }
    assert_eq!(harness.engine.open_order_count(), 4);

    for ticket in &mut tickets {
        assert_eq!(ticket.wait_terminal().await, Some(OrderStatus::Filled));
    }
    assert_eq!(harness.engine.open_order_count(), 0);
}

// ============================================
// Drift
// ============================================

#[tokio::test(start_paused = true)]
async fn test_drift_check_rereads_stale_snapshot() {
    let harness = Harness::new();
    harness.broker.set_price("SBER", dec!(100));

    // Snapshot taken while the position was still flat.
    let stale = HashMap::from([(sber(), Position::flat(sber()))]);

    let mut ticket = harness.engine.submit(&buy("SBER", 10), &RunId::generate()).await.unwrap();
    assert_eq!(ticket.wait_terminal().await, Some(OrderStatus::Filled));

    let drifts = harness
        .engine
        .check_position_drift(&AccountId::new(common::ACCOUNT), &stale)
        .await;

    assert!(drifts.is_empty());
    assert!(harness.notifier.sent_of_kind("position_drift").is_empty());
}

#[tokio::test(start_paused = true)]
async fn test_drift_check_reports_confirmed_mismatch() {
    let harness = Harness::new();
    harness
        .broker
        .seed_position(Position::new(sber(), dec!(30), dec!(100)));

    let drifts = harness
        .engine
        .check_position_drift(&AccountId::new(common::ACCOUNT), &HashMap::new())
        .await;

    assert_eq!(drifts.len(), 1);
    assert_eq!(drifts[0].ledger_quantity, dec!(0));
    assert_eq!(drifts[0].broker_quantity, dec!(30));
}

// ============================================
// Shutdown
// ============================================

#[tokio::test(start_paused = true)]
async fn test_shutdown_leaves_working_orders_open() {
    let harness = Harness::new();
    harness.broker.set_price("SBER", dec!(100));
    harness.broker.hold_fills("SBER");

    let ticket = harness.engine.submit(&buy("SBER", 10), &RunId::generate()).await.unwrap();
    while ticket.status() != OrderStatus::Submitted {
        tokio::time::sleep(Duration::from_millis(10)).await;
    }

    harness.engine.shutdown().await;

    let stored = harness.ledger.order(ticket.order_id()).unwrap();
    assert_eq!(stored.status(), OrderStatus::Submitted);
    assert_eq!(harness.engine.open_order_count(), 0);
    assert!(matches!(
        harness.engine.submit(&buy("GAZP", 10), &RunId::generate()).await,
        Err(ExecutionError::ShutdownInterrupt)
    ));
}
