//! End-to-end scenarios driven straight against the `Dispatcher`, mirroring the
//! concrete examples worked through by hand.

use std::str::FromStr;
use std::sync::Arc;

use engine::{Command, CommandResult, Dispatcher, Engine, MemoryStore};
use rust_decimal::Decimal;

fn d(s: &str) -> Decimal {
    Decimal::from_str(s).unwrap()
}

fn dispatcher() -> Dispatcher<MemoryStore> {
    Dispatcher::new(Engine::new(Arc::new(MemoryStore::new())))
}

fn order_id_of(result: &CommandResult) -> u64 {
    match result {
        CommandResult::Opened { order_id, .. } => *order_id,
        other => panic!("expected Opened, got {other:?}"),
    }
}

#[tokio::test]
async fn s1_immediate_full_match() {
    let dispatcher = dispatcher();
    dispatcher
        .execute_batch(vec![
            Command::CreateAccount { uid: "1".into(), balance: d("10000") },
            Command::CreateAccount { uid: "2".into(), balance: d("0") },
            Command::SeedPosition { uid: "2".into(), symbol: "BTC".into(), amount: d("100") },
        ])
        .await;

    let results = dispatcher
        .execute_batch(vec![
            Command::SubmitOrder { uid: "2".into(), symbol: "BTC".into(), amount: d("-10"), limit_price: d("100") },
            Command::SubmitOrder { uid: "1".into(), symbol: "BTC".into(), amount: d("10"), limit_price: d("100") },
        ])
        .await;

    let sell_id = order_id_of(&results[0]);
    let buy_id = order_id_of(&results[1]);
    assert_eq!(buy_id, sell_id + 1);

    let status = dispatcher.execute_batch(vec![Command::Query { order_id: buy_id }]).await;
    match &status[0] {
        CommandResult::Status { open_signed_amount, executed, .. } => {
            assert_eq!(*open_signed_amount, None);
            assert_eq!(executed.len(), 1);
            assert_eq!(executed[0].signed_amount, d("10"));
            assert_eq!(executed[0].price, d("100"));
        }
        other => panic!("expected Status, got {other:?}"),
    }
}

#[tokio::test]
async fn s2_buy_walks_two_price_levels() {
    let dispatcher = dispatcher();
    dispatcher
        .execute_batch(vec![
            Command::CreateAccount { uid: "1".into(), balance: d("10000") },
            Command::CreateAccount { uid: "2".into(), balance: d("0") },
            Command::SeedPosition { uid: "2".into(), symbol: "BTC".into(), amount: d("100") },
        ])
        .await;

    let results = dispatcher
        .execute_batch(vec![
            Command::SubmitOrder { uid: "2".into(), symbol: "BTC".into(), amount: d("-10"), limit_price: d("5") },
            Command::SubmitOrder { uid: "2".into(), symbol: "BTC".into(), amount: d("-10"), limit_price: d("6") },
            Command::SubmitOrder { uid: "1".into(), symbol: "BTC".into(), amount: d("15"), limit_price: d("7") },
        ])
        .await;
    let k1 = order_id_of(&results[0]);
    let k2 = order_id_of(&results[1]);

    let status = dispatcher
        .execute_batch(vec![Command::Query { order_id: k1 }, Command::Query { order_id: k2 }])
        .await;
    match &status[0] {
        CommandResult::Status { open_signed_amount, .. } => assert_eq!(*open_signed_amount, None),
        other => panic!("expected Status, got {other:?}"),
    }
    match &status[1] {
        CommandResult::Status { open_signed_amount, .. } => assert_eq!(*open_signed_amount, Some(d("-5"))),
        other => panic!("expected Status, got {other:?}"),
    }
}

#[tokio::test]
async fn s3_cancel_credits_remaining_escrow() {
    let dispatcher = dispatcher();
    dispatcher
        .execute_batch(vec![Command::CreateAccount { uid: "1".into(), balance: d("10000") }])
        .await;
    let results = dispatcher
        .execute_batch(vec![Command::SubmitOrder {
            uid: "1".into(),
            symbol: "BTC".into(),
            amount: d("10"),
            limit_price: d("100"),
        }])
        .await;
    let order_id = order_id_of(&results[0]);

    let cancel_results = dispatcher.execute_batch(vec![Command::Cancel { order_id }]).await;
    match &cancel_results[0] {
        CommandResult::Canceled { remaining, .. } => assert_eq!(*remaining, d("10")),
        other => panic!("expected Canceled, got {other:?}"),
    }
}

#[tokio::test]
async fn s4_query_unknown_order_is_an_error() {
    let dispatcher = dispatcher();
    let results = dispatcher.execute_batch(vec![Command::Query { order_id: 999 }]).await;
    assert!(matches!(results[0], CommandResult::StatusError { .. }));
}

#[tokio::test]
async fn s5_equal_price_ties_break_by_admission_order() {
    let dispatcher = dispatcher();
    dispatcher
        .execute_batch(vec![
            Command::CreateAccount { uid: "1".into(), balance: d("10000") },
            Command::CreateAccount { uid: "2".into(), balance: d("0") },
            Command::SeedPosition { uid: "2".into(), symbol: "BTC".into(), amount: d("100") },
        ])
        .await;

    let results = dispatcher
        .execute_batch(vec![
            Command::SubmitOrder { uid: "2".into(), symbol: "BTC".into(), amount: d("-1"), limit_price: d("5") },
            Command::SubmitOrder { uid: "2".into(), symbol: "BTC".into(), amount: d("-1"), limit_price: d("5") },
        ])
        .await;
    let earlier = order_id_of(&results[0]);
    let later = order_id_of(&results[1]);

    dispatcher
        .execute_batch(vec![Command::SubmitOrder {
            uid: "1".into(),
            symbol: "BTC".into(),
            amount: d("1"),
            limit_price: d("5"),
        }])
        .await;

    let status = dispatcher
        .execute_batch(vec![Command::Query { order_id: earlier }, Command::Query { order_id: later }])
        .await;
    assert!(matches!(status[0], CommandResult::Status { open_signed_amount: None, .. }));
    assert!(matches!(status[1], CommandResult::Status { open_signed_amount: Some(_), .. }));
}

#[tokio::test]
async fn s6_insufficient_funds_rejects_with_no_state_change() {
    let dispatcher = dispatcher();
    dispatcher
        .execute_batch(vec![Command::CreateAccount { uid: "1".into(), balance: d("50") }])
        .await;

    let results = dispatcher
        .execute_batch(vec![Command::SubmitOrder {
            uid: "1".into(),
            symbol: "BTC".into(),
            amount: d("10"),
            limit_price: d("10"),
        }])
        .await;
    assert!(matches!(results[0], CommandResult::OrderError { .. }));
}
