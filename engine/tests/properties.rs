//! Randomized checks for properties 1-3 from the testable-properties list:
//! conservation, non-negative funds, and escrow symmetry on cancel. All orders in
//! a run share one fixed limit price so every crossing trade executes at that same
//! price — this is the "frozen symbol mark-price p" the conservation property is
//! stated against, which makes total system value exactly invariant rather than
//! merely bounded.

use std::str::FromStr;
use std::sync::Arc;

use engine::{Engine, MemoryStore, Side};
use proptest::prelude::*;
use rust_decimal::Decimal;

const UIDS: [&str; 3] = ["1", "2", "3"];
const SYMBOL: &str = "BTC";
const STARTING_BALANCE: i64 = 1_000_000;
const STARTING_POSITION: i64 = 1_000_000;

#[derive(Debug, Clone, Copy)]
enum Action {
    Buy { uid_idx: u8, qty: u8 },
    Sell { uid_idx: u8, qty: u8 },
    Cancel { pick: u8 },
}

fn arb_action() -> impl Strategy<Value = Action> {
    prop_oneof![
        (0u8..3, 1u8..20).prop_map(|(uid_idx, qty)| Action::Buy { uid_idx, qty }),
        (0u8..3, 1u8..20).prop_map(|(uid_idx, qty)| Action::Sell { uid_idx, qty }),
        any::<u8>().prop_map(|pick| Action::Cancel { pick }),
    ]
}

fn total_system_value(engine: &Engine<MemoryStore>, mark_price: Decimal, open: &[(u64, Side)]) -> Decimal {
    let mut total = Decimal::ZERO;
    for uid in UIDS {
        total += engine.balance_of(uid).unwrap_or(Decimal::ZERO);
        total += engine.position_of(uid, SYMBOL).unwrap_or(Decimal::ZERO) * mark_price;
    }
    for (order_id, _) in open {
        if let Ok(outcome) = engine.query(*order_id) {
            if let Some(signed) = outcome.open_signed_amount {
                total += signed.abs() * mark_price;
            }
        }
    }
    total
}

proptest! {
    #[test]
    fn conservation_non_negativity_and_escrow_symmetry(actions in prop::collection::vec(arb_action(), 0..40)) {
        let mark_price = Decimal::from_str("100").unwrap();
        let store = Arc::new(MemoryStore::new());
        let engine = Engine::new(store);

        for uid in UIDS {
            engine.create_account(uid, Decimal::from(STARTING_BALANCE)).unwrap();
            engine.set_or_add_position(uid, SYMBOL, Decimal::from(STARTING_POSITION)).unwrap();
        }

        let mut open: Vec<(u64, Side)> = Vec::new();
        let baseline = total_system_value(&engine, mark_price, &open);

        for action in actions {
            match action {
                Action::Buy { uid_idx, qty } => {
                    let uid = UIDS[(uid_idx as usize) % UIDS.len()];
                    let order_id = engine.next_order_id().unwrap();
                    if engine.submit_buy(order_id, uid, SYMBOL, mark_price, Decimal::from(qty)).is_ok() {
                        if engine.query(order_id).map(|o| o.open_signed_amount.is_some()).unwrap_or(false) {
                            open.push((order_id, Side::Buy));
                        }
                    }
                }
                Action::Sell { uid_idx, qty } => {
                    let uid = UIDS[(uid_idx as usize) % UIDS.len()];
                    let order_id = engine.next_order_id().unwrap();
                    if engine.submit_sell(order_id, uid, SYMBOL, mark_price, Decimal::from(qty)).is_ok() {
                        if engine.query(order_id).map(|o| o.open_signed_amount.is_some()).unwrap_or(false) {
                            open.push((order_id, Side::Sell));
                        }
                    }
                }
                Action::Cancel { pick } => {
                    if !open.is_empty() {
                        let idx = (pick as usize) % open.len();
                        let (order_id, _side) = open[idx];
                        let before = total_system_value(&engine, mark_price, &open);
                        if let Ok(outcome) = engine.cancel(order_id) {
                            open.remove(idx);
                            let after = total_system_value(&engine, mark_price, &open);
                            prop_assert_eq!(before, after);
                            let _ = outcome;
                        }
                    }
                }
            }

            for uid in UIDS {
                prop_assert!(engine.balance_of(uid).unwrap() >= Decimal::ZERO);
                prop_assert!(engine.position_of(uid, SYMBOL).unwrap() >= Decimal::ZERO);
            }
            open.retain(|(order_id, _)| {
                engine.query(*order_id).map(|o| o.open_signed_amount.is_some()).unwrap_or(false)
            });

            let current = total_system_value(&engine, mark_price, &open);
            prop_assert_eq!(current, baseline);
        }
    }
}
