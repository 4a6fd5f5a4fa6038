//! Order records, the cancel-history log, and the executed-history append-log.
//! Executed entries are appended as a single composite list element
//! (`"amount|price|time"`) rather than three separate `RPUSH`es — see DESIGN.md for
//! why, and §9's open question in SPEC_FULL.md for the source of the decision.

use std::str::FromStr;
use std::sync::Arc;
use std::time::{SystemTime, UNIX_EPOCH};

use rust_decimal::Decimal;

use crate::error::{EngineError, EngineResult};
use crate::keys::{
    cancel_key, executed_key, order_key, FIELD_CANCEL_AMOUNT, FIELD_CANCEL_TIME,
    FIELD_ORDER_ACCOUNT, FIELD_ORDER_CURRENT_AMOUNT, FIELD_ORDER_INITIAL_AMOUNT,
    FIELD_ORDER_LIMIT_PRICE, FIELD_ORDER_SYMBOL, FIELD_ORDER_TYPE, ORDER_TYPE_BUY, ORDER_TYPE_SELL,
};
use crate::store::Store;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Side {
    Buy,
    Sell,
}

impl Side {
    pub fn as_str(self) -> &'static str {
        match self {
            Side::Buy => ORDER_TYPE_BUY,
            Side::Sell => ORDER_TYPE_SELL,
        }
    }

    fn from_str(s: &str) -> EngineResult<Self> {
        match s {
            ORDER_TYPE_BUY => Ok(Side::Buy),
            ORDER_TYPE_SELL => Ok(Side::Sell),
            other => Err(EngineError::StorageError(format!("corrupt order type: {other}"))),
        }
    }
}

#[derive(Debug, Clone)]
pub struct OpenOrder {
    pub order_id: u64,
    pub uid: String,
    pub symbol: String,
    pub side: Side,
    pub limit_price: Decimal,
    pub current_amount: Decimal,
    #[allow(dead_code)]
    pub original_amount: Decimal,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ExecutedEntry {
    pub signed_amount: Decimal,
    pub price: Decimal,
    pub time: String,
}

#[derive(Debug, Clone, PartialEq)]
pub struct CancelEntry {
    pub remaining_at_cancel: Decimal,
    pub time: String,
}

pub fn now_epoch_string() -> String {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_secs()
        .to_string()
}

pub struct OrderRepository<S: Store> {
    store: Arc<S>,
}

impl<S: Store> OrderRepository<S> {
    pub fn new(store: Arc<S>) -> Self {
        Self { store }
    }

    pub fn create(
        &self,
        order_id: u64,
        uid: &str,
        symbol: &str,
        side: Side,
        limit_price: Decimal,
        amount: Decimal,
    ) -> EngineResult<()> {
        self.store.hmset(
            &order_key(order_id),
            &[
                (FIELD_ORDER_ACCOUNT, uid),
                (FIELD_ORDER_SYMBOL, symbol),
                (FIELD_ORDER_LIMIT_PRICE, &limit_price.to_string()),
                (FIELD_ORDER_CURRENT_AMOUNT, &amount.to_string()),
                (FIELD_ORDER_INITIAL_AMOUNT, &amount.to_string()),
                (FIELD_ORDER_TYPE, side.as_str()),
            ],
        )
    }

    pub fn exists(&self, order_id: u64) -> EngineResult<bool> {
        self.store.exists(&order_key(order_id))
    }

    pub fn get(&self, order_id: u64) -> EngineResult<OpenOrder> {
        let fields = self.store.hmget(
            &order_key(order_id),
            &[
                FIELD_ORDER_ACCOUNT,
                FIELD_ORDER_SYMBOL,
                FIELD_ORDER_LIMIT_PRICE,
                FIELD_ORDER_CURRENT_AMOUNT,
                FIELD_ORDER_INITIAL_AMOUNT,
                FIELD_ORDER_TYPE,
            ],
        )?;
        let missing = || EngineError::Unknown(order_id);
        let uid = fields[0].clone().ok_or_else(missing)?;
        let symbol = fields[1].clone().ok_or_else(missing)?;
        let limit_price = Decimal::from_str(fields[2].as_deref().ok_or_else(missing)?)
            .map_err(|e| EngineError::StorageError(e.to_string()))?;
        let current_amount = Decimal::from_str(fields[3].as_deref().ok_or_else(missing)?)
            .map_err(|e| EngineError::StorageError(e.to_string()))?;
        let original_amount = Decimal::from_str(fields[4].as_deref().ok_or_else(missing)?)
            .map_err(|e| EngineError::StorageError(e.to_string()))?;
        let side = Side::from_str(fields[5].as_deref().ok_or_else(missing)?)?;
        Ok(OpenOrder {
            order_id,
            uid,
            symbol,
            side,
            limit_price,
            current_amount,
            original_amount,
        })
    }

    pub fn decrement_amount(&self, order_id: u64, q: Decimal) -> EngineResult<Decimal> {
        self.store
            .hincrby_decimal(&order_key(order_id), FIELD_ORDER_CURRENT_AMOUNT, -q)
    }

    pub fn delete(&self, order_id: u64) -> EngineResult<()> {
        self.store.delete(&order_key(order_id))
    }

    pub fn append_executed(
        &self,
        order_id: u64,
        signed_amount: Decimal,
        price: Decimal,
        time: &str,
    ) -> EngineResult<()> {
        let element = format!("{signed_amount}|{price}|{time}");
        self.store.rpush(&executed_key(order_id), &element)
    }

    pub fn executed_exists(&self, order_id: u64) -> EngineResult<bool> {
        self.store.exists(&executed_key(order_id))
    }

    pub fn list_executed(&self, order_id: u64) -> EngineResult<Vec<ExecutedEntry>> {
        self.store
            .lrange_all(&executed_key(order_id))?
            .iter()
            .map(|raw| parse_executed_element(order_id, raw))
            .collect()
    }

    pub fn create_cancel(&self, order_id: u64, remaining: Decimal, time: &str) -> EngineResult<()> {
        self.store.hmset(
            &cancel_key(order_id),
            &[
                (FIELD_CANCEL_AMOUNT, &remaining.to_string()),
                (FIELD_CANCEL_TIME, time),
            ],
        )
    }

    pub fn cancel_exists(&self, order_id: u64) -> EngineResult<bool> {
        self.store.exists(&cancel_key(order_id))
    }

    pub fn get_cancel(&self, order_id: u64) -> EngineResult<Option<CancelEntry>> {
        if !self.cancel_exists(order_id)? {
            return Ok(None);
        }
        let fields = self
            .store
            .hmget(&cancel_key(order_id), &[FIELD_CANCEL_AMOUNT, FIELD_CANCEL_TIME])?;
        let missing = || EngineError::StorageError(format!("corrupt cancel entry for {order_id}"));
        let remaining_at_cancel = Decimal::from_str(fields[0].as_deref().ok_or_else(missing)?)
            .map_err(|e| EngineError::StorageError(e.to_string()))?;
        let time = fields[1].clone().ok_or_else(missing)?;
        Ok(Some(CancelEntry {
            remaining_at_cancel,
            time,
        }))
    }
}

fn parse_executed_element(order_id: u64, raw: &str) -> EngineResult<ExecutedEntry> {
    let mut parts = raw.splitn(3, '|');
    let corrupt = || EngineError::StorageError(format!("corrupt executed entry for {order_id}: {raw}"));
    let signed_amount = Decimal::from_str(parts.next().ok_or_else(corrupt)?)
        .map_err(|e| EngineError::StorageError(e.to_string()))?;
    let price = Decimal::from_str(parts.next().ok_or_else(corrupt)?)
        .map_err(|e| EngineError::StorageError(e.to_string()))?;
    let time = parts.next().ok_or_else(corrupt)?.to_string();
    Ok(ExecutedEntry {
        signed_amount,
        price,
        time,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::MemoryStore;

    fn repo() -> OrderRepository<MemoryStore> {
        OrderRepository::new(Arc::new(MemoryStore::new()))
    }

    #[test]
    fn create_and_get_round_trips() {
        let r = repo();
        r.create(1, "1", "BTC", Side::Buy, Decimal::from(100), Decimal::from(10)).unwrap();
        let o = r.get(1).unwrap();
        assert_eq!(o.uid, "1");
        assert_eq!(o.symbol, "BTC");
        assert_eq!(o.side, Side::Buy);
        assert_eq!(o.limit_price, Decimal::from(100));
        assert_eq!(o.current_amount, Decimal::from(10));
    }

    #[test]
    fn get_missing_order_is_unknown() {
        let r = repo();
        assert!(matches!(r.get(404), Err(EngineError::Unknown(404))));
    }

    #[test]
    fn executed_entries_round_trip_through_composite_element() {
        let r = repo();
        r.append_executed(1, Decimal::from(10), Decimal::from(100), "1700000000").unwrap();
        r.append_executed(1, Decimal::from(-5), Decimal::from(99), "1700000001").unwrap();
        let entries = r.list_executed(1).unwrap();
        assert_eq!(entries.len(), 2);
        assert_eq!(entries[0].signed_amount, Decimal::from(10));
        assert_eq!(entries[1].signed_amount, Decimal::from(-5));
    }

    #[test]
    fn cancel_entry_round_trips() {
        let r = repo();
        r.create_cancel(1, Decimal::from(5), "1700000000").unwrap();
        let c = r.get_cancel(1).unwrap().unwrap();
        assert_eq!(c.remaining_at_cancel, Decimal::from(5));
        assert_eq!(c.time, "1700000000");
    }
}
