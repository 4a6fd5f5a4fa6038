//! Per-symbol buy/sell priority structures, keyed by limit price over the store's
//! sorted sets. Buy books retrieve by max price (ties: earliest insertion); sell
//! books retrieve by min price (ties: earliest insertion) — both satisfied by the
//! store's `zfirst_desc`/`zfirst_asc` directly, per §4.4's tie-break design note.

use std::str::FromStr;
use std::sync::Arc;

use rust_decimal::Decimal;

use crate::error::{EngineError, EngineResult};
use crate::keys::{buy_book_key, sell_book_key};
use crate::orders::Side;
use crate::store::Store;

pub struct OrderBooks<S: Store> {
    store: Arc<S>,
}

impl<S: Store> OrderBooks<S> {
    pub fn new(store: Arc<S>) -> Self {
        Self { store }
    }

    fn book_key(&self, side: Side, symbol: &str) -> String {
        match side {
            Side::Buy => buy_book_key(symbol),
            Side::Sell => sell_book_key(symbol),
        }
    }

    pub fn insert(&self, side: Side, symbol: &str, order_id: u64, limit_price: Decimal) -> EngineResult<()> {
        self.store.zadd(&self.book_key(side, symbol), limit_price, &order_id.to_string())
    }

    pub fn remove(&self, side: Side, symbol: &str, order_id: u64) -> EngineResult<()> {
        self.store.zrem(&self.book_key(side, symbol), &order_id.to_string())
    }

    /// Top-priority resting order: max price for BUY, min price for SELL, earliest
    /// insertion breaking ties.
    pub fn peek_best(&self, side: Side, symbol: &str) -> EngineResult<Option<(u64, Decimal)>> {
        let key = self.book_key(side, symbol);
        let hit = match side {
            Side::Buy => self.store.zfirst_desc(&key)?,
            Side::Sell => self.store.zfirst_asc(&key)?,
        };
        hit.map(|(member, score)| {
            let order_id = u64::from_str(&member)
                .map_err(|e| EngineError::StorageError(format!("corrupt book member: {e}")))?;
            Ok((order_id, score))
        })
        .transpose()
    }

    pub fn is_empty(&self, side: Side, symbol: &str) -> EngineResult<bool> {
        Ok(self.store.zcard(&self.book_key(side, symbol))? == 0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::MemoryStore;

    fn books() -> OrderBooks<MemoryStore> {
        OrderBooks::new(Arc::new(MemoryStore::new()))
    }

    #[test]
    fn buy_book_peeks_max_price() {
        let b = books();
        b.insert(Side::Buy, "BTC", 1, Decimal::from(100)).unwrap();
        b.insert(Side::Buy, "BTC", 2, Decimal::from(110)).unwrap();
        assert_eq!(b.peek_best(Side::Buy, "BTC").unwrap(), Some((2, Decimal::from(110))));
    }

    #[test]
    fn sell_book_peeks_min_price() {
        let b = books();
        b.insert(Side::Sell, "BTC", 1, Decimal::from(100)).unwrap();
        b.insert(Side::Sell, "BTC", 2, Decimal::from(90)).unwrap();
        assert_eq!(b.peek_best(Side::Sell, "BTC").unwrap(), Some((2, Decimal::from(90))));
    }

    #[test]
    fn ties_resolve_to_earliest_insertion() {
        let b = books();
        b.insert(Side::Sell, "BTC", 10, Decimal::from(5)).unwrap();
        b.insert(Side::Sell, "BTC", 11, Decimal::from(5)).unwrap();
        assert_eq!(b.peek_best(Side::Sell, "BTC").unwrap(), Some((10, Decimal::from(5))));
    }

    #[test]
    fn remove_empties_the_book() {
        let b = books();
        b.insert(Side::Buy, "BTC", 1, Decimal::from(100)).unwrap();
        assert!(!b.is_empty(Side::Buy, "BTC").unwrap());
        b.remove(Side::Buy, "BTC", 1).unwrap();
        assert!(b.is_empty(Side::Buy, "BTC").unwrap());
    }
}
