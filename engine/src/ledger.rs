//! Accounts and symbol positions. Mutations here are conservative — debits assume
//! the caller (the matching engine) has already checked sufficiency at admission;
//! the ledger itself re-validates only the inputs it owns (uid shape, non-negative
//! seed amounts), per §4.2.

use std::str::FromStr;
use std::sync::Arc;

use rust_decimal::Decimal;
use tracing::debug;

use crate::error::{EngineError, EngineResult};
use crate::keys::{account_key, position_key, FIELD_BALANCE, FIELD_POSITION_AMOUNT};
use crate::store::Store;

fn is_base10_number_sequence(s: &str) -> bool {
    !s.is_empty() && s.bytes().all(|b| b.is_ascii_digit())
}

pub struct Ledger<S: Store> {
    store: Arc<S>,
}

impl<S: Store> Ledger<S> {
    pub fn new(store: Arc<S>) -> Self {
        Self { store }
    }

    pub fn account_exists(&self, uid: &str) -> EngineResult<bool> {
        self.store.exists(&account_key(uid))
    }

    pub fn create_account(&self, uid: &str, balance: Decimal) -> EngineResult<()> {
        if !is_base10_number_sequence(uid) || balance < Decimal::ZERO {
            return Err(EngineError::BadInput("invalid uid or balance".into()));
        }
        if self.account_exists(uid)? {
            return Err(EngineError::DuplicateAccount(uid.to_string()));
        }
        self.store.hset(&account_key(uid), FIELD_BALANCE, &balance.to_string())?;
        debug!(uid, %balance, "account created");
        Ok(())
    }

    pub fn get_balance(&self, uid: &str) -> EngineResult<Decimal> {
        let raw = self
            .store
            .hget(&account_key(uid), FIELD_BALANCE)?
            .ok_or_else(|| EngineError::UnknownAccount(uid.to_string()))?;
        Decimal::from_str(&raw)
            .map_err(|e| EngineError::StorageError(format!("corrupt balance for {uid}: {e}")))
    }

    pub fn position_exists(&self, uid: &str, symbol: &str) -> EngineResult<bool> {
        self.store.exists(&position_key(uid, symbol))
    }

    pub fn get_position(&self, uid: &str, symbol: &str) -> EngineResult<Decimal> {
        let raw = self
            .store
            .hget(&position_key(uid, symbol), FIELD_POSITION_AMOUNT)?
            .ok_or_else(|| EngineError::UnknownPosition {
                uid: uid.to_string(),
                symbol: symbol.to_string(),
            })?;
        Decimal::from_str(&raw)
            .map_err(|e| EngineError::StorageError(format!("corrupt position for {uid}/{symbol}: {e}")))
    }

    /// Creates the position at `amount` if it doesn't exist yet, otherwise adds
    /// `amount` to the existing one. `amount == 0` is a permitted no-op, not an error.
    pub fn set_or_add_position(&self, uid: &str, symbol: &str, amount: Decimal) -> EngineResult<()> {
        if !self.account_exists(uid)? {
            return Err(EngineError::UnknownAccount(uid.to_string()));
        }
        if amount < Decimal::ZERO {
            return Err(EngineError::BadInput("position amount must be non-negative".into()));
        }
        let key = position_key(uid, symbol);
        if self.store.exists(&key)? {
            self.store.hincrby_decimal(&key, FIELD_POSITION_AMOUNT, amount)?;
        } else {
            self.store.hset(&key, FIELD_POSITION_AMOUNT, &amount.to_string())?;
        }
        Ok(())
    }

    pub fn debit_balance(&self, uid: &str, amount: Decimal) -> EngineResult<Decimal> {
        self.store.hincrby_decimal(&account_key(uid), FIELD_BALANCE, -amount)
    }

    pub fn credit_balance(&self, uid: &str, amount: Decimal) -> EngineResult<Decimal> {
        self.store.hincrby_decimal(&account_key(uid), FIELD_BALANCE, amount)
    }

    pub fn debit_position(&self, uid: &str, symbol: &str, amount: Decimal) -> EngineResult<Decimal> {
        self.store
            .hincrby_decimal(&position_key(uid, symbol), FIELD_POSITION_AMOUNT, -amount)
    }

    pub fn credit_position(&self, uid: &str, symbol: &str, amount: Decimal) -> EngineResult<Decimal> {
        self.store
            .hincrby_decimal(&position_key(uid, symbol), FIELD_POSITION_AMOUNT, amount)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::MemoryStore;
    use std::str::FromStr;

    fn ledger() -> Ledger<MemoryStore> {
        Ledger::new(Arc::new(MemoryStore::new()))
    }

    #[test]
    fn rejects_non_digit_uid() {
        let l = ledger();
        assert!(matches!(
            l.create_account("abc", Decimal::ZERO),
            Err(EngineError::BadInput(_))
        ));
    }

    #[test]
    fn rejects_duplicate_account() {
        let l = ledger();
        l.create_account("1", Decimal::from(100)).unwrap();
        assert!(matches!(
            l.create_account("1", Decimal::from(50)),
            Err(EngineError::DuplicateAccount(_))
        ));
    }

    #[test]
    fn set_or_add_position_accumulates() {
        let l = ledger();
        l.create_account("1", Decimal::ZERO).unwrap();
        l.set_or_add_position("1", "BTC", Decimal::from(10)).unwrap();
        l.set_or_add_position("1", "BTC", Decimal::from(5)).unwrap();
        assert_eq!(l.get_position("1", "BTC").unwrap(), Decimal::from(15));
    }

    #[test]
    fn set_or_add_position_zero_is_noop() {
        let l = ledger();
        l.create_account("1", Decimal::ZERO).unwrap();
        l.set_or_add_position("1", "BTC", Decimal::ZERO).unwrap();
        assert_eq!(l.get_position("1", "BTC").unwrap(), Decimal::ZERO);
    }

    #[test]
    fn debit_and_credit_balance_round_trip() {
        let l = ledger();
        l.create_account("1", Decimal::from_str("100").unwrap()).unwrap();
        l.debit_balance("1", Decimal::from(30)).unwrap();
        assert_eq!(l.get_balance("1").unwrap(), Decimal::from(70));
        l.credit_balance("1", Decimal::from(10)).unwrap();
        assert_eq!(l.get_balance("1").unwrap(), Decimal::from(80));
    }

    #[test]
    fn unknown_account_balance_errors() {
        let l = ledger();
        assert!(matches!(l.get_balance("404"), Err(EngineError::UnknownAccount(_))));
    }
}
