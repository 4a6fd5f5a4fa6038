//! Admission, matching, execution, cancellation and query — the hard core. Split
//! the way the source's own design note asks for it: the matching loop is a finite
//! state machine driven by (book-empty, best-price-vs-limit, initiator-still-alive),
//! with `execute` as a plain side-effecting step, not a mutually-recursive pair of
//! abstract callbacks.

use std::sync::Arc;

use rust_decimal::Decimal;
use tracing::{debug, info};

use crate::book::OrderBooks;
use crate::error::{EngineError, EngineResult};
use crate::keys::ORDER_ID_COUNTER_KEY;
use crate::ledger::Ledger;
use crate::orders::{now_epoch_string, CancelEntry, ExecutedEntry, OrderRepository, Side};
use crate::store::Store;

/// What a successful query returns: at most one open-state tuple (signed amount,
/// negative for sell positions), at most one cancel tuple, and the full executed
/// history in append order.
pub struct QueryOutcome {
    pub open_signed_amount: Option<Decimal>,
    pub cancel: Option<CancelEntry>,
    pub executed: Vec<ExecutedEntry>,
}

/// What a successful cancel returns: the tuple plus every executed-history entry
/// that accrued before the cancel, per §4.6.
pub struct CancelOutcome {
    pub remaining_at_cancel: Decimal,
    pub time: String,
    pub executed: Vec<ExecutedEntry>,
}

pub struct Engine<S: Store> {
    store: Arc<S>,
    ledger: Ledger<S>,
    orders: OrderRepository<S>,
    books: OrderBooks<S>,
}

impl<S: Store> Engine<S> {
    pub fn new(store: Arc<S>) -> Self {
        let ledger = Ledger::new(Arc::clone(&store));
        let orders = OrderRepository::new(Arc::clone(&store));
        let books = OrderBooks::new(Arc::clone(&store));
        Self {
            store,
            ledger,
            orders,
            books,
        }
    }

    /// Monotone positive order id, burned even if the admission it's allocated for
    /// fails — see §4.6/§4.7.
    pub fn next_order_id(&self) -> EngineResult<u64> {
        self.store.incr(ORDER_ID_COUNTER_KEY)
    }

    pub fn create_account(&self, uid: &str, balance: Decimal) -> EngineResult<()> {
        self.ledger.create_account(uid, balance)
    }

    pub fn set_or_add_position(&self, uid: &str, symbol: &str, amount: Decimal) -> EngineResult<()> {
        self.ledger.set_or_add_position(uid, symbol, amount)
    }

    pub fn balance_of(&self, uid: &str) -> EngineResult<Decimal> {
        self.ledger.get_balance(uid)
    }

    pub fn position_of(&self, uid: &str, symbol: &str) -> EngineResult<Decimal> {
        self.ledger.get_position(uid, symbol)
    }

    pub fn submit_buy(
        &self,
        order_id: u64,
        uid: &str,
        symbol: &str,
        limit_price: Decimal,
        amount: Decimal,
    ) -> EngineResult<()> {
        if !self.ledger.account_exists(uid)? {
            return Err(EngineError::UnknownAccount(uid.to_string()));
        }
        if amount <= Decimal::ZERO || limit_price <= Decimal::ZERO {
            return Err(EngineError::BadInput("amount and limit price must be positive".into()));
        }
        let balance = self.ledger.get_balance(uid)?;
        let payment = limit_price
            .checked_mul(amount)
            .ok_or_else(|| EngineError::BadInput("limit price times amount overflows".into()))?;
        if balance < payment {
            return Err(EngineError::InsufficientFunds);
        }

        self.orders.create(order_id, uid, symbol, Side::Buy, limit_price, amount)?;
        self.books.insert(Side::Buy, symbol, order_id, limit_price)?;
        self.ledger.debit_balance(uid, payment)?;
        info!(order_id, uid, symbol, %limit_price, %amount, "buy order opened");

        self.match_order(order_id, Side::Buy, symbol)
    }

    pub fn submit_sell(
        &self,
        order_id: u64,
        uid: &str,
        symbol: &str,
        limit_price: Decimal,
        amount: Decimal,
    ) -> EngineResult<()> {
        if !self.ledger.account_exists(uid)? {
            return Err(EngineError::UnknownAccount(uid.to_string()));
        }
        if !self.ledger.position_exists(uid, symbol)? {
            return Err(EngineError::UnknownPosition {
                uid: uid.to_string(),
                symbol: symbol.to_string(),
            });
        }
        if amount <= Decimal::ZERO || limit_price <= Decimal::ZERO {
            return Err(EngineError::BadInput("amount and limit price must be positive".into()));
        }
        let position = self.ledger.get_position(uid, symbol)?;
        if position < amount {
            return Err(EngineError::InsufficientShares);
        }

        self.orders.create(order_id, uid, symbol, Side::Sell, limit_price, amount)?;
        self.books.insert(Side::Sell, symbol, order_id, limit_price)?;
        self.ledger.debit_position(uid, symbol, amount)?;
        info!(order_id, uid, symbol, %limit_price, %amount, "sell order opened");

        self.match_order(order_id, Side::Sell, symbol)
    }

    /// Repeats until the initiating order is exhausted (filled away, so it no longer
    /// exists) or the best resting counter-order fails to cross.
    fn match_order(&self, order_id: u64, side: Side, symbol: &str) -> EngineResult<()> {
        loop {
            let initiator = match self.orders.get(order_id) {
                Ok(o) => o,
                Err(EngineError::Unknown(_)) => return Ok(()),
                Err(e) => return Err(e),
            };

            let (counter_side, crosses): (Side, bool) = match side {
                Side::Buy => {
                    if self.books.is_empty(Side::Sell, symbol)? {
                        return Ok(());
                    }
                    let (_, best_price) = self.books.peek_best(Side::Sell, symbol)?.expect("checked non-empty");
                    (Side::Sell, best_price <= initiator.limit_price)
                }
                Side::Sell => {
                    if self.books.is_empty(Side::Buy, symbol)? {
                        return Ok(());
                    }
                    let (_, best_price) = self.books.peek_best(Side::Buy, symbol)?.expect("checked non-empty");
                    (Side::Buy, initiator.limit_price <= best_price)
                }
            };

            if !crosses {
                return Ok(());
            }

            let (counter_id, _) = self
                .books
                .peek_best(counter_side, symbol)?
                .expect("checked non-empty");

            let (buy_id, sell_id) = match side {
                Side::Buy => (order_id, counter_id),
                Side::Sell => (counter_id, order_id),
            };
            self.execute(buy_id, sell_id, symbol, side)?;

            if !self.orders.exists(order_id)? {
                return Ok(());
            }
        }
    }

    /// Matches `buy_id` against `sell_id`. `init_side` is the side of the order that
    /// drove this cycle — the price-taker; the resting (non-initiating) order's
    /// limit sets the trade price, per §4.5.3.
    fn execute(&self, buy_id: u64, sell_id: u64, symbol: &str, init_side: Side) -> EngineResult<()> {
        let buy = self.orders.get(buy_id)?;
        let sell = self.orders.get(sell_id)?;

        let q = buy.current_amount.min(sell.current_amount);
        if q == Decimal::ZERO {
            return Ok(());
        }

        let trade_price = match init_side {
            Side::Buy => sell.limit_price,
            Side::Sell => buy.limit_price,
        };

        let proceeds = trade_price
            .checked_mul(q)
            .ok_or_else(|| EngineError::StorageError("trade proceeds overflow".into()))?;

        self.ledger.credit_position(&buy.uid, symbol, q)?;
        self.ledger.credit_balance(&sell.uid, proceeds)?;

        if buy.limit_price > trade_price {
            let refund = (buy.limit_price - trade_price)
                .checked_mul(q)
                .ok_or_else(|| EngineError::StorageError("overpayment refund overflows".into()))?;
            self.ledger.credit_balance(&buy.uid, refund)?;
        }

        if q == buy.current_amount {
            self.books.remove(Side::Buy, symbol, buy_id)?;
            self.orders.delete(buy_id)?;
        } else {
            self.orders.decrement_amount(buy_id, q)?;
        }

        if q == sell.current_amount {
            self.books.remove(Side::Sell, symbol, sell_id)?;
            self.orders.delete(sell_id)?;
        } else {
            self.orders.decrement_amount(sell_id, q)?;
        }

        let now = now_epoch_string();
        self.orders.append_executed(buy_id, q, trade_price, &now)?;
        self.orders.append_executed(sell_id, -q, trade_price, &now)?;
        info!(buy_id, sell_id, symbol, %q, price = %trade_price, "trade executed");

        Ok(())
    }

    pub fn cancel(&self, order_id: u64) -> EngineResult<CancelOutcome> {
        if !self.orders.exists(order_id)? {
            return Err(EngineError::NotOpen(order_id));
        }
        let order = self.orders.get(order_id)?;

        match order.side {
            Side::Buy => {
                self.ledger.credit_balance(&order.uid, order.limit_price * order.current_amount)?;
                self.books.remove(Side::Buy, &order.symbol, order_id)?;
            }
            Side::Sell => {
                self.ledger.credit_position(&order.uid, &order.symbol, order.current_amount)?;
                self.books.remove(Side::Sell, &order.symbol, order_id)?;
            }
        }
        self.orders.delete(order_id)?;

        let now = now_epoch_string();
        self.orders.create_cancel(order_id, order.current_amount, &now)?;
        debug!(order_id, remaining = %order.current_amount, "order canceled");

        let executed = self.orders.list_executed(order_id)?;
        Ok(CancelOutcome {
            remaining_at_cancel: order.current_amount,
            time: now,
            executed,
        })
    }

    pub fn query(&self, order_id: u64) -> EngineResult<QueryOutcome> {
        let has_executed = self.orders.executed_exists(order_id)?;
        let has_cancel = self.orders.cancel_exists(order_id)?;
        let has_open = self.orders.exists(order_id)?;

        if !has_executed && !has_cancel && !has_open {
            return Err(EngineError::Unknown(order_id));
        }

        let open_signed_amount = if has_open {
            let o = self.orders.get(order_id)?;
            Some(match o.side {
                Side::Buy => o.current_amount,
                Side::Sell => -o.current_amount,
            })
        } else {
            None
        };

        let cancel = if has_cancel { self.orders.get_cancel(order_id)? } else { None };

        let executed = if has_executed {
            self.orders.list_executed(order_id)?
        } else {
            Vec::new()
        };

        Ok(QueryOutcome {
            open_signed_amount,
            cancel,
            executed,
        })
    }
}
