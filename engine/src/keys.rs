//! Redis-style key and field names, carried over verbatim from the source's
//! `businessLogic/business_logic_utils.go` constants so the logical layout in §6's
//! "Persisted state layout" table is reproducible against `MemoryStore`.

pub const FIELD_BALANCE: &str = "balance";
pub const FIELD_POSITION_AMOUNT: &str = "amount";

pub const FIELD_ORDER_ACCOUNT: &str = "account";
pub const FIELD_ORDER_SYMBOL: &str = "symbol";
pub const FIELD_ORDER_LIMIT_PRICE: &str = "limit";
pub const FIELD_ORDER_CURRENT_AMOUNT: &str = "amount";
pub const FIELD_ORDER_INITIAL_AMOUNT: &str = "origAmount";
pub const FIELD_ORDER_TYPE: &str = "orderType";

pub const FIELD_CANCEL_AMOUNT: &str = "amount";
pub const FIELD_CANCEL_TIME: &str = "time";

pub const ORDER_ID_COUNTER_KEY: &str = "orderIdCounter";

pub const ORDER_TYPE_BUY: &str = "buy";
pub const ORDER_TYPE_SELL: &str = "sell";

pub fn account_key(uid: &str) -> String {
    format!("account:{uid}")
}

pub fn position_key(uid: &str, symbol: &str) -> String {
    format!("account:{uid}:{symbol}")
}

pub fn order_key(order_id: u64) -> String {
    format!("order:{order_id}")
}

pub fn buy_book_key(symbol: &str) -> String {
    format!("openBuyOrderBook:{symbol}")
}

pub fn sell_book_key(symbol: &str) -> String {
    format!("openSellOrderBook:{symbol}")
}

pub fn cancel_key(order_id: u64) -> String {
    format!("order-cancel:{order_id}")
}

pub fn executed_key(order_id: u64) -> String {
    format!("order-executed:{order_id}")
}
