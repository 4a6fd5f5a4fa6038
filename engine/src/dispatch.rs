//! Per-connection serialized application of one parsed batch against the shared
//! engine, producing one result record per command. A mutating batch (anything but
//! pure queries) takes the engine's writer lock for its whole duration; an
//! all-query batch takes the reader side — the batch, not the command, is the unit
//! of exclusivity (§5).

use std::sync::Arc;

use rust_decimal::Decimal;
use tokio::sync::RwLock;
use tracing::{info_span, warn};

use crate::engine::Engine;
use crate::orders::ExecutedEntry;
use crate::store::Store;

#[derive(Debug, Clone)]
pub enum Command {
    CreateAccount { uid: String, balance: Decimal },
    SeedPosition { uid: String, symbol: String, amount: Decimal },
    /// Sign of `amount` selects side: positive BUY, negative SELL (magnitude is the
    /// quantity). `uid` is the acting account, taken from the enclosing `<transactions id=…>`.
    SubmitOrder { uid: String, symbol: String, amount: Decimal, limit_price: Decimal },
    Cancel { order_id: u64 },
    Query { order_id: u64 },
}

impl Command {
    fn is_mutating(&self) -> bool {
        !matches!(self, Command::Query { .. })
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum CommandResult {
    Created { uid: String },
    CreateError { uid: String, message: String },
    PositionCreated { symbol: String, uid: String },
    PositionError { symbol: String, uid: String, message: String },
    Opened { symbol: String, signed_amount: Decimal, limit_price: Decimal, order_id: u64 },
    OrderError { symbol: String, signed_amount: Decimal, limit_price: Decimal, message: String },
    Canceled { order_id: u64, remaining: Decimal, time: String, executed: Vec<ExecutedEntry> },
    CancelError { order_id: u64, message: String },
    Status {
        order_id: u64,
        open_signed_amount: Option<Decimal>,
        cancel: Option<(Decimal, String)>,
        executed: Vec<ExecutedEntry>,
    },
    StatusError { order_id: u64, message: String },
}

pub struct Dispatcher<S: Store> {
    engine: Arc<RwLock<Engine<S>>>,
}

impl<S: Store> Dispatcher<S> {
    pub fn new(engine: Engine<S>) -> Self {
        Self {
            engine: Arc::new(RwLock::new(engine)),
        }
    }

    pub async fn execute_batch(&self, commands: Vec<Command>) -> Vec<CommandResult> {
        let mutating = commands.iter().any(Command::is_mutating);
        let span = info_span!("batch", mutating, len = commands.len());
        let _enter = span.enter();

        if mutating {
            let engine = self.engine.write().await;
            commands.into_iter().map(|c| Self::dispatch_one(&engine, c)).collect()
        } else {
            let engine = self.engine.read().await;
            commands.into_iter().map(|c| Self::dispatch_one(&engine, c)).collect()
        }
    }

    fn dispatch_one(engine: &Engine<S>, command: Command) -> CommandResult {
        match command {
            Command::CreateAccount { uid, balance } => match engine.create_account(&uid, balance) {
                Ok(()) => CommandResult::Created { uid },
                Err(e) => {
                    warn!(uid, error = %e, "create account rejected");
                    CommandResult::CreateError { uid, message: e.to_string() }
                }
            },
            Command::SeedPosition { uid, symbol, amount } => {
                match engine.set_or_add_position(&uid, &symbol, amount) {
                    Ok(()) => CommandResult::PositionCreated { symbol, uid },
                    Err(e) => {
                        warn!(uid, symbol, error = %e, "position seed rejected");
                        CommandResult::PositionError { symbol, uid, message: e.to_string() }
                    }
                }
            }
            Command::SubmitOrder { uid, symbol, amount, limit_price } => {
                Self::dispatch_order(engine, uid, symbol, amount, limit_price)
            }
            Command::Cancel { order_id } => match engine.cancel(order_id) {
                Ok(outcome) => CommandResult::Canceled {
                    order_id,
                    remaining: outcome.remaining_at_cancel,
                    time: outcome.time,
                    executed: outcome.executed,
                },
                Err(e) => {
                    warn!(order_id, error = %e, "cancel rejected");
                    CommandResult::CancelError { order_id, message: e.to_string() }
                }
            },
            Command::Query { order_id } => match engine.query(order_id) {
                Ok(outcome) => CommandResult::Status {
                    order_id,
                    open_signed_amount: outcome.open_signed_amount,
                    cancel: outcome.cancel.map(|c| (c.remaining_at_cancel, c.time)),
                    executed: outcome.executed,
                },
                Err(e) => CommandResult::StatusError { order_id, message: e.to_string() },
            },
        }
    }

    fn dispatch_order(
        engine: &Engine<S>,
        uid: String,
        symbol: String,
        amount: Decimal,
        limit_price: Decimal,
    ) -> CommandResult {
        let order_id = match engine.next_order_id() {
            Ok(id) => id,
            Err(e) => {
                return CommandResult::OrderError {
                    symbol,
                    signed_amount: amount,
                    limit_price,
                    message: e.to_string(),
                }
            }
        };

        let quantity = amount.abs();
        let result = if amount.is_sign_positive() {
            engine.submit_buy(order_id, &uid, &symbol, limit_price, quantity)
        } else {
            engine.submit_sell(order_id, &uid, &symbol, limit_price, quantity)
        };

        match result {
            Ok(()) => CommandResult::Opened { symbol, signed_amount: amount, limit_price, order_id },
            Err(e) => {
                warn!(order_id, uid, symbol, error = %e, "order admission rejected");
                CommandResult::OrderError { symbol, signed_amount: amount, limit_price, message: e.to_string() }
            }
        }
    }
}
