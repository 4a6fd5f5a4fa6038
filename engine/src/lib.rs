//! Single-venue continuous-limit-order matching engine and account/position ledger.
//!
//! This crate is the CORE: the order-book data structure, the order life-cycle,
//! the transaction pricing rule, and the batch-level concurrency discipline. It
//! knows nothing about sockets, framing, or XML — those live in `xchange_server`.

pub mod book;
pub mod dispatch;
pub mod engine;
pub mod error;
pub mod keys;
pub mod ledger;
pub mod orders;
pub mod store;

pub use dispatch::{Command, CommandResult, Dispatcher};
pub use engine::{CancelOutcome, Engine, QueryOutcome};
pub use error::{EngineError, EngineResult};
pub use orders::{CancelEntry, ExecutedEntry, OpenOrder, Side};
pub use store::{MemoryStore, Store};
