use thiserror::Error;

/// The taxonomy a command-local failure is reported through. `Dispatcher` never lets
/// one of these escape a batch — it is captured into the offending command's result.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum EngineError {
    #[error("bad input: {0}")]
    BadInput(String),

    #[error("unknown account: {0}")]
    UnknownAccount(String),

    #[error("unknown position for account {uid} in {symbol}")]
    UnknownPosition { uid: String, symbol: String },

    #[error("account already exists: {0}")]
    DuplicateAccount(String),

    #[error("order {0} is not open")]
    NotOpen(u64),

    #[error("no such order: {0}")]
    Unknown(u64),

    #[error("insufficient funds")]
    InsufficientFunds,

    #[error("insufficient shares")]
    InsufficientShares,

    #[error("storage error: {0}")]
    StorageError(String),
}

pub type EngineResult<T> = Result<T, EngineError>;
