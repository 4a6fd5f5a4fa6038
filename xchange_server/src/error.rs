use thiserror::Error;

/// Transport/framing-level failures — these never reach the engine; they abort the
/// connection before a single command runs, per §5/§7 ("no engine work was performed").
#[derive(Debug, Error)]
pub enum ServerError {
    #[error("bad length header")]
    BadHeader,

    #[error("short read: expected {expected} bytes, connection closed early")]
    ShortRead { expected: usize },

    #[error(transparent)]
    Io(#[from] std::io::Error),
}
