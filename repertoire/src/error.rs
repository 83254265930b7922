//! Error types, layered the way the call graph is layered.
//!
//! Absence is never an error here: unknown positions, empty move maps and
//! missing reports all come back as `None`/empty from the respective APIs.

use thiserror::Error;

/// Errors from the key-value backend.
#[derive(Debug, Error)]
pub enum KvError {
    /// Conditional create lost: the path already exists on the record.
    #[error("conditional write failed: path already exists")]
    AlreadyExists,
    /// A stored item is not the JSON object shape this crate writes.
    #[error("malformed stored item: {0}")]
    Malformed(String),
    /// Transient backend failure; retry policy is the caller's concern.
    #[error("store unavailable: {0}")]
    Unavailable(String),
}

/// Errors from the persistence layer.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("invalid record key: {0}")]
    InvalidKey(String),
    #[error("corrupt record {partition}/{sort}: {reason}")]
    Corrupt {
        partition: String,
        sort: String,
        reason: String,
    },
    #[error(transparent)]
    Kv(#[from] KvError),
}

/// Errors surfaced by the repertoire service, linker and analyzer.
#[derive(Debug, Error)]
pub enum RepertoireError {
    /// The supplied move is not legal in the given position; nothing was
    /// persisted.
    #[error("move {mv} is not legal in {fen}")]
    InvalidMove { fen: String, mv: String },
    #[error("invalid FEN: {0}")]
    InvalidFen(String),
    #[error(transparent)]
    Store(#[from] StoreError),
}

impl From<board::BoardError> for RepertoireError {
    fn from(e: board::BoardError) -> Self {
        match e {
            board::BoardError::InvalidFen(fen) => Self::InvalidFen(fen),
            board::BoardError::IllegalMove { fen, mv } => Self::InvalidMove { fen, mv },
        }
    }
}
