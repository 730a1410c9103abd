//! Error types for the quotesync engine.

use crate::RecordId;
use thiserror::Error;

/// All possible errors from the quotesync engine.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum Error {
    // Persistence errors
    #[error("persisted records are corrupt: {0}")]
    StorageCorrupt(String),

    #[error("storage failure: {0}")]
    Storage(String),

    // Validation errors
    #[error("invalid record: {0}")]
    InvalidRecord(String),

    #[error("invalid import: {0}")]
    InvalidImport(String),

    #[error("unknown resolution policy: {0}")]
    UnknownPolicy(String),

    // Lookup errors
    #[error("record not found: {0}")]
    RecordNotFound(RecordId),

    #[error("no pending conflict for record: {0}")]
    ConflictNotFound(RecordId),
}

/// Result type for engine operations.
pub type Result<T> = std::result::Result<T, Error>;
