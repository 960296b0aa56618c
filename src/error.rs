//! Error types for the import pipeline, the collection store and settings.

use thiserror::Error;

/// Raised when an import file has no header row to key the data rows on.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ParseError {
    #[error("import file has no header row")]
    MissingHeader,
}

#[derive(Error, Debug)]
pub enum StoreError {
    #[error("database error: {0}")]
    Database(#[from] rusqlite::Error),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("invalid record {id}: {reason}")]
    InvalidRecord { id: String, reason: String },

    #[error("corrupt stored value in column {column}: {value}")]
    Corrupt { column: &'static str, value: String },
}

/// Batch-level failure of one import. Nothing from the batch is persisted
/// when this is returned.
#[derive(Error, Debug)]
pub enum ImportError {
    #[error(transparent)]
    Parse(#[from] ParseError),

    #[error("failed to persist import batch: {0}")]
    Store(#[from] StoreError),
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ConfigError {
    #[error("goal target for {0} must be a positive integer")]
    NonPositiveTarget(&'static str),
}
