use std::path::PathBuf;

use thiserror::Error;

use crate::types::identifiers::{ImpressionId, ItemId};

/// Bad input, rejected before anything is written.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ValidationError {
    #[error("Item content must not be empty")]
    EmptyContent,
    #[error("Item has no category")]
    MissingCategory,
    #[error("Category name must not be empty")]
    EmptyCategoryName,
    #[error("Category weight must be positive, got {0}")]
    NonPositiveWeight(i64),
    #[error("Category weight must not exceed 4294967295, got {0}")]
    WeightTooLarge(i64),
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum NotFoundError {
    #[error("Category not found: {0}")]
    Category(String),
    #[error("Item not found: {0}")]
    Item(ItemId),
    #[error("Impression not found: {0}")]
    Impression(ImpressionId),
}

/// Failures of the persisted store. Fatal for the current operation.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("SQLite error: {0}")]
    Sqlite(#[from] rusqlite::Error),
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Corrupt row: {0}")]
    Corrupt(String),
    #[error("Store lock poisoned by a panicking caller")]
    Poisoned,
    #[error("Unsupported schema version {found} (this build supports up to {supported})")]
    UnsupportedSchema { found: i32, supported: i32 },
}

#[derive(Debug, Error)]
pub enum ImportError {
    #[error("Import path does not exist: {0}")]
    MissingPath(PathBuf),
    #[error("Failed to read {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

#[derive(Debug, Error)]
pub enum EpigramError {
    #[error(transparent)]
    Validation(#[from] ValidationError),

    #[error(transparent)]
    NotFound(#[from] NotFoundError),

    /// The store holds no categories at all. An existing but empty category
    /// yields the no-results sentinel instead.
    #[error("Store contains no categories")]
    NoContent,

    #[error(transparent)]
    Store(#[from] StoreError),

    #[error(transparent)]
    Import(#[from] ImportError),
}

impl From<rusqlite::Error> for EpigramError {
    fn from(e: rusqlite::Error) -> Self {
        match e {
            rusqlite::Error::FromSqlConversionFailure(..) | rusqlite::Error::IntegralValueOutOfRange(..) => {
                EpigramError::Store(StoreError::Corrupt(e.to_string()))
            }
            e => EpigramError::Store(StoreError::Sqlite(e)),
        }
    }
}
