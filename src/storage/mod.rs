//! Bar storage
//!
//! SQLite database with a single `bars` table

mod store;

pub use store::{Store, SymbolSummary};

use thiserror::Error;

/// Storage errors
#[derive(Debug, Error)]
pub enum StoreError {
    /// SQLite failure
    #[error("Database error: {0}")]
    Sqlite(#[from] rusqlite::Error),
    /// Filesystem failure
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    /// Stored timestamp could not be parsed
    #[error("Invalid timestamp in database: {0}")]
    InvalidTimestamp(String),
}
