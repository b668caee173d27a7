//! Core error types.

use thiserror::Error;

/// Driver-level and metadata errors.
#[derive(Debug, Error)]
pub enum Error {
    /// SQLite driver error.
    #[error("sqlite error: {0}")]
    Sqlite(#[from] rusqlite::Error),

    /// MySQL driver error.
    #[cfg(feature = "mysql")]
    #[error("mysql error: {0}")]
    MySql(#[from] sqlx::Error),

    /// Generic database error reported by a connection.
    #[error("database error: {0}")]
    Database(String),

    /// Commit or rollback without an active transaction.
    #[error("no active transaction")]
    NoTransaction,

    /// Unsupported connection URL or driver.
    #[error("unsupported driver: {0}")]
    UnsupportedDriver(String),

    /// A result row did not have the expected shape.
    #[error("invalid row: {0}")]
    InvalidRow(String),

    /// Table is not present in the database catalog.
    #[error("table not found: {0}")]
    TableNotFound(String),

    /// Entity identifier not present in the catalog.
    #[error("unknown entity: {0}")]
    UnknownEntity(String),

    /// Descriptor file could not be parsed.
    #[error("descriptor error: {0}")]
    Json(#[from] serde_json::Error),

    /// IO error.
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

impl Error {
    /// Check if the error reports a column that already exists.
    ///
    /// Matches SQLite's "duplicate column name" and MySQL's error 1060
    /// ("Duplicate column name").
    pub fn is_duplicate_column(&self) -> bool {
        self.to_string()
            .to_ascii_lowercase()
            .contains("duplicate column")
    }
}
