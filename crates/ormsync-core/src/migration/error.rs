//! Migration-specific error types.

use crate::connection::Driver;
use crate::error::Error;
use thiserror::Error;

/// Migration-specific errors.
#[derive(Debug, Error)]
pub enum MigrationError {
    /// Live schema of a table could not be read.
    #[error("cannot introspect table `{table}`: {source}")]
    Introspection {
        /// Table being introspected.
        table: String,
        /// Underlying error.
        #[source]
        source: Error,
    },

    /// A statement of a migration script failed; the script was rolled back
    /// when it ran inside a transaction.
    #[error("migration failed at statement {index} ({statement}): {source}")]
    Execution {
        /// One-based position of the failing statement.
        index: usize,
        /// The failing statement, abbreviated.
        statement: String,
        /// Underlying error.
        #[source]
        source: Error,
    },

    /// Transaction control failed around a migration script.
    #[error("migration transaction failed: {0}")]
    Transaction(#[source] Error),

    /// The history table could not be created, upgraded or read.
    #[error("migration ledger {operation} failed: {source}")]
    Ledger {
        /// Ledger operation.
        operation: &'static str,
        /// Underlying error.
        #[source]
        source: Error,
    },

    /// A migration script is missing.
    #[error("migration not found: {0}")]
    MigrationNotFound(String),

    /// A migration with the same name is already on disk.
    #[error("migration already exists: {0}")]
    MigrationExists(String),

    /// A descriptor cannot be turned into DDL.
    #[error("invalid entity descriptor `{entity}`: {message}")]
    InvalidDescriptor {
        /// Entity identifier.
        entity: String,
        /// What is wrong.
        message: String,
    },

    /// The database cannot express a column change in place.
    #[error("{driver} cannot alter column `{table}`.`{column}`: {reason}")]
    UnsupportedAlteration {
        /// Target database family.
        driver: Driver,
        /// Table being altered.
        table: String,
        /// Column being altered.
        column: String,
        /// What the database lacks.
        reason: String,
    },

    /// Migration files could not be read or written.
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

impl MigrationError {
    pub(crate) fn ledger(operation: &'static str) -> impl FnOnce(Error) -> Self {
        move |source| MigrationError::Ledger { operation, source }
    }

    pub(crate) fn introspection(table: &str) -> impl FnOnce(Error) -> Self + '_ {
        move |source| MigrationError::Introspection {
            table: table.to_string(),
            source,
        }
    }
}
