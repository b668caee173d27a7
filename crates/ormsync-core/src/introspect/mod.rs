//! Live schema introspection.
//!
//! A [`DialectIntrospector`] knows how one database family describes its
//! tables. [`SchemaIntrospector`] picks the strategy once from the
//! connection's driver and answers table existence, live columns and live
//! foreign keys.
//!
//! Introspection never degrades to an empty result: a table that cannot be
//! described is an error, because an empty column set would make every
//! declared column look new.

mod mysql;
mod sqlite;

pub use mysql::MySqlIntrospector;
pub use sqlite::SqliteIntrospector;

use crate::connection::{Connection, Driver};
use crate::error::Error;
use std::collections::HashMap;

/// A column as it currently exists in the database.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LiveColumn {
    /// Column name.
    pub name: String,
    /// Full SQL type including length/precision (e.g. `varchar(255)`).
    pub full_type: String,
    /// Whether the column accepts NULL.
    pub nullable: bool,
    /// Raw default as reported by the catalog.
    pub default: Option<String>,
    /// Whether the column is auto-incremented.
    pub auto_increment: bool,
}

impl LiveColumn {
    /// Create a live column.
    pub fn new(name: impl Into<String>, full_type: impl Into<String>, nullable: bool) -> Self {
        Self {
            name: name.into(),
            full_type: full_type.into(),
            nullable,
            default: None,
            auto_increment: false,
        }
    }

    /// Set the raw default.
    pub fn with_default(mut self, default: impl Into<String>) -> Self {
        self.default = Some(default.into());
        self
    }

    /// Mark as auto-increment.
    pub fn with_auto_increment(mut self) -> Self {
        self.auto_increment = true;
        self
    }
}

/// Live columns keyed by column name.
pub type LiveColumns = HashMap<String, LiveColumn>;

/// A foreign key constraint as it currently exists in the database.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LiveForeignKey {
    /// Constraint name; SQLite does not report one.
    pub name: Option<String>,
    /// Referencing column.
    pub column: String,
    /// Referenced table.
    pub referenced_table: String,
    /// Referenced column.
    pub referenced_column: String,
}

/// Dialect-specific catalog access.
pub trait DialectIntrospector: Send + Sync {
    /// Check if a table exists.
    fn table_exists(&self, conn: &dyn Connection, table: &str) -> Result<bool, Error>;

    /// Describe the live columns of a table.
    ///
    /// Must return an error rather than an empty map when the table cannot
    /// be described.
    fn existing_columns(&self, conn: &dyn Connection, table: &str) -> Result<LiveColumns, Error>;

    /// List the foreign keys declared on a table.
    fn foreign_keys(&self, conn: &dyn Connection, table: &str) -> Result<Vec<LiveForeignKey>, Error>;
}

/// Introspector bound to one connection.
pub struct SchemaIntrospector<'c> {
    conn: &'c dyn Connection,
    dialect: Box<dyn DialectIntrospector>,
}

impl<'c> SchemaIntrospector<'c> {
    /// Select the dialect strategy from the connection's driver.
    pub fn for_connection(conn: &'c dyn Connection) -> Self {
        let dialect: Box<dyn DialectIntrospector> = match conn.driver() {
            Driver::MySql => Box::new(MySqlIntrospector),
            Driver::Sqlite => Box::new(SqliteIntrospector),
        };
        Self { conn, dialect }
    }

    /// Check if a table exists.
    pub fn table_exists(&self, table: &str) -> Result<bool, Error> {
        self.dialect.table_exists(self.conn, table)
    }

    /// Describe the live columns of a table.
    pub fn existing_columns(&self, table: &str) -> Result<LiveColumns, Error> {
        let columns = self.dialect.existing_columns(self.conn, table)?;
        tracing::debug!(table, columns = columns.len(), "introspected table");
        Ok(columns)
    }

    /// List the foreign keys declared on a table.
    pub fn foreign_keys(&self, table: &str) -> Result<Vec<LiveForeignKey>, Error> {
        self.dialect.foreign_keys(self.conn, table)
    }
}
