//! Database connection abstraction.
//!
//! The migration engine only talks to a database through [`Connection`]:
//! statement execution, row fetching, transaction control and the driver
//! identity used to pick dialect-specific introspection.

#[cfg(feature = "mysql")]
mod mysql;
mod sqlite;
#[cfg(test)]
pub(crate) mod testing;
mod value;

#[cfg(feature = "mysql")]
pub use mysql::MySqlConnection;
pub use sqlite::SqliteConnection;
pub use value::{Row, Value};

use crate::error::Error;

/// Database family behind a connection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Driver {
    /// MySQL / MariaDB (server catalog introspection).
    MySql,
    /// SQLite (embedded, pragma introspection).
    Sqlite,
}

impl std::fmt::Display for Driver {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Driver::MySql => write!(f, "mysql"),
            Driver::Sqlite => write!(f, "sqlite"),
        }
    }
}

/// A blocking database connection.
///
/// Placeholders are positional `?` for every driver.
pub trait Connection {
    /// Driver identity.
    fn driver(&self) -> Driver;

    /// Execute a statement, returning the number of affected rows.
    fn execute(&self, sql: &str, params: &[Value]) -> Result<u64, Error>;

    /// Fetch all rows of a query.
    fn fetch_all(&self, sql: &str, params: &[Value]) -> Result<Vec<Row>, Error>;

    /// Fetch the first row of a query.
    fn fetch_one(&self, sql: &str, params: &[Value]) -> Result<Option<Row>, Error> {
        Ok(self.fetch_all(sql, params)?.into_iter().next())
    }

    /// Begin a transaction.
    fn begin_transaction(&self) -> Result<(), Error>;

    /// Commit the active transaction.
    fn commit(&self) -> Result<(), Error>;

    /// Roll back the active transaction.
    fn rollback(&self) -> Result<(), Error>;

    /// Check if a transaction is active.
    fn in_transaction(&self) -> bool;

    /// Quote a string literal using the driver's own escaping, if it has one.
    fn quote_literal(&self, _value: &str) -> Option<String> {
        None
    }
}

/// Open a connection from a URL.
///
/// Accepted forms: `sqlite://<path>`, `sqlite::memory:`, a bare file path
/// (SQLite), and `mysql://...` when built with the `mysql` feature.
pub fn open(url: &str) -> Result<Box<dyn Connection>, Error> {
    if url == "sqlite::memory:" || url == ":memory:" {
        return Ok(Box::new(SqliteConnection::open_in_memory()?));
    }
    if let Some(path) = url.strip_prefix("sqlite://") {
        return Ok(Box::new(SqliteConnection::open(path)?));
    }
    if url.starts_with("mysql://") || url.starts_with("mariadb://") {
        #[cfg(feature = "mysql")]
        {
            return Ok(Box::new(MySqlConnection::connect(url)?));
        }
        #[cfg(not(feature = "mysql"))]
        {
            return Err(Error::UnsupportedDriver(
                "mysql (rebuild with the `mysql` feature)".to_string(),
            ));
        }
    }
    if url.contains("://") {
        return Err(Error::UnsupportedDriver(url.to_string()));
    }
    Ok(Box::new(SqliteConnection::open(url)?))
}
