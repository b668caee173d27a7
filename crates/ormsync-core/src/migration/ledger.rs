//! Migration ledger.
//!
//! The history table is the single source of truth for which migrations
//! have been applied or rolled back. Nothing is cached between calls, so a
//! fresh process sees exactly what previous runs recorded.

use super::error::MigrationError;
use super::normalize::quote_identifier;
use crate::connection::{Connection, Driver, Row, Value};
use crate::error::Error;
use crate::introspect::SchemaIntrospector;
use chrono::{DateTime, NaiveDateTime, Utc};
use serde::Serialize;
use std::cell::Cell;

/// Default name of the history table.
pub const DEFAULT_HISTORY_TABLE: &str = "migrations";

/// Timestamp layout of the `executed_at` and `rolled_back_at` columns.
pub const TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// Prefix of generated migration names.
pub const NAME_PREFIX: &str = "Version";

/// One row of the history table.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MigrationRecord {
    /// Migration name.
    pub name: String,
    /// When the migration was last applied.
    pub executed_at: DateTime<Utc>,
    /// Whether the migration has been rolled back since.
    pub rolled_back: bool,
    /// When the migration was rolled back.
    pub rolled_back_at: Option<DateTime<Utc>>,
}

/// Reads and writes the migration history table.
pub struct Ledger<'c> {
    conn: &'c dyn Connection,
    table: String,
    ready: Cell<bool>,
}

impl<'c> Ledger<'c> {
    /// Create a ledger over the default history table.
    pub fn new(conn: &'c dyn Connection) -> Self {
        Self::with_table(conn, DEFAULT_HISTORY_TABLE)
    }

    /// Create a ledger over a named history table.
    pub fn with_table(conn: &'c dyn Connection, table: impl Into<String>) -> Self {
        Self {
            conn,
            table: table.into(),
            ready: Cell::new(false),
        }
    }

    /// History table name.
    pub fn table(&self) -> &str {
        &self.table
    }

    /// Create the history table, or upgrade an older one lacking the
    /// rollback columns.
    pub fn ensure_table(&self) -> Result<(), MigrationError> {
        if self.ready.get() {
            return Ok(());
        }

        let introspector = SchemaIntrospector::for_connection(self.conn);
        let exists = introspector
            .table_exists(&self.table)
            .map_err(MigrationError::ledger("create"))?;

        if exists {
            let live = introspector
                .existing_columns(&self.table)
                .map_err(MigrationError::ledger("upgrade"))?;
            for (column, definition) in self.rollback_columns() {
                if live.contains_key(column) {
                    continue;
                }
                self.add_column(column, definition)?;
            }
        } else {
            tracing::info!(table = %self.table, "creating migration history table");
            self.conn
                .execute(&self.create_table_sql(), &[])
                .map_err(MigrationError::ledger("create"))?;
        }

        self.ready.set(true);
        Ok(())
    }

    fn add_column(&self, column: &str, definition: &str) -> Result<(), MigrationError> {
        let sql = format!(
            "ALTER TABLE {} ADD COLUMN {} {}",
            quote_identifier(&self.table),
            quote_identifier(column),
            definition
        );
        match self.conn.execute(&sql, &[]) {
            Ok(_) => {
                tracing::info!(table = %self.table, column, "upgraded migration history table");
                Ok(())
            }
            // Another run added it first.
            Err(e) if e.is_duplicate_column() => Ok(()),
            Err(e) => Err(MigrationError::ledger("upgrade")(e)),
        }
    }

    fn create_table_sql(&self) -> String {
        let table = quote_identifier(&self.table);
        match self.conn.driver() {
            Driver::MySql => format!(
                "CREATE TABLE IF NOT EXISTS {} (\n    \
                 `id` INT NOT NULL AUTO_INCREMENT PRIMARY KEY,\n    \
                 `migration` VARCHAR(255) NOT NULL UNIQUE,\n    \
                 `executed_at` DATETIME NOT NULL,\n    \
                 `rolled_back` TINYINT(1) NOT NULL DEFAULT 0,\n    \
                 `rolled_back_at` DATETIME NULL\n)",
                table
            ),
            Driver::Sqlite => format!(
                "CREATE TABLE IF NOT EXISTS {} (\n    \
                 `id` INTEGER PRIMARY KEY AUTOINCREMENT,\n    \
                 `migration` TEXT NOT NULL UNIQUE,\n    \
                 `executed_at` TEXT NOT NULL,\n    \
                 `rolled_back` INTEGER NOT NULL DEFAULT 0,\n    \
                 `rolled_back_at` TEXT NULL\n)",
                table
            ),
        }
    }

    fn rollback_columns(&self) -> [(&'static str, &'static str); 2] {
        match self.conn.driver() {
            Driver::MySql => [
                ("rolled_back", "TINYINT(1) NOT NULL DEFAULT 0"),
                ("rolled_back_at", "DATETIME NULL"),
            ],
            Driver::Sqlite => [
                ("rolled_back", "INTEGER NOT NULL DEFAULT 0"),
                ("rolled_back_at", "TEXT NULL"),
            ],
        }
    }

    /// Record a migration as applied now.
    pub fn mark_executed(&self, name: &str) -> Result<(), MigrationError> {
        self.mark_executed_at(name, Utc::now())
    }

    /// Record a migration as applied at a given time.
    ///
    /// Re-applying a rolled-back migration clears its rollback flag.
    pub fn mark_executed_at(&self, name: &str, at: DateTime<Utc>) -> Result<(), MigrationError> {
        self.ensure_table()?;
        let table = quote_identifier(&self.table);
        let sql = match self.conn.driver() {
            Driver::MySql => format!(
                "INSERT INTO {} (`migration`, `executed_at`, `rolled_back`, `rolled_back_at`) \
                 VALUES (?, ?, 0, NULL) \
                 ON DUPLICATE KEY UPDATE `executed_at` = VALUES(`executed_at`), \
                 `rolled_back` = 0, `rolled_back_at` = NULL",
                table
            ),
            Driver::Sqlite => format!(
                "INSERT INTO {} (`migration`, `executed_at`, `rolled_back`, `rolled_back_at`) \
                 VALUES (?, ?, 0, NULL) \
                 ON CONFLICT(`migration`) DO UPDATE SET `executed_at` = excluded.`executed_at`, \
                 `rolled_back` = 0, `rolled_back_at` = NULL",
                table
            ),
        };
        self.conn
            .execute(&sql, &[Value::from(name), Value::from(format_timestamp(at))])
            .map_err(MigrationError::ledger("write"))?;
        tracing::debug!(migration = name, "marked executed");
        Ok(())
    }

    /// Record a migration as rolled back now.
    pub fn mark_rolled_back(&self, name: &str) -> Result<(), MigrationError> {
        self.mark_rolled_back_at(name, Utc::now())
    }

    /// Record a migration as rolled back at a given time.
    pub fn mark_rolled_back_at(&self, name: &str, at: DateTime<Utc>) -> Result<(), MigrationError> {
        self.ensure_table()?;
        let sql = format!(
            "UPDATE {} SET `rolled_back` = 1, `rolled_back_at` = ? WHERE `migration` = ?",
            quote_identifier(&self.table)
        );
        let affected = self
            .conn
            .execute(&sql, &[Value::from(format_timestamp(at)), Value::from(name)])
            .map_err(MigrationError::ledger("write"))?;
        if affected == 0 {
            tracing::warn!(migration = name, "rolled back a migration the ledger never recorded");
        }
        Ok(())
    }

    /// Check if a migration is applied and not rolled back.
    pub fn is_executed(&self, name: &str) -> Result<bool, MigrationError> {
        self.ensure_table()?;
        let sql = format!(
            "SELECT COUNT(*) AS cnt FROM {} WHERE `migration` = ? AND `rolled_back` = 0",
            quote_identifier(&self.table)
        );
        let row = self
            .conn
            .fetch_one(&sql, &[Value::from(name)])
            .map_err(MigrationError::ledger("read"))?;
        Ok(row.and_then(|r| r.int("cnt")).unwrap_or(0) > 0)
    }

    /// Applied migrations in execution order, optionally including rolled-back ones.
    pub fn executed_migrations(
        &self,
        include_rolled_back: bool,
    ) -> Result<Vec<MigrationRecord>, MigrationError> {
        let filter = if include_rolled_back {
            ""
        } else {
            " WHERE `rolled_back` = 0"
        };
        self.select(filter, "ASC")
    }

    /// Names of migrations eligible for rollback, most recent first.
    pub fn migrations_to_rollback(
        &self,
        limit: Option<usize>,
    ) -> Result<Vec<String>, MigrationError> {
        let mut names: Vec<String> = self
            .select(" WHERE `rolled_back` = 0", "DESC")?
            .into_iter()
            .map(|r| r.name)
            .collect();
        if let Some(limit) = limit {
            names.truncate(limit);
        }
        Ok(names)
    }

    fn select(&self, filter: &str, direction: &str) -> Result<Vec<MigrationRecord>, MigrationError> {
        self.ensure_table()?;
        // Timestamps are read back as text so every driver decodes them alike.
        let sql = format!(
            "SELECT `migration`, CAST(`executed_at` AS CHAR) AS executed_at, `rolled_back`, \
             CAST(`rolled_back_at` AS CHAR) AS rolled_back_at \
             FROM {}{} ORDER BY `executed_at` {dir}, `id` {dir}",
            quote_identifier(&self.table),
            filter,
            dir = direction
        );
        let rows = self
            .conn
            .fetch_all(&sql, &[])
            .map_err(MigrationError::ledger("read"))?;
        rows.iter()
            .map(record_from_row)
            .collect::<Result<_, _>>()
            .map_err(MigrationError::ledger("read"))
    }

    /// A fresh migration name for the current time.
    pub fn generate_name() -> String {
        Self::generate_name_at(Utc::now())
    }

    /// Migration name for a given time: `Version` followed by `YYYYMMDDHHMMSS`.
    pub fn generate_name_at(at: DateTime<Utc>) -> String {
        format!("{}{}", NAME_PREFIX, at.format("%Y%m%d%H%M%S"))
    }
}

fn format_timestamp(at: DateTime<Utc>) -> String {
    at.format(TIMESTAMP_FORMAT).to_string()
}

fn parse_timestamp(raw: &str) -> Result<DateTime<Utc>, Error> {
    // Servers may append fractional seconds.
    let trimmed = raw.split('.').next().unwrap_or(raw);
    NaiveDateTime::parse_from_str(trimmed, TIMESTAMP_FORMAT)
        .map(|dt| dt.and_utc())
        .map_err(|e| Error::InvalidRow(format!("bad ledger timestamp {:?}: {}", raw, e)))
}

fn record_from_row(row: &Row) -> Result<MigrationRecord, Error> {
    let name = row
        .text("migration")
        .ok_or_else(|| Error::InvalidRow("missing migration name".into()))?;
    let executed_at = row
        .text("executed_at")
        .ok_or_else(|| Error::InvalidRow(format!("missing executed_at for {}", name)))?;
    let rolled_back_at = match row.text("rolled_back_at") {
        Some(raw) => Some(parse_timestamp(&raw)?),
        None => None,
    };
    Ok(MigrationRecord {
        executed_at: parse_timestamp(&executed_at)?,
        rolled_back: row.int("rolled_back").unwrap_or(0) != 0,
        rolled_back_at,
        name,
    })
}
