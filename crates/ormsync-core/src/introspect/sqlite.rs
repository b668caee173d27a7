//! SQLite introspection through `PRAGMA table_info`.

use super::{DialectIntrospector, LiveColumn, LiveColumns, LiveForeignKey};
use crate::connection::{Connection, Value};
use crate::error::Error;
use crate::migration::normalize::quote_identifier;

/// Introspector using SQLite's structural pragmas.
#[derive(Debug, Clone, Copy, Default)]
pub struct SqliteIntrospector;

impl DialectIntrospector for SqliteIntrospector {
    fn table_exists(&self, conn: &dyn Connection, table: &str) -> Result<bool, Error> {
        let row = conn.fetch_one(
            "SELECT COUNT(*) AS cnt FROM sqlite_master WHERE type = 'table' AND name = ?",
            &[Value::from(table)],
        )?;
        Ok(row.and_then(|r| r.int("cnt")).unwrap_or(0) > 0)
    }

    fn existing_columns(&self, conn: &dyn Connection, table: &str) -> Result<LiveColumns, Error> {
        let sql = format!("PRAGMA table_info({})", quote_identifier(table));
        let rows = conn.fetch_all(&sql, &[])?;
        if rows.is_empty() {
            return Err(Error::TableNotFound(table.to_string()));
        }

        let mut columns = LiveColumns::with_capacity(rows.len());
        for row in rows {
            let name = row
                .text("name")
                .ok_or_else(|| Error::InvalidRow("missing column name".into()))?;
            let full_type = row.text("type").unwrap_or_default();
            let primary_key = row.int("pk").unwrap_or(0) > 0;
            // Primary keys never hold NULL even when the pragma says otherwise.
            let nullable = row.int("notnull").unwrap_or(0) == 0 && !primary_key;
            // An INTEGER primary key aliases the rowid.
            let auto_increment = primary_key && full_type.eq_ignore_ascii_case("integer");

            columns.insert(
                name.clone(),
                LiveColumn {
                    name,
                    full_type,
                    nullable,
                    default: row.text("dflt_value"),
                    auto_increment,
                },
            );
        }
        Ok(columns)
    }

    fn foreign_keys(&self, conn: &dyn Connection, table: &str) -> Result<Vec<LiveForeignKey>, Error> {
        let sql = format!("PRAGMA foreign_key_list({})", quote_identifier(table));
        conn.fetch_all(&sql, &[])?
            .into_iter()
            .map(|row| {
                let column = row
                    .text("from")
                    .ok_or_else(|| Error::InvalidRow("missing foreign key column".into()))?;
                let referenced_table = row.text("table").ok_or_else(|| {
                    Error::InvalidRow(format!("missing referenced table for {}", column))
                })?;
                Ok(LiveForeignKey {
                    name: None,
                    column,
                    referenced_table,
                    // NULL when the reference targets the primary key implicitly.
                    referenced_column: row.text("to").unwrap_or_default(),
                })
            })
            .collect()
    }
}
