//! MySQL / MariaDB introspection through `information_schema`.

use super::{DialectIntrospector, LiveColumn, LiveColumns, LiveForeignKey};
use crate::connection::{Connection, Value};
use crate::error::Error;

const TABLE_EXISTS_SQL: &str = "SELECT COUNT(*) AS cnt FROM information_schema.TABLES \
     WHERE TABLE_SCHEMA = DATABASE() AND TABLE_NAME = ?";

const COLUMNS_SQL: &str = "SELECT COLUMN_NAME, COLUMN_TYPE, IS_NULLABLE, COLUMN_DEFAULT, EXTRA \
     FROM information_schema.COLUMNS \
     WHERE TABLE_SCHEMA = DATABASE() AND TABLE_NAME = ? \
     ORDER BY ORDINAL_POSITION";

const FOREIGN_KEYS_SQL: &str = "SELECT CONSTRAINT_NAME, COLUMN_NAME, REFERENCED_TABLE_NAME, \
     REFERENCED_COLUMN_NAME FROM information_schema.KEY_COLUMN_USAGE \
     WHERE TABLE_SCHEMA = DATABASE() AND TABLE_NAME = ? AND REFERENCED_TABLE_NAME IS NOT NULL \
     ORDER BY CONSTRAINT_NAME, ORDINAL_POSITION";

/// Introspector reading the server catalog views of the current schema.
#[derive(Debug, Clone, Copy, Default)]
pub struct MySqlIntrospector;

impl DialectIntrospector for MySqlIntrospector {
    fn table_exists(&self, conn: &dyn Connection, table: &str) -> Result<bool, Error> {
        let row = conn.fetch_one(TABLE_EXISTS_SQL, &[Value::from(table)])?;
        Ok(row.and_then(|r| r.int("cnt")).unwrap_or(0) > 0)
    }

    fn existing_columns(&self, conn: &dyn Connection, table: &str) -> Result<LiveColumns, Error> {
        let rows = conn.fetch_all(COLUMNS_SQL, &[Value::from(table)])?;
        if rows.is_empty() {
            return Err(Error::TableNotFound(table.to_string()));
        }

        let mut columns = LiveColumns::with_capacity(rows.len());
        for row in rows {
            let name = row
                .text("COLUMN_NAME")
                .ok_or_else(|| Error::InvalidRow("missing COLUMN_NAME".into()))?;
            let full_type = row
                .text("COLUMN_TYPE")
                .ok_or_else(|| Error::InvalidRow(format!("missing COLUMN_TYPE for {}", name)))?;
            let nullable = row
                .text("IS_NULLABLE")
                .is_some_and(|v| v.eq_ignore_ascii_case("YES"));
            let auto_increment = row
                .text("EXTRA")
                .is_some_and(|v| v.to_ascii_lowercase().contains("auto_increment"));

            columns.insert(
                name.clone(),
                LiveColumn {
                    name,
                    full_type,
                    nullable,
                    default: row.text("COLUMN_DEFAULT"),
                    auto_increment,
                },
            );
        }
        Ok(columns)
    }

    fn foreign_keys(&self, conn: &dyn Connection, table: &str) -> Result<Vec<LiveForeignKey>, Error> {
        let rows = conn.fetch_all(FOREIGN_KEYS_SQL, &[Value::from(table)])?;
        rows.into_iter()
            .map(|row| {
                let column = row
                    .text("COLUMN_NAME")
                    .ok_or_else(|| Error::InvalidRow("missing COLUMN_NAME".into()))?;
                let referenced_table = row.text("REFERENCED_TABLE_NAME").ok_or_else(|| {
                    Error::InvalidRow(format!("missing REFERENCED_TABLE_NAME for {}", column))
                })?;
                Ok(LiveForeignKey {
                    name: row.text("CONSTRAINT_NAME"),
                    column,
                    referenced_table,
                    referenced_column: row.text("REFERENCED_COLUMN_NAME").unwrap_or_default(),
                })
            })
            .collect()
    }
}
