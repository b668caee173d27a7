//! DDL rendering.
//!
//! The dialect follows the connection's driver. MySQL accepts inline indexes,
//! `AUTO_INCREMENT` and in-place column changes. SQLite gets the identity as
//! an `INTEGER PRIMARY KEY AUTOINCREMENT` rowid alias, standalone
//! `CREATE INDEX` statements and one `ALTER TABLE` per added column.

use super::normalize::{escape_string_literal, normalize_default, quote_identifier};
use crate::catalog::{ColumnDescriptor, ColumnType, DefaultValue};
use crate::connection::{Connection, Driver};
use crate::introspect::LiveColumn;

/// Name of the automatic index on a column.
pub fn index_name(table: &str, column: &str) -> String {
    format!("idx_{}_{}", table, column)
}

/// Name of the foreign key constraint on a column.
pub fn foreign_key_name(table: &str, column: &str) -> String {
    format!("fk_{}_{}", table, column)
}

/// A foreign key from one column to another table's identity column.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ForeignKey {
    /// Referencing column.
    pub column: String,
    /// Referenced table.
    pub referenced_table: String,
    /// Referenced column.
    pub referenced_column: String,
}

/// Renders column and table definitions for one database family.
///
/// String defaults go through the connection's native literal quoting when
/// it offers one, and manual escaping otherwise.
pub struct DdlRenderer<'c> {
    driver: Driver,
    conn: Option<&'c dyn Connection>,
}

impl<'c> DdlRenderer<'c> {
    /// Renderer for the connection's dialect, using its literal quoting.
    pub fn new(conn: &'c dyn Connection) -> Self {
        Self {
            driver: conn.driver(),
            conn: Some(conn),
        }
    }

    /// Renderer for a dialect, using manual escaping only.
    pub fn offline(driver: Driver) -> Self {
        Self { driver, conn: None }
    }

    /// Target database family.
    pub fn driver(&self) -> Driver {
        self.driver
    }

    /// Check if the identity column is rendered as the SQLite rowid alias,
    /// which carries its own `PRIMARY KEY`.
    pub fn is_rowid_alias(&self, column: &ColumnDescriptor, is_identity: bool) -> bool {
        self.driver == Driver::Sqlite && is_identity && column.auto_increment
    }

    /// The column as the database will report it back.
    pub fn as_rendered(&self, column: &ColumnDescriptor, is_identity: bool) -> ColumnDescriptor {
        if self.is_rowid_alias(column, is_identity) {
            ColumnDescriptor {
                column_type: ColumnType::Integer,
                length: None,
                scale: None,
                default: None,
                ..column.clone()
            }
        } else {
            column.clone()
        }
    }

    /// Check if indexes can be declared inside `CREATE TABLE`.
    pub fn inline_indexes(&self) -> bool {
        self.driver == Driver::MySql
    }

    /// Check if `ALTER TABLE` can modify columns and add constraints.
    pub fn alters_in_place(&self) -> bool {
        self.driver == Driver::MySql
    }

    /// Why a column cannot be added to an existing table, if it cannot.
    pub fn add_column_restriction(
        &self,
        column: &ColumnDescriptor,
        is_identity: bool,
    ) -> Option<&'static str> {
        match self.driver {
            Driver::MySql => None,
            Driver::Sqlite if self.is_rowid_alias(column, is_identity) => {
                Some("a PRIMARY KEY column cannot be added to an existing table")
            }
            Driver::Sqlite if !column.nullable && column.default.is_none() => {
                Some("a NOT NULL column without a default cannot be added to an existing table")
            }
            Driver::Sqlite => None,
        }
    }

    /// Quote a string literal.
    pub fn string_literal(&self, value: &str) -> String {
        self.conn
            .and_then(|c| c.quote_literal(value))
            .unwrap_or_else(|| escape_string_literal(value))
    }

    /// Render a default value.
    pub fn default_value(&self, value: &DefaultValue) -> String {
        match value {
            DefaultValue::Bool(true) => "1".to_string(),
            DefaultValue::Bool(false) => "0".to_string(),
            DefaultValue::Int(v) => v.to_string(),
            DefaultValue::Float(v) => v.to_string(),
            DefaultValue::String(s) => self.string_literal(s),
            DefaultValue::Expression { expression } => expression.clone(),
        }
    }

    /// `name type NULL|NOT NULL [DEFAULT v] [AUTO_INCREMENT]`.
    ///
    /// `AUTO_INCREMENT` is only rendered for the identity column.
    pub fn column_definition(&self, column: &ColumnDescriptor, is_identity: bool) -> String {
        if self.is_rowid_alias(column, is_identity) {
            return format!(
                "{} INTEGER NOT NULL PRIMARY KEY AUTOINCREMENT",
                quote_identifier(column.stored_name())
            );
        }
        let mut def = format!(
            "{} {} {}",
            quote_identifier(column.stored_name()),
            column.sql_type(),
            if column.nullable { "NULL" } else { "NOT NULL" }
        );
        if let Some(default) = &column.default {
            def.push_str(" DEFAULT ");
            def.push_str(&self.default_value(default));
        }
        if is_identity && column.auto_increment {
            def.push_str(" AUTO_INCREMENT");
        }
        def
    }

    /// Definition restoring an introspected column.
    pub fn live_column_definition(&self, column: &LiveColumn) -> String {
        let mut def = format!(
            "{} {} {}",
            quote_identifier(&column.name),
            column.full_type.to_uppercase(),
            if column.nullable { "NULL" } else { "NOT NULL" }
        );
        if let Some(default) = normalize_default(column.default.as_deref()) {
            def.push_str(" DEFAULT ");
            if default.parse::<f64>().is_ok() || default == "CURRENT_TIMESTAMP" {
                def.push_str(&default);
            } else {
                def.push_str(&self.string_literal(&default));
            }
        }
        if column.auto_increment && self.driver == Driver::MySql {
            def.push_str(" AUTO_INCREMENT");
        }
        def
    }

    /// `INDEX name (column)` or `UNIQUE INDEX name (column)`, inside `CREATE TABLE`.
    pub fn index_clause(&self, name: &str, column: &str, unique: bool) -> String {
        format!(
            "{}INDEX {} ({})",
            if unique { "UNIQUE " } else { "" },
            quote_identifier(name),
            quote_identifier(column)
        )
    }

    /// `CONSTRAINT name FOREIGN KEY (col) REFERENCES t (col) ON DELETE CASCADE`.
    pub fn foreign_key_clause(&self, table: &str, fk: &ForeignKey) -> String {
        format!(
            "CONSTRAINT {} FOREIGN KEY ({}) REFERENCES {} ({}) ON DELETE CASCADE",
            quote_identifier(&foreign_key_name(table, &fk.column)),
            quote_identifier(&fk.column),
            quote_identifier(&fk.referenced_table),
            quote_identifier(&fk.referenced_column)
        )
    }

    /// Standalone `CREATE [UNIQUE] INDEX IF NOT EXISTS`.
    pub fn create_index(&self, table: &str, name: &str, column: &str, unique: bool) -> String {
        format!(
            "CREATE {}INDEX IF NOT EXISTS {} ON {} ({})",
            if unique { "UNIQUE " } else { "" },
            quote_identifier(name),
            quote_identifier(table),
            quote_identifier(column)
        )
    }

    /// Standalone `DROP INDEX`.
    pub fn drop_index(&self, table: &str, name: &str) -> String {
        match self.driver {
            Driver::MySql => format!(
                "DROP INDEX {} ON {}",
                quote_identifier(name),
                quote_identifier(table)
            ),
            Driver::Sqlite => format!("DROP INDEX IF EXISTS {}", quote_identifier(name)),
        }
    }

    /// `CREATE TABLE IF NOT EXISTS` with one definition per line.
    pub fn create_table(&self, table: &str, definitions: &[String]) -> String {
        format!(
            "CREATE TABLE IF NOT EXISTS {} (\n    {}\n)",
            quote_identifier(table),
            definitions.join(",\n    ")
        )
    }

    /// `ALTER TABLE` statements applying the clauses in order.
    ///
    /// MySQL combines them into one statement; SQLite takes one clause per
    /// statement.
    pub fn alter_table(&self, table: &str, clauses: &[String]) -> Vec<String> {
        if clauses.is_empty() {
            return Vec::new();
        }
        match self.driver {
            Driver::MySql => vec![format!(
                "ALTER TABLE {}\n    {}",
                quote_identifier(table),
                clauses.join(",\n    ")
            )],
            Driver::Sqlite => clauses
                .iter()
                .map(|clause| format!("ALTER TABLE {} {}", quote_identifier(table), clause))
                .collect(),
        }
    }

    /// `DROP TABLE IF EXISTS`.
    pub fn drop_table(&self, table: &str) -> String {
        format!("DROP TABLE IF EXISTS {}", quote_identifier(table))
    }

    /// `PRIMARY KEY (a, b, ...)`.
    pub fn primary_key(&self, columns: &[&str]) -> String {
        let quoted: Vec<String> = columns.iter().map(|c| quote_identifier(c)).collect();
        format!("PRIMARY KEY ({})", quoted.join(", "))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::connection::SqliteConnection;

    #[test]
    fn test_column_definition() {
        let r = DdlRenderer::offline(Driver::MySql);

        let email = ColumnDescriptor::new("email", ColumnType::String);
        assert_eq!(r.column_definition(&email, false), "`email` VARCHAR(255) NOT NULL");

        let id = ColumnDescriptor::identity("id");
        assert_eq!(r.column_definition(&id, true), "`id` INT NOT NULL AUTO_INCREMENT");
        // Auto-increment is only honoured on the identity column.
        assert_eq!(r.column_definition(&id, false), "`id` INT NOT NULL");

        let active = ColumnDescriptor::new("active", ColumnType::Boolean)
            .with_default(DefaultValue::Bool(true));
        assert_eq!(
            r.column_definition(&active, false),
            "`active` TINYINT(1) NOT NULL DEFAULT 1"
        );

        let note = ColumnDescriptor::nullable("note", ColumnType::Text)
            .with_default(DefaultValue::String("it's".into()));
        assert_eq!(
            r.column_definition(&note, false),
            "`note` TEXT NULL DEFAULT 'it\\'s'"
        );
    }

    #[test]
    fn test_native_literal_quoting() {
        let conn = SqliteConnection::open_in_memory().unwrap();
        let r = DdlRenderer::new(&conn);
        assert_eq!(r.string_literal("it's"), "'it''s'");
    }

    #[test]
    fn test_live_column_definition() {
        let r = DdlRenderer::offline(Driver::MySql);

        let live = LiveColumn::new("email", "varchar(100)", true).with_default("'none'");
        assert_eq!(
            r.live_column_definition(&live),
            "`email` VARCHAR(100) NULL DEFAULT 'none'"
        );

        let live = LiveColumn::new("n", "int", false).with_default("0");
        assert_eq!(r.live_column_definition(&live), "`n` INT NOT NULL DEFAULT 0");
    }

    #[test]
    fn test_clauses() {
        let r = DdlRenderer::offline(Driver::MySql);
        let fk = ForeignKey {
            column: "author_id".into(),
            referenced_table: "users".into(),
            referenced_column: "id".into(),
        };
        assert_eq!(
            r.foreign_key_clause("posts", &fk),
            "CONSTRAINT `fk_posts_author_id` FOREIGN KEY (`author_id`) REFERENCES `users` (`id`) ON DELETE CASCADE"
        );
        assert_eq!(
            r.index_clause("uniq_email", "email", true),
            "UNIQUE INDEX `uniq_email` (`email`)"
        );
        assert_eq!(r.primary_key(&["a", "b"]), "PRIMARY KEY (`a`, `b`)");
        assert_eq!(
            r.alter_table("t", &["ADD COLUMN `a` INT NULL".into(), "DROP COLUMN `b`".into()]),
            vec!["ALTER TABLE `t`\n    ADD COLUMN `a` INT NULL,\n    DROP COLUMN `b`".to_string()]
        );
        assert!(r.alter_table("t", &[]).is_empty());
    }

    #[test]
    fn test_sqlite_dialect() {
        let r = DdlRenderer::offline(Driver::Sqlite);

        let id = ColumnDescriptor::identity("id");
        assert!(r.is_rowid_alias(&id, true));
        assert_eq!(
            r.column_definition(&id, true),
            "`id` INTEGER NOT NULL PRIMARY KEY AUTOINCREMENT"
        );
        assert_eq!(r.column_definition(&id, false), "`id` INT NOT NULL");

        let wide = ColumnDescriptor {
            auto_increment: true,
            ..ColumnDescriptor::new("id", ColumnType::BigInteger)
        };
        assert_eq!(r.as_rendered(&wide, true).column_type, ColumnType::Integer);
        assert_eq!(r.as_rendered(&wide, false).column_type, ColumnType::BigInteger);

        assert!(!r.inline_indexes());
        assert!(!r.alters_in_place());
        assert_eq!(
            r.create_index("posts", "idx_posts_author_id", "author_id", false),
            "CREATE INDEX IF NOT EXISTS `idx_posts_author_id` ON `posts` (`author_id`)"
        );
        assert_eq!(
            r.drop_index("posts", "idx_posts_author_id"),
            "DROP INDEX IF EXISTS `idx_posts_author_id`"
        );
        assert_eq!(
            r.alter_table("t", &["ADD COLUMN `a` INT NULL".into(), "ADD COLUMN `b` TEXT NULL".into()]),
            vec![
                "ALTER TABLE `t` ADD COLUMN `a` INT NULL".to_string(),
                "ALTER TABLE `t` ADD COLUMN `b` TEXT NULL".to_string(),
            ]
        );
    }

    #[test]
    fn test_add_column_restrictions() {
        let mysql = DdlRenderer::offline(Driver::MySql);
        let sqlite = DdlRenderer::offline(Driver::Sqlite);

        let required = ColumnDescriptor::new("email", ColumnType::String);
        assert!(mysql.add_column_restriction(&required, false).is_none());
        assert!(sqlite.add_column_restriction(&required, false).is_some());

        let defaulted = required.clone().with_default(DefaultValue::String("".into()));
        assert!(sqlite.add_column_restriction(&defaulted, false).is_none());

        let optional = ColumnDescriptor::nullable("note", ColumnType::Text);
        assert!(sqlite.add_column_restriction(&optional, false).is_none());

        let id = ColumnDescriptor::identity("id");
        assert!(sqlite.add_column_restriction(&id, true).is_some());
    }
}
