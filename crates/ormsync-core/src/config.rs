//! Migration configuration.

use crate::migration::ledger::DEFAULT_HISTORY_TABLE;
use std::path::PathBuf;

/// Default directory holding migration scripts.
pub const DEFAULT_MIGRATIONS_DIR: &str = "./migrations";

/// Migration configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MigrationConfig {
    /// Name of the history table.
    pub history_table: String,

    /// Directory holding `<name>.sql` and `<name>.down.sql` scripts.
    pub migrations_dir: PathBuf,

    /// Whether each script runs inside one transaction.
    ///
    /// Disable for databases that cannot run DDL inside a transaction.
    pub use_transaction: bool,
}

impl MigrationConfig {
    /// Create a configuration with default settings.
    pub fn new() -> Self {
        Self {
            history_table: DEFAULT_HISTORY_TABLE.to_string(),
            migrations_dir: PathBuf::from(DEFAULT_MIGRATIONS_DIR),
            use_transaction: true,
        }
    }

    /// Set the history table name.
    pub fn with_history_table(mut self, table: impl Into<String>) -> Self {
        self.history_table = table.into();
        self
    }

    /// Set the migrations directory.
    pub fn with_migrations_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.migrations_dir = dir.into();
        self
    }

    /// Enable or disable transactional scripts.
    pub fn with_transaction(mut self, use_transaction: bool) -> Self {
        self.use_transaction = use_transaction;
        self
    }
}

impl Default for MigrationConfig {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = MigrationConfig::default();
        assert_eq!(config.history_table, "migrations");
        assert_eq!(config.migrations_dir, PathBuf::from("./migrations"));
        assert!(config.use_transaction);
    }

    #[test]
    fn test_builder() {
        let config = MigrationConfig::new()
            .with_history_table("schema_history")
            .with_migrations_dir("/tmp/m")
            .with_transaction(false);
        assert_eq!(config.history_table, "schema_history");
        assert_eq!(config.migrations_dir, PathBuf::from("/tmp/m"));
        assert!(!config.use_transaction);
    }
}
