//! Migration orchestration: apply, roll back and report.

use super::error::MigrationError;
use super::files::MigrationFiles;
use super::generator::GenerationReport;
use super::ledger::{Ledger, MigrationRecord};
use super::runner::MigrationRunner;
use crate::config::MigrationConfig;
use crate::connection::Connection;
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::collections::BTreeMap;

/// State of a migration as seen by `status`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum MigrationState {
    /// Script present, never applied.
    Pending,
    /// Applied and not rolled back.
    Executed,
    /// Applied, then rolled back.
    RolledBack,
}

impl std::fmt::Display for MigrationState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            MigrationState::Pending => write!(f, "pending"),
            MigrationState::Executed => write!(f, "executed"),
            MigrationState::RolledBack => write!(f, "rolled_back"),
        }
    }
}

/// One line of migration status.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MigrationStatusEntry {
    /// Migration name.
    pub name: String,
    /// Current state.
    pub state: MigrationState,
    /// When it was last applied.
    pub executed_at: Option<DateTime<Utc>>,
    /// When it was rolled back.
    pub rolled_back_at: Option<DateTime<Utc>>,
}

impl MigrationStatusEntry {
    fn from_record(record: MigrationRecord) -> Self {
        Self {
            state: if record.rolled_back {
                MigrationState::RolledBack
            } else {
                MigrationState::Executed
            },
            executed_at: Some(record.executed_at),
            rolled_back_at: record.rolled_back_at,
            name: record.name,
        }
    }

    fn pending(name: String) -> Self {
        Self {
            name,
            state: MigrationState::Pending,
            executed_at: None,
            rolled_back_at: None,
        }
    }
}

/// Result of a rollback of one migration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RollbackOutcome {
    /// Migration name.
    pub name: String,
    /// Whether a down script was run.
    pub down_script_run: bool,
}

/// Applies and reverts migration scripts against one connection.
pub struct Migrator<'c> {
    runner: MigrationRunner<'c>,
    ledger: Ledger<'c>,
    files: MigrationFiles,
    config: MigrationConfig,
}

impl<'c> Migrator<'c> {
    /// Create a migrator.
    pub fn new(conn: &'c dyn Connection, config: MigrationConfig) -> Self {
        Self {
            runner: MigrationRunner::new(conn),
            ledger: Ledger::with_table(conn, config.history_table.clone()),
            files: MigrationFiles::new(config.migrations_dir.clone()),
            config,
        }
    }

    /// The ledger.
    pub fn ledger(&self) -> &Ledger<'c> {
        &self.ledger
    }

    /// The migration files.
    pub fn files(&self) -> &MigrationFiles {
        &self.files
    }

    /// Write a generated migration under a fresh name.
    ///
    /// Returns `None` when the report holds no changes.
    pub fn write_migration(&self, report: &GenerationReport) -> Result<Option<String>, MigrationError> {
        if report.is_empty() {
            return Ok(None);
        }
        let name = Ledger::generate_name();
        if self.files.exists(&name) {
            return Err(MigrationError::MigrationExists(name));
        }
        let down = report.down_sql();
        self.files.write(&name, &report.up_sql(), Some(&down))?;
        Ok(Some(name))
    }

    /// Names of migrations with a script that are not currently applied.
    pub fn pending(&self) -> Result<Vec<String>, MigrationError> {
        let mut pending = Vec::new();
        for name in self.files.list()? {
            if !self.ledger.is_executed(&name)? {
                pending.push(name);
            }
        }
        Ok(pending)
    }

    /// Apply every pending migration in name order.
    ///
    /// Stops at the first failure; migrations applied before it stay
    /// applied. With `dry_run`, only reports what would run.
    pub fn migrate(&self, dry_run: bool) -> Result<Vec<String>, MigrationError> {
        let pending = self.pending()?;
        if dry_run {
            for name in &pending {
                tracing::info!(migration = %name, "would apply");
            }
            return Ok(pending);
        }

        let mut applied = Vec::with_capacity(pending.len());
        for name in pending {
            let script = self.files.load_up(&name)?;
            let statements = self.runner.run(&script, self.config.use_transaction)?;
            self.ledger.mark_executed(&name)?;
            tracing::info!(migration = %name, statements, "migration applied");
            applied.push(name);
        }
        Ok(applied)
    }

    /// Roll back the `steps` most recent migrations.
    ///
    /// A migration without a down script is only marked as rolled back.
    pub fn rollback(&self, steps: usize) -> Result<Vec<RollbackOutcome>, MigrationError> {
        let mut outcomes = Vec::new();
        for name in self.ledger.migrations_to_rollback(Some(steps))? {
            let down_script_run = match self.files.load_down(&name)? {
                Some(script) => {
                    self.runner.run(&script, self.config.use_transaction)?;
                    true
                }
                None => {
                    tracing::warn!(migration = %name, "no down script; recording rollback only");
                    false
                }
            };
            self.ledger.mark_rolled_back(&name)?;
            tracing::info!(migration = %name, "migration rolled back");
            outcomes.push(RollbackOutcome {
                name,
                down_script_run,
            });
        }
        Ok(outcomes)
    }

    /// Status of every known migration, from files and ledger, ordered by name.
    pub fn status(&self) -> Result<Vec<MigrationStatusEntry>, MigrationError> {
        let mut entries: BTreeMap<String, MigrationStatusEntry> = BTreeMap::new();
        for record in self.ledger.executed_migrations(true)? {
            entries.insert(record.name.clone(), MigrationStatusEntry::from_record(record));
        }
        for name in self.files.list()? {
            entries
                .entry(name.clone())
                .or_insert_with(|| MigrationStatusEntry::pending(name));
        }
        Ok(entries.into_values().collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::connection::SqliteConnection;
    use tempfile::TempDir;

    fn setup() -> (TempDir, SqliteConnection, MigrationConfig) {
        let tmp = TempDir::new().unwrap();
        let conn = SqliteConnection::open_in_memory().unwrap();
        let config = MigrationConfig::new().with_migrations_dir(tmp.path());
        (tmp, conn, config)
    }

    #[test]
    fn test_migrate_applies_in_order() {
        let (_tmp, conn, config) = setup();
        let migrator = Migrator::new(&conn, config);
        migrator
            .files()
            .write("Version2", "INSERT INTO t VALUES (2);", None)
            .unwrap();
        migrator
            .files()
            .write("Version1", "CREATE TABLE t (id INTEGER);", Some("DROP TABLE t;"))
            .unwrap();

        assert_eq!(migrator.migrate(true).unwrap(), vec!["Version1", "Version2"]);
        assert!(migrator.ledger().executed_migrations(false).unwrap().is_empty());

        assert_eq!(migrator.migrate(false).unwrap(), vec!["Version1", "Version2"]);
        assert!(migrator.migrate(false).unwrap().is_empty());
    }

    #[test]
    fn test_failed_migration_is_not_recorded() {
        let (_tmp, conn, config) = setup();
        let migrator = Migrator::new(&conn, config);
        migrator.files().write("Version1", "CREATE TABLE a (id INTEGER);", None).unwrap();
        migrator.files().write("Version2", "INSERT INTO missing VALUES (1);", None).unwrap();

        assert!(matches!(
            migrator.migrate(false),
            Err(MigrationError::Execution { .. })
        ));
        assert!(migrator.ledger().is_executed("Version1").unwrap());
        assert!(!migrator.ledger().is_executed("Version2").unwrap());
    }

    #[test]
    fn test_rollback_and_status() {
        let (_tmp, conn, config) = setup();
        let migrator = Migrator::new(&conn, config);
        migrator
            .files()
            .write("Version1", "CREATE TABLE a (id INTEGER);", Some("DROP TABLE a;"))
            .unwrap();
        migrator.files().write("Version2", "CREATE TABLE b (id INTEGER);", None).unwrap();
        migrator.migrate(false).unwrap();

        let outcomes = migrator.rollback(5).unwrap();
        let names: Vec<_> = outcomes.iter().map(|o| o.name.as_str()).collect();
        assert_eq!(names.len(), 2);
        assert!(outcomes.iter().any(|o| o.name == "Version1" && o.down_script_run));
        assert!(outcomes.iter().any(|o| o.name == "Version2" && !o.down_script_run));

        migrator.files().write("Version3", "SELECT 1;", None).unwrap();
        let status = migrator.status().unwrap();
        let states: Vec<_> = status.iter().map(|s| (s.name.as_str(), s.state)).collect();
        assert_eq!(
            states,
            vec![
                ("Version1", MigrationState::RolledBack),
                ("Version2", MigrationState::RolledBack),
                ("Version3", MigrationState::Pending),
            ]
        );
        assert!(status[0].rolled_back_at.is_some());
        assert!(status[2].executed_at.is_none());
    }

    #[test]
    fn test_write_migration_skips_empty_report() {
        let (_tmp, conn, config) = setup();
        let migrator = Migrator::new(&conn, config);
        assert_eq!(migrator.write_migration(&GenerationReport::default()).unwrap(), None);

        let report = GenerationReport {
            up: vec!["CREATE TABLE x (id INT)".into()],
            down: vec!["DROP TABLE IF EXISTS x".into()],
            warnings: Vec::new(),
        };
        let name = migrator.write_migration(&report).unwrap().unwrap();
        assert!(name.starts_with("Version"));
        assert_eq!(
            migrator.files().load_up(&name).unwrap(),
            "CREATE TABLE x (id INT);\n"
        );
        assert_eq!(migrator.status().unwrap()[0].state, MigrationState::Pending);
    }
}
