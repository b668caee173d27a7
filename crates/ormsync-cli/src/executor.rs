//! Subcommand execution.

use crate::formatter::Formatter;
use crate::Command;
use ormsync_core::catalog::EntityCatalog;
use ormsync_core::connection::Connection;
use ormsync_core::migration::{MigrationError, Migrator, SchemaGenerator};
use ormsync_core::MigrationConfig;
use thiserror::Error;

/// Execution errors.
#[derive(Debug, Error)]
pub enum ExecuteError {
    /// Migration engine error.
    #[error(transparent)]
    Migration(#[from] MigrationError),

    /// Connection or descriptor error.
    #[error(transparent)]
    Core(#[from] ormsync_core::Error),

    /// No descriptor file was given to `generate`.
    #[error("no entity descriptors given (use --entities or ORMSYNC_ENTITIES)")]
    NoEntities,
}

/// Execute a subcommand and return formatted output.
pub fn execute(
    conn: &dyn Connection,
    config: MigrationConfig,
    command: &Command,
    formatter: &dyn Formatter,
) -> Result<String, ExecuteError> {
    let migrator = Migrator::new(conn, config);

    match command {
        Command::Generate {
            entities,
            entity,
            dry_run,
        } => {
            let path = entities.as_deref().ok_or(ExecuteError::NoEntities)?;
            let catalog = EntityCatalog::load(path)?;
            let batch = if entity.is_empty() {
                catalog.entities().to_vec()
            } else {
                catalog.select(entity)?
            };

            let report = SchemaGenerator::new(conn)
                .with_catalog(&catalog)
                .generate_report(&batch)?;
            let name = if *dry_run {
                None
            } else {
                migrator.write_migration(&report)?
            };
            Ok(formatter.format_generated(name.as_deref(), &report))
        }
        Command::Migrate { dry_run } => {
            let names = migrator.migrate(*dry_run)?;
            Ok(formatter.format_applied(&names, *dry_run))
        }
        Command::Rollback { steps } => {
            let outcomes = migrator.rollback(*steps)?;
            Ok(formatter.format_rolled_back(&outcomes))
        }
        Command::Status => {
            let entries = migrator.status()?;
            Ok(formatter.format_status(&entries))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::formatter::JsonFormatter;
    use ormsync_core::connection::SqliteConnection;
    use tempfile::TempDir;

    fn config(tmp: &TempDir) -> MigrationConfig {
        MigrationConfig::new().with_migrations_dir(tmp.path().join("migrations"))
    }

    #[test]
    fn test_generate_requires_entities() {
        let tmp = TempDir::new().unwrap();
        let conn = SqliteConnection::open_in_memory().unwrap();
        let command = Command::Generate {
            entities: None,
            entity: Vec::new(),
            dry_run: true,
        };
        let err = execute(&conn, config(&tmp), &command, &JsonFormatter).unwrap_err();
        assert!(matches!(err, ExecuteError::NoEntities));
    }

    #[test]
    fn test_generate_writes_migration() {
        let tmp = TempDir::new().unwrap();
        let descriptors = tmp.path().join("entities.json");
        std::fs::write(
            &descriptors,
            r#"{"entities": [{
                "name": "User",
                "table": "users",
                "id_field": "id",
                "columns": [{"field": "email", "type": "string", "length": 255}]
            }]}"#,
        )
        .unwrap();

        let conn = SqliteConnection::open_in_memory().unwrap();
        let command = Command::Generate {
            entities: Some(descriptors),
            entity: Vec::new(),
            dry_run: false,
        };
        let out = execute(&conn, config(&tmp), &command, &JsonFormatter).unwrap();
        let json: serde_json::Value = serde_json::from_str(&out).unwrap();
        let name = json["migration"].as_str().unwrap().to_string();
        assert!(name.starts_with("Version"));
        assert!(json["up"].as_str().unwrap().contains("`email` VARCHAR(255) NOT NULL"));

        let status = execute(&conn, config(&tmp), &Command::Status, &JsonFormatter).unwrap();
        let status: serde_json::Value = serde_json::from_str(&status).unwrap();
        assert_eq!(status[0]["name"], name.as_str());
        assert_eq!(status[0]["state"], "pending");

        let out = execute(&conn, config(&tmp), &Command::Migrate { dry_run: false }, &JsonFormatter)
            .unwrap();
        assert_eq!(out, format!(r#"{{"applied":["{}"]}}"#, name));
    }

    #[test]
    fn test_unknown_entity_selection() {
        let tmp = TempDir::new().unwrap();
        let descriptors = tmp.path().join("entities.json");
        std::fs::write(&descriptors, r#"{"entities": []}"#).unwrap();

        let conn = SqliteConnection::open_in_memory().unwrap();
        let command = Command::Generate {
            entities: Some(descriptors),
            entity: vec!["Ghost".into()],
            dry_run: true,
        };
        let err = execute(&conn, config(&tmp), &command, &JsonFormatter).unwrap_err();
        assert_eq!(err.to_string(), "unknown entity: Ghost");
    }

    #[test]
    fn test_migrate_and_rollback() {
        let tmp = TempDir::new().unwrap();
        let conn = SqliteConnection::open_in_memory().unwrap();
        let migrator = Migrator::new(&conn, config(&tmp));
        migrator
            .files()
            .write("V1", "CREATE TABLE t (id INTEGER);", Some("DROP TABLE t;"))
            .unwrap();

        let out = execute(&conn, config(&tmp), &Command::Migrate { dry_run: false }, &JsonFormatter)
            .unwrap();
        assert_eq!(out, r#"{"applied":["V1"]}"#);

        let out = execute(&conn, config(&tmp), &Command::Rollback { steps: 1 }, &JsonFormatter)
            .unwrap();
        let json: serde_json::Value = serde_json::from_str(&out).unwrap();
        assert_eq!(json[0]["name"], "V1");
        assert_eq!(json[0]["down_script_run"], true);
    }
}
