//! ORMSYNC Core - Schema diffing and migrations for entity-mapped databases.
//!
//! This crate compares declared entity descriptors against a live database
//! and produces, records and applies the DDL that reconciles them.

pub mod catalog;
pub mod config;
pub mod connection;
pub mod error;
pub mod introspect;
pub mod migration;

pub use catalog::{
    ColumnDescriptor, ColumnType, DefaultValue, EntityCatalog, EntityDescriptor, IndexDescriptor,
    RelationDescriptor, RelationKind,
};
pub use config::MigrationConfig;
pub use connection::{Connection, Driver, Row, SqliteConnection, Value};
pub use error::Error;
pub use introspect::{DialectIntrospector, LiveColumn, LiveForeignKey, SchemaIntrospector};
pub use migration::{
    GenerationReport, GenerationWarning, Ledger, MigrationError, MigrationFiles, MigrationRunner,
    MigrationState, MigrationStatusEntry, Migrator, SchemaGenerator,
};

#[cfg(feature = "mysql")]
pub use connection::MySqlConnection;
