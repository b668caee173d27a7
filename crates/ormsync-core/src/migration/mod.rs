//! Migration engine for ORMSYNC.
//!
//! This module turns entity descriptors into DDL and applies it:
//! - Dependency ordering of entities (Kahn's algorithm)
//! - Schema diffing against the live database (create vs. alter)
//! - A history table recording applied and rolled-back migrations
//! - Transactional execution of migration scripts
//!
//! # Example
//!
//! ```ignore
//! use ormsync_core::migration::{Migrator, SchemaGenerator};
//!
//! let report = SchemaGenerator::new(&conn)
//!     .with_catalog(&catalog)
//!     .generate_report(catalog.entities())?;
//!
//! let migrator = Migrator::new(&conn, MigrationConfig::default());
//! if let Some(name) = migrator.write_migration(&report)? {
//!     println!("created {}", name);
//! }
//! migrator.migrate(false)?;
//! ```

pub mod ddl;
pub mod error;
pub mod files;
pub mod generator;
pub mod ledger;
pub mod migrator;
pub mod normalize;
pub mod resolver;
pub mod runner;

// Error types
pub use error::MigrationError;

// Generation
pub use ddl::{DdlRenderer, ForeignKey};
pub use generator::{
    column_needs_update, join_table_name, GenerationReport, GenerationWarning, SchemaGenerator,
};
pub use resolver::{DependencyResolver, ResolvedOrder};

// Execution
pub use files::MigrationFiles;
pub use ledger::{Ledger, MigrationRecord};
pub use migrator::{MigrationState, MigrationStatusEntry, Migrator, RollbackOutcome};
pub use runner::{split_statements, MigrationRunner};
