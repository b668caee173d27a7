//! Entity metadata consumed by the migration engine.
//!
//! Descriptors are plain data: the engine never inspects application types,
//! only the table, column, relation and index declarations held here.

mod catalog;
mod entity;
mod field;
mod relation;
mod types;

pub use catalog::EntityCatalog;
pub use entity::{EntityDescriptor, IndexDescriptor, DEFAULT_IDENTITY_COLUMN};
pub use field::{ColumnDescriptor, DefaultValue};
pub use relation::{RelationDescriptor, RelationKind};
pub use types::{ColumnType, DEFAULT_DECIMAL_PRECISION, DEFAULT_STRING_LENGTH};
