//! Entity descriptors (table mappings).

use super::field::ColumnDescriptor;
use super::relation::{RelationDescriptor, RelationKind};
use serde::{Deserialize, Serialize};

/// Column name used for references when an entity declares no identity field.
pub const DEFAULT_IDENTITY_COLUMN: &str = "id";

/// The declared mapping of an entity onto a table.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EntityDescriptor {
    /// Entity identifier (referenced by relations).
    pub name: String,
    /// Target table name.
    pub table: String,
    /// Name of the identifying field.
    #[serde(default)]
    pub id_field: Option<String>,
    /// Declared columns in declaration order.
    #[serde(default)]
    pub columns: Vec<ColumnDescriptor>,
    /// Relations keyed by field.
    #[serde(default)]
    pub relations: Vec<RelationDescriptor>,
    /// Declared indexes.
    #[serde(default)]
    pub indexes: Vec<IndexDescriptor>,
}

/// A declared index on a single column.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IndexDescriptor {
    /// Indexed column (stored name).
    pub column: String,
    /// Index name.
    pub name: String,
    /// Whether the index is unique.
    #[serde(default)]
    pub unique: bool,
}

impl EntityDescriptor {
    /// Create a new entity descriptor without an identity field.
    pub fn new(name: impl Into<String>, table: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            table: table.into(),
            id_field: None,
            columns: Vec::new(),
            relations: Vec::new(),
            indexes: Vec::new(),
        }
    }

    /// Set the identity field.
    pub fn with_id(mut self, field: impl Into<String>) -> Self {
        self.id_field = Some(field.into());
        self
    }

    /// Add a column.
    pub fn with_column(mut self, column: ColumnDescriptor) -> Self {
        self.columns.push(column);
        self
    }

    /// Add a relation.
    pub fn with_relation(mut self, relation: RelationDescriptor) -> Self {
        self.relations.push(relation);
        self
    }

    /// Add an index.
    pub fn with_index(mut self, index: IndexDescriptor) -> Self {
        self.indexes.push(index);
        self
    }

    /// Get a column by field name.
    pub fn column(&self, field: &str) -> Option<&ColumnDescriptor> {
        self.columns.iter().find(|c| c.field == field)
    }

    /// Get a column by stored name.
    pub fn column_by_stored_name(&self, stored: &str) -> Option<&ColumnDescriptor> {
        self.columns.iter().find(|c| c.stored_name() == stored)
    }

    /// The identity column, synthesized as an auto-increment integer
    /// when the identity field is not among the declared columns.
    pub fn identity_column(&self) -> Option<ColumnDescriptor> {
        let id = self.id_field.as_deref()?;
        Some(
            self.column(id)
                .cloned()
                .unwrap_or_else(|| ColumnDescriptor::identity(id)),
        )
    }

    /// Stored name of the identity column, or `id` when none is declared.
    pub fn identity_column_name(&self) -> String {
        self.identity_column()
            .map(|c| c.stored_name().to_string())
            .unwrap_or_else(|| DEFAULT_IDENTITY_COLUMN.to_string())
    }

    /// Check if a stored column name is the identity column.
    pub fn is_identity(&self, stored: &str) -> bool {
        self.identity_column()
            .is_some_and(|c| c.stored_name() == stored)
    }

    /// Columns in table order: identity first, then the rest in declaration order.
    pub fn ordered_columns(&self) -> Vec<ColumnDescriptor> {
        let identity = self.identity_column();
        let mut ordered = Vec::with_capacity(self.columns.len() + 1);
        if let Some(id) = &identity {
            ordered.push(id.clone());
        }
        ordered.extend(
            self.columns
                .iter()
                .filter(|c| identity.as_ref().map_or(true, |id| id.field != c.field))
                .cloned(),
        );
        ordered
    }

    /// All many-to-one relations.
    pub fn many_to_one(&self) -> impl Iterator<Item = (&RelationDescriptor, &str, &str)> {
        self.relations.iter().filter_map(|r| match &r.kind {
            RelationKind::ManyToOne {
                target_entity,
                join_column,
            } => Some((r, target_entity.as_str(), join_column.as_str())),
            _ => None,
        })
    }

    /// Check if a stored column already carries an index.
    pub fn has_index_on(&self, stored: &str) -> bool {
        self.indexes.iter().any(|i| i.column == stored)
    }
}

impl IndexDescriptor {
    /// Create a non-unique index.
    pub fn new(column: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            column: column.into(),
            name: name.into(),
            unique: false,
        }
    }

    /// Create a unique index.
    pub fn unique(column: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            unique: true,
            ..Self::new(column, name)
        }
    }
}
