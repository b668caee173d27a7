//! Relation definitions between entities.

use serde::{Deserialize, Serialize};

/// A relation declared on an entity field.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RelationDescriptor {
    /// Field name carrying the relation.
    pub field: String,
    /// Relation kind and its target.
    #[serde(flatten)]
    pub kind: RelationKind,
}

/// Kind of relation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum RelationKind {
    /// Foreign key held by this entity.
    ManyToOne {
        /// Identifier of the referenced entity.
        target_entity: String,
        /// Foreign key column on this entity's table.
        join_column: String,
    },
    /// Inverse side of a `ManyToOne` on the target.
    OneToMany {
        /// Identifier of the owning entity.
        target_entity: String,
        /// Field on the target holding the `ManyToOne`.
        mapped_by: String,
    },
    /// Relation through a join table.
    ManyToMany {
        /// Identifier of the related entity.
        target_entity: String,
        /// Explicit join table name.
        #[serde(default)]
        join_table: Option<String>,
    },
}

impl RelationDescriptor {
    /// Create a many-to-one relation.
    pub fn many_to_one(
        field: impl Into<String>,
        target_entity: impl Into<String>,
        join_column: impl Into<String>,
    ) -> Self {
        Self {
            field: field.into(),
            kind: RelationKind::ManyToOne {
                target_entity: target_entity.into(),
                join_column: join_column.into(),
            },
        }
    }

    /// Create a one-to-many relation.
    pub fn one_to_many(
        field: impl Into<String>,
        target_entity: impl Into<String>,
        mapped_by: impl Into<String>,
    ) -> Self {
        Self {
            field: field.into(),
            kind: RelationKind::OneToMany {
                target_entity: target_entity.into(),
                mapped_by: mapped_by.into(),
            },
        }
    }

    /// Create a many-to-many relation with a derived join table name.
    pub fn many_to_many(field: impl Into<String>, target_entity: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            kind: RelationKind::ManyToMany {
                target_entity: target_entity.into(),
                join_table: None,
            },
        }
    }

    /// Set an explicit join table (many-to-many only).
    pub fn with_join_table(mut self, table: impl Into<String>) -> Self {
        if let RelationKind::ManyToMany { join_table, .. } = &mut self.kind {
            *join_table = Some(table.into());
        }
        self
    }

    /// Identifier of the entity on the other side.
    pub fn target_entity(&self) -> &str {
        match &self.kind {
            RelationKind::ManyToOne { target_entity, .. }
            | RelationKind::OneToMany { target_entity, .. }
            | RelationKind::ManyToMany { target_entity, .. } => target_entity,
        }
    }

    /// Foreign key column if this is a many-to-one relation.
    pub fn join_column(&self) -> Option<&str> {
        match &self.kind {
            RelationKind::ManyToOne { join_column, .. } => Some(join_column),
            _ => None,
        }
    }

    /// Check if this is a many-to-many relation.
    pub fn is_many_to_many(&self) -> bool {
        matches!(self.kind, RelationKind::ManyToMany { .. })
    }
}
