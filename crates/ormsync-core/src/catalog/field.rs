//! Column definitions for entities.

use super::types::ColumnType;
use serde::{Deserialize, Serialize};

/// A declared column of an entity.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ColumnDescriptor {
    /// Field name on the entity.
    pub field: String,
    /// Declared column type.
    #[serde(rename = "type")]
    pub column_type: ColumnType,
    /// String length or decimal precision.
    #[serde(default)]
    pub length: Option<u32>,
    /// Decimal scale.
    #[serde(default)]
    pub scale: Option<u32>,
    /// Whether the column accepts NULL.
    #[serde(default)]
    pub nullable: bool,
    /// Default value, if any.
    #[serde(default)]
    pub default: Option<DefaultValue>,
    /// Column name in the database. Defaults to the field name.
    #[serde(default, rename = "column")]
    pub stored_name: Option<String>,
    /// Whether the column is auto-incremented by the database.
    #[serde(default)]
    pub auto_increment: bool,
}

/// Default value for a column.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum DefaultValue {
    /// Boolean value, stored as 1/0.
    Bool(bool),
    /// Integer value.
    Int(i64),
    /// Floating point value.
    Float(f64),
    /// String literal.
    String(String),
    /// Raw SQL expression such as `CURRENT_TIMESTAMP`.
    Expression {
        /// Expression text, rendered unquoted.
        expression: String,
    },
}

impl DefaultValue {
    /// Create an expression default.
    pub fn expression(expression: impl Into<String>) -> Self {
        DefaultValue::Expression {
            expression: expression.into(),
        }
    }

    /// Text used when comparing against an introspected default.
    pub fn comparable_text(&self) -> String {
        match self {
            DefaultValue::Bool(true) => "1".to_string(),
            DefaultValue::Bool(false) => "0".to_string(),
            DefaultValue::Int(v) => v.to_string(),
            DefaultValue::Float(v) => v.to_string(),
            DefaultValue::String(s) => s.clone(),
            DefaultValue::Expression { expression } => expression.clone(),
        }
    }
}

impl ColumnDescriptor {
    /// Create a new non-nullable column.
    pub fn new(field: impl Into<String>, column_type: ColumnType) -> Self {
        Self {
            field: field.into(),
            column_type,
            length: None,
            scale: None,
            nullable: false,
            default: None,
            stored_name: None,
            auto_increment: false,
        }
    }

    /// Create a nullable column.
    pub fn nullable(field: impl Into<String>, column_type: ColumnType) -> Self {
        Self {
            nullable: true,
            ..Self::new(field, column_type)
        }
    }

    /// Create an auto-increment integer identity column.
    pub fn identity(field: impl Into<String>) -> Self {
        Self {
            auto_increment: true,
            ..Self::new(field, ColumnType::Integer)
        }
    }

    /// Set the length (or decimal precision).
    pub fn with_length(mut self, length: u32) -> Self {
        self.length = Some(length);
        self
    }

    /// Set the decimal scale.
    pub fn with_scale(mut self, scale: u32) -> Self {
        self.scale = Some(scale);
        self
    }

    /// Set the default value.
    pub fn with_default(mut self, default: DefaultValue) -> Self {
        self.default = Some(default);
        self
    }

    /// Set the stored column name.
    pub fn with_stored_name(mut self, name: impl Into<String>) -> Self {
        self.stored_name = Some(name.into());
        self
    }

    /// Mark as auto-increment.
    pub fn with_auto_increment(mut self) -> Self {
        self.auto_increment = true;
        self
    }

    /// Column name in the database.
    pub fn stored_name(&self) -> &str {
        self.stored_name.as_deref().unwrap_or(&self.field)
    }

    /// Rendered SQL type.
    pub fn sql_type(&self) -> String {
        self.column_type.sql_type(self.length, self.scale)
    }
}
