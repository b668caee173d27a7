//! Declared column types and their SQL rendering.

use serde::{Deserialize, Serialize};

/// Default length for `string` columns without an explicit length.
pub const DEFAULT_STRING_LENGTH: u32 = 255;

/// Default precision for `decimal` columns without an explicit length.
pub const DEFAULT_DECIMAL_PRECISION: u32 = 10;

/// Column types a descriptor may declare.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ColumnType {
    /// Variable-length string (`VARCHAR`).
    String,
    /// Unbounded text.
    Text,
    /// Canonical 32-bit integer (`INT`).
    Integer,
    /// 16-bit integer.
    SmallInteger,
    /// 64-bit integer.
    BigInteger,
    /// Boolean, stored as `TINYINT(1)`.
    Boolean,
    /// Single precision float.
    Float,
    /// Double precision float.
    Double,
    /// Fixed-precision decimal; `length` is the precision.
    Decimal,
    /// Calendar date.
    Date,
    /// Date and time without zone.
    Datetime,
    /// Timestamp.
    Timestamp,
    /// Time of day.
    Time,
    /// JSON document.
    Json,
    /// Binary large object.
    Blob,
    /// A raw SQL type rendered verbatim.
    Custom(String),
}

impl ColumnType {
    /// Render the SQL type for this column type.
    ///
    /// `length` is the string length or decimal precision, `scale` the decimal scale.
    pub fn sql_type(&self, length: Option<u32>, scale: Option<u32>) -> String {
        match self {
            ColumnType::String => {
                format!("VARCHAR({})", length.unwrap_or(DEFAULT_STRING_LENGTH))
            }
            ColumnType::Text => "TEXT".to_string(),
            ColumnType::Integer => "INT".to_string(),
            ColumnType::SmallInteger => "SMALLINT".to_string(),
            ColumnType::BigInteger => "BIGINT".to_string(),
            ColumnType::Boolean => "TINYINT(1)".to_string(),
            ColumnType::Float => "FLOAT".to_string(),
            ColumnType::Double => "DOUBLE".to_string(),
            ColumnType::Decimal => format!(
                "DECIMAL({},{})",
                length.unwrap_or(DEFAULT_DECIMAL_PRECISION),
                scale.unwrap_or(0)
            ),
            ColumnType::Date => "DATE".to_string(),
            ColumnType::Datetime => "DATETIME".to_string(),
            ColumnType::Timestamp => "TIMESTAMP".to_string(),
            ColumnType::Time => "TIME".to_string(),
            ColumnType::Json => "JSON".to_string(),
            ColumnType::Blob => "BLOB".to_string(),
            ColumnType::Custom(raw) => match length {
                Some(len) if !raw.contains('(') => format!("{}({})", raw, len),
                _ => raw.clone(),
            },
        }
    }
}
