//! SQL data types

use serde::{Deserialize, Serialize};
use std::fmt;

/// SQL column data types.
///
/// VARCHAR and CHAR carry an optional declared length; the length is
/// enforced when a value is coerced into a column of that type.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum DataType {
    Int,
    Float,
    Boolean,
    Varchar(Option<usize>),
    Char(Option<usize>),
    Text,
    Date,
    Time,
    Timestamp,
    /// Auto-incrementing integer. Implies NOT NULL.
    Serial,
}

impl DataType {
    /// Check if this type is numeric (integer or float).
    pub fn is_numeric(&self) -> bool {
        matches!(self, DataType::Int | DataType::Float | DataType::Serial)
    }

    /// Check if this type holds character data.
    pub fn is_string(&self) -> bool {
        matches!(
            self,
            DataType::Varchar(_) | DataType::Char(_) | DataType::Text
        )
    }

    /// Whether two column types are compatible for set operations and
    /// comparisons: identical base types, or both numeric.
    pub fn is_compatible_with(&self, other: &DataType) -> bool {
        if self.is_numeric() && other.is_numeric() {
            return true;
        }
        if self.is_string() && other.is_string() {
            return true;
        }
        self == other
    }
}

impl fmt::Display for DataType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DataType::Int => write!(f, "INT"),
            DataType::Float => write!(f, "FLOAT"),
            DataType::Boolean => write!(f, "BOOLEAN"),
            DataType::Varchar(Some(len)) => write!(f, "VARCHAR({})", len),
            DataType::Varchar(None) => write!(f, "VARCHAR"),
            DataType::Char(Some(len)) => write!(f, "CHAR({})", len),
            DataType::Char(None) => write!(f, "CHAR"),
            DataType::Text => write!(f, "TEXT"),
            DataType::Date => write!(f, "DATE"),
            DataType::Time => write!(f, "TIME"),
            DataType::Timestamp => write!(f, "TIMESTAMP"),
            DataType::Serial => write!(f, "SERIAL"),
        }
    }
}
