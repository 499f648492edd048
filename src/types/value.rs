//! SQL values

use crate::error::{Error, Result};
use crate::types::DataType;
use chrono::{NaiveDate, NaiveDateTime, NaiveTime};
use serde::{Deserialize, Serialize};
use std::fmt;

/// A row of values in a table.
pub type Row = Vec<Value>;

/// A runtime SQL value.
///
/// `Serial` carries values produced by SERIAL auto-increment columns. It
/// behaves exactly like `Integer` for comparison, hashing, grouping and
/// arithmetic; the distinct variant only records provenance so snapshots
/// round-trip every value shape.
#[derive(Clone, Serialize, Deserialize)]
pub enum Value {
    Null,
    Boolean(bool),
    Integer(i64),
    Float(f64),
    Str(String),
    Date(NaiveDate),
    Time(NaiveTime),
    Timestamp(NaiveDateTime),
    Serial(i64),
}

impl Value {
    /// Create an integer value.
    pub fn integer(i: i64) -> Self {
        Value::Integer(i)
    }

    /// Create a string value.
    pub fn string(s: impl Into<String>) -> Self {
        Value::Str(s.into())
    }

    /// Create a boolean value.
    pub fn boolean(b: bool) -> Self {
        Value::Boolean(b)
    }

    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }

    /// The integer payload, treating SERIAL values as integers.
    pub fn as_integer(&self) -> Option<i64> {
        match self {
            Value::Integer(i) | Value::Serial(i) => Some(*i),
            _ => None,
        }
    }

    /// Any numeric payload widened to f64.
    pub fn as_float(&self) -> Option<f64> {
        match self {
            Value::Integer(i) | Value::Serial(i) => Some(*i as f64),
            Value::Float(f) => Some(*f),
            _ => None,
        }
    }

    pub fn is_numeric(&self) -> bool {
        matches!(
            self,
            Value::Integer(_) | Value::Float(_) | Value::Serial(_)
        )
    }

    /// The data type of this value; NULL has none.
    pub fn data_type(&self) -> Option<DataType> {
        match self {
            Value::Null => None,
            Value::Boolean(_) => Some(DataType::Boolean),
            Value::Integer(_) => Some(DataType::Int),
            Value::Float(_) => Some(DataType::Float),
            Value::Str(_) => Some(DataType::Text),
            Value::Date(_) => Some(DataType::Date),
            Value::Time(_) => Some(DataType::Time),
            Value::Timestamp(_) => Some(DataType::Timestamp),
            Value::Serial(_) => Some(DataType::Serial),
        }
    }

    /// Check that this value may be stored in a column of the given type.
    /// NULL passes here; nullability is checked separately.
    pub fn check_type(&self, expected: &DataType) -> Result<()> {
        if self.is_null() {
            return Ok(());
        }
        let ok = match expected {
            DataType::Int | DataType::Serial => {
                matches!(self, Value::Integer(_) | Value::Serial(_))
            }
            DataType::Float => self.is_numeric(),
            DataType::Boolean => matches!(self, Value::Boolean(_)),
            DataType::Varchar(_) | DataType::Char(_) | DataType::Text => {
                matches!(self, Value::Str(_))
            }
            DataType::Date => matches!(self, Value::Date(_)),
            DataType::Time => matches!(self, Value::Time(_)),
            DataType::Timestamp => matches!(self, Value::Timestamp(_)),
        };
        if ok {
            Ok(())
        } else {
            Err(Error::TypeMismatch {
                expected: expected.to_string(),
                found: self
                    .data_type()
                    .map(|t| t.to_string())
                    .unwrap_or_else(|| "NULL".into()),
            })
        }
    }
}

/// Equality by value. NULL equals NULL here (row deduplication and grouping
/// need a total equivalence); SQL's three-valued `=` lives in the evaluator.
impl PartialEq for Value {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Value::Null, Value::Null) => true,
            (Value::Boolean(a), Value::Boolean(b)) => a == b,
            (Value::Integer(a) | Value::Serial(a), Value::Integer(b) | Value::Serial(b)) => a == b,
            (Value::Float(a), Value::Float(b)) => a.to_bits() == b.to_bits(),
            (Value::Str(a), Value::Str(b)) => a == b,
            (Value::Date(a), Value::Date(b)) => a == b,
            (Value::Time(a), Value::Time(b)) => a == b,
            (Value::Timestamp(a), Value::Timestamp(b)) => a == b,
            _ => false,
        }
    }
}

impl Eq for Value {}

impl std::hash::Hash for Value {
    fn hash<H: std::hash::Hasher>(&self, state: &mut H) {
        match self {
            Value::Null => 0u8.hash(state),
            Value::Boolean(b) => b.hash(state),
            // Integer and Serial must hash identically since they compare equal.
            Value::Integer(i) | Value::Serial(i) => i.hash(state),
            Value::Float(f) => f.to_bits().hash(state),
            Value::Str(s) => s.hash(state),
            Value::Date(d) => d.hash(state),
            Value::Time(t) => t.hash(state),
            Value::Timestamp(ts) => ts.hash(state),
        }
    }
}

impl Ord for Value {
    fn cmp(&self, other: &Self) -> std::cmp::Ordering {
        use std::cmp::Ordering;
        match (self, other) {
            (Value::Null, Value::Null) => Ordering::Equal,
            (Value::Null, _) => Ordering::Less,
            (_, Value::Null) => Ordering::Greater,
            (Value::Boolean(a), Value::Boolean(b)) => a.cmp(b),
            (Value::Integer(a) | Value::Serial(a), Value::Integer(b) | Value::Serial(b)) => {
                a.cmp(b)
            }
            (a, b) if a.is_numeric() && b.is_numeric() => {
                let (a, b) = (a.as_float().unwrap_or(0.0), b.as_float().unwrap_or(0.0));
                a.partial_cmp(&b).unwrap_or(Ordering::Equal)
            }
            (Value::Str(a), Value::Str(b)) => a.cmp(b),
            (Value::Date(a), Value::Date(b)) => a.cmp(b),
            (Value::Time(a), Value::Time(b)) => a.cmp(b),
            (Value::Timestamp(a), Value::Timestamp(b)) => a.cmp(b),
            // Different types get a stable but arbitrary order.
            _ => Ordering::Equal,
        }
    }
}

impl PartialOrd for Value {
    fn partial_cmp(&self, other: &Self) -> Option<std::cmp::Ordering> {
        Some(self.cmp(other))
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Null => write!(f, "NULL"),
            Value::Boolean(b) => write!(f, "{}", if *b { "TRUE" } else { "FALSE" }),
            Value::Integer(i) | Value::Serial(i) => write!(f, "{}", i),
            Value::Float(v) => write!(f, "{}", v),
            Value::Str(s) => write!(f, "'{}'", s.replace('\'', "''")),
            Value::Date(d) => write!(f, "{}", d),
            Value::Time(t) => write!(f, "{}", t),
            Value::Timestamp(ts) => write!(f, "{}", ts.format("%Y-%m-%d %H:%M:%S")),
        }
    }
}

impl fmt::Debug for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Null => write!(f, "Null"),
            Value::Boolean(b) => write!(f, "Boolean({})", b),
            Value::Integer(i) => write!(f, "Integer({})", i),
            Value::Float(v) => write!(f, "Float({})", v),
            Value::Str(s) => write!(f, "Str({})", s),
            Value::Date(d) => write!(f, "Date({})", d),
            Value::Time(t) => write!(f, "Time({})", t),
            Value::Timestamp(ts) => write!(f, "Timestamp({})", ts),
            Value::Serial(i) => write!(f, "Serial({})", i),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_serial_equals_integer() {
        assert_eq!(Value::Serial(7), Value::Integer(7));
        assert_ne!(Value::Serial(7), Value::Integer(8));

        use std::collections::HashSet;
        let mut set = HashSet::new();
        set.insert(Value::Serial(1));
        assert!(set.contains(&Value::Integer(1)));
    }

    #[test]
    fn test_null_equivalence_for_dedup() {
        assert_eq!(Value::Null, Value::Null);
        assert_ne!(Value::Null, Value::Integer(0));
    }

    #[test]
    fn test_check_type() {
        assert!(Value::Integer(1).check_type(&DataType::Int).is_ok());
        assert!(Value::Integer(1).check_type(&DataType::Float).is_ok());
        assert!(Value::Serial(1).check_type(&DataType::Int).is_ok());
        assert!(Value::Str("x".into()).check_type(&DataType::Int).is_err());
        assert!(Value::Null.check_type(&DataType::Int).is_ok());
    }
}
