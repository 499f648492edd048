//! Value coercion: explicit CAST conversions and insert-time adaptation of
//! values to column types.

use super::data_type::DataType;
use super::schema::Table;
use super::value::{Row, Value};
use crate::error::{Error, Result};
use chrono::{NaiveDate, NaiveDateTime, NaiveTime};

/// Explicit CAST. Canonical conversions only: INT↔FLOAT (rounding),
/// numeric↔STRING (decimal text), STRING↔DATE/TIME/TIMESTAMP (ISO 8601).
/// NULL casts to NULL of any type.
pub fn cast_value(value: &Value, to: &DataType) -> Result<Value> {
    if value.is_null() {
        return Ok(Value::Null);
    }
    let fail = || Error::InvalidCast {
        value: value.to_string(),
        to: to.to_string(),
    };
    match to {
        DataType::Int | DataType::Serial => match value {
            Value::Integer(_) | Value::Serial(_) => Ok(value.clone()),
            Value::Float(f) => {
                let rounded = round_half_away(*f, 0);
                if rounded < i64::MIN as f64 || rounded > i64::MAX as f64 {
                    return Err(Error::ArithmeticOverflow(format!("CAST({} AS INT)", f)));
                }
                Ok(Value::Integer(rounded as i64))
            }
            Value::Str(s) => s.trim().parse::<i64>().map(Value::Integer).map_err(|_| fail()),
            _ => Err(fail()),
        },
        DataType::Float => match value {
            Value::Float(_) => Ok(value.clone()),
            Value::Integer(i) | Value::Serial(i) => Ok(Value::Float(*i as f64)),
            Value::Str(s) => s.trim().parse::<f64>().map(Value::Float).map_err(|_| fail()),
            _ => Err(fail()),
        },
        DataType::Boolean => match value {
            Value::Boolean(_) => Ok(value.clone()),
            _ => Err(fail()),
        },
        DataType::Text => match value {
            Value::Str(_) => Ok(value.clone()),
            Value::Integer(i) | Value::Serial(i) => Ok(Value::Str(i.to_string())),
            Value::Float(f) => Ok(Value::Str(f.to_string())),
            Value::Date(d) => Ok(Value::Str(d.format("%Y-%m-%d").to_string())),
            Value::Time(t) => Ok(Value::Str(t.format("%H:%M:%S").to_string())),
            Value::Timestamp(ts) => Ok(Value::Str(ts.format("%Y-%m-%d %H:%M:%S").to_string())),
            _ => Err(fail()),
        },
        DataType::Varchar(limit) | DataType::Char(limit) => {
            let text = cast_value(value, &DataType::Text)?;
            if let (Value::Str(s), Some(limit)) = (&text, limit) {
                if s.chars().count() > *limit {
                    return Err(Error::ValueTooLong {
                        type_name: to.to_string(),
                        length: s.chars().count(),
                    });
                }
            }
            Ok(text)
        }
        DataType::Date => match value {
            Value::Date(_) => Ok(value.clone()),
            Value::Str(s) => parse_date(s).map(Value::Date).ok_or_else(fail),
            _ => Err(fail()),
        },
        DataType::Time => match value {
            Value::Time(_) => Ok(value.clone()),
            Value::Str(s) => parse_time(s).map(Value::Time).ok_or_else(fail),
            _ => Err(fail()),
        },
        DataType::Timestamp => match value {
            Value::Timestamp(_) => Ok(value.clone()),
            Value::Str(s) => parse_timestamp(s).map(Value::Timestamp).ok_or_else(fail),
            _ => Err(fail()),
        },
    }
}

/// Adapts a value for storage in a column of the given type. Unlike CAST
/// this never converts between value families: it widens integers into
/// FLOAT columns, tags integers stored in SERIAL columns, enforces
/// VARCHAR/CHAR lengths, and otherwise just type-checks.
pub fn coerce_value(value: Value, data_type: &DataType) -> Result<Value> {
    if value.is_null() {
        return Ok(Value::Null);
    }
    match (data_type, &value) {
        (DataType::Float, Value::Integer(i) | Value::Serial(i)) => Ok(Value::Float(*i as f64)),
        (DataType::Serial, Value::Integer(i)) => Ok(Value::Serial(*i)),
        (DataType::Int, Value::Serial(i)) => Ok(Value::Integer(*i)),
        (DataType::Varchar(Some(limit)) | DataType::Char(Some(limit)), Value::Str(s)) => {
            if s.chars().count() > *limit {
                return Err(Error::ValueTooLong {
                    type_name: data_type.to_string(),
                    length: s.chars().count(),
                });
            }
            Ok(value)
        }
        _ => {
            value.check_type(data_type)?;
            Ok(value)
        }
    }
}

/// Coerces a full row against a table schema, positionally.
pub fn coerce_row(row: Row, table: &Table) -> Result<Row> {
    if row.len() != table.columns.len() {
        return Err(Error::InvalidValue(format!(
            "row has {} values, table {} has {} columns",
            row.len(),
            table.name,
            table.columns.len()
        )));
    }
    row.into_iter()
        .zip(table.columns.iter())
        .map(|(value, column)| coerce_value(value, &column.data_type))
        .collect()
}

/// Rounds half away from zero to the given number of decimal digits.
pub fn round_half_away(value: f64, digits: i32) -> f64 {
    let factor = 10f64.powi(digits);
    let scaled = value * factor;
    let rounded = if scaled < 0.0 {
        -(-scaled + 0.5).floor()
    } else {
        (scaled + 0.5).floor()
    };
    rounded / factor
}

pub fn parse_date(s: &str) -> Option<NaiveDate> {
    NaiveDate::parse_from_str(s.trim(), "%Y-%m-%d").ok()
}

pub fn parse_time(s: &str) -> Option<NaiveTime> {
    let s = s.trim();
    NaiveTime::parse_from_str(s, "%H:%M:%S")
        .or_else(|_| NaiveTime::parse_from_str(s, "%H:%M:%S%.f"))
        .ok()
}

pub fn parse_timestamp(s: &str) -> Option<NaiveDateTime> {
    let s = s.trim();
    NaiveDateTime::parse_from_str(s, "%Y-%m-%d %H:%M:%S")
        .or_else(|_| NaiveDateTime::parse_from_str(s, "%Y-%m-%dT%H:%M:%S"))
        .or_else(|_| NaiveDateTime::parse_from_str(s, "%Y-%m-%d %H:%M:%S%.f"))
        .ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cast_int_float() {
        assert_eq!(
            cast_value(&Value::Integer(3), &DataType::Float).unwrap(),
            Value::Float(3.0)
        );
        assert_eq!(
            cast_value(&Value::Float(2.5), &DataType::Int).unwrap(),
            Value::Integer(3)
        );
        assert_eq!(
            cast_value(&Value::Float(-2.5), &DataType::Int).unwrap(),
            Value::Integer(-3)
        );
    }

    #[test]
    fn test_cast_string_numeric() {
        assert_eq!(
            cast_value(&Value::string("42"), &DataType::Int).unwrap(),
            Value::Integer(42)
        );
        assert_eq!(
            cast_value(&Value::Integer(42), &DataType::Text).unwrap(),
            Value::string("42")
        );
        assert!(cast_value(&Value::string("nope"), &DataType::Int).is_err());
    }

    #[test]
    fn test_cast_string_temporal_iso_only() {
        assert_eq!(
            cast_value(&Value::string("2024-02-29"), &DataType::Date).unwrap(),
            Value::Date(NaiveDate::from_ymd_opt(2024, 2, 29).unwrap())
        );
        assert!(cast_value(&Value::string("02/29/2024"), &DataType::Date).is_err());
        assert!(cast_value(&Value::string("2023-02-29"), &DataType::Date).is_err());
    }

    #[test]
    fn test_cast_null_is_null() {
        assert_eq!(cast_value(&Value::Null, &DataType::Int).unwrap(), Value::Null);
    }

    #[test]
    fn test_varchar_overrun_rejected() {
        assert!(matches!(
            coerce_value(Value::string("toolong"), &DataType::Varchar(Some(3))),
            Err(Error::ValueTooLong { .. })
        ));
        assert!(coerce_value(Value::string("ok"), &DataType::Varchar(Some(3))).is_ok());
    }

    #[test]
    fn test_serial_tagging() {
        assert_eq!(
            coerce_value(Value::Integer(5), &DataType::Serial).unwrap(),
            Value::Serial(5)
        );
    }

    #[test]
    fn test_round_half_away() {
        assert_eq!(round_half_away(2.5, 0), 3.0);
        assert_eq!(round_half_away(-2.5, 0), -3.0);
        assert_eq!(round_half_away(2.4, 0), 2.0);
        assert_eq!(round_half_away(0.125, 2), 0.13);
    }
}
