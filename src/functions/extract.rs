//! EXTRACT function - pulls a datetime field out of a date/time value
//!
//! The parser lowers `EXTRACT(field FROM source)` into a call with the
//! field name as a leading string argument.

use super::{check_arity, Function, FunctionRegistry, FunctionSignature};
use crate::error::{Error, Result};
use crate::types::context::ExecutionContext;
use crate::types::Value;
use chrono::{Datelike, Timelike};

pub struct ExtractFunction;

impl Function for ExtractFunction {
    fn signature(&self) -> &FunctionSignature {
        static SIGNATURE: FunctionSignature = FunctionSignature { name: "EXTRACT" };
        &SIGNATURE
    }

    fn execute(&self, args: &[Value], _context: &ExecutionContext) -> Result<Value> {
        check_arity("EXTRACT", args, 2)?;
        let field = match &args[0] {
            Value::Str(s) => s.to_uppercase(),
            other => {
                return Err(Error::TypeMismatch {
                    expected: "datetime field name".into(),
                    found: other.to_string(),
                });
            }
        };
        let source = &args[1];
        if source.is_null() {
            return Ok(Value::Null);
        }

        let result = match (field.as_str(), source) {
            ("YEAR", Value::Date(d)) => d.year() as i64,
            ("MONTH", Value::Date(d)) => d.month() as i64,
            ("DAY", Value::Date(d)) => d.day() as i64,
            ("HOUR", Value::Time(t)) => t.hour() as i64,
            ("MINUTE", Value::Time(t)) => t.minute() as i64,
            ("SECOND", Value::Time(t)) => t.second() as i64,
            ("YEAR", Value::Timestamp(ts)) => ts.year() as i64,
            ("MONTH", Value::Timestamp(ts)) => ts.month() as i64,
            ("DAY", Value::Timestamp(ts)) => ts.day() as i64,
            ("HOUR", Value::Timestamp(ts)) => ts.hour() as i64,
            ("MINUTE", Value::Timestamp(ts)) => ts.minute() as i64,
            ("SECOND", Value::Timestamp(ts)) => ts.second() as i64,
            (field, source) => {
                return Err(Error::TypeMismatch {
                    expected: format!("a value with a {} field", field),
                    found: source.to_string(),
                });
            }
        };
        Ok(Value::Integer(result))
    }
}

pub fn register(registry: &mut FunctionRegistry) {
    registry.register(Box::new(ExtractFunction));
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{NaiveDate, NaiveDateTime};

    #[test]
    fn test_extract_fields() {
        let f = ExtractFunction;
        let ctx = ExecutionContext::new(NaiveDateTime::default());
        let date = Value::Date(NaiveDate::from_ymd_opt(2024, 3, 9).unwrap());
        assert_eq!(
            f.execute(&[Value::string("YEAR"), date.clone()], &ctx).unwrap(),
            Value::Integer(2024)
        );
        assert_eq!(
            f.execute(&[Value::string("MONTH"), date.clone()], &ctx).unwrap(),
            Value::Integer(3)
        );
        // HOUR of a plain date is a type error.
        assert!(f.execute(&[Value::string("HOUR"), date], &ctx).is_err());
        assert_eq!(
            f.execute(&[Value::string("DAY"), Value::Null], &ctx).unwrap(),
            Value::Null
        );
    }
}
