//! DATEDIFF function - whole-day delta between two dates

use super::{check_arity, Function, FunctionRegistry, FunctionSignature};
use crate::error::{Error, Result};
use crate::types::context::ExecutionContext;
use crate::types::Value;
use chrono::NaiveDate;

pub struct DateDiffFunction;

fn date_arg(value: &Value) -> Result<NaiveDate> {
    match value {
        Value::Date(d) => Ok(*d),
        Value::Timestamp(ts) => Ok(ts.date()),
        other => Err(Error::TypeMismatch {
            expected: "date argument for DATEDIFF".into(),
            found: other.to_string(),
        }),
    }
}

impl Function for DateDiffFunction {
    fn signature(&self) -> &FunctionSignature {
        static SIGNATURE: FunctionSignature = FunctionSignature { name: "DATEDIFF" };
        &SIGNATURE
    }

    fn execute(&self, args: &[Value], _context: &ExecutionContext) -> Result<Value> {
        check_arity("DATEDIFF", args, 2)?;
        if args.iter().any(Value::is_null) {
            return Ok(Value::Null);
        }
        let a = date_arg(&args[0])?;
        let b = date_arg(&args[1])?;
        Ok(Value::Integer((a - b).num_days()))
    }
}

pub fn register(registry: &mut FunctionRegistry) {
    registry.register(Box::new(DateDiffFunction));
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDateTime;

    #[test]
    fn test_datediff_is_signed() {
        let f = DateDiffFunction;
        let ctx = ExecutionContext::new(NaiveDateTime::default());
        let a = Value::Date(NaiveDate::from_ymd_opt(2024, 3, 10).unwrap());
        let b = Value::Date(NaiveDate::from_ymd_opt(2024, 3, 1).unwrap());
        assert_eq!(
            f.execute(&[a.clone(), b.clone()], &ctx).unwrap(),
            Value::Integer(9)
        );
        assert_eq!(f.execute(&[b, a], &ctx).unwrap(), Value::Integer(-9));
    }
}
