//! ROUND function - rounds half away from zero

use super::{integer_arg, Function, FunctionRegistry, FunctionSignature};
use crate::error::{Error, Result};
use crate::types::coercion::round_half_away;
use crate::types::context::ExecutionContext;
use crate::types::Value;

pub struct RoundFunction;

impl Function for RoundFunction {
    fn signature(&self) -> &FunctionSignature {
        static SIGNATURE: FunctionSignature = FunctionSignature { name: "ROUND" };
        &SIGNATURE
    }

    fn execute(&self, args: &[Value], _context: &ExecutionContext) -> Result<Value> {
        if args.is_empty() || args.len() > 2 {
            return Err(Error::ExecutionError(format!(
                "ROUND takes 1 or 2 arguments, got {}",
                args.len()
            )));
        }
        if args.iter().any(Value::is_null) {
            return Ok(Value::Null);
        }
        let digits = match args.get(1) {
            Some(v) => integer_arg("ROUND", v)? as i32,
            None => 0,
        };
        match &args[0] {
            // Integers are already rounded.
            Value::Integer(i) | Value::Serial(i) => Ok(Value::Integer(*i)),
            Value::Float(f) => Ok(Value::Float(round_half_away(*f, digits))),
            other => Err(Error::TypeMismatch {
                expected: "numeric argument for ROUND".into(),
                found: other.to_string(),
            }),
        }
    }
}

pub fn register(registry: &mut FunctionRegistry) {
    registry.register(Box::new(RoundFunction));
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDateTime;

    #[test]
    fn test_round_half_away_from_zero() {
        let f = RoundFunction;
        let ctx = ExecutionContext::new(NaiveDateTime::default());
        assert_eq!(
            f.execute(&[Value::Float(2.5)], &ctx).unwrap(),
            Value::Float(3.0)
        );
        assert_eq!(
            f.execute(&[Value::Float(-2.5)], &ctx).unwrap(),
            Value::Float(-3.0)
        );
        assert_eq!(
            f.execute(&[Value::Float(42.453), Value::Integer(2)], &ctx)
                .unwrap(),
            Value::Float(42.45)
        );
        assert_eq!(
            f.execute(&[Value::Integer(7)], &ctx).unwrap(),
            Value::Integer(7)
        );
        assert_eq!(f.execute(&[Value::Null], &ctx).unwrap(), Value::Null);
    }
}
