//! ABS function - absolute value, same-type result

use super::{check_arity, Function, FunctionRegistry, FunctionSignature};
use crate::error::{Error, Result};
use crate::types::context::ExecutionContext;
use crate::types::Value;

pub struct AbsFunction;

impl Function for AbsFunction {
    fn signature(&self) -> &FunctionSignature {
        static SIGNATURE: FunctionSignature = FunctionSignature { name: "ABS" };
        &SIGNATURE
    }

    fn execute(&self, args: &[Value], _context: &ExecutionContext) -> Result<Value> {
        check_arity("ABS", args, 1)?;
        match &args[0] {
            Value::Null => Ok(Value::Null),
            Value::Integer(i) | Value::Serial(i) => i
                .checked_abs()
                .map(Value::Integer)
                .ok_or_else(|| Error::ArithmeticOverflow(format!("ABS({})", i))),
            Value::Float(f) => Ok(Value::Float(f.abs())),
            other => Err(Error::TypeMismatch {
                expected: "numeric argument for ABS".into(),
                found: other.to_string(),
            }),
        }
    }
}

pub fn register(registry: &mut FunctionRegistry) {
    registry.register(Box::new(AbsFunction));
}
