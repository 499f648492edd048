//! FLOOR function - rounds down, same-type result

use super::{check_arity, Function, FunctionRegistry, FunctionSignature};
use crate::error::{Error, Result};
use crate::types::context::ExecutionContext;
use crate::types::Value;

pub struct FloorFunction;

impl Function for FloorFunction {
    fn signature(&self) -> &FunctionSignature {
        static SIGNATURE: FunctionSignature = FunctionSignature { name: "FLOOR" };
        &SIGNATURE
    }

    fn execute(&self, args: &[Value], _context: &ExecutionContext) -> Result<Value> {
        check_arity("FLOOR", args, 1)?;
        match &args[0] {
            Value::Null => Ok(Value::Null),
            Value::Integer(i) | Value::Serial(i) => Ok(Value::Integer(*i)),
            Value::Float(f) => Ok(Value::Float(f.floor())),
            other => Err(Error::TypeMismatch {
                expected: "numeric argument for FLOOR".into(),
                found: other.to_string(),
            }),
        }
    }
}

pub fn register(registry: &mut FunctionRegistry) {
    registry.register(Box::new(FloorFunction));
}
