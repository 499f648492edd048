//! TRIM function - strips leading and trailing whitespace

use super::{check_arity, string_arg, Function, FunctionRegistry, FunctionSignature};
use crate::error::Result;
use crate::types::context::ExecutionContext;
use crate::types::Value;

pub struct TrimFunction;

impl Function for TrimFunction {
    fn signature(&self) -> &FunctionSignature {
        static SIGNATURE: FunctionSignature = FunctionSignature { name: "TRIM" };
        &SIGNATURE
    }

    fn execute(&self, args: &[Value], _context: &ExecutionContext) -> Result<Value> {
        check_arity("TRIM", args, 1)?;
        if args[0].is_null() {
            return Ok(Value::Null);
        }
        Ok(Value::Str(string_arg("TRIM", &args[0])?.trim().to_string()))
    }
}

pub fn register(registry: &mut FunctionRegistry) {
    registry.register(Box::new(TrimFunction));
}
