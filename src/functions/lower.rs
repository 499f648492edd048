//! LOWER function - lowercases a string

use super::{check_arity, string_arg, Function, FunctionRegistry, FunctionSignature};
use crate::error::Result;
use crate::types::context::ExecutionContext;
use crate::types::Value;

pub struct LowerFunction;

impl Function for LowerFunction {
    fn signature(&self) -> &FunctionSignature {
        static SIGNATURE: FunctionSignature = FunctionSignature { name: "LOWER" };
        &SIGNATURE
    }

    fn execute(&self, args: &[Value], _context: &ExecutionContext) -> Result<Value> {
        check_arity("LOWER", args, 1)?;
        if args[0].is_null() {
            return Ok(Value::Null);
        }
        Ok(Value::Str(string_arg("LOWER", &args[0])?.to_lowercase()))
    }
}

pub fn register(registry: &mut FunctionRegistry) {
    registry.register(Box::new(LowerFunction));
}
