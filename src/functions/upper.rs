//! UPPER function - uppercases a string

use super::{check_arity, string_arg, Function, FunctionRegistry, FunctionSignature};
use crate::error::Result;
use crate::types::context::ExecutionContext;
use crate::types::Value;

pub struct UpperFunction;

impl Function for UpperFunction {
    fn signature(&self) -> &FunctionSignature {
        static SIGNATURE: FunctionSignature = FunctionSignature { name: "UPPER" };
        &SIGNATURE
    }

    fn execute(&self, args: &[Value], _context: &ExecutionContext) -> Result<Value> {
        check_arity("UPPER", args, 1)?;
        if args[0].is_null() {
            return Ok(Value::Null);
        }
        Ok(Value::Str(string_arg("UPPER", &args[0])?.to_uppercase()))
    }
}

pub fn register(registry: &mut FunctionRegistry) {
    registry.register(Box::new(UpperFunction));
}
