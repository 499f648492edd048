//! LENGTH function - character count of a string

use super::{check_arity, string_arg, Function, FunctionRegistry, FunctionSignature};
use crate::error::Result;
use crate::types::context::ExecutionContext;
use crate::types::Value;

pub struct LengthFunction;

impl Function for LengthFunction {
    fn signature(&self) -> &FunctionSignature {
        static SIGNATURE: FunctionSignature = FunctionSignature { name: "LENGTH" };
        &SIGNATURE
    }

    fn execute(&self, args: &[Value], _context: &ExecutionContext) -> Result<Value> {
        check_arity("LENGTH", args, 1)?;
        if args[0].is_null() {
            return Ok(Value::Null);
        }
        let s = string_arg("LENGTH", &args[0])?;
        Ok(Value::Integer(s.chars().count() as i64))
    }
}

pub fn register(registry: &mut FunctionRegistry) {
    registry.register(Box::new(LengthFunction));
}
