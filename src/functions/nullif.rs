//! NULLIF function - NULL if the arguments are equal, else the first

use super::{check_arity, Function, FunctionRegistry, FunctionSignature};
use crate::error::Result;
use crate::types::context::ExecutionContext;
use crate::types::{evaluator, Value};

pub struct NullIfFunction;

impl Function for NullIfFunction {
    fn signature(&self) -> &FunctionSignature {
        static SIGNATURE: FunctionSignature = FunctionSignature { name: "NULLIF" };
        &SIGNATURE
    }

    fn execute(&self, args: &[Value], _context: &ExecutionContext) -> Result<Value> {
        check_arity("NULLIF", args, 2)?;
        if evaluator::equal(&args[0], &args[1])? == Value::Boolean(true) {
            return Ok(Value::Null);
        }
        Ok(args[0].clone())
    }
}

pub fn register(registry: &mut FunctionRegistry) {
    registry.register(Box::new(NullIfFunction));
}
