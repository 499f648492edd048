//! REPLACE function - replaces all occurrences of a substring

use super::{check_arity, string_arg, Function, FunctionRegistry, FunctionSignature};
use crate::error::Result;
use crate::types::context::ExecutionContext;
use crate::types::Value;

pub struct ReplaceFunction;

impl Function for ReplaceFunction {
    fn signature(&self) -> &FunctionSignature {
        static SIGNATURE: FunctionSignature = FunctionSignature { name: "REPLACE" };
        &SIGNATURE
    }

    fn execute(&self, args: &[Value], _context: &ExecutionContext) -> Result<Value> {
        check_arity("REPLACE", args, 3)?;
        if args.iter().any(Value::is_null) {
            return Ok(Value::Null);
        }
        let s = string_arg("REPLACE", &args[0])?;
        let from = string_arg("REPLACE", &args[1])?;
        let to = string_arg("REPLACE", &args[2])?;
        if from.is_empty() {
            return Ok(Value::Str(s));
        }
        Ok(Value::Str(s.replace(&from, &to)))
    }
}

pub fn register(registry: &mut FunctionRegistry) {
    registry.register(Box::new(ReplaceFunction));
}
