//! CONCAT function - concatenates its arguments as text

use super::{Function, FunctionRegistry, FunctionSignature};
use crate::error::{Error, Result};
use crate::types::coercion::cast_value;
use crate::types::context::ExecutionContext;
use crate::types::{DataType, Value};

pub struct ConcatFunction;

impl Function for ConcatFunction {
    fn signature(&self) -> &FunctionSignature {
        static SIGNATURE: FunctionSignature = FunctionSignature { name: "CONCAT" };
        &SIGNATURE
    }

    fn execute(&self, args: &[Value], _context: &ExecutionContext) -> Result<Value> {
        if args.is_empty() {
            return Err(Error::ExecutionError(
                "CONCAT takes at least 1 argument".into(),
            ));
        }
        if args.iter().any(Value::is_null) {
            return Ok(Value::Null);
        }
        let mut out = String::new();
        for arg in args {
            if let Value::Str(s) = cast_value(arg, &DataType::Text)? {
                out.push_str(&s);
            }
        }
        Ok(Value::Str(out))
    }
}

pub fn register(registry: &mut FunctionRegistry) {
    registry.register(Box::new(ConcatFunction));
}
